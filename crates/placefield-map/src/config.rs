//! Tuning knobs for [`PlaceField`][crate::PlaceField].
//!
//! Every field carries a serde default so a partial `[map]` table in a TOML
//! file is enough.

use serde::{Deserialize, Serialize};

/// Side length of a freshly created height slice, in cells.
pub const MAP_INIT_SIZE: usize = 1025;

/// Hard upper bound on the side length of any slice.  Also the stride of
/// [`CellKey`][crate::grid::CellKey] encoding.
pub const MAX_MAP_SIZE: usize = 4097;

/// Grid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceFieldConfig {
    /// Cells per world unit.
    #[serde(default = "default_resolution")]
    pub resolution: f32,

    /// Side length of a new slice.
    #[serde(default = "default_initial_size")]
    pub initial_size: usize,

    /// Slices never grow past this side length.
    #[serde(default = "default_max_size")]
    pub max_size: usize,

    #[serde(default)]
    pub exploration: ExplorationConfig,
}

fn default_resolution() -> f32 {
    1.0
}
fn default_initial_size() -> usize {
    MAP_INIT_SIZE
}
fn default_max_size() -> usize {
    MAX_MAP_SIZE
}

impl Default for PlaceFieldConfig {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            initial_size: default_initial_size(),
            max_size: default_max_size(),
            exploration: ExplorationConfig::default(),
        }
    }
}

impl PlaceFieldConfig {
    /// Config with the given sizes and defaults elsewhere.
    pub fn with_sizes(initial_size: usize, max_size: usize) -> Self {
        Self {
            initial_size,
            max_size,
            ..Self::default()
        }
    }

    /// Bring the sizes into a usable range.
    ///
    /// `max_size` is clamped to [`MAX_MAP_SIZE`], `initial_size` to
    /// `1..=max_size`.  A non-positive or non-finite resolution falls back to
    /// `1.0`.
    pub fn normalized(mut self) -> Self {
        self.max_size = self.max_size.clamp(1, MAX_MAP_SIZE);
        self.initial_size = self.initial_size.clamp(1, self.max_size);
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            self.resolution = default_resolution();
        }
        self
    }
}

/// Thresholds of the exploration heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorationConfig {
    /// A query snaps to an examined point closer than this (planar L1).
    #[serde(default = "default_proximity_threshold")]
    pub proximity_threshold: f32,

    /// Candidates closer than this to the last examined point are skipped.
    #[serde(default = "default_min_separation")]
    pub min_separation: f32,

    /// Points visited this many times are not examined again.
    #[serde(default = "default_max_visits")]
    pub max_visits: u32,
}

fn default_proximity_threshold() -> f32 {
    1.5
}
fn default_min_separation() -> f32 {
    1.0
}
fn default_max_visits() -> u32 {
    2
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            proximity_threshold: default_proximity_threshold(),
            min_separation: default_min_separation(),
            max_visits: default_max_visits(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let cfg = PlaceFieldConfig::default();
        assert_eq!(cfg.initial_size, MAP_INIT_SIZE);
        assert_eq!(cfg.max_size, MAX_MAP_SIZE);
        assert!((cfg.resolution - 1.0).abs() < f32::EPSILON);
        assert_eq!(cfg.exploration.max_visits, 2);
    }

    #[test]
    fn normalized_clamps_sizes() {
        let cfg = PlaceFieldConfig::with_sizes(10_000, 50_000).normalized();
        assert_eq!(cfg.max_size, MAX_MAP_SIZE);
        assert_eq!(cfg.initial_size, MAX_MAP_SIZE);

        let cfg = PlaceFieldConfig::with_sizes(0, 21).normalized();
        assert_eq!(cfg.initial_size, 1);
    }

    #[test]
    fn normalized_rejects_bad_resolution() {
        let mut cfg = PlaceFieldConfig::default();
        cfg.resolution = -2.0;
        assert!((cfg.normalized().resolution - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: PlaceFieldConfig = serde_json::from_str(r#"{"resolution": 4.0}"#).unwrap();
        assert!((cfg.resolution - 4.0).abs() < f32::EPSILON);
        assert_eq!(cfg.initial_size, MAP_INIT_SIZE);
        assert!((cfg.exploration.proximity_threshold - 1.5).abs() < f32::EPSILON);
    }
}
