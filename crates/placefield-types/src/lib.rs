//! `placefield-types` – shared value types for the place-field map.
//!
//! Everything a perception or task layer needs to talk to
//! `placefield-map` lives here: world points, timestamps, ownership,
//! change records, exploration targets and the error type.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Agent-internal time, as produced by an external monotonic clock.
///
/// Carries no wall-clock meaning; only ordering matters.
pub type Timestamp = i64;

/// `last_update` value of a cell that has never been written.
pub const NEVER_UPDATED: Timestamp = -1;

// ────────────────────────────────────────────────────────────────────────────
// Point3
// ────────────────────────────────────────────────────────────────────────────

/// A point in agent world coordinates.  `y` is the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    /// Create a new point.
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// L1 distance in the horizontal plane, ignoring `y`.
    pub fn planar_l1(&self, other: &Point3) -> f32 {
        (self.x - other.x).abs() + (self.z - other.z).abs()
    }

    /// `true` when no coordinate is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<(f32, f32, f32)> for Point3 {
    fn from((x, y, z): (f32, f32, f32)) -> Self {
        Self::new(x, y, z)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Ownership
// ────────────────────────────────────────────────────────────────────────────

/// Compact index of a registered identity token.
///
/// Index `0` is reserved for "no owner" and index `1` for the agent itself;
/// see [`IdentityIndex::NONE`] and [`IdentityIndex::SELF`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityIndex(pub u32);

impl IdentityIndex {
    /// The reserved "no owner" slot.
    pub const NONE: IdentityIndex = IdentityIndex(0);
    /// The reserved slot of the agent's own identity.
    pub const SELF: IdentityIndex = IdentityIndex(1);
}

impl fmt::Display for IdentityIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who owns a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Owner {
    /// Nothing linked to this location (plain obstacle or free space).
    #[default]
    None,
    /// The cell belongs to a registered identity.
    Identity(IdentityIndex),
}

impl Owner {
    /// Decode a raw owner value as stored in the grid arrays.
    pub fn from_raw(raw: u32) -> Self {
        if raw == IdentityIndex::NONE.0 {
            Owner::None
        } else {
            Owner::Identity(IdentityIndex(raw))
        }
    }

    /// Encode for storage in the grid arrays.
    pub fn to_raw(self) -> u32 {
        match self {
            Owner::None => IdentityIndex::NONE.0,
            Owner::Identity(idx) => idx.0,
        }
    }

    /// The owning identity, if any.
    pub fn identity(self) -> Option<IdentityIndex> {
        match self {
            Owner::None => None,
            Owner::Identity(idx) => Some(idx),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ChangeRecord
// ────────────────────────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}

/// One entry of a batched map update.
///
/// Every field except `pos` has a default, so a JSON batch can be as terse as
/// `[{"pos": {"x": 1.0, "y": 0.0, "z": 2.0}}]`.
///
/// * `is_obstacle` – whether the agent can traverse the location.
/// * `is_move` – the identity's single existing cell is cleared before the new
///   one is set.  Objects covering several cells must be moved "by hand" with
///   explicit deletes and inserts.
/// * `is_delete` – without an identity, whatever is at `pos` is removed; with
///   an identity, only if it owns the cell.  Without `pos`, every cell owned by
///   the identity is removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChangeRecord {
    #[serde(default)]
    pub pos: Option<Point3>,
    /// Opaque identity token; `None` means "no owner".
    #[serde(default)]
    pub identity: Option<String>,
    #[serde(default = "default_true")]
    pub is_obstacle: bool,
    #[serde(default)]
    pub is_move: bool,
    #[serde(default)]
    pub is_delete: bool,
}

impl Default for ChangeRecord {
    fn default() -> Self {
        Self {
            pos: None,
            identity: None,
            is_obstacle: true,
            is_move: false,
            is_delete: false,
        }
    }
}

impl ChangeRecord {
    /// Mark an anonymous obstacle at `pos`.
    pub fn obstacle(pos: Point3) -> Self {
        Self {
            pos: Some(pos),
            ..Self::default()
        }
    }

    /// Place `identity` at `pos` as an obstacle.
    pub fn insert(pos: Point3, identity: &str) -> Self {
        Self {
            pos: Some(pos),
            identity: Some(identity.to_string()),
            ..Self::default()
        }
    }

    /// Move the single cell owned by `identity` to `pos`.
    pub fn move_to(pos: Point3, identity: &str) -> Self {
        Self {
            is_move: true,
            ..Self::insert(pos, identity)
        }
    }

    /// Clear whatever occupies `pos`.
    pub fn delete_at(pos: Point3) -> Self {
        Self {
            pos: Some(pos),
            is_delete: true,
            ..Self::default()
        }
    }

    /// Clear `pos` only if `identity` owns it.
    pub fn delete_owned_at(pos: Point3, identity: &str) -> Self {
        Self {
            is_delete: true,
            ..Self::insert(pos, identity)
        }
    }

    /// Clear every cell owned by `identity`.
    pub fn forget(identity: &str) -> Self {
        Self {
            identity: Some(identity.to_string()),
            is_delete: true,
            ..Self::default()
        }
    }

    /// Set `is_obstacle`, builder style.
    pub fn with_obstacle(mut self, is_obstacle: bool) -> Self {
        self.is_obstacle = is_obstacle;
        self
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ExamineTarget
// ────────────────────────────────────────────────────────────────────────────

/// A candidate (or visited) location offered to the exploration tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExamineTarget {
    /// Identifier of the entity at the location (e.g. a memory id).
    pub id: String,
    pub xyz: Point3,
    /// Optional human-readable label, only used for logging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ExamineTarget {
    pub fn new(id: &str, xyz: Point3) -> Self {
        Self {
            id: id.to_string(),
            xyz,
            label: None,
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Record-level failures of a map update.
///
/// Growth past the maximum map size is deliberately absent: such records are
/// skipped, not failed.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlaceFieldError {
    #[error("Invalid change: {0}")]
    InvalidChange(String),

    #[error("Invalid move for '{identity}': owns {owned} cell(s), expected exactly 1")]
    InvalidMove { identity: String, owned: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_finite_checks_every_axis() {
        assert!(Point3::new(1.0, -2.0, 3.0).is_finite());
        assert!(!Point3::new(f32::NAN, 0.0, 0.0).is_finite());
        assert!(!Point3::new(0.0, f32::INFINITY, 0.0).is_finite());
        assert!(!Point3::new(0.0, 0.0, f32::NEG_INFINITY).is_finite());
    }

    #[test]
    fn planar_l1_ignores_height() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0, 50.0, -2.0);
        assert!((a.planar_l1(&b) - 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn owner_raw_encoding() {
        assert_eq!(Owner::from_raw(0), Owner::None);
        assert_eq!(Owner::from_raw(7), Owner::Identity(IdentityIndex(7)));
        assert_eq!(Owner::Identity(IdentityIndex(3)).to_raw(), 3);
        assert_eq!(Owner::None.to_raw(), 0);
        assert_eq!(Owner::None.identity(), None);
    }

    #[test]
    fn change_record_json_defaults() {
        let json = r#"{"pos": {"x": 1.0, "y": 0.0, "z": 2.0}}"#;
        let rec: ChangeRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.pos, Some(Point3::new(1.0, 0.0, 2.0)));
        assert_eq!(rec.identity, None);
        assert!(rec.is_obstacle);
        assert!(!rec.is_move);
        assert!(!rec.is_delete);
    }

    #[test]
    fn change_record_constructors() {
        let p = Point3::new(1.0, 0.0, 1.0);
        let mv = ChangeRecord::move_to(p, "rock1");
        assert!(mv.is_move && !mv.is_delete);
        assert_eq!(mv.identity.as_deref(), Some("rock1"));

        let forget = ChangeRecord::forget("rock1");
        assert!(forget.pos.is_none() && forget.is_delete);

        let free = ChangeRecord::obstacle(p).with_obstacle(false);
        assert!(!free.is_obstacle);
    }

    #[test]
    fn examine_target_omits_missing_label() {
        let t = ExamineTarget::new("e1", Point3::new(0.0, 0.0, 0.0));
        let json = serde_json::to_string(&t).unwrap();
        assert!(!json.contains("label"));
        let back: ExamineTarget = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn error_display() {
        let err = PlaceFieldError::InvalidMove {
            identity: "rock1".to_string(),
            owned: 2,
        };
        assert!(err.to_string().contains("rock1"));
        assert!(err.to_string().contains("owns 2"));
    }
}
