//! [`PlaceField`] – the agent-facing spatial record.
//!
//! Bundles the occupancy/identity map ([`UpdateProcessor`]) with the
//! exploration heuristic ([`ExplorationTracker`]) behind one owned value with
//! an explicit construct/clear lifecycle.
//!
//! # Example
//!
//! ```rust
//! use placefield_map::{PlaceField, PlaceFieldConfig};
//! use placefield_types::{ChangeRecord, ExamineTarget, Point3};
//!
//! let mut field = PlaceField::new(PlaceFieldConfig::with_sizes(11, 21), "agent");
//!
//! field.apply_changes(&[ChangeRecord::insert(Point3::new(2.0, 0.0, 3.0), "rock1")], 1);
//! let (i, j) = field.real_to_cell(2.0, 3.0, 0);
//! assert_eq!(field.owner_token_at(i as usize, j as usize, 0), Some("rock1"));
//!
//! let rock = ExamineTarget::new("rock1", Point3::new(2.0, 0.0, 3.0));
//! assert!(field.can_examine(&rock));
//! field.update(&rock);
//! assert!(!field.can_examine(&rock));
//! ```

use placefield_types::{ChangeRecord, ExamineTarget, PlaceFieldError, Point3, Timestamp};

use crate::clock::Clock;
use crate::config::PlaceFieldConfig;
use crate::exploration::ExplorationTracker;
use crate::grid::{Cell, GridStore, SliceSnapshot};
use crate::registry::IdentityRegistry;
use crate::reverse_index::ReverseIndex;
use crate::update::{BatchReport, ChangeOutcome, UpdateProcessor};

/// Grid map of the agent's surroundings plus exploration bookkeeping.
#[derive(Debug, Clone)]
pub struct PlaceField {
    config: PlaceFieldConfig,
    map: UpdateProcessor,
    exploration: ExplorationTracker,
}

impl PlaceField {
    /// Create a place field; `self_token` is the agent's own identity.
    pub fn new(config: PlaceFieldConfig, self_token: &str) -> Self {
        let config = config.normalized();
        Self {
            map: UpdateProcessor::new(&config, self_token),
            exploration: ExplorationTracker::new(config.exploration.clone()),
            config,
        }
    }

    pub fn config(&self) -> &PlaceFieldConfig {
        &self.config
    }

    // ── map updates ──────────────────────────────────────────────────────────

    /// See [`UpdateProcessor::apply_changes`].
    pub fn apply_changes(&mut self, changes: &[ChangeRecord], now: Timestamp) -> BatchReport {
        self.map.apply_changes(changes, now)
    }

    /// Apply a batch stamped with a single reading of `clock`.
    pub fn apply_changes_with(&mut self, changes: &[ChangeRecord], clock: &dyn Clock) -> BatchReport {
        self.map.apply_changes(changes, clock.now())
    }

    /// See [`UpdateProcessor::apply_change`].
    pub fn apply_change(
        &mut self,
        change: &ChangeRecord,
        now: Timestamp,
    ) -> Result<ChangeOutcome, PlaceFieldError> {
        self.map.apply_change(change, now)
    }

    // ── map queries ──────────────────────────────────────────────────────────

    pub fn real_to_cell(&self, x: f32, z: f32, h: usize) -> (i64, i64) {
        self.map.real_to_cell(x, z, h)
    }

    pub fn cell_to_real(&self, i: i64, j: i64, h: usize) -> (f32, f32) {
        self.map.cell_to_real(i, j, h)
    }

    pub fn height_to_slice(&self, y: f32) -> usize {
        self.map.transform().height_to_slice(y)
    }

    /// # Panics
    ///
    /// Panics if the cell lies outside slice `h` or the slice does not exist.
    pub fn get_cell(&self, i: usize, j: usize, h: usize) -> Cell {
        self.map.grid().get_cell(i, j, h)
    }

    /// The cell under world point `pos`, if it lies on the map.
    pub fn cell_at(&self, pos: Point3) -> Option<Cell> {
        if !pos.is_finite() {
            return None;
        }
        let h = self.height_to_slice(pos.y);
        let (i, j) = self.real_to_cell(pos.x, pos.z, h);
        self.map
            .grid()
            .contains(i, j, h)
            .then(|| self.get_cell(i as usize, j as usize, h))
    }

    pub fn slice_size(&self, h: usize) -> usize {
        self.map.slice_size(h)
    }

    pub fn owner_token_at(&self, i: usize, j: usize, h: usize) -> Option<&str> {
        self.map.owner_token_at(i, j, h)
    }

    pub fn cells_owned_by(&self, token: &str) -> Vec<(usize, usize, usize)> {
        self.map.cells_owned_by(token)
    }

    pub fn snapshot(&self, h: usize) -> Option<SliceSnapshot> {
        self.map.grid().snapshot(h)
    }

    /// Read-only view of the raw grid slices.
    pub fn grid(&self) -> &GridStore {
        self.map.grid()
    }

    pub fn registry(&self) -> &IdentityRegistry {
        self.map.registry()
    }

    pub fn reverse_index(&self) -> &ReverseIndex {
        self.map.reverse_index()
    }

    // ── exploration ──────────────────────────────────────────────────────────

    /// See [`ExplorationTracker::can_examine`].
    pub fn can_examine(&mut self, target: &ExamineTarget) -> bool {
        self.exploration.can_examine(target)
    }

    /// See [`ExplorationTracker::update`].
    pub fn update(&mut self, target: &ExamineTarget) {
        self.exploration.update(target)
    }

    pub fn get_closest(&mut self, point: Point3) -> Point3 {
        self.exploration.get_closest(point)
    }

    pub fn clear_examined(&mut self) {
        self.exploration.clear_examined()
    }

    pub fn exploration(&self) -> &ExplorationTracker {
        &self.exploration
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
