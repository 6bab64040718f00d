//! Update Processor – applies batches of [`ChangeRecord`]s to the map.
//!
//! Owns the grid, the identity registry and the reverse index, and keeps the
//! last two in lock-step: after every write, a cell owned by identity `X`
//! is listed under `X` in the reverse index and nowhere else.
//!
//! Records are applied one by one, in order, with no rollback.  A failing
//! record is reported and the batch carries on.  A record whose position
//! would need the map to grow past its maximum size is skipped silently.
//!
//! # Example
//!
//! ```rust
//! use placefield_map::{PlaceFieldConfig, update::UpdateProcessor};
//! use placefield_types::{ChangeRecord, Point3};
//!
//! let mut map = UpdateProcessor::new(&PlaceFieldConfig::with_sizes(11, 21), "agent");
//! let report = map.apply_changes(
//!     &[
//!         ChangeRecord::insert(Point3::new(1.0, 0.0, 1.0), "rock1"),
//!         ChangeRecord::move_to(Point3::new(2.0, 0.0, 2.0), "rock1"),
//!         ChangeRecord::move_to(Point3::new(3.0, 0.0, 3.0), "ghost"),
//!     ],
//!     7,
//! );
//! assert_eq!(report.applied, 2);
//! assert_eq!(report.failures.len(), 1);
//! assert_eq!(map.cells_owned_by("rock1"), vec![(7, 7, 0)]);
//! ```

use placefield_types::{ChangeRecord, Owner, PlaceFieldError, Point3, Timestamp};
use tracing::{debug, warn};

use crate::config::PlaceFieldConfig;
use crate::grid::{CellKey, GridStore};
use crate::registry::IdentityRegistry;
use crate::reverse_index::ReverseIndex;
use crate::transform::CoordinateTransform;

// ─────────────────────────────────────────────────────────────────────────────
// Outcomes
// ─────────────────────────────────────────────────────────────────────────────

/// Result of a single record that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    Applied,
    /// The position lies beyond the maximum map size; nothing was written.
    Skipped,
}

/// A record of a batch that failed, with its position in the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFailure {
    pub index: usize,
    pub error: PlaceFieldError,
}

/// Summary of one [`UpdateProcessor::apply_changes`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub applied: usize,
    pub skipped: usize,
    pub failures: Vec<RecordFailure>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.skipped == 0 && self.failures.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// UpdateProcessor
// ─────────────────────────────────────────────────────────────────────────────

/// The occupancy/identity half of the place field.
#[derive(Debug, Clone)]
pub struct UpdateProcessor {
    transform: CoordinateTransform,
    registry: IdentityRegistry,
    grid: GridStore,
    reverse: ReverseIndex,
}

impl UpdateProcessor {
    /// Create a map with slice `0` allocated and `self_token` registered as
    /// the agent's own identity.
    pub fn new(config: &PlaceFieldConfig, self_token: &str) -> Self {
        let config = config.clone().normalized();
        let mut grid = GridStore::new(config.initial_size, config.max_size);
        grid.ensure_slice(0);
        Self {
            transform: CoordinateTransform::new(config.resolution),
            registry: IdentityRegistry::new(self_token),
            grid,
            reverse: ReverseIndex::new(),
        }
    }

    pub fn transform(&self) -> &CoordinateTransform {
        &self.transform
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    pub fn grid(&self) -> &GridStore {
        &self.grid
    }

    pub fn reverse_index(&self) -> &ReverseIndex {
        &self.reverse
    }

    /// Apply `changes` in order, stamping every write with `now`.
    pub fn apply_changes(&mut self, changes: &[ChangeRecord], now: Timestamp) -> BatchReport {
        let mut report = BatchReport::default();
        for (index, change) in changes.iter().enumerate() {
            match self.apply_change(change, now) {
                Ok(ChangeOutcome::Applied) => report.applied += 1,
                Ok(ChangeOutcome::Skipped) => report.skipped += 1,
                Err(error) => {
                    warn!(index, error = %error, "change record failed");
                    report.failures.push(RecordFailure { index, error });
                }
            }
        }
        debug!(
            applied = report.applied,
            skipped = report.skipped,
            failed = report.failures.len(),
            "applied change batch"
        );
        report
    }

    /// Apply a single record.
    ///
    /// # Errors
    ///
    /// - [`PlaceFieldError::InvalidChange`] for a blank identity, a record
    ///   without position that is not an identity delete, a non-finite
    ///   position, or a move without identity.
    /// - [`PlaceFieldError::InvalidMove`] for a move whose identity does not
    ///   own exactly one cell.  The map is left untouched.
    pub fn apply_change(
        &mut self,
        change: &ChangeRecord,
        now: Timestamp,
    ) -> Result<ChangeOutcome, PlaceFieldError> {
        let identity = change.identity.as_deref();
        if identity.is_some_and(|token| token.trim().is_empty()) {
            return Err(PlaceFieldError::InvalidChange(
                "identity must not be blank".to_string(),
            ));
        }

        let Some(pos) = change.pos else {
            if !change.is_delete {
                return Err(PlaceFieldError::InvalidChange(
                    "a change without a position must be a delete".to_string(),
                ));
            }
            let Some(token) = identity else {
                return Err(PlaceFieldError::InvalidChange(
                    "a delete needs a position or an identity".to_string(),
                ));
            };
            self.delete_by_identity(token, now, false)?;
            return Ok(ChangeOutcome::Applied);
        };

        if !pos.is_finite() {
            return Err(PlaceFieldError::InvalidChange(format!(
                "non-finite position {pos:?}"
            )));
        }

        let is_move = change.is_move && !change.is_delete;
        if is_move {
            let Some(token) = identity else {
                return Err(PlaceFieldError::InvalidChange(
                    "a move needs an identity".to_string(),
                ));
            };
            self.check_movable(token)?;
        }

        let Some((i, j, h)) = self.locate(pos) else {
            debug!(?pos, "position beyond maximum map size; record skipped");
            return Ok(ChangeOutcome::Skipped);
        };

        if change.is_delete {
            let cell = self.grid.get_cell(i, j, h);
            let matches = match identity {
                None => true,
                Some(token) => self
                    .registry
                    .lookup_index(token)
                    .is_some_and(|idx| cell.owner == Owner::Identity(idx)),
            };
            if matches {
                self.write_cell(i, j, h, false, Owner::None, now);
            }
            return Ok(ChangeOutcome::Applied);
        }

        if let (true, Some(token)) = (is_move, identity) {
            self.delete_by_identity(token, now, true)?;
        }
        let owner = match identity {
            Some(token) => Owner::Identity(self.registry.register(token)),
            None => Owner::None,
        };
        self.write_cell(i, j, h, change.is_obstacle, owner, now);
        Ok(ChangeOutcome::Applied)
    }

    /// Clear every cell owned by `token` and return how many there were.
    ///
    /// With `is_move`, exactly one owned cell is required.
    ///
    /// # Errors
    ///
    /// [`PlaceFieldError::InvalidMove`] when `is_move` is set and `token`
    /// owns zero or several cells; nothing is cleared in that case.
    pub fn delete_by_identity(
        &mut self,
        token: &str,
        now: Timestamp,
        is_move: bool,
    ) -> Result<usize, PlaceFieldError> {
        if is_move {
            self.check_movable(token)?;
        }
        let Some(idx) = self.registry.lookup_index(token) else {
            return Ok(0);
        };
        let keys = self.reverse.take(idx);
        for key in &keys {
            let (i, j, h) = key.decode();
            self.grid.set_cell(i, j, h, false, Owner::None, now);
        }
        Ok(keys.len())
    }

    fn check_movable(&self, token: &str) -> Result<(), PlaceFieldError> {
        let owned = self
            .registry
            .lookup_index(token)
            .map_or(0, |idx| self.reverse.count(idx));
        if owned == 1 {
            Ok(())
        } else {
            Err(PlaceFieldError::InvalidMove {
                identity: token.to_string(),
                owned,
            })
        }
    }

    /// Resolve `pos` to an in-bounds cell, growing its slice once if needed.
    ///
    /// Returns `None` when the required growth is rejected.
    fn locate(&mut self, pos: Point3) -> Option<(usize, usize, usize)> {
        let h = self.transform.height_to_slice(pos.y);
        let size = self.grid.ensure_slice(h);
        let (i, j) = self.transform.real_to_cell(pos.x, pos.z, size);

        let last = size as i64 - 1;
        let needed = i
            .saturating_sub(last)
            .max(j.saturating_sub(last))
            .max(i.saturating_neg())
            .max(j.saturating_neg());
        if needed <= 0 {
            return Some((i as usize, j as usize, h));
        }

        let extension = needed as usize;
        let grown = self.grid.grow(h, extension)?;
        self.reverse.shift_slice(h, extension);
        let (i, j) = self.transform.real_to_cell(pos.x, pos.z, grown);
        if self.grid.contains(i, j, h) {
            Some((i as usize, j as usize, h))
        } else {
            None
        }
    }

    /// Write a cell and move its reverse-index entry to the new owner.
    fn write_cell(
        &mut self,
        i: usize,
        j: usize,
        h: usize,
        occupied: bool,
        owner: Owner,
        now: Timestamp,
    ) {
        let key = CellKey::encode(i, j, h);
        if let Some(prev) = self.grid.get_cell(i, j, h).owner.identity() {
            self.reverse.remove(prev, key);
        }
        self.grid.set_cell(i, j, h, occupied, owner, now);
        if let Some(idx) = owner.identity() {
            self.reverse.insert(idx, key);
        }
    }

    /// Cell of world `(x, z)` in slice `h` at its current size.
    ///
    /// A slice that does not exist yet is treated as having the initial size.
    pub fn real_to_cell(&self, x: f32, z: f32, h: usize) -> (i64, i64) {
        self.transform.real_to_cell(x, z, self.slice_size(h))
    }

    /// World `(x, z)` of cell `(i, j)` in slice `h` at its current size.
    pub fn cell_to_real(&self, i: i64, j: i64, h: usize) -> (f32, f32) {
        self.transform.cell_to_real(i, j, self.slice_size(h))
    }

    /// Current side length of slice `h`, or the initial size if absent.
    pub fn slice_size(&self, h: usize) -> usize {
        self.grid.size(h).unwrap_or(self.grid.initial_size())
    }

    /// Cells `(i, j, h)` currently owned by `token`, sorted.
    pub fn cells_owned_by(&self, token: &str) -> Vec<(usize, usize, usize)> {
        let Some(idx) = self.registry.lookup_index(token) else {
            return Vec::new();
        };
        let mut cells: Vec<_> = self.reverse.cells(idx).map(CellKey::decode).collect();
        cells.sort_unstable();
        cells
    }

    /// Token owning cell `(i, j, h)`, if any.
    pub fn owner_token_at(&self, i: usize, j: usize, h: usize) -> Option<&str> {
        self.registry.token_of(self.grid.get_cell(i, j, h).owner)
    }

    /// Check the owner ↔ reverse-index invariant by scanning every slice.
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        for (owner, key) in self.reverse.iter() {
            let (i, j, h) = key.decode();
            if self.grid.get_cell(i, j, h).owner != Owner::Identity(owner) {
                return false;
            }
        }
        for h in self.grid.slices() {
            let size = self.grid.size(h).unwrap_or(0);
            for i in 0..size {
                for j in 0..size {
                    if let Some(idx) = self.grid.get_cell(i, j, h).owner.identity()
                        && !self.reverse.contains(idx, CellKey::encode(i, j, h))
                    {
                        return false;
                    }
                }
            }
        }
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
