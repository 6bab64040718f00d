//! `placefield-map` – the agent's grid-based spatial record.
//!
//! Tracks which world locations are occupied, which entity owns each
//! location, and when it was last observed; and decides which locations are
//! still worth exploring.
//!
//! # Modules
//!
//! - [`transform`] – [`CoordinateTransform`][transform::CoordinateTransform]:
//!   world `(x, z)` ↔ grid `(i, j)` conversion and height-slice selection.
//! - [`registry`] – [`IdentityRegistry`][registry::IdentityRegistry]:
//!   append-only token ↔ index interning for cell owners.
//! - [`grid`] – [`GridStore`][grid::GridStore]: per-slice occupancy, owner
//!   and timestamp arrays with symmetric, bounded growth.
//! - [`reverse_index`] – [`ReverseIndex`][reverse_index::ReverseIndex]:
//!   identity → owned cells, for fast deletes and moves.
//! - [`update`] – [`UpdateProcessor`][update::UpdateProcessor]: applies
//!   batches of [`ChangeRecord`][placefield_types::ChangeRecord]s.
//! - [`exploration`] – [`ExplorationTracker`][exploration::ExplorationTracker]:
//!   nearest-examined-point bookkeeping and the `can_examine` decision.
//! - [`place_field`] – [`PlaceField`]: the facade owning all of the above.
//! - [`config`] – [`PlaceFieldConfig`] and size constants.
//! - [`clock`] – the [`Clock`][clock::Clock] seam for timestamps.

pub mod clock;
pub mod config;
pub mod exploration;
pub mod grid;
pub mod place_field;
pub mod registry;
pub mod reverse_index;
pub mod transform;
pub mod update;

pub use clock::{Clock, StepClock};
pub use config::{ExplorationConfig, MAP_INIT_SIZE, MAX_MAP_SIZE, PlaceFieldConfig};
pub use grid::{Cell, CellKey, GridStore, SliceSnapshot};
pub use place_field::PlaceField;
pub use update::{BatchReport, ChangeOutcome, RecordFailure, UpdateProcessor};
