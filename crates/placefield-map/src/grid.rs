//! Grid Store – occupancy, ownership and freshness per height slice.
//!
//! Each height slice is a square grid whose three per-cell fields live in
//! separate arrays (Structure-of-Arrays):
//!
//! ```text
//! occupancy:  [O O O O ...]   u8, 1 = obstacle
//! owners:     [W W W W ...]   u32, raw Owner (0 = no owner)
//! updated:    [T T T T ...]   i64, -1 = never updated
//! ```
//!
//! Slices only ever grow, symmetrically, so the world origin stays at the
//! centre cell.  The arrays are backed by a square arena whose side
//! (`capacity`) may exceed the logical side (`size`); the logical window sits
//! centred in the arena at `offset`.  Growth that fits in the arena only
//! moves the window.  Growth past it reallocates to roughly twice the
//! capacity (capped at the maximum) and copies once.  Arena cells outside the
//! window are never written, so they always hold defaults.
//!
//! # Example
//!
//! ```rust
//! use placefield_map::grid::GridStore;
//! use placefield_types::Owner;
//!
//! let mut grid = GridStore::new(11, 21);
//! grid.ensure_slice(0);
//! grid.set_cell(5, 5, 0, true, Owner::None, 3);
//!
//! assert_eq!(grid.grow(0, 2), Some(15));
//! // Old content is re-centred.
//! assert!(grid.get_cell(7, 7, 0).occupied);
//! // Growing past the maximum is refused and changes nothing.
//! assert_eq!(grid.grow(0, 4), None);
//! assert_eq!(grid.size(0), Some(15));
//! ```

use std::collections::BTreeMap;

use placefield_types::{NEVER_UPDATED, Owner, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::MAX_MAP_SIZE;

// ────────────────────────────────────────────────────────────────────────────
// CellKey
// ────────────────────────────────────────────────────────────────────────────

/// Scalar key of a cell `(i, j, h)`.
///
/// Packs `h * S² + i * S + j` with `S = MAX_MAP_SIZE`, which is a bijection for
/// `0 ≤ i, j, h < S`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey(u64);

impl CellKey {
    const STRIDE: u64 = MAX_MAP_SIZE as u64;

    /// # Panics
    ///
    /// Panics if any coordinate is `>= MAX_MAP_SIZE`; such keys would alias
    /// cells of another slice.
    pub fn encode(i: usize, j: usize, h: usize) -> Self {
        assert!(
            i < MAX_MAP_SIZE && j < MAX_MAP_SIZE && h < MAX_MAP_SIZE,
            "cell ({i}, {j}, {h}) outside key bounds (< {MAX_MAP_SIZE})"
        );
        Self((h as u64 * Self::STRIDE + i as u64) * Self::STRIDE + j as u64)
    }

    /// Recover `(i, j, h)`.
    pub fn decode(self) -> (usize, usize, usize) {
        let j = self.0 % Self::STRIDE;
        let rest = self.0 / Self::STRIDE;
        let i = rest % Self::STRIDE;
        let h = rest / Self::STRIDE;
        (i as usize, j as usize, h as usize)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Cell
// ────────────────────────────────────────────────────────────────────────────

/// Contents of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub occupied: bool,
    pub owner: Owner,
    /// `NEVER_UPDATED` (-1) if the cell was never written.
    pub last_update: Timestamp,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            occupied: false,
            owner: Owner::None,
            last_update: NEVER_UPDATED,
        }
    }
}

/// Dense row-major copy of one slice, for visualization or snapshotting.
///
/// Element `i * size + j` holds cell `(i, j)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceSnapshot {
    pub height_slice: usize,
    pub size: usize,
    pub occupancy: Vec<u8>,
    /// Raw owner indices; resolve through the identity registry.
    pub owners: Vec<u32>,
    pub last_update: Vec<Timestamp>,
}

// ────────────────────────────────────────────────────────────────────────────
// GridSlice – internal arena-backed square grid
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct GridSlice {
    occupancy: Vec<u8>,
    owners: Vec<u32>,
    updated: Vec<Timestamp>,
    /// Side of the backing arena.
    capacity: usize,
    /// Side of the logical grid.
    size: usize,
    /// Arena row/column of logical cell (0, 0).  `capacity - size` is even,
    /// so the window is exactly centred.
    offset: usize,
}

impl GridSlice {
    fn new(size: usize) -> Self {
        let n = size * size;
        Self {
            occupancy: vec![0; n],
            owners: vec![Owner::None.to_raw(); n],
            updated: vec![NEVER_UPDATED; n],
            capacity: size,
            size,
            offset: 0,
        }
    }

    #[inline]
    fn index(&self, i: usize, j: usize) -> usize {
        assert!(
            i < self.size && j < self.size,
            "cell ({i}, {j}) outside slice of size {}",
            self.size
        );
        (i + self.offset) * self.capacity + (j + self.offset)
    }

    fn get(&self, i: usize, j: usize) -> Cell {
        let k = self.index(i, j);
        Cell {
            occupied: self.occupancy[k] != 0,
            owner: Owner::from_raw(self.owners[k]),
            last_update: self.updated[k],
        }
    }

    fn set(&mut self, i: usize, j: usize, occupied: bool, owner: Owner, t: Timestamp) {
        let k = self.index(i, j);
        self.occupancy[k] = occupied as u8;
        self.owners[k] = owner.to_raw();
        self.updated[k] = t;
    }

    fn grow(&mut self, extension: usize, max_size: usize) -> Option<usize> {
        let new_size = extension
            .checked_mul(2)
            .and_then(|e| e.checked_add(self.size))
            .filter(|&n| n <= max_size)?;
        if extension == 0 {
            return Some(self.size);
        }

        if new_size <= self.capacity {
            // (capacity - size) is even and ≥ 2 * extension, so offset ≥ extension.
            self.offset -= extension;
            self.size = new_size;
            return Some(new_size);
        }

        let mut capacity = (self.capacity * 2 + 1).max(new_size).min(max_size);
        if (capacity - new_size) % 2 == 1 {
            capacity -= 1;
        }
        let offset = (capacity - new_size) / 2;
        let n = capacity * capacity;

        let mut occupancy = vec![0u8; n];
        let mut owners = vec![Owner::None.to_raw(); n];
        let mut updated = vec![NEVER_UPDATED; n];

        for row in 0..self.size {
            let src = (row + self.offset) * self.capacity + self.offset;
            let dst = (row + extension + offset) * capacity + extension + offset;
            let len = self.size;
            occupancy[dst..dst + len].copy_from_slice(&self.occupancy[src..src + len]);
            owners[dst..dst + len].copy_from_slice(&self.owners[src..src + len]);
            updated[dst..dst + len].copy_from_slice(&self.updated[src..src + len]);
        }

        debug!(
            old_capacity = self.capacity,
            new_capacity = capacity,
            "reallocated slice arena"
        );

        self.occupancy = occupancy;
        self.owners = owners;
        self.updated = updated;
        self.capacity = capacity;
        self.offset = offset;
        self.size = new_size;
        Some(new_size)
    }

    fn rows(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.size).map(move |row| (row + self.offset) * self.capacity + self.offset)
    }

    fn snapshot(&self, height_slice: usize) -> SliceSnapshot {
        let n = self.size * self.size;
        let mut snap = SliceSnapshot {
            height_slice,
            size: self.size,
            occupancy: Vec::with_capacity(n),
            owners: Vec::with_capacity(n),
            last_update: Vec::with_capacity(n),
        };
        for start in self.rows() {
            let end = start + self.size;
            snap.occupancy.extend_from_slice(&self.occupancy[start..end]);
            snap.owners.extend_from_slice(&self.owners[start..end]);
            snap.last_update.extend_from_slice(&self.updated[start..end]);
        }
        snap
    }

    fn occupied_count(&self) -> usize {
        self.rows()
            .map(|start| {
                self.occupancy[start..start + self.size]
                    .iter()
                    .filter(|&&o| o != 0)
                    .count()
            })
            .sum()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// GridStore
// ────────────────────────────────────────────────────────────────────────────

/// All height slices of the map.
///
/// Slices are created lazily at `initial_size` and grow up to `max_size`.
/// Cell accessors do not grow anything; out-of-bounds access panics.
#[derive(Debug, Clone)]
pub struct GridStore {
    slices: BTreeMap<usize, GridSlice>,
    initial_size: usize,
    max_size: usize,
}

impl GridStore {
    /// Create an empty store.  `max_size` is capped at [`MAX_MAP_SIZE`].
    pub fn new(initial_size: usize, max_size: usize) -> Self {
        let max_size = max_size.min(MAX_MAP_SIZE);
        Self {
            slices: BTreeMap::new(),
            initial_size: initial_size.min(max_size),
            max_size,
        }
    }

    pub fn initial_size(&self) -> usize {
        self.initial_size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Create slice `h` at the initial size if absent; return its size.
    pub fn ensure_slice(&mut self, h: usize) -> usize {
        self.slice_mut(h).size
    }

    fn slice_mut(&mut self, h: usize) -> &mut GridSlice {
        let initial = self.initial_size;
        self.slices.entry(h).or_insert_with(|| {
            debug!(slice = h, size = initial, "creating height slice");
            GridSlice::new(initial)
        })
    }

    fn slice(&self, h: usize) -> &GridSlice {
        match self.slices.get(&h) {
            Some(s) => s,
            None => panic!("height slice {h} does not exist"),
        }
    }

    /// Pad slice `h` by `extension` cells on every side.
    ///
    /// Returns the new side length, or `None` when it would exceed the
    /// maximum, in which case the slice is left untouched.  Creates the slice
    /// first if needed.
    pub fn grow(&mut self, h: usize, extension: usize) -> Option<usize> {
        let max = self.max_size;
        let slice = self.slice_mut(h);
        let old = slice.size;
        let grown = slice.grow(extension, max);
        match grown {
            Some(size) => debug!(slice = h, old, size, "grew height slice"),
            None => warn!(slice = h, old, extension, max, "growth rejected"),
        }
        grown
    }

    /// Current side length of slice `h`, if it exists.
    pub fn size(&self, h: usize) -> Option<usize> {
        self.slices.get(&h).map(|s| s.size)
    }

    /// True when slice `h` exists and `(i, j)` lies inside it.
    pub fn contains(&self, i: i64, j: i64, h: usize) -> bool {
        match self.size(h) {
            Some(size) => i >= 0 && j >= 0 && (i as usize) < size && (j as usize) < size,
            None => false,
        }
    }

    /// # Panics
    ///
    /// Panics if the slice does not exist or `(i, j)` is out of bounds.
    pub fn get_cell(&self, i: usize, j: usize, h: usize) -> Cell {
        self.slice(h).get(i, j)
    }

    /// # Panics
    ///
    /// Panics if the slice does not exist or `(i, j)` is out of bounds.
    pub fn set_cell(
        &mut self,
        i: usize,
        j: usize,
        h: usize,
        occupied: bool,
        owner: Owner,
        timestamp: Timestamp,
    ) {
        match self.slices.get_mut(&h) {
            Some(s) => s.set(i, j, occupied, owner, timestamp),
            None => panic!("height slice {h} does not exist"),
        }
    }

    /// Heights of all existing slices, ascending.
    pub fn slices(&self) -> impl Iterator<Item = usize> + '_ {
        self.slices.keys().copied()
    }

    pub fn snapshot(&self, h: usize) -> Option<SliceSnapshot> {
        self.slices.get(&h).map(|s| s.snapshot(h))
    }

    /// Number of occupied cells in slice `h` (0 if absent).
    pub fn occupied_count(&self, h: usize) -> usize {
        self.slices.get(&h).map_or(0, |s| s.occupied_count())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
