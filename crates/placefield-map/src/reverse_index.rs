//! Identity → owned cells.
//!
//! Lets deletes and moves find an identity's cells without scanning the
//! grid.  Unowned cells are never indexed, and an identity whose last cell is
//! removed disappears from the index.

use std::collections::{HashMap, HashSet};

use placefield_types::IdentityIndex;

use crate::grid::CellKey;

#[derive(Debug, Clone, Default)]
pub struct ReverseIndex {
    cells: HashMap<IdentityIndex, HashSet<CellKey>>,
}

impl ReverseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, owner: IdentityIndex, key: CellKey) {
        self.cells.entry(owner).or_default().insert(key);
    }

    /// Unlink `key` from `owner`.  Returns whether it was present.
    pub fn remove(&mut self, owner: IdentityIndex, key: CellKey) -> bool {
        let Some(set) = self.cells.get_mut(&owner) else {
            return false;
        };
        let removed = set.remove(&key);
        if set.is_empty() {
            self.cells.remove(&owner);
        }
        removed
    }

    /// Remove and return every cell of `owner`.
    pub fn take(&mut self, owner: IdentityIndex) -> HashSet<CellKey> {
        self.cells.remove(&owner).unwrap_or_default()
    }

    /// Number of cells owned by `owner`.
    pub fn count(&self, owner: IdentityIndex) -> usize {
        self.cells.get(&owner).map_or(0, HashSet::len)
    }

    pub fn cells(&self, owner: IdentityIndex) -> impl Iterator<Item = CellKey> + '_ {
        self.cells.get(&owner).into_iter().flatten().copied()
    }

    pub fn contains(&self, owner: IdentityIndex, key: CellKey) -> bool {
        self.cells.get(&owner).is_some_and(|s| s.contains(&key))
    }

    /// Identities owning at least one cell.
    pub fn owners(&self) -> impl Iterator<Item = IdentityIndex> + '_ {
        self.cells.keys().copied()
    }

    /// Every `(owner, cell)` pair.
    pub fn iter(&self) -> impl Iterator<Item = (IdentityIndex, CellKey)> + '_ {
        self.cells
            .iter()
            .flat_map(|(&owner, set)| set.iter().map(move |&key| (owner, key)))
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Re-key the cells of slice `h` after it grew by `extension` on every
    /// side; each such cell moved from `(i, j)` to `(i + ext, j + ext)`.
    pub fn shift_slice(&mut self, h: usize, extension: usize) {
        if extension == 0 {
            return;
        }
        for set in self.cells.values_mut() {
            *set = set
                .drain()
                .map(|key| match key.decode() {
                    (i, j, kh) if kh == h => CellKey::encode(i + extension, j + extension, h),
                    _ => key,
                })
                .collect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROCK: IdentityIndex = IdentityIndex(2);

    #[test]
    fn insert_and_count() {
        let mut idx = ReverseIndex::new();
        idx.insert(ROCK, CellKey::encode(1, 1, 0));
        idx.insert(ROCK, CellKey::encode(1, 2, 0));
        idx.insert(ROCK, CellKey::encode(1, 2, 0));
        assert_eq!(idx.count(ROCK), 2);
        assert!(idx.contains(ROCK, CellKey::encode(1, 1, 0)));
    }

    #[test]
    fn removing_last_cell_drops_owner() {
        let mut idx = ReverseIndex::new();
        let key = CellKey::encode(3, 4, 0);
        idx.insert(ROCK, key);
        assert!(idx.remove(ROCK, key));
        assert!(!idx.remove(ROCK, key));
        assert_eq!(idx.owners().count(), 0);
        assert!(idx.is_empty());
    }

    #[test]
    fn take_empties_owner() {
        let mut idx = ReverseIndex::new();
        idx.insert(ROCK, CellKey::encode(0, 0, 0));
        idx.insert(ROCK, CellKey::encode(0, 1, 0));
        let taken = idx.take(ROCK);
        assert_eq!(taken.len(), 2);
        assert_eq!(idx.count(ROCK), 0);
        assert!(idx.take(ROCK).is_empty());
    }

    #[test]
    fn shift_slice_only_touches_that_slice() {
        let mut idx = ReverseIndex::new();
        idx.insert(ROCK, CellKey::encode(0, 3, 0));
        idx.insert(ROCK, CellKey::encode(0, 3, 1));
        idx.shift_slice(0, 2);
        assert!(idx.contains(ROCK, CellKey::encode(2, 5, 0)));
        assert!(idx.contains(ROCK, CellKey::encode(0, 3, 1)));
        assert_eq!(idx.count(ROCK), 2);
    }

    #[test]
    fn iter_yields_all_pairs() {
        let mut idx = ReverseIndex::new();
        idx.insert(ROCK, CellKey::encode(0, 0, 0));
        idx.insert(IdentityIndex(3), CellKey::encode(5, 5, 0));
        assert_eq!(idx.iter().count(), 2);
        assert_eq!(idx.cells(IdentityIndex(3)).collect::<Vec<_>>(), vec![CellKey::encode(5, 5, 0)]);
    }
}
