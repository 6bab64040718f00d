//! Identity Registry.
//!
//! Interns opaque identity tokens (memory ids of reference objects, the
//! agent's own id, ...) into dense [`IdentityIndex`] values small enough to
//! store in every grid cell.
//!
//! Slot `0` is the "no owner" entry and has no token; slot `1` is the agent
//! itself.  Entries are append-only: an index, once issued, names the same
//! token for the lifetime of the registry.
//!
//! ```rust
//! use placefield_map::registry::IdentityRegistry;
//! use placefield_types::IdentityIndex;
//!
//! let mut reg = IdentityRegistry::new("agent");
//! assert_eq!(reg.lookup_index("agent"), Some(IdentityIndex::SELF));
//!
//! let rock = reg.register("rock1");
//! assert_eq!(rock, IdentityIndex(2));
//! assert_eq!(reg.register("rock1"), rock);
//! assert_eq!(reg.lookup_token(rock), Some("rock1"));
//! ```

use std::collections::HashMap;

use placefield_types::{IdentityIndex, Owner};

/// Append-only, bidirectional token ↔ index map.
#[derive(Debug, Clone)]
pub struct IdentityRegistry {
    /// `tokens[i]` is the token of index `i`; slot 0 is `None`.
    tokens: Vec<Option<String>>,
    indices: HashMap<String, IdentityIndex>,
}

impl IdentityRegistry {
    /// Create a registry holding the "no owner" slot and `self_token` at
    /// [`IdentityIndex::SELF`].
    pub fn new(self_token: &str) -> Self {
        let mut reg = Self {
            tokens: vec![None],
            indices: HashMap::new(),
        };
        reg.register(self_token);
        reg
    }

    /// Return the index of `token`, appending a new entry on first sight.
    pub fn register(&mut self, token: &str) -> IdentityIndex {
        if let Some(&idx) = self.indices.get(token) {
            return idx;
        }
        let idx = IdentityIndex(self.tokens.len() as u32);
        self.tokens.push(Some(token.to_string()));
        self.indices.insert(token.to_string(), idx);
        idx
    }

    pub fn lookup_index(&self, token: &str) -> Option<IdentityIndex> {
        self.indices.get(token).copied()
    }

    /// Token of `index`, or `None` for the "no owner" slot.
    ///
    /// # Panics
    ///
    /// Panics if `index` was never issued by this registry.
    pub fn lookup_token(&self, index: IdentityIndex) -> Option<&str> {
        match self.tokens.get(index.0 as usize) {
            Some(token) => token.as_deref(),
            None => panic!(
                "identity index {index} out of range (registry holds {})",
                self.tokens.len()
            ),
        }
    }

    /// Token of the owner of a cell, `None` for unowned cells.
    pub fn token_of(&self, owner: Owner) -> Option<&str> {
        owner.identity().and_then(|idx| self.lookup_token(idx))
    }

    /// Cell owner value for `index`; index 0 maps to [`Owner::None`].
    ///
    /// # Panics
    ///
    /// Panics if `index` was never issued by this registry.
    pub fn owner_of(&self, index: IdentityIndex) -> Owner {
        assert!(
            (index.0 as usize) < self.tokens.len(),
            "identity index {index} out of range (registry holds {})",
            self.tokens.len()
        );
        Owner::from_raw(index.0)
    }

    /// Index of the agent's own identity.
    pub fn self_index(&self) -> IdentityIndex {
        IdentityIndex::SELF
    }

    /// Number of slots, including "no owner".
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Always `false`: the reserved slots are present from construction.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Iterate over `(index, token)` of every registered identity.
    pub fn iter(&self) -> impl Iterator<Item = (IdentityIndex, &str)> {
        self.tokens
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.as_deref().map(|t| (IdentityIndex(i as u32), t)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_slots() {
        let reg = IdentityRegistry::new("agent");
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.lookup_token(IdentityIndex::NONE), None);
        assert_eq!(reg.lookup_token(IdentityIndex::SELF), Some("agent"));
        assert_eq!(reg.self_index(), IdentityIndex::SELF);
    }

    #[test]
    fn register_is_idempotent() {
        let mut reg = IdentityRegistry::new("agent");
        let a = reg.register("mug");
        let b = reg.register("mug");
        assert_eq!(a, b);
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn indices_are_dense_and_monotonic() {
        let mut reg = IdentityRegistry::new("agent");
        let ids: Vec<u32> = ["a", "b", "c", "a", "d"]
            .iter()
            .map(|t| reg.register(t).0)
            .collect();
        assert_eq!(ids, vec![2, 3, 4, 2, 5]);
        let all: Vec<u32> = reg.iter().map(|(i, _)| i.0).collect();
        assert_eq!(all, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn lookup_unknown_token_is_none() {
        let reg = IdentityRegistry::new("agent");
        assert_eq!(reg.lookup_index("ghost"), None);
    }

    #[test]
    fn token_of_owner() {
        let mut reg = IdentityRegistry::new("agent");
        let idx = reg.register("chair");
        assert_eq!(reg.token_of(Owner::Identity(idx)), Some("chair"));
        assert_eq!(reg.token_of(Owner::None), None);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn lookup_unissued_index_panics() {
        let reg = IdentityRegistry::new("agent");
        reg.lookup_token(IdentityIndex(42));
    }

    #[test]
    fn owner_of_maps_reserved_slot_to_none() {
        let mut reg = IdentityRegistry::new("agent");
        let idx = reg.register("chair");
        assert_eq!(reg.owner_of(IdentityIndex::NONE), Owner::None);
        assert_eq!(reg.owner_of(idx), Owner::Identity(idx));
    }
}
