//! # Field Identity
//!
//! Fields are named by a registered slot, never by a memory address.
//! A field id is split into two parts:
//! - Lower 32 bits: slot index inside the owning store
//! - Upper 32 bits: id of the store that minted the slot

use std::fmt;

/// Unique identifier for a tracked field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct FieldId(u64);

impl FieldId {
    /// Creates a new field ID from a slot index and a store id.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, store: u32) -> Self {
        Self(((store as u64) << 32) | (index as u64))
    }

    /// Returns the slot index portion of the field ID.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Returns the id of the store that minted this field.
    #[inline]
    #[must_use]
    pub const fn store(self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.store(), self.index())
    }
}

/// Typed handle to one logical value of a state object `S`.
///
/// The key carries the value type `T`, so a registered identity can never
/// be pulled back as a different type. It also carries the lens pair that
/// locates the value inside any copy of `S` (live or shadow).
///
/// Keys are minted by [`DoubleBufferStore::declare`](crate::DoubleBufferStore::declare)
/// and are cheap to copy into both the worker and the editor.
pub struct FieldKey<S, T> {
    id: FieldId,
    name: &'static str,
    ephemeral: bool,
    get: fn(&S) -> &T,
    get_mut: fn(&mut S) -> &mut T,
}

impl<S, T> FieldKey<S, T> {
    pub(crate) const fn new(
        id: FieldId,
        name: &'static str,
        ephemeral: bool,
        get: fn(&S) -> &T,
        get_mut: fn(&mut S) -> &mut T,
    ) -> Self {
        Self {
            id,
            name,
            ephemeral,
            get,
            get_mut,
        }
    }

    /// Returns the slot identity of this field.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> FieldId {
        self.id
    }

    /// Returns the diagnostic name given at declaration.
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns whether the shadow side of this field may be released
    /// between cycles.
    #[inline]
    #[must_use]
    pub const fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }

    /// Reads the value out of one copy of the state.
    #[inline]
    pub fn read<'a>(&self, state: &'a S) -> &'a T {
        (self.get)(state)
    }

    /// Mutably borrows the value inside one copy of the state.
    #[inline]
    pub fn write<'a>(&self, state: &'a mut S) -> &'a mut T {
        (self.get_mut)(state)
    }
}

impl<S, T> Clone for FieldKey<S, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, T> Copy for FieldKey<S, T> {}

impl<S, T> fmt::Debug for FieldKey<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldKey")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("ephemeral", &self.ephemeral)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pair {
        a: i32,
        b: i32,
    }

    #[test]
    fn test_field_id_roundtrip() {
        let id = FieldId::new(12345, 67890);
        assert_eq!(id.index(), 12345);
        assert_eq!(id.store(), 67890);
        assert_eq!(id.to_string(), "67890:12345");
    }

    #[test]
    fn test_key_lens_reads_and_writes() {
        let key: FieldKey<Pair, i32> =
            FieldKey::new(FieldId::new(1, 1), "b", false, |p| &p.b, |p| &mut p.b);
        let mut pair = Pair { a: 1, b: 2 };

        assert_eq!(*key.read(&pair), 2);
        *key.write(&mut pair) = 7;
        assert_eq!(pair.b, 7);
        assert_eq!(pair.a, 1);

        // Copy, not move
        let copy = key;
        assert_eq!(copy.id(), key.id());
    }
}
