//! # Comparison Strategies
//!
//! Every tracked value type picks exactly one way to detect change:
//! - [`ByEq`]: the baseline is a clone, compared with `PartialEq`
//! - [`ByHash`]: the baseline is a `u64` content hash
//!
//! The choice is made by the type (`Trackable::Strategy`), so it is fixed
//! at compile time and can never change after a field is registered.
//!
//! ## Hash collisions
//!
//! Two distinct values with the same content hash are treated as
//! unchanged. This is the accepted cost of cheap baselines for large
//! values; a hashed field never falls back to equality.

use std::hash::{Hash, Hasher};

use siphasher::sip::SipHasher13;

/// Fixed keys so content hashes are stable across runs and threads.
const HASH_KEY_0: u64 = 0x7477_696e_6275_6621;
const HASH_KEY_1: u64 = 0x7368_6164_6f77_2121;

/// Runtime tag for the strategy a field uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompareStrategy {
    /// Full-value equality against a cloned baseline.
    Equality,
    /// Content hash against a hashed baseline.
    ContentHash,
}

/// A change-detection strategy for values of type `T`.
pub trait Compare<T: ?Sized> {
    /// What a baseline snapshot stores.
    type Mark: Clone + PartialEq + Send + 'static;

    /// Runtime tag for diagnostics.
    const KIND: CompareStrategy;

    /// Takes a baseline snapshot of `value`.
    fn mark(value: &T) -> Self::Mark;
}

/// Compare by full-value equality.
#[derive(Clone, Copy, Debug, Default)]
pub struct ByEq;

/// Compare by content hash.
#[derive(Clone, Copy, Debug, Default)]
pub struct ByHash;

impl<T: Clone + PartialEq + Send + 'static> Compare<T> for ByEq {
    type Mark = T;
    const KIND: CompareStrategy = CompareStrategy::Equality;

    #[inline]
    fn mark(value: &T) -> T {
        value.clone()
    }
}

impl<T: ContentHash + ?Sized> Compare<T> for ByHash {
    type Mark = u64;
    const KIND: CompareStrategy = CompareStrategy::ContentHash;

    #[inline]
    fn mark(value: &T) -> u64 {
        value.content_hash()
    }
}

/// A deterministic content hash supplied by the value type.
///
/// Implementations must return the same hash for equal content on every
/// thread and every run. [`content_hash_of`] is a ready-made helper for
/// types that already implement [`Hash`].
pub trait ContentHash {
    /// Returns the content hash of `self`.
    fn content_hash(&self) -> u64;
}

/// Hashes any [`Hash`] value with SipHash-1-3 under fixed keys.
#[must_use]
pub fn content_hash_of<H: Hash + ?Sized>(value: &H) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(HASH_KEY_0, HASH_KEY_1);
    value.hash(&mut hasher);
    hasher.finish()
}

/// A value type that can live in a tracked field.
///
/// # Example
///
/// ```rust
/// use twinbuf_core::{content_hash_of, ByHash, ContentHash, Trackable};
///
/// #[derive(Clone, Hash)]
/// struct Palette {
///     stops: Vec<u32>,
/// }
///
/// impl ContentHash for Palette {
///     fn content_hash(&self) -> u64 {
///         content_hash_of(self)
///     }
/// }
///
/// impl Trackable for Palette {
///     type Strategy = ByHash;
/// }
/// ```
pub trait Trackable: Clone + Send + 'static {
    /// How changes to this type are detected.
    type Strategy: Compare<Self>;
}

/// Baseline type of a trackable value.
pub type MarkOf<T> = <<T as Trackable>::Strategy as Compare<T>>::Mark;

/// Takes a baseline snapshot of a trackable value.
#[inline]
pub fn mark_of<T: Trackable>(value: &T) -> MarkOf<T> {
    <T::Strategy as Compare<T>>::mark(value)
}

/// Returns the strategy tag of a trackable type.
#[inline]
#[must_use]
pub fn strategy_of<T: Trackable>() -> CompareStrategy {
    <T::Strategy as Compare<T>>::KIND
}

macro_rules! trackable_by_eq {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Trackable for $ty {
                type Strategy = ByEq;
            }
        )*
    };
}

trackable_by_eq!(
    bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64,
    String,
);

impl<T: Trackable + PartialEq, const N: usize> Trackable for [T; N] {
    type Strategy = ByEq;
}

impl<T: Trackable + PartialEq> Trackable for Option<T> {
    type Strategy = ByEq;
}

impl<A, B> Trackable for (A, B)
where
    A: Trackable + PartialEq,
    B: Trackable + PartialEq,
{
    type Strategy = ByEq;
}

impl<A, B, C> Trackable for (A, B, C)
where
    A: Trackable + PartialEq,
    B: Trackable + PartialEq,
    C: Trackable + PartialEq,
{
    type Strategy = ByEq;
}

impl<A, B, C, D> Trackable for (A, B, C, D)
where
    A: Trackable + PartialEq,
    B: Trackable + PartialEq,
    C: Trackable + PartialEq,
    D: Trackable + PartialEq,
{
    type Strategy = ByEq;
}

impl<T: Hash> ContentHash for Vec<T> {
    fn content_hash(&self) -> u64 {
        content_hash_of(self.as_slice())
    }
}

impl<T: Hash + Clone + Send + 'static> Trackable for Vec<T> {
    type Strategy = ByHash;
}
