//! # Guarded Regions
//!
//! A region is one resource that the protocol hands back and forth between
//! the worker and the editor. Correct driving code never has both threads
//! inside the same region at once, so the lock inside is never contended.
//!
//! Entering a region that is already held means the handshake was violated.
//! The region counts the overlap and logs it. Debug builds then abort the
//! offending thread; release builds block until the holder leaves.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use parking_lot::{Mutex, MutexGuard};

/// Which thread of the pair is acting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Side {
    /// The thread that owns the live state and runs ticks.
    Worker = 1,
    /// The thread that owns the shadow state and runs frames.
    Editor = 2,
}

impl Side {
    const NONE: u8 = 0;

    fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::Worker),
            2 => Some(Self::Editor),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Worker => f.write_str("worker"),
            Self::Editor => f.write_str("editor"),
        }
    }
}

/// An exclusively-owned resource with overlap instrumentation.
pub struct Region<T> {
    name: &'static str,
    value: Mutex<T>,
    holder: AtomicU8,
    overlaps: AtomicU64,
}

impl<T> Region<T> {
    /// Wraps `value` in a named region.
    #[must_use]
    pub fn new(name: &'static str, value: T) -> Self {
        Self {
            name,
            value: Mutex::new(value),
            holder: AtomicU8::new(Side::NONE),
            overlaps: AtomicU64::new(0),
        }
    }

    /// Enters the region on behalf of `side`.
    ///
    /// # Panics
    ///
    /// In debug builds, if another thread is already inside the region.
    pub fn enter(&self, side: Side) -> RegionGuard<'_, T> {
        let guard = match self.value.try_lock() {
            Some(guard) => guard,
            None => {
                let holder = Side::from_raw(self.holder.load(Ordering::Acquire));
                self.overlaps.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    region = self.name,
                    entering = %side,
                    holder = ?holder,
                    "region overlap: handshake let two threads in"
                );
                if cfg!(debug_assertions) {
                    panic!(
                        "region overlap: {side} entered '{}' while held by {holder:?}",
                        self.name
                    );
                }
                self.value.lock()
            }
        };
        self.holder.store(side as u8, Ordering::Release);
        RegionGuard {
            guard,
            holder: &self.holder,
        }
    }

    /// Returns the side currently inside the region, if any.
    #[must_use]
    pub fn holder(&self) -> Option<Side> {
        Side::from_raw(self.holder.load(Ordering::Acquire))
    }

    /// Number of overlapping entries ever observed. Zero in a correct run.
    #[must_use]
    pub fn overlaps(&self) -> u64 {
        self.overlaps.load(Ordering::Relaxed)
    }

    /// Region name used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Consumes the region and returns the value.
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T> fmt::Debug for Region<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("name", &self.name)
            .field("holder", &self.holder())
            .field("overlaps", &self.overlaps())
            .finish_non_exhaustive()
    }
}

/// Access to a region's value. Leaving the scope leaves the region.
pub struct RegionGuard<'a, T> {
    guard: MutexGuard<'a, T>,
    holder: &'a AtomicU8,
}

impl<T> Deref for RegionGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for RegionGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T> Drop for RegionGuard<'_, T> {
    fn drop(&mut self) {
        // Cleared while the lock is still held
        self.holder.store(Side::NONE, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_tracks_holder() {
        let region = Region::new("live", 5u32);
        assert_eq!(region.holder(), None);

        {
            let mut guard = region.enter(Side::Worker);
            *guard += 1;
            assert_eq!(region.holder(), Some(Side::Worker));
        }

        assert_eq!(region.holder(), None);
        assert_eq!(*region.enter(Side::Editor), 6);
        assert_eq!(region.overlaps(), 0);
        assert_eq!(region.into_inner(), 6);
    }

    #[test]
    fn test_sequential_hand_off_is_not_an_overlap() {
        let region = Region::new("shadow", Vec::<u8>::new());
        for i in 0..10u8 {
            let side = if i % 2 == 0 { Side::Worker } else { Side::Editor };
            region.enter(side).push(i);
        }
        assert_eq!(region.overlaps(), 0);
        assert_eq!(region.enter(Side::Editor).len(), 10);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "region overlap")]
    fn test_overlap_is_fatal_in_debug() {
        let region = Region::new("live", 0u32);
        let _worker = region.enter(Side::Worker);
        let _editor = region.enter(Side::Editor);
    }
}
