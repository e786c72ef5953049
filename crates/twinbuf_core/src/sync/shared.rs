//! The bundle both loops share: coordinator, live region, shadow region.

use std::fmt;

use super::coordinator::{SyncCoordinator, WaitOutcome};
use super::region::{Region, RegionGuard, Side};
use crate::store::DoubleBufferStore;

/// Everything the worker and the editor share for one state object `S`.
///
/// Wrap it in an `Arc` and hand a clone to each loop. Nothing here is
/// global, so independent pairs can run side by side.
///
/// ## Region ownership
///
/// | window            | live region | shadow region |
/// |-------------------|-------------|---------------|
/// | merge window      | worker      | worker        |
/// | tick              | worker      | editor        |
/// | editor frame      | worker      | editor        |
pub struct Shared<S: Send + 'static> {
    coordinator: SyncCoordinator,
    live: Region<S>,
    shadow: Region<DoubleBufferStore<S>>,
}

impl<S: Send + 'static> Shared<S> {
    /// Bundles the live state and its store.
    #[must_use]
    pub fn new(live: S, store: DoubleBufferStore<S>) -> Self {
        Self {
            coordinator: SyncCoordinator::new(),
            live: Region::new("live", live),
            shadow: Region::new("shadow", store),
        }
    }

    /// The frame handshake.
    #[inline]
    #[must_use]
    pub fn coordinator(&self) -> &SyncCoordinator {
        &self.coordinator
    }

    /// Runs `merge` with both buffers held by the worker, inside
    /// `begin_buffer_copy` / `finish_buffer_copy`.
    pub fn merge_window<R, F>(&self, merge: F) -> R
    where
        F: FnOnce(&mut S, &mut DoubleBufferStore<S>) -> R,
    {
        self.coordinator.begin_buffer_copy();
        let result = {
            let mut live = self.live.enter(Side::Worker);
            let mut store = self.shadow.enter(Side::Worker);
            merge(&mut *live, &mut *store)
        };
        self.coordinator.finish_buffer_copy();
        result
    }

    /// Runs `tick` against the live state only.
    pub fn tick<R, F>(&self, tick: F) -> R
    where
        F: FnOnce(&mut S) -> R,
    {
        let mut live = self.live.enter(Side::Worker);
        tick(&mut *live)
    }

    /// Waits for the merge window to end, then enters the shadow region as
    /// the editor. Returns `None` once shutdown has begun.
    pub fn editor_frame(&self) -> Option<RegionGuard<'_, DoubleBufferStore<S>>> {
        match self.coordinator.wait_until_live_buffer_updated() {
            WaitOutcome::Ready => Some(self.shadow.enter(Side::Editor)),
            WaitOutcome::ShuttingDown | WaitOutcome::TimedOut => None,
        }
    }

    /// Enters the live region from outside the loops, e.g. after both
    /// threads have stopped.
    pub fn live(&self) -> RegionGuard<'_, S> {
        self.live.enter(Side::Worker)
    }

    /// Enters the shadow region from outside the loops, e.g. to declare
    /// fields before the run starts.
    pub fn store(&self) -> RegionGuard<'_, DoubleBufferStore<S>> {
        self.shadow.enter(Side::Editor)
    }

    /// Overlaps observed on either region. Zero in a correct run.
    #[must_use]
    pub fn overlaps(&self) -> u64 {
        self.live.overlaps() + self.shadow.overlaps()
    }

    /// Consumes the bundle and returns the live state and the store.
    pub fn into_parts(self) -> (S, DoubleBufferStore<S>) {
        (self.live.into_inner(), self.shadow.into_inner())
    }
}

impl<S: Send + 'static> fmt::Debug for Shared<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("coordinator", &self.coordinator)
            .field("live", &self.live)
            .field("shadow", &self.shadow)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct Dial {
        value: i32,
    }

    #[test]
    fn test_single_threaded_cycle_through_regions() {
        let live = Dial { value: 1 };
        let store = DoubleBufferStore::new(&live);
        let shared = Shared::new(live, store);
        let value = shared
            .store()
            .declare("value", |d: &Dial| &d.value, |d| &mut d.value);

        // Priming
        shared.merge_window(|live, store| store.snapshot_live_values(live));

        {
            let mut store = shared.editor_frame().unwrap();
            store.commit_staged(value, 10);
        }
        shared.tick(|live| live.value = -3);
        shared.merge_window(|live, store| {
            store.merge(live);
            store.snapshot_live_values(live);
        });

        assert_eq!(shared.live().value, 10);
        assert_eq!(*shared.store().peek(value), 10);
        assert_eq!(shared.overlaps(), 0);

        let (live, store) = shared.into_parts();
        assert_eq!(live.value, 10);
        assert_eq!(store.stats().merges, 1);
    }

    #[test]
    fn test_editor_frame_is_none_after_quit() {
        let shared = Shared::new(Dial::default(), DoubleBufferStore::new(&Dial::default()));
        shared.coordinator().quit();
        assert!(shared.editor_frame().is_none());
    }
}
