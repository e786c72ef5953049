//! # Tracked Field
//!
//! One synchronized value slot. The shadow value itself lives in the
//! store's shadow copy of the state; the field keeps everything needed to
//! decide which side changed it:
//!
//! ```text
//!   live state ──snapshot_live──> live_baseline
//!   shadow state ─snapshot_shadow─> shadow_baseline
//!
//!   commit:  shadow != shadow_baseline  => changed_this_cycle
//!   merge:   changed_this_cycle         => shadow ──> live
//!            !edited && live != live_baseline => live ──> shadow
//!            !edited && fresh && live != shadow => live ──> shadow
//! ```
//!
//! A `TrackedField` takes no locks. Callers guarantee that the live and
//! shadow copies they pass in are not touched by another thread for the
//! duration of the call (see [`crate::sync`]).

use std::fmt;

use super::compare::{mark_of, strategy_of, CompareStrategy, MarkOf, Trackable};
use super::id::FieldKey;

/// One synchronized value slot with two baselines.
pub struct TrackedField<S, T: Trackable> {
    key: FieldKey<S, T>,
    shadow_baseline: MarkOf<T>,
    /// `None` until the first live snapshot after registration.
    live_baseline: Option<MarkOf<T>>,
    changed_this_cycle: bool,
    /// Edit already pushed into live this cycle.
    applied: bool,
    /// Pulled or viewed by the editor since the last merge.
    pulled: bool,
    /// Registered since the last merge; compared against live directly.
    fresh: bool,
}

impl<S, T: Trackable> TrackedField<S, T> {
    /// Registers a field against the current shadow state.
    ///
    /// The shadow baseline is taken immediately so that edits made during
    /// the registering frame are detected by the first commit.
    #[must_use]
    pub fn new(key: FieldKey<S, T>, shadow: &S) -> Self {
        Self {
            key,
            shadow_baseline: mark_of(key.read(shadow)),
            live_baseline: None,
            changed_this_cycle: false,
            applied: false,
            pulled: false,
            fresh: true,
        }
    }

    /// Returns the key this field was registered with.
    #[inline]
    #[must_use]
    pub fn key(&self) -> FieldKey<S, T> {
        self.key
    }

    /// Returns the comparison strategy bound at registration.
    #[inline]
    #[must_use]
    pub fn strategy(&self) -> CompareStrategy {
        strategy_of::<T>()
    }

    /// Returns whether the last commit saw an edit that is still pending.
    #[inline]
    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.changed_this_cycle
    }

    /// Returns the editor's mutable view of the shadow value.
    pub fn pull<'s>(&mut self, shadow: &'s mut S) -> &'s mut T {
        self.pulled = true;
        self.key.write(shadow)
    }

    /// Compares the shadow value against its baseline and records the
    /// result. Never touches the live state.
    ///
    /// Returns the new `changed_this_cycle` flag.
    pub fn commit(&mut self, shadow: &S) -> bool {
        self.changed_this_cycle = self.shadow_changed(shadow);
        self.changed_this_cycle
    }

    /// Baselines the live value for "did the worker change this" detection.
    pub fn snapshot_live(&mut self, live: &S) {
        self.live_baseline = Some(mark_of(self.key.read(live)));
    }

    /// Baselines the shadow value for next cycle's edit detection and
    /// closes the cycle's edit bookkeeping.
    pub fn snapshot_shadow(&mut self, shadow: &S) {
        self.shadow_baseline = mark_of(self.key.read(shadow));
        self.changed_this_cycle = false;
        self.applied = false;
        self.fresh = false;
    }

    /// Returns whether the live value moved since the last live snapshot.
    ///
    /// A field that has never been live-snapshotted counts as changed.
    #[must_use]
    pub fn live_changed(&self, live: &S) -> bool {
        match &self.live_baseline {
            Some(baseline) => mark_of(self.key.read(live)) != *baseline,
            None => true,
        }
    }

    /// Returns whether the shadow value moved since the last shadow snapshot.
    #[must_use]
    pub fn shadow_changed(&self, shadow: &S) -> bool {
        mark_of(self.key.read(shadow)) != self.shadow_baseline
    }

    /// One-line diagnostic rendering: name, slot, strategy and changed flag.
    #[must_use]
    pub fn describe(&self) -> String {
        format!(
            "{}#{} [{:?}] changed={}",
            self.key.name(),
            self.key.id().index(),
            self.strategy(),
            self.changed_this_cycle
        )
    }

    /// Copies shadow -> live if the editor committed an edit.
    ///
    /// Applies at most once per cycle; returns whether a copy happened.
    pub fn push_shadow_to_live_if_changed(&mut self, shadow: &S, live: &mut S) -> bool {
        if !self.changed_this_cycle {
            return false;
        }
        *self.key.write(live) = self.key.read(shadow).clone();
        self.changed_this_cycle = false;
        self.applied = true;
        true
    }

    /// Copies live -> shadow if the editor left this field alone and the
    /// worker moved it. Returns whether a copy happened.
    ///
    /// A field registered since the last merge has no live baseline yet and
    /// is compared against live directly.
    pub fn push_live_to_shadow_if_unedited(&mut self, live: &S, shadow: &mut S) -> bool {
        if self.changed_this_cycle || self.applied {
            return false;
        }
        let stale = if self.fresh {
            mark_of(self.key.read(live)) != mark_of(self.key.read(shadow))
        } else {
            self.live_changed(live)
        };
        if !stale {
            return false;
        }
        *self.key.write(shadow) = self.key.read(live).clone();
        true
    }

    /// Overwrites the shadow value with live, unconditionally.
    pub fn refresh_shadow(&self, live: &S, shadow: &mut S) {
        *self.key.write(shadow) = self.key.read(live).clone();
    }
}

impl<S, T: Trackable> fmt::Debug for TrackedField<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedField")
            .field("name", &self.key.name())
            .field("id", &self.key.id())
            .field("strategy", &self.strategy())
            .field("changed_this_cycle", &self.changed_this_cycle)
            .field("applied", &self.applied)
            .finish_non_exhaustive()
    }
}

/// Per-field capability set used by the store.
///
/// One implementation per concrete value type is chosen at registration
/// (`TrackedField<S, T>`); the store only ever sees this trait.
pub(crate) trait FieldOps<S>: Send {
    fn name(&self) -> &'static str;
    fn is_ephemeral(&self) -> bool;
    fn is_changed(&self) -> bool;
    fn mark_pulled(&mut self);
    fn take_pulled(&mut self) -> bool;
    fn commit(&mut self, shadow: &S) -> bool;
    fn snapshot_live(&mut self, live: &S);
    fn snapshot_shadow(&mut self, shadow: &S);
    fn live_changed(&self, live: &S) -> bool;
    fn shadow_changed(&self, shadow: &S) -> bool;
    fn push_shadow_to_live_if_changed(&mut self, shadow: &S, live: &mut S) -> bool;
    fn push_live_to_shadow_if_unedited(&mut self, live: &S, shadow: &mut S) -> bool;
    fn refresh_shadow(&self, live: &S, shadow: &mut S);
    fn describe(&self) -> String;
}

impl<S, T: Trackable> FieldOps<S> for TrackedField<S, T> {
    fn name(&self) -> &'static str {
        self.key.name()
    }

    fn is_ephemeral(&self) -> bool {
        self.key.is_ephemeral()
    }

    fn is_changed(&self) -> bool {
        self.changed_this_cycle
    }

    fn mark_pulled(&mut self) {
        self.pulled = true;
    }

    fn take_pulled(&mut self) -> bool {
        std::mem::take(&mut self.pulled)
    }

    fn commit(&mut self, shadow: &S) -> bool {
        TrackedField::commit(self, shadow)
    }

    fn snapshot_live(&mut self, live: &S) {
        TrackedField::snapshot_live(self, live);
    }

    fn snapshot_shadow(&mut self, shadow: &S) {
        TrackedField::snapshot_shadow(self, shadow);
    }

    fn live_changed(&self, live: &S) -> bool {
        TrackedField::live_changed(self, live)
    }

    fn shadow_changed(&self, shadow: &S) -> bool {
        TrackedField::shadow_changed(self, shadow)
    }

    fn push_shadow_to_live_if_changed(&mut self, shadow: &S, live: &mut S) -> bool {
        TrackedField::push_shadow_to_live_if_changed(self, shadow, live)
    }

    fn push_live_to_shadow_if_unedited(&mut self, live: &S, shadow: &mut S) -> bool {
        TrackedField::push_live_to_shadow_if_unedited(self, live, shadow)
    }

    fn refresh_shadow(&self, live: &S, shadow: &mut S) {
        TrackedField::refresh_shadow(self, live, shadow);
    }

    fn describe(&self) -> String {
        TrackedField::describe(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::compare::{ByHash, ContentHash};
    use crate::field::id::FieldId;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Sim {
        speed: f32,
        tag: Tag,
    }

    /// Hash ignores everything but the length of `label`.
    #[derive(Clone, Debug, Default, PartialEq)]
    struct Tag {
        label: String,
    }

    impl ContentHash for Tag {
        fn content_hash(&self) -> u64 {
            self.label.len() as u64
        }
    }

    impl Trackable for Tag {
        type Strategy = ByHash;
    }

    fn speed_key() -> FieldKey<Sim, f32> {
        FieldKey::new(FieldId::new(0, 1), "speed", false, |s| &s.speed, |s| &mut s.speed)
    }

    fn tag_key() -> FieldKey<Sim, Tag> {
        FieldKey::new(FieldId::new(1, 1), "tag", false, |s| &s.tag, |s| &mut s.tag)
    }

    #[test]
    fn test_commit_detects_edit() {
        let mut shadow = Sim::default();
        let mut field = TrackedField::new(speed_key(), &shadow);

        assert!(!field.commit(&shadow));
        *field.pull(&mut shadow) = 2.5;
        assert!(field.commit(&shadow));
    }

    #[test]
    fn test_commit_is_idempotent() {
        let mut shadow = Sim::default();
        let mut live = Sim::default();
        let mut field = TrackedField::new(speed_key(), &shadow);
        field.snapshot_live(&live);

        *field.pull(&mut shadow) = 3.0;
        assert!(field.commit(&shadow));
        assert!(field.commit(&shadow));
        assert!(field.is_changed());

        assert!(field.push_shadow_to_live_if_changed(&shadow, &mut live));
        // Second push in the same cycle is a no-op
        live.speed = 9.0;
        assert!(!field.push_shadow_to_live_if_changed(&shadow, &mut live));
        assert!((live.speed - 9.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_reverted_edit_is_not_a_change() {
        let mut shadow = Sim::default();
        let mut field = TrackedField::new(speed_key(), &shadow);

        *field.pull(&mut shadow) = 1.0;
        assert!(field.commit(&shadow));
        *field.pull(&mut shadow) = 0.0;
        assert!(!field.commit(&shadow));
    }

    #[test]
    fn test_unedited_field_follows_live() {
        let mut shadow = Sim::default();
        let mut live = Sim::default();
        let mut field = TrackedField::new(speed_key(), &shadow);

        field.snapshot_live(&live);
        live.speed = 1.57;

        assert!(field.live_changed(&live));
        assert!(field.push_live_to_shadow_if_unedited(&live, &mut shadow));
        assert!((shadow.speed - 1.57).abs() < f32::EPSILON);
    }

    #[test]
    fn test_edited_field_is_not_overwritten_by_live() {
        let mut shadow = Sim::default();
        let mut live = Sim::default();
        let mut field = TrackedField::new(speed_key(), &shadow);
        field.snapshot_live(&live);

        *field.pull(&mut shadow) = 2.0;
        field.commit(&shadow);
        live.speed = 5.0;

        assert!(field.push_shadow_to_live_if_changed(&shadow, &mut live));
        assert!(!field.push_live_to_shadow_if_unedited(&live, &mut shadow));
        assert!((live.speed - 2.0).abs() < f32::EPSILON);
        assert!((shadow.speed - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_unsnapshotted_live_counts_as_changed() {
        let mut shadow = Sim::default();
        let live = Sim {
            speed: 4.0,
            ..Sim::default()
        };
        let mut field = TrackedField::new(speed_key(), &shadow);

        assert!(field.live_changed(&live));
        assert!(field.push_live_to_shadow_if_unedited(&live, &mut shadow));
        assert!((shadow.speed - 4.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_snapshot_shadow_closes_the_cycle() {
        let mut shadow = Sim::default();
        let mut field = TrackedField::new(speed_key(), &shadow);

        *field.pull(&mut shadow) = 1.0;
        field.commit(&shadow);
        field.snapshot_shadow(&shadow);

        assert!(!field.is_changed());
        assert!(!field.shadow_changed(&shadow));
    }

    #[test]
    fn test_describe_names_the_field() {
        let shadow = Sim::default();
        let field = TrackedField::new(speed_key(), &shadow);
        assert_eq!(field.describe(), "speed#0 [Equality] changed=false");
    }

    #[test]
    fn test_hash_collision_is_documented_as_unchanged() {
        let mut shadow = Sim::default();
        shadow.tag.label = "abc".into();
        let mut field = TrackedField::new(tag_key(), &shadow);
        assert_eq!(field.strategy(), CompareStrategy::ContentHash);

        // Same length, different content: collides, treated as unchanged
        field.pull(&mut shadow).label = "xyz".into();
        assert!(!field.commit(&shadow));

        // Different length: detected
        field.pull(&mut shadow).label = "abcd".into();
        assert!(field.commit(&shadow));
    }
}
