//! # Double-Buffer Store
//!
//! Owns every tracked field of one logical state object `S`, plus the
//! editor's shadow copy of `S` and the deferred-task queue.
//!
//! ## Architecture
//!
//! ```text
//!        Worker thread                          Editor thread
//!   ┌──────────────────┐                   ┌──────────────────────┐
//!   │   live state S   │                   │  DoubleBufferStore   │
//!   │  (authoritative) │                   │  ┌────────────────┐  │
//!   └────────┬─────────┘                   │  │ shadow copy S  │  │
//!            │                             │  └────────────────┘  │
//!            │        merge window         │  ┌────────────────┐  │
//!            └────────────────────────────►│  │ TrackedField[] │  │
//!                (both regions held by     │  └────────────────┘  │
//!                 the worker thread)       │  ┌────────────────┐  │
//!                                          │  │ deferred tasks │  │
//!                                          │  └────────────────┘  │
//!                                          └──────────────────────┘
//! ```
//!
//! ## Per-cycle protocol
//!
//! 1. `snapshot_live_values` - baseline for worker-change detection
//! 2. worker tick mutates live state
//! 3. `push_edits_into_live` - editor edits win
//! 4. `push_live_into_unedited_shadow` - worker changes become visible,
//!    including in declared slots that hold no tracking state
//! 5. `snapshot_shadow_values` - baseline for next cycle's edits
//! 6. `run_deferred_tasks` - then clear the queue
//!
//! [`DoubleBufferStore::merge`] runs steps 3 to 6 in order.
//!
//! The store holds no locks. The caller guarantees that nobody else touches
//! the live state or the store while a merge runs (see [`crate::sync`]).

mod guard;
mod stats;

pub use guard::CommitGuard;
pub use stats::{StoreStats, SyncStats};

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::field::{mark_of, FieldId, FieldKey, FieldOps, Trackable, TrackedField};

/// Process-unique store ids, so keys from one store are rejected by another.
static NEXT_STORE_ID: AtomicU32 = AtomicU32::new(1);

/// A callback run once against the live state inside the merge window.
pub type DeferredTask<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;

/// Copies one field from live into shadow when the two differ. Returns
/// true if it copied.
type Mirror<S> = Box<dyn Fn(&S, &mut S) -> bool + Send>;

/// One declared slot. `field` is `None` until the slot is registered, and
/// again after an ephemeral release. While it is `None`, `mirror` keeps the
/// shadow value in step with live.
struct Slot<S> {
    name: &'static str,
    field: Option<Box<dyn FieldOps<S>>>,
    mirror: Mirror<S>,
}

impl<S: 'static> Slot<S> {
    fn new<T: Trackable>(key: FieldKey<S, T>) -> Self {
        let mirror = move |live: &S, shadow: &mut S| {
            let current = key.read(live);
            if mark_of(current) == mark_of(key.read(shadow)) {
                return false;
            }
            *key.write(shadow) = current.clone();
            true
        };
        Self {
            name: key.name(),
            field: None,
            mirror: Box::new(mirror),
        }
    }
}

/// Field-level double buffer for a state object `S`.
///
/// ## Usage
///
/// ```rust
/// use twinbuf_core::DoubleBufferStore;
///
/// #[derive(Clone, Default)]
/// struct Orbit { speed: f32, angle: f32 }
///
/// let mut live = Orbit { speed: 1.0, angle: 0.0 };
/// let mut store = DoubleBufferStore::new(&live);
/// let speed = store.declare("speed", |o| &o.speed, |o| &mut o.speed);
/// let angle = store.declare("angle", |o| &o.angle, |o| &mut o.angle);
/// store.register(angle);
///
/// // Editor frame
/// *store.pull(speed) = 2.5;
/// store.commit(speed);
///
/// // Worker cycle
/// store.run_cycle(&mut live, |o| o.angle = 1.57);
///
/// assert_eq!(live.speed, 2.5);
/// assert_eq!(*store.peek(angle), 1.57);
/// ```
pub struct DoubleBufferStore<S> {
    id: u32,
    shadow: S,
    slots: Vec<Slot<S>>,
    deferred: Vec<DeferredTask<S>>,
    last_merge: SyncStats,
    totals: StoreStats,
}

impl<S: Send + 'static> DoubleBufferStore<S> {
    /// Creates a store whose shadow copy starts as a clone of `initial`.
    #[must_use]
    pub fn new(initial: &S) -> Self
    where
        S: Clone,
    {
        Self::from_shadow(initial.clone())
    }

    /// Creates a store that takes ownership of `shadow` as its shadow copy.
    #[must_use]
    pub fn from_shadow(shadow: S) -> Self {
        Self {
            id: NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed),
            shadow,
            slots: Vec::new(),
            deferred: Vec::new(),
            last_merge: SyncStats::default(),
            totals: StoreStats::default(),
        }
    }

    // =========================================================================
    // Declaration and registration
    // =========================================================================

    /// Declares a field and returns its typed key.
    ///
    /// Declaring only reserves the slot. The field is registered on first
    /// [`pull`](Self::pull), [`view`](Self::view), [`commit`](Self::commit)
    /// or an explicit [`register`](Self::register).
    pub fn declare<T: Trackable>(
        &mut self,
        name: &'static str,
        get: fn(&S) -> &T,
        get_mut: fn(&mut S) -> &mut T,
    ) -> FieldKey<S, T> {
        self.declare_with(name, false, get, get_mut)
    }

    /// Declares a field whose tracking state may be released between cycles
    /// when the editor does not touch it.
    pub fn declare_ephemeral<T: Trackable>(
        &mut self,
        name: &'static str,
        get: fn(&S) -> &T,
        get_mut: fn(&mut S) -> &mut T,
    ) -> FieldKey<S, T> {
        self.declare_with(name, true, get, get_mut)
    }

    fn declare_with<T: Trackable>(
        &mut self,
        name: &'static str,
        ephemeral: bool,
        get: fn(&S) -> &T,
        get_mut: fn(&mut S) -> &mut T,
    ) -> FieldKey<S, T> {
        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        assert!(index < u32::MAX, "Field slot space exhausted");
        let key = FieldKey::new(FieldId::new(index, self.id), name, ephemeral, get, get_mut);
        self.slots.push(Slot::new(key));
        key
    }

    /// Registers a field if it is not registered yet.
    ///
    /// Idempotent: registering the same key twice never creates a second
    /// entry. Returns true if this call created the entry.
    pub fn register<T: Trackable>(&mut self, key: FieldKey<S, T>) -> bool {
        let index = self.slot_index(key.id());
        let slot = &mut self.slots[index];
        if slot.field.is_some() {
            return false;
        }

        let field = TrackedField::new(key, &self.shadow);
        tracing::trace!(
            field = key.name(),
            index,
            strategy = ?field.strategy(),
            "registered tracked field"
        );
        slot.field = Some(Box::new(field));
        true
    }

    /// Returns the editor's mutable view of a field, registering it lazily.
    ///
    /// The caller must [`commit`](Self::commit) the field afterwards (or use
    /// [`scoped`](Self::scoped)) for an edit to reach the live state.
    pub fn pull<T: Trackable>(&mut self, key: FieldKey<S, T>) -> &mut T {
        self.touch(key);
        key.write(&mut self.shadow)
    }

    /// Returns the editor's read-only view of a field, registering it lazily.
    pub fn view<T: Trackable>(&mut self, key: FieldKey<S, T>) -> &T {
        self.touch(key);
        key.read(&self.shadow)
    }

    /// Reads the shadow value without registering or touching the field.
    #[must_use]
    pub fn peek<T: Trackable>(&self, key: FieldKey<S, T>) -> &T {
        self.check_key(key.id());
        key.read(&self.shadow)
    }

    /// Compares a field's shadow value against its baseline and records
    /// whether the editor changed it this cycle.
    ///
    /// Never touches the live state. Returns the changed flag.
    pub fn commit<T: Trackable>(&mut self, key: FieldKey<S, T>) -> bool {
        self.register(key);
        let index = self.slot_index(key.id());
        match self.slots[index].field.as_mut() {
            Some(field) => field.commit(&self.shadow),
            None => false,
        }
    }

    /// Writes a staged value into the shadow copy and commits it.
    pub fn commit_staged<T: Trackable>(&mut self, key: FieldKey<S, T>, value: T) -> bool {
        *self.pull(key) = value;
        self.commit(key)
    }

    /// Returns a guard that derefs to the shadow value and commits on drop.
    pub fn scoped<T: Trackable>(&mut self, key: FieldKey<S, T>) -> CommitGuard<'_, S, T> {
        self.touch(key);
        CommitGuard::new(self, key)
    }

    /// Returns whether a field has a committed edit waiting for the merge.
    #[must_use]
    pub fn is_changed<T: Trackable>(&self, key: FieldKey<S, T>) -> bool {
        let index = self.slot_index(key.id());
        self.slots[index]
            .field
            .as_ref()
            .is_some_and(|field| field.is_changed())
    }

    /// Returns whether a field currently holds tracking state.
    #[must_use]
    pub fn is_registered<T: Trackable>(&self, key: FieldKey<S, T>) -> bool {
        let index = self.slot_index(key.id());
        self.slots[index].field.is_some()
    }

    // =========================================================================
    // Deferred tasks
    // =========================================================================

    /// Queues a callback to run once against the live state inside the next
    /// merge window, after the fields are reconciled.
    pub fn schedule<F>(&mut self, task: F)
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        self.deferred.push(Box::new(task));
    }

    /// Number of tasks waiting for the next merge window.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.deferred.len()
    }

    // =========================================================================
    // Per-cycle protocol (worker side, merge window only)
    // =========================================================================

    /// Step 1: baselines every registered field against the live state.
    pub fn snapshot_live_values(&mut self, live: &S) {
        for field in self.registered_mut() {
            field.snapshot_live(live);
        }
    }

    /// Step 3: copies every committed edit into the live state.
    ///
    /// Returns how many fields were copied.
    pub fn push_edits_into_live(&mut self, live: &mut S) -> usize {
        let shadow = &self.shadow;
        let mut pushed = 0;
        for field in self.slots.iter_mut().filter_map(|s| s.field.as_mut()) {
            if field.push_shadow_to_live_if_changed(shadow, live) {
                pushed += 1;
            }
        }
        pushed
    }

    /// Step 4: copies worker changes into every field the editor left alone.
    ///
    /// Declared slots without tracking state (never registered, or released)
    /// are mirrored from live directly, so a later pull starts from the
    /// worker's current value.
    ///
    /// Returns how many slots were copied.
    pub fn push_live_into_unedited_shadow(&mut self, live: &S) -> usize {
        let (pushed, mirrored) = self.reconcile_shadow(live);
        pushed + mirrored
    }

    /// Step 5: baselines every registered field against the shadow state.
    pub fn snapshot_shadow_values(&mut self) {
        let shadow = &self.shadow;
        for field in self.slots.iter_mut().filter_map(|s| s.field.as_mut()) {
            field.snapshot_shadow(shadow);
        }
    }

    /// Step 6: runs the queued tasks against the live state, then clears
    /// the queue.
    ///
    /// Task writes to tracked fields are carried into the shadow copy before
    /// returning, so the editor sees them in its next frame.
    ///
    /// Returns how many tasks ran.
    pub fn run_deferred_tasks(&mut self, live: &mut S) -> usize {
        if self.deferred.is_empty() {
            return 0;
        }

        let tasks = std::mem::take(&mut self.deferred);
        let count = tasks.len();

        self.snapshot_live_values(live);
        for task in tasks {
            task(&mut *live);
        }
        self.push_live_into_unedited_shadow(live);
        self.snapshot_shadow_values();

        count
    }

    /// Returns true if any registered field moved in live since step 1.
    #[must_use]
    pub fn has_live_changed(&self, live: &S) -> bool {
        self.registered().any(|field| field.live_changed(live))
    }

    /// Returns true if any registered field moved in shadow since step 5.
    #[must_use]
    pub fn has_shadow_changed(&self) -> bool {
        self.registered()
            .any(|field| field.shadow_changed(&self.shadow))
    }

    /// Runs steps 3 to 6 in order, then releases idle ephemeral fields.
    pub fn merge(&mut self, live: &mut S) -> SyncStats {
        let mut stats = SyncStats {
            fields: self.len(),
            ..SyncStats::default()
        };

        stats.pushed_to_live = self.push_edits_into_live(live);
        (stats.pushed_to_shadow, stats.mirrored) = self.reconcile_shadow(live);
        self.snapshot_shadow_values();
        stats.tasks_run = self.run_deferred_tasks(live);
        stats.released = self.release_idle_ephemerals(live);

        tracing::debug!(
            store = self.id,
            fields = stats.fields,
            to_live = stats.pushed_to_live,
            to_shadow = stats.pushed_to_shadow,
            mirrored = stats.mirrored,
            tasks = stats.tasks_run,
            released = stats.released,
            "merge complete"
        );

        self.last_merge = stats;
        self.totals.record(&stats);
        stats
    }

    /// Runs one complete cycle on the calling thread: snapshot, `tick`,
    /// merge.
    pub fn run_cycle<F>(&mut self, live: &mut S, tick: F) -> SyncStats
    where
        F: FnOnce(&mut S),
    {
        self.snapshot_live_values(live);
        tick(&mut *live);
        self.merge(live)
    }

    /// Drops the tracking state of every ephemeral field the editor did not
    /// pull or view since the last merge. The shadow value is refreshed
    /// from live first. Until the next pull registers it again, step 4
    /// mirrors the slot like any other unregistered one.
    fn release_idle_ephemerals(&mut self, live: &S) -> usize {
        let shadow = &mut self.shadow;
        let mut released = 0;
        for slot in &mut self.slots {
            let Some(field) = slot.field.as_mut() else {
                continue;
            };
            if !field.is_ephemeral() {
                continue;
            }
            if field.take_pulled() {
                continue;
            }
            field.refresh_shadow(live, shadow);
            tracing::trace!(field = field.name(), "released ephemeral field");
            slot.field = None;
            released += 1;
        }
        released
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Number of registered fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registered().count()
    }

    /// Returns true if no field is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of declared slots, registered or not.
    #[must_use]
    pub fn declared(&self) -> usize {
        self.slots.len()
    }

    /// Names of the registered fields, in slot order.
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.slots
            .iter()
            .filter(|slot| slot.field.is_some())
            .map(|slot| slot.name)
    }

    /// One diagnostic line per registered field.
    #[must_use]
    pub fn describe_fields(&self) -> Vec<String> {
        self.registered().map(|field| field.describe()).collect()
    }

    /// Statistics of the most recent merge.
    #[must_use]
    pub fn last_merge(&self) -> SyncStats {
        self.last_merge
    }

    /// Totals across every merge.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        self.totals
    }

    /// Read-only access to the whole shadow copy.
    #[must_use]
    pub fn shadow(&self) -> &S {
        &self.shadow
    }

    pub(crate) fn shadow_mut(&mut self) -> &mut S {
        &mut self.shadow
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Returns (registered fields pushed, unregistered slots mirrored).
    fn reconcile_shadow(&mut self, live: &S) -> (usize, usize) {
        let shadow = &mut self.shadow;
        let mut pushed = 0;
        let mut mirrored = 0;
        for slot in &mut self.slots {
            match slot.field.as_mut() {
                Some(field) => {
                    if field.push_live_to_shadow_if_unedited(live, shadow) {
                        pushed += 1;
                    }
                }
                None => {
                    if (slot.mirror)(live, shadow) {
                        mirrored += 1;
                    }
                }
            }
        }
        (pushed, mirrored)
    }

    fn touch<T: Trackable>(&mut self, key: FieldKey<S, T>) {
        self.register(key);
        let index = self.slot_index(key.id());
        if let Some(field) = self.slots[index].field.as_mut() {
            field.mark_pulled();
        }
    }

    fn registered(&self) -> impl Iterator<Item = &dyn FieldOps<S>> + '_ {
        self.slots.iter().filter_map(|slot| slot.field.as_deref())
    }

    fn registered_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn FieldOps<S>>> + '_ {
        self.slots.iter_mut().filter_map(|slot| slot.field.as_mut())
    }

    fn check_key(&self, id: FieldId) {
        assert!(
            id.store() == self.id,
            "Field key {id} belongs to store {}, not to store {}",
            id.store(),
            self.id
        );
    }

    fn slot_index(&self, id: FieldId) -> usize {
        self.check_key(id);
        id.index() as usize
    }
}

impl<S> fmt::Debug for DoubleBufferStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DoubleBufferStore")
            .field("id", &self.id)
            .field("declared", &self.slots.len())
            .field(
                "registered",
                &self.slots.iter().filter(|s| s.field.is_some()).count(),
            )
            .field("pending_tasks", &self.deferred.len())
            .field("totals", &self.totals)
            .finish_non_exhaustive()
    }
}
