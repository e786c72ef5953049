//! # Sync Scenario Tests
//!
//! Single-threaded walks through the per-cycle protocol:
//!
//! 1. **Passthrough**: edits reach live, worker writes reach shadow
//! 2. **Precedence**: a same-cycle edit beats a worker write, on both sides
//! 3. **Commit**: idempotent, never re-applied
//! 4. **Hashing**: collisions read as unchanged, everything else is detected
//! 5. **Unregistered**: declared fields follow live until first touched,
//!    and again after an ephemeral release
//!
//! Run with: cargo test -p twinbuf_core --test sync_scenarios

use twinbuf_core::{
    content_hash_of, ByHash, CompareStrategy, ContentHash, DoubleBufferStore, FieldKey, Trackable,
};

// ============================================================================
// FIXTURES
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
struct Camera {
    speed: f32,
    angle: f32,
    zoom: f32,
    label: Label,
    path: Path,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            speed: 1.0,
            angle: 0.0,
            zoom: 1.0,
            label: Label::default(),
            path: Path::default(),
        }
    }
}

/// Deliberately weak hash: only the text length counts.
#[derive(Clone, Debug, Default, PartialEq)]
struct Label {
    text: String,
}

impl ContentHash for Label {
    fn content_hash(&self) -> u64 {
        self.text.len() as u64
    }
}

impl Trackable for Label {
    type Strategy = ByHash;
}

/// Proper content hash over every point.
#[derive(Clone, Debug, Default, PartialEq, Hash)]
struct Path {
    points: Vec<(i32, i32)>,
}

impl ContentHash for Path {
    fn content_hash(&self) -> u64 {
        content_hash_of(self)
    }
}

impl Trackable for Path {
    type Strategy = ByHash;
}

struct Keys {
    speed: FieldKey<Camera, f32>,
    angle: FieldKey<Camera, f32>,
    zoom: FieldKey<Camera, f32>,
    label: FieldKey<Camera, Label>,
    path: FieldKey<Camera, Path>,
}

fn setup() -> (Camera, DoubleBufferStore<Camera>, Keys) {
    let live = Camera::default();
    let mut store = DoubleBufferStore::new(&live);
    let keys = Keys {
        speed: store.declare("speed", |c| &c.speed, |c| &mut c.speed),
        angle: store.declare("angle", |c| &c.angle, |c| &mut c.angle),
        zoom: store.declare("zoom", |c| &c.zoom, |c| &mut c.zoom),
        label: store.declare("label", |c| &c.label, |c| &mut c.label),
        path: store.declare("path", |c| &c.path, |c| &mut c.path),
    };
    store.register(keys.speed);
    store.register(keys.angle);
    store.register(keys.zoom);
    store.register(keys.label);
    store.register(keys.path);

    // Priming snapshot, as the worker's first merge window does
    store.snapshot_live_values(&live);
    (live, store, keys)
}

fn assert_converged(live: &Camera, store: &DoubleBufferStore<Camera>) {
    assert_eq!(live, store.shadow(), "shadow and live diverged");
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn editor_edit_reaches_live() {
    let (mut live, mut store, keys) = setup();

    *store.pull(keys.speed) = 2.5;
    assert!(store.commit(keys.speed));
    store.run_cycle(&mut live, |_| {});

    assert_eq!(live.speed, 2.5);
    assert_eq!(*store.peek(keys.speed), 2.5);
    assert_converged(&live, &store);
}

#[test]
fn worker_write_reaches_unpulled_field() {
    let (mut live, mut store, keys) = setup();

    let stats = store.run_cycle(&mut live, |c| c.angle = 1.57);

    assert_eq!(stats.pushed_to_shadow, 1);
    assert_eq!(stats.pushed_to_live, 0);
    assert_eq!(*store.peek(keys.angle), 1.57);
    assert_converged(&live, &store);
}

#[test]
fn editor_wins_same_cycle_conflict() {
    let (mut live, mut store, keys) = setup();

    store.commit_staged(keys.zoom, 2.0);
    store.run_cycle(&mut live, |c| c.zoom = 5.0);

    assert_eq!(live.zoom, 2.0);
    assert_eq!(*store.peek(keys.zoom), 2.0);
    assert_converged(&live, &store);

    // The worker's next write is no longer shadowed by the old edit
    store.run_cycle(&mut live, |c| c.zoom = 5.0);
    assert_eq!(*store.peek(keys.zoom), 5.0);
}

#[test]
fn mixed_cycle_keeps_every_field_consistent() {
    let (mut live, mut store, keys) = setup();

    store.commit_staged(keys.speed, 3.0);
    {
        let mut path = store.scoped(keys.path);
        path.points.push((4, 2));
    }

    store.run_cycle(&mut live, |c| {
        c.speed = -1.0;
        c.angle = 0.25;
        c.path.points.push((9, 9));
    });

    assert_eq!(live.speed, 3.0);
    assert_eq!(live.angle, 0.25);
    assert_eq!(live.path.points, vec![(4, 2)]);
    assert_converged(&live, &store);
}

#[test]
fn no_edit_cycles_converge() {
    let (mut live, mut store, _keys) = setup();

    for step in 0..10u8 {
        store.run_cycle(&mut live, |c| {
            c.angle += 0.1;
            c.speed = f32::from(step);
        });
        assert_converged(&live, &store);
    }
    assert_eq!(store.stats().merges, 10);
    assert_eq!(store.stats().pushed_to_live, 0);
}

#[test]
fn commit_is_idempotent() {
    let (mut live, mut store, keys) = setup();

    *store.pull(keys.speed) = 4.0;
    assert!(store.commit(keys.speed));
    assert!(store.commit(keys.speed));

    let first = store.run_cycle(&mut live, |_| {});
    assert_eq!(first.pushed_to_live, 1);

    // No new edit: nothing is re-applied over the worker's value
    assert!(!store.commit(keys.speed));
    let second = store.run_cycle(&mut live, |c| c.speed = 7.0);
    assert_eq!(second.pushed_to_live, 0);
    assert_eq!(live.speed, 7.0);
    assert_eq!(*store.peek(keys.speed), 7.0);
}

#[test]
fn hash_collision_is_treated_as_unchanged() {
    let (mut live, mut store, keys) = setup();
    store.run_cycle(&mut live, |c| c.label.text = "abc".into());
    assert_eq!(store.peek(keys.label).text, "abc");

    // Same length, new content: the documented blind spot
    store.pull(keys.label).text = "xyz".into();
    assert!(!store.commit(keys.label));
    store.run_cycle(&mut live, |_| {});
    assert_eq!(live.label.text, "abc");
}

#[test]
fn non_colliding_hash_changes_are_detected() {
    let (mut live, mut store, keys) = setup();
    assert_eq!(
        twinbuf_core::field::strategy_of::<Path>(),
        CompareStrategy::ContentHash
    );

    for i in 0..50 {
        store.pull(keys.path).points.push((i, -i));
        assert!(store.commit(keys.path), "edit {i} was missed");
        store.run_cycle(&mut live, |_| {});
        assert_eq!(live.path.points.len(), (i + 1) as usize);
    }

    // Same length, different content
    store.pull(keys.path).points[0] = (100, 100);
    assert!(store.commit(keys.path));
}

// ============================================================================
// UNREGISTERED FIELDS
// ============================================================================

/// Declares every field but registers only `speed`.
fn setup_declared_only() -> (Camera, DoubleBufferStore<Camera>, Keys) {
    let live = Camera::default();
    let mut store = DoubleBufferStore::new(&live);
    let keys = Keys {
        speed: store.declare("speed", |c| &c.speed, |c| &mut c.speed),
        angle: store.declare("angle", |c| &c.angle, |c| &mut c.angle),
        zoom: store.declare("zoom", |c| &c.zoom, |c| &mut c.zoom),
        label: store.declare("label", |c| &c.label, |c| &mut c.label),
        path: store.declare("path", |c| &c.path, |c| &mut c.path),
    };
    store.register(keys.speed);
    store.snapshot_live_values(&live);
    (live, store, keys)
}

#[test]
fn late_registration_picks_up_live_state() {
    let mut live = Camera::default();
    let mut store = DoubleBufferStore::new(&live);
    let zoom = store.declare("zoom", |c: &Camera| &c.zoom, |c| &mut c.zoom);

    // Worker moves on before the editor ever looks at the field
    store.run_cycle(&mut live, |c| c.zoom = 3.0);
    assert_eq!(*store.peek(zoom), 3.0);
    assert!(!store.is_registered(zoom));

    assert_eq!(*store.view(zoom), 3.0);
    store.run_cycle(&mut live, |_| {});
    assert_eq!(*store.peek(zoom), 3.0);
}

#[test]
fn worker_write_reaches_unregistered_field() {
    let (mut live, mut store, keys) = setup_declared_only();

    let stats = store.run_cycle(&mut live, |c| c.angle = 1.57);

    assert!(!store.is_registered(keys.angle));
    assert_eq!(stats.mirrored, 1);
    assert_eq!(*store.peek(keys.angle), 1.57);
    assert_converged(&live, &store);
}

#[test]
fn first_edit_of_unregistered_field_keeps_worker_progress() {
    let (mut live, mut store, keys) = setup_declared_only();

    for _ in 0..3 {
        store.run_cycle(&mut live, |c| c.zoom += 0.7);
        assert_converged(&live, &store);
    }
    let progressed = live.zoom;
    assert!(progressed > 3.0);

    let pulled = *store.pull(keys.zoom);
    assert_eq!(pulled, progressed);

    *store.pull(keys.zoom) += 0.5;
    assert!(store.commit(keys.zoom));
    store.run_cycle(&mut live, |_| {});

    assert_eq!(live.zoom, progressed + 0.5);
    assert_converged(&live, &store);
}

#[test]
fn unregistered_fields_converge_alongside_registered_ones() {
    let (mut live, mut store, keys) = setup_declared_only();

    store.commit_staged(keys.speed, 2.0);
    store.run_cycle(&mut live, |c| {
        c.angle = 0.5;
        c.label.text = "orbit".into();
        c.path.points.push((1, 2));
    });

    assert_eq!(live.speed, 2.0);
    assert_eq!(store.len(), 1);
    assert_converged(&live, &store);
}

#[test]
fn released_ephemeral_field_views_current_live_value() {
    let mut live = Camera::default();
    let mut store = DoubleBufferStore::new(&live);
    let zoom = store.declare_ephemeral("zoom", |c: &Camera| &c.zoom, |c| &mut c.zoom);

    assert_eq!(*store.view(zoom), 1.0);
    store.run_cycle(&mut live, |_| {});
    store.run_cycle(&mut live, |_| {});
    assert!(!store.is_registered(zoom));
    assert_eq!(store.stats().released, 1);

    store.run_cycle(&mut live, |c| c.zoom = 4.0);
    assert_eq!(*store.view(zoom), 4.0);
    assert!(store.is_registered(zoom));

    // Re-registered: an edit still lands on top of the current value
    *store.pull(zoom) += 1.0;
    store.commit(zoom);
    store.run_cycle(&mut live, |_| {});
    assert_eq!(live.zoom, 5.0);
}
