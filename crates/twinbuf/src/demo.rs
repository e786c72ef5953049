//! # Orbit Demo
//!
//! A headless worker/editor pair used by the `twinbuf_demo` binary and the
//! runtime tests.
//!
//! - The worker spins a point around an orbit and records its trail.
//! - The editor reverses the direction, zooms in and clears the trail on a
//!   fixed schedule of ready frames, and draws what the shadow shows.

use std::f32::consts::TAU;

use twinbuf_core::{DoubleBufferStore, FieldKey};

use crate::editor::{Control, EditorView, FrameContext};
use crate::worker::{Simulation, TickContext};

/// Maximum number of trail points kept by the simulation.
pub const TRAIL_LEN: usize = 32;

/// Orbit radius in trail units.
const RADIUS: f32 = 100.0;

/// State shared by the demo worker and editor.
#[derive(Clone, Debug, PartialEq)]
pub struct Orbit {
    /// Current angle in radians, in `[0, TAU)`.
    pub angle: f32,
    /// Angular speed in radians per tick step.
    pub speed: f32,
    /// View zoom.
    pub zoom: f32,
    /// While true the simulation does not move.
    pub paused: bool,
    /// Recent positions, oldest first.
    pub trail: Vec<(i32, i32)>,
}

impl Default for Orbit {
    fn default() -> Self {
        Self {
            angle: 0.0,
            speed: 1.0,
            zoom: 1.0,
            paused: false,
            trail: Vec::with_capacity(TRAIL_LEN),
        }
    }
}

/// Keys for every field of [`Orbit`].
#[derive(Clone, Copy, Debug)]
pub struct OrbitKeys {
    /// `angle`
    pub angle: FieldKey<Orbit, f32>,
    /// `speed`
    pub speed: FieldKey<Orbit, f32>,
    /// `zoom`
    pub zoom: FieldKey<Orbit, f32>,
    /// `paused`
    pub paused: FieldKey<Orbit, bool>,
    /// `trail`, ephemeral: released while the editor is not looking at it.
    pub trail: FieldKey<Orbit, Vec<(i32, i32)>>,
}

impl OrbitKeys {
    /// Declares every field on `store`.
    pub fn declare(store: &mut DoubleBufferStore<Orbit>) -> Self {
        Self {
            angle: store.declare("angle", |o| &o.angle, |o| &mut o.angle),
            speed: store.declare("speed", |o| &o.speed, |o| &mut o.speed),
            zoom: store.declare("zoom", |o| &o.zoom, |o| &mut o.zoom),
            paused: store.declare("paused", |o| &o.paused, |o| &mut o.paused),
            trail: store.declare_ephemeral("trail", |o| &o.trail, |o| &mut o.trail),
        }
    }
}

/// Worker side: advances the orbit by a fixed step each tick.
#[derive(Clone, Debug)]
pub struct OrbitSimulation {
    step: f32,
    ticks: u64,
}

impl OrbitSimulation {
    /// Creates a simulation that advances `speed * step` radians per tick.
    #[must_use]
    pub fn new(step: f32) -> Self {
        Self { step, ticks: 0 }
    }

    /// Ticks run so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl Default for OrbitSimulation {
    fn default() -> Self {
        Self::new(1.0 / 60.0)
    }
}

impl Simulation<Orbit> for OrbitSimulation {
    fn tick(&mut self, orbit: &mut Orbit, _ctx: &TickContext) {
        self.ticks += 1;
        if orbit.paused {
            return;
        }

        orbit.angle = (orbit.angle + orbit.speed * self.step).rem_euclid(TAU);

        let x = (orbit.angle.cos() * RADIUS) as i32;
        let y = (orbit.angle.sin() * RADIUS) as i32;
        if orbit.trail.len() == TRAIL_LEN {
            orbit.trail.remove(0);
        }
        orbit.trail.push((x, y));
    }
}

/// What the editor saw on its latest drawn frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DrawnFrame {
    /// Frame number.
    pub frame: u64,
    /// Shadow angle.
    pub angle: f32,
    /// Shadow zoom.
    pub zoom: f32,
    /// Points in the shadow trail.
    pub trail_points: usize,
}

/// Editor side: edits the orbit on a fixed schedule of ready frames.
///
/// | every Nth ready frame | edit                                |
/// |-----------------------|-------------------------------------|
/// | `reverse_every`       | negate `speed` (scoped commit)      |
/// | `zoom_every`          | add 0.25 to `zoom` (pull + commit)  |
/// | `clear_every`         | deferred task clearing the trail    |
#[derive(Clone, Debug)]
pub struct ScriptedEditor {
    keys: OrbitKeys,
    /// Reverse the direction every this many ready frames.
    pub reverse_every: u64,
    /// Zoom in every this many ready frames.
    pub zoom_every: u64,
    /// Clear the trail every this many ready frames.
    pub clear_every: u64,
    /// Quit after this many ready frames.
    pub quit_after: Option<u64>,
    ready_frames: u64,
    reversals: u64,
    zooms: u64,
    clears: u64,
    last_drawn: Option<DrawnFrame>,
}

impl ScriptedEditor {
    /// Creates an editor with the default schedule.
    #[must_use]
    pub fn new(keys: OrbitKeys) -> Self {
        Self {
            keys,
            reverse_every: 30,
            zoom_every: 50,
            clear_every: 100,
            quit_after: None,
            ready_frames: 0,
            reversals: 0,
            zooms: 0,
            clears: 0,
            last_drawn: None,
        }
    }

    /// Sets the ready-frame count after which the editor quits.
    #[must_use]
    pub fn quit_after(mut self, ready_frames: u64) -> Self {
        self.quit_after = Some(ready_frames);
        self
    }

    /// Ready frames populated so far.
    #[must_use]
    pub fn ready_frames(&self) -> u64 {
        self.ready_frames
    }

    /// Direction reversals committed.
    #[must_use]
    pub fn reversals(&self) -> u64 {
        self.reversals
    }

    /// Zoom edits committed.
    #[must_use]
    pub fn zooms(&self) -> u64 {
        self.zooms
    }

    /// Trail clears scheduled.
    #[must_use]
    pub fn clears(&self) -> u64 {
        self.clears
    }

    /// The latest drawn frame.
    #[must_use]
    pub fn last_drawn(&self) -> Option<DrawnFrame> {
        self.last_drawn
    }

    fn every(&self, period: u64) -> bool {
        period > 0 && self.ready_frames % period == 0
    }
}

impl EditorView<Orbit> for ScriptedEditor {
    fn populate(&mut self, store: &mut DoubleBufferStore<Orbit>, ctx: &FrameContext) -> Control {
        let keys = self.keys;

        // Keep the displayed fields registered
        store.view(keys.angle);
        store.view(keys.trail);

        if !ctx.ready {
            return Control::Continue;
        }
        self.ready_frames += 1;

        if self.every(self.reverse_every) {
            let mut speed = store.scoped(keys.speed);
            *speed = -*speed;
            self.reversals += 1;
        }

        if self.every(self.zoom_every) {
            *store.pull(keys.zoom) += 0.25;
            store.commit(keys.zoom);
            self.zooms += 1;
        }

        if self.every(self.clear_every) {
            store.schedule(|orbit: &mut Orbit| orbit.trail.clear());
            self.clears += 1;
        }

        match self.quit_after {
            Some(limit) if self.ready_frames >= limit => Control::Quit,
            _ => Control::Continue,
        }
    }

    fn draw(&mut self, store: &DoubleBufferStore<Orbit>, ctx: &FrameContext) {
        let frame = DrawnFrame {
            frame: ctx.frame,
            angle: *store.peek(self.keys.angle),
            zoom: *store.peek(self.keys.zoom),
            trail_points: store.peek(self.keys.trail).len(),
        };
        tracing::trace!(
            frame = frame.frame,
            angle = frame.angle,
            zoom = frame.zoom,
            trail = frame.trail_points,
            "draw"
        );
        self.last_drawn = Some(frame);
    }
}
