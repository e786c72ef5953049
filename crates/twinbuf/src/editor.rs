//! # Editor Loop
//!
//! ```text
//! Frame:
//!   wait_until_live_buffer_updated ──► enter shadow region
//!        │
//!        ├─ ready = is_frame_ready()
//!        ├─ populate (pull / commit / schedule)
//!        ├─ draw          (only when ready)
//!        │
//!   leave shadow region
//!        │
//!        └─ try_consume_frame (only when ready) ──► worker merges
//! ```
//!
//! The shadow guard is always dropped before the frame is consumed: once
//! consumed, the worker owns the shadow until its merge window closes.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use twinbuf_core::{DoubleBufferStore, Shared};

use crate::config::RunConfig;

/// Whether the editor loop keeps going after a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Control {
    /// Run another frame.
    #[default]
    Continue,
    /// Request shutdown for both loops.
    Quit,
}

/// Per-frame information handed to the view.
#[derive(Clone, Copy, Debug)]
pub struct FrameContext {
    /// Frames run so far, including populate-only frames.
    pub frame: u64,
    /// Seconds since the previous frame.
    pub delta_time: f32,
    /// Whether this frame draws and hands a frame back to the worker.
    pub ready: bool,
}

/// The editor's half of the application.
pub trait EditorView<S> {
    /// Reads and edits shadow values. Runs every frame.
    fn populate(&mut self, store: &mut DoubleBufferStore<S>, ctx: &FrameContext) -> Control;

    /// Presents the shadow state. Runs only on ready frames.
    fn draw(&mut self, _store: &DoubleBufferStore<S>, _ctx: &FrameContext) {}
}

/// What the editor did before it stopped.
#[derive(Clone, Copy, Debug, Default)]
pub struct EditorReport {
    /// Frames run, including populate-only frames.
    pub frames: u64,
    /// Frames drawn and consumed.
    pub draws: u64,
    /// Whether the view asked to quit.
    pub quit_requested: bool,
}

/// Drives a view through the editor side of the handshake.
pub struct EditorLoop<S: Send + 'static, V> {
    shared: Arc<Shared<S>>,
    view: V,
    frame_interval: Option<Duration>,
}

impl<S: Send + 'static, V: EditorView<S>> EditorLoop<S, V> {
    /// Creates an editor loop over `shared`.
    #[must_use]
    pub fn new(shared: Arc<Shared<S>>, view: V, config: &RunConfig) -> Self {
        Self {
            shared,
            view,
            frame_interval: config.frame_interval(),
        }
    }

    /// Runs until shutdown or until the view returns [`Control::Quit`].
    pub fn run(&mut self) -> EditorReport {
        let shared = Arc::clone(&self.shared);
        let sync = shared.coordinator();
        let mut report = EditorReport::default();
        let mut last_frame = Instant::now();

        tracing::info!(frame_interval = ?self.frame_interval, "editor loop started");

        while let Some(mut store) = shared.editor_frame() {
            let frame_start = Instant::now();
            let ctx = FrameContext {
                frame: report.frames,
                delta_time: frame_start.duration_since(last_frame).as_secs_f32(),
                ready: sync.is_frame_ready(),
            };
            last_frame = frame_start;

            let control = self.view.populate(&mut store, &ctx);
            if ctx.ready {
                self.view.draw(&store, &ctx);
            }
            drop(store);

            if ctx.ready && sync.try_consume_frame() {
                report.draws += 1;
            }
            report.frames += 1;

            if control == Control::Quit {
                tracing::info!(frame = ctx.frame, "editor requested quit");
                report.quit_requested = true;
                sync.quit();
                break;
            }

            match self.frame_interval {
                Some(interval) => {
                    let spent = frame_start.elapsed();
                    if spent < interval {
                        thread::sleep(interval - spent);
                    }
                }
                None => thread::yield_now(),
            }
        }

        tracing::info!(frames = report.frames, draws = report.draws, "editor loop stopped");
        report
    }

    /// Returns the view, e.g. to inspect it after a run.
    #[must_use]
    pub fn view(&self) -> &V {
        &self.view
    }

    /// Consumes the loop and returns the view.
    #[must_use]
    pub fn into_view(self) -> V {
        self.view
    }
}
