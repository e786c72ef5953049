//! # Runtime
//!
//! Spawns the worker on its own thread, runs the editor on the calling
//! thread, and joins the worker once either side shuts down.
//!
//! ```text
//!   caller thread                         twinbuf-worker
//!   ─────────────                         ──────────────
//!   Runtime::run ── spawn ──────────────► WorkerLoop::run
//!   EditorLoop::run                         merge / tick / flag / wait
//!     populate / draw / consume  ◄──────►   ...
//!   (Quit or shutdown)                      quit() on exit
//!   join ◄──────────────────────────────── WorkerReport
//!   RunReport
//! ```

use std::any::Any;
use std::sync::Arc;
use std::thread;

use twinbuf_core::{DoubleBufferStore, Shared, StoreStats, SyncStats};

use crate::config::RunConfig;
use crate::editor::{EditorLoop, EditorView};
use crate::error::{RuntimeError, RuntimeResult};
use crate::stats::FrameStatsAccumulator;
use crate::worker::{Simulation, WorkerLoop};

/// Name of the worker thread.
pub const WORKER_THREAD_NAME: &str = "twinbuf-worker";

/// Result of a completed run.
pub struct RunReport<S: Send + 'static, V> {
    /// Completed sync cycles.
    pub cycles: u64,
    /// Editor frames, including populate-only frames.
    pub frames: u64,
    /// Editor frames drawn and consumed.
    pub draws: u64,
    /// Whether the editor view asked to quit.
    pub quit_requested: bool,
    /// Region overlaps observed. Zero in a correct run.
    pub overlaps: u64,
    /// Statistics of the worker's last merge.
    pub last_merge: SyncStats,
    /// Cumulative store statistics.
    pub store_stats: StoreStats,
    /// Worker cycle timing.
    pub timing: FrameStatsAccumulator,
    /// The buffers, for inspection after the run.
    pub shared: Arc<Shared<S>>,
    /// The editor view.
    pub view: V,
}

impl<S: Send + 'static, V> std::fmt::Debug for RunReport<S, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunReport")
            .field("cycles", &self.cycles)
            .field("frames", &self.frames)
            .field("draws", &self.draws)
            .field("quit_requested", &self.quit_requested)
            .field("overlaps", &self.overlaps)
            .field("store_stats", &self.store_stats)
            .finish_non_exhaustive()
    }
}

/// Owns a validated configuration and runs worker/editor pairs with it.
#[derive(Clone, Debug)]
pub struct Runtime {
    config: RunConfig,
}

impl Runtime {
    /// Validates `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Config`] if the configuration is invalid.
    pub fn new(config: RunConfig) -> RuntimeResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Runs `simulation` on a worker thread against `live`, and `view` on
    /// the calling thread against `store`. Returns when both loops stop.
    ///
    /// Fields should be declared on `store` before calling this; the view
    /// holds the keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker thread cannot be spawned or panics.
    pub fn run<S, M, V>(
        &self,
        live: S,
        store: DoubleBufferStore<S>,
        simulation: M,
        view: V,
    ) -> RuntimeResult<RunReport<S, V>>
    where
        S: Send + 'static,
        M: Simulation<S> + 'static,
        V: EditorView<S>,
    {
        let shared = Arc::new(Shared::new(live, store));

        tracing::info!(
            tick_rate_hz = self.config.tick_rate_hz,
            editor_fps = self.config.editor_fps,
            max_cycles = ?self.config.max_cycles,
            "starting run"
        );

        let worker = WorkerLoop::new(Arc::clone(&shared), simulation, &self.config);
        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || worker.run())
            .map_err(RuntimeError::Spawn)?;

        let mut editor = EditorLoop::new(Arc::clone(&shared), view, &self.config);
        let editor_report = editor.run();

        // The editor may stop first (Quit); make sure the worker follows
        shared.coordinator().quit();

        let worker_report = handle
            .join()
            .map_err(|payload| RuntimeError::WorkerPanicked(panic_message(payload.as_ref())))?;

        let store_stats = shared.store().stats();
        let overlaps = shared.overlaps();
        if overlaps > 0 {
            tracing::error!(overlaps, "regions were entered concurrently");
        }

        tracing::info!(
            cycles = worker_report.cycles,
            frames = editor_report.frames,
            draws = editor_report.draws,
            "run finished"
        );

        Ok(RunReport {
            cycles: worker_report.cycles,
            frames: editor_report.frames,
            draws: editor_report.draws,
            quit_requested: editor_report.quit_requested,
            overlaps,
            last_merge: worker_report.last_merge,
            store_stats,
            timing: worker_report.timing,
            shared,
            view: editor.into_view(),
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
