//! # Worker Loop
//!
//! ```text
//! Cycle N:
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. MERGE WINDOW (live + shadow regions)                             │
//! │    ├─ merge: edits -> live, worker changes -> shadow, tasks         │
//! │    └─ snapshot live values                                          │
//! │                                                                     │
//! │ 2. finish_buffer_copy  (editor may run again)                       │
//! │                                                                     │
//! │ 3. TICK (live region only)                                          │
//! │    └─ Simulation::tick mutates the live state                       │
//! │                                                                     │
//! │ 4. flag_ready_to_draw                                               │
//! │                                                                     │
//! │ 5. PACE + WAIT                                                      │
//! │    ├─ sleep to the tick rate                                        │
//! │    └─ wait_until_gui_consumes_frame (one frame of slack)            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cycle 0 is a priming pass: there is nothing to merge yet, so the merge
//! window only takes the first live snapshot.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use twinbuf_core::{Shared, SyncCoordinator, SyncStats};

use crate::config::RunConfig;
use crate::stats::{CycleStats, FrameStatsAccumulator};

/// Handles for a single worker tick.
#[derive(Clone, Copy, Debug)]
pub struct TickContext {
    /// Completed sync cycles before this tick.
    pub cycle: u64,
    /// Seconds since the previous tick, clamped to 0.1.
    pub delta_time: f32,
    /// Time since the worker started.
    pub elapsed: Duration,
}

/// The worker's half of the application: advances the live state.
pub trait Simulation<S>: Send {
    /// Advances the live state by one tick.
    fn tick(&mut self, state: &mut S, ctx: &TickContext);
}

impl<S, F> Simulation<S> for F
where
    F: FnMut(&mut S, &TickContext) + Send,
{
    fn tick(&mut self, state: &mut S, ctx: &TickContext) {
        self(state, ctx);
    }
}

/// What the worker did before it stopped.
#[derive(Clone, Debug)]
pub struct WorkerReport {
    /// Completed sync cycles (the priming pass is not counted).
    pub cycles: u64,
    /// Statistics of the last merge.
    pub last_merge: SyncStats,
    /// Cycle timing.
    pub timing: FrameStatsAccumulator,
}

/// Calls `quit()` when dropped, so a panicking worker never strands the
/// editor inside `wait_until_live_buffer_updated`.
struct QuitOnDrop<'a>(&'a SyncCoordinator);

impl Drop for QuitOnDrop<'_> {
    fn drop(&mut self) {
        self.0.quit();
    }
}

/// Drives the live state through the per-cycle protocol.
pub struct WorkerLoop<S: Send + 'static, M> {
    shared: Arc<Shared<S>>,
    simulation: M,
    tick_interval: Option<Duration>,
    tick_budget: Duration,
    max_cycles: Option<u64>,
}

impl<S: Send + 'static, M: Simulation<S>> WorkerLoop<S, M> {
    /// Creates a worker loop over `shared`.
    #[must_use]
    pub fn new(shared: Arc<Shared<S>>, simulation: M, config: &RunConfig) -> Self {
        Self {
            shared,
            simulation,
            tick_interval: config.tick_interval(),
            tick_budget: config.tick_budget(),
            max_cycles: config.max_cycles,
        }
    }

    /// Runs until shutdown or `max_cycles`. Always leaves the coordinator
    /// shutting down, so the editor loop stops too.
    pub fn run(mut self) -> WorkerReport {
        let shared = Arc::clone(&self.shared);
        let sync = shared.coordinator();
        let _quit = QuitOnDrop(sync);

        let mut timing = FrameStatsAccumulator::new(self.tick_budget);
        let mut last_merge = SyncStats::default();
        let mut cycles = 0u64;
        let mut priming = true;

        let started = Instant::now();
        let mut last_tick = started;

        tracing::info!(
            tick_interval = ?self.tick_interval,
            max_cycles = ?self.max_cycles,
            "worker loop started"
        );

        loop {
            let cycle_start = Instant::now();

            // 1. Merge window
            let merged = shared.merge_window(|live, store| {
                let stats = (!priming).then(|| store.merge(live));
                store.snapshot_live_values(live);
                stats
            });
            let merge_us = cycle_start.elapsed().as_micros() as u64;

            if let Some(stats) = merged {
                cycles += 1;
                last_merge = stats;
            }
            priming = false;

            if self.max_cycles.is_some_and(|max| cycles >= max) {
                tracing::info!(cycles, "cycle limit reached");
                break;
            }
            if sync.is_shutting_down() {
                break;
            }

            // 2. Tick
            let now = Instant::now();
            let ctx = TickContext {
                cycle: cycles,
                delta_time: now.duration_since(last_tick).as_secs_f32().min(0.1),
                elapsed: now.duration_since(started),
            };
            last_tick = now;

            sync.begin_tick();
            let simulation = &mut self.simulation;
            shared.tick(|live| simulation.tick(live, &ctx));
            let tick_us = now.elapsed().as_micros() as u64;

            // 3. Frame ready
            sync.flag_ready_to_draw();

            // 4. Pace, then wait for the editor
            if let Some(interval) = self.tick_interval {
                let spent = cycle_start.elapsed();
                if spent < interval {
                    thread::sleep(interval - spent);
                }
            }

            let wait_start = Instant::now();
            let outcome = sync.wait_until_gui_consumes_frame();
            let wait_us = wait_start.elapsed().as_micros() as u64;

            let over_budget = timing.record(CycleStats {
                cycle: cycles,
                merge_us,
                tick_us,
                wait_us,
            });
            if over_budget {
                let tick_ms = tick_us as f64 / 1000.0;
                let budget_ms = self.tick_budget.as_secs_f64() * 1000.0;
                tracing::warn!(cycle = cycles, tick_ms, budget_ms, "tick exceeded budget");
            }

            if outcome.is_shutdown() {
                break;
            }
        }

        tracing::info!(cycles, "worker loop stopped");

        WorkerReport {
            cycles,
            last_merge,
            timing,
        }
    }
}
