//! # Sync Coordinator
//!
//! The frame handshake between the worker and the editor.
//!
//! ```text
//!   Idle ──begin_tick──► WorkerTick ──flag_ready_to_draw──► FrameReady
//!    ▲                                                          │
//!    │                                               try_consume_frame
//!    │                                                          ▼
//!   finish_buffer_copy ◄── CopyingBuffers ◄──begin_buffer_copy── EditorConsuming
//!
//!   quit() from anywhere ──► ShuttingDown (absorbing)
//! ```
//!
//! Every flag lives under one mutex; both condition variables include the
//! shutdown flag in their predicate, so `quit()` always wakes every waiter.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

/// Observable state of the handshake.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Neither side is in a protocol step.
    Idle,
    /// The worker is ticking the live state.
    WorkerTick,
    /// The worker holds both buffers and is merging them.
    CopyingBuffers,
    /// A frame is ready and waiting for the editor.
    FrameReady,
    /// The editor consumed the frame and handed the buffers back.
    EditorConsuming,
    /// Terminal.
    ShuttingDown,
}

/// Why a wait returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub enum WaitOutcome {
    /// The awaited condition holds.
    Ready,
    /// `quit()` was called.
    ShuttingDown,
    /// A timed wait expired first.
    TimedOut,
}

impl WaitOutcome {
    /// Returns true for [`WaitOutcome::ShuttingDown`].
    #[inline]
    #[must_use]
    pub fn is_shutdown(self) -> bool {
        matches!(self, Self::ShuttingDown)
    }
}

/// Flags guarded by the handshake mutex.
#[derive(Debug)]
struct Handshake {
    phase: Phase,
    shutting_down: bool,
    buffer_copy_in_progress: bool,
    frame_ready: bool,
    frame_consumed: bool,
    frames_flagged: u64,
    frames_consumed: u64,
}

impl Handshake {
    fn set_phase(&mut self, phase: Phase) {
        if !self.shutting_down {
            self.phase = phase;
        }
    }
}

/// Frame handshake between one worker thread and one editor thread.
///
/// ## Thread Safety
///
/// - Worker calls: `begin_tick`, `flag_ready_to_draw`,
///   `wait_until_gui_consumes_frame`, `begin_buffer_copy`,
///   `finish_buffer_copy`
/// - Editor calls: `wait_until_live_buffer_updated`, `is_frame_ready`,
///   `try_consume_frame`
/// - Either side: `quit`, `is_shutting_down`, `phase`
pub struct SyncCoordinator {
    state: Mutex<Handshake>,
    /// Signalled when `frame_consumed` (or shutdown) changes.
    frame_cv: Condvar,
    /// Signalled when `buffer_copy_in_progress` (or shutdown) changes.
    copy_cv: Condvar,
    /// Lock-free mirror of `shutting_down` for polling.
    shutdown: AtomicBool,
}

impl SyncCoordinator {
    /// Creates a coordinator for a new run.
    ///
    /// The buffer copy starts in progress: the editor may not touch the
    /// shadow state until the worker has primed it once.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Handshake {
                phase: Phase::Idle,
                shutting_down: false,
                buffer_copy_in_progress: true,
                frame_ready: false,
                frame_consumed: false,
                frames_flagged: 0,
                frames_consumed: 0,
            }),
            frame_cv: Condvar::new(),
            copy_cv: Condvar::new(),
            shutdown: AtomicBool::new(false),
        }
    }

    // =========================================================================
    // Worker side
    // =========================================================================

    /// Marks the start of a worker tick.
    pub fn begin_tick(&self) {
        self.state.lock().set_phase(Phase::WorkerTick);
    }

    /// Signals that a frame is renderable and clears `frame_consumed`.
    pub fn flag_ready_to_draw(&self) {
        let mut state = self.state.lock();
        state.frame_ready = true;
        state.frame_consumed = false;
        state.frames_flagged += 1;
        state.set_phase(Phase::FrameReady);
    }

    /// Blocks until the editor consumes the flagged frame or shutdown.
    pub fn wait_until_gui_consumes_frame(&self) -> WaitOutcome {
        let mut state = self.state.lock();
        while !state.frame_consumed && !state.shutting_down {
            self.frame_cv.wait(&mut state);
        }
        Self::outcome(&state)
    }

    /// Like [`wait_until_gui_consumes_frame`](Self::wait_until_gui_consumes_frame)
    /// but gives up after `timeout`.
    pub fn wait_until_gui_consumes_frame_for(&self, timeout: Duration) -> WaitOutcome {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while !state.frame_consumed && !state.shutting_down {
            if self.frame_cv.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        Self::timed_outcome(&state, state.frame_consumed)
    }

    /// Marks the start of the merge window.
    pub fn begin_buffer_copy(&self) {
        let mut state = self.state.lock();
        state.buffer_copy_in_progress = true;
        state.set_phase(Phase::CopyingBuffers);
    }

    /// Ends the merge window and releases the editor.
    pub fn finish_buffer_copy(&self) {
        let mut state = self.state.lock();
        state.buffer_copy_in_progress = false;
        state.set_phase(Phase::Idle);
        drop(state);
        self.copy_cv.notify_all();
    }

    // =========================================================================
    // Editor side
    // =========================================================================

    /// Blocks until no buffer copy is in progress or shutdown.
    ///
    /// The editor calls this before touching shared state each frame.
    pub fn wait_until_live_buffer_updated(&self) -> WaitOutcome {
        let mut state = self.state.lock();
        while state.buffer_copy_in_progress && !state.shutting_down {
            self.copy_cv.wait(&mut state);
        }
        Self::outcome(&state)
    }

    /// Like [`wait_until_live_buffer_updated`](Self::wait_until_live_buffer_updated)
    /// but gives up after `timeout`.
    pub fn wait_until_live_buffer_updated_for(&self, timeout: Duration) -> WaitOutcome {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while state.buffer_copy_in_progress && !state.shutting_down {
            if self.copy_cv.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        Self::timed_outcome(&state, !state.buffer_copy_in_progress)
    }

    /// Returns whether the worker has flagged a frame the editor has not
    /// consumed yet.
    #[must_use]
    pub fn is_frame_ready(&self) -> bool {
        self.state.lock().frame_ready
    }

    /// Consumes the ready frame, if there is one.
    ///
    /// Consuming hands the buffers back to the worker: the next
    /// [`wait_until_live_buffer_updated`](Self::wait_until_live_buffer_updated)
    /// blocks until the worker's merge window ends. The editor must not hold
    /// the shadow region when calling this.
    pub fn try_consume_frame(&self) -> bool {
        let mut state = self.state.lock();
        if !state.frame_ready || state.shutting_down {
            return false;
        }
        state.frame_ready = false;
        state.frame_consumed = true;
        state.buffer_copy_in_progress = true;
        state.frames_consumed += 1;
        state.set_phase(Phase::EditorConsuming);
        drop(state);
        self.frame_cv.notify_all();
        true
    }

    // =========================================================================
    // Either side
    // =========================================================================

    /// Enters `ShuttingDown` and wakes every waiter. Idempotent.
    pub fn quit(&self) {
        let mut state = self.state.lock();
        let first = !state.shutting_down;
        state.shutting_down = true;
        state.phase = Phase::ShuttingDown;
        self.shutdown.store(true, Ordering::Release);
        drop(state);

        self.frame_cv.notify_all();
        self.copy_cv.notify_all();

        if first {
            tracing::info!("sync coordinator shutting down");
        }
    }

    /// Returns true once `quit()` has been called.
    #[inline]
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Returns whether a buffer copy is pending or running.
    #[must_use]
    pub fn is_buffer_copy_in_progress(&self) -> bool {
        self.state.lock().buffer_copy_in_progress
    }

    /// Current phase of the handshake.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.state.lock().phase
    }

    /// Frames flagged by the worker so far.
    #[must_use]
    pub fn frames_flagged(&self) -> u64 {
        self.state.lock().frames_flagged
    }

    /// Frames consumed by the editor so far.
    #[must_use]
    pub fn frames_consumed(&self) -> u64 {
        self.state.lock().frames_consumed
    }

    fn outcome(state: &MutexGuard<'_, Handshake>) -> WaitOutcome {
        if state.shutting_down {
            WaitOutcome::ShuttingDown
        } else {
            WaitOutcome::Ready
        }
    }

    fn timed_outcome(state: &MutexGuard<'_, Handshake>, satisfied: bool) -> WaitOutcome {
        if state.shutting_down {
            WaitOutcome::ShuttingDown
        } else if satisfied {
            WaitOutcome::Ready
        } else {
            WaitOutcome::TimedOut
        }
    }
}

impl Default for SyncCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SyncCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_initial_state_blocks_editor_until_primed() {
        let sync = SyncCoordinator::new();
        assert_eq!(sync.phase(), Phase::Idle);
        assert!(sync.is_buffer_copy_in_progress());
        assert_eq!(
            sync.wait_until_live_buffer_updated_for(Duration::from_millis(5)),
            WaitOutcome::TimedOut
        );

        sync.begin_buffer_copy();
        assert_eq!(sync.phase(), Phase::CopyingBuffers);
        sync.finish_buffer_copy();
        assert_eq!(sync.wait_until_live_buffer_updated(), WaitOutcome::Ready);
    }

    #[test]
    fn test_frame_round_trip() {
        let sync = SyncCoordinator::new();
        sync.finish_buffer_copy();

        assert!(!sync.try_consume_frame());
        sync.begin_tick();
        assert_eq!(sync.phase(), Phase::WorkerTick);
        sync.flag_ready_to_draw();
        assert_eq!(sync.phase(), Phase::FrameReady);
        assert!(sync.is_frame_ready());

        assert!(sync.try_consume_frame());
        assert_eq!(sync.phase(), Phase::EditorConsuming);
        assert!(!sync.is_frame_ready());
        assert!(sync.is_buffer_copy_in_progress());
        assert_eq!(sync.wait_until_gui_consumes_frame(), WaitOutcome::Ready);

        // A frame is consumed at most once
        assert!(!sync.try_consume_frame());
        assert_eq!(sync.frames_flagged(), 1);
        assert_eq!(sync.frames_consumed(), 1);
    }

    #[test]
    fn test_flag_ready_clears_consumed() {
        let sync = SyncCoordinator::new();
        sync.flag_ready_to_draw();
        assert!(sync.try_consume_frame());
        sync.flag_ready_to_draw();
        assert_eq!(
            sync.wait_until_gui_consumes_frame_for(Duration::from_millis(5)),
            WaitOutcome::TimedOut
        );
    }

    #[test]
    fn test_quit_wakes_both_waiters() {
        let sync = Arc::new(SyncCoordinator::new());
        sync.flag_ready_to_draw();

        let worker = {
            let sync = Arc::clone(&sync);
            thread::spawn(move || sync.wait_until_gui_consumes_frame())
        };
        let editor = {
            let sync = Arc::clone(&sync);
            thread::spawn(move || sync.wait_until_live_buffer_updated())
        };

        thread::sleep(Duration::from_millis(20));
        sync.quit();

        assert_eq!(worker.join().unwrap(), WaitOutcome::ShuttingDown);
        assert_eq!(editor.join().unwrap(), WaitOutcome::ShuttingDown);
    }

    #[test]
    fn test_shutdown_is_absorbing() {
        let sync = SyncCoordinator::new();
        sync.quit();
        sync.quit();

        sync.begin_tick();
        sync.flag_ready_to_draw();
        sync.finish_buffer_copy();

        assert_eq!(sync.phase(), Phase::ShuttingDown);
        assert!(sync.is_shutting_down());
        assert!(!sync.try_consume_frame());
        assert!(sync.wait_until_gui_consumes_frame().is_shutdown());
        assert!(sync.wait_until_live_buffer_updated().is_shutdown());
        assert!(sync
            .wait_until_live_buffer_updated_for(Duration::from_millis(1))
            .is_shutdown());
    }
}
