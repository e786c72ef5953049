//! # Synchronization Between the Worker and the Editor
//!
//! The store takes no locks. Safety comes from time, not from mutexes.
//!
//! ## The Problem
//!
//! ```text
//! Worker thread:  WRITES live state every tick
//! Editor thread:  WRITES shadow state every frame
//! Merge:          READS AND WRITES both
//!
//! Without a protocol:  torn values, lost edits
//! With per-field locks: contention on every widget
//! ```
//!
//! ## The Solution: Temporal Exclusion
//!
//! ```text
//! Worker:  [merge]──tick──flag──────wait────────[merge]──tick──...
//! Editor:  ..wait..──populate──populate──consume──wait──populate──...
//! ```
//!
//! The worker owns the live state outright. The shadow state belongs to
//! the editor except inside the merge window, which opens only after the
//! editor consumed a frame and closes before the editor may run again.
//!
//! Each shared resource still sits in a [`Region`], but only to *detect*
//! protocol violations: a correct run never finds a region occupied.

mod coordinator;
mod region;
mod shared;

pub use coordinator::{Phase, SyncCoordinator, WaitOutcome};
pub use region::{Region, RegionGuard, Side};
pub use shared::Shared;
