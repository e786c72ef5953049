//! # TWINBUF Core Engine
//!
//! Cross-thread state synchronization between one worker thread and one
//! interactive editor thread, designed for:
//! - Zero per-field locks
//! - No torn values on either side
//! - Editor edits that always win over same-cycle worker writes
//!
//! ## Architecture Rules
//!
//! 1. **Temporal exclusion** - The handshake guarantees the two threads are
//!    never inside the same buffer at once
//! 2. **Typed identity** - A field key carries its value type, so a field
//!    can never be read back as something else
//! 3. **Fixed comparison** - Each value type picks equality or content hash
//!    at compile time
//!
//! ## Example
//!
//! ```rust
//! use twinbuf_core::DoubleBufferStore;
//!
//! #[derive(Clone)]
//! struct Scene { zoom: f32 }
//!
//! let mut live = Scene { zoom: 1.0 };
//! let mut store = DoubleBufferStore::new(&live);
//! let zoom = store.declare("zoom", |s| &s.zoom, |s| &mut s.zoom);
//!
//! store.commit_staged(zoom, 2.0);
//! store.run_cycle(&mut live, |s| s.zoom = 5.0);
//!
//! // Editor wins, on both sides
//! assert_eq!(live.zoom, 2.0);
//! assert_eq!(*store.peek(zoom), 2.0);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod field;
pub mod store;
pub mod sync;

pub use field::{
    content_hash_of, ByEq, ByHash, Compare, CompareStrategy, ContentHash, FieldId, FieldKey,
    Trackable, TrackedField,
};
pub use store::{CommitGuard, DeferredTask, DoubleBufferStore, StoreStats, SyncStats};
pub use sync::{Phase, Region, RegionGuard, Shared, Side, SyncCoordinator, WaitOutcome};
