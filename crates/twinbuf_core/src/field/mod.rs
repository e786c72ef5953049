//! # Tracked Fields
//!
//! Identity, change detection and per-field merge rules.
//!
//! A field is one logical value inside the state object. The worker sees it
//! in the live copy, the editor sees it in the shadow copy, and the field
//! remembers what both sides looked like at the last synchronization point.

mod compare;
mod id;
mod tracked;

pub use compare::{
    content_hash_of, mark_of, strategy_of, ByEq, ByHash, Compare, CompareStrategy, ContentHash,
    MarkOf, Trackable,
};
pub use id::{FieldId, FieldKey};
pub use tracked::TrackedField;

pub(crate) use tracked::FieldOps;
