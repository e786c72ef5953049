//! # TWINBUF
//!
//! Worker and editor loops over the field-level double buffer in
//! [`twinbuf_core`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              RUNTIME                                    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐   │
//! │  │  WORKER THREAD  │     │  SHARED         │     │  EDITOR THREAD  │   │
//! │  │                 │     │                 │     │  (caller)       │   │
//! │  │  • Simulation   │────>│  • live region  │     │  • EditorView   │   │
//! │  │  • merge window │     │  • shadow store │<────│  • populate     │   │
//! │  │  • tick pacing  │     │  • coordinator  │     │  • draw         │   │
//! │  └─────────────────┘     └─────────────────┘     └─────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: TOML run configuration
//! - `worker` / `editor`: the two loops
//! - `runtime`: thread management
//! - `demo`: a headless orbit simulation and scripted editor

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

pub mod config;
pub mod demo;
pub mod editor;
pub mod error;
pub mod runtime;
pub mod stats;
pub mod worker;

pub use twinbuf_core as core;

pub use config::RunConfig;
pub use editor::{Control, EditorLoop, EditorReport, EditorView, FrameContext};
pub use error::{ConfigError, ConfigResult, RuntimeError, RuntimeResult};
pub use runtime::{RunReport, Runtime, WORKER_THREAD_NAME};
pub use stats::{CycleStats, FrameStatsAccumulator};
pub use worker::{Simulation, TickContext, WorkerLoop, WorkerReport};
