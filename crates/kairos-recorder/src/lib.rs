//! Asynchronous motion and metadata fan-out for Kairos observers.
//!
//! The simulation thread pushes object poses and presentation changes
//! into a [`MotionRecorder`]; a dedicated delivery thread hands them to
//! any number of [`Listener`]s (renderers, loggers) without ever making
//! the simulation wait on them. The one exception is
//! [`MotionRecorder::init_object`], which blocks until every listener
//! knows the object, so that no listener sees a pose for an object it
//! has not been told about.
//!
//! # Threading
//!
//! ```text
//! producers ──update_state/update_metadata──▶ unbounded queue
//!                                               │
//!                                   delivery thread (FIFO)
//!                                               │ delivery lock
//!                                               ▼
//!                                  snapshot of listeners
//! producer ──init_object──▶ delivery lock ──▶ snapshot of listeners
//! ```
//!
//! A listener that returns an error or panics is logged and skipped for
//! that one update; it keeps receiving later updates and never affects
//! other listeners.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
mod delivery;
pub mod error;
pub mod listener;
pub mod metrics;
pub mod recorder;
pub mod update;

pub use config::{ConfigError, RecorderConfig};
pub use error::RecorderError;
pub use listener::{Listener, ListenerError};
pub use metrics::RecorderMetrics;
pub use recorder::{MotionRecorder, ShutdownReport};
pub use update::{Color, MetaUpdate, Shape, Update};
