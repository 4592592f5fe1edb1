//! Core types for the Kairos discrete-event simulation kernel.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the causal time model ([`SimTime`]), identifiers, the closed set of
//! built-in event payloads plus the extension point for custom ones,
//! and the [`Scheduler`] boundary the kernel calls into.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod event;
pub mod id;
pub mod math;
pub mod scheduler;
pub mod time;

pub use error::TimerError;
pub use event::{Collision, CustomEvent, Event, EventKind, ExternalForce, TimerFired};
pub use id::{BodyHandle, EventHandle, ListenerId, ModelId, ObjectId, TimerId};
pub use math::{Quat, Vec3};
pub use scheduler::Scheduler;
pub use time::SimTime;
