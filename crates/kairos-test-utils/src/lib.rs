//! Test utilities and mock types for Kairos development.
//!
//! Provides a [`MockScheduler`] implementing the kernel's
//! [`Scheduler`](kairos_core::Scheduler) boundary, and recorder
//! listeners ([`RecordingListener`], [`FailingListener`]) for observing
//! and fault-injecting the delivery path.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod listener;
pub mod scheduler;

pub use listener::{FailingListener, FailureMode, Notification, RecordingListener};
pub use scheduler::{Delivery, MockScheduler, ScheduledCall};
