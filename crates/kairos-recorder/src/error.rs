//! Errors returned to recorder producers.

use kairos_core::ObjectId;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors from [`MotionRecorder`](crate::MotionRecorder) producer calls.
///
/// Listener failures never appear here; they are logged and counted.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// The recorder was shut down.
    #[error("motion recorder has shut down")]
    ShutDown,
    /// An update named an object that has not been initialized.
    #[error("object {id} has not been initialized")]
    NotInitialized {
        /// The object.
        id: ObjectId,
    },
    /// `init_object` was called twice for the same object.
    #[error("object {id} is already initialized")]
    AlreadyInitialized {
        /// The object.
        id: ObjectId,
    },
    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The delivery thread could not be started.
    #[error("failed to spawn delivery thread")]
    Spawn(#[source] std::io::Error),
}
