//! The observer capability.

use kairos_core::{ObjectId, Quat, Vec3};

use crate::update::{MetaUpdate, Shape};

/// Error a listener may return. It is logged by the recorder and never
/// reaches the simulation.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Receives object descriptions and updates from a
/// [`MotionRecorder`](crate::MotionRecorder).
///
/// Calls into one listener are serialized: the recorder never invokes
/// the same listener from two updates at once. Calls may come from the
/// delivery thread or, for `init_object`, from the producer thread.
///
/// For a given object, `init_object` is always observed before any
/// `state_update` or `meta_update`.
pub trait Listener: Send + Sync {
    /// An object was introduced.
    fn init_object(&self, id: ObjectId, shape: &Shape) -> Result<(), ListenerError>;

    /// An object moved.
    fn state_update(&self, id: ObjectId, position: Vec3, orientation: Quat) -> Result<(), ListenerError>;

    /// An object's presentation changed.
    fn meta_update(&self, _id: ObjectId, _meta: &MetaUpdate) -> Result<(), ListenerError> {
        Ok(())
    }
}
