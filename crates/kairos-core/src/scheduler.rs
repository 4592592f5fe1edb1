//! The boundary to the external event scheduler.
//!
//! The scheduler owns the global event queue and advances simulated
//! time. The kernel never runs a queue itself; it only asks the
//! scheduler to enqueue or retire events on behalf of an entity.

use crate::event::Event;
use crate::id::{EventHandle, ModelId};
use crate::time::SimTime;

/// Global event queue owned by the host simulation.
///
/// Implementations must deliver events to their owners in
/// non-decreasing [`SimTime`] order, one at a time.
pub trait Scheduler {
    /// Enqueue `event` for delivery to `owner` at `at`.
    fn schedule_event(&mut self, owner: ModelId, at: SimTime, event: Event) -> EventHandle;

    /// Retire a previously scheduled event so it is never delivered.
    ///
    /// Canceling an unknown or already-delivered handle is a no-op.
    fn cancel_event(&mut self, handle: EventHandle);
}

impl<S: Scheduler + ?Sized> Scheduler for &mut S {
    fn schedule_event(&mut self, owner: ModelId, at: SimTime, event: Event) -> EventHandle {
        (**self).schedule_event(owner, at, event)
    }

    fn cancel_event(&mut self, handle: EventHandle) {
        (**self).cancel_event(handle)
    }
}
