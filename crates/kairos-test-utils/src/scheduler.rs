//! An in-memory [`Scheduler`] that records every call and can drive a
//! minimal causal event loop.

use std::collections::{BTreeMap, HashMap};

use kairos_core::{Event, EventHandle, EventKind, ModelId, Scheduler, SimTime};

/// One `schedule_event` call as the mock saw it.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduledCall {
    pub handle: EventHandle,
    pub owner: ModelId,
    pub at: SimTime,
    pub kind: EventKind,
}

/// An event popped off the mock's queue.
#[derive(Debug)]
pub struct Delivery {
    pub handle: EventHandle,
    pub owner: ModelId,
    pub at: SimTime,
    pub event: Event,
}

/// Mock implementation of [`Scheduler`].
///
/// Events are kept in `(SimTime, insertion order)` order, so equal
/// times are delivered first-in first-out. Use
/// [`pop_next`](MockScheduler::pop_next) or
/// [`run_until`](MockScheduler::run_until) to drive delivery.
///
/// [`ignoring_cancels`](MockScheduler::ignoring_cancels) builds a mock
/// that records cancellations but still delivers the events, for
/// exercising stale-delivery paths.
#[derive(Default)]
pub struct MockScheduler {
    next_handle: u64,
    queue: BTreeMap<(SimTime, u64), Delivery>,
    keys: HashMap<EventHandle, (SimTime, u64)>,
    scheduled: Vec<ScheduledCall>,
    canceled: Vec<EventHandle>,
    honor_cancels: bool,
}

impl MockScheduler {
    pub fn new() -> Self {
        Self {
            honor_cancels: true,
            ..Self::default()
        }
    }

    /// A mock whose `cancel_event` is recorded but has no effect.
    pub fn ignoring_cancels() -> Self {
        Self {
            honor_cancels: false,
            ..Self::default()
        }
    }

    /// Total `schedule_event` calls.
    pub fn scheduled_count(&self) -> usize {
        self.scheduled.len()
    }

    /// Total `cancel_event` calls.
    pub fn cancel_count(&self) -> usize {
        self.canceled.len()
    }

    /// Events still waiting for delivery.
    pub fn live_count(&self) -> usize {
        self.queue.len()
    }

    /// Every `schedule_event` call, in call order.
    pub fn scheduled(&self) -> &[ScheduledCall] {
        &self.scheduled
    }

    /// Every `cancel_event` call, in call order.
    pub fn canceled(&self) -> &[EventHandle] {
        &self.canceled
    }

    /// Time of the next event, if any.
    pub fn peek_time(&self) -> Option<SimTime> {
        self.queue.keys().next().map(|(at, _)| *at)
    }

    /// Remove and return the earliest event.
    pub fn pop_next(&mut self) -> Option<Delivery> {
        let (_, delivery) = self.queue.pop_first()?;
        self.keys.remove(&delivery.handle);
        Some(delivery)
    }

    /// Deliver every event due at or before `until`, including events
    /// scheduled by `deliver` itself. Returns the number delivered.
    pub fn run_until<F>(&mut self, until: SimTime, mut deliver: F) -> usize
    where
        F: FnMut(&mut MockScheduler, Delivery),
    {
        let mut delivered = 0;
        while self.peek_time().is_some_and(|t| t <= until) {
            let Some(next) = self.pop_next() else { break };
            deliver(self, next);
            delivered += 1;
        }
        delivered
    }
}

impl Scheduler for MockScheduler {
    fn schedule_event(&mut self, owner: ModelId, at: SimTime, event: Event) -> EventHandle {
        self.next_handle += 1;
        let handle = EventHandle(self.next_handle);
        self.scheduled.push(ScheduledCall {
            handle,
            owner,
            at,
            kind: event.kind(),
        });
        let key = (at, self.next_handle);
        self.keys.insert(handle, key);
        self.queue.insert(
            key,
            Delivery {
                handle,
                owner,
                at,
                event,
            },
        );
        handle
    }

    fn cancel_event(&mut self, handle: EventHandle) {
        self.canceled.push(handle);
        if self.honor_cancels {
            if let Some(key) = self.keys.remove(&handle) {
                self.queue.remove(&key);
            }
        }
    }
}
