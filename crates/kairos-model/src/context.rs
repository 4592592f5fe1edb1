//! The per-dispatch view an entity gets of the kernel.

use std::time::Duration;

use kairos_core::{Event, EventHandle, ModelId, Scheduler, SimTime, TimerError};

use crate::error::HandlerResult;
use crate::timer::{Timer, TimerCallback, TimerHandle, TimerSink};

/// Handed to handlers, timer callbacks, and lifecycle hooks.
///
/// Carries the time of the event being processed, so offsets passed to
/// [`create_timer`](Self::create_timer) or [`schedule_in`](Self::schedule_in)
/// are relative to that event and never to wall-clock time.
pub struct ModelContext<'a, M> {
    id: ModelId,
    now: SimTime,
    scheduler: &'a mut dyn Scheduler,
    timers: &'a mut dyn TimerSink<M>,
}

impl<'a, M: 'static> ModelContext<'a, M> {
    pub(crate) fn new(
        id: ModelId,
        now: SimTime,
        scheduler: &'a mut dyn Scheduler,
        timers: &'a mut dyn TimerSink<M>,
    ) -> Self {
        Self {
            id,
            now,
            scheduler,
            timers,
        }
    }

    /// The entity being served.
    pub fn id(&self) -> ModelId {
        self.id
    }

    /// Time of the event being processed.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Direct access to the external scheduler.
    pub fn scheduler(&mut self) -> &mut dyn Scheduler {
        &mut *self.scheduler
    }

    /// Schedule `event` for another entity (or this one) at `at`.
    pub fn send(&mut self, to: ModelId, at: SimTime, event: Event) -> EventHandle {
        self.scheduler.schedule_event(to, at, event)
    }

    /// Schedule `event` for this entity `offset` seconds from now.
    pub fn schedule_in(&mut self, offset: f64, event: Event) -> Result<EventHandle, TimerError> {
        TimerError::check_offset(offset)?;
        let at = self.now.plus_secs(offset);
        Ok(self.scheduler.schedule_event(self.id, at, event))
    }

    /// Create a timer that first fires `offset` seconds after the
    /// current event, then every `period` (zero for one-shot).
    pub fn create_timer<F>(
        &mut self,
        callback: F,
        offset: f64,
        period: Duration,
    ) -> Result<TimerHandle, TimerError>
    where
        F: FnMut(&mut M, &mut ModelContext<'_, M>, SimTime) -> HandlerResult + Send + 'static,
    {
        self.timers
            .create(&mut *self.scheduler, self.now, Box::new(callback), offset, period)
    }

    /// Cancel one of this entity's timers.
    pub fn cancel_timer(&mut self, handle: TimerHandle) -> Result<(), TimerError> {
        self.timers.cancel(&mut *self.scheduler, handle)
    }

    /// Re-arm one of this entity's timers relative to the current event.
    pub fn reset_timer(
        &mut self,
        handle: TimerHandle,
        offset: f64,
        period: Duration,
    ) -> Result<(), TimerError> {
        self.timers
            .reset(&mut *self.scheduler, handle, self.now, offset, period)
    }

    /// Inspect one of this entity's timers.
    pub fn timer(&self, handle: TimerHandle) -> Option<&Timer> {
        self.timers.lookup(handle)
    }

    /// Run `f` with a context typed for an embedded model `P`, reached
    /// through `project`. Timers created through the projected context
    /// still belong to this entity.
    pub(crate) fn project<P: 'static, R>(
        &mut self,
        project: fn(&mut M) -> &mut P,
        f: impl FnOnce(&mut ModelContext<'_, P>) -> R,
    ) -> R {
        let mut sink = Projected {
            inner: &mut *self.timers,
            project,
        };
        let mut ctx = ModelContext {
            id: self.id,
            now: self.now,
            scheduler: &mut *self.scheduler,
            timers: &mut sink,
        };
        f(&mut ctx)
    }
}

/// Adapts a `TimerSink<M>` so an embedded `P` can create timers whose
/// callbacks run against the projected `P`.
struct Projected<'s, M, P> {
    inner: &'s mut dyn TimerSink<M>,
    project: fn(&mut M) -> &mut P,
}

impl<M: 'static, P: 'static> TimerSink<P> for Projected<'_, M, P> {
    fn create(
        &mut self,
        scheduler: &mut dyn Scheduler,
        now: SimTime,
        callback: TimerCallback<P>,
        offset: f64,
        period: Duration,
    ) -> Result<TimerHandle, TimerError> {
        let lifted = lift_callback(self.project, callback);
        self.inner.create(scheduler, now, lifted, offset, period)
    }

    fn cancel(&mut self, scheduler: &mut dyn Scheduler, handle: TimerHandle) -> Result<(), TimerError> {
        self.inner.cancel(scheduler, handle)
    }

    fn reset(
        &mut self,
        scheduler: &mut dyn Scheduler,
        handle: TimerHandle,
        now: SimTime,
        offset: f64,
        period: Duration,
    ) -> Result<(), TimerError> {
        self.inner.reset(scheduler, handle, now, offset, period)
    }

    fn lookup(&self, handle: TimerHandle) -> Option<&Timer> {
        self.inner.lookup(handle)
    }
}

fn lift_callback<M: 'static, P: 'static>(
    project: fn(&mut M) -> &mut P,
    mut callback: TimerCallback<P>,
) -> TimerCallback<M> {
    boxed_callback(move |model: &mut M, ctx: &mut ModelContext<'_, M>, now: SimTime| {
        ctx.project(project, |pctx| callback(project(model), pctx, now))
    })
}

fn boxed_callback<M, F>(f: F) -> TimerCallback<M>
where
    F: FnMut(&mut M, &mut ModelContext<'_, M>, SimTime) -> HandlerResult + Send + 'static,
{
    Box::new(f)
}
