//! The dispatch host that owns one model instance.
//!
//! [`Entity`] wraps a [`Model`] with its timers, its type's shared
//! [`HandlerTable`], and its lifecycle state. The scheduler talks to it
//! through the object-safe [`SimEntity`] trait so that heterogeneous
//! model types can live in one collection.
//!
//! Dispatch of one event:
//!
//! 1. reject if not initialized, already finished, or earlier than the
//!    entity's current time;
//! 2. set the entity's current time to the event's time;
//! 3. deliver `TimerFired` to the timer's own callback, or resolve the
//!    event's kind in the handler table (falling back through declared
//!    supertypes) and invoke the handler;
//! 4. wrap any handler error with the event time, event kind, and model
//!    type.

use std::any::Any;
use std::sync::Arc;

use kairos_core::{Event, EventKind, ModelId, Scheduler, SimTime, TimerError, TimerFired};
use tracing::trace;

use crate::context::ModelContext;
use crate::error::{DispatchError, HandlerError, HandlerResult, HandlerTableError, ModelError};
use crate::handler::HandlerTable;
use crate::kernel::KernelContext;
use crate::model::{Lifecycle, Model};
use crate::timer::TimerSet;

/// Object-safe view of an entity, used by schedulers and lookups.
pub trait SimEntity: Any + Send {
    /// The entity's id.
    fn id(&self) -> ModelId;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Time of the last dispatched event.
    fn current_time(&self) -> SimTime;

    /// Rust type name of the wrapped model.
    fn type_name(&self) -> &'static str;

    /// Current lifecycle state.
    fn lifecycle(&self) -> Lifecycle;

    /// Run the model's `initialize` hook. Must be called exactly once,
    /// before any event.
    fn initialize(&mut self, scheduler: &mut dyn Scheduler) -> Result<(), ModelError>;

    /// Deliver one event.
    fn process_event(
        &mut self,
        time: SimTime,
        event: Event,
        scheduler: &mut dyn Scheduler,
    ) -> Result<(), DispatchError>;

    /// Run the model's `finish` hook and cancel its pending timers.
    fn finish(&mut self, scheduler: &mut dyn Scheduler) -> Result<(), ModelError>;

    /// The wrapped model, for downcasting.
    fn model_any(&self) -> &dyn Any;

    /// The wrapped model, mutably, for downcasting.
    fn model_any_mut(&mut self) -> &mut dyn Any;
}

/// One model instance plus its timers and lifecycle.
pub struct Entity<M: Model> {
    model: M,
    timers: TimerSet<M>,
    table: Arc<HandlerTable<M>>,
    lifecycle: Lifecycle,
}

impl<M: Model> Entity<M> {
    /// Wrap `model`, building its type's handler table on first use.
    pub fn new(kernel: &KernelContext, model: M) -> Result<Self, HandlerTableError> {
        let table = kernel.handler_table::<M>()?;
        let timers = TimerSet::new(model.base().id());
        Ok(Self {
            model,
            timers,
            table,
            lifecycle: Lifecycle::Constructed,
        })
    }

    /// The wrapped model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// The wrapped model, mutably.
    ///
    /// Intended for setup before `initialize`; mutating the model's
    /// clock here bypasses the time-regression check.
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// Timers this entity has created.
    pub fn timers(&self) -> &TimerSet<M> {
        &self.timers
    }

    /// The shared handler table of `M`.
    pub fn handler_table(&self) -> &HandlerTable<M> {
        &self.table
    }

    /// Unwrap the model.
    pub fn into_inner(self) -> M {
        self.model
    }

    fn check_accepting(&self, time: SimTime) -> Result<(), DispatchError> {
        let model = self.model.base().id();
        match self.lifecycle {
            Lifecycle::Constructed => return Err(DispatchError::NotInitialized { model }),
            Lifecycle::Finished => return Err(DispatchError::Finished { model }),
            Lifecycle::Initialized => {}
        }
        let current = self.model.base().current_time();
        if time < current {
            return Err(DispatchError::TimeRegression {
                model,
                current,
                requested: time,
            });
        }
        Ok(())
    }

    fn fire_timer(
        &mut self,
        time: SimTime,
        fired: TimerFired,
        scheduler: &mut dyn Scheduler,
    ) -> Result<(), DispatchError> {
        let id = self.model.base().id();
        if fired.owner != id {
            return Err(TimerError::UnknownTimer {
                owner: fired.owner,
                timer: fired.timer,
            }
            .into());
        }
        let Some(mut callback) = self.timers.begin_fire(&fired)? else {
            return Ok(());
        };

        let result = {
            let mut ctx = ModelContext::new(id, time, &mut *scheduler, &mut self.timers);
            callback(&mut self.model, &mut ctx, time)
        };
        // The timer keeps its cadence whether or not the callback failed.
        self.timers.end_fire(fired.timer, callback, time, scheduler);
        result.map_err(|source| self.handler_failed(time, EventKind::of::<TimerFired>(), source))
    }

    fn handler_failed(&self, time: SimTime, kind: EventKind, source: HandlerError) -> DispatchError {
        DispatchError::HandlerFailed {
            time,
            event_type: kind.name(),
            target_type: self.table.target_type(),
            source,
        }
    }

    fn run_hook(
        &mut self,
        hook: &'static str,
        body: fn(&mut M, &mut ModelContext<'_, M>) -> HandlerResult,
        scheduler: &mut dyn Scheduler,
    ) -> Result<(), ModelError> {
        let id = self.model.base().id();
        let now = self.model.base().current_time();
        let mut ctx = ModelContext::new(id, now, scheduler, &mut self.timers);
        let result = body(&mut self.model, &mut ctx);
        result.map_err(|source| ModelError::HookFailed {
            model: id,
            hook,
            target_type: self.table.target_type(),
            source,
        })
    }
}

impl<M: Model> SimEntity for Entity<M> {
    fn id(&self) -> ModelId {
        self.model.base().id()
    }

    fn name(&self) -> &str {
        self.model.base().name()
    }

    fn current_time(&self) -> SimTime {
        self.model.base().current_time()
    }

    fn type_name(&self) -> &'static str {
        self.table.target_type()
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn initialize(&mut self, scheduler: &mut dyn Scheduler) -> Result<(), ModelError> {
        let model = self.id();
        if model == ModelId(0) {
            return Err(ModelError::ReservedId);
        }
        match self.lifecycle {
            Lifecycle::Constructed => {}
            Lifecycle::Initialized => return Err(ModelError::AlreadyInitialized { model }),
            Lifecycle::Finished => return Err(ModelError::AlreadyFinished { model }),
        }
        // The transition happens even if the hook fails, so the hook
        // never runs twice.
        self.lifecycle = Lifecycle::Initialized;
        trace!(model = %model, "initialize");
        self.run_hook("initialize", M::initialize, scheduler)
    }

    fn process_event(
        &mut self,
        time: SimTime,
        event: Event,
        scheduler: &mut dyn Scheduler,
    ) -> Result<(), DispatchError> {
        self.check_accepting(time)?;
        self.model.base_mut().set_current_time(time);

        let kind = event.kind();
        trace!(model = %self.id(), event = kind.name(), time = %time, "dispatch");

        if let Event::TimerFired(fired) = event {
            return self.fire_timer(time, fired, scheduler);
        }

        let handler = self
            .table
            .resolve(kind)
            .ok_or_else(|| DispatchError::NoHandlerFound {
                event_type: kind.name(),
                target_type: self.table.target_type(),
            })?;

        let id = self.id();
        let result = {
            let mut ctx = ModelContext::new(id, time, scheduler, &mut self.timers);
            handler(&mut self.model, &mut ctx, time, &event)
        };
        result.map_err(|source| self.handler_failed(time, kind, source))
    }

    fn finish(&mut self, scheduler: &mut dyn Scheduler) -> Result<(), ModelError> {
        let model = self.id();
        match self.lifecycle {
            Lifecycle::Initialized => {}
            Lifecycle::Constructed => return Err(ModelError::NotInitialized { model }),
            Lifecycle::Finished => return Err(ModelError::AlreadyFinished { model }),
        }
        self.lifecycle = Lifecycle::Finished;
        trace!(model = %model, "finish");
        let result = self.run_hook("finish", M::finish, scheduler);
        self.timers.cancel_all(scheduler);
        result
    }

    fn model_any(&self) -> &dyn Any {
        &self.model
    }

    fn model_any_mut(&mut self) -> &mut dyn Any {
        &mut self.model
    }
}
