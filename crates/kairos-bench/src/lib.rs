//! Benchmark fixtures for the Kairos simulation kernel.
//!
//! - [`SinkScheduler`]: a scheduler that counts and drops everything
//! - [`Counter`]: a model with one exact handler and one fallback handler
//! - [`signal_kernel`]: a kernel where [`Burst`] falls back to [`Signal`]
//! - [`deep_kernel`]: `depth` supertype levels above [`Burst`]

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use kairos_core::{CustomEvent, Event, EventHandle, ModelId, Scheduler, SimTime};
use kairos_model::{
    Entity, HandlerTableBuilder, KernelBuilder, KernelContext, Model, ModelBase, SimEntity,
};

/// Drops every event and hands out increasing handles.
#[derive(Default)]
pub struct SinkScheduler {
    /// Events scheduled so far.
    pub scheduled: u64,
}

impl Scheduler for SinkScheduler {
    fn schedule_event(&mut self, _owner: ModelId, _at: SimTime, _event: Event) -> EventHandle {
        self.scheduled += 1;
        EventHandle(self.scheduled)
    }

    fn cancel_event(&mut self, _handle: EventHandle) {}
}

/// Handled by an exact typed handler.
#[derive(Debug)]
pub struct Pulse;
impl CustomEvent for Pulse {}

/// Only reachable through its [`Signal`] supertype.
#[derive(Debug)]
pub struct Burst;
impl CustomEvent for Burst {}

/// Interface every [`Burst`] falls back to.
pub struct Signal;

/// Intermediate supertype level for [`deep_kernel`].
pub struct Level<const N: usize>;

/// Counts what it receives.
pub struct Counter {
    base: ModelBase,
    /// `Pulse` deliveries.
    pub pulses: u64,
    /// Deliveries through the `Signal` fallback.
    pub signals: u64,
}

impl Model for Counter {
    fn base(&self) -> &ModelBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModelBase {
        &mut self.base
    }

    fn declare_handlers(h: &mut HandlerTableBuilder<Self>) {
        h.on::<Pulse, _>(|m, _ctx, _t, _e| {
            m.pulses += 1;
            Ok(())
        });
        h.on_kind::<Signal, _>(|m, _ctx, _t, _e| {
            m.signals += 1;
            Ok(())
        });
    }
}

/// `Burst` declares `Signal` as its only supertype.
pub fn signal_kernel() -> KernelContext {
    KernelBuilder::new()
        .interface::<Signal>()
        .supertype::<Burst, Signal>()
        .build()
        .unwrap()
}

/// `Burst -> Level<0> -> ... -> Level<3> -> Signal`, so a fallback walk
/// visits five kinds before it finds a handler.
pub fn deep_kernel() -> KernelContext {
    KernelBuilder::new()
        .interface::<Signal>()
        .supertype::<Burst, Level<0>>()
        .supertype::<Level<0>, Level<1>>()
        .supertype::<Level<1>, Level<2>>()
        .supertype::<Level<2>, Level<3>>()
        .supertype::<Level<3>, Signal>()
        .build()
        .unwrap()
}

/// An initialized [`Counter`] entity.
pub fn counter(kernel: &KernelContext) -> Entity<Counter> {
    let id = kernel.allocate_model_id().unwrap();
    let model = Counter {
        base: ModelBase::new(id, "counter"),
        pulses: 0,
        signals: 0,
    };
    let mut entity = Entity::new(kernel, model).unwrap();
    entity.initialize(&mut SinkScheduler::default()).unwrap();
    entity
}
