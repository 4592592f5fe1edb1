//! Entity lifecycle, handler-table dispatch, and timers for the Kairos
//! discrete-event simulation kernel.
//!
//! A host builds one [`KernelContext`] per run, wraps each model in an
//! [`Entity`], and drives it through the [`SimEntity`] trait:
//! `initialize` once, `process_event` for each event in causal order,
//! then `finish` once.
//!
//! Handlers are registered statically per model type in
//! [`Model::declare_handlers`]. Event kinds can declare supertypes and
//! capability interfaces through [`KernelBuilder`]; when a model has no
//! handler for an event's exact kind, dispatch falls back through those
//! declarations and memoizes the result.
//!
//! # Example
//!
//! ```
//! use kairos_core::{Event, ExternalForce, ModelId, Scheduler, SimTime, Vec3};
//! use kairos_model::{Entity, HandlerTableBuilder, KernelContext, Model, ModelBase, SimEntity};
//! # use kairos_core::EventHandle;
//! # struct NullScheduler(u64);
//! # impl Scheduler for NullScheduler {
//! #     fn schedule_event(&mut self, _: ModelId, _: SimTime, _: Event) -> EventHandle {
//! #         self.0 += 1;
//! #         EventHandle(self.0)
//! #     }
//! #     fn cancel_event(&mut self, _: EventHandle) {}
//! # }
//!
//! struct Rocket {
//!     base: ModelBase,
//!     thrust: f64,
//! }
//!
//! impl Model for Rocket {
//!     fn base(&self) -> &ModelBase { &self.base }
//!     fn base_mut(&mut self) -> &mut ModelBase { &mut self.base }
//!
//!     fn declare_handlers(h: &mut HandlerTableBuilder<Self>) {
//!         h.on::<ExternalForce, _>(|rocket, _ctx, _t, f| {
//!             rocket.thrust += f.force.z;
//!             Ok(())
//!         });
//!     }
//! }
//!
//! let kernel = KernelContext::new();
//! let id = kernel.allocate_model_id().unwrap();
//! let mut rocket = Entity::new(&kernel, Rocket { base: ModelBase::new(id, "r1"), thrust: 0.0 }).unwrap();
//! let mut sched = NullScheduler(0);
//!
//! rocket.initialize(&mut sched).unwrap();
//! let push = ExternalForce { id: "engine".into(), force: Vec3::new(0.0, 0.0, 9.0) };
//! rocket.process_event(SimTime::new(1.0, 0), push.into(), &mut sched).unwrap();
//! assert_eq!(rocket.model().thrust, 9.0);
//! assert_eq!(rocket.current_time(), SimTime::new(1.0, 0));
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod contact;
pub mod context;
pub mod entity;
pub mod error;
pub mod handler;
pub mod hierarchy;
pub mod kernel;
pub mod lookup;
pub mod model;
pub mod timer;

pub use contact::{Contact, EntityInfo, EntityTable, MetaValue, Metadata};
pub use context::ModelContext;
pub use entity::{Entity, SimEntity};
pub use error::{
    DispatchError, HandlerError, HandlerResult, HandlerTableError, HierarchyError, ModelError,
};
pub use handler::{HandlerTable, HandlerTableBuilder, ResolutionStats};
pub use hierarchy::EventHierarchy;
pub use kernel::{KernelBuilder, KernelContext, DEFAULT_MAX_MODEL_ID};
pub use lookup::{find_model_by_type, find_models_by_type};
pub use model::{Lifecycle, Model, ModelBase};
pub use timer::{Timer, TimerCallback, TimerHandle, TimerSet, TimerState};
