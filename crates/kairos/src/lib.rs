//! Kairos: a discrete-event simulation kernel.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Kairos sub-crates. For most users, adding `kairos` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::time::Duration;
//! use kairos::prelude::*;
//! # struct Queue(Vec<(SimTime, Event)>, u64);
//! # impl Scheduler for Queue {
//! #     fn schedule_event(&mut self, _: ModelId, at: SimTime, e: Event) -> EventHandle {
//! #         self.0.push((at, e));
//! #         self.1 += 1;
//! #         EventHandle(self.1)
//! #     }
//! #     fn cancel_event(&mut self, _: EventHandle) {}
//! # }
//!
//! // A model that counts heartbeats from its own periodic timer.
//! struct Pacer {
//!     base: ModelBase,
//!     beats: u32,
//! }
//!
//! impl Model for Pacer {
//!     fn base(&self) -> &ModelBase { &self.base }
//!     fn base_mut(&mut self) -> &mut ModelBase { &mut self.base }
//!     fn declare_handlers(_h: &mut HandlerTableBuilder<Self>) {}
//!
//!     fn initialize(&mut self, ctx: &mut ModelContext<'_, Self>) -> HandlerResult {
//!         ctx.create_timer(
//!             |p: &mut Pacer, _ctx: &mut ModelContext<'_, Pacer>, _now: SimTime| {
//!                 p.beats += 1;
//!                 Ok(())
//!             },
//!             1.0,
//!             Duration::from_secs(1),
//!         )?;
//!         Ok(())
//!     }
//! }
//!
//! let kernel = KernelContext::new();
//! let id = kernel.allocate_model_id().unwrap();
//! let mut pacer = Entity::new(&kernel, Pacer { base: ModelBase::new(id, "pacer"), beats: 0 }).unwrap();
//! let mut queue = Queue(Vec::new(), 0);
//!
//! pacer.initialize(&mut queue).unwrap();
//! for _ in 0..3 {
//!     let (at, event) = queue.0.remove(0);
//!     pacer.process_event(at, event, &mut queue).unwrap();
//! }
//! assert_eq!(pacer.model().beats, 3);
//! assert_eq!(pacer.current_time(), SimTime::new(3.0, 0));
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `kairos-core` | `SimTime`, ids, events, the `Scheduler` boundary |
//! | [`model`] | `kairos-model` | Models, handler tables, entities, timers, contacts |
//! | [`recorder`] | `kairos-recorder` | Asynchronous motion and metadata fan-out |
//! | [`aggregate`] | `kairos-aggregate` | Hierarchical metric accumulation |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Time, ids, events, and the scheduler boundary (`kairos-core`).
pub use kairos_core as types;

/// Models, dispatch, and timers (`kairos-model`).
///
/// Wrap a [`model::Model`] in a [`model::Entity`] and drive it through
/// [`model::SimEntity`].
pub use kairos_model as model;

/// Motion and metadata fan-out to observers (`kairos-recorder`).
///
/// The [`recorder::MotionRecorder`] owns a delivery thread that calls
/// every registered [`recorder::Listener`].
pub use kairos_recorder as recorder;

/// Hierarchical metric accumulation (`kairos-aggregate`).
pub use kairos_aggregate as aggregate;

/// Common imports for typical Kairos usage.
///
/// ```rust
/// use kairos::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use kairos_core::{
        BodyHandle, Collision, CustomEvent, Event, EventHandle, EventKind, ExternalForce,
        ModelId, ObjectId, Quat, Scheduler, SimTime, TimerFired, Vec3,
    };

    // Models and dispatch
    pub use kairos_model::{
        Entity, HandlerResult, HandlerTableBuilder, KernelBuilder, KernelContext, Model,
        ModelBase, ModelContext, SimEntity, TimerHandle,
    };

    // Errors
    pub use kairos_core::TimerError;
    pub use kairos_model::{DispatchError, HandlerError, ModelError};

    // Recorder
    pub use kairos_recorder::{Listener, MetaUpdate, MotionRecorder, RecorderConfig, Shape};

    // Aggregation
    pub use kairos_aggregate::Aggregator;
}
