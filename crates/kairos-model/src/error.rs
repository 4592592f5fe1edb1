//! Error types for entity lifecycle, handler registration, and dispatch.
//!
//! Construction errors ([`HandlerTableError`], [`HierarchyError`],
//! [`ModelError`]) are fatal to the operation that raised them.
//! [`DispatchError`] is fatal to a single event only; the host decides
//! whether to skip the event or abort the run.

use kairos_core::{ModelId, SimTime, TimerError};
use thiserror::Error;

/// Error type returned by user handlers, timer callbacks, and hooks.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result type returned by user handlers, timer callbacks, and hooks.
pub type HandlerResult = Result<(), HandlerError>;

/// Errors from entity construction and lifecycle transitions.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A parent was already assigned; parents are set at most once.
    #[error("model {model} already has parent {existing}")]
    ParentAlreadySet {
        /// The child.
        model: ModelId,
        /// Its existing parent.
        existing: ModelId,
    },
    /// A model was asked to be its own parent.
    #[error("model {model} cannot be its own parent")]
    SelfParent {
        /// The offending model.
        model: ModelId,
    },
    /// Id 0 is reserved; ids start at 1.
    #[error("model id 0 is reserved")]
    ReservedId,
    /// Every id in the configured range has been handed out.
    #[error("model id space exhausted (max {max})")]
    IdSpaceExhausted {
        /// Largest id the kernel may allocate.
        max: u32,
    },
    /// `initialize` was called a second time.
    #[error("model {model} is already initialized")]
    AlreadyInitialized {
        /// The offending model.
        model: ModelId,
    },
    /// `finish` was called before `initialize`.
    #[error("model {model} was never initialized")]
    NotInitialized {
        /// The offending model.
        model: ModelId,
    },
    /// `finish` was called a second time.
    #[error("model {model} is already finished")]
    AlreadyFinished {
        /// The offending model.
        model: ModelId,
    },
    /// The model's own `initialize` or `finish` body failed.
    #[error("{hook} hook of model {model} ({target_type}) failed")]
    HookFailed {
        /// The failing model.
        model: ModelId,
        /// `"initialize"` or `"finish"`.
        hook: &'static str,
        /// Rust type name of the model.
        target_type: &'static str,
        /// The hook's own error.
        #[source]
        source: HandlerError,
    },
    /// A timer operation failed.
    #[error(transparent)]
    Timer(#[from] TimerError),
}

/// Errors building the event supertype graph.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum HierarchyError {
    /// A kind was declared as its own supertype.
    #[error("event kind {kind} cannot be its own supertype")]
    SelfSupertype {
        /// The kind.
        kind: &'static str,
    },
    /// The declaration would close a cycle.
    #[error("declaring {supertype} as a supertype of {kind} creates a cycle")]
    Cycle {
        /// The subtype being declared.
        kind: &'static str,
        /// The supertype being declared.
        supertype: &'static str,
    },
}

/// Errors validating a model type's handler declarations.
///
/// Raised once per model type when its table is first built, never on
/// the dispatch path.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum HandlerTableError {
    /// A handler's parameter type cannot receive every event routed to it.
    #[error("invalid handler signature on {target_type} for {event_type}: {reason}")]
    InvalidHandlerSignature {
        /// Rust type name of the model declaring the handler.
        target_type: &'static str,
        /// The event kind the handler was declared for.
        event_type: &'static str,
        /// What is wrong with the declaration.
        reason: &'static str,
    },
}

/// Errors delivering one event to one entity.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Neither the event's kind nor any declared supertype has a handler.
    #[error("no handler on {target_type} for {event_type}")]
    NoHandlerFound {
        /// Kind of the undeliverable event.
        event_type: &'static str,
        /// Rust type name of the target model.
        target_type: &'static str,
    },
    /// The resolved handler (or timer callback) returned an error.
    #[error("handler on {target_type} for {event_type} failed at {time}")]
    HandlerFailed {
        /// Time of the event being processed.
        time: SimTime,
        /// Kind of the event being processed.
        event_type: &'static str,
        /// Rust type name of the target model.
        target_type: &'static str,
        /// The handler's own error.
        #[source]
        source: HandlerError,
    },
    /// An event arrived before `initialize`.
    #[error("model {model} received an event before initialize")]
    NotInitialized {
        /// The target model.
        model: ModelId,
    },
    /// An event arrived after `finish`.
    #[error("model {model} received an event after finish")]
    Finished {
        /// The target model.
        model: ModelId,
    },
    /// The event is earlier than the last one this entity processed.
    #[error("model {model} at {current} received an event for {requested}")]
    TimeRegression {
        /// The target model.
        model: ModelId,
        /// Time of the last dispatched event.
        current: SimTime,
        /// Time of the rejected event.
        requested: SimTime,
    },
    /// A timer firing referred to a timer the entity does not own.
    #[error(transparent)]
    Timer(#[from] TimerError),
}
