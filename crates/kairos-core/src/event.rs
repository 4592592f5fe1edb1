//! Event payloads and event-kind identity.
//!
//! [`Event`] is a closed sum over the built-in payloads plus one
//! [`Event::Custom`] arm that carries any type implementing
//! [`CustomEvent`]. Every payload type has an [`EventKind`] derived from
//! its `TypeId`, so no global registry of event types is needed. Marker
//! types with no payload can also serve as kinds; the dispatch layer
//! uses them as supertypes or capability interfaces for fallback
//! resolution.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::id::{BodyHandle, ModelId, TimerId};
use crate::math::Vec3;

/// Runtime identity of an event payload type (or marker kind).
#[derive(Clone, Copy)]
pub struct EventKind {
    id: TypeId,
    name: &'static str,
}

impl EventKind {
    /// The kind for type `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Fully qualified type name, for diagnostics only.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for EventKind {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EventKind {}

impl Hash for EventKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A timer owned by `owner` reached its firing time.
///
/// `seq` identifies the arm of the timer that produced this firing;
/// firings from an arm that was since canceled or replaced are stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerFired {
    /// Entity that owns the timer.
    pub owner: ModelId,
    /// The timer within the owner.
    pub timer: TimerId,
    /// Arm sequence number at scheduling time.
    pub seq: u64,
}

/// Two bodies came into contact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Collision {
    /// The body whose listeners are being notified.
    pub body: BodyHandle,
    /// The other body, if the physics layer reported it.
    pub other: Option<BodyHandle>,
}

/// A named force applied to an entity from outside the simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct ExternalForce {
    /// Caller-chosen label for the force source.
    pub id: String,
    /// Force vector in world coordinates.
    pub force: Vec3,
}

/// A user-defined event payload.
///
/// Implement this (usually with an empty `impl` block) for any type
/// that should travel through the scheduler as [`Event::Custom`].
pub trait CustomEvent: Any + Send + fmt::Debug {
    /// The concrete kind of this payload.
    fn kind(&self) -> EventKind {
        EventKind::of::<Self>()
    }
}

/// An instantaneous occurrence delivered to exactly one entity.
#[derive(Debug)]
pub enum Event {
    /// A timer fired.
    TimerFired(TimerFired),
    /// A collision was reported by the physics layer.
    Collision(Collision),
    /// An external force was applied.
    ExternalForce(ExternalForce),
    /// Any other payload.
    Custom(Box<dyn CustomEvent>),
}

impl Event {
    /// Wrap a user payload.
    pub fn custom<E: CustomEvent>(payload: E) -> Self {
        Self::Custom(Box::new(payload))
    }

    /// The concrete kind of the payload carried by this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::TimerFired(_) => EventKind::of::<TimerFired>(),
            Self::Collision(_) => EventKind::of::<Collision>(),
            Self::ExternalForce(_) => EventKind::of::<ExternalForce>(),
            Self::Custom(payload) => payload.kind(),
        }
    }

    /// Borrow the payload as `E`, if that is its concrete type.
    pub fn payload<E: 'static>(&self) -> Option<&E> {
        let any: &dyn Any = match self {
            Self::TimerFired(p) => p,
            Self::Collision(p) => p,
            Self::ExternalForce(p) => p,
            Self::Custom(p) => {
                let inner: &dyn CustomEvent = &**p;
                inner
            }
        };
        any.downcast_ref::<E>()
    }
}

impl From<TimerFired> for Event {
    fn from(p: TimerFired) -> Self {
        Self::TimerFired(p)
    }
}

impl From<Collision> for Event {
    fn from(p: Collision) -> Self {
        Self::Collision(p)
    }
}

impl From<ExternalForce> for Event {
    fn from(p: ExternalForce) -> Self {
        Self::ExternalForce(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Ping(u32);
    impl CustomEvent for Ping {}

    #[test]
    fn builtin_kinds_are_distinct() {
        let fired = Event::from(TimerFired {
            owner: ModelId(1),
            timer: TimerId(0),
            seq: 1,
        });
        let force = Event::from(ExternalForce {
            id: "wind".into(),
            force: Vec3::new(1.0, 0.0, 0.0),
        });
        assert_eq!(fired.kind(), EventKind::of::<TimerFired>());
        assert_ne!(fired.kind(), force.kind());
    }

    #[test]
    fn custom_kind_is_concrete_type() {
        let ev = Event::custom(Ping(7));
        assert_eq!(ev.kind(), EventKind::of::<Ping>());
        assert_eq!(ev.payload::<Ping>(), Some(&Ping(7)));
        assert!(ev.payload::<TimerFired>().is_none());
    }

    #[test]
    fn builtin_payload_downcast() {
        let ev = Event::from(ExternalForce {
            id: "thrust".into(),
            force: Vec3::new(0.0, 0.0, 9.81),
        });
        let force = ev.payload::<ExternalForce>().map(|f| f.force.z);
        assert_eq!(force, Some(9.81));
    }

    #[test]
    fn kind_name_is_type_name() {
        assert!(EventKind::of::<Ping>().name().ends_with("Ping"));
    }
}
