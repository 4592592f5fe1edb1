//! Per-body side table of contact points, collision listeners, and
//! metadata.
//!
//! [`EntityTable`] is a generational slab keyed by [`BodyHandle`]. The
//! physics layer stores a body's handle in its own user-data slot and
//! resolves it here, so no global body-to-model map exists and no
//! unchecked downcast is needed. Both the collision callbacks that
//! append contacts and the models that read them run on the simulation
//! thread, so nothing here locks.

use indexmap::{IndexMap, IndexSet};
use kairos_core::{BodyHandle, Collision, Event, EventHandle, ModelId, Scheduler, SimTime, Vec3};
use tracing::trace;

/// A loosely typed metadata value.
#[derive(Clone, Debug, PartialEq)]
pub enum MetaValue {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating-point scalar.
    Float(f64),
    /// Free text.
    Text(String),
    /// A vector quantity.
    Vector(Vec3),
}

impl From<bool> for MetaValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for MetaValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec3> for MetaValue {
    fn from(v: Vec3) -> Self {
        Self::Vector(v)
    }
}

/// String-keyed metadata in insertion order.
pub type Metadata = IndexMap<String, MetaValue>;

// ── Contact ─────────────────────────────────────────────────────

/// One point of contact on a body.
///
/// Two contacts are equal when both points are equal; metadata does
/// not take part.
#[derive(Clone, Debug)]
pub struct Contact {
    /// Contact point in the body's local frame.
    pub body_point: Vec3,
    /// Contact point in world coordinates.
    pub world_point: Vec3,
    /// Free-form annotations (surface material, impulse, ...).
    pub metadata: Metadata,
}

impl Contact {
    /// A contact with no metadata.
    pub fn new(body_point: Vec3, world_point: Vec3) -> Self {
        Self {
            body_point,
            world_point,
            metadata: Metadata::new(),
        }
    }

    /// Attach a metadata entry.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl PartialEq for Contact {
    fn eq(&self, other: &Self) -> bool {
        self.body_point == other.body_point && self.world_point == other.world_point
    }
}

// ── EntityInfo ──────────────────────────────────────────────────

/// Side data attached to one physical body.
#[derive(Clone, Debug, Default)]
pub struct EntityInfo {
    metadata: Metadata,
    contacts: Vec<Contact>,
    collision_listeners: IndexSet<ModelId>,
}

impl EntityInfo {
    /// Empty info.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a contact. Returns `false` if an equal contact is already
    /// present, in which case the set is unchanged.
    pub fn add_contact(&mut self, contact: Contact) -> bool {
        if self.contacts.contains(&contact) {
            return false;
        }
        self.contacts.push(contact);
        true
    }

    /// Current contacts in the order they were first recorded.
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Forget all contacts, typically at the start of a physics step.
    pub fn clear_contacts(&mut self) {
        self.contacts.clear();
    }

    /// Ask for a [`Collision`] event whenever this body collides.
    /// Returns `false` if `model` was already listening.
    pub fn add_collision_listener(&mut self, model: ModelId) -> bool {
        self.collision_listeners.insert(model)
    }

    /// Stop listening. Returns `false` if `model` was not listening.
    pub fn remove_collision_listener(&mut self, model: ModelId) -> bool {
        self.collision_listeners.shift_remove(&model)
    }

    /// Registered listeners in registration order.
    pub fn collision_listeners(&self) -> impl Iterator<Item = ModelId> + '_ {
        self.collision_listeners.iter().copied()
    }

    /// Set a metadata entry, returning the previous value.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Option<MetaValue> {
        self.metadata.insert(key.into(), value.into())
    }

    /// Look up a metadata entry.
    pub fn metadata(&self, key: &str) -> Option<&MetaValue> {
        self.metadata.get(key)
    }

    /// All metadata.
    pub fn all_metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Schedule a [`Collision`] at `at` for every registered listener.
    ///
    /// `body` is this info's own handle; `other` is the body it hit, if
    /// known. Returns the scheduler handles in listener order.
    pub fn notify_collision(
        &self,
        scheduler: &mut dyn Scheduler,
        at: SimTime,
        body: BodyHandle,
        other: Option<BodyHandle>,
    ) -> Vec<EventHandle> {
        self.collision_listeners
            .iter()
            .map(|&listener| {
                trace!(body = %body, listener = %listener, at = %at, "collision scheduled");
                scheduler.schedule_event(listener, at, Event::Collision(Collision { body, other }))
            })
            .collect()
    }
}

// ── EntityTable ─────────────────────────────────────────────────

struct Slot {
    generation: u32,
    info: Option<EntityInfo>,
}

/// Generational slab of [`EntityInfo`] keyed by [`BodyHandle`].
#[derive(Default)]
pub struct EntityTable {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    live: usize,
}

impl EntityTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `info` and return its handle. Freed slots are reused with
    /// a bumped generation.
    pub fn insert(&mut self, info: EntityInfo) -> BodyHandle {
        self.live += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.info = Some(info);
            return BodyHandle::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            info: Some(info),
        });
        BodyHandle::new(index, 0)
    }

    /// Resolve a handle. Stale and unknown handles give `None`.
    pub fn get(&self, handle: BodyHandle) -> Option<&EntityInfo> {
        self.slots
            .get(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.info.as_ref())
    }

    /// Resolve a handle mutably.
    pub fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut EntityInfo> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.info.as_mut())
    }

    /// Remove and return the info. The handle becomes stale.
    pub fn remove(&mut self, handle: BodyHandle) -> Option<EntityInfo> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation)?;
        let info = slot.info.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(handle.index);
        self.live -= 1;
        Some(info)
    }

    /// Whether `handle` resolves.
    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live entries with their handles, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (BodyHandle, &EntityInfo)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.info
                .as_ref()
                .map(|info| (BodyHandle::new(i as u32, s.generation), info))
        })
    }

    /// Schedule collision events for the listeners of `body`. Returns
    /// an empty list when the handle is stale.
    pub fn notify_collision(
        &self,
        scheduler: &mut dyn Scheduler,
        at: SimTime,
        body: BodyHandle,
        other: Option<BodyHandle>,
    ) -> Vec<EventHandle> {
        self.get(body)
            .map(|info| info.notify_collision(scheduler, at, body, other))
            .unwrap_or_default()
    }
}
