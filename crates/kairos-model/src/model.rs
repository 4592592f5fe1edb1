//! The [`Model`] capability and the state every entity carries.

use indexmap::IndexSet;
use kairos_core::{ModelId, SimTime};

use crate::context::ModelContext;
use crate::error::{HandlerResult, ModelError};
use crate::handler::HandlerTableBuilder;

/// A simulated entity type.
///
/// Implementors embed a [`ModelBase`] and declare their event handlers
/// once per type in [`declare_handlers`](Model::declare_handlers). The
/// kernel wraps instances in an [`Entity`](crate::Entity), which owns
/// the lifecycle and dispatch.
pub trait Model: Sized + Send + 'static {
    /// Shared entity state.
    fn base(&self) -> &ModelBase;

    /// Shared entity state, mutably.
    fn base_mut(&mut self) -> &mut ModelBase;

    /// Declare this type's handlers. Called once per type, not per instance.
    fn declare_handlers(handlers: &mut HandlerTableBuilder<Self>);

    /// Runs exactly once before any event is delivered.
    fn initialize(&mut self, _ctx: &mut ModelContext<'_, Self>) -> HandlerResult {
        Ok(())
    }

    /// Runs exactly once at simulation end.
    fn finish(&mut self, _ctx: &mut ModelContext<'_, Self>) -> HandlerResult {
        Ok(())
    }
}

/// Where an entity is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    /// Built, waiting for `initialize`.
    Constructed,
    /// Receiving events.
    Initialized,
    /// `finish` has run.
    Finished,
}

/// Identity, hierarchy, and clock state shared by every model.
#[derive(Clone, Debug)]
pub struct ModelBase {
    id: ModelId,
    name: String,
    parent: Option<ModelId>,
    children: IndexSet<ModelId>,
    current_time: SimTime,
}

impl ModelBase {
    /// New base state at [`SimTime::ZERO`] with no parent or children.
    ///
    /// Ids normally come from
    /// [`KernelContext::allocate_model_id`](crate::KernelContext::allocate_model_id).
    /// Id 0 is reserved: an entity carrying it fails `initialize` with
    /// [`ModelError::ReservedId`].
    pub fn new(id: ModelId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            parent: None,
            children: IndexSet::new(),
            current_time: SimTime::ZERO,
        }
    }

    /// The entity's id.
    pub fn id(&self) -> ModelId {
        self.id
    }

    /// Human-readable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parent, if one was set.
    pub fn parent(&self) -> Option<ModelId> {
        self.parent
    }

    /// Assign the parent. Allowed once.
    pub fn set_parent(&mut self, parent: ModelId) -> Result<(), ModelError> {
        if parent == self.id {
            return Err(ModelError::SelfParent { model: self.id });
        }
        if let Some(existing) = self.parent {
            return Err(ModelError::ParentAlreadySet {
                model: self.id,
                existing,
            });
        }
        self.parent = Some(parent);
        Ok(())
    }

    /// Children in insertion order.
    pub fn children(&self) -> impl Iterator<Item = ModelId> + '_ {
        self.children.iter().copied()
    }

    /// Record a child. The set only grows; adding twice is a no-op.
    pub fn add_child(&mut self, child: ModelId) {
        self.children.insert(child);
    }

    /// Time of the event currently or last dispatched to this entity.
    pub fn current_time(&self) -> SimTime {
        self.current_time
    }

    pub(crate) fn set_current_time(&mut self, time: SimTime) {
        self.current_time = time;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_is_set_once() {
        let mut base = ModelBase::new(ModelId(2), "arm");
        base.set_parent(ModelId(1)).unwrap();
        let err = base.set_parent(ModelId(3)).unwrap_err();
        assert!(matches!(
            err,
            ModelError::ParentAlreadySet {
                model: ModelId(2),
                existing: ModelId(1)
            }
        ));
        assert_eq!(base.parent(), Some(ModelId(1)));
    }

    #[test]
    fn self_parent_rejected() {
        let mut base = ModelBase::new(ModelId(4), "loop");
        assert!(matches!(
            base.set_parent(ModelId(4)),
            Err(ModelError::SelfParent { .. })
        ));
        assert_eq!(base.parent(), None);
    }

    #[test]
    fn children_are_append_only_and_deduplicated() {
        let mut base = ModelBase::new(ModelId(1), "robot");
        base.add_child(ModelId(3));
        base.add_child(ModelId(2));
        base.add_child(ModelId(3));
        assert_eq!(base.children().collect::<Vec<_>>(), vec![ModelId(3), ModelId(2)]);
    }

    #[test]
    fn new_base_starts_at_zero() {
        let base = ModelBase::new(ModelId(9), "rover");
        assert_eq!(base.current_time(), SimTime::ZERO);
        assert_eq!(base.name(), "rover");
    }
}
