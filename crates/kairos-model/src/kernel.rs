//! The kernel context: frozen event hierarchy, per-type handler
//! registry, and model-id allocation.
//!
//! There is no global state. A host builds one [`KernelContext`] per
//! simulation run and passes it to every [`Entity`](crate::Entity) it
//! constructs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use kairos_core::{EventKind, ModelId};

use crate::error::{HandlerTableError, HierarchyError, ModelError};
use crate::handler::{HandlerRegistry, HandlerTable};
use crate::hierarchy::EventHierarchy;
use crate::model::Model;

/// Default upper bound for allocated model ids.
pub const DEFAULT_MAX_MODEL_ID: u32 = u32::MAX;

// ── KernelBuilder ───────────────────────────────────────────────

/// Declares the event hierarchy and id range, then freezes them.
///
/// Declaration order matters: when a kind has several supertypes, the
/// fallback walk tries them in the order they were declared here.
#[derive(Debug)]
pub struct KernelBuilder {
    hierarchy: EventHierarchy,
    max_model_id: u32,
    error: Option<HierarchyError>,
}

impl Default for KernelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl KernelBuilder {
    /// Empty hierarchy, ids `1..=u32::MAX`.
    pub fn new() -> Self {
        Self {
            hierarchy: EventHierarchy::new(),
            max_model_id: DEFAULT_MAX_MODEL_ID,
            error: None,
        }
    }

    /// Declare `S` as a direct supertype of event kind `E`.
    ///
    /// An invalid declaration (self edge or cycle) is remembered and
    /// reported by [`build`](Self::build).
    pub fn supertype<E: ?Sized + 'static, S: ?Sized + 'static>(mut self) -> Self {
        if self.error.is_none() {
            if let Err(e) = self
                .hierarchy
                .declare(EventKind::of::<E>(), EventKind::of::<S>())
            {
                self.error = Some(e);
            }
        }
        self
    }

    /// Mark `I` as a capability interface.
    pub fn interface<I: ?Sized + 'static>(mut self) -> Self {
        self.hierarchy.declare_interface(EventKind::of::<I>());
        self
    }

    /// Largest id [`KernelContext::allocate_model_id`] may return.
    pub fn max_model_id(mut self, max: u32) -> Self {
        self.max_model_id = max;
        self
    }

    /// Freeze the declarations.
    pub fn build(self) -> Result<KernelContext, HierarchyError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        Ok(KernelContext {
            hierarchy: Arc::new(self.hierarchy),
            registry: HandlerRegistry::new(),
            next_id: AtomicU64::new(1),
            max_model_id: self.max_model_id,
        })
    }
}

// ── KernelContext ───────────────────────────────────────────────

/// Shared, immutable-after-build kernel state for one simulation run.
pub struct KernelContext {
    hierarchy: Arc<EventHierarchy>,
    registry: HandlerRegistry,
    next_id: AtomicU64,
    max_model_id: u32,
}

impl Default for KernelContext {
    fn default() -> Self {
        Self::new()
    }
}

impl KernelContext {
    /// A kernel with no declared event supertypes.
    pub fn new() -> Self {
        Self {
            hierarchy: Arc::new(EventHierarchy::new()),
            registry: HandlerRegistry::new(),
            next_id: AtomicU64::new(1),
            max_model_id: DEFAULT_MAX_MODEL_ID,
        }
    }

    /// Start declaring a hierarchy.
    pub fn builder() -> KernelBuilder {
        KernelBuilder::new()
    }

    /// The frozen event hierarchy.
    pub fn hierarchy(&self) -> &EventHierarchy {
        &self.hierarchy
    }

    /// Hand out the next model id.
    ///
    /// Ids start at 1 and are never reused.
    pub fn allocate_model_id(&self) -> Result<ModelId, ModelError> {
        let max = self.max_model_id;
        let next = self
            .next_id
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                (n <= u64::from(max)).then_some(n + 1)
            })
            .map_err(|_| ModelError::IdSpaceExhausted { max })?;
        // `next` never exceeds `max`, which fits in u32.
        let id = u32::try_from(next).map_err(|_| ModelError::IdSpaceExhausted { max })?;
        Ok(ModelId(id))
    }

    /// The handler table for model type `M`, built and validated on
    /// first request.
    pub fn handler_table<M: Model>(&self) -> Result<Arc<HandlerTable<M>>, HandlerTableError> {
        self.registry.table_for::<M>(&self.hierarchy)
    }

    /// Number of distinct model types whose tables have been built.
    pub fn tables_built(&self) -> u64 {
        self.registry.tables_built()
    }
}

// Compile-time assertion: a kernel is shared across host threads.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<KernelContext>();
};

#[cfg(test)]
mod tests {
    use super::*;

    struct Impact;
    struct Contact;

    #[test]
    fn ids_start_at_one_and_increase() {
        let kernel = KernelContext::new();
        assert_eq!(kernel.allocate_model_id().unwrap(), ModelId(1));
        assert_eq!(kernel.allocate_model_id().unwrap(), ModelId(2));
        assert_eq!(kernel.allocate_model_id().unwrap(), ModelId(3));
    }

    #[test]
    fn id_space_exhaustion() {
        let kernel = KernelContext::builder().max_model_id(2).build().unwrap();
        kernel.allocate_model_id().unwrap();
        kernel.allocate_model_id().unwrap();
        assert!(matches!(
            kernel.allocate_model_id(),
            Err(ModelError::IdSpaceExhausted { max: 2 })
        ));
        // Stays exhausted.
        assert!(kernel.allocate_model_id().is_err());
    }

    #[test]
    fn builder_reports_first_invalid_declaration() {
        let err = KernelContext::builder()
            .supertype::<Impact, Contact>()
            .supertype::<Contact, Impact>()
            .build()
            .err();
        assert!(matches!(err, Some(HierarchyError::Cycle { .. })));
    }

    #[test]
    fn builder_freezes_hierarchy() {
        let kernel = KernelContext::builder()
            .supertype::<Impact, Contact>()
            .interface::<Contact>()
            .build()
            .unwrap();
        let h = kernel.hierarchy();
        assert_eq!(h.supertypes(EventKind::of::<Impact>()), &[EventKind::of::<Contact>()]);
        assert!(h.is_interface(EventKind::of::<Contact>()));
        assert_eq!(kernel.tables_built(), 0);
    }
}
