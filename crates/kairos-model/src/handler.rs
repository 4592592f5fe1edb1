//! Per-model-type handler tables.
//!
//! Each [`Model`] type declares its handlers once, through
//! [`Model::declare_handlers`]. The kernel validates the declarations
//! and freezes them into a [`HandlerTable`] shared by every instance of
//! the type. Dispatch looks up the event's concrete kind first; on a
//! miss it walks the kind's declared supertypes depth-first and
//! memoizes the first match under the concrete kind, so each
//! `(model type, event kind)` pair walks at most once.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use indexmap::IndexMap;
use kairos_core::{Event, EventKind, SimTime, TimerFired};
use tracing::debug;

use crate::context::ModelContext;
use crate::error::{HandlerResult, HandlerTableError};
use crate::hierarchy::EventHierarchy;
use crate::model::Model;

/// A type-erased handler bound to model type `M`.
pub(crate) type HandlerFn<M> =
    Arc<dyn Fn(&mut M, &mut ModelContext<'_, M>, SimTime, &Event) -> HandlerResult + Send + Sync>;

/// What payload type a declared handler can receive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Accepts {
    /// Exactly the declared payload type, downcast before the call.
    Exact,
    /// Any event; the handler inspects `&Event` itself.
    Dynamic,
}

struct HandlerEntry<M> {
    accepts: Accepts,
    declared_by: &'static str,
    call: HandlerFn<M>,
}

fn erase<M, F>(f: F) -> HandlerFn<M>
where
    F: Fn(&mut M, &mut ModelContext<'_, M>, SimTime, &Event) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(f)
}

// ── HandlerTableBuilder ─────────────────────────────────────────

/// Collects one model type's handler declarations.
pub struct HandlerTableBuilder<M> {
    entries: IndexMap<EventKind, HandlerEntry<M>>,
}

impl<M: Model> HandlerTableBuilder<M> {
    pub(crate) fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Handle events whose payload is exactly `E`.
    ///
    /// `E` must be a concrete payload with no declared subtypes; use
    /// [`on_kind`](Self::on_kind) for supertypes and interfaces.
    pub fn on<E, F>(&mut self, handler: F) -> &mut Self
    where
        E: 'static,
        F: Fn(&mut M, &mut ModelContext<'_, M>, SimTime, &E) -> HandlerResult + Send + Sync + 'static,
    {
        let kind = EventKind::of::<E>();
        let call = erase(move |model: &mut M, ctx: &mut ModelContext<'_, M>, time: SimTime, event: &Event| {
            match event.payload::<E>() {
                Some(payload) => handler(model, ctx, time, payload),
                None => Err(format!("expected {} payload, got {}", kind, event.kind()).into()),
            }
        });
        self.insert(kind, Accepts::Exact, call)
    }

    /// Handle every event of kind `K` or any of its declared subtypes,
    /// receiving the whole [`Event`].
    pub fn on_kind<K, F>(&mut self, handler: F) -> &mut Self
    where
        K: ?Sized + 'static,
        F: Fn(&mut M, &mut ModelContext<'_, M>, SimTime, &Event) -> HandlerResult + Send + Sync + 'static,
    {
        self.insert(EventKind::of::<K>(), Accepts::Dynamic, erase(handler))
    }

    /// Pull in every handler declared by `P`, an embedded "base" model
    /// reached through `project`. Declarations made after this call
    /// override inherited ones for the same exact kind.
    pub fn inherit<P: Model>(&mut self, project: fn(&mut M) -> &mut P) -> &mut Self {
        let mut parent = HandlerTableBuilder::<P>::new();
        P::declare_handlers(&mut parent);
        for (kind, entry) in parent.entries {
            let inner = entry.call;
            let call = erase(move |model: &mut M, ctx: &mut ModelContext<'_, M>, time: SimTime, event: &Event| {
                ctx.project(project, |pctx| inner(project(model), pctx, time, event))
            });
            self.entries.insert(
                kind,
                HandlerEntry {
                    accepts: entry.accepts,
                    declared_by: entry.declared_by,
                    call,
                },
            );
        }
        self
    }

    fn insert(&mut self, kind: EventKind, accepts: Accepts, call: HandlerFn<M>) -> &mut Self {
        self.entries.insert(
            kind,
            HandlerEntry {
                accepts,
                declared_by: std::any::type_name::<M>(),
                call,
            },
        );
        self
    }

    /// Validate the declarations against `hierarchy` and freeze them.
    pub(crate) fn build(self, hierarchy: Arc<EventHierarchy>) -> Result<HandlerTable<M>, HandlerTableError> {
        let target_type = std::any::type_name::<M>();
        for (kind, entry) in &self.entries {
            let invalid = |reason| HandlerTableError::InvalidHandlerSignature {
                target_type,
                event_type: kind.name(),
                reason,
            };
            if *kind == EventKind::of::<TimerFired>() {
                return Err(invalid("timer firings are delivered to the timer's own callback"));
            }
            if entry.accepts == Accepts::Exact {
                if hierarchy.is_interface(*kind) {
                    return Err(invalid("an interface kind has no payload; declare it with on_kind"));
                }
                if hierarchy.has_subtypes(*kind) {
                    return Err(invalid(
                        "kind has declared subtypes whose payloads cannot be received as this type; declare it with on_kind",
                    ));
                }
            }
        }
        debug!(
            model = target_type,
            handlers = self.entries.len(),
            "handler table built"
        );
        Ok(HandlerTable {
            target_type,
            declared: self.entries,
            resolved: RwLock::new(HashMap::new()),
            hierarchy,
            counters: Counters::default(),
        })
    }
}

// ── HandlerTable ────────────────────────────────────────────────

/// Snapshot of a table's resolution counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    /// Lookups answered by an exact declaration.
    pub exact_hits: u64,
    /// Lookups answered by a memoized fallback.
    pub cached_hits: u64,
    /// Supertype walks performed (cache misses).
    pub walks: u64,
    /// Lookups that found nothing.
    pub misses: u64,
}

#[derive(Default)]
struct Counters {
    exact_hits: AtomicU64,
    cached_hits: AtomicU64,
    walks: AtomicU64,
    misses: AtomicU64,
}

/// Frozen handler declarations for one model type plus the memo of
/// fallback resolutions.
pub struct HandlerTable<M> {
    target_type: &'static str,
    declared: IndexMap<EventKind, HandlerEntry<M>>,
    resolved: RwLock<HashMap<EventKind, HandlerFn<M>>>,
    hierarchy: Arc<EventHierarchy>,
    counters: Counters,
}

impl<M: Model> HandlerTable<M> {
    /// Rust type name of the model this table serves.
    pub fn target_type(&self) -> &'static str {
        self.target_type
    }

    /// Number of declared handlers, inherited ones included.
    pub fn len(&self) -> usize {
        self.declared.len()
    }

    /// Whether the type declares no handlers at all.
    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }

    /// Whether a handler was declared for exactly `kind`.
    pub fn declares(&self, kind: EventKind) -> bool {
        self.declared.contains_key(&kind)
    }

    /// Rust type name of the model whose declaration serves `kind`
    /// exactly, for diagnosing inheritance and overrides.
    pub fn declared_by(&self, kind: EventKind) -> Option<&'static str> {
        self.declared.get(&kind).map(|e| e.declared_by)
    }

    /// Current resolution counters.
    pub fn stats(&self) -> ResolutionStats {
        ResolutionStats {
            exact_hits: self.counters.exact_hits.load(Ordering::Relaxed),
            cached_hits: self.counters.cached_hits.load(Ordering::Relaxed),
            walks: self.counters.walks.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
        }
    }

    /// Find the handler for `kind`.
    pub(crate) fn resolve(&self, kind: EventKind) -> Option<HandlerFn<M>> {
        if let Some(entry) = self.declared.get(&kind) {
            self.counters.exact_hits.fetch_add(1, Ordering::Relaxed);
            return Some(Arc::clone(&entry.call));
        }
        {
            let memo = self.resolved.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(call) = memo.get(&kind) {
                self.counters.cached_hits.fetch_add(1, Ordering::Relaxed);
                return Some(Arc::clone(call));
            }
        }

        self.counters.walks.fetch_add(1, Ordering::Relaxed);
        let found = self
            .hierarchy
            .ancestors(kind)
            .into_iter()
            .find_map(|ancestor| {
                self.declared
                    .get(&ancestor)
                    .filter(|entry| entry.accepts == Accepts::Dynamic)
                    .map(|entry| (ancestor, Arc::clone(&entry.call)))
            });

        match found {
            Some((ancestor, call)) => {
                debug!(
                    model = self.target_type,
                    event = kind.name(),
                    via = ancestor.name(),
                    "handler resolved through supertype"
                );
                self.resolved
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(kind, Arc::clone(&call));
                Some(call)
            }
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }
}

// ── HandlerRegistry ─────────────────────────────────────────────

/// Owns one [`HandlerTable`] per model type, built on first request.
pub(crate) struct HandlerRegistry {
    tables: Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
    built: AtomicU64,
}

impl HandlerRegistry {
    pub(crate) fn new() -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
            built: AtomicU64::new(0),
        }
    }

    /// Number of tables built so far.
    pub(crate) fn tables_built(&self) -> u64 {
        self.built.load(Ordering::Relaxed)
    }

    /// The table for `M`, building it on first request. A failed build
    /// is remembered too, so declarations are validated once per type.
    pub(crate) fn table_for<M: Model>(
        &self,
        hierarchy: &Arc<EventHierarchy>,
    ) -> Result<Arc<HandlerTable<M>>, HandlerTableError> {
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = tables.get(&TypeId::of::<M>()) {
            if let Some(err) = existing.downcast_ref::<HandlerTableError>() {
                return Err(err.clone());
            }
            if let Ok(table) = Arc::clone(existing).downcast::<HandlerTable<M>>() {
                return Ok(table);
            }
        }

        let mut builder = HandlerTableBuilder::<M>::new();
        M::declare_handlers(&mut builder);
        let table = match builder.build(Arc::clone(hierarchy)) {
            Ok(table) => Arc::new(table),
            Err(err) => {
                tables.insert(TypeId::of::<M>(), Arc::new(err.clone()));
                return Err(err);
            }
        };
        tables.insert(TypeId::of::<M>(), Arc::clone(&table) as Arc<dyn Any + Send + Sync>);
        self.built.fetch_add(1, Ordering::Relaxed);
        Ok(table)
    }
}
