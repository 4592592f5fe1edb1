//! Declared supertype and capability-interface relationships between
//! event kinds.
//!
//! This is the static replacement for walking a payload type's class
//! hierarchy at runtime. Each kind carries an ordered list of direct
//! supertypes; handler resolution falls back through them depth-first
//! in declaration order.

use indexmap::{IndexMap, IndexSet};
use kairos_core::EventKind;
use smallvec::SmallVec;

use crate::error::HierarchyError;

/// Direct supertypes of one kind, in declaration order.
pub type Supertypes = SmallVec<[EventKind; 4]>;

/// The frozen graph of event-kind supertypes.
#[derive(Clone, Debug, Default)]
pub struct EventHierarchy {
    parents: IndexMap<EventKind, Supertypes>,
    interfaces: IndexSet<EventKind>,
}

impl EventHierarchy {
    /// An empty hierarchy: every kind stands alone.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `supertype` as a direct supertype of `kind`.
    ///
    /// Re-declaring an existing edge is a no-op. Self edges and edges
    /// that would close a cycle are rejected.
    pub fn declare(&mut self, kind: EventKind, supertype: EventKind) -> Result<(), HierarchyError> {
        if kind == supertype {
            return Err(HierarchyError::SelfSupertype { kind: kind.name() });
        }
        if self.ancestors(supertype).contains(&kind) {
            return Err(HierarchyError::Cycle {
                kind: kind.name(),
                supertype: supertype.name(),
            });
        }
        let direct = self.parents.entry(kind).or_default();
        if !direct.contains(&supertype) {
            direct.push(supertype);
        }
        Ok(())
    }

    /// Mark `kind` as a capability interface: it never appears as a
    /// concrete payload and can only be handled dynamically.
    pub fn declare_interface(&mut self, kind: EventKind) {
        self.interfaces.insert(kind);
    }

    /// Direct supertypes of `kind`, in declaration order.
    pub fn supertypes(&self, kind: EventKind) -> &[EventKind] {
        self.parents.get(&kind).map(|p| p.as_slice()).unwrap_or(&[])
    }

    /// Whether `kind` was declared as a capability interface.
    pub fn is_interface(&self, kind: EventKind) -> bool {
        self.interfaces.contains(&kind)
    }

    /// Whether any kind lists `kind` as a direct supertype.
    pub fn has_subtypes(&self, kind: EventKind) -> bool {
        self.parents.values().any(|p| p.contains(&kind))
    }

    /// All transitive supertypes of `kind`, depth-first in declaration
    /// order, each listed once. Does not include `kind` itself.
    pub fn ancestors(&self, kind: EventKind) -> Vec<EventKind> {
        let mut out = Vec::new();
        let mut seen = IndexSet::new();
        seen.insert(kind);
        self.collect(kind, &mut seen, &mut out);
        out
    }

    fn collect(&self, kind: EventKind, seen: &mut IndexSet<EventKind>, out: &mut Vec<EventKind>) {
        for &parent in self.supertypes(kind) {
            if seen.insert(parent) {
                out.push(parent);
                self.collect(parent, seen, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct Contact;
    struct Impact;
    struct Touch;
    struct Damaging;

    fn k<T: 'static>() -> EventKind {
        EventKind::of::<T>()
    }

    #[test]
    fn ancestors_are_depth_first_in_declaration_order() {
        let mut h = EventHierarchy::new();
        h.declare(k::<Impact>(), k::<Contact>()).unwrap();
        h.declare(k::<Impact>(), k::<Damaging>()).unwrap();
        h.declare(k::<Contact>(), k::<Touch>()).unwrap();

        assert_eq!(
            h.ancestors(k::<Impact>()),
            vec![k::<Contact>(), k::<Touch>(), k::<Damaging>()]
        );
        assert!(h.ancestors(k::<Touch>()).is_empty());
    }

    #[test]
    fn diamond_lists_shared_ancestor_once() {
        let mut h = EventHierarchy::new();
        h.declare(k::<Impact>(), k::<Contact>()).unwrap();
        h.declare(k::<Impact>(), k::<Damaging>()).unwrap();
        h.declare(k::<Contact>(), k::<Touch>()).unwrap();
        h.declare(k::<Damaging>(), k::<Touch>()).unwrap();

        let anc = h.ancestors(k::<Impact>());
        assert_eq!(anc.iter().filter(|&&a| a == k::<Touch>()).count(), 1);
    }

    #[test]
    fn rejects_self_and_cycles() {
        let mut h = EventHierarchy::new();
        assert!(matches!(
            h.declare(k::<Touch>(), k::<Touch>()),
            Err(HierarchyError::SelfSupertype { .. })
        ));
        h.declare(k::<Impact>(), k::<Contact>()).unwrap();
        h.declare(k::<Contact>(), k::<Touch>()).unwrap();
        assert!(matches!(
            h.declare(k::<Touch>(), k::<Impact>()),
            Err(HierarchyError::Cycle { .. })
        ));
    }

    #[test]
    fn redeclaring_an_edge_is_idempotent() {
        let mut h = EventHierarchy::new();
        h.declare(k::<Impact>(), k::<Contact>()).unwrap();
        h.declare(k::<Impact>(), k::<Contact>()).unwrap();
        assert_eq!(h.supertypes(k::<Impact>()).len(), 1);
    }

    #[test]
    fn subtypes_and_interfaces() {
        let mut h = EventHierarchy::new();
        h.declare(k::<Impact>(), k::<Damaging>()).unwrap();
        h.declare_interface(k::<Damaging>());
        assert!(h.has_subtypes(k::<Damaging>()));
        assert!(!h.has_subtypes(k::<Impact>()));
        assert!(h.is_interface(k::<Damaging>()));
        assert!(!h.is_interface(k::<Impact>()));
    }

    struct Node<const N: usize>;

    fn nodes() -> [EventKind; 6] {
        [
            k::<Node<0>>(),
            k::<Node<1>>(),
            k::<Node<2>>(),
            k::<Node<3>>(),
            k::<Node<4>>(),
            k::<Node<5>>(),
        ]
    }

    proptest! {
        #[test]
        fn accepted_declarations_never_form_a_cycle(edges in prop::collection::vec((0usize..6, 0usize..6), 0..24)) {
            let n = nodes();
            let mut h = EventHierarchy::new();
            for (a, b) in edges {
                let _ = h.declare(n[a], n[b]);
            }
            for kind in n {
                let anc = h.ancestors(kind);
                for &above in &anc {
                    prop_assert!(!h.ancestors(above).contains(&kind));
                }
                let unique: IndexSet<_> = anc.iter().copied().collect();
                prop_assert_eq!(unique.len(), anc.len());
            }
        }
    }
}
