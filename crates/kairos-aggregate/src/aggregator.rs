//! The [`Aggregator`] accumulator and its parent chain.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::error::AggregatorError;

/// Item name used when a value is not itemized.
pub const DEFAULT_ITEM: &str = "";

#[derive(Default)]
struct Buckets {
    totals: IndexMap<String, f64>,
    itemized: IndexMap<String, IndexMap<String, f64>>,
}

/// Running totals per key, with an itemized breakdown, optionally
/// forwarded to a parent aggregator.
///
/// Reads of unknown keys or items return `0.0` (or nothing) instead of
/// failing. All methods take `&self`; an aggregator can be shared
/// between models behind an `Arc`.
pub struct Aggregator {
    name: String,
    parent: OnceLock<Arc<Aggregator>>,
    /// Held while this aggregator takes part in a `set_parent`, either
    /// as the child or somewhere on the new parent's chain.
    link: Mutex<()>,
    buckets: Mutex<Buckets>,
}

impl Aggregator {
    /// An empty aggregator with no parent.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: OnceLock::new(),
            link: Mutex::new(()),
            buckets: Mutex::new(Buckets::default()),
        }
    }

    /// The name given at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The aggregator this one forwards to.
    pub fn parent(&self) -> Option<&Arc<Aggregator>> {
        self.parent.get()
    }

    /// Forward every future [`add_value`](Self::add_value) to `parent`.
    ///
    /// A parent can be set once. Linking under an aggregator that is
    /// this one or one of its descendants is rejected.
    pub fn set_parent(&self, parent: &Arc<Aggregator>) -> Result<(), AggregatorError> {
        let already_set = || AggregatorError::ParentAlreadySet {
            name: self.name.clone(),
        };
        if self.parent.get().is_some() {
            return Err(already_set());
        }
        loop {
            let mut nodes: Vec<&Aggregator> = parent.chain().collect();
            if nodes.iter().any(|a| std::ptr::eq(*a, self)) {
                return Err(AggregatorError::Cycle {
                    child: self.name.clone(),
                    parent: parent.name.clone(),
                });
            }
            nodes.push(self);
            // A chain only grows at its root, and the root is locked here,
            // so once the walk is confirmed the chain stays put until the
            // link is made. Address order keeps lockers from deadlocking.
            nodes.sort_by_key(|a| *a as *const Aggregator as usize);
            let _links: Vec<MutexGuard<'_, ()>> = nodes
                .iter()
                .map(|a| a.link.lock().unwrap_or_else(PoisonError::into_inner))
                .collect();
            if parent.chain().count() + 1 != nodes.len() {
                continue;
            }
            self.parent
                .set(Arc::clone(parent))
                .map_err(|_| already_set())?;
            debug!(child = %self.name, parent = %parent.name, "aggregator linked");
            return Ok(());
        }
    }

    /// Add `value` to `key`'s total and to its `item` bucket, then do
    /// the same on every ancestor.
    pub fn add_value(&self, key: &str, item: &str, value: f64) {
        {
            let mut b = self.lock();
            *b.totals.entry(key.to_owned()).or_insert(0.0) += value;
            *b.itemized
                .entry(key.to_owned())
                .or_default()
                .entry(item.to_owned())
                .or_insert(0.0) += value;
        }
        trace!(aggregator = %self.name, key, item, value, "value added");
        if let Some(parent) = self.parent.get() {
            parent.add_value(key, item, value);
        }
    }

    /// [`add_value`](Self::add_value) under [`DEFAULT_ITEM`].
    pub fn add(&self, key: &str, value: f64) {
        self.add_value(key, DEFAULT_ITEM, value);
    }

    /// Total accumulated under `key`, or `0.0`.
    pub fn aggregate_value(&self, key: &str) -> f64 {
        self.lock().totals.get(key).copied().unwrap_or(0.0)
    }

    /// Amount accumulated under `key` for `item`, or `0.0`.
    pub fn itemized_value(&self, key: &str, item: &str) -> f64 {
        self.lock()
            .itemized
            .get(key)
            .and_then(|items| items.get(item))
            .copied()
            .unwrap_or(0.0)
    }

    /// Every item under `key` in first-seen order.
    pub fn itemized_values(&self, key: &str) -> Vec<(String, f64)> {
        self.lock()
            .itemized
            .get(key)
            .map(|items| items.iter().map(|(k, v)| (k.clone(), *v)).collect())
            .unwrap_or_default()
    }

    /// Keys with a total, in first-seen order.
    pub fn keys(&self) -> Vec<String> {
        self.lock().totals.keys().cloned().collect()
    }

    /// Drop `key`'s total and breakdown. Ancestors are not touched.
    pub fn clear(&self, key: &str) {
        let mut b = self.lock();
        b.totals.shift_remove(key);
        b.itemized.shift_remove(key);
    }

    /// Drop one item under `key` and take its amount off the total.
    /// Ancestors are not touched.
    pub fn clear_item(&self, key: &str, item: &str) {
        let mut b = self.lock();
        let Some(removed) = b
            .itemized
            .get_mut(key)
            .and_then(|items| items.shift_remove(item))
        else {
            return;
        };
        if let Some(total) = b.totals.get_mut(key) {
            *total -= removed;
        }
    }

    /// Drop everything. Ancestors are not touched.
    pub fn clear_all(&self) {
        let mut b = self.lock();
        b.totals.clear();
        b.itemized.clear();
    }

    /// This aggregator's ancestors, nearest first, starting with itself.
    fn chain(&self) -> impl Iterator<Item = &Aggregator> {
        std::iter::successors(Some(self), |a| a.parent.get().map(|p| &**p))
    }

    fn lock(&self) -> MutexGuard<'_, Buckets> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("name", &self.name)
            .field("parent", &self.parent.get().map(|p| p.name.as_str()))
            .finish_non_exhaustive()
    }
}

// Compile-time assertion: aggregators are shared between models.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Aggregator>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn linked() -> (Arc<Aggregator>, Aggregator) {
        let parent = Arc::new(Aggregator::new("parent"));
        let child = Aggregator::new("child");
        child.set_parent(&parent).unwrap();
        (parent, child)
    }

    // ── accumulation ────────────────────────────────────────────

    #[test]
    fn unknown_keys_read_as_zero() {
        let a = Aggregator::new("a");
        assert_eq!(a.aggregate_value("energy"), 0.0);
        assert_eq!(a.itemized_value("energy", "x"), 0.0);
        assert!(a.itemized_values("energy").is_empty());
        assert!(a.keys().is_empty());
    }

    #[test]
    fn items_keep_first_seen_order() {
        let a = Aggregator::new("a");
        a.add_value("energy", "motor", 1.0);
        a.add_value("energy", "brake", 2.0);
        a.add_value("energy", "motor", 3.0);
        a.add("mass", 10.0);
        assert_eq!(
            a.itemized_values("energy"),
            vec![("motor".to_owned(), 4.0), ("brake".to_owned(), 2.0)]
        );
        assert_eq!(a.itemized_value("mass", DEFAULT_ITEM), 10.0);
        assert_eq!(a.keys(), vec!["energy".to_owned(), "mass".to_owned()]);
    }

    // ── forwarding ──────────────────────────────────────────────

    #[test]
    fn forwarding_reaches_parent_and_clear_does_not() {
        let (parent, child) = linked();
        child.add_value("energy", "actuation", 5.0);
        child.add_value("energy", "actuation", 2.0);
        assert_eq!(parent.aggregate_value("energy"), 7.0);
        assert_eq!(child.itemized_value("energy", "actuation"), 7.0);

        child.clear_item("energy", "actuation");
        assert_eq!(child.aggregate_value("energy"), 0.0);
        assert_eq!(parent.aggregate_value("energy"), 7.0);
        assert_eq!(parent.itemized_value("energy", "actuation"), 7.0);
    }

    #[test]
    fn forwarding_walks_the_whole_chain() {
        let root = Arc::new(Aggregator::new("root"));
        let mid = Arc::new(Aggregator::new("mid"));
        let leaf = Aggregator::new("leaf");
        mid.set_parent(&root).unwrap();
        leaf.set_parent(&mid).unwrap();

        leaf.add_value("heat", "cpu", 3.0);
        mid.add_value("heat", "fan", 1.0);
        assert_eq!(root.aggregate_value("heat"), 4.0);
        assert_eq!(mid.aggregate_value("heat"), 4.0);
        assert_eq!(leaf.aggregate_value("heat"), 3.0);
    }

    #[test]
    fn clear_key_drops_total_and_items() {
        let a = Aggregator::new("a");
        a.add_value("energy", "x", 1.0);
        a.add_value("drag", "x", 1.0);
        a.clear("energy");
        assert_eq!(a.keys(), vec!["drag".to_owned()]);
        assert!(a.itemized_values("energy").is_empty());
        a.clear_all();
        assert!(a.keys().is_empty());
    }

    #[test]
    fn clearing_unknown_item_is_a_no_op() {
        let a = Aggregator::new("a");
        a.add_value("energy", "x", 2.0);
        a.clear_item("energy", "y");
        a.clear_item("power", "x");
        assert_eq!(a.aggregate_value("energy"), 2.0);
    }

    // ── linking ─────────────────────────────────────────────────

    #[test]
    fn parent_is_set_once() {
        let (_, child) = linked();
        let other = Arc::new(Aggregator::new("other"));
        assert_eq!(
            child.set_parent(&other),
            Err(AggregatorError::ParentAlreadySet {
                name: "child".into()
            })
        );
        assert_eq!(child.parent().map(|p| p.name()), Some("parent"));
    }

    #[test]
    fn cycles_are_rejected() {
        let a = Arc::new(Aggregator::new("a"));
        let b = Arc::new(Aggregator::new("b"));
        b.set_parent(&a).unwrap();
        assert!(matches!(a.set_parent(&b), Err(AggregatorError::Cycle { .. })));
        assert!(matches!(a.set_parent(&a), Err(AggregatorError::Cycle { .. })));
        assert!(a.parent().is_none());
    }

    proptest! {
        #[test]
        fn totals_equal_sum_of_items(values in prop::collection::vec((0usize..4, -100i32..100), 0..64)) {
            let (parent, child) = linked();
            for (item, v) in &values {
                child.add_value("k", &format!("i{item}"), f64::from(*v));
            }
            let items: f64 = child.itemized_values("k").iter().map(|(_, v)| v).sum();
            prop_assert_eq!(child.aggregate_value("k"), items);
            prop_assert_eq!(parent.aggregate_value("k"), child.aggregate_value("k"));
        }
    }
}
