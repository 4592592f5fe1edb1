//! Aggregators shared across threads.

use std::sync::Arc;
use std::thread;

use kairos_aggregate::{Aggregator, AggregatorError};

#[test]
fn concurrent_children_sum_into_parent() {
    let fleet = Arc::new(Aggregator::new("fleet"));
    let drones: Vec<Aggregator> = (0..4)
        .map(|i| {
            let d = Aggregator::new(format!("drone{i}"));
            d.set_parent(&fleet).unwrap();
            d
        })
        .collect();

    thread::scope(|s| {
        for d in &drones {
            s.spawn(move || {
                for _ in 0..1000 {
                    d.add_value("energy", "rotor", 0.5);
                }
            });
        }
    });

    assert_eq!(fleet.aggregate_value("energy"), 2000.0);
    assert_eq!(fleet.itemized_value("energy", "rotor"), 2000.0);
    for d in &drones {
        assert_eq!(d.aggregate_value("energy"), 500.0);
    }
}

#[test]
fn concurrent_opposite_links_cannot_both_succeed() {
    for _ in 0..50 {
        let a = Arc::new(Aggregator::new("a"));
        let b = Arc::new(Aggregator::new("b"));
        let (ra, rb) = thread::scope(|s| {
            let ha = s.spawn(|| a.set_parent(&b));
            let hb = s.spawn(|| b.set_parent(&a));
            (ha.join().unwrap(), hb.join().unwrap())
        });
        assert!(ra.is_ok() != rb.is_ok());
        let failed = ra.err().or(rb.err());
        assert!(matches!(failed, Some(AggregatorError::Cycle { .. })));
    }
}

#[test]
fn concurrent_links_around_a_ring_leave_it_open() {
    use std::sync::Barrier;

    const RING: usize = 4;

    for _ in 0..50 {
        let nodes: Vec<Arc<Aggregator>> = (0..RING)
            .map(|i| Arc::new(Aggregator::new(format!("n{i}"))))
            .collect();
        let start = Barrier::new(RING);

        let results: Vec<Result<(), AggregatorError>> = thread::scope(|s| {
            let handles: Vec<_> = (0..RING)
                .map(|i| {
                    let (child, parent) = (&nodes[i], &nodes[(i + 1) % RING]);
                    let start = &start;
                    s.spawn(move || {
                        start.wait();
                        child.set_parent(parent)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let failed: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
        assert_eq!(failed.len(), 1, "{results:?}");
        assert!(matches!(failed[0], AggregatorError::Cycle { .. }));

        // Every chain ends at a root.
        for n in &nodes {
            let mut hops = 0;
            let mut at = n.parent();
            while let Some(p) = at {
                hops += 1;
                assert!(hops < RING);
                at = p.parent();
            }
        }
    }
}
