//! Criterion benchmarks for recorder enqueue and initialization paths.

use std::sync::Arc;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use kairos_core::{ObjectId, Quat, Vec3};
use kairos_recorder::{Listener, ListenerError, MotionRecorder, Shape};

struct Discard;

impl Listener for Discard {
    fn init_object(&self, _id: ObjectId, _shape: &Shape) -> Result<(), ListenerError> {
        Ok(())
    }

    fn state_update(&self, _id: ObjectId, _p: Vec3, _o: Quat) -> Result<(), ListenerError> {
        Ok(())
    }
}

fn recorder_with(listeners: usize) -> MotionRecorder {
    let rec = MotionRecorder::with_defaults().unwrap();
    for _ in 0..listeners {
        rec.add_listener(Arc::new(Discard)).unwrap();
    }
    rec
}

fn bench_update_state(c: &mut Criterion) {
    let rec = recorder_with(4);
    let id = ObjectId(1);
    rec.init_object(id, Shape::Sphere { radius: 1.0 }).unwrap();
    let mut x = 0.0;

    c.bench_function("recorder_update_state", |b| {
        b.iter(|| {
            x += 0.01;
            rec.update_state(id, Vec3::new(x, 0.0, 0.0), Quat::IDENTITY)
                .unwrap();
        });
    });
    rec.wait_idle(Duration::from_secs(30));
}

fn bench_init_object(c: &mut Criterion) {
    let rec = recorder_with(4);
    let mut next = 0u64;

    c.bench_function("recorder_init_object", |b| {
        b.iter(|| {
            next += 1;
            rec.init_object(ObjectId(next), Shape::Sphere { radius: 1.0 })
                .unwrap();
        });
    });
}

criterion_group!(benches, bench_update_state, bench_init_object);
criterion_main!(benches);
