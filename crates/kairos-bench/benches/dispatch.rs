//! Criterion micro-benchmarks for event dispatch and timer firing.

use std::hint::black_box;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use kairos_bench::{counter, deep_kernel, signal_kernel, Burst, Pulse, SinkScheduler};
use kairos_core::{Event, ModelId, SimTime};
use kairos_model::{
    Entity, HandlerResult, HandlerTableBuilder, KernelContext, Model, ModelBase, ModelContext,
    SimEntity,
};
use kairos_test_utils::MockScheduler;

fn bench_exact_dispatch(c: &mut Criterion) {
    let kernel = signal_kernel();
    let mut entity = counter(&kernel);
    let mut sched = SinkScheduler::default();
    let mut t = 0.0;

    c.bench_function("dispatch_exact", |b| {
        b.iter(|| {
            t += 1.0;
            entity
                .process_event(SimTime::new(t, 0), Event::custom(Pulse), &mut sched)
                .unwrap();
        });
    });
    black_box(entity.model().pulses);
}

fn bench_fallback_dispatch(c: &mut Criterion) {
    for (name, kernel) in [
        ("dispatch_fallback_shallow", signal_kernel()),
        ("dispatch_fallback_deep", deep_kernel()),
    ] {
        let mut entity = counter(&kernel);
        let mut sched = SinkScheduler::default();
        let mut t = 0.0;

        c.bench_function(name, |b| {
            b.iter(|| {
                t += 1.0;
                entity
                    .process_event(SimTime::new(t, 0), Event::custom(Burst), &mut sched)
                    .unwrap();
            });
        });
        // Every iteration after the first is served from the memo.
        assert_eq!(entity.handler_table().stats().walks, 1);
    }
}

fn bench_table_build(c: &mut Criterion) {
    c.bench_function("handler_table_build", |b| {
        b.iter(|| {
            let kernel = signal_kernel();
            black_box(counter(&kernel));
        });
    });
}

struct Metronome {
    base: ModelBase,
    ticks: u64,
}

impl Model for Metronome {
    fn base(&self) -> &ModelBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModelBase {
        &mut self.base
    }

    fn declare_handlers(_h: &mut HandlerTableBuilder<Self>) {}

    fn initialize(&mut self, ctx: &mut ModelContext<'_, Self>) -> HandlerResult {
        ctx.create_timer(
            |m: &mut Metronome, _ctx: &mut ModelContext<'_, Metronome>, _now: SimTime| {
                m.ticks += 1;
                Ok(())
            },
            0.0,
            Duration::from_millis(10),
        )?;
        Ok(())
    }
}

fn bench_periodic_timer(c: &mut Criterion) {
    let kernel = KernelContext::new();
    let model = Metronome {
        base: ModelBase::new(ModelId(1), "metronome"),
        ticks: 0,
    };
    let mut entity = Entity::new(&kernel, model).unwrap();
    let mut sched = MockScheduler::new();
    entity.initialize(&mut sched).unwrap();

    c.bench_function("timer_fire_and_rearm", |b| {
        b.iter(|| {
            let next = sched.pop_next().unwrap();
            entity
                .process_event(next.at, next.event, &mut sched)
                .unwrap();
        });
    });
    black_box(entity.model().ticks);
}

criterion_group!(
    benches,
    bench_exact_dispatch,
    bench_fallback_dispatch,
    bench_table_build,
    bench_periodic_timer
);
criterion_main!(benches);
