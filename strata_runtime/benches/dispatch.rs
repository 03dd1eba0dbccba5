//! Method Dispatch Benchmarks
//!
//! Measures resolution cost along ancestor chains of increasing depth, with
//! and without the resolver cache, and the cost of a full send.
//!
//! # Benchmark Categories
//!
//! 1. **Resolution**: cached vs uncached lookup by chain depth
//! 2. **Invalidation**: resolve right after a structural mutation
//! 3. **Sends**: accessor and native method calls through `send`

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use strata_runtime::method::NativeMethod;
use strata_runtime::{Arity, ModuleRef, ObjectSpace, SpaceConfig, Value, intern};

// =============================================================================
// Benchmark Helpers
// =============================================================================

/// A class whose only `target` method lives `depth` modules away.
fn deep_class(space: &ObjectSpace, depth: usize) -> ModuleRef {
    let class = space.define_class("Deep", None).unwrap();
    let bottom = space.define_module("Bottom").unwrap();
    let handle = NativeMethod::new("target", Arity::Exact(0), |_, _, _| Ok(Value::Int(1)))
        .into_handle();
    space.define_method(&bottom, "target", handle).unwrap();
    space.include(&class, &[&bottom]).unwrap();

    for i in 0..depth {
        let filler = space.define_module(&format!("Filler{}", i)).unwrap();
        space.include(&class, &[&filler]).unwrap();
    }
    class
}

// =============================================================================
// Resolution Benchmarks
// =============================================================================

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    let selector = intern("target");

    for depth in [1usize, 8, 32] {
        let cached = ObjectSpace::new();
        let class = deep_class(&cached, depth);
        group.bench_with_input(BenchmarkId::new("cached", depth), &depth, |b, _| {
            b.iter(|| black_box(cached.resolve(&class, selector)))
        });

        let uncached = ObjectSpace::with_config(SpaceConfig::default().with_method_cache(false));
        let class = deep_class(&uncached, depth);
        group.bench_with_input(BenchmarkId::new("uncached", depth), &depth, |b, _| {
            b.iter(|| black_box(uncached.resolve(&class, selector)))
        });
    }

    group.finish();
}

fn bench_invalidation(c: &mut Criterion) {
    let space = ObjectSpace::new();
    let class = deep_class(&space, 8);
    let scratch = space.define_module("Scratch").unwrap();
    let selector = intern("target");
    let noop = NativeMethod::new("noop", Arity::Exact(0), |_, _, _| Ok(Value::Nil)).into_handle();

    c.bench_function("resolve_after_mutation", |b| {
        b.iter(|| {
            space.define_method(&scratch, "noop", noop.clone()).unwrap();
            black_box(space.resolve(&class, selector))
        })
    });
}

// =============================================================================
// Send Benchmarks
// =============================================================================

fn bench_send(c: &mut Criterion) {
    let space = ObjectSpace::new();
    let class = space.define_class("Point", None).unwrap();
    space.attr_accessor(&class, &["x"]).unwrap();
    let point = space.new_instance(&class, &[]).unwrap();
    space.send(&point, "x=", &[Value::Int(3)]).unwrap();

    let reader = intern("x");
    c.bench_function("send_reader", |b| {
        b.iter(|| black_box(space.send(&point, reader, &[]).unwrap()))
    });

    let writer = intern("x=");
    let value = [Value::Int(4)];
    c.bench_function("send_writer", |b| {
        b.iter(|| black_box(space.send(&point, writer, &value).unwrap()))
    });
}

criterion_group!(benches, bench_resolve, bench_invalidation, bench_send);
criterion_main!(benches);
