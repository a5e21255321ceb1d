//! Task Planning Benchmarks
//!
//! Measures plan construction for common graph shapes:
//! - Long linear chains
//! - Wide fan-out / fan-in
//! - Layered module graphs (every task depends on the previous layer)
//!
//! Run with: cargo bench --bench plan

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use strata_build::{Task, TaskGraphBuilder};

fn chain(n: usize) -> Vec<Task> {
    (0..n)
        .map(|i| {
            let task = Task::new(format!("t{}", i));
            if i == 0 {
                task
            } else {
                task.with_predecessors([format!("t{}", i - 1)])
            }
        })
        .collect()
}

fn fan(n: usize) -> Vec<Task> {
    let mut tasks = vec![Task::new("clean")];
    tasks.extend((0..n).map(|i| Task::new(format!("m{}:compile", i)).with_predecessors(["clean"])));
    tasks.push(Task::new("assemble").with_predecessors((0..n).map(|i| format!("m{}:compile", i))));
    tasks
}

fn layered(layers: usize, width: usize) -> Vec<Task> {
    let mut tasks = Vec::with_capacity(layers * width);
    for layer in 0..layers {
        for w in 0..width {
            let task = Task::new(format!("l{}:t{}", layer, w));
            let task = if layer == 0 {
                task
            } else {
                task.with_predecessors((0..width).map(|p| format!("l{}:t{}", layer - 1, p)))
            };
            tasks.push(task);
        }
    }
    tasks
}

fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_chain");
    for n in [100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let tasks = chain(n);
            b.iter(|| TaskGraphBuilder::new().build(black_box(tasks.clone())))
        });
    }
    group.finish();
}

fn bench_fan(c: &mut Criterion) {
    c.bench_function("plan_fan_1000", |b| {
        let tasks = fan(1000);
        b.iter(|| TaskGraphBuilder::new().build(black_box(tasks.clone())))
    });
}

fn bench_layered(c: &mut Criterion) {
    c.bench_function("plan_layered_20x20", |b| {
        let tasks = layered(20, 20);
        b.iter(|| TaskGraphBuilder::new().build(black_box(tasks.clone())))
    });
}

criterion_group!(benches, bench_chain, bench_fan, bench_layered);
criterion_main!(benches);
