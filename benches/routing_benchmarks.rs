use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use trellis::{MatchPolicy, Method, Output, RoutePattern, RouteTable, Router};

fn table(size: usize) -> RouteTable {
    let mut table = RouteTable::new();
    for i in 0..size {
        table = table
            .get(&format!("/resource{}/{{id}}", i), |_, _| Ok(Output::Empty))
            .unwrap()
            .post(&format!("/resource{}", i), |_, _| Ok(Output::Empty))
            .unwrap();
    }
    table
}

fn bench_pattern_parsing(c: &mut Criterion) {
    c.bench_function("route_pattern_parse", |b| {
        b.iter(|| RoutePattern::parse(black_box("/users/{user}/posts/{post}/comments")))
    });
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("router_resolve");

    for size in [10, 100, 500] {
        for policy in [MatchPolicy::ScanAll, MatchPolicy::FirstStructural] {
            let router = Router::new(table(size)).with_policy(policy);
            let last = format!("/resource{}/42", size - 1);

            group.bench_with_input(
                BenchmarkId::new(format!("{:?}/hit_last", policy), size),
                &last,
                |b, path| b.iter(|| router.resolve(black_box(path), &Method::GET).is_ok()),
            );

            group.bench_with_input(
                BenchmarkId::new(format!("{:?}/method_not_allowed", policy), size),
                &last,
                |b, path| b.iter(|| router.resolve(black_box(path), &Method::DELETE).is_err()),
            );

            group.bench_with_input(
                BenchmarkId::new(format!("{:?}/not_found", policy), size),
                &"/missing/route",
                |b, path| b.iter(|| router.resolve(black_box(path), &Method::GET).is_err()),
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_pattern_parsing, bench_resolve);
criterion_main!(benches);
