//! Benchmark suite for snapshot reassembly and tree materialization

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use invdb::chunk::split;
use invdb::{reconstruct, reconstruct_many, Entity, InventoryGraph, InventoryStore, Resource, SnapshotDocument, StructureNode};

fn create_test_snapshot(metric_count: usize) -> SnapshotDocument {
    let mut root = StructureNode::new(Entity::resource("server", "WildFly Server"));
    for i in 0..metric_count {
        root = root.with_child(StructureNode::new(Entity::metric(
            format!("metric_{}", i),
            format!("Metric {}", i),
            format!("/t;bench/f;feed/mt;type_{}", i % 20),
        )));
    }
    SnapshotDocument::from_structure(root)
}

/// `fanout` top-level resources, each with `fanout` children, three levels deep
fn create_test_graph(fanout: usize) -> InventoryGraph {
    let mut graph = InventoryGraph::new();
    for a in 0..fanout {
        let top = format!("r{}", a);
        graph.add_resource(Resource::new(&top, &top, "TOP"));
        for b in 0..fanout {
            let mid = format!("{}.{}", top, b);
            graph.add_resource(Resource::new(&mid, &mid, "MID").parent(&top));
            for c in 0..fanout {
                let leaf = format!("{}.{}", mid, c);
                graph.add_resource(Resource::new(&leaf, &leaf, "LEAF").parent(&mid));
            }
        }
    }
    graph.reindex();
    graph
}

fn bench_reconstruct(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconstruct");
    let doc = create_test_snapshot(5_000);

    for max_chunk in [0usize, 64 * 1024, 4 * 1024] {
        let records = split(&doc, max_chunk, 1_000_000).unwrap();
        group.bench_with_input(BenchmarkId::new("chunks", records.len()), &records, |b, records| {
            b.iter(|| reconstruct(black_box(records)).unwrap());
        });
    }

    group.finish();
}

fn bench_reconstruct_many(c: &mut Criterion) {
    let batches: Vec<_> = (0..64)
        .map(|i| split(&create_test_snapshot(500), 4 * 1024, 1_000 * i).unwrap())
        .collect();

    c.bench_function("reconstruct_many_64", |b| {
        b.iter(|| reconstruct_many(black_box(&batches)));
    });
}

fn bench_reindex(c: &mut Criterion) {
    let mut group = c.benchmark_group("reindex");

    for fanout in [10, 30] {
        let mut graph = create_test_graph(fanout);
        group.bench_with_input(BenchmarkId::from_parameter(fanout), &fanout, |b, _| {
            b.iter(|| graph.reindex());
        });
    }

    group.finish();
}

fn bench_get_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_tree");

    for fanout in [10, 30] {
        let graph = create_test_graph(fanout);
        group.bench_with_input(BenchmarkId::from_parameter(fanout), &fanout, |b, _| {
            b.iter(|| graph.get_tree(black_box("r0")).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_reconstruct, bench_reconstruct_many, bench_reindex, bench_get_tree);
criterion_main!(benches);
