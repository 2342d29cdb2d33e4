//! # Traversal Benchmarks
//!
//! Vertex/edge creation and neighbor traversal over the in-memory store,
//! for each adjacency compression mode.
//!
//! Run with: `cargo bench -p docgraph-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use docgraph_core::{
    AdjacencyCodec, AdjacencyLists, CompressionMode, Direction, DocGraph, DocumentStore,
    MemoryStore, Settings,
};
use std::hint::black_box;
use std::sync::Arc;

const MODES: [CompressionMode; 3] = [
    CompressionMode::None,
    CompressionMode::Inline,
    CompressionMode::External,
];

fn open_graph(mode: CompressionMode) -> DocGraph {
    let mut settings = Settings::default();
    settings.graph.compression = mode;
    DocGraph::open(&settings).expect("open graph")
}

/// A hub with `size` outgoing "spoke" edges.
fn create_star_graph(mode: CompressionMode, size: usize) -> DocGraph {
    let graph = open_graph(mode);
    let mut hub = graph.add_vertex(Some("hub")).expect("hub");
    for i in 0..size {
        let mut spoke = graph.add_vertex(Some(&format!("s{i}"))).expect("spoke");
        graph
            .add_edge(None, &mut hub, &mut spoke, "spoke")
            .expect("add")
            .expect("edge");
    }
    graph
}

/// Adjacency lists with `size` keys spread over a handful of labels.
fn create_lists(size: usize) -> AdjacencyLists {
    let mut lists = AdjacencyLists::new();
    for i in 0..size {
        let label = format!("label{}", i % 8);
        let key = format!("e_hub->|{label}|->s{i}");
        AdjacencyCodec::add_ref(&mut lists, &label, &key, Direction::Out);
    }
    lists
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_vertex_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("vertex_creation");

    for size in [100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let graph = open_graph(CompressionMode::None);
                for _ in 0..size {
                    let _ = graph.add_vertex(None);
                }
                black_box(graph)
            });
        });
    }

    group.finish();
}

fn bench_edge_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("edge_creation");

    for mode in MODES {
        for size in [50, 200].iter() {
            group.bench_with_input(BenchmarkId::new(mode.to_string(), size), size, |b, &size| {
                b.iter(|| black_box(create_star_graph(mode, size)));
            });
        }
    }

    group.finish();
}

fn bench_neighbors(c: &mut Criterion) {
    let mut group = c.benchmark_group("neighbors");

    for mode in MODES {
        for size in [50, 500].iter() {
            let graph = create_star_graph(mode, *size);
            let mut hub = graph
                .get_vertex("hub")
                .expect("lookup")
                .expect("hub should exist");

            group.bench_with_input(BenchmarkId::new(mode.to_string(), size), size, |b, _| {
                b.iter(|| black_box(hub.vertices(Direction::Out, &["spoke"]).expect("traverse")));
            });
        }
    }

    group.finish();
}

fn bench_adjacency_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("adjacency_codec");
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());

    for mode in MODES {
        let codec = AdjacencyCodec::new(mode.strategy(&store));
        for size in [100, 1000].iter() {
            let lists = create_lists(*size);
            let encoded = codec.encode("hub", &lists).expect("encode");

            group.bench_with_input(
                BenchmarkId::new(format!("{mode}/encode"), size),
                &lists,
                |b, lists| {
                    b.iter(|| black_box(codec.encode("hub", lists)));
                },
            );

            group.bench_with_input(
                BenchmarkId::new(format!("{mode}/decode"), size),
                &encoded,
                |b, encoded| {
                    b.iter(|| black_box(codec.decode("hub", encoded)));
                },
            );
        }
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_vertex_creation,
    bench_edge_creation,
    bench_neighbors,
    bench_adjacency_codec
);
criterion_main!(benches);
