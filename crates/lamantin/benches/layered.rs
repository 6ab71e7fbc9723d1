use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use lamantin::{Context, SubgraphId};
use std::hint::black_box;
use std::time::Duration;

#[derive(Debug, Clone)]
struct GraphShape {
    node_count: usize,
    cluster_size: usize,
    edges: Vec<(usize, usize, u32)>,
}

impl GraphShape {
    fn build(&self) -> (Context, SubgraphId) {
        let mut ctx = Context::open();
        let root = ctx.open_graph("bench");
        let _ = ctx.set_attr(root, "rankdir", "LR");

        let mut nodes = Vec::with_capacity(self.node_count);
        let mut cluster = root;
        for i in 0..self.node_count {
            if self.cluster_size > 0 && i % self.cluster_size == 0 {
                cluster = ctx
                    .create_subgraph(root, &format!("cluster_{}", i / self.cluster_size))
                    .unwrap_or(root);
            }
            if let Ok(n) = ctx.create_node(cluster, &format!("n{i}")) {
                nodes.push(n);
            }
        }
        for &(from, to, minlen) in &self.edges {
            if let Ok(e) = ctx.create_edge(root, nodes[from], nodes[to]) {
                let _ = ctx.set_attr(e, "minlen", &minlen.to_string());
            }
        }
        (ctx, root)
    }
}

fn build_shape(node_count: usize, fanout: usize, cluster_size: usize) -> GraphShape {
    let mut edges = Vec::new();

    // A spine to guarantee connectivity.
    for i in 0..node_count.saturating_sub(1) {
        edges.push((i, i + 1, 1));
    }

    // Extra forward edges to create crossing pressure.
    for i in 0..node_count {
        for k in 2..=(fanout + 1) {
            let to = i + k;
            if to >= node_count {
                break;
            }
            edges.push((i, to, 1));
        }
    }

    GraphShape {
        node_count,
        cluster_size,
        edges,
    }
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layered");
    group.measurement_time(Duration::from_secs(10));

    let cases = [
        ("flat_50_f2", 50usize, 2usize, 0usize),
        ("flat_200_f3", 200, 3, 0),
        ("clustered_200_f3", 200, 3, 10),
    ];

    for (name, nodes, fanout, cluster_size) in cases {
        let shape = build_shape(nodes, fanout, cluster_size);
        group.bench_with_input(BenchmarkId::new("Context::layout", name), &shape, |b, shape| {
            b.iter_batched(
                || shape.build(),
                |(mut ctx, root)| {
                    let _ = black_box(ctx.layout(root));
                    ctx.close();
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_layout);
criterion_main!(benches);
