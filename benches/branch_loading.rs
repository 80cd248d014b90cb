//! Criterion benchmarks for walking and loading wide trees.
//!
//! Key metrics:
//! - Best-effort branch load over in-memory leaves (tree overhead only)
//! - `walk()` path construction over a loaded tree
//! - Tree rendering
//!
//! Run with: cargo bench --bench branch_loading

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_datastreams::stream::NullParams;
use rust_datastreams::tree::render;
use rust_datastreams::{
    load_branch, DataStream, DataStreamCollection, Node, Payload, Reader, TreeOptions,
};

fn leaf(name: String) -> Node {
    DataStream::builder(name)
        .reader(Reader::new("constant", |_: &NullParams| {
            Ok(Payload::Text("sample".to_string()))
        }))
        .reader_params(NullParams)
        .build()
        .unwrap()
        .into()
}

/// `groups` collections of `width` leaves each.
fn wide_tree(groups: usize, width: usize) -> Node {
    let children = (0..groups).map(|g| {
        let leaves = (0..width).map(|i| leaf(format!("stream_{i}")));
        Node::Collection(DataStreamCollection::new_static(format!("group_{g}"), leaves).unwrap())
    });
    Node::Collection(DataStreamCollection::new_static("root", children).unwrap())
}

fn branch_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("branch_load");
    for (groups, width) in [(10, 10), (10, 100), (100, 100)] {
        group.throughput(Throughput::Elements((groups * width) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{groups}x{width}")),
            &(groups, width),
            |b, &(groups, width)| {
                let mut root = wide_tree(groups, width);
                b.iter(|| black_box(load_branch(&mut root, false).unwrap()));
            },
        );
    }
    group.finish();
}

fn walk(c: &mut Criterion) {
    let mut root = wide_tree(100, 100);
    load_branch(&mut root, false).unwrap();
    let collection = root.as_collection().unwrap();
    c.bench_function("walk_10k_paths", |b| {
        b.iter(|| black_box(collection.walk().map(|(path, _)| path.len()).sum::<usize>()));
    });
}

fn render_tree(c: &mut Criterion) {
    let mut root = wide_tree(10, 100);
    load_branch(&mut root, false).unwrap();
    c.bench_function("render_1k_leaves", |b| {
        b.iter(|| black_box(render(&root, TreeOptions::default()).len()));
    });
}

criterion_group!(benches, branch_load, walk, render_tree);
criterion_main!(benches);
