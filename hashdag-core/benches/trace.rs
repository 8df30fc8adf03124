use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::{IVec3, Vec3};
use hashdag_core::constants::{LEAF_LEVEL, TREE_SPAN};
use hashdag_core::{HashDag, TableLayout, VirtualPtr};

fn full_subtree(dag: &mut HashDag, level: u32) -> VirtualPtr {
    if level == LEAF_LEVEL {
        return dag.find_or_add_leaf(u64::MAX).unwrap();
    }
    let child = full_subtree(dag, level + 1);
    let mut node = [child.raw(); 9];
    node[0] = 0xFF;
    dag.find_or_add_node(level, &node).unwrap()
}

fn dense_dag() -> HashDag {
    let mut dag = HashDag::with_layout(TableLayout::new(512, 16, 1024, 64, 4096), 256);
    let root = full_subtree(&mut dag, 0);
    dag.add_root(root, IVec3::ZERO);
    dag
}

fn cast_rays(c: &mut Criterion) {
    let dag = dense_dag();
    let span = TREE_SPAN as f32;

    c.bench_function("cast_ray/face_on", |b| {
        b.iter(|| {
            black_box(dag.cast_ray(
                Vec3::new(-10.0, span / 2.0, span / 2.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::ZERO,
            ))
        })
    });

    c.bench_function("cast_ray/diagonal", |b| {
        b.iter(|| black_box(dag.cast_ray(Vec3::splat(-10.0), Vec3::ONE, Vec3::ZERO)))
    });

    c.bench_function("cast_ray/miss", |b| {
        b.iter(|| {
            black_box(dag.cast_ray(
                Vec3::new(-10.0, -100.0, -100.0),
                Vec3::new(1.0, -1e-3, -1e-3),
                Vec3::ZERO,
            ))
        })
    });

    c.bench_function("is_active/diagonal_walk", |b| {
        b.iter(|| {
            for i in 0..64 {
                black_box(dag.is_active(IVec3::splat(i * 64)));
            }
        })
    });
}

criterion_group!(benches, cast_rays);
criterion_main!(benches);
