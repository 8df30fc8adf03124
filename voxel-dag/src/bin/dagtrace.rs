//! Builds a procedural scene, imports it into a HashDAG store and traces a
//! small view of it, printing table statistics along the way.

use anyhow::Result;
use glam::{IVec3, Vec3};
use log::info;

use voxel_dag::{import_grid, render_hit_mask, SparseGrid, TracingParameters};

const WIDTH: usize = 72;
const HEIGHT: usize = 36;

fn sphere_shell(grid: &mut SparseGrid, center: IVec3, radius: i32) {
    let r_outer = radius * radius;
    let r_inner = (radius - 2) * (radius - 2);
    for x in -radius..=radius {
        for y in -radius..=radius {
            for z in -radius..=radius {
                let d = x * x + y * y + z * z;
                if d <= r_outer && d >= r_inner {
                    grid.set_voxel(center + IVec3::new(x, y, z));
                }
            }
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let mut grid = SparseGrid::new();
    sphere_shell(&mut grid, IVec3::new(128, 128, 128), 70);
    // A solid chunk next to the shell, for a second kind of geometry.
    for x in 220..280 {
        for y in 100..160 {
            for z in 100..160 {
                grid.set_voxel(IVec3::new(x, y, z));
            }
        }
    }

    let dag = import_grid(&grid)?;
    info!("imported {} trees", dag.trees().len());

    let stats = dag.stats();
    println!("{}", serde_json::to_string_pretty(&stats)?);

    let camera = Vec3::new(160.0, 128.0, -160.0);
    let target = Vec3::new(160.0, 128.0, 128.0);
    let tp = TracingParameters::for_frame(
        camera,
        target - camera,
        Vec3::new(0.0, 1.0, 0.0),
        std::f32::consts::FRAC_PI_3,
        WIDTH,
        HEIGHT,
    );

    let image = render_hit_mask(&dag, &tp, WIDTH, HEIGHT);
    let mut view = String::with_capacity((WIDTH + 1) * HEIGHT);
    for row in image.chunks(WIDTH) {
        for &pixel in row {
            view.push(if pixel != 0 { '#' } else { '.' });
        }
        view.push('\n');
    }
    print!("{}", view);

    let snapshot = dag.snapshot();
    info!(
        "snapshot: {} page table bytes, {} page bytes, {} trees",
        snapshot.page_table.len(),
        snapshot.pages.len(),
        snapshot.meta.tree_count
    );

    Ok(())
}
