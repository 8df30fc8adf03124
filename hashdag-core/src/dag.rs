//! The store facade: one hash table plus the forest of tree roots, and the
//! two queries against them.

use glam::{IVec3, Vec3};
use log::trace;
use rand::Rng;

use crate::constants::{LEAF_LEVEL, TREE_SPAN};
use crate::error::Result;
use crate::geometry::AxisAlignedCube;
use crate::layout::TableLayout;
use crate::node;
use crate::pool::VirtualPtr;
use crate::snapshot::GpuSnapshot;
use crate::stats::TableStats;
use crate::table::HashTable;
use crate::trace::{cast_ray_in_tree, RayStats};

/// Default per-component magnitude of the ray direction jitter.
pub const DEFAULT_RAY_PERTURBATION: f32 = 1e-5;

/// One tree of the forest: a root node placed at a world offset. The tree
/// occupies `[offset, offset + TREE_SPAN)^3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeRoot {
    pub offset: IVec3,
    pub root: VirtualPtr,
}

#[derive(Debug)]
pub struct HashDag {
    table: HashTable,
    trees: Vec<TreeRoot>,
}

impl HashDag {
    pub fn new(pool_size_pages: u32) -> Self {
        Self::with_layout(TableLayout::default(), pool_size_pages)
    }

    pub fn with_layout(layout: TableLayout, pool_size_pages: u32) -> Self {
        HashDag {
            table: HashTable::with_layout(layout, pool_size_pages),
            trees: Vec::new(),
        }
    }

    pub fn table(&self) -> &HashTable {
        &self.table
    }

    pub fn find_or_add_leaf(&mut self, leaf: u64) -> Result<VirtualPtr> {
        self.table.find_or_add_leaf(leaf)
    }

    pub fn find_or_add_node(&mut self, level: u32, node: &[u32]) -> Result<VirtualPtr> {
        self.table.find_or_add_node(level, node)
    }

    /// Appends a tree to the forest. Roots are queried in insertion order
    /// and are expected not to overlap.
    pub fn add_root(&mut self, root: VirtualPtr, offset: IVec3) {
        assert!(root.is_valid(), "invalid pointer passed as tree root");
        self.trees.push(TreeRoot { offset, root });
    }

    pub fn trees(&self) -> &[TreeRoot] {
        &self.trees
    }

    pub fn tree_bounds(&self, tree: usize) -> AxisAlignedCube {
        AxisAlignedCube::new(self.trees[tree].offset, TREE_SPAN)
    }

    /// Smallest axis-aligned bounds holding every tree, as (min, max)
    /// corners with the max exclusive. `None` for an empty forest.
    pub fn scene_bounds(&self) -> Option<(IVec3, IVec3)> {
        let first = self.trees.first()?;
        let mut min = first.offset;
        let mut max = first.offset + IVec3::splat(TREE_SPAN);
        for tree in &self.trees[1..] {
            min = min.min(tree.offset);
            max = max.max(tree.offset + IVec3::splat(TREE_SPAN));
        }
        Some((min, max))
    }

    /// Tree indices ordered near-to-far from a camera position, for
    /// front-to-back submission.
    pub fn sorted_tree_indices(&self, camera: Vec3) -> Vec<u32> {
        let mut order: Vec<u32> = (0..self.trees.len() as u32).collect();
        let center = |index: u32| {
            self.trees[index as usize].offset.as_vec3() + Vec3::splat(TREE_SPAN as f32 / 2.0)
        };
        order.sort_by(|&a, &b| {
            let da = (center(a) - camera).length_squared();
            let db = (center(b) - camera).length_squared();
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        });
        order
    }

    /// Whether the world voxel is occupied in any tree.
    pub fn is_active(&self, voxel: IVec3) -> bool {
        self.trees.iter().any(|tree| {
            let cube = AxisAlignedCube::new(tree.offset, TREE_SPAN);
            cube.contains(voxel) && self.traverse_point(voxel, tree.root, 0, cube)
        })
    }

    fn traverse_point(
        &self,
        voxel: IVec3,
        node: VirtualPtr,
        level: u32,
        cube: AxisAlignedCube,
    ) -> bool {
        if level == LEAF_LEVEL {
            debug_assert_eq!(cube.span, 4);
            let local = voxel - cube.pos;
            let bit = node::leaf_bit_index(local.x as u32, local.y as u32, local.z as u32);
            return self.table.read_leaf(node) & (1 << bit) != 0;
        }

        let words = self.table.translate(node);
        let child_mask = words[0] & 0xFF;
        let mut slot = 0usize;
        for (child, child_cube) in cube.split().iter().enumerate() {
            if child_mask & (1 << child) == 0 {
                continue;
            }
            slot += 1;
            if child_cube.contains(voxel) {
                return self.traverse_point(voxel, VirtualPtr::new(words[slot]), level + 1, *child_cube);
            }
        }
        false
    }

    /// Casts a ray and returns the first occupied voxel it enters, in world
    /// coordinates. Trees are tried in forest order and the first tree that
    /// reports a hit wins, which is the correct first hit as long as the
    /// forest is disjoint.
    ///
    /// `perturbation` scales a random per-component jitter folded into the
    /// direction before normalizing; it keeps axis-aligned rays off the
    /// degenerate infinite-slab case. Pass zero for a deterministic cast.
    pub fn cast_ray(&self, origin: Vec3, direction: Vec3, perturbation: Vec3) -> Option<IVec3> {
        self.cast_ray_traced(origin, direction, perturbation).0
    }

    /// Same as [`cast_ray`](Self::cast_ray), also returning visit counters.
    pub fn cast_ray_traced(
        &self,
        origin: Vec3,
        direction: Vec3,
        perturbation: Vec3,
    ) -> (Option<IVec3>, RayStats) {
        let mut rng = rand::thread_rng();
        let jitter = Vec3::new(
            (rng.gen::<f32>() + 0.5) * perturbation.x,
            (rng.gen::<f32>() + 0.5) * perturbation.y,
            (rng.gen::<f32>() + 0.5) * perturbation.z,
        );
        let direction = (direction + jitter).normalize();
        // Component reciprocals in f64 as the reference tracer does them;
        // zero components stay infinite and get clamped during the walk.
        let inv_direction = Vec3::new(
            (1.0 / f64::from(direction.x)) as f32,
            (1.0 / f64::from(direction.y)) as f32,
            (1.0 / f64::from(direction.z)) as f32,
        );
        // One bit per negative direction component: along that axis the ray
        // reaches the high children first.
        let ray_child_order = (u8::from(direction.x < 0.0) << 2)
            | (u8::from(direction.y < 0.0) << 1)
            | u8::from(direction.z < 0.0);

        let mut stats = RayStats::default();
        for tree in &self.trees {
            let tree_origin = origin - tree.offset.as_vec3();
            let path = cast_ray_in_tree(
                &self.table,
                tree.root,
                tree_origin,
                direction,
                inv_direction,
                ray_child_order,
                &mut stats,
            );
            if !path.is_null() {
                let voxel = tree.offset + path.voxel();
                trace!("ray hit {} after {} node visits", voxel, stats.nodes_visited);
                return (Some(voxel), stats);
            }
        }
        (None, stats)
    }

    pub fn stats(&self) -> TableStats {
        self.table.stats()
    }

    /// Linearized buffers for a GPU-side copy of the store.
    pub fn snapshot(&self) -> GpuSnapshot {
        GpuSnapshot::capture(self)
    }
}
