//! Sparse grid to HashDAG conversion.
//!
//! The recursion tracks two indices at once: a cube in the grid node's local
//! child space (span 32 inside an L1, 16 inside an L2, halved per descent)
//! and the DAG level (one deeper per descent). When the tracking cube
//! reaches span 2 its octants address individual grid children, and the
//! walk hands over to the next grid tier; below an L2 that handover builds
//! the leaf-parent node from the 8^3 value mask directly.

use anyhow::Context;
use glam::IVec3;
use log::{debug, info, warn};

use hashdag_core::constants::LEAF_LEVEL;
use hashdag_core::geometry::AxisAlignedCube;
use hashdag_core::{Error, HashDag, TableLayout, VirtualPtr};

use crate::grid::{GridLeaf, GridTree, L1Node, L2Node, SparseGrid, L1_DIM, L2_DIM};

/// One grid tier as the recursion sees it: masked, indexed children plus
/// the rule for converting a child once the tracking cube bottoms out.
trait Branch {
    const DIM: usize;
    type Child;

    fn is_child_mask_on(&self, index: usize) -> bool;
    fn get_item(&self, index: usize) -> Option<&Self::Child>;
    fn convert_child(
        dag: &mut HashDag,
        child: &Self::Child,
        level: u32,
    ) -> hashdag_core::Result<Option<VirtualPtr>>;
}

impl Branch for L1Node {
    const DIM: usize = 32;
    type Child = L2Node;

    fn is_child_mask_on(&self, index: usize) -> bool {
        L1Node::is_child_mask_on(self, index)
    }

    fn get_item(&self, index: usize) -> Option<&L2Node> {
        L1Node::get_item(self, index)
    }

    fn convert_child(
        dag: &mut HashDag,
        child: &L2Node,
        level: u32,
    ) -> hashdag_core::Result<Option<VirtualPtr>> {
        if child.constant_state() == Some(true) {
            return synthesize_full(dag, level).map(Some);
        }
        let cube = AxisAlignedCube::new(IVec3::ZERO, L2_DIM as i32);
        descend::<L2Node>(dag, child, cube, level)
    }
}

impl Branch for L2Node {
    const DIM: usize = 16;
    type Child = GridLeaf;

    fn is_child_mask_on(&self, index: usize) -> bool {
        L2Node::is_child_mask_on(self, index)
    }

    fn get_item(&self, index: usize) -> Option<&GridLeaf> {
        L2Node::get_item(self, index)
    }

    fn convert_child(
        dag: &mut HashDag,
        child: &GridLeaf,
        level: u32,
    ) -> hashdag_core::Result<Option<VirtualPtr>> {
        build_leaf_parent(dag, child, level)
    }
}

fn child_index<B: Branch>(pos: IVec3) -> usize {
    B::DIM * B::DIM * pos.x as usize + B::DIM * pos.y as usize + pos.z as usize
}

/// Recursive splitting inside one grid node. Returns the interned node for
/// this cube, or `None` when the subtree is empty.
fn descend<B: Branch>(
    dag: &mut HashDag,
    node: &B,
    cube: AxisAlignedCube,
    level: u32,
) -> hashdag_core::Result<Option<VirtualPtr>> {
    let mut words = vec![0u32];
    for (octant, child_cube) in cube.split().iter().enumerate() {
        let child = if cube.span == 2 {
            let index = child_index::<B>(child_cube.pos);
            if !node.is_child_mask_on(index) {
                continue;
            }
            let grid_child = node.get_item(index).ok_or_else(|| {
                Error::CorruptGrid(format!(
                    "child {} is masked on but missing in a {}-wide branch",
                    index,
                    B::DIM
                ))
            })?;
            B::convert_child(dag, grid_child, level + 1)?
        } else {
            descend::<B>(dag, node, *child_cube, level + 1)?
        };
        if let Some(ptr) = child {
            words[0] |= 1 << octant;
            words.push(ptr.raw());
        }
    }
    if words[0] == 0 {
        return Ok(None);
    }
    dag.find_or_add_node(level, &words).map(Some)
}

/// Interns the all-on subtree rooted at `level`. Dedup collapses repeated
/// synthesis to one node chain.
fn synthesize_full(dag: &mut HashDag, level: u32) -> hashdag_core::Result<VirtualPtr> {
    if level == LEAF_LEVEL {
        return dag.find_or_add_leaf(u64::MAX);
    }
    let child = synthesize_full(dag, level + 1)?;
    let mut words = [child.raw(); 9];
    words[0] = 0xFF;
    dag.find_or_add_node(level, &words)
}

// The sub-block extraction below reorders the grid leaf's x-major bits into
// the DAG leaf's sub-octant-interleaved order. The shift and mask tables
// encode that permutation and must not be altered.
const REMAP_SHIFTS_RIGHT: [u32; 7] = [14, 12, 8, 6, 4, 2, 0];
const REMAP_SHIFTS_LEFT: [u32; 6] = [2, 4, 6, 8, 12, 14];
const REMAP_MASKS: [u64; 13] = [
    0x0030_0000_0030_0000,
    0x0003_0000_0003_0000,
    0x00C0_0000_00C0_0000,
    0x300C_0000_300C_0000,
    0x0300_0000_0300_0000,
    0x0000_0030_0000_0030,
    0xC000_0003_C000_0003,
    0x0C00_0000_0C00_0000,
    0x0000_00C0_0000_00C0,
    0x0000_300C_0000_300C,
    0x0000_0300_0000_0300,
    0x0000_C000_0000_C000,
    0x0000_0C00_0000_0C00,
];

/// DAG leaf word for one octant of an 8^3 grid leaf.
///
/// The octant index picks, in order, the byte-range half (x), the
/// byte-group half inside it (y) and the nibble half of each byte (z); the
/// 16 selected nibbles are packed and then permuted into leaf bit order.
fn octant_leaf_mask(leaf: &GridLeaf, octant: usize) -> u64 {
    let word_start = if octant < 4 { 0 } else { 32 };
    let first_four = matches!(octant, 0 | 1 | 4 | 5);
    let first_half = octant % 2 == 0;

    let mut packed = 0u64;
    let mut nibble = 0u32;
    for byte_id in word_start..word_start + 32 {
        let use_byte = (byte_id / 4) % 2 == if first_four { 0 } else { 1 };
        if !use_byte {
            continue;
        }
        let mut byte = leaf.mask_byte(byte_id);
        if first_half {
            byte &= 0x0F;
        } else {
            byte >>= 4;
        }
        packed |= u64::from(byte) << (nibble * 4);
        nibble += 1;
    }
    debug_assert_eq!(nibble, 16);

    let mut mask = 0u64;
    for (bits, shift) in REMAP_MASKS[..7].iter().zip(&REMAP_SHIFTS_RIGHT) {
        mask |= (packed & bits) >> shift;
    }
    for (bits, shift) in REMAP_MASKS[7..].iter().zip(&REMAP_SHIFTS_LEFT) {
        mask |= (packed & bits) << shift;
    }
    mask
}

/// Builds the node whose children are the up-to-eight DAG leaves of one grid
/// leaf. Empty octants are dropped; a fully empty grid leaf yields `None`.
fn build_leaf_parent(
    dag: &mut HashDag,
    leaf: &GridLeaf,
    level: u32,
) -> hashdag_core::Result<Option<VirtualPtr>> {
    debug_assert_eq!(level, LEAF_LEVEL - 1);
    let mut words = vec![0u32];
    for octant in 0..8 {
        let mask = octant_leaf_mask(leaf, octant);
        if mask != 0 {
            words[0] |= 1 << octant;
            words.push(dag.find_or_add_leaf(mask)?.raw());
        }
    }
    if words[0] == 0 {
        return Ok(None);
    }
    dag.find_or_add_node(level, &words).map(Some)
}

fn build_tree(dag: &mut HashDag, root: &L1Node) -> hashdag_core::Result<Option<VirtualPtr>> {
    if root.constant_state() == Some(true) {
        return synthesize_full(dag, 0).map(Some);
    }
    let cube = AxisAlignedCube::new(IVec3::ZERO, L1_DIM as i32);
    descend::<L1Node>(dag, root, cube, 0)
}

/// Conservative pool pre-sizing for one tree, from the grid's actual
/// counts. Every insertion opens at most one fresh page and a level can
/// never outgrow its bucket capacity, so the smaller of node width and
/// level capacity bounds the pages a level needs. Synthesized constant
/// subtrees intern to one node chain and add one to each affected level.
fn tree_page_budget(layout: &TableLayout, root: &L1Node) -> u64 {
    if root.constant_state() == Some(true) {
        // One synthesized node chain, at most one page per level.
        return u64::from(LEAF_LEVEL) + 1;
    }

    let mut l2_total = 0u64;
    let mut leaf_count = 0u64;
    let mut has_full = false;
    for (_, l2) in root.active_children() {
        l2_total += 1;
        if l2.constant_state() == Some(true) {
            has_full = true;
        } else {
            leaf_count += l2.active_child_count() as u64;
        }
    }
    let full = u64::from(has_full);

    (0..=LEAF_LEVEL)
        .map(|level| {
            let width = match level {
                0..=5 => 8u64.pow(level).min(l2_total),
                6..=8 => 8u64.pow(level).min(leaf_count) + full,
                9 => leaf_count + full,
                _ => 8 * leaf_count + full,
            };
            width.min(layout.level_capacity_pages(level))
        })
        .sum()
}

/// Pool pages to pre-allocate before importing `grid`, reserved page
/// included.
pub fn page_budget(layout: &TableLayout, grid: &SparseGrid) -> u32 {
    let pages: u64 = 1 + grid
        .trees()
        .iter()
        .map(|tree| tree_page_budget(layout, &tree.root))
        .sum::<u64>();
    pages.min(u64::from(u32::MAX)) as u32
}

/// Imports every tree of the grid into a freshly sized store. Trees whose
/// grid data contradicts itself are logged and skipped; the returned store
/// never claims them.
pub fn import_grid(grid: &SparseGrid) -> anyhow::Result<HashDag> {
    import_grid_with_layout(TableLayout::default(), grid)
}

pub fn import_grid_with_layout(
    layout: TableLayout,
    grid: &SparseGrid,
) -> anyhow::Result<HashDag> {
    let pool_pages = page_budget(&layout, grid);
    info!(
        "importing {} trees, pre-flight budget {} pool pages",
        grid.trees().len(),
        pool_pages
    );
    let mut dag = HashDag::with_layout(layout, pool_pages);

    for GridTree { origin, root } in grid.trees() {
        match build_tree(&mut dag, root) {
            Ok(Some(ptr)) => dag.add_root(ptr, *origin),
            Ok(None) => debug!("tree at {} is empty, skipped", origin),
            Err(err @ Error::CorruptGrid(_)) => {
                warn!("skipping tree at {}: {}", origin, err);
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to import tree at {}", origin));
            }
        }
    }

    debug!("import done:\n{}", dag.stats());
    Ok(dag)
}
