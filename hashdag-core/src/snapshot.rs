//! Linearization of the store for a GPU-side copy.
//!
//! Three byte regions, each usable verbatim as a storage buffer, plus the
//! scalar metadata a traversal kernel needs. The page table and pages are
//! raw copies; only the live prefix of the pool is included.

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::constants::{LEAF_LEVEL, MAX_LEVEL_COUNT};
use crate::dag::HashDag;

/// Scalars accompanying the buffers, mirroring the push-constant block of a
/// rendering integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SnapshotMeta {
    pub page_size: u32,
    pub max_level_count: u32,
    pub leaf_level: u32,
    /// Physical pages captured in `pages`, the reserved page included.
    pub page_count: u32,
    pub tree_count: u32,
}

#[derive(Debug, Clone)]
pub struct GpuSnapshot {
    /// `total_page_count * 4` bytes: virtual page index -> physical page.
    pub page_table: Vec<u8>,
    /// `page_count * page_size * 4` bytes: the live pool prefix.
    pub pages: Vec<u8>,
    /// `tree_count * 16` bytes: `{ i32 offset[3]; u32 root; }` per tree.
    pub roots: Vec<u8>,
    pub meta: SnapshotMeta,
}

impl GpuSnapshot {
    pub fn capture(dag: &HashDag) -> Self {
        let table = dag.table();
        let pool = table.pool();

        let mut page_table = vec![0u8; pool.page_table().len() * 4];
        LittleEndian::write_u32_into(pool.page_table(), &mut page_table);

        let mut pages = vec![0u8; pool.live_words().len() * 4];
        LittleEndian::write_u32_into(pool.live_words(), &mut pages);

        let mut roots = Vec::with_capacity(dag.trees().len() * 16);
        for tree in dag.trees() {
            let mut record = [0u8; 16];
            LittleEndian::write_i32(&mut record[0..4], tree.offset.x);
            LittleEndian::write_i32(&mut record[4..8], tree.offset.y);
            LittleEndian::write_i32(&mut record[8..12], tree.offset.z);
            LittleEndian::write_u32(&mut record[12..16], tree.root.raw());
            roots.extend_from_slice(&record);
        }

        GpuSnapshot {
            page_table,
            pages,
            roots,
            meta: SnapshotMeta {
                page_size: table.layout().page_size,
                max_level_count: MAX_LEVEL_COUNT,
                leaf_level: LEAF_LEVEL,
                page_count: pool.top(),
                tree_count: dag.trees().len() as u32,
            },
        }
    }
}
