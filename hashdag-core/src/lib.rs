//! Core parts of the HashDAG voxel store: the virtual paged pool, the
//! bucketed deduplicating hash table, node and leaf bit accessors, the forest
//! of tree roots, and the point-membership and ray traversal queries.

pub mod constants;
pub mod dag;
pub mod error;
pub mod geometry;
pub mod hash;
pub mod layout;
pub mod node;
pub mod pool;
pub mod snapshot;
pub mod stats;
pub mod table;
pub mod trace;

pub use crate::dag::{HashDag, TreeRoot};
pub use crate::error::{Error, Result};
pub use crate::layout::TableLayout;
pub use crate::pool::VirtualPtr;
pub use crate::snapshot::{GpuSnapshot, SnapshotMeta};
pub use crate::stats::TableStats;
pub use crate::table::HashTable;
pub use crate::trace::RayStats;

/// Fixed rng seed so test runs are reproducible.
pub const TEST_SEED: [u8; 16] = [
    0x3d, 0xbe, 0x62, 0x59, 0x8d, 0x31, 0x3d, 0x76, 0x32, 0x37, 0xdb, 0x17, 0xe5, 0xbc, 0x06, 0x54,
];
