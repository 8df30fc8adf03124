//! Default tuning of the hash table geometry. Everything here is part of the
//! storage contract within one build: `MAX_LEVEL_COUNT` and `TREE_SPAN` fix
//! the on-wire node layout, `PAGE_SIZE` fixes the virtual address encoding.

/// Number of 32-bit words in one page.
pub const PAGE_SIZE: u32 = 512;

/// Octree depth of a single tree; 2^MAX_LEVEL_COUNT voxels per axis.
pub const MAX_LEVEL_COUNT: u32 = 12;

/// World-space extent of one tree along each axis.
pub const TREE_SPAN: i32 = 1 << MAX_LEVEL_COUNT;

/// The level at which nodes become packed 64-bit 4x4x4 leaves. The two
/// deepest levels of the octree live inside the leaf word.
pub const LEAF_LEVEL: u32 = MAX_LEVEL_COUNT - 2;

/// Number of levels served by the top bucket tier (levels `0..TOP_LEVEL_RANK`).
pub const TOP_LEVEL_RANK: u32 = 6;

/// Number of levels the bottom bucket tier reserves address space for.
pub const BOTTOM_LEVEL_RANK: u32 = MAX_LEVEL_COUNT - TOP_LEVEL_RANK;

/// Buckets per level in the top tier.
pub const TOP_LEVEL_BUCKET_COUNT: u32 = 1024;

/// Buckets per level in the bottom tier.
pub const BOTTOM_LEVEL_BUCKET_COUNT: u32 = 65536;

/// Capacity of one top-tier bucket, in words.
pub const TOP_LEVEL_BUCKET_SIZE: u32 = 1024;

/// Capacity of one bottom-tier bucket, in words.
pub const BOTTOM_LEVEL_BUCKET_SIZE: u32 = 4096;

/// Sentinel for "no pointer". Never returned by `find_or_add_*`.
pub const INVALID_POINTER: u32 = 0xFFFF_FFFF;
