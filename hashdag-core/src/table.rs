//! The bucketed hash table holding every DAG node of every level.
//!
//! Each level owns a contiguous run of buckets (two tiers: few large buckets
//! for the shallow levels, many smaller ones for the deep levels). A bucket
//! is an append-only log of entries inside its slice of the virtual address
//! space; pages backing it are pulled lazily from the pool. Entries never
//! span a page: an insertion that would cross skips the page tail, and scans
//! step over the zero padding this leaves behind.

use log::debug;

use crate::constants::LEAF_LEVEL;
use crate::error::{Error, Result};
use crate::hash;
use crate::layout::TableLayout;
use crate::node::node_words;
use crate::pool::{PagePool, VirtualPtr};
use crate::stats::TableStats;

#[derive(Debug)]
pub struct HashTable {
    layout: TableLayout,
    pool: PagePool,
    /// Live word count per global bucket id, padding included.
    bucket_sizes: Vec<u32>,
}

impl HashTable {
    pub fn new(pool_size_pages: u32) -> Self {
        Self::with_layout(TableLayout::default(), pool_size_pages)
    }

    pub fn with_layout(layout: TableLayout, pool_size_pages: u32) -> Self {
        let table = HashTable {
            pool: PagePool::new(&layout, pool_size_pages),
            bucket_sizes: vec![0; layout.total_bucket_count() as usize],
            layout,
        };
        debug!(
            "hash table init: {} pool pages, {} virtual pages, {} buckets",
            pool_size_pages,
            layout.total_page_count(),
            layout.total_bucket_count()
        );
        table
    }

    pub fn layout(&self) -> &TableLayout {
        &self.layout
    }

    pub fn pool(&self) -> &PagePool {
        &self.pool
    }

    /// Physical words of the entry at `ptr`, up to its page end.
    pub fn translate(&self, ptr: VirtualPtr) -> &[u32] {
        self.pool.translate(ptr)
    }

    /// The 64-bit leaf stored at `ptr` (low word first).
    pub fn read_leaf(&self, ptr: VirtualPtr) -> u64 {
        let words = self.pool.translate(ptr);
        u64::from(words[0]) | u64::from(words[1]) << 32
    }

    /// Interns a leaf, returning the address of the existing copy if one is
    /// already stored in its bucket.
    pub fn find_or_add_leaf(&mut self, leaf: u64) -> Result<VirtualPtr> {
        let hash = hash::hash_leaf(leaf);
        let bucket = self.layout.bucket_index(LEAF_LEVEL, hash);
        if let Some(ptr) = self.find_leaf_in_bucket(bucket, leaf) {
            return Ok(ptr);
        }
        self.add_leaf(bucket, leaf)
    }

    /// Interns an internal node (mask word plus child pointers) at `level`.
    pub fn find_or_add_node(&mut self, level: u32, node: &[u32]) -> Result<VirtualPtr> {
        if level >= LEAF_LEVEL {
            return Err(Error::LevelMismatch(level));
        }
        debug_assert_eq!(node.len(), node_words(node[0]), "mask disagrees with length");
        debug_assert!(node.len() as u32 <= self.layout.page_size);
        let hash = hash::hash_node(node);
        let bucket = self.layout.bucket_index(level, hash);
        if let Some(ptr) = self.find_node_in_bucket(bucket, node) {
            return Ok(ptr);
        }
        self.add_node(bucket, node)
    }

    fn find_leaf_in_bucket(&self, bucket: u32, leaf: u64) -> Option<VirtualPtr> {
        let base = self.layout.bucket_ptr(bucket);
        let size = self.bucket_sizes[bucket as usize];
        let page_size = self.layout.page_size;

        let mut p = 0;
        while p < size {
            let words = self.pool.translate(VirtualPtr::new(base + p));
            // Leaves are stored as aligned word pairs.
            let pairs = (size - p).min(page_size) / 2;
            for i in 0..pairs as usize {
                let entry = u64::from(words[2 * i]) | u64::from(words[2 * i + 1]) << 32;
                if entry == leaf {
                    return Some(VirtualPtr::new(base + p + 2 * i as u32));
                }
            }
            p += page_size;
        }
        None
    }

    fn find_node_in_bucket(&self, bucket: u32, node: &[u32]) -> Option<VirtualPtr> {
        let base = self.layout.bucket_ptr(bucket);
        let size = self.bucket_sizes[bucket as usize];
        let page_size = self.layout.page_size;
        let n = node.len() as u32;

        let mut p = 0;
        while p < size {
            // An entry starting this close to the bucket end cannot match.
            if p + n >= size {
                return None;
            }
            let words = self.pool.translate(VirtualPtr::new(base + p));
            let entry_count = (size - p).min(page_size) as usize;
            let mut i = 0;
            while i < entry_count {
                let end = (i + node.len()).min(words.len());
                if words[i..end] == *node {
                    return Some(VirtualPtr::new(base + p + i as u32));
                }
                // Padding words read as empty masks and advance one word at
                // a time.
                i += node_words(words[i]);
            }
            p += page_size;
        }
        None
    }

    fn add_leaf(&mut self, bucket: u32, leaf: u64) -> Result<VirtualPtr> {
        let size = self.bucket_sizes[bucket as usize];
        let ptr = VirtualPtr::new(self.layout.bucket_ptr(bucket) + size);
        let page = ptr.raw() / self.layout.page_size;

        if size % self.layout.page_size == 0 && !self.pool.is_allocated(page) {
            self.pool.allocate_page(page)?;
        }
        debug_assert!(size + 2 <= self.layout.bucket_words(bucket), "bucket overflow");

        let words = self.pool.translate_mut(ptr);
        words[0] = leaf as u32;
        words[1] = (leaf >> 32) as u32;
        self.bucket_sizes[bucket as usize] = size + 2;
        Ok(ptr)
    }

    fn add_node(&mut self, bucket: u32, node: &[u32]) -> Result<VirtualPtr> {
        let page_size = self.layout.page_size;
        let mut size = self.bucket_sizes[bucket as usize];
        let n = node.len() as u32;

        let space_left = page_size - size % page_size;
        if space_left == page_size || space_left < n {
            if space_left != page_size {
                // The node would cross the page boundary: skip the tail and
                // start it on a fresh page.
                size += space_left;
            }
            let page = (self.layout.bucket_ptr(bucket) + size) / page_size;
            if !self.pool.is_allocated(page) {
                self.pool.allocate_page(page)?;
            }
        }
        debug_assert!(size + n <= self.layout.bucket_words(bucket), "bucket overflow");

        let ptr = VirtualPtr::new(self.layout.bucket_ptr(bucket) + size);
        let words = self.pool.translate_mut(ptr);
        words[..node.len()].copy_from_slice(node);
        self.bucket_sizes[bucket as usize] = size + n;
        Ok(ptr)
    }

    /// Entries stored at `level`, by walking its buckets. Page-tail padding
    /// in internal-node buckets is counted as it is scanned, so the number
    /// is exact only for buckets that never skipped a boundary.
    pub fn count_level_nodes(&self, level: u32) -> u32 {
        let page_size = self.layout.page_size;
        let mut result = 0;
        for bucket in self.layout.level_bucket_range(level) {
            let size = self.bucket_sizes[bucket as usize];
            if level == LEAF_LEVEL {
                result += size / 2;
                continue;
            }
            let base = self.layout.bucket_ptr(bucket);
            let mut p = 0;
            while p < size {
                let words = self.pool.translate(VirtualPtr::new(base + p));
                let entry_count = (size - p).min(page_size) as usize;
                let mut i = 0;
                while i < entry_count {
                    i += node_words(words[i]);
                    result += 1;
                }
                p += page_size;
            }
        }
        result
    }

    /// Bytes owned by the pool, page table and bucket-size array together.
    pub fn allocated_bytes(&self) -> u64 {
        (u64::from(self.pool.pool_size()) * u64::from(self.layout.page_size)
            + u64::from(self.layout.total_page_count())
            + u64::from(self.layout.total_bucket_count()))
            * 4
    }

    pub fn bucket_size(&self, bucket: u32) -> u32 {
        self.bucket_sizes[bucket as usize]
    }

    pub fn stats(&self) -> TableStats {
        TableStats::collect(self)
    }
}
