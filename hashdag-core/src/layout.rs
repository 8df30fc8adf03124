use crate::constants::{
    BOTTOM_LEVEL_BUCKET_COUNT, BOTTOM_LEVEL_BUCKET_SIZE, BOTTOM_LEVEL_RANK, PAGE_SIZE,
    TOP_LEVEL_BUCKET_COUNT, TOP_LEVEL_BUCKET_SIZE, TOP_LEVEL_RANK,
};
use std::ops::Range;

/// Runtime copy of the page/bucket geometry.
///
/// The defaults reproduce the constants in [`crate::constants`]; tests shrink
/// them to exercise page-boundary behavior without filling megabytes of pool.
/// All bucket addressing math lives here: a global bucket id is a dense index
/// over levels in declaration order, top tier first, and `bucket_ptr` maps it
/// to the base virtual address of its bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLayout {
    /// Words per page. Power of two.
    pub page_size: u32,
    /// Buckets per level in the top tier. Power of two.
    pub top_bucket_count: u32,
    /// Words per top-tier bucket. Multiple of `page_size`.
    pub top_bucket_size: u32,
    /// Buckets per level in the bottom tier. Power of two.
    pub bottom_bucket_count: u32,
    /// Words per bottom-tier bucket. Multiple of `page_size`.
    pub bottom_bucket_size: u32,
}

impl Default for TableLayout {
    fn default() -> Self {
        TableLayout {
            page_size: PAGE_SIZE,
            top_bucket_count: TOP_LEVEL_BUCKET_COUNT,
            top_bucket_size: TOP_LEVEL_BUCKET_SIZE,
            bottom_bucket_count: BOTTOM_LEVEL_BUCKET_COUNT,
            bottom_bucket_size: BOTTOM_LEVEL_BUCKET_SIZE,
        }
    }
}

impl TableLayout {
    pub fn new(
        page_size: u32,
        top_bucket_count: u32,
        top_bucket_size: u32,
        bottom_bucket_count: u32,
        bottom_bucket_size: u32,
    ) -> Self {
        let layout = TableLayout {
            page_size,
            top_bucket_count,
            top_bucket_size,
            bottom_bucket_count,
            bottom_bucket_size,
        };
        layout.validate();
        layout
    }

    fn validate(&self) {
        assert!(self.page_size.is_power_of_two() && self.page_size >= 2);
        assert!(self.top_bucket_count.is_power_of_two());
        assert!(self.bottom_bucket_count.is_power_of_two());
        assert!(self.top_bucket_size >= self.page_size && self.top_bucket_size % self.page_size == 0);
        assert!(
            self.bottom_bucket_size >= self.page_size
                && self.bottom_bucket_size % self.page_size == 0
        );
        // The whole virtual address space must stay 32-bit addressable.
        assert!(self.total_words() <= u64::from(u32::MAX));
    }

    pub fn is_top_level(level: u32) -> bool {
        level < TOP_LEVEL_RANK
    }

    pub fn total_top_bucket_count(&self) -> u32 {
        TOP_LEVEL_RANK * self.top_bucket_count
    }

    pub fn total_bottom_bucket_count(&self) -> u32 {
        BOTTOM_LEVEL_RANK * self.bottom_bucket_count
    }

    pub fn total_bucket_count(&self) -> u32 {
        self.total_top_bucket_count() + self.total_bottom_bucket_count()
    }

    fn top_tier_words(&self) -> u64 {
        u64::from(self.total_top_bucket_count()) * u64::from(self.top_bucket_size)
    }

    fn total_words(&self) -> u64 {
        self.top_tier_words()
            + u64::from(self.total_bottom_bucket_count()) * u64::from(self.bottom_bucket_size)
    }

    /// Number of virtual pages spanned by the full bucket address space.
    pub fn total_page_count(&self) -> u32 {
        (self.total_words() / u64::from(self.page_size)) as u32
    }

    pub fn buckets_per_level(&self, level: u32) -> u32 {
        if Self::is_top_level(level) {
            self.top_bucket_count
        } else {
            self.bottom_bucket_count
        }
    }

    /// Global bucket id for a hash at a level.
    pub fn bucket_index(&self, level: u32, hash: u32) -> u32 {
        let local = hash & (self.buckets_per_level(level) - 1);
        if Self::is_top_level(level) {
            level * self.top_bucket_count + local
        } else {
            self.total_top_bucket_count()
                + (level - TOP_LEVEL_RANK) * self.bottom_bucket_count
                + local
        }
    }

    /// Base virtual address of a bucket.
    pub fn bucket_ptr(&self, bucket: u32) -> u32 {
        if bucket < self.total_top_bucket_count() {
            bucket * self.top_bucket_size
        } else {
            (self.top_tier_words()
                + u64::from(bucket - self.total_top_bucket_count())
                    * u64::from(self.bottom_bucket_size)) as u32
        }
    }

    /// Word capacity of a bucket.
    pub fn bucket_words(&self, bucket: u32) -> u32 {
        if bucket < self.total_top_bucket_count() {
            self.top_bucket_size
        } else {
            self.bottom_bucket_size
        }
    }

    /// Global bucket ids owned by a level.
    pub fn level_bucket_range(&self, level: u32) -> Range<u32> {
        let first = self.bucket_index(level, 0);
        first..first + self.buckets_per_level(level)
    }

    /// Upper bound on the pages a level can ever allocate.
    pub fn level_capacity_pages(&self, level: u32) -> u64 {
        let (count, size) = if Self::is_top_level(level) {
            (self.top_bucket_count, self.top_bucket_size)
        } else {
            (self.bottom_bucket_count, self.bottom_bucket_size)
        };
        u64::from(count) * u64::from(size) / u64::from(self.page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::LEAF_LEVEL;

    #[test]
    fn default_page_count_matches_constants() {
        let layout = TableLayout::default();
        let words = 6 * 1024 * 1024u64 + 6 * 65536 * 4096u64;
        assert_eq!(layout.total_page_count(), (words / 512) as u32);
        assert_eq!(layout.total_bucket_count(), 6 * 1024 + 6 * 65536);
    }

    #[test]
    fn bucket_addressing_is_dense_and_disjoint() {
        let layout = TableLayout::default();
        // Consecutive buckets start exactly one bucket capacity apart.
        for bucket in [0, 1, 6143, 6144, 6145, layout.total_bucket_count() - 1] {
            let ptr = layout.bucket_ptr(bucket);
            assert_eq!(ptr % layout.page_size, 0);
            if bucket + 1 < layout.total_bucket_count() {
                assert_eq!(
                    layout.bucket_ptr(bucket + 1),
                    ptr + layout.bucket_words(bucket)
                );
            }
        }
    }

    #[test]
    fn bucket_index_separates_tiers_and_levels() {
        let layout = TableLayout::default();
        assert_eq!(layout.bucket_index(0, 0), 0);
        assert_eq!(layout.bucket_index(1, 0), 1024);
        assert_eq!(layout.bucket_index(5, 1023), 6 * 1024 - 1);
        assert_eq!(layout.bucket_index(6, 0), 6 * 1024);
        assert_eq!(layout.bucket_index(LEAF_LEVEL, 0), 6 * 1024 + 4 * 65536);
        // The hash is reduced modulo the per-level bucket count.
        assert_eq!(layout.bucket_index(0, 1024), layout.bucket_index(0, 0));
        assert_eq!(layout.bucket_index(6, 65536), layout.bucket_index(6, 0));
    }

    #[test]
    fn shrunk_layout_for_tests_is_valid() {
        let layout = TableLayout::new(8, 2, 16, 4, 32);
        assert_eq!(layout.total_page_count(), (6 * 2 * 16 + 6 * 4 * 32) / 8);
        assert_eq!(layout.level_bucket_range(LEAF_LEVEL).len(), 4);
    }
}
