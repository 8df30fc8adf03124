use std::fmt;

use itertools::Itertools;
use serde::Serialize;

use crate::constants::LEAF_LEVEL;
use crate::table::HashTable;

/// Occupancy diagnostics for a table. Non-normative: nothing in the store
/// depends on these numbers, they exist for logging and tuning.
#[derive(Debug, Clone, Serialize)]
pub struct TableStats {
    pub memory_allocated_bytes: u64,
    pub empty_buckets: u32,
    pub empty_to_total_ratio: f32,
    pub empty_top_to_total_ratio: f32,
    pub empty_bottom_to_total_ratio: f32,
    /// Mean fill of top-tier buckets, percent of capacity.
    pub avg_top_bucket_fullness: f32,
    /// Mean fill of bottom-tier buckets, percent of capacity.
    pub avg_bottom_bucket_fullness: f32,
    /// Pool pages in use, percent of the pre-allocated pool.
    pub memory_used_ratio: f32,
    /// Entries per level, `0..=LEAF_LEVEL`.
    pub level_node_count: Vec<u32>,
}

impl TableStats {
    pub(crate) fn collect(table: &HashTable) -> Self {
        let layout = table.layout();
        let total_top = layout.total_top_bucket_count();
        let total_bottom = layout.total_bottom_bucket_count();
        let total = layout.total_bucket_count();

        let mut empty_top = 0u32;
        let mut empty_bottom = 0u32;
        let mut top_words = 0u64;
        let mut bottom_words = 0u64;
        for bucket in 0..total {
            let size = table.bucket_size(bucket);
            if bucket < total_top {
                empty_top += u32::from(size == 0);
                top_words += u64::from(size);
            } else {
                empty_bottom += u32::from(size == 0);
                bottom_words += u64::from(size);
            }
        }

        let top_capacity = u64::from(total_top) * u64::from(layout.top_bucket_size);
        let bottom_capacity = u64::from(total_bottom) * u64::from(layout.bottom_bucket_size);

        TableStats {
            memory_allocated_bytes: table.allocated_bytes(),
            empty_buckets: empty_top + empty_bottom,
            empty_to_total_ratio: (empty_top + empty_bottom) as f32 / total as f32,
            empty_top_to_total_ratio: empty_top as f32 / total_top as f32,
            empty_bottom_to_total_ratio: empty_bottom as f32 / total_bottom as f32,
            avg_top_bucket_fullness: top_words as f32 / top_capacity as f32 * 100.0,
            avg_bottom_bucket_fullness: bottom_words as f32 / bottom_capacity as f32 * 100.0,
            memory_used_ratio: table.pool().top() as f32 / table.pool().pool_size() as f32 * 100.0,
            level_node_count: (0..=LEAF_LEVEL).map(|l| table.count_level_nodes(l)).collect(),
        }
    }
}

impl fmt::Display for TableStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "hash table stats:")?;
        writeln!(
            f,
            "  total memory allocated (MB): {:.3}",
            self.memory_allocated_bytes as f32 / (1024.0 * 1024.0)
        )?;
        writeln!(f, "  pool memory used (%): {:.2}", self.memory_used_ratio)?;
        writeln!(
            f,
            "  empty buckets: {} ({:.3} of total)",
            self.empty_buckets, self.empty_to_total_ratio
        )?;
        writeln!(
            f,
            "  average top bucket fullness (%): {:.4}",
            self.avg_top_bucket_fullness
        )?;
        writeln!(
            f,
            "  average bottom bucket fullness (%): {:.4}",
            self.avg_bottom_bucket_fullness
        )?;
        writeln!(
            f,
            "  nodes per level: {}",
            self.level_node_count
                .iter()
                .enumerate()
                .format_with(", ", |(level, count), f| f(&format_args!(
                    "l{}: {}",
                    level, count
                )))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::TableLayout;

    #[test]
    fn empty_table_reports_all_buckets_empty() {
        let layout = TableLayout::new(8, 2, 16, 4, 16);
        let table = HashTable::with_layout(layout, 16);
        let stats = table.stats();
        assert_eq!(stats.empty_buckets, layout.total_bucket_count());
        assert_eq!(stats.empty_to_total_ratio, 1.0);
        assert_eq!(stats.avg_top_bucket_fullness, 0.0);
        assert_eq!(stats.level_node_count, vec![0; LEAF_LEVEL as usize + 1]);
        // Only the reserved page counts as used.
        assert_eq!(stats.memory_used_ratio, 100.0 / 16.0);
    }

    #[test]
    fn insertions_move_the_ratios() {
        let layout = TableLayout::new(8, 2, 16, 4, 16);
        let mut table = HashTable::with_layout(layout, 16);
        table.find_or_add_leaf(0xAB).unwrap();
        table.find_or_add_node(0, &[0b1, 7]).unwrap();
        let stats = table.stats();
        assert_eq!(stats.empty_buckets, layout.total_bucket_count() - 2);
        assert!(stats.avg_top_bucket_fullness > 0.0);
        assert!(stats.avg_bottom_bucket_fullness > 0.0);
        assert_eq!(stats.level_node_count[0], 1);
        assert_eq!(stats.level_node_count[LEAF_LEVEL as usize], 1);
        // Display stays readable for logging.
        let text = stats.to_string();
        assert!(text.contains("nodes per level"));
        assert!(text.contains("l0: 1"));
        // And the whole block serializes for tooling.
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["empty_buckets"], layout.total_bucket_count() - 2);
    }
}
