//! Construction of HashDAG voxel stores from three-level sparse grids, and a
//! parallel CPU renderer over the result.

pub mod convert;
pub mod grid;
pub mod render;

pub use crate::convert::{import_grid, import_grid_with_layout, page_budget};
pub use crate::grid::{GridLeaf, GridTree, L1Node, L2Node, SparseGrid};
pub use crate::render::{render_depth, render_hit_mask, TracingParameters};
