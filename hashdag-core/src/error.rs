use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The pre-allocated page pool has no page left to hand out. Fatal
    /// during construction; queries never allocate and cannot reach this.
    #[error("out of DAG hash table memory ({0} pool pages in use)")]
    OutOfPoolMemory(u32),

    /// Variable-size nodes only exist above the leaf level; leaves go
    /// through `find_or_add_leaf`.
    #[error("level {0} cannot hold variable-size nodes")]
    LevelMismatch(u32),

    /// The imported sparse grid contradicts its own child masks.
    #[error("corrupt sparse grid: {0}")]
    CorruptGrid(String),
}

pub type Result<T> = std::result::Result<T, Error>;
