//! Error types for inventory reassembly and the graph store

use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, InventoryError>;

#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Inventory sanity check failure: {expected} chunks expected, only {available} are available")]
    IncompleteChunks { expected: usize, available: usize },

    #[error("Inventory sanity check failure: {0}")]
    InvalidChunkSequence(ChunkSequenceFault),

    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("Cycle detected: {id} is already an ancestor on path {}", .path.join(" -> "))]
    CycleDetected { id: String, path: Vec<String> },

    #[error("Tree under {root:?} exceeds the {what} limit of {limit}")]
    TreeLimitExceeded { root: String, what: &'static str, limit: usize },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid tag filter: {0}")]
    InvalidFilter(String),

    #[error("Chunk source error: {0}")]
    Source(String),

    #[error("Alert sink error: {0}")]
    Sink(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
}

impl InventoryError {
    /// Stable machine-readable name, used by the protocol layer
    pub fn kind(&self) -> &'static str {
        match self {
            InventoryError::IncompleteChunks { .. } => "incomplete_chunks",
            InventoryError::InvalidChunkSequence(_) => "invalid_chunk_sequence",
            InventoryError::MalformedSnapshot(_) => "malformed_snapshot",
            InventoryError::CycleDetected { .. } => "cycle_detected",
            InventoryError::TreeLimitExceeded { .. } => "tree_limit_exceeded",
            InventoryError::InvalidPath(_) => "invalid_path",
            InventoryError::InvalidFilter(_) => "invalid_filter",
            InventoryError::Source(_) => "source",
            InventoryError::Sink(_) => "sink",
            InventoryError::Io(_) => "io",
            InventoryError::Json(_) => "json",
            InventoryError::Encode(_) => "encode",
        }
    }
}

/// What exactly is wrong with a chunk sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkSequenceFault {
    /// `index` is 1-based relative to the master (the second element of the bad pair)
    NonContiguous { index: usize, timestamp: i64, expected: i64 },

    /// Appending chunk `index` would grow the buffer past the declared size
    SizeOverflow { index: usize, accumulated: usize, declared: usize },

    /// All declared chunks were appended but the buffer is shorter than declared
    SizeMismatch { assembled: usize, declared: usize },

    /// Master tag missing or not a valid count
    BadTag { tag: &'static str, value: Option<String> },
}

impl fmt::Display for ChunkSequenceFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkSequenceFault::NonContiguous { index, timestamp, expected } => write!(
                f,
                "chunk n°{} timestamp is {}, expecting {}",
                index, timestamp, expected
            ),
            ChunkSequenceFault::SizeOverflow { index, accumulated, declared } => write!(
                f,
                "chunk n°{} overflows declared size: {} bytes accumulated, {} declared",
                index, accumulated, declared
            ),
            ChunkSequenceFault::SizeMismatch { assembled, declared } => write!(
                f,
                "assembled {} bytes, {} declared",
                assembled, declared
            ),
            ChunkSequenceFault::BadTag { tag, value: Some(value) } => {
                write!(f, "invalid '{}' tag on master chunk: {:?}", tag, value)
            }
            ChunkSequenceFault::BadTag { tag, value: None } => {
                write!(f, "missing '{}' tag on master chunk", tag)
            }
        }
    }
}
