//! Chunked snapshot records
//!
//! The time-series store caps record size, so a compressed snapshot may be
//! written as several consecutive records. Records are returned newest
//! first; the newest one (the master) carries the `chunks` and `size` tags.

pub mod assembler;
pub mod splitter;

use std::collections::BTreeMap;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use crate::error::{InventoryError, Result};

pub use assembler::{reconstruct, reconstruct_many};
pub use splitter::{compress, split, split_payload};

/// Master tag: total number of chunks
pub const TAG_CHUNKS: &str = "chunks";

/// Master tag: total byte length of the reassembled payload
pub const TAG_SIZE: &str = "size";

/// One stored fragment of a snapshot payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Store key; consecutive chunks of one snapshot differ by exactly 1
    pub timestamp: i64,

    pub payload: Vec<u8>,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl ChunkRecord {
    pub fn new(timestamp: i64, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            timestamp,
            payload: payload.into(),
            tags: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Build from a text data point whose value is base64 of the raw bytes
    pub fn from_base64(
        timestamp: i64,
        value: &str,
        tags: BTreeMap<String, String>,
    ) -> Result<Self> {
        let payload = BASE64
            .decode(value.trim())
            .map_err(|e| InventoryError::MalformedSnapshot(format!("chunk {} is not base64: {}", timestamp, e)))?;
        Ok(Self { timestamp, payload, tags })
    }

    pub fn payload_base64(&self) -> String {
        BASE64.encode(&self.payload)
    }

    /// Whether this record announces a chunked sequence
    pub fn is_master(&self) -> bool {
        self.tags.contains_key(TAG_CHUNKS)
    }
}
