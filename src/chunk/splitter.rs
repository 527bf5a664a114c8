//! Ingestion side of the codec: SnapshotDocument -> gzip -> chunk records

use std::io::Write;
use flate2::write::GzEncoder;
use flate2::Compression;
use crate::error::Result;
use crate::snapshot::SnapshotDocument;
use super::{ChunkRecord, TAG_CHUNKS, TAG_SIZE};

/// Serialize a document to JSON and gzip it
pub fn compress(doc: &SnapshotDocument) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(doc)?;
    let mut encoder = GzEncoder::new(Vec::with_capacity(json.len() / 4), Compression::default());
    encoder.write_all(&json)?;
    Ok(encoder.finish()?)
}

/// Cut a payload into records of at most `max_chunk_size` bytes
///
/// Records are returned newest first with timestamps descending by one from
/// `latest_timestamp`. Only a payload that needs more than one record gets
/// the `chunks`/`size` tags on its master. `max_chunk_size == 0` disables
/// splitting.
pub fn split_payload(payload: &[u8], max_chunk_size: usize, latest_timestamp: i64) -> Vec<ChunkRecord> {
    if max_chunk_size == 0 || payload.len() <= max_chunk_size {
        return vec![ChunkRecord::new(latest_timestamp, payload.to_vec())];
    }

    let mut records: Vec<ChunkRecord> = payload
        .chunks(max_chunk_size)
        .enumerate()
        .map(|(i, part)| ChunkRecord::new(latest_timestamp - i as i64, part.to_vec()))
        .collect();

    let count = records.len();
    let master = &mut records[0];
    master.tags.insert(TAG_CHUNKS.to_string(), count.to_string());
    master.tags.insert(TAG_SIZE.to_string(), payload.len().to_string());

    tracing::debug!(
        "Split {} bytes into {} chunks of at most {} bytes",
        payload.len(),
        count,
        max_chunk_size
    );

    records
}

/// Compress and split a document in one go
pub fn split(doc: &SnapshotDocument, max_chunk_size: usize, latest_timestamp: i64) -> Result<Vec<ChunkRecord>> {
    let compressed = compress(doc)?;
    Ok(split_payload(&compressed, max_chunk_size, latest_timestamp))
}
