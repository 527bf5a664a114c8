//! Chunk reassembly: records -> bytes -> gunzip -> SnapshotDocument

use std::io::Read;
use flate2::read::GzDecoder;
use rayon::prelude::*;
use crate::error::{ChunkSequenceFault, InventoryError, Result};
use crate::snapshot::SnapshotDocument;
use super::{ChunkRecord, TAG_CHUNKS, TAG_SIZE};

/// Rebuild a snapshot from its records, newest first
///
/// Returns `Ok(None)` when there is nothing to rebuild (no records, or an
/// empty master payload). The slice is trusted to be in descending
/// timestamp order; it is never sorted here. Records past the declared
/// chunk count belong to older snapshots and are ignored.
pub fn reconstruct(chunks: &[ChunkRecord]) -> Result<Option<SnapshotDocument>> {
    let Some(master) = chunks.first() else {
        return Ok(None);
    };
    if master.payload.is_empty() {
        return Ok(None);
    }

    let assembled = if master.is_master() {
        assemble(chunks)?
    } else {
        master.payload.clone()
    };

    let text = decompress(&assembled)?;
    let doc: SnapshotDocument = serde_json::from_str(&text)
        .map_err(|e| InventoryError::MalformedSnapshot(format!("invalid snapshot JSON: {}", e)))?;

    let dangling = doc.dangling_paths();
    if !dangling.is_empty() {
        tracing::warn!(
            "Snapshot rooted at {:?} has {} index entries that do not resolve: {:?}",
            doc.root().id(),
            dangling.len(),
            dangling
        );
    }

    tracing::debug!(
        "Reconstructed snapshot {:?} from {} bytes ({} decompressed)",
        doc.root().id(),
        assembled.len(),
        text.len()
    );

    Ok(Some(doc))
}

/// Reconstruct independent snapshots in parallel, one result per input
pub fn reconstruct_many(batches: &[Vec<ChunkRecord>]) -> Vec<Result<Option<SnapshotDocument>>> {
    batches.par_iter().map(|chunks| reconstruct(chunks)).collect()
}

fn parse_tag(master: &ChunkRecord, tag: &'static str) -> Result<usize> {
    let raw = master.tags.get(tag).ok_or(InventoryError::InvalidChunkSequence(
        ChunkSequenceFault::BadTag { tag, value: None },
    ))?;
    raw.trim().parse::<usize>().map_err(|_| {
        InventoryError::InvalidChunkSequence(ChunkSequenceFault::BadTag {
            tag,
            value: Some(raw.clone()),
        })
    })
}

/// Sanity-check a chunked sequence and concatenate its payloads
fn assemble(chunks: &[ChunkRecord]) -> Result<Vec<u8>> {
    let master = &chunks[0];
    let expected_count = parse_tag(master, TAG_CHUNKS)?;
    let expected_size = parse_tag(master, TAG_SIZE)?;

    if expected_count == 0 {
        return Err(InventoryError::InvalidChunkSequence(ChunkSequenceFault::BadTag {
            tag: TAG_CHUNKS,
            value: master.tags.get(TAG_CHUNKS).cloned(),
        }));
    }

    if chunks.len() < expected_count {
        return Err(InventoryError::IncompleteChunks {
            expected: expected_count,
            available: chunks.len(),
        });
    }

    // Chunks were written as consecutive descending ticks
    for i in 1..expected_count {
        let previous = chunks[i - 1].timestamp;
        match previous.checked_sub(1) {
            Some(expected_ts) if chunks[i].timestamp == expected_ts => {}
            expected_ts => {
                return Err(InventoryError::InvalidChunkSequence(ChunkSequenceFault::NonContiguous {
                    index: i,
                    timestamp: chunks[i].timestamp,
                    expected: expected_ts.unwrap_or(previous),
                }));
            }
        }
    }

    // The size tag is untrusted: never allocate more than the payloads hold
    let available: usize = chunks[..expected_count].iter().map(|c| c.payload.len()).sum();
    if expected_size > available {
        return Err(InventoryError::InvalidChunkSequence(ChunkSequenceFault::SizeMismatch {
            assembled: available,
            declared: expected_size,
        }));
    }

    let mut buffer = Vec::with_capacity(expected_size);
    for (i, chunk) in chunks[..expected_count].iter().enumerate() {
        let accumulated = buffer.len() + chunk.payload.len();
        if accumulated > expected_size {
            return Err(InventoryError::InvalidChunkSequence(ChunkSequenceFault::SizeOverflow {
                index: i,
                accumulated,
                declared: expected_size,
            }));
        }
        buffer.extend_from_slice(&chunk.payload);
    }

    if buffer.len() != expected_size {
        return Err(InventoryError::InvalidChunkSequence(ChunkSequenceFault::SizeMismatch {
            assembled: buffer.len(),
            declared: expected_size,
        }));
    }

    Ok(buffer)
}

/// Gunzip to UTF-8 text; an empty buffer decodes to an empty string
fn decompress(gzipped: &[u8]) -> Result<String> {
    if gzipped.is_empty() {
        return Ok(String::new());
    }

    let mut text = String::new();
    GzDecoder::new(gzipped)
        .read_to_string(&mut text)
        .map_err(|e| InventoryError::MalformedSnapshot(format!("gzip decode failed: {}", e)))?;
    Ok(text)
}
