//! MessagePack request/response protocol over length-prefixed frames
//!
//! Frame: `[4-byte length BE] [MessagePack payload]`, both directions.
//! Requests are maps tagged by `cmd`; responses are plain maps with named
//! fields.

use std::io::{self, Read, Write};
use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use crate::chunk::{reconstruct, ChunkRecord};
use crate::error::{InventoryError, Result};
use crate::graph::{
    IngestStats, Metric, Resource, ResourceNode, ResourceType, SharedInventory, StoreStats, TreeLimits,
};
use crate::snapshot::{metrics_of_type, Entity};

/// Default frame size limit
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 100 * 1024 * 1024;

/// Request from client
#[derive(Debug, Deserialize)]
#[serde(tag = "cmd", rename_all = "camelCase")]
pub enum Request {
    // Write operations (each one batch, reindexed)
    AddResources { resources: Vec<Resource> },
    AddResourceTypes {
        #[serde(rename = "resourceTypes")]
        resource_types: Vec<ResourceType>,
    },
    AddMetrics { metrics: Vec<Metric> },
    Reindex,

    // Read operations
    GetResource { id: String },
    GetTopResources,
    GetResourcesByType {
        #[serde(rename = "typeId")]
        type_id: String,
    },
    GetResourceTypes,
    GetResourceType { id: String },
    GetResourceMetrics { id: String },
    GetTree { id: String },

    // Snapshot operations
    IngestChunks { chunks: Vec<WireChunk> },
    MetricsOfType {
        chunks: Vec<WireChunk>,
        #[serde(rename = "typeId")]
        type_id: String,
    },

    // Control
    Stats,
    Ping,
    Shutdown,
}

/// Response to client
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Response {
    Ok { ok: bool },
    Error { error: String, kind: String },
    Count { count: usize },
    Resource { resource: Option<Resource> },
    Resources { resources: Vec<Resource> },
    ResourceType {
        #[serde(rename = "resourceType")]
        resource_type: Option<ResourceType>,
    },
    ResourceTypes {
        #[serde(rename = "resourceTypes")]
        resource_types: Vec<ResourceType>,
    },
    Metrics { metrics: Option<Vec<Metric>> },
    Tree { tree: Option<ResourceNode> },
    Ingested { ingested: Option<IngestStats> },
    Entities { entities: Vec<Entity> },
    Stats { stats: StoreStats },
    Pong { pong: bool, version: String },
}

impl Response {
    pub fn from_error(err: &InventoryError) -> Self {
        Response::Error { error: err.to_string(), kind: err.kind().to_string() }
    }
}

/// Chunk record as sent by clients: the payload is base64 text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireChunk {
    pub timestamp: i64,
    pub value: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl WireChunk {
    pub fn from_record(record: &ChunkRecord) -> Self {
        Self {
            timestamp: record.timestamp,
            value: record.payload_base64(),
            tags: record.tags.clone(),
        }
    }

    pub fn into_record(self) -> Result<ChunkRecord> {
        ChunkRecord::from_base64(self.timestamp, &self.value, self.tags)
    }
}

/// Decode wire chunks, keeping their order (newest first)
pub fn decode_chunks(chunks: Vec<WireChunk>) -> Result<Vec<ChunkRecord>> {
    chunks.into_iter().map(WireChunk::into_record).collect()
}

fn try_handle(shared: &SharedInventory, request: Request) -> Result<Response> {
    let response = match request {
        Request::AddResources { resources } => Response::Count { count: shared.add_resources(resources) },
        Request::AddResourceTypes { resource_types } => {
            Response::Count { count: shared.add_resource_types(resource_types) }
        }
        Request::AddMetrics { metrics } => Response::Count { count: shared.add_metrics(metrics) },
        Request::Reindex => {
            shared.reindex();
            Response::Ok { ok: true }
        }

        Request::GetResource { id } => Response::Resource { resource: shared.get_resource(&id) },
        Request::GetTopResources => Response::Resources { resources: shared.get_all_top_resources() },
        Request::GetResourcesByType { type_id } => {
            Response::Resources { resources: shared.get_resources_by_type(&type_id) }
        }
        Request::GetResourceTypes => Response::ResourceTypes { resource_types: shared.get_all_resource_types() },
        Request::GetResourceType { id } => Response::ResourceType { resource_type: shared.get_resource_type(&id) },
        Request::GetResourceMetrics { id } => Response::Metrics { metrics: shared.get_resource_metrics(&id) },
        Request::GetTree { id } => Response::Tree { tree: shared.get_tree_limited(&id, TreeLimits::wire())? },

        Request::IngestChunks { chunks } => {
            let records = decode_chunks(chunks)?;
            let ingested = reconstruct(&records)?.map(|doc| shared.ingest(&doc));
            Response::Ingested { ingested }
        }
        Request::MetricsOfType { chunks, type_id } => {
            let records = decode_chunks(chunks)?;
            let entities = match reconstruct(&records)? {
                Some(doc) => metrics_of_type(&doc, &type_id).into_iter().cloned().collect(),
                None => Vec::new(),
            };
            Response::Entities { entities }
        }

        Request::Stats => Response::Stats { stats: shared.stats() },
        Request::Ping => Response::Pong { pong: true, version: env!("CARGO_PKG_VERSION").to_string() },
        Request::Shutdown => Response::Ok { ok: true },
    };
    Ok(response)
}

/// Execute one request; failures become `Response::Error`
pub fn handle_request(shared: &SharedInventory, request: Request) -> Response {
    match try_handle(shared, request) {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("Request failed: {}", e);
            Response::from_error(&e)
        }
    }
}

/// Decode, execute and encode one frame
///
/// Returns the response payload and whether the client asked for shutdown.
/// A payload that is not a valid request gets an `invalid_request` error.
pub fn handle_frame(shared: &SharedInventory, frame: &[u8]) -> Result<(Vec<u8>, bool)> {
    let (response, is_shutdown) = match rmp_serde::from_slice::<Request>(frame) {
        Ok(request) => {
            let is_shutdown = matches!(request, Request::Shutdown);
            (handle_request(shared, request), is_shutdown)
        }
        Err(e) => (
            Response::Error {
                error: format!("Invalid request: {}", e),
                kind: "invalid_request".to_string(),
            },
            false,
        ),
    };

    // Named fields, so clients can read responses as maps
    let bytes = rmp_serde::to_vec_named(&response)?;
    Ok((bytes, is_shutdown))
}

/// Read one frame; Ok(None) on clean end of stream
pub fn read_message<R: Read>(reader: &mut R, max_len: usize) -> io::Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max_len {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Message too large: {} bytes (limit {})", len, max_len),
        ));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(Some(buf))
}

pub fn write_message<W: Write>(writer: &mut W, data: &[u8]) -> io::Result<()> {
    let len = u32::try_from(data.len()).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("Message too large: {} bytes", data.len()))
    })?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(data)?;
    writer.flush()
}
