//! invdb - in-memory inventory graph fed by chunked snapshots
//!
//! # Architecture
//!
//! - **Chunk codec**: gzip JSON snapshots split across consecutive
//!   time-series records, sanity-checked on reassembly
//! - **Snapshot documents**: structure tree plus type indices addressed by
//!   relative paths
//! - **Inventory graph**: upsert-only maps with an adjacency index rebuilt
//!   by `reindex`
//! - **Tree materialization**: iterative DFS that fails on cycles and
//!   respects depth and node limits
//! - **Server**: MessagePack over a Unix socket, one thread per client
//!
//! # Usage example
//!
//! ```no_run
//! use invdb::{InventoryGraph, InventoryStore, Resource};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut graph = InventoryGraph::new();
//!
//! graph.add_resource(Resource::new("EAP-1", "EAP-1", "EAP").children(["child-1"]));
//! graph.add_resource(Resource::new("child-1", "Child 1", "FOO").parent("EAP-1"));
//! graph.reindex();
//!
//! if let Some(tree) = graph.get_tree("EAP-1")? {
//!     println!("{} has {} children", tree.name, tree.children.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod chunk;
pub mod config;
pub mod error;
pub mod events;
pub mod graph;
pub mod protocol;
pub mod snapshot;
pub mod source;

pub use chunk::{reconstruct, reconstruct_many, ChunkRecord};
pub use error::{ChunkSequenceFault, InventoryError, Result};
pub use graph::{
    InventoryGraph, InventoryStore, Metric, Resource, ResourceNode, ResourceType, SharedInventory,
    TreeLimits,
};
pub use snapshot::{metrics_of_type, Entity, SnapshotDocument, StructureNode};
