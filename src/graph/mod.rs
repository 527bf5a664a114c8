//! Inventory graph API and implementation

pub mod engine;
pub mod ingest;
pub mod model;
pub mod shared;
pub mod traversal;

pub use engine::{InventoryGraph, StoreStats};
pub use ingest::{load_snapshot, IngestStats};
pub use model::{Metric, Resource, ResourceNode, ResourceType};
pub use shared::SharedInventory;
pub use traversal::TreeLimits;

use crate::error::Result;

/// Main trait for inventory storage
pub trait InventoryStore {
    // === WRITE OPERATIONS ===

    /// Upsert a resource by ID (no referential checks)
    fn add_resource(&mut self, resource: Resource);

    /// Upsert a resource type by ID
    fn add_resource_type(&mut self, resource_type: ResourceType);

    /// Upsert a metric by ID
    fn add_metric(&mut self, metric: Metric);

    /// Rebuild the adjacency, type and top-level indexes.
    /// Index-backed reads are only consistent after this call.
    fn reindex(&mut self);

    // === READ OPERATIONS ===

    fn get_resource(&self, id: &str) -> Option<Resource>;

    /// Resources without a parent, in insertion order
    fn get_all_top_resources(&self) -> Vec<Resource>;

    /// Resources of the given type, in insertion order
    fn get_resources_by_type(&self, type_id: &str) -> Vec<Resource>;

    fn get_all_resource_types(&self) -> Vec<ResourceType>;

    fn get_resource_type(&self, id: &str) -> Option<ResourceType>;

    /// None if the resource is unknown, Some(empty) if it has no metrics
    fn get_resource_metrics(&self, id: &str) -> Option<Vec<Metric>>;

    // === TRAVERSAL ===

    /// Materialize the subtree under `root_id`; None if the root is unknown.
    /// Fails with CycleDetected on corrupted parent/child links and with
    /// TreeLimitExceeded past `limits`.
    fn get_tree_limited(&self, root_id: &str, limits: TreeLimits) -> Result<Option<ResourceNode>>;

    /// [`get_tree_limited`](Self::get_tree_limited) with the default node budget
    fn get_tree(&self, root_id: &str) -> Result<Option<ResourceNode>> {
        self.get_tree_limited(root_id, TreeLimits::default())
    }
}
