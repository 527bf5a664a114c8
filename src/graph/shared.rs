//! Thread-safe handle over one inventory graph
//!
//! Many readers or one writer. A write batch holds the write lock for the
//! whole batch and its reindex, so readers never observe half-applied
//! updates or stale adjacency.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use crate::error::Result;
use crate::snapshot::SnapshotDocument;
use super::engine::{InventoryGraph, StoreStats};
use super::ingest::{load_snapshot, IngestStats};
use super::model::{Metric, Resource, ResourceNode, ResourceType};
use super::traversal::TreeLimits;
use super::InventoryStore;

#[derive(Debug, Clone, Default)]
pub struct SharedInventory {
    inner: Arc<RwLock<InventoryGraph>>,
}

impl SharedInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_graph(graph: InventoryGraph) -> Self {
        Self { inner: Arc::new(RwLock::new(graph)) }
    }

    // Poisoned locks are taken over: a panicked writer leaves at worst stale indexes
    fn read(&self) -> RwLockReadGuard<'_, InventoryGraph> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, InventoryGraph> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply `f` and reindex under a single write lock
    pub fn write_batch<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut InventoryGraph) -> T,
    {
        let mut graph = self.write();
        let result = f(&mut graph);
        graph.reindex();
        result
    }

    /// Run `f` against a consistent view
    pub fn with_read<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&InventoryGraph) -> T,
    {
        f(&self.read())
    }

    pub fn add_resources(&self, resources: Vec<Resource>) -> usize {
        self.write_batch(|graph| {
            let count = resources.len();
            for resource in resources {
                graph.add_resource(resource);
            }
            count
        })
    }

    pub fn add_resource_types(&self, resource_types: Vec<ResourceType>) -> usize {
        self.write_batch(|graph| {
            let count = resource_types.len();
            for resource_type in resource_types {
                graph.add_resource_type(resource_type);
            }
            count
        })
    }

    pub fn add_metrics(&self, metrics: Vec<Metric>) -> usize {
        self.write_batch(|graph| {
            let count = metrics.len();
            for metric in metrics {
                graph.add_metric(metric);
            }
            count
        })
    }

    pub fn reindex(&self) {
        self.write().reindex();
    }

    /// Flatten a snapshot into the graph as one batch
    pub fn ingest(&self, doc: &SnapshotDocument) -> IngestStats {
        self.write_batch(|graph| load_snapshot(graph, doc))
    }

    pub fn get_resource(&self, id: &str) -> Option<Resource> {
        self.read().get_resource(id)
    }

    pub fn get_all_top_resources(&self) -> Vec<Resource> {
        self.read().get_all_top_resources()
    }

    pub fn get_resources_by_type(&self, type_id: &str) -> Vec<Resource> {
        self.read().get_resources_by_type(type_id)
    }

    pub fn get_all_resource_types(&self) -> Vec<ResourceType> {
        self.read().get_all_resource_types()
    }

    pub fn get_resource_type(&self, id: &str) -> Option<ResourceType> {
        self.read().get_resource_type(id)
    }

    pub fn get_resource_metrics(&self, id: &str) -> Option<Vec<Metric>> {
        self.read().get_resource_metrics(id)
    }

    pub fn get_tree(&self, root_id: &str) -> Result<Option<ResourceNode>> {
        self.read().get_tree(root_id)
    }

    pub fn get_tree_limited(&self, root_id: &str, limits: TreeLimits) -> Result<Option<ResourceNode>> {
        self.read().get_tree_limited(root_id, limits)
    }

    pub fn stats(&self) -> StoreStats {
        self.read().stats()
    }
}
