//! In-memory inventory graph with an explicitly rebuilt adjacency index

use std::collections::{HashMap, HashSet};
use std::time::Instant;
use serde::Serialize;
use crate::error::Result;
use super::model::{Metric, Resource, ResourceNode, ResourceType};
use super::traversal::{self, TreeLimits};
use super::InventoryStore;

/// Entity counts, for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub resources: usize,
    pub resource_types: usize,
    pub metrics: usize,
    pub top_level: usize,
    /// Writes since the last reindex
    pub pending_writes: usize,
}

/// Collection keyed by ID that remembers first-insertion order
#[derive(Debug)]
struct Ordered<T> {
    items: HashMap<String, T>,
    order: Vec<String>,
}

impl<T> Default for Ordered<T> {
    fn default() -> Self {
        Self { items: HashMap::new(), order: Vec::new() }
    }
}

impl<T: Clone> Ordered<T> {
    /// Last write wins; an overwritten ID keeps its original position
    fn upsert(&mut self, id: String, item: T) {
        if self.items.insert(id.clone(), item).is_none() {
            self.order.push(id);
        }
    }

    fn get(&self, id: &str) -> Option<&T> {
        self.items.get(id)
    }

    fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.order.iter().filter_map(move |id| self.items.get(id))
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// Main inventory graph
///
/// Writes are cheap upserts. The adjacency (parent -> children and its
/// inverse), the by-type index and the top-level list are derived data and
/// are only rebuilt by `reindex`, a full O(resources + links) pass.
#[derive(Debug, Default)]
pub struct InventoryGraph {
    resources: Ordered<Resource>,
    resource_types: Ordered<ResourceType>,
    metrics: Ordered<Metric>,

    // Adjacency list (parent -> children, display order)
    adjacency: HashMap<String, Vec<String>>,

    // Reverse adjacency list (child -> parents)
    reverse_adjacency: HashMap<String, Vec<String>>,

    // type_id -> resource IDs, insertion order
    by_type: HashMap<String, Vec<String>>,

    top_level: Vec<String>,

    // Writes since last reindex
    pending_writes: usize,
}

impl InventoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_metric(&self, id: &str) -> Option<Metric> {
        self.metrics.get(id).cloned()
    }

    /// Parents that list `id` as a child (normally one)
    pub fn parents_of(&self, id: &str) -> Vec<String> {
        self.reverse_adjacency.get(id).cloned().unwrap_or_default()
    }

    /// Children of `id` according to the last reindex
    pub fn children_of(&self, id: &str) -> Vec<String> {
        self.adjacency.get(id).cloned().unwrap_or_default()
    }

    /// True when writes happened after the last reindex
    pub fn is_dirty(&self) -> bool {
        self.pending_writes > 0
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            resources: self.resources.len(),
            resource_types: self.resource_types.len(),
            metrics: self.metrics.len(),
            top_level: self.top_level.len(),
            pending_writes: self.pending_writes,
        }
    }

    fn collect_resources(&self, ids: Option<&Vec<String>>) -> Vec<Resource> {
        ids.map(|ids| {
            ids.iter()
                .filter_map(|id| self.resources.get(id).cloned())
                .collect()
        })
        .unwrap_or_default()
    }
}

impl InventoryStore for InventoryGraph {
    fn add_resource(&mut self, resource: Resource) {
        self.resources.upsert(resource.id.clone(), resource);
        self.pending_writes += 1;
    }

    fn add_resource_type(&mut self, resource_type: ResourceType) {
        self.resource_types.upsert(resource_type.id.clone(), resource_type);
        self.pending_writes += 1;
    }

    fn add_metric(&mut self, metric: Metric) {
        self.metrics.upsert(metric.id.clone(), metric);
        self.pending_writes += 1;
    }

    /// Children of a resource are its declared `child_ids` in order, followed
    /// by any other resource whose `parent_id` names it, in insertion order.
    fn reindex(&mut self) {
        let start = Instant::now();
        let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
        let mut reverse_adjacency: HashMap<String, Vec<String>> = HashMap::new();
        let mut by_type: HashMap<String, Vec<String>> = HashMap::new();
        let mut top_level = Vec::new();

        for resource in self.resources.iter() {
            let children = adjacency.entry(resource.id.clone()).or_default();
            for child in &resource.child_ids {
                if !children.contains(child) {
                    children.push(child.clone());
                }
            }

            by_type
                .entry(resource.type_id.clone())
                .or_default()
                .push(resource.id.clone());

            if resource.is_top_level() {
                top_level.push(resource.id.clone());
            }
        }

        for resource in self.resources.iter() {
            if let Some(parent_id) = &resource.parent_id {
                let children = adjacency.entry(parent_id.clone()).or_default();
                if !children.contains(&resource.id) {
                    children.push(resource.id.clone());
                }
            }
        }

        for (parent, children) in &adjacency {
            let mut seen = HashSet::new();
            for child in children {
                if seen.insert(child) {
                    reverse_adjacency
                        .entry(child.clone())
                        .or_default()
                        .push(parent.clone());
                }
            }
        }
        // HashMap iteration order is arbitrary; keep parents deterministic
        for parents in reverse_adjacency.values_mut() {
            parents.sort_by_key(|p| self.resources.order.iter().position(|id| id == p));
        }

        self.adjacency = adjacency;
        self.reverse_adjacency = reverse_adjacency;
        self.by_type = by_type;
        self.top_level = top_level;

        tracing::debug!(
            "Reindexed {} resources ({} top-level, {} writes applied) in {:?}",
            self.resources.len(),
            self.top_level.len(),
            self.pending_writes,
            start.elapsed()
        );
        self.pending_writes = 0;
    }

    fn get_resource(&self, id: &str) -> Option<Resource> {
        self.resources.get(id).cloned()
    }

    fn get_all_top_resources(&self) -> Vec<Resource> {
        self.collect_resources(Some(&self.top_level))
    }

    fn get_resources_by_type(&self, type_id: &str) -> Vec<Resource> {
        self.collect_resources(self.by_type.get(type_id))
    }

    fn get_all_resource_types(&self) -> Vec<ResourceType> {
        self.resource_types.iter().cloned().collect()
    }

    fn get_resource_type(&self, id: &str) -> Option<ResourceType> {
        self.resource_types.get(id).cloned()
    }

    fn get_resource_metrics(&self, id: &str) -> Option<Vec<Metric>> {
        let resource = self.resources.get(id)?;
        let metrics = resource
            .metric_ids
            .iter()
            .filter_map(|metric_id| {
                let metric = self.metrics.get(metric_id).cloned();
                if metric.is_none() {
                    tracing::debug!("Resource {:?} references unknown metric {:?}", id, metric_id);
                }
                metric
            })
            .collect();
        Some(metrics)
    }

    fn get_tree_limited(&self, root_id: &str, limits: TreeLimits) -> Result<Option<ResourceNode>> {
        traversal::build_tree(
            root_id,
            limits,
            |id| self.get_resource(id),
            |id| self.children_of(id),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InventoryError;
    use crate::snapshot::{MetricUnit, Operation};

    /// EAP-1 (child-1, child-2), EAP-2 (child-3, child-4); children typed FOO/BAR
    fn make_test_graph() -> InventoryGraph {
        let mut graph = InventoryGraph::new();

        graph.add_resource(Resource::new("EAP-1", "EAP-1", "EAP")
            .parent("")
            .children(["child-1", "child-2"])
            .metrics(["m-1", "m-2"]));
        graph.add_resource(Resource::new("EAP-2", "EAP-2", "EAP")
            .parent("")
            .children(["child-3", "child-4"])
            .metrics(["m-3", "m-4"]));
        graph.add_resource(Resource::new("child-1", "Child 1", "FOO").parent("EAP-1"));
        graph.add_resource(Resource::new("child-2", "Child 2", "BAR").parent("EAP-1"));
        graph.add_resource(Resource::new("child-3", "Child 3", "FOO").parent("EAP-2"));
        graph.add_resource(Resource::new("child-4", "Child 4", "BAR").parent("EAP-2"));

        graph.add_resource_type(ResourceType::new(
            "EAP",
            vec![Operation::new("Reload"), Operation::new("Shutdown")],
        ));

        graph.add_metric(Metric::new("m-1", "memory", "Memory", MetricUnit::Bytes, 10));
        graph.add_metric(Metric::new("m-2", "gc", "GC", MetricUnit::None, 10));
        graph.add_metric(Metric::new("m-3", "memory", "Memory", MetricUnit::Bytes, 10));
        graph.add_metric(Metric::new("m-4", "gc", "GC", MetricUnit::None, 10));

        graph.reindex();
        graph
    }

    fn resource_ids(resources: &[Resource]) -> Vec<&str> {
        resources.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_find_resources_by_id() {
        let graph = make_test_graph();

        assert_eq!(graph.get_resource("EAP-1").unwrap().name, "EAP-1");
        assert_eq!(graph.get_resource("EAP-2").unwrap().name, "EAP-2");
        assert_eq!(graph.get_resource("child-1").unwrap().name, "Child 1");
        assert!(graph.get_resource("nada").is_none());
    }

    #[test]
    fn test_top_resources() {
        let graph = make_test_graph();
        assert_eq!(resource_ids(&graph.get_all_top_resources()), vec!["EAP-1", "EAP-2"]);
    }

    #[test]
    fn test_resource_types() {
        let graph = make_test_graph();

        let types = graph.get_all_resource_types();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].id, "EAP");
        assert_eq!(graph.get_resource_type("EAP").unwrap().operations.len(), 2);
        assert!(graph.get_resource_type("nada").is_none());
    }

    #[test]
    fn test_resources_by_type() {
        let graph = make_test_graph();

        assert_eq!(resource_ids(&graph.get_resources_by_type("EAP")), vec!["EAP-1", "EAP-2"]);
        assert_eq!(resource_ids(&graph.get_resources_by_type("FOO")), vec!["child-1", "child-3"]);
        assert!(graph.get_resources_by_type("nada").is_empty());
    }

    #[test]
    fn test_tree_children() {
        let graph = make_test_graph();

        let tree = graph.get_tree("EAP-1").unwrap().unwrap();
        let ids: Vec<&str> = tree.children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["child-1", "child-2"]);
        assert!(tree.children.iter().all(|c| c.children.is_empty()));

        let leaf = graph.get_tree("child-1").unwrap().unwrap();
        assert!(leaf.children.is_empty());

        assert!(graph.get_tree("nada").unwrap().is_none());
    }

    #[test]
    fn test_resource_metrics() {
        let graph = make_test_graph();

        let metrics = graph.get_resource_metrics("EAP-1").unwrap();
        assert_eq!(metrics.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(), vec!["m-1", "m-2"]);

        assert_eq!(graph.get_resource_metrics("child-1"), Some(vec![]));
        assert_eq!(graph.get_resource_metrics("nada"), None);
    }

    #[test]
    fn test_resource_metrics_skip_unknown_ids() {
        let mut graph = make_test_graph();
        graph.add_resource(Resource::new("lonely", "Lonely", "FOO").metrics(["m-1", "ghost"]));

        let metrics = graph.get_resource_metrics("lonely").unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].id, "m-1");
    }

    #[test]
    fn test_fail_on_detected_cycle() {
        let mut graph = make_test_graph();
        graph.add_resource(Resource::new("CP", "CP", "FOO").parent("").children(["CC"]));
        graph.add_resource(Resource::new("CC", "CC", "BAR").parent("CP").children(["CP"]));
        graph.reindex();

        let err = graph.get_tree("CP").unwrap_err();
        assert!(matches!(err, InventoryError::CycleDetected { .. }));
        assert!(err.to_string().contains("Cycle detected"));

        // The rest of the graph still renders
        assert!(graph.get_tree("EAP-1").unwrap().is_some());
    }

    #[test]
    fn test_children_from_parent_links_only() {
        // No child_ids declared: adjacency comes from parent_id alone
        let mut graph = InventoryGraph::new();
        graph.add_resource(Resource::new("root", "Root", "T"));
        graph.add_resource(Resource::new("b", "B", "T").parent("root"));
        graph.add_resource(Resource::new("a", "A", "T").parent("root"));
        graph.reindex();

        let tree = graph.get_tree("root").unwrap().unwrap();
        let ids: Vec<&str> = tree.children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(graph.parents_of("a"), vec!["root".to_string()]);
    }

    #[test]
    fn test_declared_children_come_first() {
        let mut graph = InventoryGraph::new();
        graph.add_resource(Resource::new("late", "Late", "T").parent("root"));
        graph.add_resource(Resource::new("root", "Root", "T").children(["first", "late"]));
        graph.add_resource(Resource::new("first", "First", "T").parent("root"));
        graph.reindex();

        assert_eq!(graph.children_of("root"), vec!["first".to_string(), "late".to_string()]);
    }

    #[test]
    fn test_upsert_keeps_position() {
        let mut graph = make_test_graph();
        graph.add_resource(Resource::new("EAP-1", "EAP-1 renamed", "EAP").children(["child-1"]));
        graph.reindex();

        let top = graph.get_all_top_resources();
        assert_eq!(resource_ids(&top), vec!["EAP-1", "EAP-2"]);
        assert_eq!(top[0].name, "EAP-1 renamed");
    }

    #[test]
    fn test_indexes_stale_until_reindex() {
        let mut graph = make_test_graph();
        graph.add_resource(Resource::new("EAP-3", "EAP-3", "EAP"));

        assert!(graph.is_dirty());
        assert_eq!(graph.get_resources_by_type("EAP").len(), 2);
        // Direct lookups do not depend on the index
        assert!(graph.get_resource("EAP-3").is_some());

        graph.reindex();
        assert!(!graph.is_dirty());
        assert_eq!(graph.get_resources_by_type("EAP").len(), 3);
        assert_eq!(graph.stats().top_level, 3);
    }

    #[test]
    fn test_insert_order_independence() {
        // Children inserted before their parent still link up after reindex
        let mut graph = InventoryGraph::new();
        graph.add_resource(Resource::new("kid", "Kid", "T").parent("mom"));
        graph.add_resource(Resource::new("mom", "Mom", "T"));
        graph.reindex();

        let tree = graph.get_tree("mom").unwrap().unwrap();
        assert_eq!(tree.children.len(), 1);
        assert_eq!(graph.get_all_top_resources().len(), 1);
    }

    #[test]
    fn test_deep_tree_drops_without_overflow() {
        let depth = 200_000;
        let mut graph = InventoryGraph::new();
        graph.add_resource(Resource::new("n0", "n", "T"));
        for i in 1..depth {
            graph.add_resource(Resource::new(format!("n{}", i), "n", "T").parent(format!("n{}", i - 1)));
        }
        graph.reindex();

        let tree = graph.get_tree("n0").unwrap().unwrap();
        assert_eq!(tree.count(), depth);
        drop(tree);

        let err = graph.get_tree_limited("n0", TreeLimits::wire()).unwrap_err();
        assert!(matches!(
            err,
            InventoryError::TreeLimitExceeded { what: "depth", limit: TreeLimits::WIRE_MAX_DEPTH, .. }
        ));
    }

    #[test]
    fn test_node_budget() {
        let graph = make_test_graph();
        let limits = TreeLimits { max_nodes: 2, ..TreeLimits::default() };

        let err = graph.get_tree_limited("EAP-1", limits).unwrap_err();
        assert!(matches!(err, InventoryError::TreeLimitExceeded { what: "node", limit: 2, .. }));
        assert!(graph.get_tree_limited("child-1", limits).unwrap().is_some());
    }
}
