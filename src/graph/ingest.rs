//! Flatten a snapshot structure tree into graph records

use std::collections::HashMap;
use serde::Serialize;
use crate::snapshot::path::last_id;
use crate::snapshot::{Entity, MetricUnit, SnapshotDocument, StructureNode};
use super::engine::InventoryGraph;
use super::model::{Metric, Resource, ResourceType};
use super::InventoryStore;

/// What one snapshot contributed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestStats {
    pub resources: usize,
    pub resource_types: usize,
    pub metrics: usize,
}

/// Upsert every resource, resource type and metric of `doc` into `graph`
///
/// Entity ids are used as store ids unchanged, so a later snapshot with the
/// same ids overwrites earlier records. A resource's parent is its nearest
/// resource ancestor in the tree. The caller reindexes.
pub fn load_snapshot(graph: &mut InventoryGraph, doc: &SnapshotDocument) -> IngestStats {
    let mut metric_types: HashMap<&str, (MetricUnit, u64)> = HashMap::new();
    for entity in doc.metric_types() {
        if let Entity::MetricType { id, unit, collection_interval, .. } = entity {
            metric_types.insert(id.as_str(), (*unit, *collection_interval));
        }
    }

    let mut stats = IngestStats::default();
    // (node, nearest resource ancestor id)
    let mut stack: Vec<(&StructureNode, Option<&str>)> = vec![(&doc.structure, None)];

    while let Some((node, parent)) = stack.pop() {
        let mut next_parent = parent;

        match &node.entity {
            Entity::Resource { id, name, resource_type_path, properties } => {
                let type_id = resource_type_path
                    .as_deref()
                    .and_then(last_id)
                    .unwrap_or_default();

                let mut resource = Resource::new(id.as_str(), name.as_str(), type_id)
                    .parent(parent.unwrap_or_default())
                    .children(children_of_kind(node, |e| matches!(e, Entity::Resource { .. })))
                    .metrics(children_of_kind(node, |e| matches!(e, Entity::Metric { .. })));
                resource.properties = properties.clone();

                graph.add_resource(resource);
                stats.resources += 1;
                next_parent = Some(id.as_str());
            }
            Entity::ResourceType { id, operations, properties, .. } => {
                let mut resource_type = ResourceType::new(id.as_str(), operations.clone());
                resource_type.properties = properties.clone();

                graph.add_resource_type(resource_type);
                stats.resource_types += 1;
            }
            Entity::Metric { id, name, metric_type_path, properties } => {
                let type_id = last_id(metric_type_path).unwrap_or_default();
                let (unit, interval) = metric_types.get(type_id.as_ref()).copied().unwrap_or_default();

                let mut metric = Metric::new(id.as_str(), type_id.as_ref(), name.as_str(), unit, interval);
                metric.properties = properties.clone();

                graph.add_metric(metric);
                stats.metrics += 1;
            }
            Entity::MetricType { .. } => {}
        }

        for child in node.children.iter().rev() {
            stack.push((child, next_parent));
        }
    }

    tracing::debug!(
        "Loaded snapshot rooted at {:?}: {} resources, {} resource types, {} metrics",
        doc.root().id(),
        stats.resources,
        stats.resource_types,
        stats.metrics
    );

    stats
}

fn children_of_kind<F>(node: &StructureNode, pred: F) -> Vec<String>
where
    F: Fn(&Entity) -> bool,
{
    node.children
        .iter()
        .filter(|c| pred(&c.entity))
        .map(|c| c.entity.id().to_string())
        .collect()
}
