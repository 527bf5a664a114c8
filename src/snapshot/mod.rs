//! Snapshot document: a structure tree plus type indices

pub mod entity;
pub mod path;

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

pub use entity::{
    Entity, EntityKind, MetricDataKind, MetricUnit, Operation, Properties, StructureNode,
};
pub use path::CanonicalPath;

/// type id -> relative paths of the entities of that type, in index order
pub type TypeIndex = BTreeMap<String, Vec<String>>;

/// Reconstructed inventory snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDocument {
    pub structure: StructureNode,
    #[serde(default)]
    pub resource_types_index: TypeIndex,
    #[serde(default)]
    pub metric_types_index: TypeIndex,
}

impl SnapshotDocument {
    /// Document with empty indices
    pub fn new(structure: StructureNode) -> Self {
        Self {
            structure,
            resource_types_index: TypeIndex::new(),
            metric_types_index: TypeIndex::new(),
        }
    }

    /// Document with both indices derived from the tree
    pub fn from_structure(structure: StructureNode) -> Self {
        let mut doc = Self::new(structure);
        let mut resource_types = TypeIndex::new();
        let mut metric_types = TypeIndex::new();

        let mut stack: Vec<(&StructureNode, String)> = vec![(&doc.structure, String::new())];
        while let Some((node, rel_path)) = stack.pop() {
            match &node.entity {
                Entity::Resource { resource_type_path: Some(type_path), .. } => {
                    if let Some(type_id) = path::last_id(type_path) {
                        push_unique(&mut resource_types, &type_id, &rel_path);
                    }
                }
                Entity::Metric { metric_type_path, .. } => {
                    if let Some(type_id) = path::last_id(metric_type_path) {
                        push_unique(&mut metric_types, &type_id, &rel_path);
                    }
                }
                Entity::Resource { resource_type_path: None, .. }
                | Entity::ResourceType { .. }
                | Entity::MetricType { .. } => {}
            }

            // Reverse so that siblings come off the stack in document order
            for child in node.children.iter().rev() {
                let segment = path::segment(child.entity.kind(), child.entity.id());
                let child_path = if rel_path.is_empty() {
                    segment
                } else {
                    format!("{}/{}", rel_path, segment)
                };
                stack.push((child, child_path));
            }
        }

        doc.resource_types_index = resource_types;
        doc.metric_types_index = metric_types;
        doc
    }

    pub fn root(&self) -> &Entity {
        &self.structure.entity
    }

    /// Resolve a relative path against the structure
    pub fn get(&self, rel_path: &str) -> Option<&Entity> {
        path::resolve(&self.structure, rel_path).map(|n| &n.entity)
    }

    /// All MetricType entities in the tree, depth-first
    pub fn metric_types(&self) -> Vec<&Entity> {
        let mut result = Vec::new();
        let mut stack = vec![&self.structure];
        while let Some(node) = stack.pop() {
            if matches!(node.entity, Entity::MetricType { .. }) {
                result.push(&node.entity);
            }
            stack.extend(node.children.iter().rev());
        }
        result
    }

    /// Index entries that do not resolve to a node of the expected kind
    pub fn dangling_paths(&self) -> Vec<String> {
        let mut dangling = Vec::new();
        for (index, kind) in [
            (&self.resource_types_index, EntityKind::Resource),
            (&self.metric_types_index, EntityKind::Metric),
        ] {
            for paths in index.values() {
                for p in paths {
                    let ok = self.get(p).map_or(false, |e| e.kind() == kind);
                    if !ok {
                        dangling.push(p.clone());
                    }
                }
            }
        }
        dangling
    }
}

fn push_unique(index: &mut TypeIndex, type_id: &str, rel_path: &str) {
    let paths = index.entry(type_id.to_string()).or_default();
    if !paths.iter().any(|p| p == rel_path) {
        paths.push(rel_path.to_string());
    }
}

/// Metrics indexed under `type_id`, in index order
///
/// Index entries that do not resolve to a Metric node are skipped.
pub fn metrics_of_type<'a>(doc: &'a SnapshotDocument, type_id: &str) -> Vec<&'a Entity> {
    entities_of_type(doc, &doc.metric_types_index, type_id, EntityKind::Metric)
}

/// Resources indexed under `type_id`, in index order
pub fn resources_of_type<'a>(doc: &'a SnapshotDocument, type_id: &str) -> Vec<&'a Entity> {
    entities_of_type(doc, &doc.resource_types_index, type_id, EntityKind::Resource)
}

fn entities_of_type<'a>(
    doc: &'a SnapshotDocument,
    index: &'a TypeIndex,
    type_id: &str,
    kind: EntityKind,
) -> Vec<&'a Entity> {
    let Some(paths) = index.get(type_id) else {
        return Vec::new();
    };

    paths
        .iter()
        .filter_map(|p| doc.get(p))
        .filter(|e| e.kind() == kind)
        .collect()
}
