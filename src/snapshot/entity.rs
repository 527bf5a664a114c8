//! Entities of the snapshot structure tree

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

/// Free-form properties attached to entities
pub type Properties = BTreeMap<String, serde_json::Value>;

/// Unit of a metric value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricUnit {
    #[default]
    None,
    Percentage,
    Bytes,
    Kilobytes,
    Megabytes,
    Gigabytes,
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
    PerSecond,
    PerMinute,
}

/// Kind of data a metric type produces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricDataKind {
    #[default]
    Gauge,
    Counter,
    Availability,
    String,
    GaugeRate,
    CounterRate,
}

/// Operation that can be invoked on resources of a type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub parameters: Properties,
}

impl Operation {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), parameters: Properties::new() }
    }
}

/// Node payload in the structure tree
///
/// Ids are only unique among siblings of the same kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Entity {
    #[serde(rename_all = "camelCase")]
    ResourceType {
        id: String,
        name: String,
        #[serde(default)]
        operations: Vec<Operation>,
        #[serde(default)]
        properties: Properties,
    },
    #[serde(rename_all = "camelCase")]
    MetricType {
        id: String,
        name: String,
        data_kind: MetricDataKind,
        #[serde(default)]
        unit: MetricUnit,
        /// Seconds
        #[serde(default)]
        collection_interval: u64,
        #[serde(default)]
        properties: Properties,
    },
    #[serde(rename_all = "camelCase")]
    Resource {
        id: String,
        name: String,
        /// Canonical path of the resource type, e.g. `/t;t1/f;feed/rt;WildFly Server`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        resource_type_path: Option<String>,
        #[serde(default)]
        properties: Properties,
    },
    #[serde(rename_all = "camelCase")]
    Metric {
        id: String,
        name: String,
        /// Canonical path of the metric type, e.g. `/t;t1/f;feed/mt;heap`
        metric_type_path: String,
        #[serde(default)]
        properties: Properties,
    },
}

impl Entity {
    pub fn id(&self) -> &str {
        match self {
            Entity::ResourceType { id, .. }
            | Entity::MetricType { id, .. }
            | Entity::Resource { id, .. }
            | Entity::Metric { id, .. } => id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Entity::ResourceType { name, .. }
            | Entity::MetricType { name, .. }
            | Entity::Resource { name, .. }
            | Entity::Metric { name, .. } => name,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::ResourceType { .. } => EntityKind::ResourceType,
            Entity::MetricType { .. } => EntityKind::MetricType,
            Entity::Resource { .. } => EntityKind::Resource,
            Entity::Metric { .. } => EntityKind::Metric,
        }
    }

    pub fn resource(id: impl Into<String>, name: impl Into<String>) -> Self {
        Entity::Resource {
            id: id.into(),
            name: name.into(),
            resource_type_path: None,
            properties: Properties::new(),
        }
    }

    pub fn metric(
        id: impl Into<String>,
        name: impl Into<String>,
        metric_type_path: impl Into<String>,
    ) -> Self {
        Entity::Metric {
            id: id.into(),
            name: name.into(),
            metric_type_path: metric_type_path.into(),
            properties: Properties::new(),
        }
    }
}

/// Discriminant of [`Entity`], also the segment code in relative paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    ResourceType,
    MetricType,
    Resource,
    Metric,
}

impl EntityKind {
    pub fn code(self) -> &'static str {
        match self {
            EntityKind::ResourceType => "rt",
            EntityKind::MetricType => "mt",
            EntityKind::Resource => "r",
            EntityKind::Metric => "m",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "rt" => Some(EntityKind::ResourceType),
            "mt" => Some(EntityKind::MetricType),
            "r" => Some(EntityKind::Resource),
            "m" => Some(EntityKind::Metric),
            _ => None,
        }
    }
}

/// Tree node: an entity plus its children, in insertion order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureNode {
    pub entity: Entity,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<StructureNode>,
}

impl StructureNode {
    pub fn new(entity: Entity) -> Self {
        Self { entity, children: Vec::new() }
    }

    pub fn with_child(mut self, child: StructureNode) -> Self {
        self.children.push(child);
        self
    }

    /// Direct child of the given kind and id
    pub fn child(&self, kind: EntityKind, id: &str) -> Option<&StructureNode> {
        self.children
            .iter()
            .find(|c| c.entity.kind() == kind && c.entity.id() == id)
    }
}
