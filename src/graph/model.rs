//! Records held by the inventory graph

use serde::{Deserialize, Deserializer, Serialize};
use crate::snapshot::{MetricUnit, Operation, Properties};

/// Resource record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Globally unique ID
    pub id: String,

    pub name: String,

    /// Resource type ID (e.g., "EAP", "WildFly Server")
    pub type_id: String,

    /// None for top-level resources. An empty string on the wire reads as None.
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Declared children, in display order
    #[serde(default)]
    pub child_ids: Vec<String>,

    #[serde(default)]
    pub metric_ids: Vec<String>,

    #[serde(default)]
    pub properties: Properties,
}

impl Resource {
    pub fn new(id: impl Into<String>, name: impl Into<String>, type_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            type_id: type_id.into(),
            ..Self::default()
        }
    }

    pub fn parent(mut self, parent_id: impl Into<String>) -> Self {
        let parent_id = parent_id.into();
        self.parent_id = if parent_id.is_empty() { None } else { Some(parent_id) };
        self
    }

    pub fn children<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.child_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn metrics<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metric_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

/// Resource type record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceType {
    pub id: String,

    #[serde(default)]
    pub operations: Vec<Operation>,

    #[serde(default)]
    pub properties: Properties,
}

impl ResourceType {
    pub fn new(id: impl Into<String>, operations: Vec<Operation>) -> Self {
        Self {
            id: id.into(),
            operations,
            properties: Properties::new(),
        }
    }
}

/// Metric record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub id: String,

    /// Metric family name (e.g., "memory"), usually the metric type ID
    pub name: String,

    pub display_name: String,

    #[serde(default)]
    pub unit: MetricUnit,

    /// Seconds
    #[serde(default)]
    pub collection_interval: u64,

    #[serde(default)]
    pub properties: Properties,
}

impl Metric {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        display_name: impl Into<String>,
        unit: MetricUnit,
        collection_interval: u64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            display_name: display_name.into(),
            unit,
            collection_interval,
            properties: Properties::new(),
        }
    }
}

/// Materialized tree view; built on demand, never stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceNode {
    pub id: String,
    pub name: String,
    pub type_id: String,
    #[serde(default)]
    pub children: Vec<ResourceNode>,
}

impl ResourceNode {
    pub fn leaf(resource: &Resource) -> Self {
        Self {
            id: resource.id.clone(),
            name: resource.name.clone(),
            type_id: resource.type_id.clone(),
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, root included
    pub fn count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }
}

// Flattened so that arbitrarily deep trees drop without recursion
impl Drop for ResourceNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}
