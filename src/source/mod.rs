//! Access to chunked snapshot series held by a time-series store

pub mod memory;
pub mod reader;

use std::collections::BTreeMap;
use regex_lite::Regex;
use crate::chunk::ChunkRecord;
use crate::error::{InventoryError, Result};

pub use memory::MemoryChunkSource;
pub use reader::{metric_types, metrics_for_type, resource_snapshots, tenants_for_feed};

/// A stored series: id plus its tags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesDescriptor {
    pub id: String,
    pub tags: BTreeMap<String, String>,
}

impl SeriesDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), tags: BTreeMap::new() }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// Read-only view of a store of chunked snapshot series
pub trait ChunkSource: Send + Sync {
    /// Known tenant ids
    fn tenants(&self) -> Result<Vec<String>>;

    /// Series of `tenant` whose tags satisfy `filter`
    fn find_series(&self, tenant: &str, filter: &TagFilter) -> Result<Vec<SeriesDescriptor>>;

    /// All records of a series, newest first
    fn fetch_chunks(&self, tenant: &str, series_id: &str) -> Result<Vec<ChunkRecord>>;
}

/// Conjunction of `key:regex` tag conditions
///
/// Parsed from `k1:v1,k2:v2` or built condition by condition. Each value is
/// a regular expression that must match the whole tag value; a missing tag
/// never matches.
#[derive(Debug, Clone, Default)]
pub struct TagFilter {
    conditions: Vec<(String, Regex)>,
}

impl TagFilter {
    /// Filter without conditions; matches every series
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let mut filter = Self::new();
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, pattern) = part.split_once(':').ok_or_else(|| {
                InventoryError::InvalidFilter(format!("'{}' is not key:value", part))
            })?;
            filter = filter.with_pattern(key, pattern)?;
        }
        Ok(filter)
    }

    /// Require `key` to match `pattern` as a whole
    pub fn with_pattern(mut self, key: impl Into<String>, pattern: &str) -> Result<Self> {
        let key = key.into();
        let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
            InventoryError::InvalidFilter(format!("bad pattern for '{}': {}", key, e))
        })?;
        self.conditions.push((key, regex));
        Ok(self)
    }

    /// Require `key` to equal `value` exactly
    pub fn with_literal(self, key: impl Into<String>, value: &str) -> Result<Self> {
        self.with_pattern(key, &Self::escape(value))
    }

    /// Require `key` to contain `value`
    pub fn with_substring(self, key: impl Into<String>, value: &str) -> Result<Self> {
        self.with_pattern(key, &format!(".*{}.*", Self::escape(value)))
    }

    /// Quote a literal for use inside a filter value
    pub fn escape(literal: &str) -> String {
        regex_lite::escape(literal)
    }

    pub fn matches(&self, tags: &BTreeMap<String, String>) -> bool {
        self.conditions.iter().all(|(key, regex)| {
            tags.get(key).map_or(false, |value| regex.is_match(value))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_filter_matches_all_conditions() {
        let filter = TagFilter::parse("module:inventory,feed:f1,type:r").unwrap();

        assert!(filter.matches(&tags(&[("module", "inventory"), ("feed", "f1"), ("type", "r")])));
        assert!(!filter.matches(&tags(&[("module", "inventory"), ("feed", "f1"), ("type", "mt")])));
        assert!(!filter.matches(&tags(&[("module", "inventory"), ("feed", "f1")])));
    }

    #[test]
    fn test_filter_value_is_anchored() {
        let filter = TagFilter::parse("feed:f1").unwrap();
        assert!(!filter.matches(&tags(&[("feed", "f10")])));
    }

    #[test]
    fn test_escaped_literal_inside_regex() {
        let raw = format!("mtypes:.*{}.*", TagFilter::escape("|WildFly Memory Metrics~Heap Used|"));
        let filter = TagFilter::parse(&raw).unwrap();

        assert!(filter.matches(&tags(&[("mtypes", "|a||WildFly Memory Metrics~Heap Used||b|")])));
        assert!(!filter.matches(&tags(&[("mtypes", "|WildFly Memory Metrics~Heap|")])));
    }

    #[test]
    fn test_built_filter_keeps_separators_literal() {
        let filter = TagFilter::new()
            .with_literal("feed", "a,b:c")
            .unwrap()
            .with_substring("mtypes", "|x,y:z|")
            .unwrap();

        assert!(filter.matches(&tags(&[("feed", "a,b:c"), ("mtypes", "|w||x,y:z|")])));
        assert!(!filter.matches(&tags(&[("feed", "a"), ("mtypes", "|x,y:z|")])));
        assert!(!filter.matches(&tags(&[("feed", "a,b:c"), ("mtypes", "|x|")])));
    }

    #[test]
    fn test_bad_filters() {
        assert!(matches!(TagFilter::parse("novalue"), Err(InventoryError::InvalidFilter(_))));
        assert!(matches!(TagFilter::parse("k:(unclosed"), Err(InventoryError::InvalidFilter(_))));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(TagFilter::parse("").unwrap().matches(&BTreeMap::new()));
    }
}
