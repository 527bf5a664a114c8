//! In-process chunk source, used by the server preload path and tests

use std::collections::BTreeMap;
use std::sync::RwLock;
use crate::chunk::ChunkRecord;
use crate::error::Result;
use super::{ChunkSource, SeriesDescriptor, TagFilter};

#[derive(Debug, Default)]
struct Series {
    descriptor: SeriesDescriptor,
    records: Vec<ChunkRecord>,
}

/// Tenants -> series, each series holding records newest first
#[derive(Debug, Default)]
pub struct MemoryChunkSource {
    tenants: RwLock<BTreeMap<String, Vec<Series>>>,
}

impl MemoryChunkSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a series (or replace its tags) for `tenant`
    pub fn add_series(&self, tenant: &str, descriptor: SeriesDescriptor) {
        let mut tenants = self.tenants.write().unwrap_or_else(|p| p.into_inner());
        let series = tenants.entry(tenant.to_string()).or_default();
        match series.iter_mut().find(|s| s.descriptor.id == descriptor.id) {
            Some(existing) => existing.descriptor.tags = descriptor.tags,
            None => series.push(Series { descriptor, records: Vec::new() }),
        }
    }

    /// Append records to a series, creating it untagged if needed
    pub fn push_records(&self, tenant: &str, series_id: &str, records: Vec<ChunkRecord>) {
        let mut tenants = self.tenants.write().unwrap_or_else(|p| p.into_inner());
        let series = tenants.entry(tenant.to_string()).or_default();
        let index = match series.iter().position(|s| s.descriptor.id == series_id) {
            Some(index) => index,
            None => {
                series.push(Series {
                    descriptor: SeriesDescriptor::new(series_id),
                    records: Vec::new(),
                });
                series.len() - 1
            }
        };

        let target = &mut series[index].records;
        target.extend(records);
        target.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    }
}

impl ChunkSource for MemoryChunkSource {
    fn tenants(&self) -> Result<Vec<String>> {
        let tenants = self.tenants.read().unwrap_or_else(|p| p.into_inner());
        Ok(tenants.keys().cloned().collect())
    }

    fn find_series(&self, tenant: &str, filter: &TagFilter) -> Result<Vec<SeriesDescriptor>> {
        let tenants = self.tenants.read().unwrap_or_else(|p| p.into_inner());
        Ok(tenants
            .get(tenant)
            .map(|series| {
                series
                    .iter()
                    .filter(|s| filter.matches(&s.descriptor.tags))
                    .map(|s| s.descriptor.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn fetch_chunks(&self, tenant: &str, series_id: &str) -> Result<Vec<ChunkRecord>> {
        let tenants = self.tenants.read().unwrap_or_else(|p| p.into_inner());
        Ok(tenants
            .get(tenant)
            .and_then(|series| series.iter().find(|s| s.descriptor.id == series_id))
            .map(|s| s.records.clone())
            .unwrap_or_default())
    }
}
