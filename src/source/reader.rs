//! Inventory queries over a chunk source
//!
//! Each inventory series stores successive snapshots of one feed entity.
//! Only the newest snapshot of a series is considered.

use crate::chunk::{reconstruct_many, ChunkRecord};
use crate::error::Result;
use crate::snapshot::{metrics_of_type, Entity, SnapshotDocument};
use super::{ChunkSource, TagFilter};

fn feed_filter(feed_id: &str) -> Result<TagFilter> {
    TagFilter::new()
        .with_literal("module", "inventory")?
        .with_literal("feed", feed_id)
}

/// Reconstruct the newest snapshot of every series matching `filter`
///
/// Series without any data are skipped. The first reconstruction error aborts.
fn load_snapshots(source: &dyn ChunkSource, tenant: &str, filter: &TagFilter) -> Result<Vec<SnapshotDocument>> {
    let batches = source
        .find_series(tenant, filter)?
        .iter()
        .map(|series| source.fetch_chunks(tenant, &series.id))
        .collect::<Result<Vec<Vec<ChunkRecord>>>>()?;

    let mut docs = Vec::with_capacity(batches.len());
    for result in reconstruct_many(&batches) {
        if let Some(doc) = result? {
            docs.push(doc);
        }
    }

    tracing::debug!(
        "Loaded {} snapshots from {} series for tenant {:?}",
        docs.len(),
        batches.len(),
        tenant
    );
    Ok(docs)
}

/// Tenants that own at least one inventory series of `feed_id`
pub fn tenants_for_feed(source: &dyn ChunkSource, feed_id: &str) -> Result<Vec<String>> {
    let filter = feed_filter(feed_id)?;
    let mut result = Vec::new();
    for tenant in source.tenants()? {
        if !source.find_series(&tenant, &filter)?.is_empty() {
            result.push(tenant);
        }
    }
    Ok(result)
}

/// Metric type definitions published by a feed
pub fn metric_types(source: &dyn ChunkSource, tenant: &str, feed_id: &str) -> Result<Vec<Entity>> {
    let filter = feed_filter(feed_id)?.with_literal("type", "mt")?;
    Ok(load_snapshots(source, tenant, &filter)?
        .into_iter()
        .map(|doc| doc.structure.entity)
        .filter(|entity| matches!(entity, Entity::MetricType { .. }))
        .collect())
}

/// Metrics of type `metric_type_id` across the feed's resource snapshots
///
/// Resource series advertise the metric types they contain in their `mtypes`
/// tag as `|id|` items, which narrows the series to fetch.
pub fn metrics_for_type(
    source: &dyn ChunkSource,
    tenant: &str,
    feed_id: &str,
    metric_type_id: &str,
) -> Result<Vec<Entity>> {
    let filter = feed_filter(feed_id)?
        .with_literal("type", "r")?
        .with_substring("mtypes", &format!("|{}|", metric_type_id))?;

    let docs = load_snapshots(source, tenant, &filter)?;
    Ok(docs
        .iter()
        .flat_map(|doc| metrics_of_type(doc, metric_type_id).into_iter().cloned())
        .collect())
}

/// Every resource snapshot of a feed
pub fn resource_snapshots(source: &dyn ChunkSource, tenant: &str, feed_id: &str) -> Result<Vec<SnapshotDocument>> {
    let filter = feed_filter(feed_id)?.with_literal("type", "r")?;
    load_snapshots(source, tenant, &filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::split;
    use crate::error::InventoryError;
    use crate::snapshot::{MetricDataKind, MetricUnit, Properties, StructureNode};
    use crate::source::{MemoryChunkSource, SeriesDescriptor};

    fn inventory_series(id: &str, feed: &str, kind: &str) -> SeriesDescriptor {
        SeriesDescriptor::new(id)
            .with_tag("module", "inventory")
            .with_tag("feed", feed)
            .with_tag("type", kind)
    }

    fn metric_type_doc(id: &str) -> SnapshotDocument {
        SnapshotDocument::new(StructureNode::new(Entity::MetricType {
            id: id.into(),
            name: id.to_uppercase(),
            data_kind: MetricDataKind::Gauge,
            unit: MetricUnit::Bytes,
            collection_interval: 60,
            properties: Properties::new(),
        }))
    }

    fn server_doc(server: &str) -> SnapshotDocument {
        let root = StructureNode::new(Entity::resource(server, "Server"))
            .with_child(StructureNode::new(Entity::metric(format!("{}-heap", server), "Heap", "/t;t1/f;f1/mt;heap")))
            .with_child(StructureNode::new(Entity::metric(format!("{}-gc", server), "GC", "/t;t1/f;f1/mt;gc")));
        SnapshotDocument::from_structure(root)
    }

    /// t1/f1: two metric types and two servers (split across chunks); t2 has only f2
    fn make_source() -> MemoryChunkSource {
        let source = MemoryChunkSource::new();

        for (i, mt) in ["heap", "gc"].iter().enumerate() {
            let id = format!("mt-{}", mt);
            source.add_series("t1", inventory_series(&id, "f1", "mt"));
            source.push_records("t1", &id, split(&metric_type_doc(mt), 0, 100 + i as i64).unwrap());
        }

        for server in ["srv-a", "srv-b"] {
            let id = format!("r-{}", server);
            source.add_series("t1", inventory_series(&id, "f1", "r").with_tag("mtypes", "|heap||gc|"));
            source.push_records("t1", &id, split(&server_doc(server), 64, 1_000).unwrap());
        }

        source.add_series("t2", inventory_series("r-other", "f2", "r"));
        source.push_records("t2", "r-other", split(&server_doc("other"), 0, 5).unwrap());
        source
    }

    #[test]
    fn test_tenants_for_feed() {
        let source = make_source();
        assert_eq!(tenants_for_feed(&source, "f1").unwrap(), vec!["t1".to_string()]);
        assert_eq!(tenants_for_feed(&source, "f2").unwrap(), vec!["t2".to_string()]);
        assert!(tenants_for_feed(&source, "nada").unwrap().is_empty());
    }

    #[test]
    fn test_feed_id_with_filter_separators() {
        let source = make_source();
        source.add_series("t3", inventory_series("r-odd", "a,b:c", "r"));
        source.push_records("t3", "r-odd", split(&server_doc("odd"), 0, 7).unwrap());

        assert_eq!(tenants_for_feed(&source, "a,b:c").unwrap(), vec!["t3".to_string()]);
        assert!(tenants_for_feed(&source, "a").unwrap().is_empty());
        assert_eq!(resource_snapshots(&source, "t3", "a,b:c").unwrap().len(), 1);
    }

    #[test]
    fn test_metric_types() {
        let source = make_source();
        let types = metric_types(&source, "t1", "f1").unwrap();

        let ids: Vec<&str> = types.iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec!["heap", "gc"]);
    }

    #[test]
    fn test_metrics_for_type() {
        let source = make_source();
        let metrics = metrics_for_type(&source, "t1", "f1", "heap").unwrap();

        let ids: Vec<&str> = metrics.iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec!["srv-a-heap", "srv-b-heap"]);
        assert!(metrics_for_type(&source, "t1", "f1", "nada").unwrap().is_empty());
    }

    #[test]
    fn test_newest_snapshot_wins() {
        let source = make_source();
        let newer = SnapshotDocument::new(StructureNode::new(Entity::resource("srv-a", "Renamed")));
        source.push_records("t1", "r-srv-a", split(&newer, 0, 2_000).unwrap());

        let docs = resource_snapshots(&source, "t1", "f1").unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].root().name(), "Renamed");
    }

    #[test]
    fn test_broken_series_aborts_listing() {
        let source = make_source();
        // Master claims far more chunks than the series holds
        source.push_records(
            "t1",
            "r-srv-b",
            vec![ChunkRecord::new(5_000, vec![1, 2, 3]).with_tag("chunks", "500").with_tag("size", "1500")],
        );

        let err = resource_snapshots(&source, "t1", "f1").unwrap_err();
        assert!(matches!(err, InventoryError::IncompleteChunks { .. }));
    }
}
