//! Inventory change events forwarded to an alerting backend

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use serde::Serialize;
use crate::error::Result;
use crate::snapshot::path::resolve;
use crate::snapshot::{CanonicalPath, Entity, EntityKind, SnapshotDocument};

/// Tenant under which all events are recorded
pub const DEFAULT_TENANT: &str = "hawkular";

pub const CATEGORY_INVENTORY_CHANGE: &str = "Inventory Change";

/// Availability type whose changes are forwarded
pub const SERVER_AVAILABILITY: &str = "Server Availability";

/// Resource types that represent a managed server
pub const SERVER_TYPES: [&str; 5] = [
    "Domain Host",
    "Domain WildFly Server",
    "Domain WildFly Server Controller",
    "Host Controller",
    "WildFly Server",
];

const TAG_EVENT_TYPE: &str = "miq.event_type";
const TAG_RESOURCE_TYPE: &str = "miq.resource_type";
const EVENT_TYPE: &str = "hawkular_event";
const RESOURCE_TYPE_SERVER: &str = "MiddlewareServer";

/// Event as stored by the alerting backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub tenant_id: String,
    pub id: String,
    /// Creation time, ms since epoch
    pub ctime: i64,
    pub category: String,
    pub text: String,
    pub context: BTreeMap<String, String>,
    pub tags: BTreeMap<String, String>,
}

/// Destination for events
pub trait AlertSink: Send + Sync {
    fn has_event(&self, tenant_id: &str, event_id: &str) -> Result<bool>;

    fn add_events(&self, events: Vec<Event>) -> Result<()>;
}

/// Sink keeping events in memory, in arrival order
#[derive(Debug, Clone, Default)]
pub struct MemoryAlertSink {
    events: Arc<Mutex<Vec<Event>>>,
}

impl MemoryAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl AlertSink for MemoryAlertSink {
    fn has_event(&self, tenant_id: &str, event_id: &str) -> Result<bool> {
        let events = self.events.lock().unwrap_or_else(|p| p.into_inner());
        Ok(events.iter().any(|e| e.tenant_id == tenant_id && e.id == event_id))
    }

    fn add_events(&self, events: Vec<Event>) -> Result<()> {
        self.events.lock().unwrap_or_else(|p| p.into_inner()).extend(events);
        Ok(())
    }
}

/// Event to be sent, before id and time are assigned
#[derive(Debug, Clone, Default)]
pub struct EventDraft {
    /// Generated when None or empty
    pub id: Option<String>,
    pub feed_id: Option<String>,
    pub resource_id: Option<String>,
    pub category: String,
    pub text: String,
    pub miq_event_type: String,
    pub miq_resource_type: String,
    pub message: String,
}

/// Builds events from drafts and hands them to a sink
pub struct EventForwarder<S> {
    sink: S,
    tenant_id: String,
    counter: AtomicU64,
}

impl<S: AlertSink> EventForwarder<S> {
    pub fn new(sink: S) -> Self {
        Self::with_tenant(sink, DEFAULT_TENANT)
    }

    pub fn with_tenant(sink: S, tenant_id: impl Into<String>) -> Self {
        Self {
            sink,
            tenant_id: tenant_id.into(),
            counter: AtomicU64::new(0),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Send one event. With `check_exists`, an event whose id the sink
    /// already holds is skipped. Returns whether an event was sent.
    pub fn add_event(&self, draft: EventDraft, check_exists: bool) -> Result<bool> {
        let ctime = now_millis();
        let id = match draft.id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => self.generate_id(&draft, ctime),
        };

        if check_exists && self.sink.has_event(&self.tenant_id, &id)? {
            tracing::debug!("Event {:?} already exists, skipping", id);
            return Ok(false);
        }

        let mut context = BTreeMap::new();
        if let Some(feed_id) = draft.feed_id {
            context.insert("feed_id".to_string(), feed_id);
        }
        if let Some(resource_id) = draft.resource_id {
            context.insert("resource_id".to_string(), resource_id);
        }
        context.insert("message".to_string(), draft.message.clone());

        let mut tags = BTreeMap::new();
        tags.insert(TAG_EVENT_TYPE.to_string(), draft.miq_event_type);
        tags.insert(TAG_RESOURCE_TYPE.to_string(), draft.miq_resource_type);

        let event = Event {
            tenant_id: self.tenant_id.clone(),
            id,
            ctime,
            category: draft.category,
            text: draft.text,
            context,
            tags,
        };

        tracing::debug!("Forwarding message {:?} as event {:?}", draft.message, event.id);
        self.sink.add_events(vec![event])?;
        Ok(true)
    }

    fn generate_id(&self, draft: &EventDraft, ctime: i64) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        let mut hasher = blake3::Hasher::new();
        for part in [
            self.tenant_id.as_str(),
            draft.category.as_str(),
            draft.text.as_str(),
            draft.resource_id.as_deref().unwrap_or_default(),
        ] {
            hasher.update(part.as_bytes());
            hasher.update(&[0]);
        }
        hasher.update(&ctime.to_le_bytes());
        hasher.update(&seq.to_le_bytes());
        hasher.finalize().to_hex().as_str()[..32].to_string()
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

pub fn is_server_type(resource_type: &str) -> bool {
    SERVER_TYPES.contains(&resource_type)
}

/// Turns inventory notifications into server events
pub struct InventoryEvents<S> {
    forwarder: EventForwarder<S>,
}

impl<S: AlertSink> InventoryEvents<S> {
    pub fn new(sink: S) -> Self {
        Self { forwarder: EventForwarder::new(sink) }
    }

    pub fn forwarder(&self) -> &EventForwarder<S> {
        &self.forwarder
    }

    fn server_draft(path: &CanonicalPath, id: Option<String>, message: String) -> EventDraft {
        EventDraft {
            id,
            feed_id: path.feed_id().map(str::to_string),
            resource_id: path.resource_id().map(str::to_string),
            category: CATEGORY_INVENTORY_CHANGE.to_string(),
            text: message.clone(),
            miq_event_type: EVENT_TYPE.to_string(),
            miq_resource_type: RESOURCE_TYPE_SERVER.to_string(),
            message,
        }
    }

    /// A resource appeared. Server types produce one event per path, ever.
    pub fn handle_resource_added(&self, resource_type: &str, resource_path: &str) -> Result<bool> {
        let path = CanonicalPath::parse(resource_path)?;
        if !is_server_type(resource_type) {
            return Ok(false);
        }

        let id = format!("RESOURCE_ADDED_{}", path);
        let draft = Self::server_draft(&path, Some(id), format!("Added: {}", resource_type));
        self.forwarder.add_event(draft, true)
    }

    /// Availability changed. Only server availability is forwarded, every time.
    pub fn handle_avail_change(&self, resource_path: &str, avail_type: &str, new_avail: &str) -> Result<bool> {
        let path = CanonicalPath::parse(resource_path)?;
        if avail_type != SERVER_AVAILABILITY {
            return Ok(false);
        }

        let message = format!("Avail change [{}]: {}", new_avail, avail_type);
        self.forwarder.add_event(Self::server_draft(&path, None, message), false)
    }

    /// Emit resource-added events for the server resources of a snapshot
    ///
    /// `feed_path` is the canonical path of the feed that published `doc`
    /// (e.g. `/t;t1/f;f1`). Returns the number of events sent.
    pub fn handle_snapshot(&self, doc: &SnapshotDocument, feed_path: &str) -> Result<usize> {
        let feed = CanonicalPath::parse(feed_path)?;
        let base = match doc.root() {
            Entity::Resource { id, .. } => feed.child(EntityKind::Resource, id),
            _ => feed,
        };

        let mut sent = 0;
        for (type_id, rel_paths) in &doc.resource_types_index {
            if !is_server_type(type_id) {
                continue;
            }
            for rel_path in rel_paths {
                let is_resource = resolve(&doc.structure, rel_path)
                    .map_or(false, |n| matches!(n.entity, Entity::Resource { .. }));
                if !is_resource {
                    continue;
                }
                let path = base.join(rel_path)?;
                if self.handle_resource_added(type_id, &path.to_string())? {
                    sent += 1;
                }
            }
        }
        Ok(sent)
    }
}
