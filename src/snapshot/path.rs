//! Relative and canonical inventory paths
//!
//! Both forms are `/`-separated `code;id` segments. Relative paths (used as
//! index values) start at the structure root and never begin with `/`; the
//! empty relative path is the root itself. Canonical paths are absolute
//! (`/t;tenant/f;feed/r;server`) and may also carry tenant (`t`) and feed
//! (`f`) segments.

use std::borrow::Cow;
use std::fmt;
use crate::error::{InventoryError, Result};
use super::entity::{EntityKind, StructureNode};

const ESCAPE: char = '\\';

/// One `code;id` path element; `id` is kept unescaped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub code: String,
    pub id: String,
}

/// Escape an id for use inside a path: `/` becomes `\/`, `\` becomes `\\`
pub fn escape_id(id: &str) -> Cow<'_, str> {
    if !id.contains(['/', ESCAPE]) {
        return Cow::Borrowed(id);
    }
    let mut escaped = String::with_capacity(id.len() + 2);
    for c in id.chars() {
        if c == '/' || c == ESCAPE {
            escaped.push(ESCAPE);
        }
        escaped.push(c);
    }
    Cow::Owned(escaped)
}

fn unescape_id(raw: &str) -> Cow<'_, str> {
    if !raw.contains(ESCAPE) {
        return Cow::Borrowed(raw);
    }
    let mut id = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == ESCAPE {
            if let Some(next) = chars.next() {
                id.push(next);
                continue;
            }
        }
        id.push(c);
    }
    Cow::Owned(id)
}

/// `code;id` with the id escaped
pub fn segment(kind: EntityKind, id: &str) -> String {
    format!("{};{}", kind.code(), escape_id(id))
}

/// Split on `/` that is not preceded by the escape character
fn split_unescaped(path: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in path.char_indices() {
        if escaped {
            escaped = false;
        } else if c == ESCAPE {
            escaped = true;
        } else if c == '/' {
            parts.push(&path[start..i]);
            start = i + 1;
        }
    }
    parts.push(&path[start..]);
    parts
}

fn parse_segment(raw: &str) -> Option<Segment> {
    let (code, id) = raw.split_once(';')?;
    if code.is_empty() || id.is_empty() {
        return None;
    }
    Some(Segment { code: code.to_string(), id: unescape_id(id).into_owned() })
}

/// Resolve a relative path against a structure root
///
/// Returns None for unparseable paths as well as for paths that name no
/// node: index entries are advisory and callers skip what does not resolve.
pub fn resolve<'a>(root: &'a StructureNode, path: &str) -> Option<&'a StructureNode> {
    if path.is_empty() {
        return Some(root);
    }

    let mut current = root;
    for raw in split_unescaped(path) {
        let segment = parse_segment(raw)?;
        let kind = EntityKind::from_code(&segment.code)?;
        current = current.child(kind, &segment.id)?;
    }
    Some(current)
}

/// Id referenced by the last segment of a type path
///
/// `/t;t1/f;feed/mt;memory` -> `memory`. A bare id without any `;` is
/// returned unchanged, so plain type ids can be used as paths.
pub fn last_id(path: &str) -> Option<Cow<'_, str>> {
    let parts = split_unescaped(path);
    let last = *parts.iter().rev().find(|p| !p.is_empty())?;
    let id = match last.split_once(';') {
        Some((_, id)) => id,
        None => last,
    };
    if id.is_empty() {
        None
    } else {
        Some(unescape_id(id))
    }
}

/// Absolute path to an inventory entity, validated on parse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalPath {
    segments: Vec<Segment>,
}

impl CanonicalPath {
    pub fn parse(raw: &str) -> Result<Self> {
        let body = raw
            .strip_prefix('/')
            .ok_or_else(|| InventoryError::InvalidPath(format!("'{}' is not absolute", raw)))?;

        let mut segments = Vec::new();
        for part in split_unescaped(body) {
            let segment = parse_segment(part).ok_or_else(|| {
                InventoryError::InvalidPath(format!("bad segment '{}' in '{}'", part, raw))
            })?;
            segments.push(segment);
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Id of the first segment with the given code
    pub fn first(&self, code: &str) -> Option<&str> {
        self.segments
            .iter()
            .find(|s| s.code == code)
            .map(|s| s.id.as_str())
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.first("t")
    }

    pub fn feed_id(&self) -> Option<&str> {
        self.first("f")
    }

    /// Id of the innermost resource segment
    pub fn resource_id(&self) -> Option<&str> {
        self.segments
            .iter()
            .rev()
            .find(|s| s.code == "r")
            .map(|s| s.id.as_str())
    }

    /// Append a relative path (as found in snapshot indices)
    pub fn join(&self, relative: &str) -> Result<Self> {
        let mut segments = self.segments.clone();
        if !relative.is_empty() {
            for part in split_unescaped(relative) {
                let segment = parse_segment(part).ok_or_else(|| {
                    InventoryError::InvalidPath(format!("bad segment '{}' in '{}'", part, relative))
                })?;
                segments.push(segment);
            }
        }
        Ok(Self { segments })
    }

    /// Append one segment with an unescaped id
    pub fn child(&self, kind: EntityKind, id: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment { code: kind.code().to_string(), id: id.to_string() });
        Self { segments }
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{};{}", segment.code, escape_id(&segment.id))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::entity::Entity;

    fn sample_tree() -> StructureNode {
        // root
        //  ├─ r;child
        //  │    └─ m;heap
        //  └─ m;uptime
        StructureNode::new(Entity::resource("root", "Root"))
            .with_child(
                StructureNode::new(Entity::resource("child", "Child"))
                    .with_child(StructureNode::new(Entity::metric("heap", "Heap", "/mt;memory"))),
            )
            .with_child(StructureNode::new(Entity::metric("uptime", "Uptime", "/mt;time")))
    }

    #[test]
    fn test_resolve_root_and_nested() {
        let tree = sample_tree();

        assert_eq!(resolve(&tree, "").unwrap().entity.id(), "root");
        assert_eq!(resolve(&tree, "m;uptime").unwrap().entity.id(), "uptime");
        assert_eq!(resolve(&tree, "r;child/m;heap").unwrap().entity.id(), "heap");
    }

    #[test]
    fn test_resolve_misses() {
        let tree = sample_tree();

        assert!(resolve(&tree, "m;nothing").is_none());
        assert!(resolve(&tree, "r;heap").is_none(), "kind must match");
        assert!(resolve(&tree, "zz;child").is_none(), "unknown code");
        assert!(resolve(&tree, "garbage").is_none());
    }

    #[test]
    fn test_last_id() {
        assert_eq!(last_id("/t;t1/f;feed/mt;memory").as_deref(), Some("memory"));
        assert_eq!(last_id("mt;memory").as_deref(), Some("memory"));
        assert_eq!(last_id("memory").as_deref(), Some("memory"));
        assert_eq!(last_id("/t;t1/f;feed/mt;memory/").as_deref(), Some("memory"));
        assert_eq!(last_id(""), None);
        assert_eq!(last_id("/t;t1/mt;"), None);
        assert_eq!(last_id("/t;t1/rt;platform~\\/OS").as_deref(), Some("platform~/OS"));
    }

    #[test]
    fn test_escape_round_trip() {
        assert_eq!(escape_id("plain"), "plain");
        assert_eq!(escape_id("a/b"), "a\\/b");
        assert_eq!(escape_id("a\\b"), "a\\\\b");
        assert_eq!(segment(EntityKind::Resource, "platform~/OPERATING_SYSTEM=os"), "r;platform~\\/OPERATING_SYSTEM=os");
    }

    #[test]
    fn test_resolve_slash_in_id() {
        let tree = StructureNode::new(Entity::resource("feed", "Feed")).with_child(
            StructureNode::new(Entity::resource("platform~/OPERATING_SYSTEM=os", "OS"))
                .with_child(StructureNode::new(Entity::metric("cpu", "CPU", "/mt;cpuType"))),
        );

        let path = format!("{}/{}", segment(EntityKind::Resource, "platform~/OPERATING_SYSTEM=os"), segment(EntityKind::Metric, "cpu"));
        assert_eq!(resolve(&tree, &path).unwrap().entity.id(), "cpu");
        // Unescaped, the slash splits the id apart
        assert!(resolve(&tree, "r;platform~/OPERATING_SYSTEM=os/m;cpu").is_none());
    }

    #[test]
    fn test_canonical_path_with_slash_in_id() {
        let raw = "/t;t1/f;itest-feed/r;platform~\\/OPERATING_SYSTEM=itest-feed_OperatingSystem";
        let cp = CanonicalPath::parse(raw).unwrap();

        assert_eq!(cp.segments().len(), 3);
        assert_eq!(cp.resource_id(), Some("platform~/OPERATING_SYSTEM=itest-feed_OperatingSystem"));
        assert_eq!(cp.to_string(), raw);

        let feed = CanonicalPath::parse("/t;t1/f;itest-feed").unwrap();
        let child = feed.child(EntityKind::Resource, "platform~/OPERATING_SYSTEM=itest-feed_OperatingSystem");
        assert_eq!(child, cp);
        assert_eq!(feed.join("r;platform~\\/OPERATING_SYSTEM=itest-feed_OperatingSystem").unwrap(), cp);
    }

    #[test]
    fn test_canonical_path_parse_and_display() {
        let cp = CanonicalPath::parse("/t;hawkular/f;feed1/r;server/r;datasource").unwrap();

        assert_eq!(cp.tenant_id(), Some("hawkular"));
        assert_eq!(cp.feed_id(), Some("feed1"));
        assert_eq!(cp.resource_id(), Some("datasource"));
        assert_eq!(cp.to_string(), "/t;hawkular/f;feed1/r;server/r;datasource");
    }

    #[test]
    fn test_canonical_path_rejects_garbage() {
        assert!(matches!(CanonicalPath::parse("t;x/f;y"), Err(InventoryError::InvalidPath(_))));
        assert!(matches!(CanonicalPath::parse("/t;x//f;y"), Err(InventoryError::InvalidPath(_))));
        assert!(matches!(CanonicalPath::parse("/nosemicolon"), Err(InventoryError::InvalidPath(_))));
    }

    #[test]
    fn test_canonical_join() {
        let feed = CanonicalPath::parse("/t;hawkular/f;feed1").unwrap();
        let joined = feed.join("r;server/r;ds").unwrap();

        assert_eq!(joined.to_string(), "/t;hawkular/f;feed1/r;server/r;ds");
        assert_eq!(feed.join("").unwrap(), feed);
    }
}
