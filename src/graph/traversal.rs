//! Tree materialization over the adjacency index

use std::collections::HashSet;
use crate::error::{InventoryError, Result};
use super::model::{Resource, ResourceNode};

/// Bounds on a materialized tree
///
/// Shared descendants are rendered once per path that reaches them, so a
/// stack of diamonds grows exponentially with depth. `max_nodes` caps that.
/// `max_depth` protects consumers that walk the result recursively, such as
/// the wire serializers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeLimits {
    pub max_depth: usize,
    pub max_nodes: usize,
}

impl TreeLimits {
    pub const DEFAULT_MAX_NODES: usize = 1_000_000;
    pub const WIRE_MAX_DEPTH: usize = 256;

    pub fn unlimited() -> Self {
        Self { max_depth: usize::MAX, max_nodes: usize::MAX }
    }

    /// Limits for trees that are serialized to clients
    pub fn wire() -> Self {
        Self { max_depth: Self::WIRE_MAX_DEPTH, ..Self::default() }
    }
}

impl Default for TreeLimits {
    fn default() -> Self {
        Self { max_depth: usize::MAX, max_nodes: Self::DEFAULT_MAX_NODES }
    }
}

struct Frame {
    node: ResourceNode,
    children: Vec<String>,
    next: usize,
}

/// Depth-first expansion from `root_id` with cycle detection
///
/// `get_resource` resolves ids, `children_of` yields child ids in display
/// order. Child ids that resolve to nothing are skipped. Revisiting an id
/// that is already on the current root-to-node path aborts the whole
/// operation with CycleDetected; shared descendants reached through
/// different parents are rendered under each of them. Growing past
/// `limits` aborts with TreeLimitExceeded.
///
/// Uses an explicit stack, so depth is bounded by memory, not the call stack.
pub fn build_tree<R, C>(
    root_id: &str,
    limits: TreeLimits,
    mut get_resource: R,
    mut children_of: C,
) -> Result<Option<ResourceNode>>
where
    R: FnMut(&str) -> Option<Resource>,
    C: FnMut(&str) -> Vec<String>,
{
    let Some(root) = get_resource(root_id) else {
        return Ok(None);
    };

    let exceeded = |what: &'static str, limit: usize| {
        tracing::warn!("Tree under {:?} exceeds the {} limit of {}", root_id, what, limit);
        InventoryError::TreeLimitExceeded { root: root_id.to_string(), what, limit }
    };

    let mut ancestors: HashSet<String> = HashSet::new();
    ancestors.insert(root.id.clone());
    let mut stack = vec![Frame {
        children: children_of(&root.id),
        node: ResourceNode::leaf(&root),
        next: 0,
    }];
    let mut nodes = 1;

    loop {
        let Some(top) = stack.last_mut() else {
            // The root frame always returns below before the stack empties
            return Ok(None);
        };

        if top.next < top.children.len() {
            let child_id = top.children[top.next].clone();
            top.next += 1;

            if ancestors.contains(&child_id) {
                let mut path: Vec<String> = stack.iter().map(|f| f.node.id.clone()).collect();
                path.push(child_id.clone());
                tracing::warn!("Cycle detected under {:?}: {}", root_id, path.join(" -> "));
                return Err(InventoryError::CycleDetected { id: child_id, path });
            }

            match get_resource(&child_id) {
                Some(child) => {
                    if stack.len() >= limits.max_depth {
                        return Err(exceeded("depth", limits.max_depth));
                    }
                    if nodes >= limits.max_nodes {
                        return Err(exceeded("node", limits.max_nodes));
                    }
                    nodes += 1;
                    ancestors.insert(child.id.clone());
                    stack.push(Frame {
                        children: children_of(&child.id),
                        node: ResourceNode::leaf(&child),
                        next: 0,
                    });
                }
                None => {
                    tracing::debug!("Skipping unknown child {:?} of {:?}", child_id, top.node.id);
                }
            }
            continue;
        }

        // All children expanded: attach to parent or finish
        let Some(done) = stack.pop() else {
            return Ok(None);
        };
        ancestors.remove(&done.node.id);
        match stack.last_mut() {
            Some(parent) => parent.node.children.push(done.node),
            None => return Ok(Some(done.node)),
        }
    }
}
