// src/dag/graph.rs

use std::collections::BTreeMap;

use crate::dag::node::{Node, NodeId, NodeKind};
use crate::errors::{Result, TagflowError};

/// Flat map of every node in a pipeline, links included.
///
/// Topology is not stored separately: upstream and downstream neighbours are
/// derived from the `Link` nodes registered on each endpoint.
#[derive(Debug, Default)]
pub struct DagGraph {
    nodes: BTreeMap<NodeId, Node>,
    next_id: usize,
}

impl DagGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, Node::new(id, name, kind));
        id
    }

    /// Create a link node from `source` to `destination` and register it on
    /// both endpoints.
    ///
    /// Both endpoints must exist, must not be links themselves, and must be
    /// scheduled by the same owner (both top-level, or children of the same
    /// iterator).
    pub fn add_link(&mut self, source: NodeId, destination: NodeId) -> Result<NodeId> {
        let src = self.get(source)?;
        let dst = self.get(destination)?;

        if src.is_link() || dst.is_link() {
            return Err(TagflowError::InvalidGraph(format!(
                "cannot link {source} -> {destination}: links cannot be endpoints"
            )));
        }
        if source == destination {
            return Err(TagflowError::InvalidGraph(format!(
                "node '{}' cannot be linked to itself",
                src.name
            )));
        }
        if src.owner != dst.owner {
            return Err(TagflowError::InvalidGraph(format!(
                "link '{}' -> '{}' crosses an iterator boundary",
                src.name, dst.name
            )));
        }

        let name = format!("{} -> {}", src.name, dst.name);
        let link = self.insert(
            name,
            NodeKind::Link {
                source,
                destination,
            },
        );
        self.get_mut(source)?.links.push(link);
        self.get_mut(destination)?.links.push(link);
        Ok(link)
    }

    pub fn get(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(&id).ok_or(TagflowError::NodeNotFound(id))
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(&id).ok_or(TagflowError::NodeNotFound(id))
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// All nodes, links included, in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `(source, destination)` of a link node.
    pub fn link_endpoints(&self, link: NodeId) -> Option<(NodeId, NodeId)> {
        match self.nodes.get(&link).map(|n| &n.kind) {
            Some(NodeKind::Link {
                source,
                destination,
            }) => Some((*source, *destination)),
            _ => None,
        }
    }

    /// Immediate upstream nodes of `id` (sources of its incoming links).
    pub fn upstream_of(&self, id: NodeId) -> Vec<NodeId> {
        self.neighbours(id, |source, destination| (destination == id).then_some(source))
    }

    /// Immediate downstream nodes of `id` (destinations of its outgoing links).
    pub fn downstream_of(&self, id: NodeId) -> Vec<NodeId> {
        self.neighbours(id, |source, destination| (source == id).then_some(destination))
    }

    fn neighbours<F>(&self, id: NodeId, pick: F) -> Vec<NodeId>
    where
        F: Fn(NodeId, NodeId) -> Option<NodeId>,
    {
        let Some(node) = self.nodes.get(&id) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for link in &node.links {
            if let Some((source, destination)) = self.link_endpoints(*link) {
                if let Some(n) = pick(source, destination) {
                    if !out.contains(&n) {
                        out.push(n);
                    }
                }
            }
        }
        out
    }
}
