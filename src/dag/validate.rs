// src/dag/validate.rs

//! Structural checks for a built pipeline graph.

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::node::{NodeId, NodeKind};
use crate::dag::pipeline::Pipeline;
use crate::errors::{Result, TagflowError};
use crate::grouping::ensure_groupable;

impl Pipeline {
    /// Check the graph before running it:
    /// - every link endpoint exists and is not itself a link
    /// - links never cross an iterator boundary
    /// - every owned node is listed by its owner, and vice versa
    /// - iterator grouping filters are supported
    /// - no cycles, counting both links and iterator ownership
    pub fn validate(&self) -> Result<()> {
        validate_links(self)?;
        validate_ownership(self)?;
        validate_acyclic(self)?;
        Ok(())
    }
}

fn validate_links(pipeline: &Pipeline) -> Result<()> {
    let graph = pipeline.graph();
    for node in graph.nodes() {
        if let NodeKind::Link {
            source,
            destination,
        } = &node.kind
        {
            let src = graph.get(*source)?;
            let dst = graph.get(*destination)?;
            if src.is_link() || dst.is_link() {
                return Err(TagflowError::InvalidGraph(format!(
                    "link {} has a link as endpoint",
                    node.id
                )));
            }
            if src.owner != dst.owner {
                return Err(TagflowError::InvalidGraph(format!(
                    "link '{}' crosses an iterator boundary",
                    node.name
                )));
            }
        }
    }
    Ok(())
}

fn validate_ownership(pipeline: &Pipeline) -> Result<()> {
    let graph = pipeline.graph();
    for node in graph.nodes() {
        if let Some(owner) = node.owner {
            let o = graph.get(owner)?;
            if !o.children().contains(&node.id) {
                return Err(TagflowError::InvalidGraph(format!(
                    "node '{}' names '{}' as owner but is not one of its children",
                    node.name, o.name
                )));
            }
        }
        if let NodeKind::Iterator { iterate_on, children, .. } = &node.kind {
            ensure_groupable(iterate_on)?;
            for child in children {
                if graph.get(*child)?.owner != Some(node.id) {
                    return Err(TagflowError::InvalidGraph(format!(
                        "iterator '{}' lists {child} as child but does not own it",
                        node.name
                    )));
                }
            }
        }
    }
    Ok(())
}

fn validate_acyclic(pipeline: &Pipeline) -> Result<()> {
    // Edge direction: upstream -> downstream, and owner -> child.
    let graph = pipeline.graph();
    let mut g: DiGraphMap<NodeId, ()> = DiGraphMap::new();

    for node in graph.nodes().filter(|n| !n.is_link()) {
        g.add_node(node.id);
        for child in node.children() {
            g.add_edge(node.id, *child, ());
        }
    }
    for node in graph.nodes() {
        if let Some((source, destination)) = graph.link_endpoints(node.id) {
            g.add_edge(source, destination, ());
        }
    }

    match toposort(&g, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let id = cycle.node_id();
            let name = graph.node(id).map(|n| n.name.as_str()).unwrap_or("?");
            Err(TagflowError::DagCycle(format!(
                "cycle detected in pipeline involving node '{name}'"
            )))
        }
    }
}
