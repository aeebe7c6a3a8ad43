//! Causal read→write graph over reconcile cycles.
//!
//! # Overview
//!
//! ```text
//! ReconcileGroups + VersionCatalog
//!        ↓  CausalGraph::build()
//! CausalGraph (petgraph DiGraph, node map, content hash)
//!        ↓  CausalGraph::to_view()
//! GraphView { nodes, edges }   (handed to a renderer)
//! ```
//!
//! ## Nodes
//!
//! A node is one object at one causal version, seen from one side of a
//! cycle: [`Side::Read`] for the state a controller observed, and
//! [`Side::Write`] for the state it produced. Identity is
//! `(side, kind, causal_id)`; node ids render as `read:Pod/x1`.
//!
//! ## Edges
//!
//! Within a cycle every read node points at every write node. The log does
//! not say which read fed which write, so the product over-approximates on
//! purpose. Each edge carries its reconcile id and a per-cycle color (see
//! [`palette`]).
//!
//! ## Content hash
//!
//! [`CausalGraph::content_hash`] is a BLAKE3 hash of the sorted edge list.
//! Two runs over the same input produce the same hash.

pub mod build;
pub mod palette;

pub use build::GraphBuild;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use crate::causal::CausalKey;

/// Which half of a cycle a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Read,
    Write,
}

impl Side {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a graph node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    pub side: Side,
    pub key: CausalKey,
}

impl NodeKey {
    #[must_use]
    pub const fn new(side: Side, key: CausalKey) -> Self {
        Self { side, key }
    }

    /// Kind as displayed; `?` while the kind is unknown (orphan writes).
    #[must_use]
    pub fn display_kind(&self) -> &str {
        display_kind(&self.key.kind)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}/{}",
            self.side,
            self.display_kind(),
            self.key.causal_id
        )
    }
}

pub(crate) fn display_kind(kind: &str) -> &str {
    if kind.is_empty() { "?" } else { kind }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CausalNode {
    pub key: NodeKey,
    pub label: String,
    /// Status conditions from the version catalog (read nodes only).
    pub annotation: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CausalEdge {
    pub reconcile_id: String,
    pub color: String,
}

/// Directed causal graph. An edge `R → W` means "W was written in a cycle
/// that read R".
#[derive(Debug)]
pub struct CausalGraph {
    pub graph: DiGraph<CausalNode, CausalEdge>,
    pub node_map: HashMap<NodeKey, NodeIndex>,
    /// BLAKE3 hash of the sorted edge list, `blake3:<hex>`.
    pub content_hash: String,
}

impl CausalGraph {
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    #[must_use]
    pub fn node_index(&self, key: &NodeKey) -> Option<NodeIndex> {
        self.node_map.get(key).copied()
    }

    #[must_use]
    pub fn node(&self, key: &NodeKey) -> Option<&CausalNode> {
        self.node_index(key)
            .and_then(|idx| self.graph.node_weight(idx))
    }

    /// Number of edges contributed by one cycle.
    #[must_use]
    pub fn edges_for(&self, reconcile_id: &str) -> usize {
        self.graph
            .edge_weights()
            .filter(|edge| edge.reconcile_id == reconcile_id)
            .count()
    }

    /// Plain value form, in insertion order.
    #[must_use]
    pub fn to_view(&self) -> GraphView {
        let nodes = self
            .graph
            .node_weights()
            .map(|node| NodeView {
                id: node.key.to_string(),
                label: node.label.clone(),
                annotation: node.annotation.clone(),
            })
            .collect();

        let edges = self
            .graph
            .edge_indices()
            .filter_map(|idx| {
                let (from, to) = self.graph.edge_endpoints(idx)?;
                let edge = self.graph.edge_weight(idx)?;
                Some(EdgeView {
                    from: self.graph[from].key.to_string(),
                    to: self.graph[to].key.to_string(),
                    reconcile_id: edge.reconcile_id.clone(),
                    color: edge.color.clone(),
                })
            })
            .collect();

        GraphView { nodes, edges }
    }
}

/// Renderer-facing graph value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphView {
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeView {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeView {
    pub from: String,
    pub to: String,
    pub reconcile_id: String,
    pub color: String,
}
