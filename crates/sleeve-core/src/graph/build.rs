//! Graph construction from reconcile groups.
//!
//! Cycles are visited in reconcile-id order and, inside a cycle, events in
//! input order, so node and edge insertion order is deterministic.
//!
//! Only cycles that wrote something are visited. For each one:
//!
//! 1. every read with a resolved causal id gets (or reuses) a read node;
//!    a new read node is annotated from the version catalog;
//! 2. every write gets (or reuses) a write node. Orphan writes keep their
//!    node but are left out of the edge product;
//! 3. each distinct read node gets one edge to each distinct write node.
//!
//! Colors are assigned once all edges are known, over the reconcile ids
//! that actually emitted an edge.

use std::collections::{BTreeMap, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{debug, instrument};

use super::palette::assign_colors;
use super::{CausalEdge, CausalGraph, CausalNode, NodeKey, Side, display_kind};
use crate::catalog::VersionCatalog;
use crate::causal::CausalId;
use crate::config::{Config, GraphConfig};
use crate::diagnostics::{Diagnostics, Stage};
use crate::error::ErrorCode;
use crate::event::Event;
use crate::group::{ReconcileGroup, ReconcileGroups};

/// A built graph and what went wrong along the way.
#[derive(Debug)]
pub struct GraphBuild {
    pub graph: CausalGraph,
    pub diagnostics: Diagnostics,
}

struct Builder<'a> {
    catalog: &'a VersionCatalog,
    config: &'a GraphConfig,
    graph: DiGraph<CausalNode, CausalEdge>,
    node_map: HashMap<NodeKey, NodeIndex>,
    diagnostics: Diagnostics,
}

impl CausalGraph {
    /// Build the causal graph for every cycle with a non-empty writeset.
    #[instrument(skip_all, fields(groups = groups.len()))]
    pub fn build(groups: &ReconcileGroups, catalog: &VersionCatalog, config: &Config) -> GraphBuild {
        let mut builder = Builder {
            catalog,
            config: &config.graph,
            graph: DiGraph::new(),
            node_map: HashMap::new(),
            diagnostics: Diagnostics::new(),
        };

        let mut pending: Vec<(NodeIndex, NodeIndex, &str)> = Vec::new();
        for group in groups.values().filter(|g| !g.is_read_only()) {
            let reads = builder.side_nodes(group, Side::Read);
            let writes = builder.side_nodes(group, Side::Write);
            for &from in &reads {
                for &to in &writes {
                    pending.push((from, to, group.reconcile_id.as_str()));
                }
            }
        }

        let colors = assign_colors(pending.iter().map(|(_, _, rid)| *rid), builder.config);

        let Builder {
            mut graph,
            node_map,
            diagnostics,
            ..
        } = builder;

        for (from, to, reconcile_id) in pending {
            let color = colors.get(reconcile_id).cloned().unwrap_or_default();
            graph.add_edge(
                from,
                to,
                CausalEdge {
                    reconcile_id: reconcile_id.to_string(),
                    color,
                },
            );
        }

        let content_hash = compute_edge_hash(&graph);
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            %content_hash,
            "built causal graph"
        );

        GraphBuild {
            graph: CausalGraph {
                graph,
                node_map,
                content_hash,
            },
            diagnostics,
        }
    }
}

impl Builder<'_> {
    /// Distinct nodes for one side of a cycle, in first-seen order.
    /// Orphan writes get a node but are not returned.
    fn side_nodes(&mut self, group: &ReconcileGroup, side: Side) -> Vec<NodeIndex> {
        let events = match side {
            Side::Read => &group.readset,
            Side::Write => &group.writeset,
        };

        let mut nodes = Vec::new();
        for event in events {
            // Already reported as E1002 when parsed.
            let Some(key) = event.causal_key() else {
                debug!(
                    reconcile_id = %group.reconcile_id,
                    op = %event.op_type,
                    "no causal id; no node"
                );
                continue;
            };

            let idx = self.ensure_node(NodeKey::new(side, key), event);
            if side == Side::Write && event.is_orphaned() {
                continue;
            }
            if !nodes.contains(&idx) {
                nodes.push(idx);
            }
        }
        nodes
    }

    fn ensure_node(&mut self, key: NodeKey, event: &Event) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(&key) {
            return idx;
        }

        let mut label = node_label(event, self.config.short_separator);
        let annotation = if key.side == Side::Read {
            self.annotate(&key, &mut label)
        } else {
            None
        };

        let idx = self.graph.add_node(CausalNode {
            key: key.clone(),
            label,
            annotation,
        });
        self.node_map.insert(key, idx);
        idx
    }

    /// Look a read node up in the catalog; append its status lines to
    /// `label` and return them as the annotation.
    fn annotate(&mut self, key: &NodeKey, label: &mut String) -> Option<BTreeMap<String, String>> {
        let catalog = self.catalog;
        let Some(version) = catalog.get(&key.key.kind, &key.key.causal_id) else {
            self.diagnostics.record(
                ErrorCode::CatalogMiss,
                Stage::Graph,
                key.key.to_string(),
                "no version snapshot; node left unannotated",
            );
            return None;
        };

        let status = catalog.status_conditions(version);
        if status.is_empty() {
            return None;
        }
        for (name, value) in &status {
            label.push('\n');
            label.push_str(name);
            label.push('=');
            label.push_str(value);
        }
        Some(status)
    }
}

/// `kind:short(object_id):short(causal_id)`.
fn node_label(event: &Event, separator: char) -> String {
    let causal = event.causal_id().map_or("", CausalId::as_str);
    format!(
        "{}:{}:{}",
        display_kind(&event.kind),
        short(&event.object_id, separator),
        short(causal, separator)
    )
}

/// Text before the first `separator`.
fn short(id: &str, separator: char) -> &str {
    id.split(separator).next().unwrap_or_default()
}

/// BLAKE3 over the sorted `(from, to, reconcile_id)` list.
fn compute_edge_hash(graph: &DiGraph<CausalNode, CausalEdge>) -> String {
    let mut edges: Vec<(String, String, &str)> = graph
        .edge_indices()
        .filter_map(|idx| {
            let (from, to) = graph.edge_endpoints(idx)?;
            let edge = graph.edge_weight(idx)?;
            Some((
                graph[from].key.to_string(),
                graph[to].key.to_string(),
                edge.reconcile_id.as_str(),
            ))
        })
        .collect();
    edges.sort_unstable();

    let mut hasher = blake3::Hasher::new();
    for (from, to, reconcile_id) in &edges {
        hasher.update(from.as_bytes());
        hasher.update(b"\x00");
        hasher.update(to.as_bytes());
        hasher.update(b"\x00");
        hasher.update(reconcile_id.as_bytes());
        hasher.update(b"\x00");
    }
    format!("blake3:{}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backfill::backfill;
    use crate::causal::CausalKey;
    use crate::group::group_events;
    use serde_json::{Value, json};

    fn ev(reconcile: &str, op: &str, change_id: Option<&str>, kind: &str, object_id: &str) -> Event {
        let mut value = json!({
            "timestamp": "1", "reconcile_id": reconcile, "controller_id": format!("ctl-{reconcile}"),
            "op_type": op, "kind": kind, "object_id": object_id, "version": "1",
        });
        if let Some(id) = change_id {
            value["label:discrete.events/change-id"] = json!(id);
        }
        crate::event::parse_record(&value, &crate::config::LabelConfig::default()).expect("event")
    }

    fn snapshot(kind: &str, change_id: &str, annotations: &Value) -> String {
        json!({
            "kind": format!("/v1, Kind={kind}"), "object_id": "obj", "version": "1",
            "value": json!({"metadata": {
                "labels": {"discrete.events/change-id": change_id},
                "annotations": annotations,
            }}).to_string(),
        })
        .to_string()
    }

    fn build(events: Vec<Event>, snapshots: &[String]) -> GraphBuild {
        let config = Config::default();
        let events = backfill(events).events;
        let groups = group_events(&events).expect("groups");
        let catalog = VersionCatalog::from_lines(snapshots.iter().map(String::as_str), &config).catalog;
        CausalGraph::build(&groups, &catalog, &config)
    }

    fn key(side: Side, kind: &str, id: &str) -> NodeKey {
        NodeKey::new(side, CausalKey::new(kind, CausalId::new(id).expect("id")))
    }

    #[test]
    fn read_and_backfilled_write_are_two_nodes() {
        let built = build(
            vec![
                ev("r1", "GET", Some("x1"), "Pod", "p1-abc"),
                ev("r1", "CREATE", Some("x1"), "", ""),
            ],
            &[],
        );
        let graph = &built.graph;

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        let read = graph.node_index(&key(Side::Read, "Pod", "x1")).expect("read node");
        let write = graph.node_index(&key(Side::Write, "Pod", "x1")).expect("write node");
        assert!(graph.graph.contains_edge(read, write));
        assert!(!graph.graph.contains_edge(write, read));
        assert_eq!(graph.graph[write].label, "Pod:p1:x1");
    }

    #[test]
    fn orphan_write_has_node_but_no_edges() {
        let built = build(
            vec![
                ev("r1", "GET", Some("x1"), "Pod", "p1"),
                ev("r1", "CREATE", Some("x9"), "", ""),
            ],
            &[],
        );
        let graph = &built.graph;

        let orphan = graph.node(&key(Side::Write, "", "x9")).expect("orphan node");
        assert_eq!(orphan.label, "?::x9");
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(built.diagnostics.count(ErrorCode::CatalogMiss), 1);
    }

    #[test]
    fn catalog_miss_is_a_diagnostic() {
        let built = build(
            vec![
                ev("r1", "GET", Some("x1"), "Pod", "p1"),
                ev("r1", "PATCH", Some("x2"), "Pod", "p2"),
            ],
            &[],
        );
        let read = built.graph.node(&key(Side::Read, "Pod", "x1")).expect("read node");
        assert!(read.annotation.is_none());
        let miss = built
            .diagnostics
            .with_code(ErrorCode::CatalogMiss)
            .next()
            .expect("miss");
        assert_eq!(miss.subject, "Pod/x1");
        assert_eq!(miss.stage, Stage::Graph);
    }

    #[test]
    fn catalog_hit_annotates_read_node() {
        let built = build(
            vec![
                ev("r1", "GET", Some("x1"), "Pod", "p1"),
                ev("r1", "PATCH", Some("x2"), "Pod", "p2"),
            ],
            &[snapshot(
                "Pod",
                "x1",
                &json!({"status.ready": "True", "status.phase": "Running", "other": "x"}),
            )],
        );
        let read = built.graph.node(&key(Side::Read, "Pod", "x1")).expect("read node");
        assert_eq!(read.label, "Pod:p1:x1\nstatus.phase=Running\nstatus.ready=True");
        let annotation = read.annotation.as_ref().expect("annotation");
        assert_eq!(annotation.len(), 2);
        assert!(built.diagnostics.is_empty());
    }

    #[test]
    fn edges_are_read_write_product() {
        let built = build(
            vec![
                ev("r1", "GET", Some("a"), "Pod", "p1"),
                ev("r1", "LIST", Some("b"), "Pod", "p2"),
                ev("r1", "GET", Some("c"), "Svc", "s1"),
                ev("r1", "PATCH", Some("d"), "Pod", "p3"),
                ev("r1", "DELETE", Some("e"), "Pod", "p4"),
            ],
            &[],
        );
        assert_eq!(built.graph.edge_count(), 6);
        assert_eq!(built.graph.edges_for("r1"), 6);
    }

    #[test]
    fn duplicate_keys_collapse_within_a_cycle() {
        let built = build(
            vec![
                ev("r1", "GET", Some("a"), "Pod", "p1"),
                ev("r1", "LIST", Some("a"), "Pod", "p1"),
                ev("r1", "PATCH", Some("d"), "Pod", "p3"),
            ],
            &[],
        );
        assert_eq!(built.graph.node_count(), 2);
        assert_eq!(built.graph.edge_count(), 1);
    }

    #[test]
    fn same_pair_gets_one_edge_per_cycle() {
        let built = build(
            vec![
                ev("r1", "GET", Some("a"), "Pod", "p1"),
                ev("r1", "PATCH", Some("d"), "Pod", "p3"),
                ev("r2", "GET", Some("a"), "Pod", "p1"),
                ev("r2", "PATCH", Some("d"), "Pod", "p3"),
            ],
            &[],
        );
        assert_eq!(built.graph.node_count(), 2);
        assert_eq!(built.graph.edge_count(), 2);

        let view = built.graph.to_view();
        assert_eq!(view.edges[0].color, "#ff9999");
        assert_eq!(view.edges[1].color, "#99ffff");
    }

    #[test]
    fn read_only_cycles_add_nothing() {
        let built = build(vec![ev("r1", "GET", Some("a"), "Pod", "p1")], &[]);
        assert_eq!(built.graph.node_count(), 0);
        assert!(built.diagnostics.is_empty());
    }

    #[test]
    fn unresolved_events_get_no_node() {
        let built = build(
            vec![
                ev("r1", "GET", None, "Pod", "p1"),
                ev("r1", "PATCH", Some("d"), "Pod", "p3"),
            ],
            &[],
        );
        assert_eq!(built.graph.node_count(), 1);
        assert_eq!(built.graph.edge_count(), 0);
        assert_eq!(
            built.diagnostics.count(ErrorCode::MissingCausalIdentity),
            0
        );
    }

    #[test]
    fn colors_and_hash_ignore_cycle_input_order() {
        let forward = vec![
            ev("r1", "GET", Some("a"), "Pod", "p1"),
            ev("r1", "PATCH", Some("b"), "Pod", "p2"),
            ev("r2", "GET", Some("c"), "Pod", "p3"),
            ev("r2", "PATCH", Some("d"), "Pod", "p4"),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = build(forward, &[]);
        let b = build(reversed, &[]);

        let colors = |built: &GraphBuild| {
            let mut pairs: Vec<_> = built
                .graph
                .to_view()
                .edges
                .into_iter()
                .map(|e| (e.reconcile_id, e.color))
                .collect();
            pairs.sort();
            pairs
        };
        assert_eq!(colors(&a), colors(&b));
        assert_eq!(a.graph.content_hash, b.graph.content_hash);
        assert!(a.graph.content_hash.starts_with("blake3:"));
    }

    #[test]
    fn short_keeps_prefix() {
        assert_eq!(short("abc-def-ghi", '-'), "abc");
        assert_eq!(short("plain", '-'), "plain");
        assert_eq!(short("", '-'), "");
    }
}
