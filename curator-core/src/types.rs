use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GraphError;

// ── Graph records ──────────────────────────────────────────────────

/// Canvas coordinates of a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A node of a knowledge graph.
///
/// On the wire a node is a flat object: `{"id", "label", "x", "y", ...}`,
/// every other key lands in `attributes`. A missing label defaults to the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "NodeWire", into = "NodeWire")]
pub struct Node {
    pub id: String,
    pub label: String,
    pub position: Option<Position>,
    pub attributes: BTreeMap<String, Value>,
}

impl Node {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            position: None,
            attributes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }
}

#[derive(Serialize, Deserialize)]
struct NodeWire {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    y: Option<f64>,
    #[serde(flatten)]
    attributes: BTreeMap<String, Value>,
}

impl From<NodeWire> for Node {
    fn from(wire: NodeWire) -> Self {
        let mut attributes = wire.attributes;
        let position = match (wire.x, wire.y) {
            (Some(x), Some(y)) => Some(Position { x, y }),
            // A lone coordinate is not a position but is kept as data.
            (x, y) => {
                for (key, value) in [("x", x), ("y", y)] {
                    if let Some(value) = value {
                        attributes.insert(key.to_string(), Value::from(value));
                    }
                }
                None
            }
        };
        Self {
            label: wire.label.unwrap_or_else(|| wire.id.clone()),
            id: wire.id,
            position,
            attributes,
        }
    }
}

impl From<Node> for NodeWire {
    fn from(node: Node) -> Self {
        Self {
            id: node.id,
            label: Some(node.label),
            x: node.position.map(|p| p.x),
            y: node.position.map(|p| p.y),
            attributes: node.attributes,
        }
    }
}

/// A labelled relation between two nodes of the same graph.
///
/// An empty `id` means "not assigned yet"; [`Graph`] and
/// [`GraphStore`](crate::graph::GraphStore) synthesize one on insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(default)]
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_directed")]
    pub directed: bool,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

fn default_directed() -> bool {
    true
}

impl Edge {
    pub fn new(
        id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            from: from.into(),
            to: to.into(),
            label: label.into(),
            directed: true,
            attributes: BTreeMap::new(),
        }
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.from == node_id || self.to == node_id
    }
}

// ── Patches ────────────────────────────────────────────────────────

/// Shallow merge applied by `update_node`. `None` fields are left alone;
/// an attribute set to `null` is removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodePatch {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

impl NodePatch {
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    pub fn position(position: Position) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    pub(crate) fn apply(&self, node: &mut Node) {
        if let Some(label) = &self.label {
            node.label.clone_from(label);
        }
        if let Some(position) = self.position {
            node.position = Some(position);
        }
        merge_attributes(&mut node.attributes, &self.attributes);
    }
}

/// Shallow merge applied by `update_edge`. Endpoints are not patchable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgePatch {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub directed: Option<bool>,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

impl EdgePatch {
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    pub(crate) fn apply(&self, edge: &mut Edge) {
        if let Some(label) = &self.label {
            edge.label.clone_from(label);
        }
        if let Some(directed) = self.directed {
            edge.directed = directed;
        }
        merge_attributes(&mut edge.attributes, &self.attributes);
    }
}

fn merge_attributes(target: &mut BTreeMap<String, Value>, patch: &BTreeMap<String, Value>) {
    for (key, value) in patch {
        if value.is_null() {
            target.remove(key);
        } else {
            target.insert(key.clone(), value.clone());
        }
    }
}

// ── Graph ──────────────────────────────────────────────────────────

/// A set of nodes and edges keyed by id.
///
/// Every edge endpoint references a node of the same graph. Serializes as
/// `{"nodes": [...], "edges": [...]}`; deserialization synthesizes missing
/// edge ids and rejects duplicates or dangling edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GraphWire", into = "GraphWire")]
pub struct Graph {
    pub(crate) nodes: BTreeMap<String, Node>,
    pub(crate) edges: BTreeMap<String, Edge>,
}

#[derive(Serialize, Deserialize)]
struct GraphWire {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    edges: Vec<Edge>,
}

impl TryFrom<GraphWire> for Graph {
    type Error = GraphError;

    fn try_from(wire: GraphWire) -> Result<Self, Self::Error> {
        Self::from_parts(wire.nodes, wire.edges)
    }
}

impl From<Graph> for GraphWire {
    fn from(graph: Graph) -> Self {
        Self {
            nodes: graph.nodes.into_values().collect(),
            edges: graph.edges.into_values().collect(),
        }
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from loose parts, assigning ids to edges without one.
    pub fn from_parts(
        nodes: impl IntoIterator<Item = Node>,
        edges: impl IntoIterator<Item = Edge>,
    ) -> Result<Self, GraphError> {
        let mut graph = Self::new();
        for node in nodes {
            if graph.nodes.contains_key(&node.id) {
                return Err(GraphError::DuplicateId(node.id));
            }
            graph.nodes.insert(node.id.clone(), node);
        }

        let mut pending = Vec::new();
        for edge in edges {
            if edge.id.is_empty() {
                pending.push(edge);
                continue;
            }
            if graph.edges.contains_key(&edge.id) {
                return Err(GraphError::DuplicateId(edge.id));
            }
            graph.check_endpoints(&edge)?;
            graph.edges.insert(edge.id.clone(), edge);
        }
        // Explicit ids are claimed first so synthesized ones never collide.
        for mut edge in pending {
            graph.check_endpoints(&edge)?;
            edge.id = graph.synthesize_edge_id();
            graph.edges.insert(edge.id.clone(), edge);
        }
        Ok(graph)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn contains_edge(&self, id: &str) -> bool {
        self.edges.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Ids of edges with `node_id` as either endpoint.
    pub fn incident_edges(&self, node_id: &str) -> Vec<String> {
        self.edges
            .values()
            .filter(|e| e.touches(node_id))
            .map(|e| e.id.clone())
            .collect()
    }

    /// First `edgeN` id not already taken.
    pub fn synthesize_edge_id(&self) -> String {
        (0usize..)
            .map(|n| format!("edge{n}"))
            .find(|id| !self.edges.contains_key(id))
            .unwrap_or_default()
    }

    pub(crate) fn check_endpoints(&self, edge: &Edge) -> Result<(), GraphError> {
        for endpoint in [&edge.from, &edge.to] {
            if !self.nodes.contains_key(endpoint) {
                return Err(GraphError::DanglingEdge {
                    edge: edge.id.clone(),
                    node: endpoint.clone(),
                });
            }
        }
        Ok(())
    }
}

// ── Comparison ─────────────────────────────────────────────────────

/// Id-level differences between a base and a candidate graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphComparison {
    /// Nodes present in the candidate but not the base.
    pub added_nodes: Vec<String>,
    /// Nodes present in the base but not the candidate.
    pub removed_nodes: Vec<String>,
    /// Nodes present in both whose label or attributes differ.
    pub changed_nodes: Vec<String>,
    pub added_edges: Vec<String>,
    pub removed_edges: Vec<String>,
    pub changed_edges: Vec<String>,
}

impl GraphComparison {
    /// Compare by id. Node positions are layout, not content, and are ignored.
    pub fn between(base: &Graph, candidate: &Graph) -> Self {
        let mut cmp = Self::default();
        for (id, node) in &candidate.nodes {
            match base.nodes.get(id) {
                None => cmp.added_nodes.push(id.clone()),
                Some(old) if old.label != node.label || old.attributes != node.attributes => {
                    cmp.changed_nodes.push(id.clone());
                }
                Some(_) => {}
            }
        }
        cmp.removed_nodes = base
            .nodes
            .keys()
            .filter(|id| !candidate.nodes.contains_key(*id))
            .cloned()
            .collect();

        for (id, edge) in &candidate.edges {
            match base.edges.get(id) {
                None => cmp.added_edges.push(id.clone()),
                Some(old) if old != edge => cmp.changed_edges.push(id.clone()),
                Some(_) => {}
            }
        }
        cmp.removed_edges = base
            .edges
            .keys()
            .filter(|id| !candidate.edges.contains_key(*id))
            .cloned()
            .collect();
        cmp
    }

    pub fn is_identical(&self) -> bool {
        self.added_nodes.is_empty()
            && self.removed_nodes.is_empty()
            && self.changed_nodes.is_empty()
            && self.added_edges.is_empty()
            && self.removed_edges.is_empty()
            && self.changed_edges.is_empty()
    }
}

// ── Version history ────────────────────────────────────────────────

/// One entry of the version history, newest first when listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub id: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    #[serde(default)]
    pub changed_paths: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn two_node_graph() -> Graph {
        Graph::from_parts(
            [Node::new("A", "Alice"), Node::new("B", "Bob")],
            [Edge::new("e1", "A", "B", "reports to")],
        )
        .unwrap()
    }

    #[test]
    fn node_wire_format_is_flat() {
        let node = Node::new("n1", "Node 1").at(Position::new(1.5, -2.0));
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value, json!({"id": "n1", "label": "Node 1", "x": 1.5, "y": -2.0}));

        let back: Node = serde_json::from_value(json!({"id": "n2", "color": "red"})).unwrap();
        assert_eq!(back.label, "n2");
        assert_eq!(back.position, None);
        assert_eq!(back.attributes.get("color"), Some(&json!("red")));
    }

    #[test]
    fn lone_coordinate_is_kept_as_an_attribute() {
        let node: Node = serde_json::from_value(json!({"id": "n3", "x": 4.5})).unwrap();
        assert_eq!(node.position, None);
        assert_eq!(node.attributes.get("x"), Some(&json!(4.5)));
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({"id": "n3", "label": "n3", "x": 4.5})
        );

        let node: Node = serde_json::from_value(json!({"id": "n4", "y": -1.0})).unwrap();
        assert_eq!(node.attributes.get("y"), Some(&json!(-1.0)));
    }

    #[test]
    fn deserializing_graph_synthesizes_edge_ids() {
        let graph: Graph = serde_json::from_value(json!({
            "nodes": [{"id": "a"}, {"id": "b"}],
            "edges": [
                {"from": "a", "to": "b", "label": "x"},
                {"id": "edge0", "from": "b", "to": "a"}
            ]
        }))
        .unwrap();
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.contains_edge("edge0"));
        assert!(graph.contains_edge("edge1"));
        assert_eq!(graph.edge("edge1").unwrap().label, "x");
    }

    #[test]
    fn duplicate_and_dangling_parts_rejected() {
        let dup = Graph::from_parts([Node::new("a", "a"), Node::new("a", "again")], []);
        assert_eq!(dup.unwrap_err(), GraphError::DuplicateId("a".into()));

        let dangling = Graph::from_parts([Node::new("a", "a")], [Edge::new("e", "a", "zz", "")]);
        assert!(matches!(dangling, Err(GraphError::DanglingEdge { .. })));
    }

    #[test]
    fn patch_merges_shallowly() {
        let mut node = Node::new("a", "old");
        node.attributes.insert("keep".into(), json!(1));
        node.attributes.insert("drop".into(), json!(2));

        let mut patch = NodePatch::label("new");
        patch.attributes.insert("drop".into(), Value::Null);
        patch.attributes.insert("add".into(), json!("x"));
        patch.apply(&mut node);

        assert_eq!(node.label, "new");
        assert_eq!(node.attributes.get("keep"), Some(&json!(1)));
        assert!(!node.attributes.contains_key("drop"));
        assert_eq!(node.attributes.get("add"), Some(&json!("x")));
    }

    #[test]
    fn comparison_reports_id_level_changes() {
        let base = two_node_graph();
        let candidate = Graph::from_parts(
            [
                Node::new("A", "Alice").at(Position::new(3.0, 4.0)),
                Node::new("B", "Robert"),
                Node::new("C", "Carol"),
            ],
            [Edge::new("e2", "C", "A", "manages")],
        )
        .unwrap();

        let cmp = GraphComparison::between(&base, &candidate);
        assert_eq!(cmp.added_nodes, vec!["C"]);
        assert!(cmp.removed_nodes.is_empty());
        assert_eq!(cmp.changed_nodes, vec!["B"]);
        assert_eq!(cmp.added_edges, vec!["e2"]);
        assert_eq!(cmp.removed_edges, vec!["e1"]);
        assert!(!cmp.is_identical());
        assert!(GraphComparison::between(&base, &base).is_identical());
    }

    #[test]
    fn copies_are_independent() {
        let base = two_node_graph();
        let mut candidate = base.clone();
        candidate.nodes.get_mut("A").unwrap().label = "changed".into();
        assert_eq!(base.node("A").unwrap().label, "Alice");
    }
}
