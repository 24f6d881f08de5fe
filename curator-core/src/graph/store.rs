//! Reactive in-memory graph store.
//!
//! The store is the single source of truth for a graph under edit. It is
//! single-threaded: interior mutability through `RefCell`, listeners invoked
//! synchronously after every successful mutation. A listener may read the
//! store but any mutation attempted while listeners are being notified fails
//! with [`GraphError::Reentrant`].

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::error::GraphError;
use crate::types::{Edge, EdgePatch, Graph, Node, NodePatch};

/// Which mutating call produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Load,
    AddNode,
    AddEdge,
    UpdateNode,
    UpdateEdge,
    RemoveNode,
}

/// Delivered to every listener after a successful mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEvent {
    pub op: StoreOp,
    pub node_ids: Vec<String>,
    pub edge_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&StoreEvent)>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(ListenerId, Listener)>,
    /// Removals of listeners that are checked out for the running dispatch.
    detached: Vec<ListenerId>,
    dispatching: bool,
}

impl Registry {
    /// Hands the listener back so the caller can drop it after releasing the
    /// borrow; a listener may own other subscriptions to this registry.
    fn remove(&mut self, id: ListenerId) -> Option<Listener> {
        if let Some(pos) = self.listeners.iter().position(|(l, _)| *l == id) {
            return Some(self.listeners.remove(pos).1);
        }
        if self.dispatching {
            self.detached.push(id);
        }
        None
    }
}

/// Handle returned by [`GraphStore::subscribe`]. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription {
    id: ListenerId,
    registry: Weak<RefCell<Registry>>,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Stop receiving events. Equivalent to dropping the handle.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let removed = registry.borrow_mut().remove(self.id);
            drop(removed);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Observable node/edge store enforcing edge-endpoint integrity.
#[derive(Default)]
pub struct GraphStore {
    graph: RefCell<Graph>,
    registry: Rc<RefCell<Registry>>,
}

impl std::fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let graph = self.graph.borrow();
        f.debug_struct("GraphStore")
            .field("nodes", &graph.node_count())
            .field("edges", &graph.edge_count())
            .field("listeners", &self.registry.borrow().listeners.len())
            .finish()
    }
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_graph(graph: Graph) -> Self {
        Self {
            graph: RefCell::new(graph),
            registry: Rc::default(),
        }
    }

    // ── Subscription ───────────────────────────────────────────────

    pub fn subscribe(&self, listener: impl FnMut(&StoreEvent) + 'static) -> Subscription {
        let mut registry = self.registry.borrow_mut();
        let id = ListenerId(registry.next_id);
        registry.next_id += 1;
        registry.listeners.push((id, Box::new(listener)));
        Subscription {
            id,
            registry: Rc::downgrade(&self.registry),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.registry.borrow().listeners.len()
    }

    // ── Mutations ──────────────────────────────────────────────────

    /// Replace the whole node/edge set. Emits a single `Load` event.
    pub fn load(&self, graph: Graph) -> Result<(), GraphError> {
        self.ensure_idle()?;
        let event = StoreEvent {
            op: StoreOp::Load,
            node_ids: graph.nodes.keys().cloned().collect(),
            edge_ids: graph.edges.keys().cloned().collect(),
        };
        *self.graph.borrow_mut() = graph;
        self.notify(&event);
        Ok(())
    }

    pub fn add_node(&self, node: Node) -> Result<(), GraphError> {
        self.ensure_idle()?;
        let id = node.id.clone();
        {
            let mut graph = self.graph.borrow_mut();
            if graph.nodes.contains_key(&id) {
                return Err(GraphError::DuplicateId(id));
            }
            graph.nodes.insert(id.clone(), node);
        }
        self.notify(&StoreEvent {
            op: StoreOp::AddNode,
            node_ids: vec![id],
            edge_ids: Vec::new(),
        });
        Ok(())
    }

    /// Insert an edge, synthesizing an id when `edge.id` is empty.
    /// Returns the id the edge was stored under.
    pub fn add_edge(&self, mut edge: Edge) -> Result<String, GraphError> {
        self.ensure_idle()?;
        {
            let mut graph = self.graph.borrow_mut();
            if edge.id.is_empty() {
                edge.id = graph.synthesize_edge_id();
            } else if graph.edges.contains_key(&edge.id) {
                return Err(GraphError::DuplicateId(edge.id));
            }
            graph.check_endpoints(&edge)?;
            graph.edges.insert(edge.id.clone(), edge.clone());
        }
        self.notify(&StoreEvent {
            op: StoreOp::AddEdge,
            node_ids: vec![edge.from, edge.to],
            edge_ids: vec![edge.id.clone()],
        });
        Ok(edge.id)
    }

    pub fn update_node(&self, id: &str, patch: &NodePatch) -> Result<(), GraphError> {
        self.ensure_idle()?;
        {
            let mut graph = self.graph.borrow_mut();
            let node = graph
                .nodes
                .get_mut(id)
                .ok_or_else(|| GraphError::NotFound(id.to_string()))?;
            patch.apply(node);
        }
        self.notify(&StoreEvent {
            op: StoreOp::UpdateNode,
            node_ids: vec![id.to_string()],
            edge_ids: Vec::new(),
        });
        Ok(())
    }

    pub fn update_edge(&self, id: &str, patch: &EdgePatch) -> Result<(), GraphError> {
        self.ensure_idle()?;
        {
            let mut graph = self.graph.borrow_mut();
            let edge = graph
                .edges
                .get_mut(id)
                .ok_or_else(|| GraphError::NotFound(id.to_string()))?;
            patch.apply(edge);
        }
        self.notify(&StoreEvent {
            op: StoreOp::UpdateEdge,
            node_ids: Vec::new(),
            edge_ids: vec![id.to_string()],
        });
        Ok(())
    }

    /// Remove a node and every edge incident to it, as one event.
    /// Returns the ids of the cascaded edges.
    pub fn remove_node(&self, id: &str) -> Result<Vec<String>, GraphError> {
        self.ensure_idle()?;
        let removed_edges = {
            let mut graph = self.graph.borrow_mut();
            if !graph.nodes.contains_key(id) {
                return Err(GraphError::NotFound(id.to_string()));
            }
            let incident = graph.incident_edges(id);
            for edge_id in &incident {
                graph.edges.remove(edge_id);
            }
            graph.nodes.remove(id);
            incident
        };
        self.notify(&StoreEvent {
            op: StoreOp::RemoveNode,
            node_ids: vec![id.to_string()],
            edge_ids: removed_edges.clone(),
        });
        Ok(removed_edges)
    }

    // ── Reads ──────────────────────────────────────────────────────

    /// Owned copy of the current graph.
    pub fn snapshot(&self) -> Graph {
        self.graph.borrow().clone()
    }

    pub fn with_graph<R>(&self, f: impl FnOnce(&Graph) -> R) -> R {
        f(&self.graph.borrow())
    }

    pub fn node(&self, id: &str) -> Option<Node> {
        self.graph.borrow().node(id).cloned()
    }

    pub fn edge(&self, id: &str) -> Option<Edge> {
        self.graph.borrow().edge(id).cloned()
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.graph.borrow().contains_node(id)
    }

    pub fn node_count(&self) -> usize {
        self.graph.borrow().node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.borrow().edge_count()
    }

    // ── Dispatch ───────────────────────────────────────────────────

    fn ensure_idle(&self) -> Result<(), GraphError> {
        if self.registry.borrow().dispatching {
            Err(GraphError::Reentrant)
        } else {
            Ok(())
        }
    }

    fn notify(&self, event: &StoreEvent) {
        // Listeners are checked out so they can subscribe, unsubscribe, or
        // read the store without hitting an outstanding borrow.
        let mut active = {
            let mut registry = self.registry.borrow_mut();
            registry.dispatching = true;
            std::mem::take(&mut registry.listeners)
        };
        for (_, listener) in &mut active {
            listener(event);
        }
        let released = {
            let mut registry = self.registry.borrow_mut();
            let detached = std::mem::take(&mut registry.detached);
            let (released, mut kept): (Vec<_>, Vec<_>) =
                active.into_iter().partition(|(id, _)| detached.contains(id));
            kept.append(&mut registry.listeners);
            registry.listeners = kept;
            registry.dispatching = false;
            released
        };
        drop(released);
    }
}
