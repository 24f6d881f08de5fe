//! Base/candidate pair for one review unit.

use crate::error::{CuratorError, GraphError};
use crate::graph::GraphStore;
use crate::types::{Graph, GraphComparison};
use crate::workspace::{BatchRef, Workspace};

/// The candidate side of a review: either not generated yet or a live store.
#[derive(Debug, Default)]
pub enum CandidateSlot {
    #[default]
    NotGenerated,
    Ready(GraphStore),
}

/// A frozen base graph next to an editable candidate.
///
/// The base is an owned snapshot, so nothing done to the candidate store can
/// reach it.
#[derive(Debug, Default)]
pub struct ReviewSlot {
    base: Graph,
    candidate: CandidateSlot,
}

impl ReviewSlot {
    pub fn new(base: Graph, candidate: Option<Graph>) -> Self {
        Self {
            base,
            candidate: candidate.map_or(CandidateSlot::NotGenerated, |g| {
                CandidateSlot::Ready(GraphStore::from_graph(g))
            }),
        }
    }

    /// Load both sides from disk. A batch without `kg.dot` has an empty base.
    pub fn open(workspace: &Workspace, batch: &BatchRef) -> crate::error::Result<Self> {
        workspace.ensure_batch(batch)?;
        let base = workspace.read_base(batch)?.unwrap_or_default();
        let candidate = workspace.read_candidate(batch)?;
        Ok(Self::new(base, candidate))
    }

    pub fn base(&self) -> &Graph {
        &self.base
    }

    pub fn candidate(&self) -> Option<&GraphStore> {
        match &self.candidate {
            CandidateSlot::Ready(store) => Some(store),
            CandidateSlot::NotGenerated => None,
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self.candidate, CandidateSlot::Ready(_))
    }

    /// Full replace of the candidate. An existing store is reloaded in place
    /// so its subscribers see one `Load` event.
    pub fn replace_candidate(&mut self, graph: Graph) -> Result<(), GraphError> {
        match &self.candidate {
            CandidateSlot::Ready(store) => store.load(graph),
            CandidateSlot::NotGenerated => {
                self.candidate = CandidateSlot::Ready(GraphStore::from_graph(graph));
                Ok(())
            }
        }
    }

    /// Discard local edits in favor of a freshly fetched candidate, which may
    /// no longer exist.
    pub fn revert(&mut self, fresh: Option<Graph>) -> Result<(), GraphError> {
        match fresh {
            Some(graph) => self.replace_candidate(graph),
            None => {
                self.candidate = CandidateSlot::NotGenerated;
                Ok(())
            }
        }
    }

    /// Id-level differences of the candidate against the base.
    pub fn compare(&self) -> Option<GraphComparison> {
        self.candidate()
            .map(|store| store.with_graph(|candidate| GraphComparison::between(&self.base, candidate)))
    }

    /// Snapshot to hand to the publish pipeline.
    pub fn publishable(&self) -> crate::error::Result<Graph> {
        self.candidate()
            .map(GraphStore::snapshot)
            .ok_or_else(|| CuratorError::Validation("candidate graph has not been generated".into()))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::metadata::{BatchMetadata, ProjectMetadata};
    use crate::types::{Edge, Node, NodePatch};

    fn base() -> Graph {
        Graph::from_parts(
            [Node::new("A", "Alice"), Node::new("B", "Bob")],
            [Edge::new("e1", "A", "B", "reports to")],
        )
        .unwrap()
    }

    #[test]
    fn not_generated_is_not_empty() {
        let missing = ReviewSlot::new(base(), None);
        assert!(!missing.is_generated());
        assert!(missing.compare().is_none());
        assert!(matches!(missing.publishable(), Err(CuratorError::Validation(_))));

        let empty = ReviewSlot::new(base(), Some(Graph::new()));
        assert!(empty.is_generated());
        assert_eq!(empty.publishable().unwrap(), Graph::new());
    }

    #[test]
    fn editing_candidate_never_touches_base() {
        let slot = ReviewSlot::new(base(), Some(base()));
        let store = slot.candidate().unwrap();
        store.update_node("A", &NodePatch::label("Alicia")).unwrap();
        store.remove_node("B").unwrap();

        assert_eq!(slot.base(), &base());
        let cmp = slot.compare().unwrap();
        assert_eq!(cmp.changed_nodes, vec!["A"]);
        assert_eq!(cmp.removed_nodes, vec!["B"]);
        assert_eq!(cmp.removed_edges, vec!["e1"]);
    }

    #[test]
    fn revert_reloads_existing_store() {
        let mut slot = ReviewSlot::new(base(), Some(base()));
        let events = Rc::new(Cell::new(0));
        let counter = Rc::clone(&events);
        let _sub = slot
            .candidate()
            .unwrap()
            .subscribe(move |_| counter.set(counter.get() + 1));

        slot.candidate().unwrap().remove_node("A").unwrap();
        slot.revert(Some(base())).unwrap();
        assert_eq!(slot.candidate().unwrap().snapshot(), base());
        assert_eq!(events.get(), 2);

        slot.revert(None).unwrap();
        assert!(!slot.is_generated());
    }

    #[test]
    fn open_reads_both_sides() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::new(tmp.path(), "projects");
        ws.create_project("p", &ProjectMetadata::default()).unwrap();
        let batch = BatchRef::new("p", "b").unwrap();
        ws.create_batch(&batch, &BatchMetadata::new("b", 1), Some(&base()))
            .unwrap();

        let slot = ReviewSlot::open(&ws, &batch).unwrap();
        assert_eq!(slot.base(), &base());
        assert!(!slot.is_generated());

        ws.write_candidate(&batch, &base()).unwrap();
        let slot = ReviewSlot::open(&ws, &batch).unwrap();
        assert!(slot.compare().unwrap().is_identical());

        let missing = BatchRef::new("p", "zz").unwrap();
        assert!(matches!(
            ReviewSlot::open(&ws, &missing),
            Err(CuratorError::NotFound(_))
        ));
    }
}
