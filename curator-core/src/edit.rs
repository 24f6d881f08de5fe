//! Edit-mode state machine.
//!
//! [`EditController`] interprets pointer events against a [`GraphStore`].
//! In `AddNode` and `AddEdge` the pending action owns every canvas and node
//! click: such clicks are never reinterpreted as a selection. Drag-end is
//! handled the same way in every mode and never changes mode or selection.

use tracing::debug;

use crate::error::{EditError, GraphError};
use crate::graph::GraphStore;
use crate::types::{Edge, Node, NodePatch, Position};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditMode {
    #[default]
    Select,
    AddNode,
    AddEdge {
        source: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PointerEvent {
    CanvasClick { position: Position },
    NodeClick { id: String },
    EdgeClick { id: String },
    NodeDragEnd { id: String, position: Position },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    Node(String),
    Edge(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    NodeLabel,
    EdgeLabel,
}

/// Asks the operator for a label. `None` means the prompt was cancelled.
pub trait LabelPrompt {
    fn prompt(&mut self, kind: PromptKind) -> Option<String>;
}

impl<F> LabelPrompt for F
where
    F: FnMut(PromptKind) -> Option<String>,
{
    fn prompt(&mut self, kind: PromptKind) -> Option<String> {
        self(kind)
    }
}

/// Result of handling one pointer event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    NodeAdded(String),
    EdgeAdded(String),
    /// First click of `AddEdge`: the source is pending.
    SourceSelected(String),
    /// The target equals the pending source. Nothing changed.
    SelfLoopRejected,
    /// The label prompt was cancelled or left empty. Nothing changed.
    Aborted,
    Selected(Selection),
    PositionSaved(String),
    /// The event has no meaning in the current mode.
    Ignored,
}

#[derive(Debug, Default)]
pub struct EditController {
    mode: EditMode,
    selection: Selection,
}

impl EditController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> &EditMode {
        &self.mode
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Enter `AddNode` from any mode, dropping a pending edge source.
    pub fn set_add_node(&mut self) {
        self.mode = EditMode::AddNode;
    }

    /// Enter `AddEdge` with no source from any mode.
    pub fn set_add_edge(&mut self) {
        self.mode = EditMode::AddEdge { source: None };
    }

    /// Back to `Select`, keeping the selection.
    pub fn cancel(&mut self) {
        self.mode = EditMode::Select;
    }

    /// Back to `Select` with nothing selected, as after a reload.
    pub fn reset(&mut self) {
        self.mode = EditMode::Select;
        self.selection = Selection::None;
    }

    pub fn handle(
        &mut self,
        store: &GraphStore,
        event: PointerEvent,
        prompt: &mut dyn LabelPrompt,
    ) -> Result<EditOutcome, EditError> {
        if let PointerEvent::NodeDragEnd { id, position } = event {
            store.update_node(&id, &NodePatch::position(position))?;
            return Ok(EditOutcome::PositionSaved(id));
        }

        match (&self.mode, event) {
            (EditMode::AddNode, PointerEvent::CanvasClick { position }) => {
                let Some(label) = read_label(prompt, PromptKind::NodeLabel) else {
                    return Ok(EditOutcome::Aborted);
                };
                let id = uuid::Uuid::new_v4().to_string();
                store.add_node(Node::new(id.as_str(), label).at(position))?;
                debug!(node = %id, "Node added");
                self.mode = EditMode::Select;
                Ok(EditOutcome::NodeAdded(id))
            }

            (EditMode::AddEdge { source: None }, PointerEvent::NodeClick { id }) => {
                if !store.contains_node(&id) {
                    return Err(EditError::UnknownNode(id));
                }
                self.mode = EditMode::AddEdge {
                    source: Some(id.clone()),
                };
                Ok(EditOutcome::SourceSelected(id))
            }

            (EditMode::AddEdge { source: Some(source) }, PointerEvent::NodeClick { id }) => {
                if *source == id {
                    return Ok(EditOutcome::SelfLoopRejected);
                }
                if !store.contains_node(&id) {
                    return Err(EditError::UnknownNode(id));
                }
                let source = source.clone();
                let Some(label) = read_label(prompt, PromptKind::EdgeLabel) else {
                    return Ok(EditOutcome::Aborted);
                };
                match store.add_edge(Edge::new("", source.as_str(), id.as_str(), label)) {
                    Ok(edge_id) => {
                        debug!(edge = %edge_id, from = %source, to = %id, "Edge added");
                        self.mode = EditMode::Select;
                        Ok(EditOutcome::EdgeAdded(edge_id))
                    }
                    Err(e @ GraphError::DanglingEdge { .. }) => {
                        // The source vanished under us (e.g. a reload); start over.
                        self.mode = EditMode::AddEdge { source: None };
                        Err(e.into())
                    }
                    Err(e) => Err(e.into()),
                }
            }

            (EditMode::Select, PointerEvent::NodeClick { id }) => Ok(self.select(Selection::Node(id))),
            (EditMode::Select, PointerEvent::EdgeClick { id }) => Ok(self.select(Selection::Edge(id))),
            (EditMode::Select, PointerEvent::CanvasClick { .. }) => Ok(self.select(Selection::None)),

            _ => Ok(EditOutcome::Ignored),
        }
    }

    fn select(&mut self, selection: Selection) -> EditOutcome {
        self.selection = selection.clone();
        EditOutcome::Selected(selection)
    }
}

fn read_label(prompt: &mut dyn LabelPrompt, kind: PromptKind) -> Option<String> {
    prompt
        .prompt(kind)
        .map(|label| label.trim().to_string())
        .filter(|label| !label.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Graph;

    fn store() -> GraphStore {
        GraphStore::from_graph(
            Graph::from_parts([Node::new("A", "Alice"), Node::new("B", "Bob")], []).unwrap(),
        )
    }

    fn answer(label: &'static str) -> impl FnMut(PromptKind) -> Option<String> {
        move |_| Some(label.to_string())
    }

    fn cancel() -> impl FnMut(PromptKind) -> Option<String> {
        |_| None
    }

    fn click_node(id: &str) -> PointerEvent {
        PointerEvent::NodeClick { id: id.into() }
    }

    fn click_canvas(x: f64, y: f64) -> PointerEvent {
        PointerEvent::CanvasClick {
            position: Position::new(x, y),
        }
    }

    #[test]
    fn add_node_at_click_position() {
        let store = store();
        let mut ctl = EditController::new();
        ctl.set_add_node();

        let outcome = ctl.handle(&store, click_canvas(5.0, 7.0), &mut answer("Carol")).unwrap();
        let EditOutcome::NodeAdded(id) = outcome else {
            panic!("expected NodeAdded, got {outcome:?}");
        };
        let node = store.node(&id).unwrap();
        assert_eq!(node.label, "Carol");
        assert_eq!(node.position, Some(Position::new(5.0, 7.0)));
        assert_eq!(ctl.mode(), &EditMode::Select);
    }

    #[test]
    fn cancelled_or_blank_label_aborts_without_mutation() {
        let store = store();
        let mut ctl = EditController::new();
        ctl.set_add_node();

        let before = store.snapshot();
        assert_eq!(
            ctl.handle(&store, click_canvas(0.0, 0.0), &mut cancel()).unwrap(),
            EditOutcome::Aborted
        );
        assert_eq!(
            ctl.handle(&store, click_canvas(0.0, 0.0), &mut answer("   ")).unwrap(),
            EditOutcome::Aborted
        );
        assert_eq!(store.snapshot(), before);
        assert_eq!(ctl.mode(), &EditMode::AddNode);
    }

    #[test]
    fn add_edge_two_clicks() {
        let store = store();
        let mut ctl = EditController::new();
        ctl.set_add_edge();

        assert_eq!(
            ctl.handle(&store, click_node("A"), &mut cancel()).unwrap(),
            EditOutcome::SourceSelected("A".into())
        );
        let outcome = ctl.handle(&store, click_node("B"), &mut answer("knows")).unwrap();
        let EditOutcome::EdgeAdded(id) = outcome else {
            panic!("expected EdgeAdded, got {outcome:?}");
        };
        let edge = store.edge(&id).unwrap();
        assert_eq!((edge.from.as_str(), edge.to.as_str()), ("A", "B"));
        assert_eq!(edge.label, "knows");
        assert_eq!(ctl.mode(), &EditMode::Select);
    }

    #[test]
    fn same_node_twice_is_rejected_and_source_kept() {
        let store = store();
        let mut ctl = EditController::new();
        ctl.set_add_edge();
        ctl.handle(&store, click_node("A"), &mut cancel()).unwrap();

        let mut asked = false;
        let mut prompt = |_: PromptKind| {
            asked = true;
            Some("loop".to_string())
        };
        assert_eq!(
            ctl.handle(&store, click_node("A"), &mut prompt).unwrap(),
            EditOutcome::SelfLoopRejected
        );
        assert!(!asked);
        assert_eq!(
            ctl.mode(),
            &EditMode::AddEdge {
                source: Some("A".into())
            }
        );
        assert_eq!(store.edge_count(), 0);
    }

    #[test]
    fn add_modes_never_fall_back_to_selection() {
        let store = store();
        let mut ctl = EditController::new();

        ctl.set_add_node();
        assert_eq!(
            ctl.handle(&store, click_node("A"), &mut cancel()).unwrap(),
            EditOutcome::Ignored
        );
        ctl.set_add_edge();
        assert_eq!(
            ctl.handle(&store, click_canvas(1.0, 1.0), &mut cancel()).unwrap(),
            EditOutcome::Ignored
        );
        assert_eq!(ctl.selection(), &Selection::None);
    }

    #[test]
    fn toggling_clears_pending_source() {
        let store = store();
        let mut ctl = EditController::new();
        ctl.set_add_edge();
        ctl.handle(&store, click_node("A"), &mut cancel()).unwrap();
        ctl.set_add_node();
        assert_eq!(ctl.mode(), &EditMode::AddNode);
        ctl.set_add_edge();
        assert_eq!(ctl.mode(), &EditMode::AddEdge { source: None });
    }

    #[test]
    fn select_mode_emits_selection() {
        let store = store();
        let mut ctl = EditController::new();
        assert_eq!(
            ctl.handle(&store, click_node("B"), &mut cancel()).unwrap(),
            EditOutcome::Selected(Selection::Node("B".into()))
        );
        assert_eq!(
            ctl.handle(&store, PointerEvent::EdgeClick { id: "e9".into() }, &mut cancel())
                .unwrap(),
            EditOutcome::Selected(Selection::Edge("e9".into()))
        );
        assert_eq!(
            ctl.handle(&store, click_canvas(0.0, 0.0), &mut cancel()).unwrap(),
            EditOutcome::Selected(Selection::None)
        );
    }

    #[test]
    fn drag_end_saves_position_in_any_mode() {
        let store = store();
        let mut ctl = EditController::new();
        ctl.handle(&store, click_node("A"), &mut cancel()).unwrap();
        ctl.set_add_edge();
        ctl.handle(&store, click_node("B"), &mut cancel()).unwrap();

        let drag = PointerEvent::NodeDragEnd {
            id: "A".into(),
            position: Position::new(-4.0, 9.5),
        };
        assert_eq!(
            ctl.handle(&store, drag, &mut cancel()).unwrap(),
            EditOutcome::PositionSaved("A".into())
        );
        assert_eq!(store.node("A").unwrap().position, Some(Position::new(-4.0, 9.5)));
        assert_eq!(
            ctl.mode(),
            &EditMode::AddEdge {
                source: Some("B".into())
            }
        );
        assert_eq!(ctl.selection(), &Selection::Node("A".into()));
    }

    #[test]
    fn vanished_source_restarts_edge() {
        let store = store();
        let mut ctl = EditController::new();
        ctl.set_add_edge();
        ctl.handle(&store, click_node("A"), &mut cancel()).unwrap();
        store.remove_node("A").unwrap();
        store.add_node(Node::new("C", "Carol")).unwrap();

        let err = ctl.handle(&store, click_node("C"), &mut answer("x")).unwrap_err();
        assert!(matches!(err, EditError::Graph(GraphError::DanglingEdge { .. })));
        assert_eq!(ctl.mode(), &EditMode::AddEdge { source: None });
        assert!(matches!(
            ctl.handle(&store, click_node("ghost"), &mut cancel()),
            Err(EditError::UnknownNode(_))
        ));
    }

    #[test]
    fn reset_clears_mode_and_selection() {
        let store = store();
        let mut ctl = EditController::new();
        ctl.handle(&store, click_node("A"), &mut cancel()).unwrap();
        ctl.set_add_node();
        ctl.reset();
        assert_eq!(ctl.mode(), &EditMode::Select);
        assert_eq!(ctl.selection(), &Selection::None);
    }
}
