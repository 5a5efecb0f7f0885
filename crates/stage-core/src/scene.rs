//! The session's scene: node graph, current selection, and viewport.

use crate::graph::SceneGraph;
use crate::id::NodeId;
use crate::viewport::Viewport;
use std::collections::HashSet;

/// Root container of the node forest plus selection and viewport state.
///
/// Selection and viewport are view state: changing them bumps the
/// revision (so the render bridge redraws) but never enters history.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub graph: SceneGraph,
    selection: HashSet<NodeId>,
    viewport: Viewport,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_graph(graph: SceneGraph) -> Self {
        Self {
            graph,
            ..Self::default()
        }
    }

    /// Scene-wide revision counter consumed by the render bridge.
    pub fn revision(&self) -> u64 {
        self.graph.revision()
    }

    // ─── Selection ───────────────────────────────────────────────────────

    pub fn selection(&self) -> &HashSet<NodeId> {
        &self.selection
    }

    pub fn is_selected(&self, id: NodeId) -> bool {
        self.selection.contains(&id)
    }

    /// Selected IDs in paint order (back to front), for deterministic iteration.
    pub fn selected_ids(&self) -> Vec<NodeId> {
        self.graph
            .paint_order()
            .into_iter()
            .filter(|id| self.selection.contains(id))
            .collect()
    }

    /// Replace the selection. Unknown IDs are dropped.
    pub fn set_selection(&mut self, ids: impl IntoIterator<Item = NodeId>) {
        let next: HashSet<NodeId> = ids
            .into_iter()
            .filter(|id| self.graph.contains(*id) && !id.is_root())
            .collect();
        if next != self.selection {
            self.selection = next;
            self.graph.touch();
        }
    }

    /// Add or remove a single node from the selection.
    pub fn toggle_selected(&mut self, id: NodeId) {
        if !self.selection.remove(&id) {
            if !self.graph.contains(id) || id.is_root() {
                return;
            }
            self.selection.insert(id);
        }
        self.graph.touch();
    }

    pub fn extend_selection(&mut self, ids: impl IntoIterator<Item = NodeId>) {
        let mut next = self.selection.clone();
        next.extend(ids);
        self.set_selection(next);
    }

    pub fn clear_selection(&mut self) {
        self.set_selection(std::iter::empty());
    }

    /// Drop selected IDs that no longer resolve to a live node.
    pub fn prune_selection(&mut self) {
        let before = self.selection.len();
        let graph = &self.graph;
        self.selection.retain(|id| graph.contains(*id));
        if self.selection.len() != before {
            self.graph.touch();
        }
    }

    // ─── Viewport ────────────────────────────────────────────────────────

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        if viewport != self.viewport {
            self.viewport = viewport;
            self.graph.touch();
        }
    }
}

/// Structural equality of graph, selection and viewport.
impl PartialEq for Scene {
    fn eq(&self, other: &Self) -> bool {
        self.graph == other.graph
            && self.selection == other.selection
            && self.viewport == other.viewport
    }
}
