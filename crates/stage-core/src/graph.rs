//! Arena scene graph.
//!
//! Nodes live in a `StableDiGraph`; edges go parent → child. A `NodeId`
//! index maps identifiers to arena slots, and an explicit child list per
//! parent records sibling order. Paint order among siblings is the child
//! list stably sorted by `z_index`.
//!
//! Parents are found through incoming edges, never through a pointer stored
//! on the child, so there is no ownership cycle to break. Every structural
//! change validates acyclicity before touching the arena.

use crate::error::SceneError;
use crate::geometry;
use crate::id::NodeId;
use crate::model::*;
use kurbo::{Affine, Point, Rect, Size};
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// What happens to the children of a deleted node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Children move to the deleted node's parent, at its position,
    /// keeping their world placement.
    #[default]
    ReparentChildren,
    /// Children are deleted along with the node.
    DestroySubtree,
}

/// How `query_at` collects hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitMode {
    /// Topmost unlocked node only; used to pick a drag/resize target.
    Pick,
    /// Every node under the point, locked ones included, topmost first.
    All,
}

/// The scene's node forest under a hidden root.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    graph: StableDiGraph<Node, ()>,
    root: NodeIndex,
    id_index: HashMap<NodeId, NodeIndex>,
    child_order: HashMap<NodeIndex, Vec<NodeIndex>>,
    revision: u64,
    id_counter: u64,
}

impl SceneGraph {
    /// Create an empty graph containing only the root.
    #[must_use]
    pub fn new() -> Self {
        let mut graph = StableDiGraph::new();
        let root_id = NodeId::root();
        let root = graph.add_node(Node::new(root_id, NodeKind::Root));

        let mut id_index = HashMap::new();
        id_index.insert(root_id, root);

        Self {
            graph,
            root,
            id_index,
            child_order: HashMap::new(),
            revision: 0,
            id_counter: 0,
        }
    }

    // ─── Lookup ──────────────────────────────────────────────────────────

    /// Scene-wide revision; bumped by every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Mark the scene as changed without a structural mutation
    /// (selection or viewport changes).
    pub fn touch(&mut self) {
        self.revision += 1;
    }

    pub fn root_id(&self) -> NodeId {
        self.graph[self.root].id
    }

    /// Number of nodes, excluding the root.
    pub fn len(&self) -> usize {
        self.graph.node_count() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.id_index.contains_key(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.id_index.get(&id).map(|idx| &self.graph[*idx])
    }

    fn index_of(&self, id: NodeId) -> Result<NodeIndex, SceneError> {
        self.id_index
            .get(&id)
            .copied()
            .ok_or(SceneError::UnknownNode(id))
    }

    /// Index of a non-root node.
    fn user_index(&self, id: NodeId) -> Result<NodeIndex, SceneError> {
        let idx = self.index_of(id)?;
        if idx == self.root {
            return Err(SceneError::UnknownNode(id));
        }
        Ok(idx)
    }

    fn parent_idx(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .next()
    }

    /// Parent of a node. Top-level nodes report the root; the root itself
    /// and unknown IDs report `None`.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        let idx = self.index_of(id).ok()?;
        self.parent_idx(idx).map(|p| self.graph[p].id)
    }

    /// Position of a node in its parent's child list.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let idx = self.index_of(id).ok()?;
        let parent = self.parent_idx(idx)?;
        self.child_order
            .get(&parent)?
            .iter()
            .position(|c| *c == idx)
    }

    /// Children in structural (child-list) order.
    pub fn child_ids(&self, id: NodeId) -> Vec<NodeId> {
        self.index_of(id)
            .ok()
            .and_then(|idx| self.child_order.get(&idx))
            .map(|list| list.iter().map(|c| self.graph[*c].id).collect())
            .unwrap_or_default()
    }

    /// Children in paint order: back to front.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        match self.index_of(id) {
            Ok(idx) => self
                .painted_children(idx)
                .into_iter()
                .map(|c| self.graph[c].id)
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    pub(crate) fn painted_children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut children = self.child_order.get(&idx).cloned().unwrap_or_default();
        // Stable: equal z keeps child-list order.
        children.sort_by_key(|c| self.graph[*c].z_index);
        children
    }

    pub(crate) fn node_at(&self, idx: NodeIndex) -> &Node {
        &self.graph[idx]
    }

    pub(crate) fn root_index(&self) -> NodeIndex {
        self.root
    }

    /// Check if `ancestor` is a parent/grandparent/etc. of `descendant`.
    pub fn is_ancestor_of(&self, ancestor: NodeId, descendant: NodeId) -> bool {
        if ancestor == descendant {
            return false;
        }
        let Ok(mut current) = self.index_of(descendant) else {
            return false;
        };
        while let Some(parent) = self.parent_idx(current) {
            if self.graph[parent].id == ancestor {
                return true;
            }
            current = parent;
        }
        false
    }

    /// The node and all its descendants, pre-order in paint order.
    pub fn subtree_of(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if let Ok(idx) = self.index_of(id) {
            self.collect_subtree(idx, &mut out);
        }
        out
    }

    fn collect_subtree(&self, idx: NodeIndex, out: &mut Vec<NodeId>) {
        out.push(self.graph[idx].id);
        for child in self.painted_children(idx) {
            self.collect_subtree(child, out);
        }
    }

    /// Every non-root node, back to front.
    pub fn paint_order(&self) -> Vec<NodeId> {
        let mut out = self.subtree_of(self.root_id());
        out.remove(0);
        out
    }

    /// Drop IDs whose ancestor is also in the set, keeping input order.
    pub fn outermost(&self, ids: &[NodeId]) -> Vec<NodeId> {
        let set: HashSet<NodeId> = ids.iter().copied().collect();
        ids.iter()
            .copied()
            .filter(|id| !set.iter().any(|other| self.is_ancestor_of(*other, *id)))
            .collect()
    }

    /// Generate an ID not currently used in this graph (e.g. `rect_3`).
    pub fn next_id(&mut self, prefix: &str) -> NodeId {
        loop {
            self.id_counter += 1;
            let id = NodeId::intern(&format!("{prefix}_{}", self.id_counter));
            if !self.contains(id) {
                return id;
            }
        }
    }

    // ─── Geometry ────────────────────────────────────────────────────────

    /// Local-to-world transform of a node (root is identity).
    pub fn world_transform(&self, id: NodeId) -> Option<Affine> {
        let idx = self.index_of(id).ok()?;
        Some(self.world_of(idx))
    }

    pub(crate) fn world_of(&self, idx: NodeIndex) -> Affine {
        let mut chain = vec![idx];
        let mut current = idx;
        while let Some(parent) = self.parent_idx(current) {
            chain.push(parent);
            current = parent;
        }
        chain
            .iter()
            .rev()
            .filter(|i| **i != self.root)
            .fold(Affine::IDENTITY, |acc, i| {
                geometry::compose(acc, self.graph[*i].transform.to_affine())
            })
    }

    /// World transform of a node's parent.
    pub fn parent_world_transform(&self, id: NodeId) -> Option<Affine> {
        let idx = self.index_of(id).ok()?;
        let parent = self.parent_idx(idx)?;
        Some(self.world_of(parent))
    }

    /// Axis-aligned world bounding box of a node's subtree.
    ///
    /// Hidden nodes are skipped. Containers contribute only through their
    /// children, whatever their stored size; an empty subtree collapses to a zero-area
    /// box at the node's world origin.
    pub fn world_bounds(&self, id: NodeId) -> Option<Rect> {
        let idx = self.index_of(id).ok()?;
        let world = self.world_of(idx);
        let rects = self.subtree_rects(idx, world);
        Some(geometry::union_all(rects).unwrap_or_else(|| {
            let origin = world * Point::ZERO;
            Rect::from_origin_size(origin, Size::ZERO)
        }))
    }

    fn subtree_rects(&self, idx: NodeIndex, world: Affine) -> Vec<Rect> {
        let node = &self.graph[idx];
        let mut rects = Vec::new();
        if !node.flags.visible {
            return rects;
        }
        if !node.kind.is_container() {
            rects.push(geometry::rect_to_world(world, node.local_rect()));
        }
        for child in self.painted_children(idx) {
            let child_world = geometry::compose(world, self.graph[child].transform.to_affine());
            rects.extend(self.subtree_rects(child, child_world));
        }
        rects
    }

    // ─── Mutation ────────────────────────────────────────────────────────

    /// Append `node` as the last child of `parent`.
    pub fn add_node(&mut self, parent: NodeId, node: Node) -> Result<NodeId, SceneError> {
        let index = self.child_ids(parent).len();
        self.insert_node(parent, index, node)
    }

    /// Insert `node` at `index` in `parent`'s child list (clamped).
    pub fn insert_node(
        &mut self,
        parent: NodeId,
        index: usize,
        mut node: Node,
    ) -> Result<NodeId, SceneError> {
        let id = node.id;
        let invalid = SceneError::InvalidParent { node: id, parent };
        let parent_idx = self.index_of(parent).map_err(|_| invalid.clone())?;

        if self.contains(id) {
            if id == parent || self.is_ancestor_of(id, parent) {
                return Err(invalid);
            }
            return Err(SceneError::DuplicateId(id));
        }
        if !self.graph[parent_idx].kind.is_container() || matches!(node.kind, NodeKind::Root) {
            return Err(invalid);
        }

        node.transform = normalize_transform(node.transform, Transform::IDENTITY);
        node.size = geometry::sanitize_size(node.size);

        let idx = self.graph.add_node(node);
        self.graph.add_edge(parent_idx, idx, ());
        self.id_index.insert(id, idx);
        let siblings = self.child_order.entry(parent_idx).or_default();
        let at = index.min(siblings.len());
        siblings.insert(at, idx);

        self.revision += 1;
        log::trace!("insert {id} under {parent} at {at}");
        Ok(id)
    }

    /// Remove a node. Its children are handled according to `policy`.
    pub fn remove_node(&mut self, id: NodeId, policy: DeletePolicy) -> Result<Node, SceneError> {
        let idx = self.user_index(id)?;
        let parent = self.parent_idx(idx).unwrap_or(self.root);
        let children = self.child_order.get(&idx).cloned().unwrap_or_default();

        match policy {
            DeletePolicy::ReparentChildren => {
                let position = self.position_in(parent, idx);
                let local = self.graph[idx].transform;
                for (offset, child) in children.iter().enumerate() {
                    self.detach(*child);
                    self.attach(parent, position + 1 + offset, *child);
                    if local != Transform::IDENTITY {
                        let child_local = self.graph[*child].transform.to_affine();
                        self.graph[*child].transform =
                            Transform::from_affine(geometry::compose(local.to_affine(), child_local));
                    }
                }
            }
            DeletePolicy::DestroySubtree => {
                for child in children {
                    self.destroy(child);
                }
            }
        }

        let node = self.destroy_leaf(idx).ok_or(SceneError::UnknownNode(id))?;
        self.revision += 1;
        log::trace!("remove {id} ({policy:?})");
        Ok(node)
    }

    /// Remove a node that has no children.
    pub fn remove_leaf(&mut self, id: NodeId) -> Result<Node, SceneError> {
        let idx = self.user_index(id)?;
        if self.child_order.get(&idx).is_some_and(|c| !c.is_empty()) {
            return Err(SceneError::NotEmpty(id));
        }
        let node = self.destroy_leaf(idx).ok_or(SceneError::UnknownNode(id))?;
        self.revision += 1;
        Ok(node)
    }

    fn destroy(&mut self, idx: NodeIndex) {
        for child in self.child_order.get(&idx).cloned().unwrap_or_default() {
            self.destroy(child);
        }
        self.destroy_leaf(idx);
    }

    fn destroy_leaf(&mut self, idx: NodeIndex) -> Option<Node> {
        self.detach(idx);
        self.child_order.remove(&idx);
        let node = self.graph.remove_node(idx)?;
        self.id_index.remove(&node.id);
        Some(node)
    }

    /// Move `id` under `new_parent` at `index` (clamped). The local
    /// transform is kept as-is.
    pub fn reparent(&mut self, id: NodeId, new_parent: NodeId, index: usize) -> Result<(), SceneError> {
        let idx = self.user_index(id)?;
        let invalid = SceneError::InvalidParent {
            node: id,
            parent: new_parent,
        };
        let parent_idx = self.index_of(new_parent).map_err(|_| invalid.clone())?;
        if new_parent == id
            || self.is_ancestor_of(id, new_parent)
            || !self.graph[parent_idx].kind.is_container()
        {
            log::warn!("rejected reparent of {id} under {new_parent}");
            return Err(invalid);
        }

        self.detach(idx);
        self.attach(parent_idx, index, idx);
        self.revision += 1;
        log::trace!("reparent {id} under {new_parent} at {index}");
        Ok(())
    }

    fn position_in(&self, parent: NodeIndex, idx: NodeIndex) -> usize {
        self.child_order
            .get(&parent)
            .and_then(|list| list.iter().position(|c| *c == idx))
            .unwrap_or(0)
    }

    fn detach(&mut self, idx: NodeIndex) {
        if let Some(parent) = self.parent_idx(idx) {
            if let Some(edge) = self.graph.find_edge(parent, idx) {
                self.graph.remove_edge(edge);
            }
            if let Some(list) = self.child_order.get_mut(&parent) {
                list.retain(|c| *c != idx);
            }
        }
    }

    fn attach(&mut self, parent: NodeIndex, index: usize, idx: NodeIndex) {
        self.graph.add_edge(parent, idx, ());
        let list = self.child_order.entry(parent).or_default();
        let at = index.min(list.len());
        list.insert(at, idx);
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, SceneError> {
        let idx = self.user_index(id)?;
        self.revision += 1;
        Ok(&mut self.graph[idx])
    }

    /// Replace a node's local transform. Non-finite components fall back
    /// to the current value.
    pub fn set_transform(&mut self, id: NodeId, transform: Transform) -> Result<(), SceneError> {
        let node = self.node_mut(id)?;
        node.transform = normalize_transform(transform, node.transform);
        Ok(())
    }

    /// Replace a node's size, clamped to non-negative finite values.
    pub fn set_size(&mut self, id: NodeId, size: Size) -> Result<(), SceneError> {
        self.node_mut(id)?.size = geometry::sanitize_size(size);
        Ok(())
    }

    pub fn set_placement(&mut self, id: NodeId, placement: Placement) -> Result<(), SceneError> {
        let node = self.node_mut(id)?;
        node.transform = normalize_transform(placement.transform, node.transform);
        node.size = geometry::sanitize_size(placement.size);
        Ok(())
    }

    pub fn set_z_index(&mut self, id: NodeId, z_index: i32) -> Result<(), SceneError> {
        self.node_mut(id)?.z_index = z_index;
        Ok(())
    }

    pub fn set_flags(&mut self, id: NodeId, flags: NodeFlags) -> Result<(), SceneError> {
        self.node_mut(id)?.flags = flags;
        Ok(())
    }

    pub fn set_style(&mut self, id: NodeId, style: Style) -> Result<(), SceneError> {
        self.node_mut(id)?.style = style;
        Ok(())
    }

    // ─── Hit testing ─────────────────────────────────────────────────────

    /// Nodes under a world point, topmost first.
    pub fn query_at(&self, point: Point, mode: HitMode) -> Vec<NodeId> {
        crate::hit::query_at(self, point, mode)
    }

    /// Nodes whose world bounding box intersects `rect` (marquee).
    pub fn query_rect(&self, rect: Rect) -> Vec<NodeId> {
        crate::hit::query_rect(self, rect)
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Structural equality: same nodes, same parents, same sibling order.
/// Arena indices and revision are ignored.
impl PartialEq for SceneGraph {
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.id_index.keys().all(|id| {
            other.get(*id) == self.get(*id)
                && other.parent_of(*id) == self.parent_of(*id)
                && other.child_ids(*id) == self.child_ids(*id)
        })
    }
}

fn normalize_transform(t: Transform, fallback: Transform) -> Transform {
    let pick = |v: f64, f: f64| if v.is_finite() { v } else { f };
    Transform {
        x: pick(t.x, fallback.x),
        y: pick(t.y, fallback.y),
        rotation: pick(t.rotation, fallback.rotation),
        scale_x: pick(t.scale_x, fallback.scale_x),
        scale_y: pick(t.scale_y, fallback.scale_y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn id(s: &str) -> NodeId {
        NodeId::intern(s)
    }

    fn group_with_child(sg: &mut SceneGraph, group: &str, child: &str) {
        sg.add_node(sg.root_id(), Node::group(id(group))).unwrap();
        sg.add_node(id(group), Node::rect(id(child), 0.0, 0.0, 10.0, 10.0))
            .unwrap();
    }

    #[test]
    fn add_and_lookup() {
        let mut sg = SceneGraph::new();
        let box1 = sg
            .add_node(sg.root_id(), Node::rect(id("box1"), 0.0, 0.0, 100.0, 50.0))
            .unwrap();
        assert!(sg.get(box1).is_some());
        assert_eq!(sg.children(sg.root_id()), vec![box1]);
        assert_eq!(sg.parent_of(box1), Some(sg.root_id()));
        assert_eq!(sg.len(), 1);
    }

    #[test]
    fn add_under_missing_parent_is_invalid() {
        let mut sg = SceneGraph::new();
        let err = sg
            .add_node(id("ghost"), Node::rect(id("orphan"), 0.0, 0.0, 1.0, 1.0))
            .unwrap_err();
        assert_eq!(
            err,
            SceneError::InvalidParent {
                node: id("orphan"),
                parent: id("ghost")
            }
        );
        assert!(sg.is_empty());
    }

    #[test]
    fn add_under_own_descendant_is_invalid() {
        let mut sg = SceneGraph::new();
        group_with_child(&mut sg, "g_cycle", "g_cycle_child");
        let err = sg
            .add_node(id("g_cycle_child"), Node::group(id("g_cycle")))
            .unwrap_err();
        assert!(matches!(err, SceneError::InvalidParent { .. }));
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut sg = SceneGraph::new();
        sg.add_node(sg.root_id(), Node::rect(id("dup"), 0.0, 0.0, 1.0, 1.0))
            .unwrap();
        let err = sg
            .add_node(sg.root_id(), Node::rect(id("dup"), 5.0, 5.0, 1.0, 1.0))
            .unwrap_err();
        assert_eq!(err, SceneError::DuplicateId(id("dup")));
    }

    #[test]
    fn shapes_cannot_parent() {
        let mut sg = SceneGraph::new();
        sg.add_node(sg.root_id(), Node::rect(id("leafy"), 0.0, 0.0, 1.0, 1.0))
            .unwrap();
        let err = sg
            .add_node(id("leafy"), Node::rect(id("leafy_kid"), 0.0, 0.0, 1.0, 1.0))
            .unwrap_err();
        assert!(matches!(err, SceneError::InvalidParent { .. }));
    }

    #[test]
    fn reparent_into_descendant_leaves_graph_unchanged() {
        let mut sg = SceneGraph::new();
        sg.add_node(sg.root_id(), Node::group(id("outer_a"))).unwrap();
        sg.add_node(id("outer_a"), Node::group(id("inner_g"))).unwrap();

        let before = sg.clone();
        let rev = sg.revision();
        let err = sg.reparent(id("outer_a"), id("inner_g"), 0).unwrap_err();
        assert!(matches!(err, SceneError::InvalidParent { .. }));
        assert!(sg.reparent(id("outer_a"), id("outer_a"), 0).is_err());
        assert_eq!(sg, before);
        assert_eq!(sg.revision(), rev);
        assert_eq!(sg.parent_of(id("outer_a")), Some(sg.root_id()));
        assert_eq!(sg.parent_of(id("inner_g")), Some(id("outer_a")));
    }

    #[test]
    fn reparent_moves_between_groups() {
        let mut sg = SceneGraph::new();
        group_with_child(&mut sg, "grp_x", "moving");
        sg.add_node(sg.root_id(), Node::group(id("grp_y"))).unwrap();
        sg.reparent(id("moving"), id("grp_y"), 0).unwrap();
        assert_eq!(sg.child_ids(id("grp_x")), Vec::<NodeId>::new());
        assert_eq!(sg.child_ids(id("grp_y")), vec![id("moving")]);
    }

    #[test]
    fn remove_reparents_children_in_place() {
        let mut sg = SceneGraph::new();
        sg.add_node(sg.root_id(), Node::rect(id("before_g"), 0.0, 0.0, 1.0, 1.0))
            .unwrap();
        sg.add_node(
            sg.root_id(),
            Node::group(id("doomed")).with_transform(Transform::at(100.0, 0.0)),
        )
        .unwrap();
        sg.add_node(id("doomed"), Node::rect(id("kid_1"), 5.0, 0.0, 1.0, 1.0))
            .unwrap();
        sg.add_node(id("doomed"), Node::rect(id("kid_2"), 10.0, 0.0, 1.0, 1.0))
            .unwrap();
        sg.add_node(sg.root_id(), Node::rect(id("after_g"), 0.0, 0.0, 1.0, 1.0))
            .unwrap();

        sg.remove_node(id("doomed"), DeletePolicy::ReparentChildren)
            .unwrap();
        assert_eq!(
            sg.child_ids(sg.root_id()),
            vec![id("before_g"), id("kid_1"), id("kid_2"), id("after_g")]
        );
        // World placement is preserved.
        assert_eq!(sg.get(id("kid_1")).unwrap().transform.x, 105.0);
        assert_eq!(sg.get(id("kid_2")).unwrap().transform.x, 110.0);
    }

    #[test]
    fn remove_can_destroy_subtree() {
        let mut sg = SceneGraph::new();
        group_with_child(&mut sg, "tree_root", "tree_leaf");
        sg.remove_node(id("tree_root"), DeletePolicy::DestroySubtree)
            .unwrap();
        assert!(sg.is_empty());
        assert!(!sg.contains(id("tree_leaf")));
    }

    #[test]
    fn remove_leaf_refuses_parents() {
        let mut sg = SceneGraph::new();
        group_with_child(&mut sg, "full_g", "full_kid");
        assert_eq!(
            sg.remove_leaf(id("full_g")).unwrap_err(),
            SceneError::NotEmpty(id("full_g"))
        );
        assert!(sg.remove_leaf(id("full_kid")).is_ok());
    }

    #[test]
    fn root_cannot_be_removed() {
        let mut sg = SceneGraph::new();
        let root = sg.root_id();
        assert!(sg.remove_node(root, DeletePolicy::DestroySubtree).is_err());
    }

    #[test]
    fn z_index_orders_siblings() {
        let mut sg = SceneGraph::new();
        let top = sg
            .add_node(sg.root_id(), Node::rect(id("z_top"), 0.0, 0.0, 1.0, 1.0).with_z(5))
            .unwrap();
        let low = sg
            .add_node(sg.root_id(), Node::rect(id("z_low"), 0.0, 0.0, 1.0, 1.0))
            .unwrap();
        assert_eq!(sg.children(sg.root_id()), vec![low, top]);
        assert_eq!(sg.child_ids(sg.root_id()), vec![top, low]);
    }

    #[test]
    fn subtree_is_preorder() {
        let mut sg = SceneGraph::new();
        group_with_child(&mut sg, "sub_g", "sub_a");
        sg.add_node(id("sub_g"), Node::rect(id("sub_b"), 0.0, 0.0, 1.0, 1.0))
            .unwrap();
        assert_eq!(
            sg.subtree_of(id("sub_g")),
            vec![id("sub_g"), id("sub_a"), id("sub_b")]
        );
    }

    #[test]
    fn world_bounds_cover_children() {
        let mut sg = SceneGraph::new();
        sg.add_node(
            sg.root_id(),
            Node::group(id("wb_g")).with_transform(Transform::at(10.0, 20.0)),
        )
        .unwrap();
        sg.add_node(id("wb_g"), Node::rect(id("wb_a"), 0.0, 0.0, 10.0, 10.0))
            .unwrap();
        sg.add_node(id("wb_g"), Node::rect(id("wb_b"), 30.0, 30.0, 10.0, 10.0))
            .unwrap();
        assert_eq!(
            sg.world_bounds(id("wb_g")),
            Some(Rect::new(10.0, 20.0, 50.0, 60.0))
        );
    }

    #[test]
    fn empty_group_bounds_collapse_to_origin() {
        let mut sg = SceneGraph::new();
        sg.add_node(
            sg.root_id(),
            Node::group(id("empty_g")).with_transform(Transform::at(3.0, 4.0)),
        )
        .unwrap();
        let b = sg.world_bounds(id("empty_g")).unwrap();
        assert_eq!(b, Rect::new(3.0, 4.0, 3.0, 4.0));
    }

    #[test]
    fn set_transform_ignores_non_finite() {
        let mut sg = SceneGraph::new();
        sg.add_node(sg.root_id(), Node::rect(id("nan_t"), 1.0, 2.0, 1.0, 1.0))
            .unwrap();
        sg.set_transform(
            id("nan_t"),
            Transform {
                x: f64::NAN,
                ..Transform::at(9.0, 9.0)
            },
        )
        .unwrap();
        let t = sg.get(id("nan_t")).unwrap().transform;
        assert_eq!((t.x, t.y), (1.0, 9.0));
    }

    #[test]
    fn mutations_bump_revision() {
        let mut sg = SceneGraph::new();
        let r0 = sg.revision();
        sg.add_node(sg.root_id(), Node::rect(id("rev"), 0.0, 0.0, 1.0, 1.0))
            .unwrap();
        let r1 = sg.revision();
        assert!(r1 > r0);
        sg.set_z_index(id("rev"), 3).unwrap();
        assert!(sg.revision() > r1);
    }

    #[test]
    fn next_id_skips_taken_ids() {
        let mut sg = SceneGraph::new();
        sg.add_node(sg.root_id(), Node::rect(id("shape_1"), 0.0, 0.0, 1.0, 1.0))
            .unwrap();
        let fresh = sg.next_id("shape");
        assert_ne!(fresh, id("shape_1"));
        assert!(!sg.contains(fresh));
    }

    #[test]
    fn outermost_drops_nested_selection() {
        let mut sg = SceneGraph::new();
        group_with_child(&mut sg, "om_g", "om_kid");
        sg.add_node(sg.root_id(), Node::rect(id("om_other"), 0.0, 0.0, 1.0, 1.0))
            .unwrap();
        assert_eq!(
            sg.outermost(&[id("om_kid"), id("om_g"), id("om_other")]),
            vec![id("om_g"), id("om_other")]
        );
    }
}
