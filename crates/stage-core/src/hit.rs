//! Hit testing: point → node lookup.
//!
//! Reverse-walks the paint order (front-to-back) to find which nodes are
//! at a given world position. Children paint above their parent, so a
//! node's subtree is searched before the node itself.

use crate::geometry;
use crate::graph::{HitMode, SceneGraph};
use crate::id::NodeId;
use crate::model::*;
use kurbo::{Affine, Point, Rect};
use petgraph::graph::NodeIndex;

/// Nodes under `point`, topmost first.
///
/// In `Pick` mode the walk stops at the first unlocked hit; in `All` mode
/// it collects every hit, locked nodes included. Hidden subtrees are
/// skipped in both modes.
pub fn query_at(graph: &SceneGraph, point: Point, mode: HitMode) -> Vec<NodeId> {
    let mut out = Vec::new();
    walk_point(graph, graph.root_index(), Affine::IDENTITY, point, mode, &mut out);
    log::trace!("query_at {point:?} ({mode:?}) -> {out:?}");
    out
}

/// Returns `true` once the walk should stop.
fn walk_point(
    graph: &SceneGraph,
    idx: NodeIndex,
    world: Affine,
    point: Point,
    mode: HitMode,
    out: &mut Vec<NodeId>,
) -> bool {
    let node = graph.node_at(idx);
    if !node.flags.visible {
        return false;
    }

    // Check children in reverse (topmost first)
    for child in graph.painted_children(idx).into_iter().rev() {
        let child_world = geometry::compose(world, graph.node_at(child).transform.to_affine());
        if walk_point(graph, child, child_world, point, mode, out) {
            return true;
        }
    }

    if matches!(node.kind, NodeKind::Root) || !contains_point(node, world, point) {
        return false;
    }
    match mode {
        HitMode::Pick if node.flags.locked => false,
        HitMode::Pick => {
            out.push(node.id);
            true
        }
        HitMode::All => {
            out.push(node.id);
            false
        }
    }
}

/// Point-in-shape test for a single node, ignoring its children.
///
/// Singular transforms and zero-size boxes never contain a point. Groups
/// have no body of their own, whatever their stored size.
pub fn contains_point(node: &Node, world: Affine, point: Point) -> bool {
    let Ok(local) = geometry::to_local(world, point) else {
        return false;
    };
    match &node.kind {
        NodeKind::Root | NodeKind::Group => false,
        NodeKind::Shape(ShapeKind::Ellipse) => geometry::ellipse_contains(node.size, local),
        NodeKind::Shape(ShapeKind::Rect) | NodeKind::Text { .. } | NodeKind::Image { .. } => {
            node.has_area() && geometry::rect_contains(node.local_rect(), local)
        }
    }
}

/// Find all visible non-root nodes whose world bounding box intersects
/// `rect`, topmost first. Locked nodes are included.
pub fn query_rect(graph: &SceneGraph, rect: Rect) -> Vec<NodeId> {
    let mut out = Vec::new();
    collect_intersecting(graph, graph.root_index(), rect, &mut out);
    out.reverse();
    out
}

fn collect_intersecting(graph: &SceneGraph, idx: NodeIndex, rect: Rect, out: &mut Vec<NodeId>) {
    let node = graph.node_at(idx);
    if !node.flags.visible {
        return;
    }

    if !matches!(node.kind, NodeKind::Root)
        && let Some(bounds) = graph.world_bounds(node.id)
        && geometry::rects_intersect(bounds, rect)
    {
        out.push(node.id);
    }

    for child in graph.painted_children(idx) {
        collect_intersecting(graph, child, rect, out);
    }
}
