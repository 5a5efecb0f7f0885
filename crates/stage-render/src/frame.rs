//! Frame snapshots handed to a render bridge.
//!
//! A `Frame` is an immutable, flattened view of the scene: every visible
//! node with its world transform in paint order, plus the editor overlay
//! (selection outlines, handles, marquee). Renderers never walk the graph.

use kurbo::{Affine, Point, Rect, Size};
use stage_core::geometry;
use stage_core::model::{NodeKind, Placement, Style};
use stage_core::{NodeId, Scene, Surface, Viewport};
use std::collections::HashMap;

/// One visible node, resolved to world space.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Local-to-world transform, including any gesture preview.
    pub world: Affine,
    pub size: Size,
    pub style: Style,
    pub selected: bool,
}

impl DrawItem {
    /// Corners of the node's box in world space.
    pub fn world_quad(&self) -> [Point; 4] {
        geometry::quad_to_world(self.world, Rect::from_origin_size(Point::ZERO, self.size))
    }
}

/// A grab handle drawn around the selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandleMark {
    /// Center in world space.
    pub position: Point,
    /// The rotate handle is drawn round; resize handles square.
    pub rotate: bool,
}

/// Editor feedback painted above the scene.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    /// World-space outlines of selected nodes.
    pub selection: Vec<[Point; 4]>,
    pub handles: Vec<HandleMark>,
    /// Outline of the node under the pointer while idle.
    pub hover: Option<[Point; 4]>,
    /// Marquee rectangle in world space.
    pub marquee: Option<Rect>,
    /// Nodes the marquee currently covers, locked ones included.
    pub marquee_hits: Vec<[Point; 4]>,
}

impl Overlay {
    pub fn is_empty(&self) -> bool {
        self.selection.is_empty()
            && self.handles.is_empty()
            && self.hover.is_none()
            && self.marquee.is_none()
            && self.marquee_hits.is_empty()
    }
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub revision: u64,
    pub surface: Surface,
    pub viewport: Viewport,
    /// Back to front.
    pub items: Vec<DrawItem>,
    pub overlay: Overlay,
}

impl Frame {
    /// Snapshot `scene` with preview placements substituted for the
    /// nodes in `overrides`. The overlay starts empty.
    pub fn capture(scene: &Scene, surface: Surface, overrides: &HashMap<NodeId, Placement>) -> Self {
        Self {
            revision: scene.revision(),
            surface,
            viewport: scene.viewport(),
            items: build_display_list(scene, overrides),
            overlay: Overlay::default(),
        }
    }

    /// World → device pixels: device pixel ratio applied over the viewport.
    pub fn view_transform(&self) -> Affine {
        Affine::scale(self.surface.pixel_ratio()) * self.viewport.to_affine()
    }

    /// Overlay line width in world units, so it stays one CSS pixel on screen.
    pub fn hairline(&self) -> f64 {
        self.viewport.screen_len_to_world(1.0)
    }
}

/// Flatten the visible scene into paint order.
///
/// Hidden nodes and their subtrees are omitted. Each override replaces a
/// node's committed placement, and its descendants follow.
pub fn build_display_list(scene: &Scene, overrides: &HashMap<NodeId, Placement>) -> Vec<DrawItem> {
    let graph = &scene.graph;
    let mut items = Vec::new();
    let mut stack: Vec<(NodeId, Affine)> = graph
        .children(graph.root_id())
        .into_iter()
        .rev()
        .map(|id| (id, Affine::IDENTITY))
        .collect();

    while let Some((id, parent_world)) = stack.pop() {
        let Some(node) = graph.get(id) else { continue };
        if !node.flags.visible {
            continue;
        }
        let placement = overrides.get(&id).copied().unwrap_or(node.placement());
        let world = geometry::compose(parent_world, placement.transform.to_affine());

        items.push(DrawItem {
            id,
            kind: node.kind.clone(),
            world,
            size: placement.size,
            style: node.style.clone(),
            selected: scene.is_selected(id),
        });

        for child in graph.children(id).into_iter().rev() {
            stack.push((child, world));
        }
    }
    log::trace!("display list: {} items", items.len());
    items
}
