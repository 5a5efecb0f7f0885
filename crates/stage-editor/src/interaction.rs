//! Pointer interaction state machine.
//!
//! ```text
//! Idle ⇄ Hovering ─down─▶ Dragging | Resizing | Rotating | Marquee ─up/cancel─▶ Idle
//! ```
//!
//! An active gesture never touches the graph. It keeps the start state of
//! its targets and exposes the in-flight result as a *preview* (placement
//! overrides the display list substitutes). Pointer-up turns the preview
//! into a single `Command`; cancel just drops it.
//!
//! ## Modifier behaviors
//!
//! | Modifier | Press on node | Drag | Corner resize | Rotate | Marquee |
//! |----------|---------------|------|---------------|--------|---------|
//! | **Shift** | Toggle selection | Constrain to dominant axis | Keep aspect ratio | Snap angle | Add to selection |

use crate::commands::{self, Command};
use crate::config::EngineConfig;
use crate::input::{Modifiers, PointerButton, PointerEvent};
use kurbo::{Affine, Point, Rect, Size, Vec2};
use smallvec::SmallVec;
use stage_core::geometry;
use stage_core::model::{Placement, Transform};
use stage_core::{HitMode, NodeId, Scene, Viewport};
use stage_render::{DrawItem, HandleMark, Overlay};
use std::collections::HashMap;

// ─── Handles ─────────────────────────────────────────────────────────────

/// Resize handle position on a node's box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl Anchor {
    pub const ALL: [Anchor; 8] = [
        Anchor::TopLeft,
        Anchor::Top,
        Anchor::TopRight,
        Anchor::Right,
        Anchor::BottomRight,
        Anchor::Bottom,
        Anchor::BottomLeft,
        Anchor::Left,
    ];

    /// Position as fractions of width and height.
    pub fn factors(self) -> (f64, f64) {
        match self {
            Anchor::TopLeft => (0.0, 0.0),
            Anchor::Top => (0.5, 0.0),
            Anchor::TopRight => (1.0, 0.0),
            Anchor::Right => (1.0, 0.5),
            Anchor::BottomRight => (1.0, 1.0),
            Anchor::Bottom => (0.5, 1.0),
            Anchor::BottomLeft => (0.0, 1.0),
            Anchor::Left => (0.0, 0.5),
        }
    }

    pub fn is_corner(self) -> bool {
        let (fx, fy) = self.factors();
        fx != 0.5 && fy != 0.5
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    Resize(Anchor),
    Rotate,
}

/// World positions of the handles around a node box.
///
/// `px` is the size of one CSS pixel in world units.
pub fn handle_positions(
    world: Affine,
    size: Size,
    px: f64,
    config: &EngineConfig,
) -> SmallVec<[(Handle, Point); 9]> {
    let mut out: SmallVec<[(Handle, Point); 9]> = Anchor::ALL
        .iter()
        .map(|anchor| {
            let (fx, fy) = anchor.factors();
            (Handle::Resize(*anchor), world * Point::new(fx * size.width, fy * size.height))
        })
        .collect();

    let top_mid = world * Point::new(size.width / 2.0, 0.0);
    let down = geometry::map_vector(world, Vec2::new(0.0, 1.0));
    let down = if down.hypot() > geometry::SINGULAR_EPSILON {
        down.normalize()
    } else {
        Vec2::new(0.0, 1.0)
    };
    out.push((Handle::Rotate, top_mid - down * (config.rotate_handle_offset * px)));
    out
}

// ─── Gesture state ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
struct DragTarget {
    id: NodeId,
    start: Placement,
    /// World → parent space, linear part only matters.
    to_parent: Affine,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragState {
    origin: Point,
    current: Point,
    axis_lock: bool,
    /// Set once the pointer has travelled past the click threshold.
    engaged: bool,
    targets: SmallVec<[DragTarget; 4]>,
}

impl DragState {
    fn delta(&self) -> Vec2 {
        if !self.engaged {
            return Vec2::ZERO;
        }
        let mut d = self.current - self.origin;
        if self.axis_lock {
            if d.x.abs() >= d.y.abs() {
                d.y = 0.0;
            } else {
                d.x = 0.0;
            }
        }
        d
    }

    fn placement_of(&self, target: &DragTarget) -> Placement {
        let local = geometry::map_vector(target.to_parent, self.delta());
        Placement {
            transform: target.start.transform.translated(local),
            size: target.start.size,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResizeState {
    id: NodeId,
    anchor: Anchor,
    start: Placement,
    /// World → node-local at gesture start.
    to_local: Affine,
    current: Point,
    keep_aspect: bool,
}

impl ResizeState {
    fn placement(&self, min_size: f64) -> Placement {
        let (fx, fy) = self.anchor.factors();
        let Size { width: w, height: h } = self.start.size;
        let q = self.to_local * self.current;
        let min = min_size.max(0.0);

        let mut new_w = match fx {
            f if f == 0.0 => (w - q.x).max(min),
            f if f == 1.0 => q.x.max(min),
            _ => w,
        };
        let mut new_h = match fy {
            f if f == 0.0 => (h - q.y).max(min),
            f if f == 1.0 => q.y.max(min),
            _ => h,
        };

        if self.keep_aspect && self.anchor.is_corner() && w > 0.0 && h > 0.0 {
            let s = (new_w / w).max(new_h / h);
            new_w = (w * s).max(min);
            new_h = (h * s).max(min);
        }

        // The edge opposite the handle stays where it was.
        let x0 = if fx == 0.0 { w - new_w } else { 0.0 };
        let y0 = if fy == 0.0 { h - new_h } else { 0.0 };
        let origin = self.start.transform.to_affine() * Point::new(x0, y0);
        Placement {
            transform: Transform {
                x: origin.x,
                y: origin.y,
                ..self.start.transform
            },
            size: Size::new(new_w, new_h),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RotateState {
    id: NodeId,
    start: Placement,
    /// Node center in world space.
    pivot: Point,
    start_angle: f64,
    current: Point,
    snap: bool,
    /// Parent space is mirrored, so world angles run backwards.
    mirrored: bool,
}

impl RotateState {
    fn placement(&self, snap_step: f64) -> Placement {
        let angle = (self.current - self.pivot).atan2();
        let mut delta = angle - self.start_angle;
        if self.mirrored {
            delta = -delta;
        }
        let mut rotation = self.start.transform.rotation + delta;
        if self.snap && snap_step > 0.0 {
            rotation = (rotation / snap_step).round() * snap_step;
        }

        let center = Point::new(self.start.size.width / 2.0, self.start.size.height / 2.0);
        let pivot = self.start.transform.to_affine() * center;
        let spun = Transform {
            x: 0.0,
            y: 0.0,
            rotation,
            ..self.start.transform
        };
        let offset = spun.to_affine() * center;
        Placement {
            transform: Transform {
                x: pivot.x - offset.x,
                y: pivot.y - offset.y,
                ..spun
            },
            size: self.start.size,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarqueeState {
    origin: Point,
    current: Point,
    additive: bool,
    engaged: bool,
}

impl MarqueeState {
    pub fn rect(&self) -> Rect {
        geometry::normalize_rect(self.origin, self.current)
    }
}

/// The controller's explicit state.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Gesture {
    #[default]
    Idle,
    Hovering {
        target: NodeId,
    },
    Dragging(DragState),
    Resizing(ResizeState),
    Rotating(RotateState),
    Marquee(MarqueeState),
}

impl Gesture {
    pub fn name(&self) -> &'static str {
        match self {
            Gesture::Idle => "idle",
            Gesture::Hovering { .. } => "hovering",
            Gesture::Dragging(_) => "dragging",
            Gesture::Resizing(_) => "resizing",
            Gesture::Rotating(_) => "rotating",
            Gesture::Marquee(_) => "marquee",
        }
    }

    /// A pointer is down and a gesture is in flight.
    pub fn is_active(&self) -> bool {
        !matches!(self, Gesture::Idle | Gesture::Hovering { .. })
    }
}

/// What the engine should do after an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Unchanged,
    /// View state (selection, hover, preview) changed; redraw.
    Redraw,
    /// The gesture finished with a change to record.
    Commit(Command),
}

// ─── Controller ──────────────────────────────────────────────────────────

/// Translates pointer events into selection changes, previews and commands.
#[derive(Debug, Clone, Default)]
pub struct Interaction {
    gesture: Gesture,
    config: EngineConfig,
}

impl Interaction {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            gesture: Gesture::Idle,
            config,
        }
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn set_gesture(&mut self, next: Gesture) {
        if self.gesture.name() != next.name() {
            log::debug!("gesture: {} -> {}", self.gesture.name(), next.name());
        }
        self.gesture = next;
    }

    /// Handle a pointer event given in screen (CSS px) coordinates.
    pub fn handle(&mut self, scene: &mut Scene, event: &PointerEvent) -> Outcome {
        let viewport = scene.viewport();
        let px = viewport.screen_len_to_world(1.0);
        let world = |p: Point| viewport.screen_to_world(p);

        match *event {
            PointerEvent::Down {
                position,
                button: PointerButton::Primary,
                modifiers,
            } => self.pointer_down(scene, world(position), px, modifiers),
            PointerEvent::Down { .. } => Outcome::Unchanged,
            PointerEvent::Move {
                position,
                modifiers,
            } => self.pointer_move(scene, world(position), px, modifiers),
            PointerEvent::Up {
                position,
                modifiers,
            } => self.pointer_up(scene, world(position), px, modifiers),
            PointerEvent::Leave => {
                if self.cancel() || matches!(self.gesture, Gesture::Hovering { .. }) {
                    self.set_gesture(Gesture::Idle);
                    Outcome::Redraw
                } else {
                    Outcome::Unchanged
                }
            }
        }
    }

    fn pointer_down(&mut self, scene: &mut Scene, p: Point, px: f64, modifiers: Modifiers) -> Outcome {
        if self.gesture.is_active() {
            return Outcome::Unchanged;
        }

        if let Some(next) = self.grab_handle(scene, p, px, modifiers) {
            self.set_gesture(next);
            return Outcome::Redraw;
        }

        let hit = scene.graph.query_at(p, HitMode::Pick).first().copied();
        let Some(id) = hit else {
            self.set_gesture(Gesture::Marquee(MarqueeState {
                origin: p,
                current: p,
                additive: modifiers.shift,
                engaged: false,
            }));
            return Outcome::Redraw;
        };

        if modifiers.shift {
            scene.toggle_selected(id);
            if !scene.is_selected(id) {
                self.set_gesture(Gesture::Idle);
                return Outcome::Redraw;
            }
        } else if !scene.is_selected(id) {
            scene.set_selection([id]);
        }

        let graph = &scene.graph;
        let targets = graph
            .outermost(&scene.selected_ids())
            .into_iter()
            .filter_map(|target| {
                let node = graph.get(target)?;
                if node.flags.locked {
                    return None;
                }
                let to_parent = geometry::invert(graph.parent_world_transform(target)?).ok()?;
                Some(DragTarget {
                    id: target,
                    start: node.placement(),
                    to_parent,
                })
            })
            .collect();
        self.set_gesture(Gesture::Dragging(DragState {
            origin: p,
            current: p,
            axis_lock: modifiers.shift,
            engaged: false,
            targets,
        }));
        Outcome::Redraw
    }

    /// Start a resize/rotate when `p` is on a handle of the single
    /// selected, unlocked node.
    fn grab_handle(&self, scene: &Scene, p: Point, px: f64, modifiers: Modifiers) -> Option<Gesture> {
        let (id, handle, world) = self.handle_at(scene, p, px)?;
        let node = scene.graph.get(id)?;
        let start = node.placement();
        let to_local = geometry::invert(world).ok()?;

        Some(match handle {
            Handle::Resize(anchor) => Gesture::Resizing(ResizeState {
                id,
                anchor,
                start,
                to_local,
                current: p,
                keep_aspect: modifiers.shift,
            }),
            Handle::Rotate => {
                let pivot = world * Point::new(start.size.width / 2.0, start.size.height / 2.0);
                let mirrored = scene
                    .graph
                    .parent_world_transform(id)
                    .is_some_and(|t| t.determinant() < 0.0);
                Gesture::Rotating(RotateState {
                    id,
                    start,
                    pivot,
                    start_angle: (p - pivot).atan2(),
                    current: p,
                    snap: modifiers.shift,
                    mirrored,
                })
            }
        })
    }

    /// The handle under `p`, if any. Rotate wins over resize.
    pub fn handle_at(&self, scene: &Scene, p: Point, px: f64) -> Option<(NodeId, Handle, Affine)> {
        let id = single_editable(scene)?;
        let node = scene.graph.get(id)?;
        let world = scene.graph.world_transform(id)?;
        let reach = self.config.handle_size * px;

        let mut handles = handle_positions(world, node.size, px, &self.config);
        handles.sort_by_key(|(h, _)| *h != Handle::Rotate);
        handles
            .into_iter()
            .find(|(_, pos)| (*pos - p).hypot() <= reach)
            .map(|(handle, _)| (id, handle, world))
    }

    fn pointer_move(&mut self, scene: &Scene, p: Point, px: f64, modifiers: Modifiers) -> Outcome {
        if !self.gesture.is_active() {
            let next = match scene.graph.query_at(p, HitMode::Pick).first() {
                Some(target) => Gesture::Hovering { target: *target },
                None => Gesture::Idle,
            };
            if next == self.gesture {
                return Outcome::Unchanged;
            }
            self.set_gesture(next);
            return Outcome::Redraw;
        }

        let threshold = self.config.click_threshold * px;
        match &mut self.gesture {
            Gesture::Idle | Gesture::Hovering { .. } => {}
            Gesture::Dragging(drag) => {
                drag.current = p;
                drag.axis_lock = modifiers.shift;
                drag.engaged |= (p - drag.origin).hypot() > threshold;
            }
            Gesture::Resizing(resize) => {
                resize.current = p;
                resize.keep_aspect = modifiers.shift;
            }
            Gesture::Rotating(rotate) => {
                rotate.current = p;
                rotate.snap = modifiers.shift;
            }
            Gesture::Marquee(marquee) => {
                marquee.current = p;
                marquee.engaged |= (p - marquee.origin).hypot() > threshold;
            }
        }
        Outcome::Redraw
    }

    fn pointer_up(&mut self, scene: &mut Scene, p: Point, px: f64, modifiers: Modifiers) -> Outcome {
        if !self.gesture.is_active() {
            return Outcome::Unchanged;
        }
        // Fold the release position in, as if it were one last move.
        self.pointer_move(scene, p, px, modifiers);
        let finished = std::mem::take(&mut self.gesture);
        log::debug!("gesture: {} -> idle (release)", finished.name());

        let command = match &finished {
            Gesture::Dragging(drag) => {
                let steps = drag
                    .targets
                    .iter()
                    .filter_map(|t| commands::transform(&scene.graph, t.id, drag.placement_of(t)))
                    .collect();
                labeled("Move", steps)
            }
            Gesture::Resizing(resize) => {
                let after = resize.placement(self.config.min_size);
                labeled("Resize", commands::transform(&scene.graph, resize.id, after).into_iter().collect())
            }
            Gesture::Rotating(rotate) => {
                let after = rotate.placement(self.config.rotation_snap());
                labeled("Rotate", commands::transform(&scene.graph, rotate.id, after).into_iter().collect())
            }
            Gesture::Marquee(marquee) => {
                if !marquee.engaged {
                    if !marquee.additive {
                        scene.clear_selection();
                    }
                } else {
                    let hits = scene.graph.query_rect(marquee.rect());
                    if marquee.additive {
                        scene.extend_selection(hits);
                    } else {
                        scene.set_selection(hits);
                    }
                }
                None
            }
            Gesture::Idle | Gesture::Hovering { .. } => None,
        };

        match command {
            Some(command) => Outcome::Commit(command),
            None => Outcome::Redraw,
        }
    }

    /// Drop the active gesture without emitting anything.
    /// Returns `false` when nothing was active.
    pub fn cancel(&mut self) -> bool {
        if !self.gesture.is_active() {
            return false;
        }
        self.set_gesture(Gesture::Idle);
        true
    }

    /// In-flight placements of the active gesture.
    pub fn preview(&self) -> HashMap<NodeId, Placement> {
        match &self.gesture {
            Gesture::Dragging(drag) if drag.engaged => drag
                .targets
                .iter()
                .map(|t| (t.id, drag.placement_of(t)))
                .collect(),
            Gesture::Resizing(resize) => {
                HashMap::from([(resize.id, resize.placement(self.config.min_size))])
            }
            Gesture::Rotating(rotate) => {
                HashMap::from([(rotate.id, rotate.placement(self.config.rotation_snap()))])
            }
            _ => HashMap::new(),
        }
    }

    /// Editor feedback for the current state, built from the frame's
    /// display list so outlines follow the preview.
    pub fn overlay(&self, scene: &Scene, items: &[DrawItem], viewport: Viewport) -> Overlay {
        let px = viewport.screen_len_to_world(1.0);
        let quad_of = |id: NodeId| items.iter().find(|i| i.id == id).map(DrawItem::world_quad);

        let mut overlay = Overlay {
            selection: items.iter().filter(|i| i.selected).map(DrawItem::world_quad).collect(),
            ..Overlay::default()
        };

        if let Some(id) = single_editable(scene)
            && let Some(item) = items.iter().find(|i| i.id == id)
            && !matches!(self.gesture, Gesture::Marquee(_))
        {
            overlay.handles = handle_positions(item.world, item.size, px, &self.config)
                .into_iter()
                .map(|(handle, position)| HandleMark {
                    position,
                    rotate: handle == Handle::Rotate,
                })
                .collect();
        }

        match &self.gesture {
            Gesture::Hovering { target } if !scene.is_selected(*target) => {
                overlay.hover = quad_of(*target);
            }
            Gesture::Marquee(marquee) if marquee.engaged => {
                let rect = marquee.rect();
                overlay.marquee = Some(rect);
                overlay.marquee_hits = scene
                    .graph
                    .query_rect(rect)
                    .into_iter()
                    .filter_map(quad_of)
                    .collect();
            }
            _ => {}
        }
        overlay
    }
}

/// The selected node when exactly one unlocked node is selected.
fn single_editable(scene: &Scene) -> Option<NodeId> {
    let selection = scene.selection();
    if selection.len() != 1 {
        return None;
    }
    let id = *selection.iter().next()?;
    let node = scene.graph.get(id)?;
    (!node.flags.locked && node.flags.visible).then_some(id)
}

fn labeled(label: &str, commands: Vec<Command>) -> Option<Command> {
    (!commands.is_empty()).then(|| Command::Batch {
        label: label.to_string(),
        commands,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;
    use pretty_assertions::assert_eq;
    use stage_core::model::Node;

    fn id(s: &str) -> NodeId {
        NodeId::intern(s)
    }

    fn scene_with_rect(name: &str) -> Scene {
        let mut scene = Scene::new();
        let root = scene.graph.root_id();
        scene
            .graph
            .add_node(root, Node::rect(id(name), 0.0, 0.0, 100.0, 100.0))
            .unwrap();
        scene
    }

    fn press(ix: &mut Interaction, scene: &mut Scene, x: f64, y: f64, m: Modifiers) -> Outcome {
        ix.handle(scene, &PointerEvent::down(x, y, m))
    }

    fn drag_to(ix: &mut Interaction, scene: &mut Scene, x: f64, y: f64, m: Modifiers) -> Outcome {
        ix.handle(scene, &PointerEvent::moved(x, y, m));
        ix.handle(scene, &PointerEvent::up(x, y, m))
    }

    fn commit(outcome: Outcome) -> Command {
        match outcome {
            Outcome::Commit(command) => command,
            other => panic!("expected a commit, got {other:?}"),
        }
    }

    #[test]
    fn hover_tracks_topmost() {
        let mut scene = scene_with_rect("ix_hover");
        let mut ix = Interaction::default();
        assert_eq!(
            ix.handle(&mut scene, &PointerEvent::moved(50.0, 50.0, Modifiers::NONE)),
            Outcome::Redraw
        );
        assert_eq!(
            *ix.gesture(),
            Gesture::Hovering {
                target: id("ix_hover")
            }
        );
        assert_eq!(
            ix.handle(&mut scene, &PointerEvent::moved(51.0, 50.0, Modifiers::NONE)),
            Outcome::Unchanged
        );
        ix.handle(&mut scene, &PointerEvent::moved(500.0, 50.0, Modifiers::NONE));
        assert_eq!(*ix.gesture(), Gesture::Idle);
    }

    #[test]
    fn drag_commits_one_move() {
        let mut scene = scene_with_rect("ix_drag");
        let mut ix = Interaction::default();
        press(&mut ix, &mut scene, 10.0, 10.0, Modifiers::NONE);
        assert!(scene.is_selected(id("ix_drag")));

        ix.handle(&mut scene, &PointerEvent::moved(30.0, 10.0, Modifiers::NONE));
        let preview = ix.preview();
        assert_eq!(preview[&id("ix_drag")].transform.x, 20.0);
        // Committed state untouched while dragging.
        assert_eq!(scene.graph.get(id("ix_drag")).unwrap().transform.x, 0.0);

        let cmd = commit(drag_to(&mut ix, &mut scene, 60.0, 10.0, Modifiers::NONE));
        assert_eq!(cmd.label(), "Move");
        cmd.apply(&mut scene.graph).unwrap();
        assert_eq!(scene.graph.get(id("ix_drag")).unwrap().transform.x, 50.0);
        assert_eq!(*ix.gesture(), Gesture::Idle);
    }

    #[test]
    fn click_without_travel_emits_nothing() {
        let mut scene = scene_with_rect("ix_click");
        let mut ix = Interaction::default();
        press(&mut ix, &mut scene, 10.0, 10.0, Modifiers::NONE);
        assert_eq!(drag_to(&mut ix, &mut scene, 11.0, 10.0, Modifiers::NONE), Outcome::Redraw);
    }

    #[test]
    fn shift_drag_locks_axis() {
        let mut scene = scene_with_rect("ix_axis");
        let mut ix = Interaction::default();
        press(&mut ix, &mut scene, 10.0, 10.0, Modifiers::NONE);
        let cmd = commit(drag_to(&mut ix, &mut scene, 50.0, 18.0, Modifiers::SHIFT));
        cmd.apply(&mut scene.graph).unwrap();
        let t = scene.graph.get(id("ix_axis")).unwrap().transform;
        assert_eq!((t.x, t.y), (40.0, 0.0));
    }

    #[test]
    fn cancel_reverts_preview() {
        let mut scene = scene_with_rect("ix_cancel");
        let mut ix = Interaction::default();
        press(&mut ix, &mut scene, 10.0, 10.0, Modifiers::NONE);
        ix.handle(&mut scene, &PointerEvent::moved(80.0, 80.0, Modifiers::NONE));
        assert!(!ix.preview().is_empty());
        assert!(ix.cancel());
        assert!(ix.preview().is_empty());
        assert_eq!(*ix.gesture(), Gesture::Idle);
        assert_eq!(
            ix.handle(&mut scene, &PointerEvent::up(80.0, 80.0, Modifiers::NONE)),
            Outcome::Unchanged
        );
        assert!(!ix.cancel());
    }

    #[test]
    fn locked_node_is_not_dragged() {
        let mut scene = Scene::new();
        let root = scene.graph.root_id();
        scene
            .graph
            .add_node(root, Node::rect(id("ix_locked"), 0.0, 0.0, 100.0, 100.0).locked())
            .unwrap();
        let mut ix = Interaction::default();
        press(&mut ix, &mut scene, 10.0, 10.0, Modifiers::NONE);
        assert!(matches!(ix.gesture(), Gesture::Marquee(_)));
    }

    #[test]
    fn marquee_selects_intersecting_nodes() {
        let mut scene = Scene::new();
        let root = scene.graph.root_id();
        for (name, x) in [("mq_a", 0.0), ("mq_b", 50.0), ("mq_far", 500.0)] {
            scene
                .graph
                .add_node(root, Node::rect(id(name), x, 200.0, 20.0, 20.0))
                .unwrap();
        }
        let mut ix = Interaction::default();
        press(&mut ix, &mut scene, -10.0, 190.0, Modifiers::NONE);
        ix.handle(&mut scene, &PointerEvent::moved(60.0, 230.0, Modifiers::NONE));

        let overlay = ix.overlay(&scene, &[], scene.viewport());
        assert_eq!(overlay.marquee, Some(Rect::new(-10.0, 190.0, 60.0, 230.0)));

        drag_to(&mut ix, &mut scene, 60.0, 230.0, Modifiers::NONE);
        assert_eq!(scene.selected_ids(), vec![id("mq_a"), id("mq_b")]);

        // A click on empty canvas clears it.
        press(&mut ix, &mut scene, 1000.0, 1000.0, Modifiers::NONE);
        ix.handle(&mut scene, &PointerEvent::up(1000.0, 1000.0, Modifiers::NONE));
        assert!(scene.selection().is_empty());
    }

    #[test]
    fn resize_from_top_left_keeps_opposite_corner() {
        let mut scene = scene_with_rect("ix_resize");
        scene.set_selection([id("ix_resize")]);
        let mut ix = Interaction::default();
        press(&mut ix, &mut scene, 0.0, 0.0, Modifiers::NONE);
        assert!(matches!(ix.gesture(), Gesture::Resizing(_)));

        let cmd = commit(drag_to(&mut ix, &mut scene, 20.0, 30.0, Modifiers::NONE));
        assert_eq!(cmd.label(), "Resize");
        cmd.apply(&mut scene.graph).unwrap();
        let node = scene.graph.get(id("ix_resize")).unwrap();
        assert_eq!((node.transform.x, node.transform.y), (20.0, 30.0));
        assert_eq!(node.size, Size::new(80.0, 70.0));
    }

    #[test]
    fn resize_clamps_to_min_size() {
        let mut scene = scene_with_rect("ix_min");
        scene.set_selection([id("ix_min")]);
        let mut ix = Interaction::new(EngineConfig {
            min_size: 5.0,
            ..EngineConfig::default()
        });
        press(&mut ix, &mut scene, 100.0, 50.0, Modifiers::NONE);
        ix.handle(&mut scene, &PointerEvent::moved(-40.0, 50.0, Modifiers::NONE));
        let p = ix.preview()[&id("ix_min")];
        assert_eq!(p.size, Size::new(5.0, 100.0));
        assert_eq!(p.transform.x, 0.0);
    }

    #[test]
    fn shift_corner_resize_keeps_aspect() {
        let mut scene = Scene::new();
        let root = scene.graph.root_id();
        scene
            .graph
            .add_node(root, Node::rect(id("ix_aspect"), 0.0, 0.0, 100.0, 50.0))
            .unwrap();
        scene.set_selection([id("ix_aspect")]);
        let mut ix = Interaction::default();
        press(&mut ix, &mut scene, 100.0, 50.0, Modifiers::SHIFT);
        ix.handle(&mut scene, &PointerEvent::moved(200.0, 60.0, Modifiers::SHIFT));
        assert_eq!(ix.preview()[&id("ix_aspect")].size, Size::new(200.0, 100.0));
    }

    #[test]
    fn rotate_pivots_on_center_and_snaps() {
        let mut scene = scene_with_rect("ix_rot");
        scene.set_selection([id("ix_rot")]);
        let config = EngineConfig::default();
        let mut ix = Interaction::new(config.clone());
        // Rotate handle sits above the top edge's midpoint.
        let grab = Point::new(50.0, -config.rotate_handle_offset);
        press(&mut ix, &mut scene, grab.x, grab.y, Modifiers::NONE);
        assert!(matches!(ix.gesture(), Gesture::Rotating(_)));

        // Quarter turn clockwise, slightly off; Shift snaps it.
        ix.handle(&mut scene, &PointerEvent::moved(150.0, 52.0, Modifiers::SHIFT));
        let p = ix.preview()[&id("ix_rot")];
        assert!(approx_eq!(f64, p.transform.rotation, std::f64::consts::FRAC_PI_2, epsilon = 1e-9));
        let center = p.transform.to_affine() * Point::new(50.0, 50.0);
        assert!(approx_eq!(f64, center.x, 50.0, epsilon = 1e-9));
        assert!(approx_eq!(f64, center.y, 50.0, epsilon = 1e-9));
    }

    #[test]
    fn overlay_outlines_selection_and_handles() {
        let mut scene = scene_with_rect("ix_ov");
        scene.set_selection([id("ix_ov")]);
        let ix = Interaction::default();
        let items = stage_render::build_display_list(&scene, &ix.preview());
        let overlay = ix.overlay(&scene, &items, scene.viewport());
        assert_eq!(overlay.selection.len(), 1);
        assert_eq!(overlay.handles.len(), 9);
        assert_eq!(overlay.handles.iter().filter(|h| h.rotate).count(), 1);
    }

    #[test]
    fn secondary_button_is_ignored() {
        let mut scene = scene_with_rect("ix_rmb");
        let mut ix = Interaction::default();
        let event = PointerEvent::Down {
            position: Point::new(10.0, 10.0),
            button: PointerButton::Secondary,
            modifiers: Modifiers::NONE,
        };
        assert_eq!(ix.handle(&mut scene, &event), Outcome::Unchanged);
        assert!(scene.selection().is_empty());
    }
}
