//! The host-facing editing session.
//!
//! `Engine` owns the `Scene` and routes host input through the
//! interaction controller, the shortcut map and the command history.
//! Hosts pull from it once per animation frame:
//!
//! ```text
//! input ─▶ dispatch_*() ─▶ scene mutated, revision bumped
//! rAF   ─▶ tick_frame()  ─▶ subscribers(revision)   (once, if it moved)
//!       ─▶ render(bridge) ─▶ bridge.render(frame)   (once, if it moved)
//! ```

use crate::commands::{self, Command, History, HistoryStatus};
use crate::config::EngineConfig;
use crate::input::{KeyEvent, PointerEvent, WheelEvent};
use crate::interaction::{Gesture, Interaction, Outcome};
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use kurbo::{Point, Vec2};
use stage_core::model::NodeFlags;
use stage_core::{NodeId, Scene, SceneError, SceneGraph, Surface};
use stage_render::{Frame, RedrawGate, RenderBridge, RenderError};

/// Handle returned by [`Engine::on_scene_changed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Scene-change callback; receives the new revision.
pub type SceneCallback = Box<dyn FnMut(u64)>;

pub struct Engine {
    scene: Scene,
    surface: Surface,
    config: EngineConfig,
    interaction: Interaction,
    history: History,
    subscribers: Vec<(SubscriptionId, SceneCallback)>,
    next_subscription: u64,
    /// Revision last reported to subscribers.
    notified: Option<u64>,
    redraw: RedrawGate,
    /// Surface the bridge was last sized for.
    presented: Option<Surface>,
}

impl Engine {
    /// Start a session over `scene`, drawing into `surface`.
    pub fn mount(surface: Surface, scene: Scene, config: EngineConfig) -> Self {
        log::debug!(
            "mount: {} nodes, {}x{} @{}x",
            scene.graph.len(),
            surface.width,
            surface.height,
            surface.pixel_ratio()
        );
        Self {
            scene,
            surface,
            interaction: Interaction::new(config.clone()),
            config,
            history: History::new(),
            subscribers: Vec::new(),
            next_subscription: 0,
            notified: None,
            redraw: RedrawGate::new(),
            presented: None,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.scene.graph
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn gesture(&self) -> &Gesture {
        self.interaction.gesture()
    }

    pub fn revision(&self) -> u64 {
        self.scene.revision()
    }

    /// Swap in a new scene (e.g. after loading a file). History is reset.
    pub fn load(&mut self, scene: Scene) {
        self.interaction.cancel();
        self.history.clear();
        self.scene = scene;
        self.notified = None;
        self.redraw.invalidate();
        log::debug!("load: {} nodes", self.scene.graph.len());
    }

    /// Make the next `render` draw even if the scene did not change
    /// (theme switch, lost context).
    pub fn request_redraw(&mut self) {
        self.redraw.invalidate();
    }

    pub fn resize(&mut self, surface: Surface) {
        if surface != self.surface {
            self.surface = surface;
            self.redraw.invalidate();
        }
    }

    // ─── Mutation ────────────────────────────────────────────────────────

    /// Apply a command through history.
    pub fn apply(&mut self, command: Command) -> Result<(), SceneError> {
        let result = self.history.apply(&mut self.scene.graph, command);
        if let Err(err) = &result {
            log::warn!("command rejected: {err}");
        }
        self.scene.prune_selection();
        result
    }

    /// Undo the last command. An in-flight gesture is cancelled first.
    pub fn undo(&mut self) -> Result<String, HistoryStatus> {
        self.cancel_gesture();
        let result = self.history.undo(&mut self.scene.graph);
        self.after_history(&result);
        result
    }

    pub fn redo(&mut self) -> Result<String, HistoryStatus> {
        self.cancel_gesture();
        let result = self.history.redo(&mut self.scene.graph);
        self.after_history(&result);
        result
    }

    fn after_history(&mut self, result: &Result<String, HistoryStatus>) {
        if let Err(HistoryStatus::Rejected(err)) = result {
            log::warn!("history replay rejected: {err}");
        }
        self.scene.prune_selection();
    }

    fn cancel_gesture(&mut self) -> bool {
        let cancelled = self.interaction.cancel();
        if cancelled {
            self.scene.graph.touch();
        }
        cancelled
    }

    pub fn select(&mut self, ids: impl IntoIterator<Item = NodeId>) {
        self.scene.set_selection(ids);
    }

    // ─── Input ───────────────────────────────────────────────────────────

    /// Returns `true` if the event changed anything visible.
    pub fn dispatch_pointer_event(&mut self, event: PointerEvent) -> bool {
        match self.interaction.handle(&mut self.scene, &event) {
            Outcome::Unchanged => false,
            Outcome::Redraw => {
                self.scene.graph.touch();
                true
            }
            Outcome::Commit(command) => {
                // The preview is gone either way; redraw even if rejected.
                self.scene.graph.touch();
                let _ = self.apply(command);
                true
            }
        }
    }

    /// Resolve and run a keyboard shortcut. Returns `true` if it was handled.
    pub fn dispatch_key_event(&mut self, event: &KeyEvent) -> bool {
        let Some(action) = ShortcutMap::resolve_event(event) else {
            return false;
        };
        log::debug!("shortcut {:?} -> {action:?}", event.key);
        self.run(action)
    }

    /// Ctrl/⌘ + wheel zooms about the pointer; plain wheel pans.
    pub fn dispatch_wheel_event(&mut self, event: WheelEvent) -> bool {
        let mut viewport = self.scene.viewport();
        if event.modifiers.command() {
            if event.delta.y == 0.0 {
                return false;
            }
            let factor = if event.delta.y < 0.0 {
                self.config.zoom_step
            } else {
                1.0 / self.config.zoom_step
            };
            viewport.zoom_about(event.position, factor, self.config.zoom_min, self.config.zoom_max);
        } else {
            viewport.pan_by(-event.delta);
        }
        let changed = viewport != self.scene.viewport();
        self.scene.set_viewport(viewport);
        changed
    }

    /// Run a shortcut action directly (toolbar buttons, menus).
    pub fn run(&mut self, action: ShortcutAction) -> bool {
        let selected = self.scene.selected_ids();
        let graph = &self.scene.graph;

        let planned: Result<Option<Command>, SceneError> = match action {
            ShortcutAction::Undo => return self.undo().is_ok(),
            ShortcutAction::Redo => return self.redo().is_ok(),
            ShortcutAction::Cancel => {
                if !self.cancel_gesture() {
                    self.scene.clear_selection();
                }
                return true;
            }
            ShortcutAction::SelectAll => {
                let all = graph.children(graph.root_id());
                self.scene.set_selection(all);
                return true;
            }
            ShortcutAction::ZoomIn => return self.zoom_center(self.config.zoom_step),
            ShortcutAction::ZoomOut => return self.zoom_center(1.0 / self.config.zoom_step),
            ShortcutAction::ZoomReset => {
                let zoom = self.scene.viewport().zoom;
                return self.zoom_center(1.0 / zoom);
            }
            // Structural edits wait for the pointer to be released.
            _ if self.interaction.gesture().is_active() => return false,
            ShortcutAction::Delete => commands::delete(graph, &selected, self.config.delete_policy),
            ShortcutAction::Duplicate => {
                let offset = Vec2::new(self.config.duplicate_offset, self.config.duplicate_offset);
                return match commands::duplicate(graph, &selected, offset) {
                    Ok(Some((command, copies))) => {
                        let ok = self.apply(command).is_ok();
                        if ok {
                            self.scene.set_selection(copies);
                        }
                        ok
                    }
                    Ok(None) => false,
                    Err(err) => {
                        log::warn!("duplicate: {err}");
                        false
                    }
                };
            }
            ShortcutAction::Group => {
                let group_id = self.scene.graph.next_id("group");
                return match commands::group(&self.scene.graph, &selected, group_id) {
                    Ok(Some(command)) => {
                        let ok = self.apply(command).is_ok();
                        if ok {
                            self.scene.set_selection([group_id]);
                        }
                        ok
                    }
                    Ok(None) => false,
                    Err(err) => {
                        log::warn!("group: {err}");
                        false
                    }
                };
            }
            ShortcutAction::Ungroup => {
                let freed: Vec<NodeId> = selected.iter().flat_map(|g| graph.child_ids(*g)).collect();
                let planned = chain(graph, &selected, "Ungroup", commands::ungroup);
                return match planned {
                    Ok(Some(command)) => {
                        let ok = self.apply(command).is_ok();
                        if ok {
                            self.scene.set_selection(freed);
                        }
                        ok
                    }
                    Ok(None) => false,
                    Err(err) => {
                        log::warn!("ungroup: {err}");
                        false
                    }
                };
            }
            ShortcutAction::ToggleLock => {
                let lock = selected
                    .iter()
                    .any(|id| graph.get(*id).is_some_and(|n| !n.flags.locked));
                let label = if lock { "Lock" } else { "Unlock" };
                Ok(commands::update_flags(graph, &selected, label, |f| NodeFlags {
                    locked: lock,
                    ..f
                }))
            }
            ShortcutAction::ToggleVisible => {
                let hide = selected
                    .iter()
                    .any(|id| graph.get(*id).is_some_and(|n| n.flags.visible));
                let label = if hide { "Hide" } else { "Show" };
                Ok(commands::update_flags(graph, &selected, label, |f| NodeFlags {
                    visible: !hide,
                    ..f
                }))
            }
            ShortcutAction::Nudge { direction, large } => {
                let step = if large { self.config.nudge_large } else { self.config.nudge };
                let (dx, dy) = direction.unit();
                Ok(commands::nudge(graph, &selected, Vec2::new(dx * step, dy * step)))
            }
            // Visit order keeps selected siblings in their relative order.
            ShortcutAction::BringForward => {
                let top_down: Vec<NodeId> = selected.iter().rev().copied().collect();
                chain(graph, &top_down, "Bring Forward", |g, id| Ok(commands::bring_forward(g, id)))
            }
            ShortcutAction::BringToFront => {
                chain(graph, &selected, "Bring to Front", |g, id| Ok(commands::bring_to_front(g, id)))
            }
            ShortcutAction::SendBackward => {
                chain(graph, &selected, "Send Backward", |g, id| Ok(commands::send_backward(g, id)))
            }
            ShortcutAction::SendToBack => {
                let top_down: Vec<NodeId> = selected.iter().rev().copied().collect();
                chain(graph, &top_down, "Send to Back", |g, id| Ok(commands::send_to_back(g, id)))
            }
        };

        match planned {
            Ok(Some(command)) => self.apply(command).is_ok(),
            Ok(None) => false,
            Err(err) => {
                log::warn!("{action:?}: {err}");
                false
            }
        }
    }

    fn zoom_center(&mut self, factor: f64) -> bool {
        let mut viewport = self.scene.viewport();
        let center = Point::new(self.surface.width / 2.0, self.surface.height / 2.0);
        viewport.zoom_about(center, factor, self.config.zoom_min, self.config.zoom_max);
        let changed = viewport != self.scene.viewport();
        self.scene.set_viewport(viewport);
        changed
    }

    // ─── Frames ──────────────────────────────────────────────────────────

    /// Register a callback fired from `tick_frame` when the scene changed.
    pub fn on_scene_changed(&mut self, callback: impl FnMut(u64) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    /// Notify subscribers if the revision moved since the last tick.
    /// Returns whether they were called.
    pub fn tick_frame(&mut self) -> bool {
        let revision = self.scene.revision();
        if self.notified == Some(revision) {
            return false;
        }
        self.notified = Some(revision);
        log::trace!("tick: revision {revision}, {} subscribers", self.subscribers.len());
        for (_, callback) in &mut self.subscribers {
            callback(revision);
        }
        true
    }

    /// Snapshot for the render bridge: committed scene, gesture preview
    /// and overlay.
    pub fn frame(&self) -> Frame {
        let preview = self.interaction.preview();
        let mut frame = Frame::capture(&self.scene, self.surface, &preview);
        frame.overlay = self
            .interaction
            .overlay(&self.scene, &frame.items, self.scene.viewport());
        frame
    }

    /// Draw through `bridge` if anything changed since the last draw.
    /// The bridge is resized first when the surface changed.
    /// Returns whether a frame was drawn.
    pub fn render(&mut self, bridge: &mut impl RenderBridge) -> Result<bool, RenderError> {
        if !self.redraw.should_draw(self.scene.revision()) {
            return Ok(false);
        }
        if let Err(err) = self.present(bridge) {
            self.redraw.invalidate();
            return Err(err);
        }
        Ok(true)
    }

    fn present(&mut self, bridge: &mut impl RenderBridge) -> Result<(), RenderError> {
        if self.presented != Some(self.surface) {
            bridge.resize(self.surface)?;
            log::debug!("bridge resized to {}x{}", self.surface.width, self.surface.height);
            self.presented = Some(self.surface);
        }
        bridge.render(&self.frame())
    }
}

/// Plan one step per id against a scratch copy of `graph`, each step
/// seeing the previous ones, and fold them into one batch.
fn chain(
    graph: &SceneGraph,
    ids: &[NodeId],
    label: &str,
    mut step: impl FnMut(&SceneGraph, NodeId) -> Result<Option<Command>, SceneError>,
) -> Result<Option<Command>, SceneError> {
    let mut scratch = graph.clone();
    let mut steps = Vec::new();
    for id in ids {
        if let Some(command) = step(&scratch, *id)? {
            command.apply(&mut scratch)?;
            steps.push(command);
        }
    }
    Ok((!steps.is_empty()).then(|| Command::Batch {
        label: label.to_string(),
        commands: steps,
    }))
}
