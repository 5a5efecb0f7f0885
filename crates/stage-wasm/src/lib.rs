//! WASM bridge for Stage — exposes the editing engine to JavaScript.
//!
//! Compiled via `wasm-pack build --target web`. The host page forwards DOM
//! pointer/keyboard/wheel events, calls `tick_frame` + `render` from
//! `requestAnimationFrame`, and persists scenes through `save_json`.

mod render2d;

use stage_core::kurbo::{Point, Vec2};
use stage_core::{NodeId, Scene, Surface};
use stage_editor::{
    Engine, EngineConfig, KeyEvent, Modifiers, PointerButton, PointerEvent, ShortcutAction,
    ShortcutMap, SubscriptionId, WheelEvent,
};
use wasm_bindgen::prelude::*;
use web_sys::CanvasRenderingContext2d;

/// The WASM-facing canvas controller.
///
/// Owns the engine session. All interaction from JS goes through here;
/// errors surface as `false` or a JSON string, never as exceptions.
#[wasm_bindgen]
pub struct StageCanvas {
    engine: Engine,
    /// Handles given to JS, indexed by the number returned from `on_scene_changed`.
    subscriptions: Vec<Option<SubscriptionId>>,
    dark_mode: bool,
}

#[wasm_bindgen]
impl StageCanvas {
    /// Create a controller for a surface of `width`×`height` CSS pixels.
    /// `config_json` may override any `EngineConfig` field.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64, device_pixel_ratio: f64, config_json: Option<String>) -> Self {
        console_error_panic_hook_setup();

        let config = match config_json.as_deref().map(EngineConfig::from_json) {
            Some(Ok(config)) => config,
            Some(Err(err)) => {
                log::warn!("{err}; using defaults");
                EngineConfig::default()
            }
            None => EngineConfig::default(),
        };
        let surface = Surface {
            width,
            height,
            device_pixel_ratio,
        };
        Self {
            engine: Engine::mount(surface, Scene::new(), config),
            subscriptions: Vec::new(),
            dark_mode: false,
        }
    }

    // ─── Documents ───────────────────────────────────────────────────────

    /// Replace the scene with a JSON document.
    /// Returns `true` on success, `false` on a malformed document.
    pub fn load_json(&mut self, json: &str) -> bool {
        match stage_core::from_json(json) {
            Ok(graph) => {
                self.engine.load(Scene::from_graph(graph));
                true
            }
            Err(err) => {
                log::warn!("load failed: {err}");
                false
            }
        }
    }

    /// The current scene as a JSON document, or `""` if it cannot be encoded.
    pub fn save_json(&self) -> String {
        stage_core::to_json(self.engine.graph()).unwrap_or_else(|err| {
            log::warn!("save failed: {err}");
            String::new()
        })
    }

    /// Binary snapshot (MessagePack) of the scene.
    pub fn save_snapshot(&self) -> Vec<u8> {
        stage_core::to_msgpack(self.engine.graph()).unwrap_or_default()
    }

    pub fn load_snapshot(&mut self, bytes: &[u8]) -> bool {
        match stage_core::from_msgpack(bytes) {
            Ok(graph) => {
                self.engine.load(Scene::from_graph(graph));
                true
            }
            Err(err) => {
                log::warn!("snapshot load failed: {err}");
                false
            }
        }
    }

    // ─── Surface & rendering ─────────────────────────────────────────────

    pub fn resize(&mut self, width: f64, height: f64, device_pixel_ratio: f64) {
        self.engine.resize(Surface {
            width,
            height,
            device_pixel_ratio,
        });
    }

    /// Set the canvas theme.
    pub fn set_theme(&mut self, is_dark: bool) {
        if self.dark_mode != is_dark {
            self.dark_mode = is_dark;
            self.engine.request_redraw();
        }
    }

    /// Fire scene-change callbacks if the scene moved since the last tick.
    pub fn tick_frame(&mut self) -> bool {
        self.engine.tick_frame()
    }

    /// Draw to a Canvas2D context if anything changed. Returns `true` if drawn.
    pub fn render(&mut self, ctx: &CanvasRenderingContext2d) -> bool {
        let theme = if self.dark_mode {
            render2d::CanvasTheme::dark()
        } else {
            render2d::CanvasTheme::light()
        };
        let mut renderer = render2d::Canvas2dRenderer::new(ctx, theme);
        match self.engine.render(&mut renderer) {
            Ok(drawn) => drawn,
            Err(err) => {
                log::warn!("render failed: {err}");
                false
            }
        }
    }

    /// Register `callback(revision)`; returns a handle for `unsubscribe`.
    pub fn on_scene_changed(&mut self, callback: js_sys::Function) -> u32 {
        let id = self.engine.on_scene_changed(move |revision| {
            let _ = callback.call1(&JsValue::NULL, &JsValue::from_f64(revision as f64));
        });
        self.subscriptions.push(Some(id));
        (self.subscriptions.len() - 1) as u32
    }

    pub fn unsubscribe(&mut self, handle: u32) -> bool {
        let Some(slot) = self.subscriptions.get_mut(handle as usize) else {
            return false;
        };
        match slot.take() {
            Some(id) => self.engine.unsubscribe(id),
            None => false,
        }
    }

    pub fn revision(&self) -> f64 {
        self.engine.revision() as f64
    }

    // ─── Pointer / wheel ─────────────────────────────────────────────────

    /// Handle pointer down. Returns true if anything visible changed.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_down(
        &mut self,
        x: f64,
        y: f64,
        button: i16,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> bool {
        self.engine.dispatch_pointer_event(PointerEvent::Down {
            position: Point::new(x, y),
            button: PointerButton::from_dom(button),
            modifiers: modifiers(shift, ctrl, alt, meta),
        })
    }

    pub fn handle_pointer_move(&mut self, x: f64, y: f64, shift: bool, ctrl: bool, alt: bool, meta: bool) -> bool {
        self.engine
            .dispatch_pointer_event(PointerEvent::moved(x, y, modifiers(shift, ctrl, alt, meta)))
    }

    pub fn handle_pointer_up(&mut self, x: f64, y: f64, shift: bool, ctrl: bool, alt: bool, meta: bool) -> bool {
        self.engine
            .dispatch_pointer_event(PointerEvent::up(x, y, modifiers(shift, ctrl, alt, meta)))
    }

    pub fn handle_pointer_leave(&mut self) -> bool {
        self.engine.dispatch_pointer_event(PointerEvent::Leave)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn handle_wheel(
        &mut self,
        x: f64,
        y: f64,
        dx: f64,
        dy: f64,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> bool {
        self.engine.dispatch_wheel_event(WheelEvent {
            position: Point::new(x, y),
            delta: Vec2::new(dx, dy),
            modifiers: modifiers(shift, ctrl, alt, meta),
        })
    }

    // ─── Keyboard Shortcut API ───────────────────────────────────────────

    /// Handle a keyboard event. Returns a JSON string:
    /// `{"handled":bool, "action":"<action_name>"}`
    pub fn handle_key(&mut self, key: &str, ctrl: bool, shift: bool, alt: bool, meta: bool) -> String {
        let action = ShortcutMap::resolve(key, ctrl, shift, alt, meta);
        let handled = self
            .engine
            .dispatch_key_event(&KeyEvent::new(key, modifiers(shift, ctrl, alt, meta)));
        let name = action.map_or("none", action_to_name);
        format!(r#"{{"handled":{handled},"action":"{name}"}}"#)
    }

    // ─── History ─────────────────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        self.engine.undo().is_ok()
    }

    pub fn redo(&mut self) -> bool {
        self.engine.redo().is_ok()
    }

    pub fn can_undo(&self) -> bool {
        self.engine.history().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.engine.history().can_redo()
    }

    /// Label of the next undo step, or `""`.
    pub fn undo_label(&self) -> String {
        self.engine.history().undo_label().unwrap_or_default().to_string()
    }

    pub fn redo_label(&self) -> String {
        self.engine.history().redo_label().unwrap_or_default().to_string()
    }

    // ─── Selection queries ───────────────────────────────────────────────

    /// Selected node IDs as a JSON array, back to front.
    pub fn get_selected_ids(&self) -> String {
        let selected = self.engine.scene().selected_ids();
        let ids: Vec<&str> = selected.iter().map(|id| id.as_str()).collect();
        serde_json::to_string(&ids).unwrap_or_else(|_| "[]".to_string())
    }

    /// Replace the selection with a single node. Returns `false` if unknown
    /// or not selectable.
    pub fn select_by_id(&mut self, node_id: &str) -> bool {
        let id = NodeId::intern(node_id);
        if id.is_root() || !self.engine.graph().contains(id) {
            return false;
        }
        self.engine.select([id]);
        true
    }

    pub fn clear_selection(&mut self) {
        self.engine.select(std::iter::empty());
    }

    /// Topmost pickable node under a screen point, or `""`.
    pub fn hit_test(&self, x: f64, y: f64) -> String {
        let scene = self.engine.scene();
        let world = scene.viewport().screen_to_world(Point::new(x, y));
        scene
            .graph
            .query_at(world, stage_core::HitMode::Pick)
            .first()
            .map(|id| id.as_str().to_string())
            .unwrap_or_default()
    }

    /// World-space bounds as JSON `{"x","y","width","height"}`, or `""`.
    pub fn get_node_bounds(&self, node_id: &str) -> String {
        let id = NodeId::intern(node_id);
        match self.engine.graph().world_bounds(id) {
            Some(b) => serde_json::json!({
                "x": b.x0,
                "y": b.y0,
                "width": b.width(),
                "height": b.height(),
            })
            .to_string(),
            None => String::new(),
        }
    }
}

fn modifiers(shift: bool, ctrl: bool, alt: bool, meta: bool) -> Modifiers {
    Modifiers {
        shift,
        ctrl,
        alt,
        meta,
    }
}

fn action_to_name(action: ShortcutAction) -> &'static str {
    match action {
        ShortcutAction::Undo => "undo",
        ShortcutAction::Redo => "redo",
        ShortcutAction::Delete => "delete",
        ShortcutAction::SelectAll => "selectAll",
        ShortcutAction::Duplicate => "duplicate",
        ShortcutAction::Group => "group",
        ShortcutAction::Ungroup => "ungroup",
        ShortcutAction::ToggleLock => "toggleLock",
        ShortcutAction::ToggleVisible => "toggleVisible",
        ShortcutAction::Nudge { .. } => "nudge",
        ShortcutAction::ZoomIn => "zoomIn",
        ShortcutAction::ZoomOut => "zoomOut",
        ShortcutAction::ZoomReset => "zoomReset",
        ShortcutAction::SendBackward => "sendBackward",
        ShortcutAction::BringForward => "bringForward",
        ShortcutAction::SendToBack => "sendToBack",
        ShortcutAction::BringToFront => "bringToFront",
        ShortcutAction::Cancel => "cancel",
    }
}

// ─── Panic hook for WASM debugging ───────────────────────────────────────

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Stage WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

// ─── Standalone validation (no canvas needed) ────────────────────────────

/// Validate a scene document. Returns JSON: `{"ok":true,"nodes":N}` or
/// `{"ok":false,"error":"..."}`.
#[wasm_bindgen]
pub fn validate(json: &str) -> String {
    match stage_core::from_json(json) {
        Ok(graph) => serde_json::json!({ "ok": true, "nodes": graph.len() }).to_string(),
        Err(err) => serde_json::json!({ "ok": false, "error": err.to_string() }).to_string(),
    }
}
