//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s.
//! The shortcut map lives in Rust so it's shared across WASM and native.
//!
//! - ⌘/Ctrl = command modifier
//! - Shift = larger nudge, or the "opposite" of a command (redo, ungroup)
//! - Escape cancels an active gesture, otherwise clears the selection

use crate::input::KeyEvent;

/// Arrow direction for nudging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// Unit step in world axes (y grows downward).
    pub fn unit(self) -> (f64, f64) {
        match self {
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
            Direction::Up => (0.0, -1.0),
            Direction::Down => (0.0, 1.0),
        }
    }
}

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    // ── Edit ──
    Undo,
    Redo,
    Delete,
    SelectAll,
    Duplicate,
    Group,
    Ungroup,
    ToggleLock,
    ToggleVisible,
    Nudge { direction: Direction, large: bool },

    // ── View ──
    ZoomIn,
    ZoomOut,
    ZoomReset,

    // ── Z-order ──
    SendBackward,
    BringForward,
    SendToBack,
    BringToFront,

    // ── UI ──
    /// Cancel the active gesture, or clear the selection when idle.
    Cancel,
}

/// Resolves key events into shortcut actions.
///
/// Uses platform-aware modifier detection: on macOS `meta` is ⌘,
/// on other platforms `ctrl` serves the same role.
pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action.
    ///
    /// `key` is the `KeyboardEvent.key` value (e.g. `"z"`, `"Delete"`).
    /// Returns `None` if the key combo has no binding.
    pub fn resolve(key: &str, ctrl: bool, shift: bool, _alt: bool, meta: bool) -> Option<ShortcutAction> {
        let cmd = ctrl || meta;

        if let Some(direction) = arrow(key)
            && !cmd
        {
            return Some(ShortcutAction::Nudge {
                direction,
                large: shift,
            });
        }

        // ── Modifier combos first (most specific) ──
        if cmd && shift {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Redo),
                "g" | "G" => Some(ShortcutAction::Ungroup),
                "h" | "H" => Some(ShortcutAction::ToggleVisible),
                "l" | "L" => Some(ShortcutAction::ToggleLock),
                "[" | "{" => Some(ShortcutAction::SendToBack),
                "]" | "}" => Some(ShortcutAction::BringToFront),
                _ => None,
            };
        }

        if cmd {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Undo),
                "y" | "Y" => Some(ShortcutAction::Redo),
                "a" | "A" => Some(ShortcutAction::SelectAll),
                "d" | "D" => Some(ShortcutAction::Duplicate),
                "g" | "G" => Some(ShortcutAction::Group),
                "=" | "+" => Some(ShortcutAction::ZoomIn),
                "-" => Some(ShortcutAction::ZoomOut),
                "0" => Some(ShortcutAction::ZoomReset),
                "[" => Some(ShortcutAction::SendBackward),
                "]" => Some(ShortcutAction::BringForward),
                _ => None,
            };
        }

        if shift {
            return None;
        }

        // ── Single keys (no modifiers) ──
        match key {
            "Delete" | "Backspace" => Some(ShortcutAction::Delete),
            "Escape" => Some(ShortcutAction::Cancel),
            _ => None,
        }
    }

    pub fn resolve_event(event: &KeyEvent) -> Option<ShortcutAction> {
        let m = event.modifiers;
        Self::resolve(&event.key, m.ctrl, m.shift, m.alt, m.meta)
    }
}

fn arrow(key: &str) -> Option<Direction> {
    match key {
        "ArrowLeft" => Some(Direction::Left),
        "ArrowRight" => Some(Direction::Right),
        "ArrowUp" => Some(Direction::Up),
        "ArrowDown" => Some(Direction::Down),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Modifiers;

    #[test]
    fn resolve_undo_redo() {
        // Cmd+Z → Undo
        assert_eq!(
            ShortcutMap::resolve("z", false, false, false, true),
            Some(ShortcutAction::Undo)
        );
        // Ctrl+Z → Undo
        assert_eq!(
            ShortcutMap::resolve("z", true, false, false, false),
            Some(ShortcutAction::Undo)
        );
        // Cmd+Shift+Z → Redo
        assert_eq!(
            ShortcutMap::resolve("Z", false, true, false, true),
            Some(ShortcutAction::Redo)
        );
        // Ctrl+Y → Redo
        assert_eq!(
            ShortcutMap::resolve("y", true, false, false, false),
            Some(ShortcutAction::Redo)
        );
    }

    #[test]
    fn resolve_delete() {
        assert_eq!(
            ShortcutMap::resolve("Delete", false, false, false, false),
            Some(ShortcutAction::Delete)
        );
        assert_eq!(
            ShortcutMap::resolve("Backspace", false, false, false, false),
            Some(ShortcutAction::Delete)
        );
    }

    #[test]
    fn resolve_z_order() {
        assert_eq!(
            ShortcutMap::resolve("[", false, false, false, true),
            Some(ShortcutAction::SendBackward)
        );
        assert_eq!(
            ShortcutMap::resolve("]", false, false, false, true),
            Some(ShortcutAction::BringForward)
        );
        assert_eq!(
            ShortcutMap::resolve("[", false, true, false, true),
            Some(ShortcutAction::SendToBack)
        );
        assert_eq!(
            ShortcutMap::resolve("]", false, true, false, true),
            Some(ShortcutAction::BringToFront)
        );
    }

    #[test]
    fn resolve_grouping() {
        assert_eq!(
            ShortcutMap::resolve("g", true, false, false, false),
            Some(ShortcutAction::Group)
        );
        assert_eq!(
            ShortcutMap::resolve("G", true, true, false, false),
            Some(ShortcutAction::Ungroup)
        );
        assert_eq!(
            ShortcutMap::resolve("l", false, true, false, true),
            Some(ShortcutAction::ToggleLock)
        );
        assert_eq!(
            ShortcutMap::resolve("h", false, true, false, true),
            Some(ShortcutAction::ToggleVisible)
        );
    }

    #[test]
    fn resolve_arrows_nudge() {
        assert_eq!(
            ShortcutMap::resolve("ArrowLeft", false, false, false, false),
            Some(ShortcutAction::Nudge {
                direction: Direction::Left,
                large: false
            })
        );
        assert_eq!(
            ShortcutMap::resolve("ArrowDown", false, true, false, false),
            Some(ShortcutAction::Nudge {
                direction: Direction::Down,
                large: true
            })
        );
        assert_eq!(ShortcutMap::resolve("ArrowUp", true, false, false, false), None);
    }

    #[test]
    fn resolve_unknown_key() {
        assert_eq!(ShortcutMap::resolve("F13", false, false, false, false), None);
        assert_eq!(ShortcutMap::resolve("q", false, true, false, false), None);
    }

    #[test]
    fn resolve_modifier_precedence() {
        // Ctrl+Meta+Z is still Undo (not double-cmd)
        assert_eq!(
            ShortcutMap::resolve("z", true, false, false, true),
            Some(ShortcutAction::Undo)
        );
    }

    #[test]
    fn resolve_zoom() {
        assert_eq!(
            ShortcutMap::resolve("=", false, false, false, true),
            Some(ShortcutAction::ZoomIn)
        );
        assert_eq!(
            ShortcutMap::resolve("-", false, false, false, true),
            Some(ShortcutAction::ZoomOut)
        );
        assert_eq!(
            ShortcutMap::resolve("0", false, false, false, true),
            Some(ShortcutAction::ZoomReset)
        );
    }

    #[test]
    fn resolve_escape_from_event() {
        let event = KeyEvent::new("Escape", Modifiers::NONE);
        assert_eq!(ShortcutMap::resolve_event(&event), Some(ShortcutAction::Cancel));
    }
}
