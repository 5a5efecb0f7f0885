//! Input abstraction layer.
//!
//! Normalizes host pointer, keyboard and wheel events into plain values
//! consumed by the interaction controller. Positions are in CSS pixels
//! relative to the surface's top-left corner.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Modifier key state at the time of an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::NONE
    };

    /// Platform command key: ⌘ on macOS, Ctrl elsewhere.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerButton {
    #[default]
    Primary,
    Middle,
    Secondary,
}

impl PointerButton {
    /// Map `PointerEvent.button` (0 = primary, 1 = middle, 2 = secondary).
    pub fn from_dom(button: i16) -> Self {
        match button {
            1 => Self::Middle,
            2 => Self::Secondary,
            _ => Self::Primary,
        }
    }
}

/// A normalized pointer event from any pointing device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down {
        position: Point,
        button: PointerButton,
        modifiers: Modifiers,
    },
    Move {
        position: Point,
        modifiers: Modifiers,
    },
    Up {
        position: Point,
        modifiers: Modifiers,
    },
    /// The pointer left the surface or the host lost capture.
    Leave,
}

impl PointerEvent {
    pub fn down(x: f64, y: f64, modifiers: Modifiers) -> Self {
        Self::Down {
            position: Point::new(x, y),
            button: PointerButton::Primary,
            modifiers,
        }
    }

    pub fn moved(x: f64, y: f64, modifiers: Modifiers) -> Self {
        Self::Move {
            position: Point::new(x, y),
            modifiers,
        }
    }

    pub fn up(x: f64, y: f64, modifiers: Modifiers) -> Self {
        Self::Up {
            position: Point::new(x, y),
            modifiers,
        }
    }

    /// Extract position if this event has one.
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::Down { position, .. } | Self::Move { position, .. } | Self::Up { position, .. } => {
                Some(*position)
            }
            Self::Leave => None,
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        match self {
            Self::Down { modifiers, .. } | Self::Move { modifiers, .. } | Self::Up { modifiers, .. } => {
                *modifiers
            }
            Self::Leave => Modifiers::NONE,
        }
    }
}

/// Keyboard event, `key` being the DOM `KeyboardEvent.key` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: String,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
        }
    }
}

/// Scroll / pinch-zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelEvent {
    pub position: Point,
    /// Scroll delta in CSS pixels.
    pub delta: Vec2,
    pub modifiers: Modifiers,
}
