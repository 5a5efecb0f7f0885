pub mod commands;
pub mod config;
pub mod engine;
pub mod input;
pub mod interaction;
pub mod shortcuts;

pub use commands::{Command, History, HistoryStatus};
pub use config::{ConfigError, EngineConfig};
pub use engine::{Engine, SceneCallback, SubscriptionId};
pub use input::{KeyEvent, Modifiers, PointerButton, PointerEvent, WheelEvent};
pub use interaction::{Gesture, Interaction, Outcome};
pub use shortcuts::{ShortcutAction, ShortcutMap};
