pub mod bridge;
pub mod frame;
pub mod paint;

pub use bridge::{RedrawGate, RenderBridge, RenderError};
pub use frame::{DrawItem, Frame, HandleMark, Overlay, build_display_list};
pub use paint::VelloPainter;
