//! Render bridge contract.
//!
//! The engine never draws. Once per animation frame the host asks the
//! engine for a `Frame` and hands it to whatever implements `RenderBridge`
//! (Canvas2D in the browser, Vello natively, a recorder in tests).

use crate::frame::Frame;
use stage_core::Surface;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    /// The drawing backend rejected a call.
    #[error("render backend error: {0}")]
    Backend(String),
    /// The backing surface went away (detached canvas, lost context).
    #[error("surface is not ready")]
    SurfaceLost,
}

/// Something that can draw a frame snapshot.
pub trait RenderBridge {
    /// Draw `frame` in full. Frames are self-contained; nothing carries over.
    fn render(&mut self, frame: &Frame) -> Result<(), RenderError>;

    /// Called before `render` whenever the surface differs from the one
    /// last presented, including the first frame.
    fn resize(&mut self, _surface: Surface) -> Result<(), RenderError> {
        Ok(())
    }
}

/// Pull-based redraw check.
///
/// The host calls `should_draw` once per animation frame with the current
/// scene revision; it answers `true` at most once per revision, so any
/// number of mutations between two frames produce a single redraw.
#[derive(Debug, Clone, Default)]
pub struct RedrawGate {
    drawn: Option<u64>,
}

impl RedrawGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn should_draw(&mut self, revision: u64) -> bool {
        if self.drawn == Some(revision) {
            return false;
        }
        self.drawn = Some(revision);
        true
    }

    /// Force the next check to draw (after resize or context loss).
    pub fn invalidate(&mut self) {
        self.drawn = None;
    }
}
