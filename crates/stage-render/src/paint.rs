//! Frame → Vello drawing commands.
//!
//! Encodes fills, strokes and the editor overlay into a `vello::Scene`.
//! Presenting the scene (wgpu surface, render targets) is the host's job.

use crate::bridge::{RenderBridge, RenderError};
use crate::frame::{DrawItem, Frame, Overlay};
use kurbo::{Affine, Circle, Ellipse, Point, Rect, Stroke as KurboStroke};
use peniko::{Color, Fill};
use stage_core::model::{Color as StageColor, NodeKind, ShapeKind, Style};
use vello::Scene;

const SELECTION: Color = Color::from_rgba8(0x6C, 0x5C, 0xE7, 0xFF);
const MARQUEE_FILL: Color = Color::from_rgba8(0x6C, 0x5C, 0xE7, 0x1A);
const PLACEHOLDER: Color = Color::from_rgba8(0x86, 0x86, 0x8B, 0xFF);
const HANDLE_RADIUS_PX: f64 = 4.0;

/// Number of fill/stroke operations encoded for the last frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaintStats {
    pub fills: usize,
    pub strokes: usize,
}

/// Render bridge that records frames into a Vello scene.
#[derive(Default)]
pub struct VelloPainter {
    scene: Scene,
    stats: PaintStats,
}

impl VelloPainter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The encoded scene of the last rendered frame.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn stats(&self) -> PaintStats {
        self.stats
    }
}

impl RenderBridge for VelloPainter {
    fn render(&mut self, frame: &Frame) -> Result<(), RenderError> {
        self.scene.reset();
        self.stats = PaintStats::default();
        let mut ctx = PaintCtx {
            scene: &mut self.scene,
            stats: &mut self.stats,
            view: frame.view_transform(),
        };
        for item in &frame.items {
            ctx.paint_item(item);
        }
        ctx.paint_overlay(&frame.overlay, frame.hairline());
        log::trace!("vello frame r{}: {:?}", frame.revision, self.stats);
        Ok(())
    }
}

struct PaintCtx<'a> {
    scene: &'a mut Scene,
    stats: &'a mut PaintStats,
    view: Affine,
}

impl PaintCtx<'_> {
    fn paint_item(&mut self, item: &DrawItem) {
        let transform = self.view * item.world;
        let bounds = Rect::from_origin_size(Point::ZERO, item.size);

        match &item.kind {
            NodeKind::Root | NodeKind::Group => {}

            NodeKind::Shape(ShapeKind::Rect) => self.fill_and_stroke(transform, &bounds, &item.style),

            NodeKind::Shape(ShapeKind::Ellipse) => {
                let shape = Ellipse::from_rect(bounds);
                self.fill_and_stroke(transform, &shape, &item.style);
            }

            NodeKind::Text { content } => {
                log::trace!("TEXT {} {content:?}", item.id);
                // Glyph shaping needs a font context; the box stands in for now.
                self.fill_and_stroke(transform, &bounds, &item.style);
            }

            NodeKind::Image { source } => {
                log::trace!("IMAGE {} {source:?}", item.id);
                let stroke = KurboStroke::new(1.0);
                self.scene.stroke(&stroke, transform, PLACEHOLDER, None, &bounds);
                self.stats.strokes += 1;
            }
        }
    }

    fn fill_and_stroke<S: kurbo::Shape>(&mut self, transform: Affine, shape: &S, style: &Style) {
        if let Some(fill) = style.fill {
            let color = to_peniko(fill, style.opacity);
            self.scene.fill(Fill::NonZero, transform, color, None, shape);
            self.stats.fills += 1;
        }
        if let Some(stroke) = style.stroke
            && style.stroke_width > 0.0
        {
            let color = to_peniko(stroke, style.opacity);
            let line = KurboStroke::new(f64::from(style.stroke_width));
            self.scene.stroke(&line, transform, color, None, shape);
            self.stats.strokes += 1;
        }
    }

    fn paint_overlay(&mut self, overlay: &Overlay, hairline: f64) {
        let line = KurboStroke::new(hairline);

        if let Some(marquee) = overlay.marquee {
            self.scene.fill(Fill::NonZero, self.view, MARQUEE_FILL, None, &marquee);
            self.scene.stroke(&line, self.view, SELECTION, None, &marquee);
            self.stats.fills += 1;
            self.stats.strokes += 1;
        }

        let quads = overlay
            .selection
            .iter()
            .chain(&overlay.marquee_hits)
            .chain(overlay.hover.iter());
        for quad in quads {
            self.scene.stroke(&line, self.view, SELECTION, None, &quad_path(quad));
            self.stats.strokes += 1;
        }

        let radius = HANDLE_RADIUS_PX * hairline;
        for handle in &overlay.handles {
            if handle.rotate {
                let dot = Circle::new(handle.position, radius);
                self.scene.fill(Fill::NonZero, self.view, Color::WHITE, None, &dot);
                self.scene.stroke(&line, self.view, SELECTION, None, &dot);
            } else {
                let square = Rect::from_center_size(handle.position, (radius * 2.0, radius * 2.0));
                self.scene.fill(Fill::NonZero, self.view, Color::WHITE, None, &square);
                self.scene.stroke(&line, self.view, SELECTION, None, &square);
            }
            self.stats.fills += 1;
            self.stats.strokes += 1;
        }
    }
}

fn quad_path(quad: &[Point; 4]) -> kurbo::BezPath {
    let mut path = kurbo::BezPath::new();
    path.move_to(quad[0]);
    for p in &quad[1..] {
        path.line_to(*p);
    }
    path.close_path();
    path
}

/// Convert a model color, folding node opacity into alpha.
pub fn to_peniko(color: StageColor, opacity: f32) -> Color {
    let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color::from_rgba8(
        byte(color.r),
        byte(color.g),
        byte(color.b),
        byte(color.a * opacity.clamp(0.0, 1.0)),
    )
}
