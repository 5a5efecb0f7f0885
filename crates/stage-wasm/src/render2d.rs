//! Canvas2D software renderer.
//!
//! Draws a `Frame` to an HTML `<canvas>` via `CanvasRenderingContext2d`.
//! Every node is drawn in its own local space by loading
//! `dpr × viewport × world` as the context transform, so rotation and
//! scale come for free. `resize` keeps the backing store at device-pixel
//! size so it stays sharp on HiDPI screens.

use kurbo::{Affine, Point, Rect};
use stage_core::model::{Color, NodeKind, ShapeKind, Style};
use stage_core::Surface;
use stage_render::{DrawItem, Frame, Overlay, RenderBridge, RenderError};
use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

/// Theme-dependent colors for the canvas renderer.
pub struct CanvasTheme {
    pub bg: &'static str,
    pub grid: &'static str,
    pub accent: &'static str,
    pub marquee_fill: &'static str,
    pub placeholder_border: &'static str,
    pub placeholder_text: &'static str,
}

impl CanvasTheme {
    /// Light theme — Apple-style warm white canvas.
    pub fn light() -> Self {
        Self {
            bg: "#F5F5F7",
            grid: "rgba(0, 0, 0, 0.05)",
            accent: "#4FC3F7",
            marquee_fill: "rgba(79, 195, 247, 0.08)",
            placeholder_border: "#86868B",
            placeholder_text: "#86868B",
        }
    }

    /// Dark theme — macOS dark mode.
    pub fn dark() -> Self {
        Self {
            bg: "#1C1C1E",
            grid: "rgba(255, 255, 255, 0.04)",
            accent: "#4FC3F7",
            marquee_fill: "rgba(79, 195, 247, 0.12)",
            placeholder_border: "#636366",
            placeholder_text: "#98989D",
        }
    }
}

/// Render bridge over a borrowed 2D context.
pub struct Canvas2dRenderer<'a> {
    ctx: &'a CanvasRenderingContext2d,
    theme: CanvasTheme,
}

impl<'a> Canvas2dRenderer<'a> {
    pub fn new(ctx: &'a CanvasRenderingContext2d, theme: CanvasTheme) -> Self {
        Self { ctx, theme }
    }
}

impl RenderBridge for Canvas2dRenderer<'_> {
    /// Size the backing store in device pixels; CSS size stays with the host.
    fn resize(&mut self, surface: Surface) -> Result<(), RenderError> {
        let canvas = self.ctx.canvas().ok_or(RenderError::SurfaceLost)?;
        let (pw, ph) = surface.physical_size();
        if canvas.width() != pw || canvas.height() != ph {
            canvas.set_width(pw);
            canvas.set_height(ph);
        }
        Ok(())
    }

    fn render(&mut self, frame: &Frame) -> Result<(), RenderError> {
        let ctx = self.ctx;
        let (pw, ph) = frame.surface.physical_size();

        // Clear canvas
        set_transform(ctx, Affine::IDENTITY)?;
        ctx.set_fill_style_str(self.theme.bg);
        ctx.fill_rect(0.0, 0.0, f64::from(pw), f64::from(ph));

        set_transform(ctx, Affine::scale(frame.surface.pixel_ratio()))?;
        draw_grid(ctx, frame.surface.width, frame.surface.height, &self.theme);

        let view = frame.view_transform();
        for item in &frame.items {
            set_transform(ctx, view * item.world)?;
            draw_item(ctx, item, &self.theme)?;
        }

        set_transform(ctx, view)?;
        draw_overlay(ctx, &frame.overlay, frame.hairline(), &self.theme)?;
        log::trace!("canvas2d frame r{}: {} items", frame.revision, frame.items.len());
        Ok(())
    }
}

fn js_err(err: JsValue) -> RenderError {
    RenderError::Backend(format!("{err:?}"))
}

fn set_transform(ctx: &CanvasRenderingContext2d, t: Affine) -> Result<(), RenderError> {
    let [a, b, c, d, e, f] = t.as_coeffs();
    ctx.set_transform(a, b, c, d, e, f).map_err(js_err)
}

// ─── Nodes ───────────────────────────────────────────────────────────────

fn draw_item(ctx: &CanvasRenderingContext2d, item: &DrawItem, theme: &CanvasTheme) -> Result<(), RenderError> {
    let (w, h) = (item.size.width, item.size.height);
    let style = &item.style;

    match &item.kind {
        NodeKind::Root | NodeKind::Group => {}
        NodeKind::Shape(ShapeKind::Rect) => {
            ctx.begin_path();
            ctx.rect(0.0, 0.0, w, h);
            fill_and_stroke(ctx, style);
        }
        NodeKind::Shape(ShapeKind::Ellipse) => {
            ctx.begin_path();
            ctx.ellipse(w / 2.0, h / 2.0, w / 2.0, h / 2.0, 0.0, 0.0, std::f64::consts::TAU)
                .map_err(js_err)?;
            fill_and_stroke(ctx, style);
        }
        NodeKind::Text { content } => draw_text(ctx, w, h, content, style)?,
        NodeKind::Image { source } => draw_image_placeholder(ctx, w, h, source, theme),
    }
    Ok(())
}

fn fill_and_stroke(ctx: &CanvasRenderingContext2d, style: &Style) {
    if let Some(fill) = style.fill {
        ctx.set_fill_style_str(&fill.to_css(style.opacity));
        ctx.fill();
    }
    if let Some(stroke) = style.stroke
        && style.stroke_width > 0.0
    {
        ctx.set_stroke_style_str(&stroke.to_css(style.opacity));
        ctx.set_line_width(f64::from(style.stroke_width));
        ctx.stroke();
    }
}

/// Single line of text fitted to the box height.
fn draw_text(
    ctx: &CanvasRenderingContext2d,
    w: f64,
    h: f64,
    content: &str,
    style: &Style,
) -> Result<(), RenderError> {
    ctx.save();
    ctx.set_font(&font_for_height(h));
    let color = style.fill.unwrap_or(Color::BLACK);
    ctx.set_fill_style_str(&color.to_css(style.opacity));
    ctx.set_text_baseline("top");
    ctx.fill_text_with_max_width(content, 0.0, 0.0, w.max(1.0))
        .map_err(js_err)?;
    ctx.restore();
    Ok(())
}

fn font_for_height(h: f64) -> String {
    let size = (h * 0.8).clamp(1.0, 200.0);
    format!("400 {size:.1}px Inter, sans-serif")
}

/// Images are not decoded here; draw a dashed frame with the source name.
fn draw_image_placeholder(ctx: &CanvasRenderingContext2d, w: f64, h: f64, source: &str, theme: &CanvasTheme) {
    ctx.save();
    ctx.set_stroke_style_str(theme.placeholder_border);
    ctx.set_line_width(1.0);
    let _ = ctx.set_line_dash(&js_sys::Array::of2(
        &JsValue::from_f64(4.0),
        &JsValue::from_f64(4.0),
    ));
    ctx.stroke_rect(0.0, 0.0, w, h);

    ctx.set_fill_style_str(theme.placeholder_text);
    ctx.set_font("11px Inter, sans-serif");
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");
    let _ = ctx.fill_text(source, w / 2.0, h / 2.0);
    ctx.restore();
}

// ─── Overlay ─────────────────────────────────────────────────────────────

fn draw_overlay(
    ctx: &CanvasRenderingContext2d,
    overlay: &Overlay,
    hairline: f64,
    theme: &CanvasTheme,
) -> Result<(), RenderError> {
    ctx.save();
    ctx.set_line_width(hairline);
    ctx.set_stroke_style_str(theme.accent);

    if let Some(marquee) = overlay.marquee {
        draw_marquee(ctx, marquee, hairline, theme);
    }

    for quad in overlay.selection.iter().chain(&overlay.marquee_hits) {
        quad_path(ctx, quad);
        ctx.stroke();
    }
    if let Some(hover) = &overlay.hover {
        ctx.set_global_alpha(0.6);
        quad_path(ctx, hover);
        ctx.stroke();
        ctx.set_global_alpha(1.0);
    }

    // Handles keep a constant on-screen size.
    let half = 3.0 * hairline;
    ctx.set_fill_style_str("#FFFFFF");
    for handle in &overlay.handles {
        let Point { x, y } = handle.position;
        ctx.begin_path();
        if handle.rotate {
            ctx.arc(x, y, half, 0.0, std::f64::consts::TAU).map_err(js_err)?;
        } else {
            ctx.rect(x - half, y - half, half * 2.0, half * 2.0);
        }
        ctx.fill();
        ctx.stroke();
    }
    ctx.restore();
    Ok(())
}

/// Draw the marquee (rubber-band) selection rectangle.
fn draw_marquee(ctx: &CanvasRenderingContext2d, r: Rect, hairline: f64, theme: &CanvasTheme) {
    ctx.save();
    ctx.set_fill_style_str(theme.marquee_fill);
    ctx.fill_rect(r.x0, r.y0, r.width(), r.height());
    let dash = 4.0 * hairline;
    let _ = ctx.set_line_dash(&js_sys::Array::of2(
        &JsValue::from_f64(dash),
        &JsValue::from_f64(dash),
    ));
    ctx.stroke_rect(r.x0, r.y0, r.width(), r.height());
    ctx.restore();
}

fn quad_path(ctx: &CanvasRenderingContext2d, quad: &[Point; 4]) {
    ctx.begin_path();
    ctx.move_to(quad[0].x, quad[0].y);
    for p in &quad[1..] {
        ctx.line_to(p.x, p.y);
    }
    ctx.close_path();
}

/// Grid dots in CSS pixels.
fn draw_grid(ctx: &CanvasRenderingContext2d, width: f64, height: f64, theme: &CanvasTheme) {
    ctx.set_fill_style_str(theme.grid);
    let spacing = 20.0;
    let mut x = 0.0;
    while x < width {
        let mut y = 0.0;
        while y < height {
            ctx.fill_rect(x, y, 1.0, 1.0);
            y += spacing;
        }
        x += spacing;
    }
}
