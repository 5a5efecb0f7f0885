//! Viewport (pan/zoom) and host surface description.

use kurbo::{Affine, Point, Vec2};
use serde::{Deserialize, Serialize};

/// The host's drawing surface, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Surface {
    pub width: f64,
    pub height: f64,
    pub device_pixel_ratio: f64,
}

impl Default for Surface {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            device_pixel_ratio: 1.0,
        }
    }
}

impl Surface {
    /// Backing-store size in device pixels.
    pub fn physical_size(&self) -> (u32, u32) {
        let dpr = self.pixel_ratio();
        (
            (self.width * dpr).round().max(1.0) as u32,
            (self.height * dpr).round().max(1.0) as u32,
        )
    }

    /// Device pixel ratio, normalized to a positive finite value.
    pub fn pixel_ratio(&self) -> f64 {
        if self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0 {
            self.device_pixel_ratio
        } else {
            1.0
        }
    }
}

/// Maps world coordinates to screen (CSS pixel) coordinates:
/// `screen = world * zoom + pan`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub pan: Vec2,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    pub fn to_affine(&self) -> Affine {
        Affine::translate(self.pan) * Affine::scale(self.zoom)
    }

    pub fn screen_to_world(&self, p: Point) -> Point {
        let zoom = self.zoom.max(f64::EPSILON);
        Point::new((p.x - self.pan.x) / zoom, (p.y - self.pan.y) / zoom)
    }

    pub fn world_to_screen(&self, p: Point) -> Point {
        Point::new(p.x * self.zoom + self.pan.x, p.y * self.zoom + self.pan.y)
    }

    /// Convert a screen-space distance (e.g. a handle radius) to world units.
    pub fn screen_len_to_world(&self, len: f64) -> f64 {
        len / self.zoom.max(f64::EPSILON)
    }

    /// Zoom by `factor` keeping the world point under `anchor` (screen) fixed.
    pub fn zoom_about(&mut self, anchor: Point, factor: f64, min: f64, max: f64) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let world = self.screen_to_world(anchor);
        self.zoom = (self.zoom * factor).clamp(min, max);
        self.pan = Vec2::new(anchor.x - world.x * self.zoom, anchor.y - world.y * self.zoom);
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }
}
