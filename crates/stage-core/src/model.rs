//! Core data model: nodes, their kinds, local transforms and styles.
//!
//! A node owns no references to other nodes. Parent/child structure lives in
//! the `SceneGraph` arena, keyed by `NodeId`, so a node value can be copied
//! into a command and restored later without dragging its neighbours along.

use crate::geometry;
use crate::id::NodeId;
use kurbo::{Affine, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

// ─── Colors & Style ──────────────────────────────────────────────────────

/// RGBA color. Stored as 4 × f32 [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Helper to parse a single hex digit.
fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const BLACK: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA`. The `#` is optional.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();
        let pair = |i: usize| -> Option<f32> {
            Some((hex_val(bytes[i])? << 4 | hex_val(bytes[i + 1])?) as f32 / 255.0)
        };

        match bytes.len() {
            3 => {
                let short = |i: usize| -> Option<f32> { Some((hex_val(bytes[i])? * 17) as f32 / 255.0) };
                Some(Self::rgba(short(0)?, short(1)?, short(2)?, 1.0))
            }
            6 => Some(Self::rgba(pair(0)?, pair(2)?, pair(4)?, 1.0)),
            8 => Some(Self::rgba(pair(0)?, pair(2)?, pair(4)?, pair(6)?)),
            _ => None,
        }
    }

    /// Emit as `#RRGGBB`, or `#RRGGBBAA` when not fully opaque.
    pub fn to_hex(&self) -> String {
        let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        let (r, g, b, a) = (byte(self.r), byte(self.g), byte(self.b), byte(self.a));
        if a == 255 {
            format!("#{r:02X}{g:02X}{b:02X}")
        } else {
            format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }

    /// CSS `rgba()` string for Canvas2D fill/stroke styles.
    pub fn to_css(&self, opacity: f32) -> String {
        let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        let alpha = (self.a * opacity).clamp(0.0, 1.0);
        format!("rgba({}, {}, {}, {alpha:.3})", byte(self.r), byte(self.g), byte(self.b))
    }
}

/// Paint attributes of a node. `None` means "not painted".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Style {
    #[serde(with = "hex_opt")]
    pub fill: Option<Color>,
    #[serde(with = "hex_opt")]
    pub stroke: Option<Color>,
    pub stroke_width: f32,
    pub opacity: f32,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fill: None,
            stroke: None,
            stroke_width: 1.0,
            opacity: 1.0,
        }
    }
}

/// Serialize optional colors as hex strings.
mod hex_opt {
    use super::Color;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(color: &Option<Color>, s: S) -> Result<S::Ok, S::Error> {
        match color {
            Some(c) => s.serialize_some(&c.to_hex()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Color>, D::Error> {
        match Option::<String>::deserialize(d)? {
            Some(hex) => Color::from_hex(&hex)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid color `{hex}`"))),
            None => Ok(None),
        }
    }
}

// ─── Transform ───────────────────────────────────────────────────────────

/// A node's local transform: translation, rotation (radians) and
/// non-uniform scale, applied as `translate · rotate · scale`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        rotation: 0.0,
        scale_x: 1.0,
        scale_y: 1.0,
    };

    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            ..Self::IDENTITY
        }
    }

    pub fn translation(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Same transform shifted by `delta` in parent space.
    pub fn translated(&self, delta: Vec2) -> Self {
        Self {
            x: self.x + delta.x,
            y: self.y + delta.y,
            ..*self
        }
    }

    pub fn to_affine(&self) -> Affine {
        Affine::translate((self.x, self.y))
            * Affine::rotate(self.rotation)
            * Affine::scale_non_uniform(self.scale_x, self.scale_y)
    }

    /// Nearest translation/rotation/scale for an arbitrary affine (skew is dropped).
    pub fn from_affine(t: Affine) -> Self {
        let (translation, rotation, scale_x, scale_y) = geometry::decompose(t);
        Self {
            x: translation.x,
            y: translation.y,
            rotation,
            scale_x,
            scale_y,
        }
    }

    pub fn is_finite(&self) -> bool {
        [self.x, self.y, self.rotation, self.scale_x, self.scale_y]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Transform plus size: everything an interactive gesture can change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub transform: Transform,
    pub size: Size,
}

// ─── Nodes ───────────────────────────────────────────────────────────────

/// Geometric primitive of a `shape` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    #[default]
    Rect,
    Ellipse,
}

/// What a node draws.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Hidden owner of all top-level nodes. Never serialized or hit.
    Root,
    Shape(ShapeKind),
    /// Container; draws nothing itself, hit through its children.
    Group,
    Text { content: String },
    Image { source: String },
}

impl NodeKind {
    /// Tag used by the serialization format.
    pub fn tag(&self) -> &'static str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Shape(_) => "shape",
            NodeKind::Group => "group",
            NodeKind::Text { .. } => "text",
            NodeKind::Image { .. } => "image",
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, NodeKind::Root | NodeKind::Group)
    }
}

/// Visibility and lock flags, changed together by one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeFlags {
    pub visible: bool,
    pub locked: bool,
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self {
            visible: true,
            locked: false,
        }
    }
}

/// A single drawable entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub transform: Transform,
    /// Extent in local units; the local box is `[0, w] × [0, h]`.
    pub size: Size,
    pub z_index: i32,
    pub flags: NodeFlags,
    pub style: Style,
}

impl Node {
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            transform: Transform::IDENTITY,
            size: Size::ZERO,
            z_index: 0,
            flags: NodeFlags::default(),
            style: Style::default(),
        }
    }

    /// Rectangle shape at `(x, y)` with the given size.
    pub fn rect(id: NodeId, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(id, NodeKind::Shape(ShapeKind::Rect))
            .with_transform(Transform::at(x, y))
            .with_size(Size::new(width, height))
    }

    pub fn ellipse(id: NodeId, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(id, NodeKind::Shape(ShapeKind::Ellipse))
            .with_transform(Transform::at(x, y))
            .with_size(Size::new(width, height))
    }

    pub fn group(id: NodeId) -> Self {
        Self::new(id, NodeKind::Group)
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = geometry::sanitize_size(size);
        self
    }

    pub fn with_z(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    pub fn with_fill(mut self, color: Color) -> Self {
        self.style.fill = Some(color);
        self
    }

    pub fn locked(mut self) -> Self {
        self.flags.locked = true;
        self
    }

    pub fn placement(&self) -> Placement {
        Placement {
            transform: self.transform,
            size: self.size,
        }
    }

    /// Whether the local box has a positive width and height.
    pub fn has_area(&self) -> bool {
        self.size.width > 0.0 && self.size.height > 0.0
    }

    /// The node's own box in local space.
    pub fn local_rect(&self) -> Rect {
        Rect::from_origin_size((0.0, 0.0), self.size)
    }
}
