//! Geometry kernel: affine transforms, bounding boxes, containment tests.
//!
//! Transforms are `kurbo::Affine` 2×3 matrices with coefficients
//! `[a, b, c, d, e, f]`, the same layout as Canvas2D `setTransform`.
//! Composition is child-then-parent: `world = parent_world * local`, so a
//! point is mapped by the local transform first.
//!
//! Everything here is a pure function over numbers.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use std::f64::consts::FRAC_PI_2;
use thiserror::Error;

/// Determinant magnitude below which a transform is treated as singular.
pub const SINGULAR_EPSILON: f64 = 1e-12;

/// Inversion of a transform whose determinant is (near) zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("transform is singular and cannot be inverted")]
pub struct SingularTransform;

/// Compose a child's local transform under its parent's world transform.
pub fn compose(parent: Affine, local: Affine) -> Affine {
    parent * local
}

/// Invert an affine transform.
///
/// Fails instead of producing infinities when the transform collapses an
/// axis (zero scale).
pub fn invert(t: Affine) -> Result<Affine, SingularTransform> {
    let det = t.determinant();
    if !det.is_finite() || det.abs() < SINGULAR_EPSILON {
        return Err(SingularTransform);
    }
    Ok(t.inverse())
}

/// Map a local-space point into world space.
pub fn to_world(world: Affine, local: Point) -> Point {
    world * local
}

/// Map a world-space point into the local space of `world`.
pub fn to_local(world: Affine, p: Point) -> Result<Point, SingularTransform> {
    Ok(invert(world)? * p)
}

/// Map a vector (no translation) through the linear part of `t`.
pub fn map_vector(t: Affine, v: Vec2) -> Vec2 {
    let [a, b, c, d, _, _] = t.as_coeffs();
    Vec2::new(a * v.x + c * v.y, b * v.x + d * v.y)
}

/// Axis-aligned bounding box of a local rect after transformation.
pub fn rect_to_world(world: Affine, local: Rect) -> Rect {
    world.transform_rect_bbox(local)
}

/// The four corners of a local rect in world space, clockwise from the origin corner.
pub fn quad_to_world(world: Affine, local: Rect) -> [Point; 4] {
    [
        world * Point::new(local.x0, local.y0),
        world * Point::new(local.x1, local.y0),
        world * Point::new(local.x1, local.y1),
        world * Point::new(local.x0, local.y1),
    ]
}

/// Normalize a drag rectangle from two arbitrary corners.
pub fn normalize_rect(a: Point, b: Point) -> Rect {
    Rect::from_points(a, b)
}

/// Inclusive containment: points on the edge count as inside.
pub fn rect_contains(r: Rect, p: Point) -> bool {
    p.x >= r.x0 && p.x <= r.x1 && p.y >= r.y0 && p.y <= r.y1
}

/// AABB overlap test; touching edges count as intersecting so that a
/// zero-area marquee over a node still registers.
pub fn rects_intersect(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && a.x1 >= b.x0 && a.y0 <= b.y1 && a.y1 >= b.y0
}

/// Point inside the ellipse inscribed in `[0, w] × [0, h]`.
///
/// A zero-size ellipse contains nothing.
pub fn ellipse_contains(size: Size, p: Point) -> bool {
    let rx = size.width / 2.0;
    let ry = size.height / 2.0;
    if rx <= 0.0 || ry <= 0.0 {
        return false;
    }
    let nx = (p.x - rx) / rx;
    let ny = (p.y - ry) / ry;
    nx * nx + ny * ny <= 1.0
}

/// Union of a set of rectangles, or `None` for an empty set.
pub fn union_all(rects: impl IntoIterator<Item = Rect>) -> Option<Rect> {
    rects.into_iter().reduce(|acc, r| acc.union(r))
}

/// Clamp a size so neither dimension is negative or non-finite.
pub fn sanitize_size(size: Size) -> Size {
    let clean = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
    Size::new(clean(size.width), clean(size.height))
}

/// Decompose an affine into `(translation, rotation, scale_x, scale_y)`.
///
/// Assumes no skew; any skew component is dropped. A matrix with a
/// collapsed x axis takes its rotation from the y axis instead. Mirrored
/// matrices keep `|rotation| <= π/2` by flipping x rather than turning.
pub fn decompose(t: Affine) -> (Vec2, f64, f64, f64) {
    let [a, b, c, d, e, f] = t.as_coeffs();
    let translation = Vec2::new(e, f);
    let sx = a.hypot(b);
    if sx < SINGULAR_EPSILON {
        let sy = c.hypot(d);
        let rotation = if sy < SINGULAR_EPSILON { 0.0 } else { (-c).atan2(d) };
        return (translation, rotation, 0.0, sy);
    }
    let det = a * d - b * c;
    let rotation = b.atan2(a);
    // A mirrored matrix reads as either a half turn with a flipped y axis
    // or a flipped x axis; take the one with the smaller rotation.
    if det < 0.0 && rotation.abs() > FRAC_PI_2 {
        let rotation = (-b).atan2(-a);
        return (translation, rotation, -sx, det / -sx);
    }
    (translation, rotation, sx, det / sx)
}
