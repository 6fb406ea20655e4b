//! Geometry kernel: bounding boxes and border anchoring.
//!
//! Pure, deterministic functions. Ties between equally distant candidates are
//! resolved by candidate order (top, right, bottom, left).

use erkit_core::Point;

use crate::shapes::{Shape, Silhouette};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Grows the box outward by `margin` on all four sides.
    pub fn expand(&self, margin: f64) -> Self {
        Self {
            min_x: self.min_x - margin,
            min_y: self.min_y - margin,
            max_x: self.max_x + margin,
            max_y: self.max_y + margin,
        }
    }

    /// Inclusive containment test.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    /// True when `other` lies entirely inside this box (edges may touch).
    pub fn encloses(&self, other: &Bounds) -> bool {
        other.min_x >= self.min_x
            && other.min_y >= self.min_y
            && other.max_x <= self.max_x
            && other.max_y <= self.max_y
    }

    pub fn union(&self, other: &Bounds) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

/// Union of the bounding boxes of `shapes`, independent of their silhouette.
///
/// Returns `None` for an empty slice.
pub fn union_bounds<'a, I>(shapes: I) -> Option<Bounds>
where
    I: IntoIterator<Item = &'a Shape>,
{
    shapes
        .into_iter()
        .map(Shape::bounds)
        .reduce(|acc, b| acc.union(&b))
}

/// Vertices of a diamond inscribed in the shape's box: top, right, bottom, left.
pub fn diamond_vertices(shape: &Shape) -> [Point; 4] {
    let c = shape.center();
    [
        Point::new(c.x, shape.y),
        Point::new(shape.x + shape.width, c.y),
        Point::new(c.x, shape.y + shape.height),
        Point::new(shape.x, c.y),
    ]
}

/// Projections of `toward` onto the four edges of the shape's box, clamped to
/// each edge: top, right, bottom, left.
pub fn rectangle_candidates(shape: &Shape, toward: Point) -> [Point; 4] {
    let right = shape.x + shape.width;
    let bottom = shape.y + shape.height;
    let cx = toward.x.clamp(shape.x, right);
    let cy = toward.y.clamp(shape.y, bottom);
    [
        Point::new(cx, shape.y),
        Point::new(right, cy),
        Point::new(cx, bottom),
        Point::new(shape.x, cy),
    ]
}

fn nearest(candidates: [Point; 4], to: Point) -> Point {
    let mut best = candidates[0];
    let mut best_distance = best.distance_to(&to);
    for candidate in &candidates[1..] {
        let distance = candidate.distance_to(&to);
        if distance < best_distance {
            best = *candidate;
            best_distance = distance;
        }
    }
    best
}

/// Point on `shape`'s border where a connection toward `other` is anchored.
///
/// Returns `None` when `shape` has non-positive dimensions.
pub fn border_point(shape: &Shape, other: &Shape) -> Option<Point> {
    border_point_toward(shape, other.center())
}

/// Same as [`border_point`] with an explicit reference point.
pub fn border_point_toward(shape: &Shape, toward: Point) -> Option<Point> {
    if shape.is_degenerate() {
        return None;
    }
    let candidates = match shape.silhouette() {
        Silhouette::Rectangle => rectangle_candidates(shape, toward),
        Silhouette::Diamond => diamond_vertices(shape),
    };
    Some(nearest(candidates, toward))
}

/// True when `p` lies on the boundary of `shape`'s box within `tolerance`.
pub fn is_on_border(shape: &Shape, p: Point, tolerance: f64) -> bool {
    let b = shape.bounds();
    if !b.expand(tolerance).contains(p) {
        return false;
    }
    (p.x - b.min_x).abs() <= tolerance
        || (p.x - b.max_x).abs() <= tolerance
        || (p.y - b.min_y).abs() <= tolerance
        || (p.y - b.max_y).abs() <= tolerance
}
