//! Path planner.
//!
//! Produces the waypoint sequence of a connection from the two shapes it
//! joins. This is a cheap heuristic: a direct segment when it clears both
//! shapes, otherwise a single orthogonal bend, otherwise a detour around
//! blocking obstacles. Identical inputs always yield identical routes.

use erkit_core::{Point, RoutingConfig, RoutingError};
use smallvec::{smallvec, SmallVec};

use crate::geometry::{border_point, Bounds};
use crate::shapes::Shape;

/// A connection path: start, at most one intermediate point, end.
pub type Route = SmallVec<[Point; 3]>;

/// Interior sample positions used by the segment/box test.
const SAMPLES: [f64; 4] = [0.2, 0.4, 0.6, 0.8];

/// Detour clearance doublings tried before giving up on a detour.
const DETOUR_STEPS: u32 = 4;

/// Approximate segment/box intersection: true when any interior sample of
/// `start..end` falls inside `bounds` grown by `margin`.
pub fn line_intersects(start: Point, end: Point, bounds: &Bounds, margin: f64) -> bool {
    let expanded = bounds.expand(margin);
    SAMPLES.iter().any(|t| {
        let p = Point::new(
            start.x + (end.x - start.x) * t,
            start.y + (end.y - start.y) * t,
        );
        expanded.contains(p)
    })
}

/// True when `point` stays outside every box grown by `margin`.
pub fn is_waypoint_safe(point: Point, boxes: &[Bounds], margin: f64) -> bool {
    !boxes.iter().any(|b| b.expand(margin).contains(point))
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Router {
    config: RoutingConfig,
}

impl Router {
    pub fn new(config: RoutingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Routes a connection from `source` to `target`.
    pub fn route(&self, source: &Shape, target: &Shape) -> Result<Route, RoutingError> {
        self.route_avoiding(source, target, &[])
    }

    /// Routes a connection, additionally steering clear of `obstacles`.
    ///
    /// With no obstacles this is exactly [`Router::route`]. Degenerate
    /// obstacles are ignored.
    pub fn route_avoiding(
        &self,
        source: &Shape,
        target: &Shape,
        obstacles: &[&Shape],
    ) -> Result<Route, RoutingError> {
        let start =
            border_point(source, target).ok_or(RoutingError::DegenerateShape { shape: source.id })?;
        let end =
            border_point(target, source).ok_or(RoutingError::DegenerateShape { shape: target.id })?;

        let margin = self.config.intersection_margin;
        let source_box = source.bounds();
        let target_box = target.bounds();

        let obstacle_boxes: Vec<Bounds> = obstacles
            .iter()
            .filter(|o| !o.is_degenerate())
            .map(|o| o.bounds())
            .collect();
        let blocking: Vec<Bounds> = obstacle_boxes
            .iter()
            .copied()
            .filter(|b| line_intersects(start, end, b, margin))
            .collect();

        let endpoints_blocked = line_intersects(start, end, &source_box, margin)
            || line_intersects(start, end, &target_box, margin);

        if !endpoints_blocked && blocking.is_empty() {
            return Ok(smallvec![start, end]);
        }

        let mut boxes = Vec::with_capacity(obstacle_boxes.len() + 2);
        boxes.push(source_box);
        boxes.push(target_box);
        boxes.extend(obstacle_boxes.iter().copied());

        let dx = end.x - start.x;
        let dy = end.y - start.y;
        let threshold = self.config.axis_alignment_threshold;
        let axis_aligned = dx.abs() < threshold || dy.abs() < threshold;

        if !axis_aligned {
            let sc = source.center();
            let tc = target.center();
            let horizontal = Point::new(end.x, start.y);
            let vertical = Point::new(start.x, end.y);
            let candidates = if (tc.x - sc.x).abs() > (tc.y - sc.y).abs() {
                [horizontal, vertical]
            } else {
                [vertical, horizontal]
            };
            if let Some(bend) = candidates.into_iter().find(|p| {
                is_waypoint_safe(*p, &boxes, self.config.safe_margin)
                    && self.legs_clear(start, *p, end, &obstacle_boxes)
            }) {
                tracing::trace!("orthogonal bend at {} for {} -> {}", bend, source.id, target.id);
                return Ok(smallvec![start, bend, end]);
            }
        }

        if let Some(detour) = self.detour(start, end, &blocking, &boxes, &obstacle_boxes) {
            tracing::trace!("detour at {} for {} -> {}", detour, source.id, target.id);
            return Ok(smallvec![start, detour, end]);
        }

        tracing::trace!("no safe bend for {} -> {}, using direct edge", source.id, target.id);
        Ok(smallvec![start, end])
    }

    /// True when neither leg of `start -> via -> end` crosses an obstacle.
    fn legs_clear(&self, start: Point, via: Point, end: Point, obstacles: &[Bounds]) -> bool {
        let margin = self.config.intersection_margin;
        obstacles
            .iter()
            .all(|b| !line_intersects(start, via, b, margin) && !line_intersects(via, end, b, margin))
    }

    /// Picks a point beside the union of `blocking`, on the side perpendicular
    /// to the segment's dominant direction. The clearance doubles until both
    /// legs clear every obstacle.
    fn detour(
        &self,
        start: Point,
        end: Point,
        blocking: &[Bounds],
        boxes: &[Bounds],
        obstacles: &[Bounds],
    ) -> Option<Point> {
        let union = blocking.iter().copied().reduce(|a, b| a.union(&b))?;
        let mid = Point::new((start.x + end.x) / 2.0, (start.y + end.y) / 2.0);
        let vertical = (end.y - start.y).abs() >= (end.x - start.x).abs();

        (0..DETOUR_STEPS).find_map(|step| {
            let clearance = self.config.detour_clearance * f64::from(1u32 << step);
            let candidates = if vertical {
                [
                    Point::new(union.max_x + clearance, mid.y),
                    Point::new(union.min_x - clearance, mid.y),
                ]
            } else {
                [
                    Point::new(mid.x, union.max_y + clearance),
                    Point::new(mid.x, union.min_y - clearance),
                ]
            };
            candidates.into_iter().find(|p| {
                is_waypoint_safe(*p, boxes, self.config.safe_margin)
                    && self.legs_clear(start, *p, end, obstacles)
            })
        })
    }
}
