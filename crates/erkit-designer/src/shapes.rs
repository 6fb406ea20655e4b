//! Shape and connection records.
//!
//! Plain data owned by the registry. Coordinates are diagram coordinates with
//! the origin at the top-left; every shape, including diamonds, is described
//! by its axis-aligned bounding box.

use erkit_core::{ConnectionId, Point, ShapeId};
use serde::{Deserialize, Serialize};

use crate::geometry::Bounds;

/// Outline used for border anchoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Silhouette {
    Rectangle,
    Diamond,
}

/// ER element kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementKind {
    Entity,
    Relationship,
    /// Drawn as an ellipse, anchored like a rectangle.
    Attribute,
    Container,
}

impl ElementKind {
    pub fn silhouette(self) -> Silhouette {
        match self {
            ElementKind::Relationship => Silhouette::Diamond,
            ElementKind::Entity | ElementKind::Attribute | ElementKind::Container => {
                Silhouette::Rectangle
            }
        }
    }

    pub fn is_container(self) -> bool {
        self == ElementKind::Container
    }

    pub fn default_name(self) -> &'static str {
        match self {
            ElementKind::Entity => "Entity",
            ElementKind::Relationship => "Relationship",
            ElementKind::Attribute => "Attribute",
            ElementKind::Container => "Group",
        }
    }
}

/// A positioned, sized node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: ShapeId,
    pub kind: ElementKind,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Owning container; `None` for the root scope.
    pub parent: Option<ShapeId>,
}

impl Shape {
    pub fn new(id: ShapeId, kind: ElementKind, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id,
            kind,
            name: kind.default_name().to_string(),
            x,
            y,
            width,
            height,
            parent: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn silhouette(&self) -> Silhouette {
        self.kind.silhouette()
    }

    /// A shape with non-positive (or non-finite) dimensions cannot be routed.
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite())
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }
}

/// Creation parameters for a shape; position and parent are passed separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeSpec {
    pub kind: ElementKind,
    pub name: String,
    pub width: f64,
    pub height: f64,
}

impl ShapeSpec {
    pub fn new(kind: ElementKind, width: f64, height: f64) -> Self {
        Self {
            kind,
            name: kind.default_name().to_string(),
            width,
            height,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Flags carried by a connection and copied forward on restore.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionAttrs {
    /// Marks a parent-child edge of a hierarchy.
    pub hierarchical: bool,
    pub label: Option<String>,
}

impl ConnectionAttrs {
    pub fn hierarchical() -> Self {
        Self {
            hierarchical: true,
            label: None,
        }
    }

    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            hierarchical: false,
            label: Some(label.into()),
        }
    }
}

/// A directed edge between two shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub source: ShapeId,
    pub target: ShapeId,
    /// First point on the source border, last on the target border.
    pub waypoints: Vec<Point>,
    pub attrs: ConnectionAttrs,
    /// Owning scope; `None` for the root scope.
    pub parent: Option<ShapeId>,
}

impl Connection {
    pub fn touches(&self, shape: ShapeId) -> bool {
        self.source == shape || self.target == shape
    }

    /// The endpoint that is not `shape`, if `shape` is one of the endpoints.
    pub fn other_end(&self, shape: ShapeId) -> Option<ShapeId> {
        if self.source == shape {
            Some(self.target)
        } else if self.target == shape {
            Some(self.source)
        } else {
            None
        }
    }
}
