//! Shape/connection registry.
//!
//! [`DiagramRegistry`] is the read side the core consults, [`Modeling`] the
//! narrow mutation surface it writes through. [`Diagram`] is the in-memory
//! implementation; hosts with their own model implement the two traits.

use std::collections::BTreeMap;
use std::sync::Arc;

use erkit_core::{ConnectionId, DiagramError, DiagramEvent, EventBus, Point, ShapeId};

use crate::geometry::{border_point, Bounds};
use crate::shapes::{Connection, ConnectionAttrs, ElementKind, Shape, ShapeSpec};

/// Read access to the current diagram state.
pub trait DiagramRegistry {
    fn shape(&self, id: ShapeId) -> Option<&Shape>;

    fn connection(&self, id: ConnectionId) -> Option<&Connection>;

    /// All shape ids in stable registry order.
    fn shape_ids(&self) -> Vec<ShapeId>;

    /// All connection ids in stable registry order.
    fn connection_ids(&self) -> Vec<ConnectionId>;

    fn shape_count(&self) -> usize {
        self.shape_ids().len()
    }

    fn connections_touching(&self, shape: ShapeId) -> Vec<ConnectionId> {
        self.connection_ids()
            .into_iter()
            .filter(|id| self.connection(*id).is_some_and(|c| c.touches(shape)))
            .collect()
    }

    /// Shapes whose parent is `container`, in registry order.
    fn children(&self, container: ShapeId) -> Vec<ShapeId> {
        self.shape_ids()
            .into_iter()
            .filter(|id| self.shape(*id).is_some_and(|s| s.parent == Some(container)))
            .collect()
    }

    /// Enclosing containers of `shape`, innermost first.
    fn ancestors(&self, shape: ShapeId) -> Vec<ShapeId> {
        let limit = self.shape_count();
        let mut chain = Vec::new();
        let mut current = self.shape(shape).and_then(|s| s.parent);
        while let Some(id) = current {
            // A corrupt parent loop would otherwise never end.
            if chain.len() >= limit || chain.contains(&id) {
                break;
            }
            chain.push(id);
            current = self.shape(id).and_then(|s| s.parent);
        }
        chain
    }

    /// True when `ancestor` is a (transitive) parent of `shape`.
    fn is_ancestor(&self, ancestor: ShapeId, shape: ShapeId) -> bool {
        self.ancestors(shape).contains(&ancestor)
    }
}

/// Mutation surface the core writes through.
pub trait Modeling: DiagramRegistry {
    fn set_waypoints(&mut self, id: ConnectionId, points: Vec<Point>) -> Result<(), DiagramError>;

    /// Moves `shape` into `parent` (root when `None`), translating it by `delta`.
    fn reparent_shape(
        &mut self,
        shape: ShapeId,
        parent: Option<ShapeId>,
        delta: Point,
    ) -> Result<(), DiagramError>;

    fn reparent_connection(
        &mut self,
        id: ConnectionId,
        parent: Option<ShapeId>,
    ) -> Result<(), DiagramError>;

    /// Moves and resizes `shape` to occupy `frame`.
    fn set_frame(&mut self, shape: ShapeId, frame: Bounds) -> Result<(), DiagramError>;

    fn create_shape(
        &mut self,
        spec: ShapeSpec,
        position: Point,
        parent: Option<ShapeId>,
    ) -> Result<ShapeId, DiagramError>;

    fn create_connection(
        &mut self,
        source: ShapeId,
        target: ShapeId,
        attrs: ConnectionAttrs,
        parent: Option<ShapeId>,
    ) -> Result<ConnectionId, DiagramError>;

    fn remove_connection(&mut self, id: ConnectionId) -> Result<Connection, DiagramError>;

    fn remove_shape(&mut self, id: ShapeId) -> Result<Shape, DiagramError>;
}

/// In-memory diagram model.
///
/// Iteration follows id order, which is creation order since ids are never
/// reused.
#[derive(Debug, Default)]
pub struct Diagram {
    shapes: BTreeMap<ShapeId, Shape>,
    connections: BTreeMap<ConnectionId, Connection>,
    next_id: u64,
    bus: Option<Arc<EventBus>>,
}

impl Diagram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a diagram that publishes change notifications on `bus`.
    pub fn with_event_bus(bus: Arc<EventBus>) -> Self {
        Self {
            bus: Some(bus),
            ..Self::default()
        }
    }

    pub fn attach_event_bus(&mut self, bus: Arc<EventBus>) {
        self.bus = Some(bus);
    }

    fn generate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn publish(&self, event: DiagramEvent) {
        if let Some(bus) = &self.bus {
            bus.publish(event);
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.values()
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Adds a root-level shape with its top-left corner at (`x`, `y`).
    pub fn add_shape(
        &mut self,
        kind: ElementKind,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<ShapeId, DiagramError> {
        self.create_shape(ShapeSpec::new(kind, width, height), Point::new(x, y), None)
    }

    /// Adds a root-level connection with default attributes.
    pub fn connect(&mut self, source: ShapeId, target: ShapeId) -> Result<ConnectionId, DiagramError> {
        self.create_connection(source, target, ConnectionAttrs::default(), None)
    }

    /// Host-side move: translates a shape without touching connections.
    pub fn move_shape(&mut self, id: ShapeId, dx: f64, dy: f64) -> Result<(), DiagramError> {
        let shape = self
            .shapes
            .get_mut(&id)
            .ok_or(DiagramError::ShapeNotFound { shape: id })?;
        shape.translate(dx, dy);
        Ok(())
    }

    /// Host-side resize keeping the top-left corner fixed.
    pub fn resize_shape(&mut self, id: ShapeId, width: f64, height: f64) -> Result<(), DiagramError> {
        let shape = self
            .shapes
            .get_mut(&id)
            .ok_or(DiagramError::ShapeNotFound { shape: id })?;
        shape.width = width;
        shape.height = height;
        Ok(())
    }

    /// Connections whose source and target are `a` and `b`, in either direction.
    pub fn connections_between(&self, a: ShapeId, b: ShapeId) -> Vec<ConnectionId> {
        self.connections
            .values()
            .filter(|c| (c.source == a && c.target == b) || (c.source == b && c.target == a))
            .map(|c| c.id)
            .collect()
    }

    fn check_parent(&self, shape: Option<ShapeId>, parent: Option<ShapeId>) -> Result<(), DiagramError> {
        let Some(parent) = parent else {
            return Ok(());
        };
        let container = self
            .shapes
            .get(&parent)
            .ok_or(DiagramError::ShapeNotFound { shape: parent })?;
        if !container.kind.is_container() {
            return Err(DiagramError::NotAContainer { shape: parent });
        }
        if let Some(shape) = shape {
            if shape == parent || self.is_ancestor(shape, parent) {
                return Err(DiagramError::ContainmentCycle { shape, parent });
            }
        }
        Ok(())
    }

    fn initial_waypoints(source: &Shape, target: &Shape) -> Vec<Point> {
        match (border_point(source, target), border_point(target, source)) {
            (Some(start), Some(end)) => vec![start, end],
            _ => vec![source.center(), target.center()],
        }
    }
}

impl DiagramRegistry for Diagram {
    fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(&id)
    }

    fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    fn shape_ids(&self) -> Vec<ShapeId> {
        self.shapes.keys().copied().collect()
    }

    fn connection_ids(&self) -> Vec<ConnectionId> {
        self.connections.keys().copied().collect()
    }

    fn shape_count(&self) -> usize {
        self.shapes.len()
    }
}

impl Modeling for Diagram {
    fn set_waypoints(&mut self, id: ConnectionId, points: Vec<Point>) -> Result<(), DiagramError> {
        if points.len() < 2 {
            return Err(DiagramError::TooFewWaypoints {
                connection: id,
                count: points.len(),
            });
        }
        let connection = self
            .connections
            .get_mut(&id)
            .ok_or(DiagramError::ConnectionNotFound { connection: id })?;
        connection.waypoints = points.clone();
        self.publish(DiagramEvent::WaypointsChanged {
            connection: id,
            waypoints: points,
        });
        Ok(())
    }

    fn reparent_shape(
        &mut self,
        shape: ShapeId,
        parent: Option<ShapeId>,
        delta: Point,
    ) -> Result<(), DiagramError> {
        if !self.shapes.contains_key(&shape) {
            return Err(DiagramError::ShapeNotFound { shape });
        }
        self.check_parent(Some(shape), parent)?;

        if let Some(s) = self.shapes.get_mut(&shape) {
            s.parent = parent;
            s.translate(delta.x, delta.y);
        }
        tracing::debug!("Reparented {} into {:?} by {}", shape, parent, delta);
        self.publish(DiagramEvent::ShapeReparented {
            shape,
            parent,
            delta,
        });
        Ok(())
    }

    fn reparent_connection(
        &mut self,
        id: ConnectionId,
        parent: Option<ShapeId>,
    ) -> Result<(), DiagramError> {
        if !self.connections.contains_key(&id) {
            return Err(DiagramError::ConnectionNotFound { connection: id });
        }
        self.check_parent(None, parent)?;
        if let Some(c) = self.connections.get_mut(&id) {
            c.parent = parent;
        }
        self.publish(DiagramEvent::ConnectionReparented {
            connection: id,
            parent,
        });
        Ok(())
    }

    fn set_frame(&mut self, shape: ShapeId, frame: Bounds) -> Result<(), DiagramError> {
        let (width, height) = (frame.width(), frame.height());
        if !(width > 0.0 && height > 0.0) {
            return Err(DiagramError::InvalidDimensions { width, height });
        }
        let s = self
            .shapes
            .get_mut(&shape)
            .ok_or(DiagramError::ShapeNotFound { shape })?;
        s.x = frame.min_x;
        s.y = frame.min_y;
        s.width = width;
        s.height = height;
        self.publish(DiagramEvent::ShapeResized {
            shape,
            origin: Point::new(frame.min_x, frame.min_y),
            width,
            height,
        });
        Ok(())
    }

    fn create_shape(
        &mut self,
        spec: ShapeSpec,
        position: Point,
        parent: Option<ShapeId>,
    ) -> Result<ShapeId, DiagramError> {
        if !(spec.width > 0.0 && spec.height > 0.0) {
            return Err(DiagramError::InvalidDimensions {
                width: spec.width,
                height: spec.height,
            });
        }
        self.check_parent(None, parent)?;

        let id = ShapeId(self.generate_id());
        let mut shape = Shape::new(id, spec.kind, position.x, position.y, spec.width, spec.height)
            .with_name(spec.name);
        shape.parent = parent;
        self.shapes.insert(id, shape);
        self.publish(DiagramEvent::ShapeCreated { shape: id, parent });
        Ok(id)
    }

    fn create_connection(
        &mut self,
        source: ShapeId,
        target: ShapeId,
        attrs: ConnectionAttrs,
        parent: Option<ShapeId>,
    ) -> Result<ConnectionId, DiagramError> {
        let source_shape = self
            .shapes
            .get(&source)
            .ok_or(DiagramError::ShapeNotFound { shape: source })?;
        let target_shape = self
            .shapes
            .get(&target)
            .ok_or(DiagramError::ShapeNotFound { shape: target })?;
        self.check_parent(None, parent)?;

        let waypoints = Self::initial_waypoints(source_shape, target_shape);
        let id = ConnectionId(self.generate_id());
        self.connections.insert(
            id,
            Connection {
                id,
                source,
                target,
                waypoints,
                attrs,
                parent,
            },
        );
        self.publish(DiagramEvent::ConnectionCreated {
            connection: id,
            source,
            target,
        });
        Ok(id)
    }

    fn remove_connection(&mut self, id: ConnectionId) -> Result<Connection, DiagramError> {
        let connection = self
            .connections
            .remove(&id)
            .ok_or(DiagramError::ConnectionNotFound { connection: id })?;
        self.publish(DiagramEvent::ConnectionRemoved { connection: id });
        Ok(connection)
    }

    /// Removes a shape together with every connection touching it. Containers
    /// must be emptied first.
    fn remove_shape(&mut self, id: ShapeId) -> Result<Shape, DiagramError> {
        if !self.shapes.contains_key(&id) {
            return Err(DiagramError::ShapeNotFound { shape: id });
        }
        let children = self.children(id);
        if !children.is_empty() {
            return Err(DiagramError::HasChildren {
                shape: id,
                count: children.len(),
            });
        }
        for connection in self.connections_touching(id) {
            self.remove_connection(connection)?;
        }
        let shape = self
            .shapes
            .remove(&id)
            .ok_or(DiagramError::ShapeNotFound { shape: id })?;
        self.publish(DiagramEvent::ShapeRemoved { shape: id });
        Ok(shape)
    }
}
