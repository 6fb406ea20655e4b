//! Event type definitions for the event bus.
//!
//! Events are cloneable and serializable for logging/replay.

use serde::{Deserialize, Serialize};

use crate::data::{ConnectionId, Point, ShapeId};

/// Change notification emitted by the diagram core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiagramEvent {
    /// A connection's waypoints were replaced.
    WaypointsChanged {
        /// The connection that changed.
        connection: ConnectionId,
        /// The new waypoint sequence.
        waypoints: Vec<Point>,
    },
    /// A shape was created.
    ShapeCreated {
        /// The new shape.
        shape: ShapeId,
        /// Its parent container, if any.
        parent: Option<ShapeId>,
    },
    /// A shape was removed.
    ShapeRemoved {
        /// The removed shape.
        shape: ShapeId,
    },
    /// A shape was moved and resized to a new frame.
    ShapeResized {
        /// The shape that changed.
        shape: ShapeId,
        /// New top-left corner.
        origin: Point,
        /// New width.
        width: f64,
        /// New height.
        height: f64,
    },
    /// A shape changed owner and was translated by `delta`.
    ShapeReparented {
        /// The shape that moved.
        shape: ShapeId,
        /// The new parent, `None` for the root scope.
        parent: Option<ShapeId>,
        /// Translation applied during the move.
        delta: Point,
    },
    /// A connection was created.
    ConnectionCreated {
        /// The new connection.
        connection: ConnectionId,
        /// Source shape.
        source: ShapeId,
        /// Target shape.
        target: ShapeId,
    },
    /// A connection was removed.
    ConnectionRemoved {
        /// The removed connection.
        connection: ConnectionId,
    },
    /// A connection changed owning scope.
    ConnectionReparented {
        /// The connection that moved.
        connection: ConnectionId,
        /// The new parent, `None` for the root scope.
        parent: Option<ShapeId>,
    },
    /// Shapes were grouped into a new container.
    Grouped {
        /// The new container.
        container: ShapeId,
        /// The members, in selection order.
        members: Vec<ShapeId>,
    },
    /// A container was dissolved.
    Ungrouped {
        /// The removed container.
        container: ShapeId,
        /// The relocated children.
        children: Vec<ShapeId>,
    },
    /// A connection was left untouched by a maintenance pass.
    RoutingSkipped {
        /// The skipped connection.
        connection: ConnectionId,
        /// Human readable reason.
        reason: String,
    },
    /// A captured connection could not be restored.
    SnapshotDropped {
        /// The connection the snapshot was taken from.
        connection: ConnectionId,
        /// Human readable reason.
        reason: String,
    },
}

impl DiagramEvent {
    /// Get the category of this event
    pub fn category(&self) -> EventCategory {
        match self {
            DiagramEvent::WaypointsChanged { .. } => EventCategory::Routing,
            DiagramEvent::ShapeReparented { .. }
            | DiagramEvent::ConnectionReparented { .. }
            | DiagramEvent::Grouped { .. }
            | DiagramEvent::Ungrouped { .. } => EventCategory::Membership,
            DiagramEvent::ShapeCreated { .. }
            | DiagramEvent::ShapeRemoved { .. }
            | DiagramEvent::ShapeResized { .. }
            | DiagramEvent::ConnectionCreated { .. }
            | DiagramEvent::ConnectionRemoved { .. } => EventCategory::Structure,
            DiagramEvent::RoutingSkipped { .. } | DiagramEvent::SnapshotDropped { .. } => {
                EventCategory::Diagnostic
            }
        }
    }

    /// Get a short description of this event for logging
    pub fn description(&self) -> String {
        match self {
            DiagramEvent::WaypointsChanged {
                connection,
                waypoints,
            } => format!("{} rerouted ({} points)", connection, waypoints.len()),
            DiagramEvent::ShapeCreated { shape, .. } => format!("{} created", shape),
            DiagramEvent::ShapeRemoved { shape } => format!("{} removed", shape),
            DiagramEvent::ShapeResized {
                shape,
                width,
                height,
                ..
            } => format!("{} resized to {:.0}x{:.0}", shape, width, height),
            DiagramEvent::ShapeReparented { shape, parent, .. } => match parent {
                Some(parent) => format!("{} moved into {}", shape, parent),
                None => format!("{} moved to root", shape),
            },
            DiagramEvent::ConnectionCreated {
                connection,
                source,
                target,
            } => format!("{} created: {} -> {}", connection, source, target),
            DiagramEvent::ConnectionRemoved { connection } => format!("{} removed", connection),
            DiagramEvent::ConnectionReparented { connection, parent } => match parent {
                Some(parent) => format!("{} moved into {}", connection, parent),
                None => format!("{} moved to root", connection),
            },
            DiagramEvent::Grouped { container, members } => {
                format!("{} shapes grouped into {}", members.len(), container)
            }
            DiagramEvent::Ungrouped {
                container,
                children,
            } => format!("{} ungrouped ({} children)", container, children.len()),
            DiagramEvent::RoutingSkipped { connection, reason } => {
                format!("{} skipped: {}", connection, reason)
            }
            DiagramEvent::SnapshotDropped { connection, reason } => {
                format!("{} dropped: {}", connection, reason)
            }
        }
    }
}

/// Event category for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    /// Waypoint updates.
    Routing,
    /// Ownership changes and grouping.
    Membership,
    /// Shapes and connections created or removed.
    Structure,
    /// Skips and dropped snapshots.
    Diagnostic,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventCategory::Routing => write!(f, "Routing"),
            EventCategory::Membership => write!(f, "Membership"),
            EventCategory::Structure => write!(f, "Structure"),
            EventCategory::Diagnostic => write!(f, "Diagnostic"),
        }
    }
}
