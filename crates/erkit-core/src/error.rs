//! Error handling for ERKit
//!
//! Provides error types for every layer of the diagram core:
//! - Diagram errors (registry lookups and mutations)
//! - Routing errors (border anchoring and path planning)
//! - Grouping errors (grouping/ungrouping preconditions)
//! - Restore errors (re-creating connections from snapshots)
//! - Configuration errors (loading and validating engine settings)
//!
//! All error types use `thiserror` for ergonomic error handling.

use crate::data::{ConnectionId, ShapeId};
use thiserror::Error;

/// Diagram error type
///
/// Represents failures reported by the shape/connection registry and its
/// mutation surface.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiagramError {
    /// Shape does not exist
    #[error("Shape not found: {shape}")]
    ShapeNotFound {
        /// The identifier that did not resolve.
        shape: ShapeId,
    },

    /// Connection does not exist
    #[error("Connection not found: {connection}")]
    ConnectionNotFound {
        /// The identifier that did not resolve.
        connection: ConnectionId,
    },

    /// The requested parent is not a container
    #[error("{shape} is not a container")]
    NotAContainer {
        /// The shape that was used as a parent.
        shape: ShapeId,
    },

    /// Reparenting would make a shape its own ancestor
    #[error("Cannot reparent {shape} into {parent}: cycle in containment")]
    ContainmentCycle {
        /// The shape being reparented.
        shape: ShapeId,
        /// The requested parent.
        parent: ShapeId,
    },

    /// Width or height are not positive numbers
    #[error("Invalid dimensions {width}x{height}")]
    InvalidDimensions {
        /// The requested width.
        width: f64,
        /// The requested height.
        height: f64,
    },

    /// A container still owns children and cannot be removed
    #[error("{shape} still has {count} children")]
    HasChildren {
        /// The container that was asked to be removed.
        shape: ShapeId,
        /// The number of remaining children.
        count: usize,
    },

    /// A connection needs at least two waypoints
    #[error("{connection} needs at least 2 waypoints, got {count}")]
    TooFewWaypoints {
        /// The connection being updated.
        connection: ConnectionId,
        /// The number of waypoints supplied.
        count: usize,
    },
}

/// Routing error type
///
/// Routing failures are recovered locally: the affected connection is skipped
/// and keeps its previous waypoints.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoutingError {
    /// Shape has non-positive width or height
    #[error("Degenerate shape {shape}: non-positive dimensions")]
    DegenerateShape {
        /// The shape that cannot be anchored.
        shape: ShapeId,
    },

    /// One endpoint of the connection is missing from the registry
    #[error("Endpoint {shape} of {connection} is missing")]
    MissingEndpoint {
        /// The connection being routed.
        connection: ConnectionId,
        /// The endpoint that did not resolve.
        shape: ShapeId,
    },

    /// Connection has fewer than two waypoints and is treated as not yet initialised
    #[error("{connection} is not initialised ({count} waypoints)")]
    UninitializedConnection {
        /// The connection being routed.
        connection: ConnectionId,
        /// The number of waypoints it currently has.
        count: usize,
    },

    /// Connection vanished between lookup and update
    #[error("Connection not found: {connection}")]
    ConnectionNotFound {
        /// The identifier that did not resolve.
        connection: ConnectionId,
    },
}

/// Grouping error type
///
/// Grouping and ungrouping are all-or-nothing: when one of these is returned
/// the diagram has not been mutated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GroupingError {
    /// Fewer than two shapes were selected
    #[error("Grouping needs at least 2 shapes, got {count}")]
    InsufficientSelection {
        /// The number of distinct shapes selected.
        count: usize,
    },

    /// The container has no children
    #[error("Container {container} has no children")]
    EmptyContainer {
        /// The container that was asked to be ungrouped.
        container: ShapeId,
    },

    /// Another grouping or ungrouping operation is in progress
    #[error("A grouping operation is already in progress")]
    ReentrantOperation,

    /// A selected shape does not exist
    #[error("Unknown shape {shape}")]
    UnknownShape {
        /// The identifier that did not resolve.
        shape: ShapeId,
    },

    /// Ungroup was requested on a plain shape
    #[error("{shape} is not a container")]
    NotAContainer {
        /// The shape that was passed as container.
        shape: ShapeId,
    },

    /// The selection contains both a container and one of its descendants
    #[error("{shape} is nested inside selected container {container}")]
    NestedSelection {
        /// The descendant shape.
        shape: ShapeId,
        /// The selected ancestor.
        container: ShapeId,
    },

    /// The mutation surface rejected a step
    #[error(transparent)]
    Diagram(#[from] DiagramError),
}

/// Restore error type
///
/// Raised when a connection snapshot cannot be turned back into a live
/// connection.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RestoreError {
    /// An endpoint of the snapshot no longer exists
    #[error("Cannot restore {connection}: endpoint {missing} no longer exists")]
    UnresolvableEndpoint {
        /// The connection the snapshot was taken from.
        connection: ConnectionId,
        /// The endpoint that did not resolve.
        missing: ShapeId,
    },

    /// The mutation surface rejected the new connection
    #[error(transparent)]
    Diagram(#[from] DiagramError),
}

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A configuration value is out of its valid range
    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue {
        /// The configuration key.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The configuration file format is not supported
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// I/O error during load or save
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),
}

/// Main error type for ERKit
///
/// A unified error type that can represent any error from all layers.
#[derive(Error, Debug)]
pub enum Error {
    /// Diagram error
    #[error(transparent)]
    Diagram(#[from] DiagramError),

    /// Routing error
    #[error(transparent)]
    Routing(#[from] RoutingError),

    /// Grouping error
    #[error(transparent)]
    Grouping(#[from] GroupingError),

    /// Restore error
    #[error(transparent)]
    Restore(#[from] RestoreError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a grouping error
    pub fn is_grouping_error(&self) -> bool {
        matches!(self, Error::Grouping(_))
    }

    /// Check if this is a routing error
    pub fn is_routing_error(&self) -> bool {
        matches!(self, Error::Routing(_))
    }

    /// Check if this error comes from a transient diagram state that callers
    /// may log and skip instead of surfacing
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Routing(RoutingError::DegenerateShape { .. })
                | Error::Routing(RoutingError::MissingEndpoint { .. })
                | Error::Restore(RestoreError::UnresolvableEndpoint { .. })
        )
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
