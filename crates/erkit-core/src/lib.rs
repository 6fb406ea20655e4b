//! # ERKit Core
//!
//! Core types, errors, and utilities for ERKit.
//! Provides the identifiers and plain data shared by every layer, the error
//! taxonomy, the change-notification event bus and the engine configuration.

pub mod config;
pub mod data;
pub mod error;
pub mod event_bus;

pub use config::{ContainmentConfig, EngineConfig, MaintainerConfig, RoutingConfig};

pub use data::{ConnectionId, Point, ShapeId};

pub use error::{
    ConfigError, DiagramError, Error, GroupingError, RestoreError, Result, RoutingError,
};

// Re-export event bus for convenience
pub use event_bus::{
    DiagramEvent, EventBus, EventBusConfig, EventCategory, EventFilter,
    SubscriptionId,
};
