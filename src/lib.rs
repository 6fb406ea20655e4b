//! # ERKit
//!
//! Connection routing and containment core for interactive ER/BPMN-style
//! diagram editors.
//!
//! ## Architecture
//!
//! ERKit is organized as a workspace with multiple crates:
//!
//! 1. **erkit-core** - Identifiers, errors, event bus, engine configuration
//! 2. **erkit-designer** - Border anchoring, routing, waypoint maintenance, grouping
//! 3. **erkit** - This facade, re-exporting both and setting up logging
//!
//! ## Features
//!
//! - **Border anchoring**: rectangles, ellipses and diamonds
//! - **Orthogonal routing**: direct edges, single bends and obstacle detours
//! - **Debounced maintenance**: reroutes once per drag gesture, with a change tolerance
//! - **Grouping**: padded containers that keep connections intact across group/ungroup

pub use erkit_core::{config, data, event_bus};
pub use erkit_designer as designer;

pub use erkit_core::{
    ConfigError, ConnectionId, ContainmentConfig, DiagramError, DiagramEvent, EngineConfig, Error,
    EventBus, EventBusConfig, EventCategory, EventFilter, GroupingError, MaintainerConfig, Point,
    RestoreError, Result, RoutingConfig, RoutingError, ShapeId, SubscriptionId,
};

pub use erkit_designer::{
    Connection, ConnectionAttrs, ContainmentEngine, Diagram, DiagramEditor, DiagramRegistry,
    ElementKind, GroupOutcome, MaintenanceReport, Modeling, MoveEvent, Router, Shape, ShapeSpec,
    UngroupOutcome, WaypointMaintainer,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support, `info` by default
///
/// Calling it again after a subscriber is installed returns an error instead
/// of panicking.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))?;

    tracing::debug!("ERKit {} logging initialized", VERSION);
    Ok(())
}

/// Initialize logging with one JSON object per line, for log collectors.
pub fn init_json_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().json())
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))?;
    Ok(())
}

fn env_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}
