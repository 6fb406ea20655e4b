//! # ERKit Designer
//!
//! Geometry and containment core of the ERKit diagram editor. It keeps
//! connection waypoints anchored to shape borders as shapes move, and groups
//! shapes into containers (and back) without losing the connections between
//! them.
//!
//! ## Core Components
//!
//! - **Geometry**: bounding boxes and border anchoring for rectangles and diamonds
//! - **Routing**: direct or single-bend orthogonal paths, with obstacle detours
//! - **Waypoints**: debounced rerouting with a change tolerance
//! - **Containment**: group/ungroup with connection capture and restore
//! - **Diagram**: registry traits and the in-memory model
//!
//! ## Architecture
//!
//! ```text
//! DiagramEditor
//!   ├── WaypointMaintainer
//!   │     ├── MoveDebouncer
//!   │     └── Router ── geometry
//!   ├── ContainmentEngine (OperationLock)
//!   └── Modeling (Diagram or a host model) ── EventBus
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use erkit_designer::{DiagramEditor, ElementKind, MoveEvent};
//!
//! let mut editor = DiagramEditor::new();
//! let a = editor.model_mut().add_shape(ElementKind::Entity, 0.0, 0.0, 100.0, 50.0)?;
//! let b = editor.model_mut().add_shape(ElementKind::Entity, 300.0, 0.0, 100.0, 50.0)?;
//! editor.model_mut().connect(a, b)?;
//!
//! editor.model_mut().move_shape(b, 0.0, 120.0)?;
//! editor.on_shape_moved(MoveEvent::new(b, 0.0, 120.0));
//! editor.flush();
//!
//! let container = editor.group(&[a, b])?;
//! ```

pub mod containment;
pub mod debounce;
pub mod diagram;
pub mod editor;
pub mod geometry;
pub mod routing;
pub mod shapes;
pub mod waypoints;

pub use containment::{
    capture_connections, container_frame, ConnectionSnapshot, ContainmentEngine, GroupOutcome,
    OperationGuard, OperationLock, Padding, UngroupOutcome,
};
pub use debounce::MoveDebouncer;
pub use diagram::{Diagram, DiagramRegistry, Modeling};
pub use editor::DiagramEditor;
pub use geometry::{border_point, border_point_toward, is_on_border, union_bounds, Bounds};
pub use routing::{is_waypoint_safe, line_intersects, Route, Router};
pub use shapes::{Connection, ConnectionAttrs, ElementKind, Shape, ShapeSpec, Silhouette};
pub use waypoints::{has_changed_significantly, MaintenanceReport, MoveEvent, WaypointMaintainer};
