//! Waypoint maintenance.
//!
//! Keeps connection waypoints consistent with shape positions. Move and
//! resize notifications are debounced per shape; once a shape's quiet period
//! elapses every connection touching it is rerouted, and the new waypoints are
//! written back only when they differ beyond the configured tolerance.

use std::time::{Duration, Instant};

use erkit_core::{ConnectionId, EngineConfig, MaintainerConfig, Point, RoutingConfig, RoutingError, ShapeId};

use crate::debounce::MoveDebouncer;
use crate::diagram::{DiagramRegistry, Modeling};
use crate::routing::Router;
use crate::shapes::Shape;

/// A shape that has finished moving.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveEvent {
    pub shape: ShapeId,
    pub delta: Point,
}

impl MoveEvent {
    pub fn new(shape: ShapeId, dx: f64, dy: f64) -> Self {
        Self {
            shape,
            delta: Point::new(dx, dy),
        }
    }
}

/// Outcome of one maintenance pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaintenanceReport {
    /// Connections whose waypoints were replaced.
    pub updated: Vec<ConnectionId>,
    /// Connections rerouted to within tolerance of their current waypoints.
    pub unchanged: Vec<ConnectionId>,
    /// Connections left untouched, with the reason.
    pub skipped: Vec<(ConnectionId, RoutingError)>,
}

impl MaintenanceReport {
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.unchanged.is_empty() && self.skipped.is_empty()
    }

    pub fn visited(&self) -> usize {
        self.updated.len() + self.unchanged.len() + self.skipped.len()
    }

    pub fn merge(&mut self, other: MaintenanceReport) {
        self.updated.extend(other.updated);
        self.unchanged.extend(other.unchanged);
        self.skipped.extend(other.skipped);
    }
}

/// True when the sequences differ in length or any point pair differs by more
/// than `tolerance` on either axis.
pub fn has_changed_significantly(old: &[Point], new: &[Point], tolerance: f64) -> bool {
    old.len() != new.len()
        || old
            .iter()
            .zip(new)
            .any(|(a, b)| (a.x - b.x).abs() > tolerance || (a.y - b.y).abs() > tolerance)
}

#[derive(Debug, Clone)]
pub struct WaypointMaintainer {
    router: Router,
    config: MaintainerConfig,
    debouncer: MoveDebouncer,
}

impl Default for WaypointMaintainer {
    fn default() -> Self {
        Self::new(RoutingConfig::default(), MaintainerConfig::default())
    }
}

impl WaypointMaintainer {
    pub fn new(routing: RoutingConfig, config: MaintainerConfig) -> Self {
        Self {
            router: Router::new(routing),
            config,
            debouncer: MoveDebouncer::new(Duration::from_millis(config.debounce_ms)),
        }
    }

    pub fn from_engine_config(config: &EngineConfig) -> Self {
        Self::new(config.routing, config.maintainer)
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn config(&self) -> &MaintainerConfig {
        &self.config
    }

    pub fn pending_count(&self) -> usize {
        self.debouncer.pending_count()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.next_deadline()
    }

    /// Schedules a reroute of `event.shape`'s connections. Returns `true` when
    /// a pending request for the same shape was superseded.
    pub fn on_shape_moved(&mut self, event: &MoveEvent, now: Instant) -> bool {
        tracing::trace!("{} moved by {}", event.shape, event.delta);
        self.debouncer.schedule(event.shape, now)
    }

    pub fn on_shapes_moved(&mut self, events: &[MoveEvent], now: Instant) {
        for event in events {
            self.on_shape_moved(event, now);
        }
    }

    pub fn on_shape_resized(&mut self, shape: ShapeId, now: Instant) -> bool {
        tracing::trace!("{} resized", shape);
        self.debouncer.schedule(shape, now)
    }

    /// Forgets any pending reroute for `shape`.
    pub fn cancel(&mut self, shape: ShapeId) -> bool {
        self.debouncer.cancel(shape)
    }

    /// Runs maintenance for every shape whose quiet period has elapsed.
    pub fn tick<M: Modeling + ?Sized>(&mut self, model: &mut M, now: Instant) -> MaintenanceReport {
        let due = self.debouncer.drain_due(now);
        self.refresh_shapes(model, &due)
    }

    /// Runs maintenance for every pending shape immediately.
    pub fn flush<M: Modeling + ?Sized>(&mut self, model: &mut M) -> MaintenanceReport {
        let pending = self.debouncer.drain_all();
        self.refresh_shapes(model, &pending)
    }

    /// Reroutes every connection touching `shape`, bypassing the debouncer.
    pub fn refresh_shape<M: Modeling + ?Sized>(&self, model: &mut M, shape: ShapeId) -> MaintenanceReport {
        self.refresh_shapes(model, &[shape])
    }

    /// Reroutes the connections touching any of `shapes`. A connection shared by
    /// two of them is visited once.
    pub fn refresh_shapes<M: Modeling + ?Sized>(&self, model: &mut M, shapes: &[ShapeId]) -> MaintenanceReport {
        let mut connections: Vec<ConnectionId> = Vec::new();
        for shape in shapes {
            for id in model.connections_touching(*shape) {
                if !connections.contains(&id) {
                    connections.push(id);
                }
            }
        }
        self.refresh_connections(model, &connections)
    }

    pub fn refresh_connections<M: Modeling + ?Sized>(
        &self,
        model: &mut M,
        connections: &[ConnectionId],
    ) -> MaintenanceReport {
        let mut report = MaintenanceReport::default();
        for id in connections {
            match self.refresh_connection(model, *id) {
                Ok(true) => report.updated.push(*id),
                Ok(false) => report.unchanged.push(*id),
                Err(err) => {
                    tracing::warn!("Skipping {}: {}", id, err);
                    report.skipped.push((*id, err));
                }
            }
        }
        if !report.is_empty() {
            tracing::debug!(
                "Maintenance pass: {} updated, {} unchanged, {} skipped",
                report.updated.len(),
                report.unchanged.len(),
                report.skipped.len()
            );
        }
        report
    }

    /// Reroutes a single connection. Returns `Ok(true)` when its waypoints
    /// were replaced.
    pub fn refresh_connection<M: Modeling + ?Sized>(
        &self,
        model: &mut M,
        id: ConnectionId,
    ) -> Result<bool, RoutingError> {
        let (current, route) = {
            let connection = model
                .connection(id)
                .ok_or(RoutingError::ConnectionNotFound { connection: id })?;
            if connection.waypoints.len() < 2 {
                return Err(RoutingError::UninitializedConnection {
                    connection: id,
                    count: connection.waypoints.len(),
                });
            }
            let source = model.shape(connection.source).ok_or(RoutingError::MissingEndpoint {
                connection: id,
                shape: connection.source,
            })?;
            let target = model.shape(connection.target).ok_or(RoutingError::MissingEndpoint {
                connection: id,
                shape: connection.target,
            })?;

            let route = if self.config.avoid_obstacles {
                let obstacles = obstacles_for(&*model, source, target);
                self.router.route_avoiding(source, target, &obstacles)?
            } else {
                self.router.route(source, target)?
            };
            (connection.waypoints.clone(), route)
        };

        if !has_changed_significantly(&current, &route, self.config.change_tolerance) {
            return Ok(false);
        }

        let points: Vec<Point> = route.into_vec();
        tracing::debug!("Rerouting {} through {} points", id, points.len());
        model
            .set_waypoints(id, points)
            // Only a vanished connection can fail here; routes always have two points.
            .map_err(|_| RoutingError::ConnectionNotFound { connection: id })?;
        Ok(true)
    }
}

/// Shapes a connection between `source` and `target` should steer around:
/// everything except the endpoints, the containers enclosing them, and shapes
/// nested inside them.
fn obstacles_for<'a, R: DiagramRegistry + ?Sized>(
    model: &'a R,
    source: &Shape,
    target: &Shape,
) -> Vec<&'a Shape> {
    let mut related = model.ancestors(source.id);
    related.extend(model.ancestors(target.id));
    related.push(source.id);
    related.push(target.id);

    model
        .shape_ids()
        .into_iter()
        .filter(|id| !related.contains(id))
        .filter(|id| {
            !model
                .ancestors(*id)
                .iter()
                .any(|a| *a == source.id || *a == target.id)
        })
        .filter_map(|id| model.shape(id))
        .collect()
}
