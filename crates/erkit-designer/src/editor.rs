//! Editor facade.
//!
//! Owns the model, the waypoint maintainer and the containment engine, and
//! forwards their outcomes to the event bus. Hosts feed it move/resize
//! notifications and drive the debouncer through [`DiagramEditor::tick`].

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use erkit_core::{
    ConnectionId, DiagramEvent, EngineConfig, EventBus, GroupingError, RestoreError, ShapeId,
};

use crate::containment::{ContainmentEngine, GroupOutcome, OperationLock, UngroupOutcome};
use crate::diagram::{Diagram, DiagramRegistry, Modeling};
use crate::waypoints::{MaintenanceReport, MoveEvent, WaypointMaintainer};

/// Events kept on the editor's own bus for inspection.
const RECENT_EVENTS: usize = 256;

#[derive(Debug)]
pub struct DiagramEditor<M: Modeling = Diagram> {
    model: M,
    maintainer: WaypointMaintainer,
    containment: ContainmentEngine,
    bus: Arc<EventBus>,
    config: EngineConfig,
}

impl DiagramEditor<Diagram> {
    /// Editor over an empty in-memory diagram with default settings.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let bus = Arc::new(EventBus::recording(RECENT_EVENTS));
        let model = Diagram::with_event_bus(Arc::clone(&bus));
        Self::assemble(model, config, bus)
    }

    /// Editor configured from a `.json` or `.toml` file.
    pub fn from_config_file(path: &Path) -> erkit_core::Result<Self> {
        let config = EngineConfig::load(path)?;
        Ok(Self::with_config(config))
    }
}

impl Default for DiagramEditor<Diagram> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Modeling> DiagramEditor<M> {
    /// Editor over a host-provided model. The model publishes its own
    /// structure events, if any; the editor publishes to `bus`.
    pub fn with_model(model: M, config: EngineConfig, bus: Arc<EventBus>) -> Self {
        Self::assemble(model, config, bus)
    }

    fn assemble(model: M, config: EngineConfig, bus: Arc<EventBus>) -> Self {
        Self {
            model,
            maintainer: WaypointMaintainer::from_engine_config(&config),
            containment: ContainmentEngine::new(config.containment),
            bus,
            config,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn maintainer(&self) -> &WaypointMaintainer {
        &self.maintainer
    }

    /// Handle on the grouping lock; holding a guard from it blocks
    /// [`DiagramEditor::group`] and [`DiagramEditor::ungroup`].
    pub fn operation_lock(&self) -> OperationLock {
        self.containment.lock().clone()
    }

    pub fn on_shape_moved(&mut self, event: MoveEvent) {
        self.on_shape_moved_at(event, Instant::now());
    }

    pub fn on_shape_moved_at(&mut self, event: MoveEvent, now: Instant) {
        self.maintainer.on_shape_moved(&event, now);
    }

    pub fn on_shapes_moved(&mut self, events: &[MoveEvent]) {
        self.maintainer.on_shapes_moved(events, Instant::now());
    }

    pub fn on_shapes_moved_at(&mut self, events: &[MoveEvent], now: Instant) {
        self.maintainer.on_shapes_moved(events, now);
    }

    pub fn on_shape_resized(&mut self, shape: ShapeId) {
        self.maintainer.on_shape_resized(shape, Instant::now());
    }

    pub fn on_shape_resized_at(&mut self, shape: ShapeId, now: Instant) {
        self.maintainer.on_shape_resized(shape, now);
    }

    pub fn pending_count(&self) -> usize {
        self.maintainer.pending_count()
    }

    /// Runs maintenance for shapes whose quiet period elapsed by `now`.
    pub fn tick(&mut self, now: Instant) -> MaintenanceReport {
        let report = self.maintainer.tick(&mut self.model, now);
        self.publish_skips(&report);
        report
    }

    /// Runs all pending maintenance immediately.
    pub fn flush(&mut self) -> MaintenanceReport {
        let report = self.maintainer.flush(&mut self.model);
        self.publish_skips(&report);
        report
    }

    pub fn group(&mut self, shapes: &[ShapeId]) -> Result<ShapeId, GroupingError> {
        self.group_with_outcome(shapes).map(|outcome| outcome.container)
    }

    pub fn group_with_outcome(&mut self, shapes: &[ShapeId]) -> Result<GroupOutcome, GroupingError> {
        let outcome = self
            .containment
            .group(&mut self.model, &self.maintainer, shapes)?;

        self.publish_skips(&outcome.routing);
        self.publish_dropped(&outcome.dropped);
        self.publish(DiagramEvent::Grouped {
            container: outcome.container,
            members: outcome.members.clone(),
        });
        Ok(outcome)
    }

    pub fn ungroup(&mut self, container: ShapeId) -> Result<Vec<ShapeId>, GroupingError> {
        self.ungroup_with_outcome(container)
            .map(|outcome| outcome.children)
    }

    pub fn ungroup_with_outcome(&mut self, container: ShapeId) -> Result<UngroupOutcome, GroupingError> {
        let outcome = self
            .containment
            .ungroup(&mut self.model, &self.maintainer, container)?;
        self.maintainer.cancel(container);

        self.publish_skips(&outcome.routing);
        self.publish_dropped(&outcome.dropped);
        self.publish(DiagramEvent::Ungrouped {
            container,
            children: outcome.children.clone(),
        });
        Ok(outcome)
    }

    /// Whether the rendering layer should let users pick `connection`.
    ///
    /// Connections owned by a container are locked with it.
    pub fn can_interact_with(&self, connection: ConnectionId) -> bool {
        let Some(connection) = self.model.connection(connection) else {
            return false;
        };
        match connection.parent {
            Some(parent) => !self
                .model
                .shape(parent)
                .is_some_and(|shape| shape.kind.is_container()),
            None => true,
        }
    }

    fn publish(&self, event: DiagramEvent) {
        let delivered = self.bus.publish(event);
        tracing::trace!("editor event delivered to {}", delivered);
    }

    fn publish_skips(&self, report: &MaintenanceReport) {
        for (connection, reason) in &report.skipped {
            self.publish(DiagramEvent::RoutingSkipped {
                connection: *connection,
                reason: reason.to_string(),
            });
        }
    }

    fn publish_dropped(&self, dropped: &[RestoreError]) {
        for err in dropped {
            let RestoreError::UnresolvableEndpoint { connection, .. } = err else {
                continue;
            };
            self.publish(DiagramEvent::SnapshotDropped {
                connection: *connection,
                reason: err.to_string(),
            });
        }
    }
}
