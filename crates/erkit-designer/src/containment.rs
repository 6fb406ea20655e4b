//! Containment engine: grouping and ungrouping.
//!
//! Both operations run to completion synchronously and are serialised by an
//! [`OperationLock`]. Preconditions are checked before the first mutation, so a
//! rejected request leaves the diagram untouched, and a host failure part-way
//! through is undone step by step. Enclosing containers grow so they keep
//! enclosing their children. Connections incident on the
//! affected shapes are snapshotted first; any snapshot whose connection no
//! longer resolves afterwards is re-created from the snapshot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use erkit_core::{
    ConnectionId, ContainmentConfig, DiagramError, GroupingError, Point, RestoreError, ShapeId,
};
use serde::{Deserialize, Serialize};

use crate::diagram::{DiagramRegistry, Modeling};
use crate::geometry::{is_on_border, union_bounds, Bounds};
use crate::shapes::{Connection, ConnectionAttrs, ElementKind, Shape, ShapeSpec};
use crate::waypoints::{MaintenanceReport, WaypointMaintainer};

/// Tolerance for deciding whether a captured endpoint still sits on its shape.
const ANCHOR_TOLERANCE: f64 = 0.5;

/// Re-entrancy flag shared by every grouping operation of one editor.
#[derive(Debug, Clone, Default)]
pub struct OperationLock {
    busy: Arc<AtomicBool>,
}

impl OperationLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an operation as in progress; `None` if one already is.
    pub fn try_acquire(&self) -> Option<OperationGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| OperationGuard {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the [`OperationLock`] when dropped.
#[derive(Debug)]
pub struct OperationGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Space left between the member bounds and the container edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Padding {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Padding {
    /// Tiered padding by member count; the top always reserves the title band.
    pub fn for_members(count: usize, config: &ContainmentConfig) -> Self {
        let side = match count {
            0..=2 => config.padding_small,
            3..=4 => config.padding_medium,
            _ => config.padding_large,
        };
        Self {
            left: side,
            right: side,
            top: config.title_band,
            bottom: side,
        }
    }
}

/// Frame of a container enclosing `members`, or `None` for an empty slice.
pub fn container_frame(members: &[&Shape], config: &ContainmentConfig) -> Option<Bounds> {
    let bounds = union_bounds(members.iter().copied())?;
    let padding = Padding::for_members(members.len(), config);
    Some(Bounds::new(
        bounds.min_x - padding.left,
        bounds.min_y - padding.top,
        bounds.max_x + padding.right,
        bounds.max_y + padding.bottom,
    ))
}

/// Value copy of a connection, independent of the live record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSnapshot {
    pub id: ConnectionId,
    pub source: ShapeId,
    pub target: ShapeId,
    pub attrs: ConnectionAttrs,
    pub waypoints: Vec<Point>,
    pub parent: Option<ShapeId>,
}

impl ConnectionSnapshot {
    pub fn of(connection: &Connection) -> Self {
        Self {
            id: connection.id,
            source: connection.source,
            target: connection.target,
            attrs: connection.attrs.clone(),
            waypoints: connection.waypoints.clone(),
            parent: connection.parent,
        }
    }

    /// Both endpoints are in `shapes`.
    pub fn is_internal(&self, shapes: &[ShapeId]) -> bool {
        shapes.contains(&self.source) && shapes.contains(&self.target)
    }

    fn matches(&self, connection: &Connection) -> bool {
        connection.source == self.source
            && connection.target == self.target
            && connection.attrs == self.attrs
    }
}

/// Snapshots every connection with at least one endpoint in `shapes`, in
/// registry order.
pub fn capture_connections<R: DiagramRegistry + ?Sized>(
    model: &R,
    shapes: &[ShapeId],
) -> Vec<ConnectionSnapshot> {
    model
        .connection_ids()
        .into_iter()
        .filter_map(|id| model.connection(id))
        .filter(|c| shapes.contains(&c.source) || shapes.contains(&c.target))
        .map(ConnectionSnapshot::of)
        .collect()
}

/// Result of a successful group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupOutcome {
    pub container: ShapeId,
    pub members: Vec<ShapeId>,
    /// Snapshot id paired with the live connection that now stands for it.
    pub restored: Vec<(ConnectionId, ConnectionId)>,
    pub dropped: Vec<RestoreError>,
    pub routing: MaintenanceReport,
}

/// Result of a successful ungroup.
#[derive(Debug, Clone, PartialEq)]
pub struct UngroupOutcome {
    pub container: ShapeId,
    /// Relocated children in registry order.
    pub children: Vec<ShapeId>,
    /// Connections that ended on the container itself.
    pub removed: Vec<ConnectionId>,
    pub restored: Vec<(ConnectionId, ConnectionId)>,
    pub dropped: Vec<RestoreError>,
    pub routing: MaintenanceReport,
}

/// Inverse of one applied mutation.
#[derive(Debug)]
enum Undo {
    Created(ShapeId),
    MovedShape {
        shape: ShapeId,
        parent: Option<ShapeId>,
        delta: Point,
    },
    MovedConnection {
        connection: ConnectionId,
        parent: Option<ShapeId>,
    },
    Framed {
        shape: ShapeId,
        frame: Bounds,
    },
    RemovedConnection(ConnectionSnapshot),
}

/// Mutations applied so far by one group or ungroup, undone in reverse when a
/// later step fails.
#[derive(Debug, Default)]
struct Journal {
    steps: Vec<Undo>,
}

impl Journal {
    fn reparent_shape<M: Modeling + ?Sized>(
        &mut self,
        model: &mut M,
        shape: ShapeId,
        from: Option<ShapeId>,
        to: Option<ShapeId>,
        delta: Point,
    ) -> Result<(), DiagramError> {
        model.reparent_shape(shape, to, delta)?;
        self.steps.push(Undo::MovedShape {
            shape,
            parent: from,
            delta,
        });
        Ok(())
    }

    fn reparent_connection<M: Modeling + ?Sized>(
        &mut self,
        model: &mut M,
        connection: ConnectionId,
        to: Option<ShapeId>,
    ) -> Result<(), DiagramError> {
        let from = model
            .connection(connection)
            .ok_or(DiagramError::ConnectionNotFound { connection })?
            .parent;
        model.reparent_connection(connection, to)?;
        self.steps.push(Undo::MovedConnection {
            connection,
            parent: from,
        });
        Ok(())
    }

    fn rollback<M: Modeling + ?Sized>(self, model: &mut M) {
        tracing::warn!("Rolling back {} steps", self.steps.len());
        for step in self.steps.into_iter().rev() {
            let result = match &step {
                Undo::Created(shape) => model.remove_shape(*shape).map(drop),
                Undo::MovedShape {
                    shape,
                    parent,
                    delta,
                } => model.reparent_shape(*shape, *parent, Point::new(-delta.x, -delta.y)),
                Undo::MovedConnection { connection, parent } => {
                    model.reparent_connection(*connection, *parent)
                }
                Undo::Framed { shape, frame } => model.set_frame(*shape, *frame),
                Undo::RemovedConnection(snapshot) => model
                    .create_connection(
                        snapshot.source,
                        snapshot.target,
                        snapshot.attrs.clone(),
                        snapshot.parent,
                    )
                    .and_then(|id| model.set_waypoints(id, snapshot.waypoints.clone())),
            };
            if let Err(err) = result {
                tracing::warn!("Rollback step {:?} failed: {}", step, err);
            }
        }
    }
}

#[derive(Debug, Default)]
struct RestoreTally {
    restored: Vec<(ConnectionId, ConnectionId)>,
    dropped: Vec<RestoreError>,
}

#[derive(Debug, Clone, Default)]
pub struct ContainmentEngine {
    config: ContainmentConfig,
    lock: OperationLock,
}

impl ContainmentEngine {
    pub fn new(config: ContainmentConfig) -> Self {
        Self {
            config,
            lock: OperationLock::new(),
        }
    }

    /// Shares an existing lock, so several engines exclude each other.
    pub fn with_lock(config: ContainmentConfig, lock: OperationLock) -> Self {
        Self { config, lock }
    }

    pub fn config(&self) -> &ContainmentConfig {
        &self.config
    }

    pub fn lock(&self) -> &OperationLock {
        &self.lock
    }

    fn acquire(&self) -> Result<OperationGuard, GroupingError> {
        self.lock.try_acquire().ok_or_else(|| {
            tracing::warn!("Rejected grouping request: another operation is in progress");
            GroupingError::ReentrantOperation
        })
    }

    /// Groups `shapes` into a new container sized around them.
    ///
    /// Members keep their coordinates; only their parent changes.
    pub fn group<M: Modeling + ?Sized>(
        &self,
        model: &mut M,
        maintainer: &WaypointMaintainer,
        shapes: &[ShapeId],
    ) -> Result<GroupOutcome, GroupingError> {
        let _guard = self.acquire()?;

        let mut members: Vec<ShapeId> = Vec::with_capacity(shapes.len());
        for id in shapes {
            if !members.contains(id) {
                members.push(*id);
            }
        }
        if members.len() < 2 {
            return Err(GroupingError::InsufficientSelection {
                count: members.len(),
            });
        }

        let resolved: Vec<Shape> = members
            .iter()
            .map(|id| {
                model
                    .shape(*id)
                    .cloned()
                    .ok_or(GroupingError::UnknownShape { shape: *id })
            })
            .collect::<Result<_, _>>()?;

        for shape in &members {
            if let Some(container) = members
                .iter()
                .find(|other| model.is_ancestor(**other, *shape))
            {
                return Err(GroupingError::NestedSelection {
                    shape: *shape,
                    container: *container,
                });
            }
        }

        let refs: Vec<&Shape> = resolved.iter().collect();
        let frame = container_frame(&refs, &self.config).ok_or(GroupingError::InsufficientSelection {
            count: 0,
        })?;
        let scope = common_scope(&resolved);
        let snapshots = capture_connections(&*model, &members);

        let mut journal = Journal::default();
        let container = match self.apply_group(model, &resolved, &snapshots, frame, scope, &mut journal) {
            Ok(container) => container,
            Err(err) => {
                journal.rollback(model);
                return Err(err.into());
            }
        };

        let tally = self.restore_missing(model, &snapshots, &[], |s| {
            if s.is_internal(&members) {
                Some(container)
            } else {
                s.parent
            }
        });

        let reroute = live_ids(&*model, &snapshots, &tally.restored, |s| s.is_internal(&members));
        let routing = maintainer.refresh_connections(model, &reroute);

        tracing::info!(
            "Grouped {} shapes into {} ({:.0}x{:.0})",
            members.len(),
            container,
            frame.width(),
            frame.height()
        );
        Ok(GroupOutcome {
            container,
            members,
            restored: tally.restored,
            dropped: tally.dropped,
            routing,
        })
    }

    /// Creates the container, moves the members and their internal
    /// connections into it and grows the enclosing scope.
    fn apply_group<M: Modeling + ?Sized>(
        &self,
        model: &mut M,
        members: &[Shape],
        snapshots: &[ConnectionSnapshot],
        frame: Bounds,
        scope: Option<ShapeId>,
        journal: &mut Journal,
    ) -> Result<ShapeId, DiagramError> {
        let spec = ShapeSpec::new(ElementKind::Container, frame.width(), frame.height());
        let container = model.create_shape(spec, Point::new(frame.min_x, frame.min_y), scope)?;
        journal.steps.push(Undo::Created(container));

        for shape in members {
            journal.reparent_shape(model, shape.id, shape.parent, Some(container), Point::zero())?;
        }

        let ids: Vec<ShapeId> = members.iter().map(|s| s.id).collect();
        for snapshot in snapshots.iter().filter(|s| s.is_internal(&ids)) {
            if model.connection(snapshot.id).is_some() {
                journal.reparent_connection(model, snapshot.id, Some(container))?;
            }
        }

        self.fit_scope(model, scope, &[], journal)?;
        Ok(container)
    }

    /// Dissolves `container`, laying its children out in a grid to its right
    /// inside the container's own parent scope.
    pub fn ungroup<M: Modeling + ?Sized>(
        &self,
        model: &mut M,
        maintainer: &WaypointMaintainer,
        container: ShapeId,
    ) -> Result<UngroupOutcome, GroupingError> {
        let _guard = self.acquire()?;

        let frame = model
            .shape(container)
            .cloned()
            .ok_or(GroupingError::UnknownShape { shape: container })?;
        if !frame.kind.is_container() {
            return Err(GroupingError::NotAContainer { shape: container });
        }
        let children = model.children(container);
        if children.is_empty() {
            return Err(GroupingError::EmptyContainer { container });
        }
        let scope = frame.parent;

        let removed: Vec<ConnectionId> = model.connections_touching(container);
        let snapshots: Vec<ConnectionSnapshot> = capture_connections(&*model, &children)
            .into_iter()
            .filter(|s| !removed.contains(&s.id))
            .collect();
        let rescoped: Vec<ConnectionId> = model
            .connection_ids()
            .into_iter()
            .filter(|id| !removed.contains(id))
            .filter(|id| {
                model.connection(*id).is_some_and(|c| {
                    c.parent == Some(container)
                        || (children.contains(&c.source) && children.contains(&c.target))
                })
            })
            .collect();

        let placements = self.grid_placement(&*model, &frame, &children)?;

        let mut journal = Journal::default();
        if let Err(err) = self.apply_ungroup(
            model,
            container,
            scope,
            &placements,
            &rescoped,
            &removed,
            &mut journal,
        ) {
            journal.rollback(model);
            return Err(err.into());
        }

        let tally = self.restore_missing(model, &snapshots, &removed, |s| {
            if s.parent == Some(container) {
                scope
            } else {
                s.parent
            }
        });

        let routing = maintainer.refresh_shapes(model, &children);

        tracing::info!(
            "Ungrouped {} into {} shapes, removed {} container connections",
            container,
            children.len(),
            removed.len()
        );
        Ok(UngroupOutcome {
            container,
            children,
            removed,
            restored: tally.restored,
            dropped: tally.dropped,
            routing,
        })
    }

    /// Moves children and owned connections to `scope`, grows the scope
    /// around them, then deletes the container and its own connections.
    #[allow(clippy::too_many_arguments)]
    fn apply_ungroup<M: Modeling + ?Sized>(
        &self,
        model: &mut M,
        container: ShapeId,
        scope: Option<ShapeId>,
        placements: &[(ShapeId, Point)],
        rescoped: &[ConnectionId],
        removed: &[ConnectionId],
        journal: &mut Journal,
    ) -> Result<(), DiagramError> {
        for (child, delta) in placements {
            journal.reparent_shape(model, *child, Some(container), scope, *delta)?;
        }
        for id in rescoped {
            if model.connection(*id).is_some() {
                journal.reparent_connection(model, *id, scope)?;
            }
        }

        self.fit_scope(model, scope, &[container], journal)?;

        for id in removed {
            let Some(snapshot) = model.connection(*id).map(ConnectionSnapshot::of) else {
                continue;
            };
            model.remove_connection(*id)?;
            journal.steps.push(Undo::RemovedConnection(snapshot));
        }
        model.remove_shape(container)?;
        Ok(())
    }

    /// Grows `scope` and then each enclosing container until every one
    /// encloses its children plus padding. Shapes in `exclude` are ignored.
    fn fit_scope<M: Modeling + ?Sized>(
        &self,
        model: &mut M,
        scope: Option<ShapeId>,
        exclude: &[ShapeId],
        journal: &mut Journal,
    ) -> Result<(), DiagramError> {
        let Some(scope) = scope else {
            return Ok(());
        };
        let mut chain = vec![scope];
        chain.extend(model.ancestors(scope));

        for id in chain {
            let Some(current) = model.shape(id).map(Shape::bounds) else {
                break;
            };
            let children: Vec<&Shape> = model
                .children(id)
                .into_iter()
                .filter(|child| !exclude.contains(child))
                .filter_map(|child| model.shape(child))
                .collect();
            let Some(needed) = container_frame(&children, &self.config) else {
                break;
            };
            if current.encloses(&needed) {
                break;
            }

            let grown = current.union(&needed);
            model.set_frame(id, grown)?;
            journal.steps.push(Undo::Framed {
                shape: id,
                frame: current,
            });
            tracing::debug!("Grew {} to {:.0}x{:.0}", id, grown.width(), grown.height());
        }
        Ok(())
    }

    /// Per-child translation onto a grid to the right of `frame`.
    fn grid_placement<R: DiagramRegistry + ?Sized>(
        &self,
        model: &R,
        frame: &Shape,
        children: &[ShapeId],
    ) -> Result<Vec<(ShapeId, Point)>, GroupingError> {
        let shapes: Vec<&Shape> = children
            .iter()
            .map(|id| {
                model
                    .shape(*id)
                    .ok_or(GroupingError::Diagram(DiagramError::ShapeNotFound { shape: *id }))
            })
            .collect::<Result<_, _>>()?;

        let cell_width = shapes.iter().map(|s| s.width).fold(0.0, f64::max);
        let cell_height = shapes.iter().map(|s| s.height).fold(0.0, f64::max);
        let pitch_x = cell_width + self.config.column_spacing;
        let pitch_y = cell_height + self.config.row_spacing;
        let columns = self.config.grid_columns.max(1);
        let origin = Point::new(
            frame.x + frame.width + self.config.ungroup_offset,
            frame.y,
        );

        Ok(shapes
            .iter()
            .enumerate()
            .map(|(index, shape)| {
                let slot = Point::new(
                    origin.x + (index % columns) as f64 * pitch_x,
                    origin.y + (index / columns) as f64 * pitch_y,
                );
                (shape.id, slot.delta_from(shape.position()))
            })
            .collect())
    }

    /// Re-creates a connection from `snapshot` inside `parent`.
    ///
    /// Captured waypoints are kept when both ends still sit on their shapes'
    /// borders; otherwise the new connection starts from a direct edge.
    pub fn restore_connection<M: Modeling + ?Sized>(
        &self,
        model: &mut M,
        snapshot: &ConnectionSnapshot,
        parent: Option<ShapeId>,
    ) -> Result<ConnectionId, RestoreError> {
        let source = model
            .shape(snapshot.source)
            .ok_or(RestoreError::UnresolvableEndpoint {
                connection: snapshot.id,
                missing: snapshot.source,
            })?;
        let target = model
            .shape(snapshot.target)
            .ok_or(RestoreError::UnresolvableEndpoint {
                connection: snapshot.id,
                missing: snapshot.target,
            })?;
        let anchored = match (snapshot.waypoints.first(), snapshot.waypoints.last()) {
            (Some(first), Some(last)) if snapshot.waypoints.len() >= 2 => {
                is_on_border(source, *first, ANCHOR_TOLERANCE)
                    && is_on_border(target, *last, ANCHOR_TOLERANCE)
            }
            _ => false,
        };
        let parent = parent.filter(|p| model.shape(*p).is_some_and(|s| s.kind.is_container()));

        let id = model.create_connection(
            snapshot.source,
            snapshot.target,
            snapshot.attrs.clone(),
            parent,
        )?;
        if anchored {
            model.set_waypoints(id, snapshot.waypoints.clone())?;
        }
        tracing::debug!("Restored {} as {}", snapshot.id, id);
        Ok(id)
    }

    /// Restores every snapshot whose connection vanished, unless it was removed
    /// on purpose or an equivalent connection is already live.
    fn restore_missing<M, F>(
        &self,
        model: &mut M,
        snapshots: &[ConnectionSnapshot],
        removed: &[ConnectionId],
        parent_of: F,
    ) -> RestoreTally
    where
        M: Modeling + ?Sized,
        F: Fn(&ConnectionSnapshot) -> Option<ShapeId>,
    {
        let mut tally = RestoreTally::default();
        let captured: Vec<ConnectionId> = snapshots.iter().map(|s| s.id).collect();
        // Connections the host created on its own; each may replace one snapshot.
        let mut stand_ins: Vec<ConnectionId> = model
            .connection_ids()
            .into_iter()
            .filter(|id| !captured.contains(id))
            .collect();

        for snapshot in snapshots {
            if removed.contains(&snapshot.id) || model.connection(snapshot.id).is_some() {
                continue;
            }
            let parent = parent_of(snapshot);

            let registry = &*model;
            let found = stand_ins
                .iter()
                .position(|id| registry.connection(*id).is_some_and(|c| snapshot.matches(c)));
            let stand_in = found.map(|index| stand_ins.remove(index));
            if let Some(id) = stand_in {
                let misplaced = registry.connection(id).is_some_and(|c| c.parent != parent);
                if misplaced {
                    if let Err(err) = model.reparent_connection(id, parent) {
                        tracing::warn!("Could not move {} into {:?}: {}", id, parent, err);
                    }
                }
                tracing::debug!("{} already replaced by {}", snapshot.id, id);
                tally.restored.push((snapshot.id, id));
                continue;
            }

            match self.restore_connection(model, snapshot, parent) {
                Ok(id) => tally.restored.push((snapshot.id, id)),
                Err(err) => {
                    tracing::warn!("Dropping snapshot of {}: {}", snapshot.id, err);
                    tally.dropped.push(err);
                }
            }
        }
        tally
    }
}

/// Parent shared by every shape, or the root scope when they differ.
fn common_scope(shapes: &[Shape]) -> Option<ShapeId> {
    let first = shapes.first()?.parent;
    shapes.iter().all(|s| s.parent == first).then_some(first).flatten()
}

/// Ids of the live connections behind `snapshots` selected by `include`, with
/// restored snapshots mapped to their new ids.
fn live_ids<R, F>(
    model: &R,
    snapshots: &[ConnectionSnapshot],
    restored: &[(ConnectionId, ConnectionId)],
    include: F,
) -> Vec<ConnectionId>
where
    R: DiagramRegistry + ?Sized,
    F: Fn(&ConnectionSnapshot) -> bool,
{
    let mut ids: Vec<ConnectionId> = snapshots
        .iter()
        .filter(|s| include(s))
        .filter_map(|s| {
            if model.connection(s.id).is_some() {
                Some(s.id)
            } else {
                restored.iter().find(|(old, _)| *old == s.id).map(|(_, new)| *new)
            }
        })
        .collect();
    for (_, new) in restored {
        if !ids.contains(new) {
            ids.push(*new);
        }
    }
    ids
}
