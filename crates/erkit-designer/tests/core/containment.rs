use erkit_core::{
    ConnectionId, ContainmentConfig, DiagramError, GroupingError, Point, RestoreError, ShapeId,
};
use erkit_designer::containment::{container_frame, ContainmentEngine};
use erkit_designer::diagram::{Diagram, DiagramRegistry, Modeling};
use erkit_designer::geometry::{union_bounds, Bounds};
use erkit_designer::shapes::{Connection, ConnectionAttrs, ElementKind, Shape, ShapeSpec};
use erkit_designer::waypoints::WaypointMaintainer;

fn entity(diagram: &mut Diagram, x: f64, y: f64, w: f64, h: f64) -> ShapeId {
    diagram
        .add_shape(ElementKind::Entity, x, y, w, h)
        .expect("shape")
}

fn group(diagram: &mut Diagram, shapes: &[ShapeId]) -> Result<ShapeId, GroupingError> {
    ContainmentEngine::default()
        .group(diagram, &WaypointMaintainer::default(), shapes)
        .map(|outcome| outcome.container)
}

fn ungroup(diagram: &mut Diagram, container: ShapeId) -> Result<Vec<ShapeId>, GroupingError> {
    ContainmentEngine::default()
        .ungroup(diagram, &WaypointMaintainer::default(), container)
        .map(|outcome| outcome.children)
}

/// Host model with optional failure modes: `lossy` drops every connection
/// touching a shape when the shape is reparented, `doomed` is deleted on the
/// first reparent, and `refuse_connection_moves` rejects connection reparents.
#[derive(Default)]
struct HostModel {
    inner: Diagram,
    lossy: bool,
    doomed: Option<ShapeId>,
    refuse_connection_moves: bool,
}

impl HostModel {
    fn lossy(inner: Diagram) -> Self {
        Self {
            inner,
            lossy: true,
            ..Self::default()
        }
    }
}

impl DiagramRegistry for HostModel {
    fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.inner.shape(id)
    }

    fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.inner.connection(id)
    }

    fn shape_ids(&self) -> Vec<ShapeId> {
        self.inner.shape_ids()
    }

    fn connection_ids(&self) -> Vec<ConnectionId> {
        self.inner.connection_ids()
    }
}

impl Modeling for HostModel {
    fn set_waypoints(&mut self, id: ConnectionId, points: Vec<Point>) -> Result<(), DiagramError> {
        self.inner.set_waypoints(id, points)
    }

    fn reparent_shape(
        &mut self,
        shape: ShapeId,
        parent: Option<ShapeId>,
        delta: Point,
    ) -> Result<(), DiagramError> {
        if self.lossy {
            for id in self.inner.connections_touching(shape) {
                self.inner.remove_connection(id)?;
            }
        }
        if let Some(doomed) = self.doomed.take() {
            self.inner.remove_shape(doomed)?;
        }
        self.inner.reparent_shape(shape, parent, delta)
    }

    fn reparent_connection(
        &mut self,
        id: ConnectionId,
        parent: Option<ShapeId>,
    ) -> Result<(), DiagramError> {
        if self.refuse_connection_moves {
            return Err(DiagramError::ConnectionNotFound { connection: id });
        }
        self.inner.reparent_connection(id, parent)
    }

    fn set_frame(&mut self, shape: ShapeId, frame: Bounds) -> Result<(), DiagramError> {
        self.inner.set_frame(shape, frame)
    }

    fn create_shape(
        &mut self,
        spec: ShapeSpec,
        position: Point,
        parent: Option<ShapeId>,
    ) -> Result<ShapeId, DiagramError> {
        self.inner.create_shape(spec, position, parent)
    }

    fn create_connection(
        &mut self,
        source: ShapeId,
        target: ShapeId,
        attrs: ConnectionAttrs,
        parent: Option<ShapeId>,
    ) -> Result<ConnectionId, DiagramError> {
        self.inner.create_connection(source, target, attrs, parent)
    }

    fn remove_connection(&mut self, id: ConnectionId) -> Result<Connection, DiagramError> {
        self.inner.remove_connection(id)
    }

    fn remove_shape(&mut self, id: ShapeId) -> Result<Shape, DiagramError> {
        self.inner.remove_shape(id)
    }
}

#[test]
fn test_group_preserves_member_positions() {
    let mut diagram = Diagram::new();
    let a = entity(&mut diagram, 10.0, 20.0, 100.0, 50.0);
    let b = entity(&mut diagram, 250.0, 140.0, 80.0, 40.0);

    let container = group(&mut diagram, &[a, b]).expect("group");

    let sa = diagram.shape(a).expect("a");
    let sb = diagram.shape(b).expect("b");
    assert_eq!(sa.position(), Point::new(10.0, 20.0));
    assert_eq!(sb.position(), Point::new(250.0, 140.0));
    assert_eq!(sa.parent, Some(container));
    assert_eq!(sb.parent, Some(container));
    assert_eq!(diagram.children(container), vec![a, b]);
}

#[test]
fn test_container_encloses_members_with_padding() {
    let mut diagram = Diagram::new();
    let ids: Vec<ShapeId> = (0..5)
        .map(|i| entity(&mut diagram, i as f64 * 130.0, (i % 2) as f64 * 70.0, 100.0, 50.0))
        .collect();
    let members: Vec<Shape> = ids
        .iter()
        .map(|id| diagram.shape(*id).expect("member").clone())
        .collect();
    let union = union_bounds(members.iter()).expect("union");

    let container = group(&mut diagram, &ids).expect("group");
    let frame = diagram.shape(container).expect("container").bounds();
    let required = Bounds::new(
        union.min_x - 10.0,
        union.min_y - 25.0,
        union.max_x + 10.0,
        union.max_y + 10.0,
    );
    assert!(frame.encloses(&required));
    assert_eq!(frame, required);
}

#[test]
fn test_three_member_row_container_size() {
    let mut diagram = Diagram::new();
    let e1 = entity(&mut diagram, 0.0, 0.0, 100.0, 50.0);
    let e2 = entity(&mut diagram, 150.0, 0.0, 100.0, 50.0);
    let e3 = entity(&mut diagram, 300.0, 0.0, 100.0, 60.0);

    let container = group(&mut diagram, &[e1, e2, e3]).expect("group");
    let shape = diagram.shape(container).expect("container");
    assert_eq!(shape.kind, ElementKind::Container);
    assert_eq!(shape.position(), Point::new(-8.0, -25.0));
    assert_eq!(shape.width, 400.0 + 2.0 * 8.0);
    assert_eq!(shape.height, 60.0 + 25.0 + 8.0);
}

#[test]
fn test_group_then_ungroup_keeps_connection() {
    let mut diagram = Diagram::new();
    let s1 = entity(&mut diagram, 0.0, 0.0, 100.0, 50.0);
    let s2 = entity(&mut diagram, 200.0, 0.0, 100.0, 50.0);
    diagram
        .create_connection(s1, s2, ConnectionAttrs::hierarchical(), None)
        .expect("connect");

    let container = group(&mut diagram, &[s1, s2]).expect("group");
    let children = ungroup(&mut diagram, container).expect("ungroup");

    assert_eq!(children, vec![s1, s2]);
    assert!(diagram.shape(container).is_none());
    let between = diagram.connections_between(s1, s2);
    assert_eq!(between.len(), 1);
    let connection = diagram.connection(between[0]).expect("connection");
    assert!(connection.attrs.hierarchical);
    assert_eq!(connection.parent, None);
}

#[test]
fn test_ungroup_removes_connections_to_container() {
    let mut diagram = Diagram::new();
    let s1 = entity(&mut diagram, 0.0, 0.0, 100.0, 50.0);
    let s2 = entity(&mut diagram, 200.0, 0.0, 100.0, 50.0);
    let outside = entity(&mut diagram, 0.0, 400.0, 100.0, 50.0);
    let container = group(&mut diagram, &[s1, s2]).expect("group");
    let tie = diagram.connect(outside, container).expect("tie");
    let kept = diagram.connect(outside, s1).expect("kept");

    let outcome = ContainmentEngine::default()
        .ungroup(&mut diagram, &WaypointMaintainer::default(), container)
        .expect("ungroup");

    assert_eq!(outcome.removed, vec![tie]);
    assert!(diagram.connection(tie).is_none());
    assert!(diagram.connection(kept).is_some());
    assert!(outcome.dropped.is_empty());
    assert!(outcome.restored.is_empty());
}

#[test]
fn test_ungroup_lays_children_out_on_grid() {
    let mut diagram = Diagram::new();
    let ids: Vec<ShapeId> = (0..4)
        .map(|i| entity(&mut diagram, i as f64 * 120.0, 0.0, 100.0, 50.0))
        .collect();
    let container = group(&mut diagram, &ids).expect("group");
    // Padding 8: frame (-8, -25) to (468, 58).
    let children = ungroup(&mut diagram, container).expect("ungroup");
    assert_eq!(children, ids);

    let positions: Vec<Point> = ids
        .iter()
        .map(|id| diagram.shape(*id).expect("child").position())
        .collect();
    assert_eq!(
        positions,
        vec![
            Point::new(568.0, -25.0),
            Point::new(768.0, -25.0),
            Point::new(968.0, -25.0),
            Point::new(568.0, 105.0),
        ]
    );
    assert!(ids
        .iter()
        .all(|id| diagram.shape(*id).is_some_and(|s| s.parent.is_none())));
}

#[test]
fn test_grouping_inside_container_uses_its_scope() {
    let mut diagram = Diagram::new();
    let outer = diagram
        .add_shape(ElementKind::Container, -50.0, -50.0, 600.0, 300.0)
        .expect("outer");
    let a = entity(&mut diagram, 0.0, 0.0, 100.0, 50.0);
    let b = entity(&mut diagram, 200.0, 0.0, 100.0, 50.0);
    for id in [a, b] {
        diagram
            .reparent_shape(id, Some(outer), Point::zero())
            .expect("reparent");
    }

    let inner = group(&mut diagram, &[a, b]).expect("group");
    assert_eq!(diagram.shape(inner).and_then(|s| s.parent), Some(outer));

    ungroup(&mut diagram, inner).expect("ungroup");
    assert_eq!(diagram.children(outer), vec![a, b]);

    // The grid lands right of the outer frame, so the outer container grows.
    let frame = diagram.shape(outer).expect("outer").bounds();
    assert_eq!(frame, Bounds::new(-50.0, -50.0, 712.0, 250.0));
    for child in [a, b] {
        let bounds = diagram.shape(child).expect("child").bounds();
        assert!(frame.encloses(&bounds), "{} escapes {}", child, outer);
    }
    let members: Vec<Shape> = [a, b]
        .iter()
        .map(|id| diagram.shape(*id).expect("child").clone())
        .collect();
    let refs: Vec<&Shape> = members.iter().collect();
    let needed = container_frame(&refs, &ContainmentConfig::default()).expect("frame");
    assert!(frame.encloses(&needed));
}

#[test]
fn test_group_at_scope_edge_grows_enclosing_containers() {
    let mut diagram = Diagram::new();
    let outer = diagram
        .add_shape(ElementKind::Container, -10.0, -30.0, 320.0, 90.0)
        .expect("outer");
    let a = entity(&mut diagram, 0.0, 0.0, 100.0, 50.0);
    let b = entity(&mut diagram, 200.0, 0.0, 100.0, 50.0);
    for id in [a, b] {
        diagram
            .reparent_shape(id, Some(outer), Point::zero())
            .expect("reparent");
    }

    // Inner frame (-6, -25)..(306, 56) needs (-12, -50)..(312, 62) around it.
    let inner = group(&mut diagram, &[a, b]).expect("group");
    let inner_frame = diagram.shape(inner).expect("inner").bounds();
    let outer_frame = diagram.shape(outer).expect("outer").bounds();
    assert_eq!(outer_frame, Bounds::new(-12.0, -50.0, 312.0, 62.0));
    assert!(outer_frame.encloses(&inner_frame));
}

#[test]
fn test_failed_connection_move_rolls_group_back() {
    let mut inner = Diagram::new();
    let a = entity(&mut inner, 0.0, 0.0, 100.0, 50.0);
    let b = entity(&mut inner, 200.0, 0.0, 100.0, 50.0);
    let ab = inner.connect(a, b).expect("ab");
    let mut model = HostModel {
        inner,
        refuse_connection_moves: true,
        ..HostModel::default()
    };

    let result = ContainmentEngine::default()
        .group(&mut model, &WaypointMaintainer::default(), &[a, b])
        .map(|o| o.container);
    assert_eq!(
        result,
        Err(GroupingError::Diagram(DiagramError::ConnectionNotFound {
            connection: ab
        }))
    );
    assert_eq!(model.shape_count(), 2);
    for id in [a, b] {
        assert_eq!(model.shape(id).and_then(|s| s.parent), None);
    }
    assert_eq!(model.connection(ab).and_then(|c| c.parent), None);
}

#[test]
fn test_failed_connection_move_rolls_ungroup_back() {
    let mut inner = Diagram::new();
    let a = entity(&mut inner, 0.0, 0.0, 100.0, 50.0);
    let b = entity(&mut inner, 200.0, 0.0, 100.0, 50.0);
    let ab = inner.connect(a, b).expect("ab");
    let mut model = HostModel {
        inner,
        ..HostModel::default()
    };
    let engine = ContainmentEngine::default();
    let container = engine
        .group(&mut model, &WaypointMaintainer::default(), &[a, b])
        .expect("group")
        .container;

    model.refuse_connection_moves = true;
    assert!(engine
        .ungroup(&mut model, &WaypointMaintainer::default(), container)
        .is_err());

    assert!(model.shape(container).is_some());
    assert_eq!(model.children(container), vec![a, b]);
    assert_eq!(model.shape(a).map(|s| s.position()), Some(Point::new(0.0, 0.0)));
    assert_eq!(model.shape(b).map(|s| s.position()), Some(Point::new(200.0, 0.0)));
    assert_eq!(model.connection(ab).and_then(|c| c.parent), Some(container));
}

#[test]
fn test_insufficient_selection_leaves_diagram_untouched() {
    let mut diagram = Diagram::new();
    let a = entity(&mut diagram, 0.0, 0.0, 100.0, 50.0);

    assert_eq!(
        group(&mut diagram, &[a]),
        Err(GroupingError::InsufficientSelection { count: 1 })
    );
    assert_eq!(
        group(&mut diagram, &[a, a]),
        Err(GroupingError::InsufficientSelection { count: 1 })
    );
    assert_eq!(diagram.shape_count(), 1);
    assert_eq!(diagram.shape(a).and_then(|s| s.parent), None);
}

#[test]
fn test_ungroup_preconditions() {
    let mut diagram = Diagram::new();
    let a = entity(&mut diagram, 0.0, 0.0, 100.0, 50.0);
    let empty = diagram
        .add_shape(ElementKind::Container, 0.0, 100.0, 100.0, 100.0)
        .expect("empty");

    assert_eq!(
        ungroup(&mut diagram, empty),
        Err(GroupingError::EmptyContainer { container: empty })
    );
    assert_eq!(
        ungroup(&mut diagram, a),
        Err(GroupingError::NotAContainer { shape: a })
    );
    assert_eq!(
        ungroup(&mut diagram, ShapeId(404)),
        Err(GroupingError::UnknownShape {
            shape: ShapeId(404)
        })
    );
    assert_eq!(diagram.shape_count(), 2);
}

#[test]
fn test_selection_with_nested_member_is_rejected() {
    let mut diagram = Diagram::new();
    let a = entity(&mut diagram, 0.0, 0.0, 100.0, 50.0);
    let b = entity(&mut diagram, 200.0, 0.0, 100.0, 50.0);
    let c = entity(&mut diagram, 0.0, 300.0, 100.0, 50.0);
    let container = group(&mut diagram, &[a, b]).expect("group");

    assert_eq!(
        group(&mut diagram, &[container, a, c]),
        Err(GroupingError::NestedSelection { shape: a, container })
    );
    assert_eq!(
        group(&mut diagram, &[a, ShapeId(404)]),
        Err(GroupingError::UnknownShape {
            shape: ShapeId(404)
        })
    );

    let outer = group(&mut diagram, &[container, c]).expect("nested group");
    assert_eq!(diagram.shape(container).and_then(|s| s.parent), Some(outer));
}

#[test]
fn test_reentrant_group_is_rejected() {
    let mut diagram = Diagram::new();
    let a = entity(&mut diagram, 0.0, 0.0, 100.0, 50.0);
    let b = entity(&mut diagram, 200.0, 0.0, 100.0, 50.0);

    let engine = ContainmentEngine::default();
    let guard = engine.lock().try_acquire().expect("guard");
    assert_eq!(
        engine
            .group(&mut diagram, &WaypointMaintainer::default(), &[a, b])
            .map(|o| o.container),
        Err(GroupingError::ReentrantOperation)
    );
    assert_eq!(diagram.shape_count(), 2);
    drop(guard);
    assert!(engine
        .group(&mut diagram, &WaypointMaintainer::default(), &[a, b])
        .is_ok());
}

#[test]
fn test_dropped_connections_are_restored_without_duplicates() {
    let mut inner = Diagram::new();
    let a = entity(&mut inner, 0.0, 0.0, 100.0, 50.0);
    let b = entity(&mut inner, 200.0, 0.0, 100.0, 50.0);
    let x = entity(&mut inner, 0.0, 300.0, 100.0, 50.0);
    let ab = inner
        .create_connection(a, b, ConnectionAttrs::hierarchical(), None)
        .expect("ab");
    let ax = inner
        .create_connection(a, x, ConnectionAttrs::labeled("has"), None)
        .expect("ax");
    let ab_waypoints = inner.connection(ab).expect("ab").waypoints.clone();

    let mut model = HostModel::lossy(inner);
    let outcome = ContainmentEngine::default()
        .group(&mut model, &WaypointMaintainer::default(), &[a, b])
        .expect("group");

    assert!(model.connection(ab).is_none());
    assert!(model.connection(ax).is_none());
    assert_eq!(outcome.restored.len(), 2);
    assert!(outcome.dropped.is_empty());

    let internal = model.inner.connections_between(a, b);
    assert_eq!(internal.len(), 1);
    let restored = model.connection(internal[0]).expect("restored");
    assert!(restored.attrs.hierarchical);
    assert_eq!(restored.parent, Some(outcome.container));
    assert_eq!(restored.waypoints, ab_waypoints);

    let external = model.inner.connections_between(a, x);
    assert_eq!(external.len(), 1);
    let restored = model.connection(external[0]).expect("restored");
    assert_eq!(restored.attrs.label.as_deref(), Some("has"));
    assert_eq!(restored.parent, None);
}

#[test]
fn test_parallel_connections_are_all_restored() {
    let mut inner = Diagram::new();
    let a = entity(&mut inner, 0.0, 0.0, 100.0, 50.0);
    let b = entity(&mut inner, 200.0, 0.0, 100.0, 50.0);
    let first = inner.connect(a, b).expect("first");
    let second = inner.connect(a, b).expect("second");

    let mut model = HostModel::lossy(inner);
    let outcome = ContainmentEngine::default()
        .group(&mut model, &WaypointMaintainer::default(), &[a, b])
        .expect("group");

    let originals: Vec<ConnectionId> = outcome.restored.iter().map(|(old, _)| *old).collect();
    assert_eq!(originals, vec![first, second]);
    assert!(outcome.dropped.is_empty());

    let between = model.inner.connections_between(a, b);
    assert_eq!(between.len(), 2);
    assert!(between
        .iter()
        .all(|id| model.connection(*id).and_then(|c| c.parent) == Some(outcome.container)));
}

#[test]
fn test_unresolvable_snapshot_is_dropped() {
    let mut inner = Diagram::new();
    let a = entity(&mut inner, 0.0, 0.0, 100.0, 50.0);
    let b = entity(&mut inner, 200.0, 0.0, 100.0, 50.0);
    let x = entity(&mut inner, 0.0, 300.0, 100.0, 50.0);
    let ax = inner.connect(a, x).expect("ax");

    let mut model = HostModel {
        doomed: Some(x),
        ..HostModel::lossy(inner)
    };
    let outcome = ContainmentEngine::default()
        .group(&mut model, &WaypointMaintainer::default(), &[a, b])
        .expect("group");

    assert!(outcome.restored.is_empty());
    assert_eq!(
        outcome.dropped,
        vec![RestoreError::UnresolvableEndpoint {
            connection: ax,
            missing: x
        }]
    );
    assert_eq!(model.inner.connection_count(), 0);
}
