use erkit_core::{Point, RoutingConfig, ShapeId};
use erkit_designer::routing::{line_intersects, Router};
use erkit_designer::shapes::{ElementKind, Shape};

fn entity(id: u64, x: f64, y: f64, w: f64, h: f64) -> Shape {
    Shape::new(ShapeId(id), ElementKind::Entity, x, y, w, h)
}

#[test]
fn test_same_row_route_is_direct() {
    let a = entity(1, 0.0, 0.0, 100.0, 50.0);
    let b = entity(2, 300.0, 0.0, 100.0, 50.0);
    let route = Router::default().route(&a, &b).expect("route");
    assert_eq!(
        route.as_slice(),
        &[Point::new(100.0, 25.0), Point::new(300.0, 25.0)]
    );
}

#[test]
fn test_obstruction_between_stacked_shapes_gets_bend() {
    let a = entity(1, 0.0, 0.0, 100.0, 50.0);
    let b = entity(2, 0.0, 200.0, 100.0, 50.0);
    let wall = entity(3, 0.0, 80.0, 100.0, 70.0);
    let config = RoutingConfig::default();

    let route = Router::new(config)
        .route_avoiding(&a, &b, &[&wall])
        .expect("route");
    assert_eq!(route.len(), 3);

    let middle = route[1];
    for shape in [&a, &b, &wall] {
        assert!(
            !shape.bounds().expand(config.intersection_margin).contains(middle),
            "{} inside margin of {}",
            middle,
            shape.id
        );
    }
    for leg in route.windows(2) {
        assert!(
            !line_intersects(leg[0], leg[1], &wall.bounds(), config.intersection_margin),
            "leg {} -> {} crosses the wall",
            leg[0],
            leg[1]
        );
    }
}

#[test]
fn test_obstacles_off_the_path_do_not_bend_route() {
    let a = entity(1, 0.0, 0.0, 100.0, 50.0);
    let b = entity(2, 300.0, 0.0, 100.0, 50.0);
    let far = entity(3, 150.0, 300.0, 50.0, 50.0);
    let router = Router::default();
    assert_eq!(
        router.route_avoiding(&a, &b, &[&far]).expect("route"),
        router.route(&a, &b).expect("route")
    );
}

#[test]
fn test_diamond_to_entity_anchors_on_vertex() {
    let e = entity(1, 0.0, 0.0, 100.0, 40.0);
    let d = Shape::new(ShapeId(2), ElementKind::Relationship, 200.0, 0.0, 80.0, 40.0);
    let route = Router::default().route(&e, &d).expect("route");
    assert_eq!(
        route.as_slice(),
        &[Point::new(100.0, 20.0), Point::new(200.0, 20.0)]
    );
}

#[test]
fn test_vertical_first_bend_when_centers_mostly_vertical() {
    // Centers (50, 25) and (160, 140); the corner-to-corner segment clips the
    // source margin.
    let a = entity(1, 0.0, 0.0, 100.0, 50.0);
    let b = entity(2, 140.0, 90.0, 40.0, 100.0);
    let route = Router::default().route(&a, &b).expect("route");
    assert_eq!(
        route.as_slice(),
        &[
            Point::new(100.0, 50.0),
            Point::new(100.0, 90.0),
            Point::new(140.0, 90.0)
        ]
    );
}
