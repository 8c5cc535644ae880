use super::tests_infrastructure::{line_edge, px, top_view, TestScene};
use super::{labels, CancellationToken, Dimensions, InputError, Key, PickStatus, PointSnapData, PointerButton, SnapPointHandler};
use crate::config::SnapConfig;
use crate::geometry::{ApproxEq, Point3, Vector3, Workplane};
use crate::kernel::{ArcCurve, Edge, Shape, ShapeId, ShapeRef};
use crate::visual::MeshData;
use std::time::{Duration, Instant};

fn handler(scene: &TestScene, data: PointSnapData) -> SnapPointHandler {
    SnapPointHandler::new(scene.settings.clone(), data, CancellationToken::new())
}

fn committed_point(handler: &SnapPointHandler) -> Point3 {
    match handler.status() {
        PickStatus::Committed(Some(point)) => point,
        other => panic!("expected a committed point, got {:?}", other),
    }
}

#[test]
fn test_cancel_removes_every_temporary_mesh() {
    let scene = TestScene::new();
    let mut view = top_view(&scene);
    view.add_shape(line_edge("edge", Point3::new(0.0, 5.0, 0.0), Point3::new(10.0, 5.0, 0.0)));
    view.add_shape(ShapeRef::new(
        ShapeId::new_deterministic("circle"),
        Shape::Edge(Edge::new(ArcCurve::circle(Point3::new(-10.0, 0.0, 0.0), Vector3::z(), 3.0))),
    ));
    let subscribers = scene.settings.subscriber_count();
    assert_eq!(scene.active_meshes(), 0);

    let token = CancellationToken::new();
    let data = PointSnapData::default()
        .with_ref_point(Point3::origin())
        .with_preview(|p| vec![MeshData::dashed_line(Point3::origin(), *p)]);
    let mut handler = SnapPointHandler::new(scene.settings.clone(), data, token.clone());
    let start = Instant::now();

    // Circle start point: endpoint snap, center hint drawn
    let (x, y) = px(-7.0, 0.0);
    handler.on_pointer_move(&view, x, y, start);
    assert_eq!(handler.snapped().and_then(|s| s.info).as_deref(), Some(labels::END));

    // Dwell pins it for object tracking
    handler.tick(start + Duration::from_millis(700));
    assert_eq!(handler.tracked_count(scene.document), 1);

    // Along the reference X axis: one guide
    let (x, y) = px(4.0, 0.2);
    handler.on_pointer_move(&view, x, y, start + Duration::from_millis(800));
    assert_eq!(handler.snapped().and_then(|s| s.info).as_deref(), Some(labels::AXIS_X));
    // Center hint, pinned marker, guide, snapped marker, preview
    assert_eq!(scene.active_meshes(), 5);

    // Firing the token tears everything down before any further event
    token.cancel();
    assert_eq!(handler.status(), PickStatus::Cancelled);
    assert_eq!(scene.active_meshes(), 0);
    assert_eq!(scene.settings.subscriber_count(), subscribers);
    handler.tick(start + Duration::from_millis(900));
    assert_eq!(handler.status(), PickStatus::Cancelled);

    // Finished picks ignore further events
    handler.on_pointer_move(&view, x, y, start + Duration::from_secs(1));
    assert_eq!(scene.active_meshes(), 0);
}

#[test]
fn test_click_commits_last_snapped_point() {
    let scene = TestScene::new();
    let view = top_view(&scene);
    let mut handler = handler(&scene, PointSnapData::default().with_ref_point(Point3::origin()));

    let (x, y) = px(6.0, 0.2);
    handler.on_pointer_move(&view, x, y, Instant::now());
    assert_eq!(handler.tooltip().as_deref(), Some(labels::AXIS_X));

    handler.on_pointer_down(PointerButton::Right);
    assert!(handler.is_active());
    handler.on_pointer_down(PointerButton::Left);
    assert!(committed_point(&handler).approx_eq(&Point3::new(6.0, 0.0, 0.0)));
    assert_eq!(scene.active_meshes(), 0);
}

#[test]
fn test_commit_without_snap() {
    let scene = TestScene::new();
    let mut handler = handler(&scene, PointSnapData::default());
    handler.on_pointer_down(PointerButton::Left);
    assert_eq!(handler.status(), PickStatus::Committed(None));
}

#[test]
fn test_enter_commits_workplane_point() {
    let scene = TestScene::new();
    let view = top_view(&scene);
    let mut handler = handler(&scene, PointSnapData::default());

    let (x, y) = px(2.0, 3.0);
    handler.on_pointer_move(&view, x, y, Instant::now());
    assert!(handler.tooltip().is_none());
    handler.on_key_down(&view, Key::Enter);
    assert!(committed_point(&handler).approx_eq(&Point3::new(2.0, 3.0, 0.0)));
}

#[test]
fn test_object_snap_wins_over_tracking() {
    let scene = TestScene::new();
    let mut view = top_view(&scene);
    view.add_shape(line_edge("edge", Point3::new(2.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0)));
    let mut handler = handler(&scene, PointSnapData::default().with_ref_point(Point3::origin()));

    let (x, y) = px(10.0, 0.1);
    handler.on_pointer_move(&view, x, y, Instant::now());
    let snapped = handler.snapped().expect("snapped");
    assert_eq!(snapped.info.as_deref(), Some(labels::END));
    assert!(snapped.point.approx_eq(&Point3::new(10.0, 0.0, 0.0)));
}

#[test]
fn test_rejected_candidate_falls_through() {
    let scene = TestScene::new();
    let mut view = top_view(&scene);
    view.add_shape(line_edge("edge", Point3::origin(), Point3::new(10.0, 0.0, 0.0)));
    let end = Point3::new(10.0, 0.0, 0.0);
    let data = PointSnapData::default().with_validator(move |p| !p.approx_eq(&end));
    let mut handler = handler(&scene, data);

    let (x, y) = px(10.0, 0.1);
    handler.on_pointer_move(&view, x, y, Instant::now());
    let snapped = handler.snapped().expect("workplane fallback");
    assert!(snapped.info.is_none());
    assert!(snapped.point.approx_eq(&Point3::new(10.0, 0.1, 0.0)));
}

#[test]
fn test_single_number_entry_along_snapped_direction() {
    let scene = TestScene::new();
    let view = top_view(&scene);
    let mut handler = handler(&scene, PointSnapData::default().with_ref_point(Point3::origin()));

    let (x, y) = px(6.0, 0.2);
    handler.on_pointer_move(&view, x, y, Instant::now());
    handler.on_key_down(&view, Key::Char('1'));
    handler.on_key_down(&view, Key::Char('0'));
    assert_eq!(handler.input_text().as_deref(), Some("10"));

    handler.on_key_down(&view, Key::Enter);
    assert!(committed_point(&handler).approx_eq(&Point3::new(10.0, 0.0, 0.0)));
}

#[test]
fn test_invalid_entry_keeps_pick_open() {
    let scene = TestScene::new();
    let view = top_view(&scene);
    let mut handler = handler(&scene, PointSnapData::default());

    handler.on_key_down(&view, Key::Char('5'));
    handler.on_key_down(&view, Key::Enter);
    assert!(handler.is_active());
    assert_eq!(handler.input_error(), Some(InputError::ThreeNumbersRequired));
    assert_eq!(handler.tooltip(), Some(InputError::ThreeNumbersRequired.to_string()));

    // Erasing the last character closes the entry
    handler.on_key_down(&view, Key::Backspace);
    assert!(handler.input_text().is_none());
    assert!(handler.input_error().is_none());

    for c in "1,2,3".chars() {
        handler.on_key_down(&view, Key::Char(c));
    }
    handler.on_key_down(&view, Key::Enter);
    assert!(committed_point(&handler).approx_eq(&Point3::new(1.0, 2.0, 3.0)));
}

#[test]
fn test_escape_closes_entry_before_cancelling() {
    let scene = TestScene::new();
    let view = top_view(&scene);
    let mut handler = handler(&scene, PointSnapData::default());

    handler.on_key_down(&view, Key::Char('-'));
    assert_eq!(handler.input_text().as_deref(), Some("-"));
    handler.on_key_down(&view, Key::Escape);
    assert!(handler.input_text().is_none());
    assert!(handler.is_active());

    // Letters do not open the entry
    handler.on_key_down(&view, Key::Char('a'));
    assert!(handler.input_text().is_none());

    handler.on_key_down(&view, Key::Escape);
    assert_eq!(handler.status(), PickStatus::Cancelled);
}

#[test]
fn test_preview_is_replaced_every_frame() {
    let scene = TestScene::new();
    let view = top_view(&scene);
    let data = PointSnapData::default().with_preview(|p| vec![MeshData::dashed_line(Point3::origin(), *p)]);
    let mut handler = handler(&scene, data);
    let start = Instant::now();

    for step in 0..4 {
        let (x, y) = px(step as f64 + 1.0, 2.0);
        handler.on_pointer_move(&view, x, y, start + Duration::from_millis(10 * step));
        assert_eq!(scene.active_meshes(), 2);
    }

    drop(handler);
    assert_eq!(scene.active_meshes(), 0);
}

#[test]
fn test_z_tracking_follows_dimension_and_plane() {
    assert!(PointSnapData::default().track_z());
    assert!(!PointSnapData::default().with_plane(Workplane::xz()).track_z());
    assert!(!PointSnapData::default().with_dimension(Dimensions::D1D2).track_z());
}

#[test]
fn test_key_names() {
    assert_eq!(Key::from_name("Enter"), Key::Enter);
    assert_eq!(Key::from_name("Backspace"), Key::Backspace);
    assert_eq!(Key::from_name("7"), Key::Char('7'));
    assert_eq!(Key::from_name("Shift"), Key::Other("Shift".to_string()));
}

#[test]
fn test_token_fired_from_another_thread_finishes_pick() {
    let scene = TestScene::new();
    let view = top_view(&scene);
    let token = CancellationToken::new();
    let mut handler = SnapPointHandler::new(
        scene.settings.clone(),
        PointSnapData::default().with_ref_point(Point3::origin()),
        token.clone(),
    );
    let (x, y) = px(4.0, 0.1);
    handler.on_pointer_move(&view, x, y, Instant::now());
    assert_eq!(scene.active_meshes(), 2);
    assert_eq!(token.callback_count(), 1);

    std::thread::spawn(move || token.cancel()).join().unwrap();
    assert_eq!(handler.status(), PickStatus::Cancelled);
    assert_eq!(scene.active_meshes(), 0);
}

#[test]
fn test_dropped_handler_unregisters_from_token() {
    let scene = TestScene::new();
    let token = CancellationToken::new();
    let handler = handler_with_token(&scene, token.clone());
    assert_eq!(token.callback_count(), 1);
    drop(handler);
    assert_eq!(token.callback_count(), 0);
    token.cancel();
}

#[test]
fn test_already_cancelled_token_finishes_at_once() {
    let scene = TestScene::new();
    let token = CancellationToken::new();
    token.cancel();
    let handler = handler_with_token(&scene, token);
    assert_eq!(handler.status(), PickStatus::Cancelled);
    assert_eq!(scene.settings.subscriber_count(), 0);
}

fn handler_with_token(scene: &TestScene, token: CancellationToken) -> SnapPointHandler {
    SnapPointHandler::new(scene.settings.clone(), PointSnapData::default(), token)
}

#[test]
fn test_hovering_endpoint_with_tracking_disabled_pins_nothing() {
    let scene = TestScene::with_config(SnapConfig {
        enable_snap_tracking: false,
        ..SnapConfig::default()
    });
    let mut view = top_view(&scene);
    view.add_shape(line_edge("edge", Point3::origin(), Point3::new(10.0, 0.0, 0.0)));
    let mut handler = handler(&scene, PointSnapData::default());
    let start = Instant::now();

    let (x, y) = px(10.0, 0.1);
    handler.on_pointer_move(&view, x, y, start);
    assert_eq!(handler.tooltip().as_deref(), Some(labels::END));
    let meshes = scene.active_meshes();

    handler.tick(start + Duration::from_millis(700));
    assert_eq!(handler.tracked_count(scene.document), 0);
    assert_eq!(scene.active_meshes(), meshes);
}
