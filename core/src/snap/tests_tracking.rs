use super::tests_infrastructure::{line_edge, px, top_view, TestScene};
use super::tracking_snap::{screen_distance_to_axis, MAX_GUIDE_LENGTH};
use super::{labels, Axis, PointerState, SnapResult, Snapper, TrackingSnap};
use crate::config::SnapConfig;
use crate::geometry::{ApproxEq, Point3, Vector3};
use crate::view::View;
use crate::visual::{MeshData, VisualChange};
use std::time::{Duration, Instant};

fn pinned(view: &dyn View, point: Point3) -> SnapResult {
    SnapResult::new(view.id(), point).with_info(labels::END)
}

#[test]
fn test_single_axis_from_reference_point() {
    let scene = TestScene::new();
    let view = top_view(&scene);
    let mut tracking = TrackingSnap::new(scene.settings.clone(), Some(Point3::origin()), false);

    // 2 px above the X axis
    let (x, y) = px(6.0, 0.2);
    let result = tracking.snap(&PointerState::new(&view, x, y)).expect("tracking snap");

    assert!(result.point.approx_eq(&Point3::new(6.0, 0.0, 0.0)));
    assert_eq!(result.info.as_deref(), Some(labels::AXIS_X));
    assert!(result.distance.unwrap().approx_eq(&6.0));
    assert_eq!(result.ref_point, Some(Point3::origin()));
    assert!(result.shapes.is_empty());
    assert_eq!(tracking.guide_count(view.id()), 1);
    assert_eq!(scene.active_meshes(), 1);
}

#[test]
fn test_guide_line_is_finite() {
    let scene = TestScene::new();
    let view = top_view(&scene);
    let mut tracking = TrackingSnap::new(scene.settings.clone(), Some(Point3::origin()), false);
    let (x, y) = px(-4.0, 0.1);
    let result = tracking.snap(&PointerState::new(&view, x, y)).expect("tracking snap");
    assert!(result.point.approx_eq(&Point3::new(-4.0, 0.0, 0.0)));

    let meshes = scene.meshes.lock().unwrap();
    let (_, guide) = meshes.active().next().expect("one guide");
    let MeshData::Line { start, end, .. } = guide else {
        panic!("guide should be a line");
    };
    assert!(start.approx_eq(&Point3::origin()));
    assert!(end.x.is_finite() && end.x < 0.0);
    assert!((end - start).norm() <= MAX_GUIDE_LENGTH * (1.0 + 1e-9));
}

#[test]
fn test_far_cursor_yields_nothing() {
    let scene = TestScene::new();
    let view = top_view(&scene);
    let mut tracking = TrackingSnap::new(scene.settings.clone(), Some(Point3::origin()), false);
    let (x, y) = px(6.0, 3.0);
    assert!(tracking.snap(&PointerState::new(&view, x, y)).is_none());
    assert_eq!(scene.active_meshes(), 0);
}

#[test]
fn test_reference_and_object_axes_intersect() {
    let scene = TestScene::new();
    let view = top_view(&scene);
    let mut tracking = TrackingSnap::new(scene.settings.clone(), Some(Point3::origin()), false);
    tracking
        .object_tracking_mut()
        .toggle_point(&view, &pinned(&view, Point3::new(5.0, -5.0, 0.0)));
    assert_eq!(scene.active_meshes(), 1);

    // Near the X axis of the reference and the +Y axis of the pinned point
    let (x, y) = px(5.0, 0.1);
    let result = tracking.snap(&PointerState::new(&view, x, y)).expect("intersection");

    assert_eq!(result.info.as_deref(), Some(labels::INTERSECTION));
    assert!(result.point.approx_eq(&Point3::new(5.0, 0.0, 0.0)));
    assert!(result.distance.is_none());
    assert_eq!(tracking.guide_count(view.id()), 2);
    assert_eq!(scene.active_meshes(), 3);
}

#[test]
fn test_axes_of_one_fan_meet_at_reference() {
    let scene = TestScene::new();
    let view = top_view(&scene);
    let mut tracking = TrackingSnap::new(scene.settings.clone(), Some(Point3::new(1.0, 1.0, 0.0)), false);
    let (x, y) = px(1.2, 1.2);
    let result = tracking.snap(&PointerState::new(&view, x, y)).expect("intersection");
    assert_eq!(result.info.as_deref(), Some(labels::INTERSECTION));
    assert!(result.point.approx_eq(&Point3::new(1.0, 1.0, 0.0)));
}

#[test]
fn test_hovered_edge_takes_priority() {
    let scene = TestScene::new();
    let mut view = top_view(&scene);
    let edge = line_edge("edge", Point3::origin(), Point3::new(10.0, 0.0, 0.0));
    view.add_shape(edge.clone());

    let mut tracking = TrackingSnap::new(scene.settings.clone(), None, false);
    // Its +Y axis is the only one passing through (5, 0)
    tracking
        .object_tracking_mut()
        .toggle_point(&view, &pinned(&view, Point3::new(5.0, -3.0, 0.0)));

    let (x, y) = px(5.0, 0.3);
    let state = PointerState::new(&view, x, y);
    assert_eq!(state.shapes.len(), 1);
    let result = tracking.snap(&state).expect("edge intersection");

    assert_eq!(result.info.as_deref(), Some(labels::INTERSECTION));
    assert!(result.point.approx_eq(&Point3::new(5.0, 0.0, 0.0)));
    assert_eq!(result.shapes.len(), 1);
    assert_eq!(result.shapes[0].id, edge.id);
    assert_eq!(tracking.guide_count(view.id()), 1);

    let meshes = scene.meshes.lock().unwrap();
    let guide_ends: Vec<Point3> = meshes
        .active()
        .filter_map(|(_, mesh)| match mesh {
            MeshData::Line { end, .. } => Some(*end),
            _ => None,
        })
        .collect();
    assert_eq!(guide_ends.len(), 1);
    assert!(guide_ends[0].approx_eq(&Point3::new(5.0, 0.0, 0.0)));
}

#[test]
fn test_only_two_closest_axes_are_intersected() {
    let scene = TestScene::new();
    let view = top_view(&scene);
    let mut tracking = TrackingSnap::new(scene.settings.clone(), Some(Point3::new(3.6, 0.0, 0.0)), false);
    // Parallel to the reference X axis, 0.3 units above it
    tracking
        .object_tracking_mut()
        .toggle_point(&view, &pinned(&view, Point3::new(-2.0, 0.3, 0.0)));

    // Candidates: pinned +X (0 px), reference +X (3 px), reference +Y (4 px).
    // The two closest are parallel, so the closest wins alone even though
    // pinned +X crosses reference +Y.
    let (x, y) = px(4.0, 0.3);
    let result = tracking.snap(&PointerState::new(&view, x, y)).expect("tracking snap");
    assert_eq!(result.info.as_deref(), Some(labels::AXIS_X));
    assert!(result.point.approx_eq(&Point3::new(4.0, 0.3, 0.0)));
    assert_eq!(result.ref_point, Some(Point3::new(-2.0, 0.3, 0.0)));
    assert_eq!(tracking.guide_count(view.id()), 1);
}

#[test]
fn test_polar_axes() {
    let config = SnapConfig {
        polar_angle: Some(45.0),
        ..SnapConfig::default()
    };
    let scene = TestScene::with_config(config);
    let view = top_view(&scene);
    let mut tracking = TrackingSnap::new(scene.settings.clone(), Some(Point3::origin()), false);

    let (x, y) = px(5.0, 5.2);
    let result = tracking.snap(&PointerState::new(&view, x, y)).expect("polar snap");
    assert_eq!(result.info.as_deref(), Some("45°"));
    assert!(result.point.approx_eq(&Point3::new(5.1, 5.1, 0.0)));
}

#[test]
fn test_disabled_tracking() {
    let scene = TestScene::new();
    let view = top_view(&scene);
    let mut tracking = TrackingSnap::new(scene.settings.clone(), Some(Point3::origin()), false);
    scene.settings.set_tracking_enabled(false);
    let (x, y) = px(6.0, 0.2);
    assert!(tracking.snap(&PointerState::new(&view, x, y)).is_none());
}

#[test]
fn test_stale_guides_removed_each_evaluation() {
    let scene = TestScene::new();
    let view = top_view(&scene);
    let mut tracking = TrackingSnap::new(scene.settings.clone(), Some(Point3::origin()), false);

    for step in 1..=5 {
        let (x, y) = px(step as f64, 0.2);
        tracking.snap(&PointerState::new(&view, x, y)).expect("tracking snap");
        assert_eq!(scene.active_meshes(), 1);
    }

    tracking.remove_dynamic_object(view.id());
    assert_eq!(scene.active_meshes(), 0);
    assert_eq!(tracking.guide_count(view.id()), 0);
}

#[test]
fn test_end_on_axis_uses_point_distance() {
    let scene = TestScene::new();
    let view = top_view(&scene);
    let axis = Axis::new(Point3::new(1.0, 0.0, 0.0), Vector3::z(), labels::AXIS_Z);
    let (x, y) = px(1.0, 0.0);
    assert!(screen_distance_to_axis(&view, &axis, x + 3.0, y + 4.0).approx_eq(&5.0));
}

#[test]
fn test_toggle_point_twice_restores_registry() {
    let scene = TestScene::new();
    let view = top_view(&scene);
    let mut tracking = TrackingSnap::new(scene.settings.clone(), None, true);
    let snap = pinned(&view, Point3::new(2.0, 2.0, 0.0));

    tracking.object_tracking_mut().toggle_point(&view, &snap);
    assert_eq!(tracking.object_tracking().tracked_count(view.document()), 1);
    let rays = tracking.object_tracking().get_tracking_rays(view.document());
    assert_eq!(rays.len(), 1);
    assert_eq!(rays[0].axes.len(), 6);

    // A coordinate within tolerance counts as the same point
    let nearly = pinned(&view, Point3::new(2.0, 2.0 + 1e-9, 0.0));
    tracking.object_tracking_mut().toggle_point(&view, &nearly);
    assert_eq!(tracking.object_tracking().tracked_count(view.document()), 0);

    let changes = scene.meshes.lock().unwrap().take_changes();
    let removed = changes.iter().filter(|c| matches!(c, VisualChange::Removed { .. })).count();
    assert_eq!(changes.len(), 2);
    assert_eq!(removed, 1);
    assert_eq!(scene.active_meshes(), 0);
}

#[test]
fn test_dwell_pins_then_unpins() {
    let scene = TestScene::new();
    let view = top_view(&scene);
    let mut tracking = TrackingSnap::new(scene.settings.clone(), None, false);
    let snap = pinned(&view, Point3::new(3.0, 4.0, 0.0));
    let start = Instant::now();
    let at = |millis: u64| start + Duration::from_millis(millis);

    tracking.show_tracking_at_timeout(&view, Some(&snap), at(0));
    // Holding the same snap does not restart the dwell
    tracking.show_tracking_at_timeout(&view, Some(&snap.clone()), at(300));
    tracking.poll(at(599));
    assert_eq!(tracking.object_tracking().tracked_count(view.document()), 0);
    tracking.poll(at(601));
    assert_eq!(tracking.object_tracking().tracked_count(view.document()), 1);
    assert_eq!(scene.active_meshes(), 1);

    // Leave and come back: a second dwell unpins
    tracking.show_tracking_at_timeout(&view, None, at(700));
    tracking.show_tracking_at_timeout(&view, Some(&snap), at(800));
    tracking.poll(at(1500));
    assert_eq!(tracking.object_tracking().tracked_count(view.document()), 0);
    assert_eq!(scene.active_meshes(), 0);
}

#[test]
fn test_moving_away_cancels_dwell() {
    let scene = TestScene::new();
    let view = top_view(&scene);
    let mut tracking = TrackingSnap::new(scene.settings.clone(), None, false);
    let start = Instant::now();

    tracking.show_tracking_at_timeout(&view, Some(&pinned(&view, Point3::origin())), start);
    tracking.show_tracking_at_timeout(&view, None, start + Duration::from_millis(200));
    assert!(!tracking.object_tracking().is_pending());
    tracking.poll(start + Duration::from_secs(2));
    assert_eq!(tracking.object_tracking().tracked_count(view.document()), 0);
}

#[test]
fn test_clear_ignores_pending_dwell() {
    let scene = TestScene::new();
    let view = top_view(&scene);
    let before = scene.settings.subscriber_count();
    let mut tracking = TrackingSnap::new(scene.settings.clone(), Some(Point3::origin()), false);
    let start = Instant::now();

    tracking
        .object_tracking_mut()
        .toggle_point(&view, &pinned(&view, Point3::new(1.0, 1.0, 0.0)));
    tracking.show_tracking_at_timeout(&view, Some(&pinned(&view, Point3::origin())), start);
    let (x, y) = px(6.0, 0.2);
    tracking.snap(&PointerState::new(&view, x, y));
    assert!(scene.active_meshes() > 0);

    tracking.clear();
    assert_eq!(scene.active_meshes(), 0);
    assert_eq!(scene.settings.subscriber_count(), before);

    tracking.poll(start + Duration::from_secs(1));
    assert_eq!(tracking.object_tracking().tracked_count(view.document()), 0);
    assert_eq!(scene.active_meshes(), 0);
}

#[test]
fn test_settings_change_resets_tracking() {
    let scene = TestScene::new();
    let view = top_view(&scene);
    let mut tracking = TrackingSnap::new(scene.settings.clone(), None, false);
    tracking
        .object_tracking_mut()
        .toggle_point(&view, &pinned(&view, Point3::new(1.0, 1.0, 0.0)));
    assert_eq!(scene.active_meshes(), 1);

    scene.settings.toggle_snap_type(crate::config::SnapType::Vertex);
    tracking.poll(Instant::now());
    assert_eq!(tracking.object_tracking().tracked_count(view.document()), 0);
    assert_eq!(scene.active_meshes(), 0);

    // Pinning works again after the reset
    let start = Instant::now();
    let snap = pinned(&view, Point3::new(2.0, 0.0, 0.0));
    tracking.show_tracking_at_timeout(&view, Some(&snap), start);
    tracking.poll(start + Duration::from_millis(600));
    assert_eq!(tracking.object_tracking().tracked_count(view.document()), 1);
}

#[test]
fn test_axis_at_exact_snap_distance_is_accepted() {
    let axis = Axis::new(Point3::origin(), Vector3::x(), labels::AXIS_X);
    let (x, y) = px(6.0, 0.5);
    let distance = screen_distance_to_axis(&top_view(&TestScene::new()), &axis, x, y);

    let scene = TestScene::with_config(SnapConfig {
        snap_distance: distance,
        ..SnapConfig::default()
    });
    let view = top_view(&scene);
    let mut tracking = TrackingSnap::new(scene.settings.clone(), Some(Point3::origin()), false);
    let result = tracking.snap(&PointerState::new(&view, x, y)).expect("snap at the threshold");
    assert_eq!(result.info.as_deref(), Some(labels::AXIS_X));
    assert!(result.point.approx_eq(&Point3::new(6.0, 0.0, 0.0)));
}

#[test]
fn test_disabled_tracking_never_pins() {
    let scene = TestScene::with_config(SnapConfig {
        enable_snap_tracking: false,
        ..SnapConfig::default()
    });
    let view = top_view(&scene);
    let mut tracking = TrackingSnap::new(scene.settings.clone(), None, false);
    let start = Instant::now();

    tracking.show_tracking_at_timeout(&view, Some(&pinned(&view, Point3::new(10.0, 0.0, 0.0))), start);
    assert!(!tracking.object_tracking().is_pending());
    tracking.poll(start + Duration::from_millis(700));
    assert_eq!(tracking.object_tracking().tracked_count(view.document()), 0);
    assert_eq!(scene.active_meshes(), 0);
}

#[test]
fn test_disabling_tracking_drops_pending_dwell() {
    let scene = TestScene::new();
    let view = top_view(&scene);
    let mut tracking = TrackingSnap::new(scene.settings.clone(), None, false);
    let snap = pinned(&view, Point3::new(10.0, 0.0, 0.0));
    let start = Instant::now();

    tracking.show_tracking_at_timeout(&view, Some(&snap), start);
    assert!(tracking.object_tracking().is_pending());
    scene.settings.set_tracking_enabled(false);
    tracking.show_tracking_at_timeout(&view, Some(&snap), start + Duration::from_millis(100));
    tracking.poll(start + Duration::from_millis(700));
    assert_eq!(tracking.object_tracking().tracked_count(view.document()), 0);
}
