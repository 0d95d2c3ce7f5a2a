//! End-to-end pipeline runs with the centroid tracker

use control_zone::{ControlZone, ZoneSpec};
use crossing_counter::Counter;
use speed_estimator::{
    BoundingBox, CentroidTracker, CrossingState, Detection, EstimatorSettings, SpeedEstimator,
    SpeedPipeline,
};
use zone_geometry::Line;

/// Start line at y=400, exit line at y=100, 50 m apart; counting line at y=250
fn pipeline(max_disappeared: u32) -> SpeedPipeline<CentroidTracker> {
    let zone = ControlZone::new(ZoneSpec {
        id: 1,
        start: Line::from_coords(100.0, 400.0, 500.0, 400.0),
        exit: Line::from_coords(450.0, 100.0, 150.0, 100.0),
        length_m: 50.0,
        speed_limit_kmh: 130.0,
        width: 640.0,
        height: 480.0,
    })
    .unwrap();
    let estimator = SpeedEstimator::new(vec![zone], EstimatorSettings::default()).unwrap();
    let counter = Counter::new(
        "main",
        Line::from_coords(100.0, 250.0, 500.0, 250.0),
        ["car", "truck"],
    );
    SpeedPipeline::new(CentroidTracker::new(max_disappeared), estimator, vec![counter])
}

fn det(cx: f64, cy: f64, class: &str) -> Detection {
    Detection::new(BoundingBox::new(cx - 20.0, cy - 10.0, cx + 20.0, cy + 10.0), 0.9, class)
}

#[test]
fn test_single_car_measured_and_counted() {
    let mut p = pipeline(8);

    let ctx = p.process(10, vec![det(300.0, 400.0, "car")]).unwrap();
    assert_eq!(ctx.classes[&0], "car");
    assert_eq!(p.estimator().state(0), CrossingState::Entered { zone: 1 });

    let ctx = p.process(20, vec![det(300.0, 250.0, "car")]).unwrap();
    assert_eq!(ctx.counters[0].tallies["car"], 1);
    assert!(ctx.counters[0].is_crossing);

    // Still on the counting line: no double count
    let ctx = p.process(21, vec![det(300.0, 251.0, "car")]).unwrap();
    assert_eq!(ctx.counters[0].tallies["car"], 1);
    assert!(!ctx.counters[0].is_crossing);

    let ctx = p.process(35, vec![det(300.0, 100.0, "car")]).unwrap();
    assert_eq!(ctx.completed.len(), 1);
    assert!((ctx.completed[0].speed_kmh - 180.0).abs() < 1e-9);
    assert_eq!(ctx.completed[0].class.as_deref(), Some("car"));
    assert_eq!(ctx.labels.len(), 1);
    assert!(ctx.labels[0].over_limit);
    assert!((ctx.averages[&1] - 180.0).abs() < 1e-9);

    let report = p.report();
    assert_eq!(report.stats.frames_processed, 4);
    assert_eq!(report.counters[0].tallies["truck"], 0);
    assert_eq!(report.zones[0].measurements, 1);
}

#[test]
fn test_empty_frame_skipped() {
    let mut p = pipeline(0);
    p.process(10, vec![det(300.0, 400.0, "car")]).unwrap();

    assert!(p.process(11, Vec::new()).is_none());
    assert_eq!(p.stats().frames_skipped, 1);
    assert_eq!(p.stats().frames_processed, 1);

    // The tracker saw nothing, so the object is still alive
    let ctx = p.process(12, vec![det(300.0, 390.0, "car")]).unwrap();
    assert!(ctx.removed.is_empty());
    assert!(ctx.objects.contains_key(&0));
}

#[test]
fn test_removed_object_keeps_measurement() {
    let mut p = pipeline(0);
    p.process(10, vec![det(300.0, 400.0, "car")]).unwrap();
    p.process(35, vec![det(300.0, 100.0, "car")]).unwrap();

    // Second vehicle appears far from the first
    p.process(36, vec![det(300.0, 100.0, "car"), det(600.0, 460.0, "truck")])
        .unwrap();

    // First vehicle leaves the frame
    let ctx = p.process(37, vec![det(600.0, 455.0, "truck")]).unwrap();
    assert_eq!(ctx.removed, vec![0]);
    assert!(!ctx.objects.contains_key(&0));
    assert_eq!(p.estimator().state(0), CrossingState::Unseen);
    assert!(p.estimator().frame_log(0).is_none());
    assert!(!p.counters()[0].has_counted(0));

    assert!((ctx.averages[&1] - 180.0).abs() < 1e-9);
    let report = p.report();
    assert_eq!(report.zones[0].measurements, 1);
    assert!((report.zones[0].speeds[&0] - 180.0).abs() < 1e-9);
}

#[test]
fn test_report_json_shape() {
    let mut p = pipeline(8);
    p.process(10, vec![det(300.0, 400.0, "car")]).unwrap();
    p.process(11, Vec::new());

    let json = serde_json::to_value(p.report()).unwrap();
    assert_eq!(json["frames_processed"], 1);
    assert_eq!(json["frames_skipped"], 1);
    assert_eq!(json["counters"][0]["name"], "main");
    assert_eq!(json["zones"][0]["id"], 1);
}
