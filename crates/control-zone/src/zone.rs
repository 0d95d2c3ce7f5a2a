//! Control zone definition and geometric tests

use serde::{Deserialize, Serialize};
use tracing::info;
use zone_geometry::{crossing_corridor, Line, Point};

use crate::homography::{Homography, DEFAULT_REPROJECTION_THRESHOLD};
use crate::ZoneError;

/// Unique control zone identifier
pub type ZoneId = u32;

/// Corridor threshold for the start and exit lines
pub const LINE_CROSSING_THRESHOLD: f64 = 0.015;

/// Relative tolerance of the corner reproduction check
const CORNER_TOLERANCE: f64 = 1e-3;

/// Parameters of a control zone
///
/// Calibration points are taken in order `start.start, start.end,
/// exit.start, exit.end` and map onto the bottom-left, bottom-right,
/// top-right and top-left corners of the `width x height` rectangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSpec {
    pub id: ZoneId,
    pub start: Line,
    pub exit: Line,
    /// Real-world distance between start and exit line (meters)
    pub length_m: f64,
    /// Speed limit (km/h)
    pub speed_limit_kmh: f64,
    /// Rectified frame width (pixels)
    pub width: f64,
    /// Rectified frame height (pixels)
    pub height: f64,
}

/// Speed control zone with its rectification transform
#[derive(Debug, Clone)]
pub struct ControlZone {
    spec: ZoneSpec,
    homography: Homography,
}

impl ControlZone {
    /// Build a zone, computing its homography once
    pub fn new(spec: ZoneSpec) -> Result<Self, ZoneError> {
        if !(spec.length_m.is_finite() && spec.length_m > 0.0) {
            return Err(ZoneError::InvalidParameter(format!(
                "zone {} length must be positive, got {}",
                spec.id, spec.length_m
            )));
        }
        if !(spec.width > 0.0 && spec.height > 0.0) {
            return Err(ZoneError::InvalidParameter(format!(
                "zone {} rectified size must be positive, got {}x{}",
                spec.id, spec.width, spec.height
            )));
        }

        let calibration = calibration_points(&spec);
        let corners = rectangle_corners(spec.width, spec.height);
        let homography = Homography::find(&calibration, &corners, DEFAULT_REPROJECTION_THRESHOLD)?;

        let error = homography.max_reprojection_error(&calibration, &corners);
        if error > CORNER_TOLERANCE * spec.width.max(spec.height) {
            return Err(ZoneError::CornerMismatch { id: spec.id, error });
        }

        info!(
            "Control zone {} ready: {} m, limit {} km/h",
            spec.id, spec.length_m, spec.speed_limit_kmh
        );

        Ok(Self { spec, homography })
    }

    pub fn id(&self) -> ZoneId {
        self.spec.id
    }

    pub fn length_m(&self) -> f64 {
        self.spec.length_m
    }

    pub fn speed_limit_kmh(&self) -> f64 {
        self.spec.speed_limit_kmh
    }

    pub fn homography(&self) -> &Homography {
        &self.homography
    }

    /// The four calibration points in corner order
    pub fn calibration_points(&self) -> [Point; 4] {
        calibration_points(&self.spec)
    }

    /// Corners of the rectified rectangle in calibration order
    pub fn corners(&self) -> [Point; 4] {
        rectangle_corners(self.spec.width, self.spec.height)
    }

    /// Project a pixel point into the rectified frame.
    ///
    /// Points on the vanishing line come back with non-finite coordinates.
    pub fn rectify(&self, point: &Point) -> Point {
        self.homography
            .project(point)
            .unwrap_or(Point::new(f64::NAN, f64::NAN))
    }

    /// Whether the rectified point lies in `[0, width] x [0, height]`
    pub fn in_zone(&self, point: &Point) -> bool {
        let p = self.rectify(point);
        let (x, y) = (p.x.round(), p.y.round());
        (0.0..=self.spec.width).contains(&x) && (0.0..=self.spec.height).contains(&y)
    }

    /// Whether the point is on the start line corridor
    pub fn entering(&self, point: &Point) -> bool {
        crossing_corridor(point.x, point.y, &self.spec.start, LINE_CROSSING_THRESHOLD)
    }

    /// Whether the point is on the exit line corridor
    pub fn exiting(&self, point: &Point) -> bool {
        crossing_corridor(point.x, point.y, &self.spec.exit, LINE_CROSSING_THRESHOLD)
    }
}

fn calibration_points(spec: &ZoneSpec) -> [Point; 4] {
    [spec.start.start, spec.start.end, spec.exit.start, spec.exit.end]
}

fn rectangle_corners(width: f64, height: f64) -> [Point; 4] {
    [
        Point::new(0.0, height),
        Point::new(width, height),
        Point::new(width, 0.0),
        Point::new(0.0, 0.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn spec() -> ZoneSpec {
        ZoneSpec {
            id: 1,
            start: Line::from_coords(200.0, 700.0, 1700.0, 700.0),
            exit: Line::from_coords(1150.0, 300.0, 750.0, 300.0),
            length_m: 50.0,
            speed_limit_kmh: 90.0,
            width: 1920.0,
            height: 1080.0,
        }
    }

    #[test]
    fn test_calibration_round_trip() {
        let zone = ControlZone::new(spec()).unwrap();
        let tol_x = 1e-3 * 1920.0;
        let tol_y = 1e-3 * 1080.0;
        for (p, corner) in zone.calibration_points().iter().zip(zone.corners()) {
            let r = zone.rectify(p);
            assert!((r.x - corner.x).abs() < tol_x, "{:?} vs {:?}", r, corner);
            assert!((r.y - corner.y).abs() < tol_y, "{:?} vs {:?}", r, corner);
        }
    }

    #[test]
    fn test_corridor_centre_in_zone() {
        let zone = ControlZone::new(spec()).unwrap();
        // Intersection of the diagonals maps to the rectangle centre
        let inv = zone.homography().matrix().try_inverse().unwrap();
        let centre = Homography::from_matrix(inv)
            .project(&Point::new(960.0, 540.0))
            .unwrap();
        assert!(zone.in_zone(&centre));
        let back = zone.rectify(&centre);
        assert!((back.x - 960.0).abs() < 1e-6);
        assert!((back.y - 540.0).abs() < 1e-6);
    }

    #[test]
    fn test_far_point_not_in_zone() {
        let zone = ControlZone::new(spec()).unwrap();
        assert!(!zone.in_zone(&Point::new(100.0, 1000.0)));
        assert!(!zone.in_zone(&Point::new(1900.0, 720.0)));
    }

    #[test]
    fn test_entering_and_exiting() {
        let zone = ControlZone::new(spec()).unwrap();
        assert!(zone.entering(&Point::new(900.0, 700.0)));
        assert!(!zone.exiting(&Point::new(900.0, 700.0)));
        assert!(zone.exiting(&Point::new(900.0, 301.0)));
        assert!(!zone.entering(&Point::new(900.0, 500.0)));
        assert!(!zone.exiting(&Point::new(900.0, 500.0)));
    }

    #[test]
    fn test_collinear_calibration_fails() {
        let mut s = spec();
        // Third calibration point sits on the start line
        s.exit.start = Point::new(1000.0, 700.0);
        assert!(matches!(ControlZone::new(s), Err(ZoneError::Degenerate(_))));
    }

    #[test]
    fn test_invalid_length() {
        let mut s = spec();
        s.length_m = 0.0;
        assert!(matches!(ControlZone::new(s), Err(ZoneError::InvalidParameter(_))));
    }

    proptest! {
        #[test]
        fn prop_rectified_midpoint_in_zone(w in 100.0f64..4000.0, h in 100.0f64..4000.0) {
            let mut s = spec();
            s.width = w;
            s.height = h;
            let zone = ControlZone::new(s).unwrap();
            let inv = Homography::from_matrix(zone.homography().matrix().try_inverse().unwrap());
            let p = inv.project(&Point::new(w / 2.0, h / 2.0)).unwrap();
            prop_assert!(zone.in_zone(&p));

            let far = inv.project(&Point::new(w * 10.0, -h * 10.0));
            if let Some(far) = far {
                prop_assert!(!zone.in_zone(&far));
            }
        }
    }
}
