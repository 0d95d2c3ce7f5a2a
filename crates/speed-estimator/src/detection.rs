//! Detector output and the detector seam

use serde::{Deserialize, Serialize};
use zone_geometry::Point;

/// Axis-aligned box in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn centroid(&self) -> Point {
        Point::new(self.x1, self.y1).midpoint(&Point::new(self.x2, self.y2))
    }
}

/// Single object detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(flatten)]
    pub bbox: BoundingBox,
    /// Detection confidence (0-1)
    pub confidence: f64,
    /// Class label (e.g. "car")
    pub class: String,
}

impl Detection {
    pub fn new(bbox: BoundingBox, confidence: f64, class: impl Into<String>) -> Self {
        Self {
            bbox,
            confidence,
            class: class.into(),
        }
    }
}

/// Object detector producing boxes for one frame.
///
/// Confidence filtering is the detector's job.
pub trait Detector {
    type Frame;
    type Error;

    fn detect(&mut self, frame: &Self::Frame) -> Result<Vec<Detection>, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centroid() {
        let b = BoundingBox::new(100.0, 200.0, 300.0, 260.0);
        assert_eq!(b.centroid(), Point::new(200.0, 230.0));
    }

    #[test]
    fn test_detection_json_shape() {
        let json = r#"{"x1":10,"y1":20,"x2":30,"y2":40,"confidence":0.87,"class":"truck"}"#;
        let d: Detection = serde_json::from_str(json).unwrap();
        assert_eq!(d.bbox, BoundingBox::new(10.0, 20.0, 30.0, 40.0));
        assert_eq!(d.class, "truck");
    }
}
