//! Speed Estimation
//!
//! Turns per-frame detections into vehicle speeds and crossing counts:
//! - Tracker seam and a reference centroid tracker
//! - Identity-class resolution by nearest detection centroid
//! - Per-object zone crossing state machine
//! - Frame-timed speed records with per-zone running averages
//! - Staged per-frame pipeline over a shared frame context

pub mod detection;
pub mod distance;
pub mod engine;
pub mod pipeline;
pub mod resolver;
pub mod speed;
pub mod status;
pub mod tracker;

pub use crossing_counter::ObjectId;
pub use detection::{BoundingBox, Detection, Detector};
pub use engine::{EstimatorSettings, SpeedEstimator, SpeedLabel, ZoneSummary};
pub use pipeline::{FrameContext, PipelineStats, RunReport, SpeedPipeline, Stage};
pub use resolver::resolve_classes;
pub use speed::{speed_kmh, SpeedMeasurement, ZoneSpeedRecord};
pub use status::{CrossingState, CrossingStatus, ObjectRecord};
pub use tracker::{CentroidTracker, ObjectTracker, TrackerUpdate};

use control_zone::{ZoneError, ZoneId};
use thiserror::Error;

/// Speed estimation error types
#[derive(Error, Debug)]
pub enum EstimatorError {
    #[error("Control zone error: {0}")]
    Zone(#[from] ZoneError),

    #[error("Control zone id {0} is not unique")]
    DuplicateZone(ZoneId),

    #[error("Invalid estimator setting: {0}")]
    InvalidSetting(String),
}
