//! Control Zones
//!
//! A control zone is the road corridor between a start line and an exit line
//! whose real-world length is known. Each zone owns a planar homography that
//! maps the perspective-skewed corridor onto a flat reference rectangle:
//! - Rectification of pixel points
//! - Zone membership in rectified space
//! - Entry/exit line crossing in raw pixel space

pub mod homography;
pub mod zone;

pub use homography::{Homography, DEFAULT_REPROJECTION_THRESHOLD};
pub use zone::{ControlZone, ZoneId, ZoneSpec, LINE_CROSSING_THRESHOLD};

use thiserror::Error;

/// Control zone error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ZoneError {
    #[error("At least 4 point correspondences are required, got {0}")]
    InsufficientPoints(usize),

    #[error("Correspondence count mismatch: {src} source vs {dst} target points")]
    CorrespondenceMismatch { src: usize, dst: usize },

    #[error("Degenerate calibration points: {0}")]
    Degenerate(String),

    #[error("Invalid zone parameter: {0}")]
    InvalidParameter(String),

    #[error("Zone {id} rectification misses its corners by {error:.4} px")]
    CornerMismatch { id: ZoneId, error: f64 },
}
