//! Speed computation and per-zone speed records

use control_zone::ZoneId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ObjectId;

/// m/s to km/h
const MPS_TO_KMH: f64 = 3.6;

/// Speed from zone length and dwell frames.
///
/// Returns `None` for zero dwell or any non-finite result.
pub fn speed_kmh(length_m: f64, dwell_frames: u64, fps: f64) -> Option<f64> {
    if dwell_frames == 0 || fps <= 0.0 {
        return None;
    }
    let dwell_s = dwell_frames as f64 / fps;
    let speed = length_m / dwell_s * MPS_TO_KMH;
    speed.is_finite().then_some(speed)
}

/// A completed zone crossing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedMeasurement {
    pub object: ObjectId,
    pub zone: ZoneId,
    pub enter_frame: u64,
    pub exit_frame: u64,
    pub speed_kmh: f64,
    /// Class resolved on the exit frame
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
}

/// Speeds measured in one zone, one value per object.
///
/// Entries stay for the whole run; removing an object from tracking does
/// not evict its measurement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZoneSpeedRecord {
    speeds: BTreeMap<ObjectId, f64>,
}

impl ZoneSpeedRecord {
    /// Store a speed, replacing any earlier value for the object
    pub fn insert(&mut self, object: ObjectId, speed_kmh: f64) {
        self.speeds.insert(object, speed_kmh);
    }

    pub fn get(&self, object: ObjectId) -> Option<f64> {
        self.speeds.get(&object).copied()
    }

    pub fn speeds(&self) -> &BTreeMap<ObjectId, f64> {
        &self.speeds
    }

    pub fn len(&self) -> u64 {
        self.speeds.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.speeds.is_empty()
    }

    /// Mean over every stored value
    pub fn average(&self) -> Option<f64> {
        if self.speeds.is_empty() {
            return None;
        }
        Some(self.speeds.values().sum::<f64>() / self.speeds.len() as f64)
    }
}
