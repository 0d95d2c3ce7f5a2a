//! Speed estimation engine
//!
//! Drives the crossing state machine of every (object, zone) pair once per
//! frame and turns completed crossings into speeds:
//!
//! ```text
//!  Unseen --start line--> Entered(zone) --exit line of zone--> Exited(zone)
//!     ^                                                            |
//!     +------------------- display window elapsed -----------------+
//! ```

use control_zone::{ControlZone, ZoneId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};
use zone_geometry::Point;

use crate::speed::{speed_kmh, SpeedMeasurement, ZoneSpeedRecord};
use crate::status::{CrossingState, CrossingStatus, ObjectRecord};
use crate::{EstimatorError, ObjectId};

/// Estimator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatorSettings {
    /// Frames per second of the stream
    pub fps: f64,
    /// Number of display calls a measured speed stays visible
    pub display_frames: u32,
}

impl Default for EstimatorSettings {
    fn default() -> Self {
        Self {
            fps: 25.0,
            display_frames: 20,
        }
    }
}

/// Speed shown next to an object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedLabel {
    pub object: ObjectId,
    pub zone: ZoneId,
    pub centroid: Point,
    pub speed_kmh: f64,
    pub over_limit: bool,
}

/// Per-zone view for reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSummary {
    pub id: ZoneId,
    pub speed_limit_kmh: f64,
    pub measurements: u64,
    pub average_kmh: Option<f64>,
    pub speeds: BTreeMap<ObjectId, f64>,
}

/// Zone crossing speed estimator
pub struct SpeedEstimator {
    zones: Vec<ControlZone>,
    settings: EstimatorSettings,
    /// Per-object state, keyed by persistent id
    records: HashMap<ObjectId, ObjectRecord>,
    /// Speed record per zone
    speeds: BTreeMap<ZoneId, ZoneSpeedRecord>,
}

impl SpeedEstimator {
    pub fn new(zones: Vec<ControlZone>, settings: EstimatorSettings) -> Result<Self, EstimatorError> {
        if !(settings.fps.is_finite() && settings.fps > 0.0) {
            return Err(EstimatorError::InvalidSetting(format!(
                "fps must be positive, got {}",
                settings.fps
            )));
        }
        if settings.display_frames == 0 {
            return Err(EstimatorError::InvalidSetting(
                "display window must be at least one frame".into(),
            ));
        }

        let mut ids = HashSet::new();
        for zone in &zones {
            if !ids.insert(zone.id()) {
                return Err(EstimatorError::DuplicateZone(zone.id()));
            }
        }

        let speeds = zones
            .iter()
            .map(|z| (z.id(), ZoneSpeedRecord::default()))
            .collect();

        info!(
            "Speed estimator ready: {} zones at {} fps, display window {} frames",
            zones.len(),
            settings.fps,
            settings.display_frames
        );

        Ok(Self {
            zones,
            settings,
            records: HashMap::new(),
            speeds,
        })
    }

    /// Advance every (zone, object) pair by one frame.
    ///
    /// Returns the crossings completed on this frame.
    pub fn update(
        &mut self,
        frame_index: u64,
        objects: &BTreeMap<ObjectId, Point>,
    ) -> Vec<SpeedMeasurement> {
        let mut completed = Vec::new();

        for zone in &self.zones {
            for (&id, centroid) in objects {
                let record = self.records.entry(id).or_default();
                let Some(measurement) =
                    advance(zone, record, id, centroid, frame_index, self.settings.fps)
                else {
                    continue;
                };

                self.speeds
                    .entry(zone.id())
                    .or_default()
                    .insert(id, measurement.speed_kmh);
                metrics::histogram!("speedtrap_speed_kmh", "zone" => zone.id().to_string())
                    .record(measurement.speed_kmh);
                info!(
                    "Object {} crossed zone {} at {:.1} km/h (frames {}..{})",
                    id, zone.id(), measurement.speed_kmh, measurement.enter_frame, measurement.exit_frame
                );
                completed.push(measurement);
            }
        }

        completed
    }

    /// Speeds to show for the given objects this frame.
    ///
    /// Each call counts as one display of an exited object's speed. After
    /// `display_frames` displays the object returns to `Unseen`.
    pub fn display(&mut self, objects: &BTreeMap<ObjectId, Point>) -> Vec<SpeedLabel> {
        let mut labels = Vec::new();

        for (&id, centroid) in objects {
            let Some(record) = self.records.get_mut(&id) else {
                continue;
            };
            let CrossingState::Exited { zone, displayed } = record.state else {
                continue;
            };

            let speed = self.speeds.get(&zone).and_then(|r| r.get(id));
            let limit = self.zones.iter().find(|z| z.id() == zone).map(|z| z.speed_limit_kmh());
            let (Some(speed), Some(limit)) = (speed, limit) else {
                record.reset();
                continue;
            };

            labels.push(SpeedLabel {
                object: id,
                zone,
                centroid: *centroid,
                speed_kmh: speed,
                over_limit: speed > limit,
            });

            let displayed = displayed + 1;
            if displayed >= self.settings.display_frames {
                debug!("Object {} display window elapsed", id);
                record.reset();
            } else {
                record.state = CrossingState::Exited { zone, displayed };
            }
        }

        labels
    }

    /// Drop the tracking state of an id the tracker removed.
    ///
    /// Its measured speeds stay in the zone records.
    pub fn remove(&mut self, id: ObjectId) -> bool {
        self.records.remove(&id).is_some()
    }

    /// Cumulative mean speed of a zone
    pub fn average_speed(&self, zone: ZoneId) -> Option<f64> {
        self.speeds.get(&zone).and_then(ZoneSpeedRecord::average)
    }

    pub fn speed_record(&self, zone: ZoneId) -> Option<&ZoneSpeedRecord> {
        self.speeds.get(&zone)
    }

    pub fn status(&self, id: ObjectId) -> CrossingStatus {
        self.records
            .get(&id)
            .map(|r| r.state.status())
            .unwrap_or_default()
    }

    pub fn state(&self, id: ObjectId) -> CrossingState {
        self.records.get(&id).map(|r| r.state).unwrap_or_default()
    }

    pub fn frame_log(&self, id: ObjectId) -> Option<&[u64]> {
        self.records.get(&id).map(|r| r.frames.as_slice())
    }

    /// Number of objects with live state
    pub fn tracked_objects(&self) -> usize {
        self.records.len()
    }

    pub fn zones(&self) -> &[ControlZone] {
        &self.zones
    }

    pub fn zone_summaries(&self) -> Vec<ZoneSummary> {
        self.zones
            .iter()
            .map(|zone| {
                let record = self.speeds.get(&zone.id()).cloned().unwrap_or_default();
                ZoneSummary {
                    id: zone.id(),
                    speed_limit_kmh: zone.speed_limit_kmh(),
                    measurements: record.len(),
                    average_kmh: record.average(),
                    speeds: record.speeds().clone(),
                }
            })
            .collect()
    }
}

/// One state machine step for an object against one zone
fn advance(
    zone: &ControlZone,
    record: &mut ObjectRecord,
    id: ObjectId,
    centroid: &Point,
    frame_index: u64,
    fps: f64,
) -> Option<SpeedMeasurement> {
    let before = record.state;

    if matches!(before, CrossingState::Unseen | CrossingState::Entered { .. })
        && zone.entering(centroid)
    {
        record.state = CrossingState::Entered { zone: zone.id() };
        record.frames.clear();
        record.frames.push(frame_index);
        debug!("Object {} entered zone {} at frame {}", id, zone.id(), frame_index);
    }

    // Exit is judged against the owner held before this step
    let CrossingState::Entered { zone: owner } = before else {
        return None;
    };
    if !zone.exiting(centroid) {
        return None;
    }
    if owner != zone.id() {
        debug!(
            "Object {} reached exit of zone {} while owned by zone {}, ignored",
            id,
            zone.id(),
            owner
        );
        return None;
    }

    record.frames.push(frame_index);
    let enter_frame = record.frames[0];
    let dwell = frame_index.saturating_sub(enter_frame);

    match speed_kmh(zone.length_m(), dwell, fps) {
        Some(speed) => {
            record.state = CrossingState::Exited { zone: zone.id(), displayed: 0 };
            Some(SpeedMeasurement {
                object: id,
                zone: zone.id(),
                enter_frame,
                exit_frame: frame_index,
                speed_kmh: speed,
                class: None,
            })
        }
        None => {
            warn!(
                "Object {} in zone {}: {} dwell frames, measurement discarded",
                id,
                zone.id(),
                dwell
            );
            metrics::counter!(
                "speedtrap_invalid_measurements_total",
                "zone" => zone.id().to_string()
            )
            .increment(1);
            record.reset();
            None
        }
    }
}
