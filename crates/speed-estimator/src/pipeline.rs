//! Per-frame pipeline
//!
//! Every frame runs the same ordered stages over one `FrameContext`, so
//! class resolution always precedes speed estimation and counting.

use control_zone::ZoneId;
use crossing_counter::{Counter, CounterSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use zone_geometry::Point;

use crate::detection::{BoundingBox, Detection};
use crate::engine::{SpeedEstimator, SpeedLabel, ZoneSummary};
use crate::resolver::resolve_classes;
use crate::speed::SpeedMeasurement;
use crate::tracker::ObjectTracker;
use crate::ObjectId;

/// Pipeline stage, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Tracker update: persistent ids and centroids
    Track,
    /// Drop state of objects the tracker removed
    Retire,
    /// Class of every tracked id
    ResolveClasses,
    /// Crossing state machine and completed speeds
    EstimateSpeed,
    /// Counter tallies
    Count,
    /// Speed labels and zone averages
    Display,
}

impl Stage {
    pub const ORDER: [Stage; 6] = [
        Stage::Track,
        Stage::Retire,
        Stage::ResolveClasses,
        Stage::EstimateSpeed,
        Stage::Count,
        Stage::Display,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Track => "track",
            Stage::Retire => "retire",
            Stage::ResolveClasses => "resolve-classes",
            Stage::EstimateSpeed => "estimate-speed",
            Stage::Count => "count",
            Stage::Display => "display",
        }
    }
}

/// Everything known about one frame
#[derive(Debug, Clone, Default)]
pub struct FrameContext {
    pub frame_index: u64,
    pub detections: Vec<Detection>,

    // Track / Retire
    pub objects: BTreeMap<ObjectId, Point>,
    pub removed: Vec<ObjectId>,

    // ResolveClasses
    pub classes: BTreeMap<ObjectId, String>,

    // EstimateSpeed
    pub completed: Vec<SpeedMeasurement>,

    // Count
    pub counters: Vec<CounterSnapshot>,

    // Display
    pub labels: Vec<SpeedLabel>,
    pub averages: BTreeMap<ZoneId, f64>,
}

impl FrameContext {
    pub fn new(frame_index: u64, detections: Vec<Detection>) -> Self {
        Self {
            frame_index,
            detections,
            ..Default::default()
        }
    }
}

/// Frame statistics of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub frames_processed: u64,
    /// Frames without detections, left out of every update
    pub frames_skipped: u64,
}

/// End-of-run summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    #[serde(flatten)]
    pub stats: PipelineStats,
    pub counters: Vec<CounterSnapshot>,
    pub zones: Vec<ZoneSummary>,
}

/// Tracker, estimator and counters wired into one frame pipeline
pub struct SpeedPipeline<T: ObjectTracker> {
    tracker: T,
    estimator: SpeedEstimator,
    counters: Vec<Counter>,
    stats: PipelineStats,
}

impl<T: ObjectTracker> SpeedPipeline<T> {
    pub fn new(tracker: T, estimator: SpeedEstimator, counters: Vec<Counter>) -> Self {
        Self {
            tracker,
            estimator,
            counters,
            stats: PipelineStats::default(),
        }
    }

    /// Run all stages for one frame.
    ///
    /// A frame without detections is skipped entirely and yields `None`.
    pub fn process(&mut self, frame_index: u64, detections: Vec<Detection>) -> Option<FrameContext> {
        if detections.is_empty() {
            self.stats.frames_skipped += 1;
            metrics::counter!("speedtrap_frames_skipped_total").increment(1);
            debug!("Frame {} has no detections, skipped", frame_index);
            return None;
        }

        let mut ctx = FrameContext::new(frame_index, detections);
        for stage in Stage::ORDER {
            self.run_stage(stage, &mut ctx);
            debug!("Frame {}: {} stage done", frame_index, stage.name());
        }
        self.stats.frames_processed += 1;
        Some(ctx)
    }

    fn run_stage(&mut self, stage: Stage, ctx: &mut FrameContext) {
        match stage {
            Stage::Track => {
                let boxes: Vec<BoundingBox> = ctx.detections.iter().map(|d| d.bbox).collect();
                let update = self.tracker.update(&boxes);
                ctx.objects = update.objects;
                ctx.removed = update.removed;
            }
            Stage::Retire => {
                for &id in &ctx.removed {
                    self.estimator.remove(id);
                    for counter in &mut self.counters {
                        counter.forget(id);
                    }
                }
            }
            Stage::ResolveClasses => {
                ctx.classes = resolve_classes(&ctx.detections, &ctx.objects);
            }
            Stage::EstimateSpeed => {
                let mut completed = self.estimator.update(ctx.frame_index, &ctx.objects);
                for m in &mut completed {
                    m.class = ctx.classes.get(&m.object).cloned();
                }
                ctx.completed = completed;
            }
            Stage::Count => {
                for counter in &mut self.counters {
                    counter.count(&ctx.objects, &ctx.classes);
                }
                ctx.counters = self.counters.iter().map(Counter::snapshot).collect();
            }
            Stage::Display => {
                ctx.labels = self.estimator.display(&ctx.objects);
                ctx.averages = self
                    .estimator
                    .zones()
                    .iter()
                    .filter_map(|z| self.estimator.average_speed(z.id()).map(|avg| (z.id(), avg)))
                    .collect();
            }
        }
    }

    pub fn estimator(&self) -> &SpeedEstimator {
        &self.estimator
    }

    pub fn counters(&self) -> &[Counter] {
        &self.counters
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn report(&self) -> RunReport {
        RunReport {
            stats: self.stats,
            counters: self.counters.iter().map(Counter::snapshot).collect(),
            zones: self.estimator.zone_summaries(),
        }
    }
}
