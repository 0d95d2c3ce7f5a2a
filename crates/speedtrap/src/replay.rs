//! Recorded detection replay
//!
//! Each line of a detection log holds one frame:
//! `{"frame": 12, "detections": [{"x1": .., "y1": .., "x2": .., "y2": .., "confidence": .., "class": ".."}]}`

use serde::{Deserialize, Serialize};
use speed_estimator::{Detection, Detector};
use std::collections::HashSet;
use std::convert::Infallible;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Replay error types
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed frame record on line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },
}

/// One recorded frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Position of the frame in the source stream
    pub frame: u64,
    #[serde(default)]
    pub detections: Vec<Detection>,
}

/// Frame source over a JSON Lines detection log.
///
/// The file handle is released when the source is dropped.
pub struct DetectionLog {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line: usize,
    frames_read: u64,
}

impl DetectionLog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| ReplayError::Io {
            path: path.clone(),
            source,
        })?;
        info!("Opened detection log {}", path.display());

        Ok(Self {
            path,
            lines: BufReader::new(file).lines(),
            line: 0,
            frames_read: 0,
        })
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }
}

impl Iterator for DetectionLog {
    type Item = Result<FrameRecord, ReplayError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let text = match self.lines.next()? {
                Ok(text) => text,
                Err(source) => {
                    return Some(Err(ReplayError::Io {
                        path: self.path.clone(),
                        source,
                    }))
                }
            };
            self.line += 1;

            if text.trim().is_empty() {
                continue;
            }

            let record = serde_json::from_str::<FrameRecord>(&text).map_err(|source| {
                ReplayError::Parse {
                    line: self.line,
                    source,
                }
            });
            if record.is_ok() {
                self.frames_read += 1;
            }
            return Some(record);
        }
    }
}

impl Drop for DetectionLog {
    fn drop(&mut self) {
        info!(
            "Released detection log {} after {} frames",
            self.path.display(),
            self.frames_read
        );
    }
}

/// Detector over recorded frames.
///
/// Keeps detections of the configured classes at or above the minimum
/// confidence, as a live detector would report them.
pub struct ReplayDetector {
    classes: HashSet<String>,
    min_confidence: f64,
}

impl ReplayDetector {
    pub fn new<I, S>(classes: I, min_confidence: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            classes: classes.into_iter().map(Into::into).collect(),
            min_confidence,
        }
    }
}

impl Detector for ReplayDetector {
    type Frame = FrameRecord;
    type Error = Infallible;

    fn detect(&mut self, frame: &FrameRecord) -> Result<Vec<Detection>, Infallible> {
        let kept: Vec<Detection> = frame
            .detections
            .iter()
            .filter(|d| d.confidence >= self.min_confidence && self.classes.contains(&d.class))
            .cloned()
            .collect();

        if kept.len() < frame.detections.len() {
            debug!(
                "Frame {}: kept {} of {} detections",
                frame.frame,
                kept.len(),
                frame.detections.len()
            );
        }
        Ok(kept)
    }
}
