//! Per-object crossing status

use control_zone::ZoneId;
use serde::{Deserialize, Serialize};

/// Crossing state of one object.
///
/// An object can only exit the zone it entered, so the owning zone is
/// carried by the state itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrossingState {
    /// Not inside any zone measurement
    #[default]
    Unseen,
    /// Crossed the start line of `zone`
    Entered { zone: ZoneId },
    /// Crossed the exit line of `zone`; speed shown `displayed` times so far
    Exited { zone: ZoneId, displayed: u32 },
}

impl CrossingState {
    /// Numeric state code: 0 unseen, 1 entered, 2 exited
    pub fn code(&self) -> u8 {
        match self {
            CrossingState::Unseen => 0,
            CrossingState::Entered { .. } => 1,
            CrossingState::Exited { .. } => 2,
        }
    }

    /// Zone the object most recently entered
    pub fn owner(&self) -> Option<ZoneId> {
        match self {
            CrossingState::Unseen => None,
            CrossingState::Entered { zone } | CrossingState::Exited { zone, .. } => Some(*zone),
        }
    }

    pub fn display_count(&self) -> u32 {
        match self {
            CrossingState::Exited { displayed, .. } => *displayed,
            _ => 0,
        }
    }

    pub fn status(&self) -> CrossingStatus {
        CrossingStatus {
            state: self.code(),
            zone: self.owner(),
            display_count: self.display_count(),
        }
    }
}

/// Flat `(state, zone, display count)` view for display and reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossingStatus {
    pub state: u8,
    pub zone: Option<ZoneId>,
    pub display_count: u32,
}

/// Everything the estimator keeps for one tracked object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectRecord {
    pub state: CrossingState,
    /// Entry frame, then exit frame once the zone is crossed
    pub frames: Vec<u64>,
}

impl ObjectRecord {
    /// Back to unseen with an empty frame log
    pub fn reset(&mut self) {
        self.state = CrossingState::Unseen;
        self.frames.clear();
    }
}
