//! Candidate objects the walker assigns to tracks.

use std::fmt;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::tracker::track::{Track, TrackId};

pub type DetectionId = u64;
pub type Timestamp = u64;
pub type CamId = u32;

/// A single observation of a tagged object in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub id: DetectionId,
    pub timestamp: Timestamp,
    pub cam_id: CamId,
    /// Position in image coordinates
    pub position: Point2<f64>,
    /// Orientation in radians
    pub orientation: f64,
    /// Per-bit frequency distribution of the decoded id
    pub bee_id: Vec<f64>,
}

/// The two kinds of candidates the walker understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Atomic, length-1 observations
    Detection,
    /// Previously built tracks that get stitched together
    Segment,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Detection => f.write_str("detection"),
            Self::Segment => f.write_str("segment"),
        }
    }
}

/// Identifier of a frame object, unique within one kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectId {
    Detection(DetectionId),
    Segment(TrackId),
}

/// A candidate for extending a waiting track.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameObject {
    Detection(Detection),
    Segment(Track),
}

impl FrameObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Detection(_) => ObjectKind::Detection,
            Self::Segment(_) => ObjectKind::Segment,
        }
    }

    pub fn id(&self) -> ObjectId {
        match self {
            Self::Detection(detection) => ObjectId::Detection(detection.id),
            Self::Segment(segment) => ObjectId::Segment(segment.id.clone()),
        }
    }

    /// Timestamp the object ends on; a segment already spans time.
    pub fn last_timestamp(&self) -> Option<Timestamp> {
        match self {
            Self::Detection(detection) => Some(detection.timestamp),
            Self::Segment(segment) => segment.last_timestamp(),
        }
    }

    /// Number of observations this object contributes to a track.
    pub fn len(&self) -> usize {
        match self {
            Self::Detection(_) => 1,
            Self::Segment(segment) => segment.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Detection> for FrameObject {
    fn from(detection: Detection) -> Self {
        Self::Detection(detection)
    }
}

impl From<Track> for FrameObject {
    fn from(segment: Track) -> Self {
        Self::Segment(segment)
    }
}
