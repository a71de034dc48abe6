//! Error type shared by the walker, the lifecycle manager and the scoring functions.

use thiserror::Error;

use crate::tracker::{CamId, ObjectKind, Timestamp, TrackId};

/// Fatal conditions that abort a walker run.
///
/// None of these are transient: they signal malformed input or a broken
/// collaborator, so the run stops instead of skipping the offending frame.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// A frame object of the wrong kind reached the lifecycle manager.
    #[error("unexpected frame object kind: expected {expected}, found {found}")]
    UnexpectedObjectKind {
        expected: ObjectKind,
        found: ObjectKind,
    },

    /// Two sequences that must be parallel have different lengths.
    #[error("length mismatch in {context}: {left} != {right}")]
    LengthMismatch {
        context: &'static str,
        left: usize,
        right: usize,
    },

    /// A segment ends on a timestamp that the stream does not contain.
    #[error("timestamp {timestamp} is not part of the timeline of camera {cam_id}")]
    UnknownTimestamp { timestamp: Timestamp, cam_id: CamId },

    /// A scoring function needs detection metadata the track does not carry.
    #[error("track {0} carries no detections")]
    MissingDetections(TrackId),

    /// The linear assignment solver rejected the cost matrix.
    #[error("linear assignment failed: {0}")]
    Assignment(String),

    #[error("invalid walker configuration: {0}")]
    InvalidConfig(String),

    /// The candidate source failed to answer a query.
    #[error("candidate source error")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl TrackingError {
    pub(crate) fn from_source<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Source(Box::new(err))
    }
}
