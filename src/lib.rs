//! Stitches per-frame detections, or previously built track segments, into
//! longer tracks.
//!
//! The [`Walker`] sweeps every camera of a [`CandidateSource`] frame by frame.
//! For each frame it closes tracks that went unmatched for too long, scores
//! waiting tracks against nearby candidates with a [`CostFunction`], solves
//! the resulting assignment problem optimally and opens new tracks for
//! whatever was left over.

pub mod error;
pub mod integration;
pub mod scoring;
pub mod tracker;

pub use error::TrackingError;
pub use integration::{
    CandidateSource, CostFunction, DetectionBuilder, InMemorySource, MemorySourceError, ScoreFn,
};
pub use tracker::{
    CamId, Detection, DetectionId, FrameObject, ObjectId, ObjectKind, StreamState, Timestamp,
    Track, TrackId, TrackIdAllocator, Walker, WalkerConfig,
};
