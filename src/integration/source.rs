//! Trait for the storage layer the walker pulls candidates from.

use crate::tracker::{
    CamId, Detection, DetectionId, FrameObject, ObjectKind, Timestamp, Track, TrackId,
};

/// Supplies timelines, frame objects and neighbor queries to the walker.
///
/// Implement this trait to walk over any detection store.
///
/// # Example
///
/// ```ignore
/// use trackwalker::{CamId, CandidateSource, ObjectKind};
///
/// struct MyStore {
///     // Your database handle here
/// }
///
/// impl CandidateSource for MyStore {
///     type Error = std::io::Error;
///
///     fn kind(&self) -> ObjectKind {
///         ObjectKind::Detection
///     }
///
///     fn cam_ids(&self) -> Result<Vec<CamId>, Self::Error> {
///         Ok(vec![0, 1, 2, 3])
///     }
///
///     // ...
/// }
/// ```
pub trait CandidateSource {
    /// Error type for failed queries.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Kind of the frame objects this source hands out.
    ///
    /// Detection sources are walked in detection mode, segment sources in
    /// segment mode.
    fn kind(&self) -> ObjectKind;

    /// Independent streams, e.g. one per camera.
    fn cam_ids(&self) -> Result<Vec<CamId>, Self::Error>;

    /// Timestamps of a stream in ascending order.
    fn timestamps(&self, cam_id: CamId) -> Result<Vec<Timestamp>, Self::Error>;

    /// Detections present in a frame.
    fn frame_objects(
        &self,
        cam_id: CamId,
        timestamp: Timestamp,
    ) -> Result<Vec<Detection>, Self::Error>;

    /// Track segments whose first observation lies in a frame.
    fn segments_starting(
        &self,
        cam_id: CamId,
        timestamp: Timestamp,
    ) -> Result<Vec<Track>, Self::Error>;

    /// Candidates at `timestamp` within `radius` of the end of `track`.
    fn neighbors(
        &self,
        track: &Track,
        cam_id: CamId,
        radius: f64,
        timestamp: Timestamp,
    ) -> Result<Vec<FrameObject>, Self::Error>;

    /// Detections by id, in the order requested.
    fn detections_by_id(&self, ids: &[DetectionId]) -> Result<Vec<Detection>, Self::Error>;

    /// Segments by id, in the order requested.
    fn segments_by_id(&self, ids: &[TrackId]) -> Result<Vec<Track>, Self::Error>;
}
