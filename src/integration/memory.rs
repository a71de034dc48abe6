//! In-memory candidate source with a linear-scan spatial neighbor search.

use std::collections::{BTreeMap, HashMap};

use nalgebra::distance;
use thiserror::Error;

use super::CandidateSource;
use crate::tracker::{
    CamId, Detection, DetectionId, FrameObject, ObjectKind, Timestamp, Track, TrackId,
};

/// Errors raised by [`InMemorySource`] lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemorySourceError {
    #[error("unknown detection id {0}")]
    UnknownDetection(DetectionId),
    #[error("unknown track id {0}")]
    UnknownTrack(TrackId),
    #[error("segment {0} has no observations")]
    EmptySegment(TrackId),
}

/// Keeps detections (and optionally track segments) in memory.
///
/// A source created with [`InMemorySource::new`] hands out detections; one
/// created with [`InMemorySource::with_segments`] hands out segments. Both
/// resolve track positions through the stored detections.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    kind: ObjectKind,
    detections: HashMap<DetectionId, Detection>,
    /// Detection ids per camera and frame, in insertion order
    frames: BTreeMap<CamId, BTreeMap<Timestamp, Vec<DetectionId>>>,
    segments: HashMap<TrackId, Track>,
    /// Segment ids per camera and first timestamp, in insertion order
    segment_starts: BTreeMap<CamId, BTreeMap<Timestamp, Vec<TrackId>>>,
}

impl Default for InMemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySource {
    /// Create an empty detection source.
    pub fn new() -> Self {
        Self {
            kind: ObjectKind::Detection,
            detections: HashMap::new(),
            frames: BTreeMap::new(),
            segments: HashMap::new(),
            segment_starts: BTreeMap::new(),
        }
    }

    /// Create an empty segment source.
    pub fn with_segments() -> Self {
        Self {
            kind: ObjectKind::Segment,
            ..Self::new()
        }
    }

    /// Register a frame so it is part of the camera's timeline even if empty.
    pub fn add_frame(&mut self, cam_id: CamId, timestamp: Timestamp) {
        self.frames
            .entry(cam_id)
            .or_default()
            .entry(timestamp)
            .or_default();
    }

    pub fn add_detection(&mut self, detection: Detection) {
        self.frames
            .entry(detection.cam_id)
            .or_default()
            .entry(detection.timestamp)
            .or_default()
            .push(detection.id);
        self.detections.insert(detection.id, detection);
    }

    pub fn extend_detections(&mut self, detections: impl IntoIterator<Item = Detection>) {
        for detection in detections {
            self.add_detection(detection);
        }
    }

    /// Store a segment together with its detections.
    ///
    /// The segment's camera is taken from its first detection.
    pub fn add_segment(&mut self, segment: Track) -> Result<(), MemorySourceError> {
        let first = segment
            .first_detection()
            .ok_or_else(|| MemorySourceError::EmptySegment(segment.id.clone()))?;
        let (cam_id, start) = (first.cam_id, first.timestamp);

        for detection in segment.detections() {
            if !self.detections.contains_key(&detection.id) {
                self.add_detection(detection.clone());
            }
        }
        self.segment_starts
            .entry(cam_id)
            .or_default()
            .entry(start)
            .or_default()
            .push(segment.id.clone());
        self.segments.insert(segment.id.clone(), segment);
        Ok(())
    }

    pub fn detection(&self, id: DetectionId) -> Option<&Detection> {
        self.detections.get(&id)
    }

    fn frame_ids(&self, cam_id: CamId, timestamp: Timestamp) -> &[DetectionId] {
        self.frames
            .get(&cam_id)
            .and_then(|frames| frames.get(&timestamp))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn segment_ids(&self, cam_id: CamId, timestamp: Timestamp) -> &[TrackId] {
        self.segment_starts
            .get(&cam_id)
            .and_then(|starts| starts.get(&timestamp))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn lookup_detection(&self, id: DetectionId) -> Result<&Detection, MemorySourceError> {
        self.detections
            .get(&id)
            .ok_or(MemorySourceError::UnknownDetection(id))
    }

    fn lookup_segment(&self, id: &TrackId) -> Result<&Track, MemorySourceError> {
        self.segments
            .get(id)
            .ok_or_else(|| MemorySourceError::UnknownTrack(id.clone()))
    }
}

impl CandidateSource for InMemorySource {
    type Error = MemorySourceError;

    fn kind(&self) -> ObjectKind {
        self.kind
    }

    fn cam_ids(&self) -> Result<Vec<CamId>, Self::Error> {
        Ok(self.frames.keys().copied().collect())
    }

    fn timestamps(&self, cam_id: CamId) -> Result<Vec<Timestamp>, Self::Error> {
        Ok(self
            .frames
            .get(&cam_id)
            .map(|frames| frames.keys().copied().collect())
            .unwrap_or_default())
    }

    fn frame_objects(
        &self,
        cam_id: CamId,
        timestamp: Timestamp,
    ) -> Result<Vec<Detection>, Self::Error> {
        self.detections_by_id(self.frame_ids(cam_id, timestamp))
    }

    fn segments_starting(
        &self,
        cam_id: CamId,
        timestamp: Timestamp,
    ) -> Result<Vec<Track>, Self::Error> {
        self.segments_by_id(self.segment_ids(cam_id, timestamp))
    }

    fn neighbors(
        &self,
        track: &Track,
        cam_id: CamId,
        radius: f64,
        timestamp: Timestamp,
    ) -> Result<Vec<FrameObject>, Self::Error> {
        let Some(&last_id) = track.ids.last() else {
            return Ok(Vec::new());
        };
        let origin = self.lookup_detection(last_id)?.position;

        let mut neighbors = Vec::new();
        match self.kind {
            ObjectKind::Detection => {
                for &id in self.frame_ids(cam_id, timestamp) {
                    let detection = self.lookup_detection(id)?;
                    if distance(&origin, &detection.position) <= radius {
                        neighbors.push(FrameObject::Detection(detection.clone()));
                    }
                }
            }
            ObjectKind::Segment => {
                for id in self.segment_ids(cam_id, timestamp) {
                    let segment = self.lookup_segment(id)?;
                    let Some(&first_id) = segment.ids.first() else {
                        continue;
                    };
                    let first = self.lookup_detection(first_id)?;
                    if distance(&origin, &first.position) <= radius {
                        neighbors.push(FrameObject::Segment(segment.clone()));
                    }
                }
            }
        }
        Ok(neighbors)
    }

    fn detections_by_id(&self, ids: &[DetectionId]) -> Result<Vec<Detection>, Self::Error> {
        ids.iter()
            .map(|&id| self.lookup_detection(id).cloned())
            .collect()
    }

    fn segments_by_id(&self, ids: &[TrackId]) -> Result<Vec<Track>, Self::Error> {
        ids.iter()
            .map(|id| self.lookup_segment(id).cloned())
            .collect()
    }
}
