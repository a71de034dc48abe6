//! The walker: sweeps each stream frame by frame and stitches candidates
//! onto waiting tracks with an optimal per-frame assignment.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::{debug, trace};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::TrackingError;
use crate::integration::{CandidateSource, CostFunction};
use crate::tracker::frame_object::{
    CamId, DetectionId, FrameObject, ObjectId, ObjectKind, Timestamp,
};
use crate::tracker::lifecycle::StreamLifecycle;
use crate::tracker::matching::{self, AssignmentResult};
use crate::tracker::stream_state::StreamState;
use crate::tracker::track::{Track, TrackId, TrackIdAllocator};

/// Configuration for the [`Walker`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkerConfig {
    /// Frames a track may go without a match before it is closed
    pub frame_diff: usize,
    /// Neighborhood radius in image coordinates
    pub radius: f64,
    /// Cost marking a pair that can never be assigned
    pub max_weight: f64,
    /// Costs at or above this are treated as `max_weight`
    pub prune_weight: f64,
    /// Minimum length of a segment to open a track of its own
    pub min_track_start_length: usize,
    /// Prefix for track ids, for unique ids over several walkers
    pub track_prefix: Option<String>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            frame_diff: 5,
            radius: 110.0,
            max_weight: 1000.0,
            prune_weight: 1000.0,
            min_track_start_length: 1,
            track_prefix: None,
        }
    }
}

impl WalkerConfig {
    pub fn with_frame_diff(mut self, frame_diff: usize) -> Self {
        self.frame_diff = frame_diff;
        self
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_max_weight(mut self, max_weight: f64) -> Self {
        self.max_weight = max_weight;
        self
    }

    pub fn with_prune_weight(mut self, prune_weight: f64) -> Self {
        self.prune_weight = prune_weight;
        self
    }

    pub fn with_min_track_start_length(mut self, min_track_start_length: usize) -> Self {
        self.min_track_start_length = min_track_start_length;
        self
    }

    pub fn with_track_prefix(mut self, track_prefix: impl Into<String>) -> Self {
        self.track_prefix = Some(track_prefix.into());
        self
    }

    pub fn validate(&self) -> Result<(), TrackingError> {
        if !self.radius.is_finite() || self.radius < 0.0 {
            return Err(TrackingError::InvalidConfig(format!(
                "radius must be finite and non-negative, got {}",
                self.radius
            )));
        }
        if !self.max_weight.is_finite() || self.max_weight <= 0.0 {
            return Err(TrackingError::InvalidConfig(format!(
                "max_weight must be finite and positive, got {}",
                self.max_weight
            )));
        }
        if !self.prune_weight.is_finite() || self.prune_weight <= 0.0 {
            return Err(TrackingError::InvalidConfig(format!(
                "prune_weight must be finite and positive, got {}",
                self.prune_weight
            )));
        }
        if self.min_track_start_length == 0 {
            return Err(TrackingError::InvalidConfig(
                "min_track_start_length must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Walks through the frames of a [`CandidateSource`] and merges frame
/// objects into longer tracks.
///
/// Each camera is walked on its own, one frame at a time with no jumps.
/// Detection sources produce tracks from single detections; segment sources
/// stitch previously built tracks together.
pub struct Walker<S, C> {
    source: S,
    score_fun: C,
    config: WalkerConfig,
    ids: Arc<TrackIdAllocator>,
    /// Segments already handed to a track, never considered again
    assigned_segments: HashSet<TrackId>,
}

impl<S, C> Walker<S, C>
where
    S: CandidateSource,
    C: CostFunction,
{
    /// Create a walker with its own id allocator using `config.track_prefix`.
    pub fn new(source: S, score_fun: C, config: WalkerConfig) -> Self {
        let ids = Arc::new(TrackIdAllocator::new(config.track_prefix.clone()));
        Self::with_id_allocator(source, score_fun, config, ids)
    }

    /// Create a walker that draws track ids from a shared allocator.
    pub fn with_id_allocator(
        source: S,
        score_fun: C,
        config: WalkerConfig,
        ids: Arc<TrackIdAllocator>,
    ) -> Self {
        Self {
            source,
            score_fun,
            config,
            ids,
            assigned_segments: HashSet::new(),
        }
    }

    /// Segments consumed so far, over every call to [`Self::calc_tracks`].
    pub fn assigned_segments(&self) -> &HashSet<TrackId> {
        &self.assigned_segments
    }

    /// Merge frame objects with `start <= timestamp < stop` into tracks.
    ///
    /// Returns the closed tracks of every camera, cameras in the order the
    /// source lists them.
    pub fn calc_tracks(
        &mut self,
        start: Option<Timestamp>,
        stop: Option<Timestamp>,
    ) -> Result<Vec<Track>, TrackingError> {
        self.config.validate()?;
        let kind = self.source.kind();

        let mut closed_tracks = Vec::new();
        for cam_id in self.source.cam_ids().map_err(TrackingError::from_source)? {
            let timestamps = self
                .source
                .timestamps(cam_id)
                .map_err(TrackingError::from_source)?;
            let mut stream = StreamLifecycle::new(cam_id, &timestamps);

            let mut frames = 0;
            for (time_idx, &timestamp) in timestamps.iter().enumerate() {
                // not within time range (yet)
                if start.is_some_and(|start| timestamp < start) {
                    continue;
                }
                // out of time range (now)
                if stop.is_some_and(|stop| timestamp >= stop) {
                    break;
                }
                self.calc_timestep(kind, &mut stream, time_idx, timestamp)?;
                frames += 1;
            }

            stream.exhaust();
            let closed = stream.into_closed();
            debug!(
                "camera {}: walked {} frames, {} tracks",
                cam_id,
                frames,
                closed.len()
            );
            closed_tracks.extend(closed);
        }
        Ok(closed_tracks)
    }

    fn calc_timestep(
        &mut self,
        kind: ObjectKind,
        stream: &mut StreamLifecycle<'_>,
        time_idx: usize,
        timestamp: Timestamp,
    ) -> Result<(), TrackingError> {
        let cam_id = stream.cam_id();
        let frame_objects = self.frame_objects(kind, cam_id, timestamp)?;

        // no waiting tracks so load all from current frame
        if stream.state() == StreamState::NoOpenTracks {
            self.mark_assigned(&frame_objects);
            let opened = stream.initialize(
                frame_objects,
                time_idx,
                kind,
                self.config.min_track_start_length,
                &self.ids,
            )?;
            trace!(
                "camera {} t={}: opened {} tracks on empty waiting list",
                cam_id, timestamp, opened
            );
            return Ok(());
        }

        let stale = stream.close_stale(time_idx, self.config.frame_diff);
        let left_over = self.calc_assign(stream, time_idx, timestamp, &frame_objects)?;
        let extended = frame_objects.len() - left_over.len();

        let unassigned: Vec<ObjectId> = left_over
            .into_iter()
            .map(|col| frame_objects[col].id())
            .collect();
        self.mark_assigned(&frame_objects);
        let candidates = self.lookup(kind, &unassigned)?;
        let opened = stream.initialize(
            candidates,
            time_idx,
            kind,
            self.config.min_track_start_length,
            &self.ids,
        )?;

        trace!(
            "camera {} t={}: closed {}, extended {}, opened {}, waiting {}",
            cam_id,
            timestamp,
            stale.len(),
            extended,
            opened,
            stream.waiting().len()
        );
        Ok(())
    }

    /// Frame objects of the current frame, minus already consumed segments.
    fn frame_objects(
        &self,
        kind: ObjectKind,
        cam_id: CamId,
        timestamp: Timestamp,
    ) -> Result<Vec<FrameObject>, TrackingError> {
        let objects = match kind {
            ObjectKind::Detection => self
                .source
                .frame_objects(cam_id, timestamp)
                .map_err(TrackingError::from_source)?
                .into_iter()
                .map(FrameObject::Detection)
                .collect(),
            ObjectKind::Segment => self
                .source
                .segments_starting(cam_id, timestamp)
                .map_err(TrackingError::from_source)?
                .into_iter()
                .filter(|segment| !self.assigned_segments.contains(&segment.id))
                .map(FrameObject::Segment)
                .collect(),
        };
        Ok(objects)
    }

    fn mark_assigned(&mut self, frame_objects: &[FrameObject]) {
        for object in frame_objects {
            if let FrameObject::Segment(segment) = object {
                self.assigned_segments.insert(segment.id.clone());
            }
        }
    }

    /// Materialize unassigned frame objects by id.
    fn lookup(
        &self,
        kind: ObjectKind,
        ids: &[ObjectId],
    ) -> Result<Vec<FrameObject>, TrackingError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let objects = match kind {
            ObjectKind::Detection => {
                let ids: Vec<DetectionId> = ids
                    .iter()
                    .map(|id| match id {
                        ObjectId::Detection(id) => Ok(*id),
                        ObjectId::Segment(_) => Err(TrackingError::UnexpectedObjectKind {
                            expected: kind,
                            found: ObjectKind::Segment,
                        }),
                    })
                    .collect::<Result<_, _>>()?;
                self.source
                    .detections_by_id(&ids)
                    .map_err(TrackingError::from_source)?
                    .into_iter()
                    .map(FrameObject::Detection)
                    .collect()
            }
            ObjectKind::Segment => {
                let ids: Vec<TrackId> = ids
                    .iter()
                    .map(|id| match id {
                        ObjectId::Segment(id) => Ok(id.clone()),
                        ObjectId::Detection(_) => Err(TrackingError::UnexpectedObjectKind {
                            expected: kind,
                            found: ObjectKind::Detection,
                        }),
                    })
                    .collect::<Result<_, _>>()?;
                self.source
                    .segments_by_id(&ids)
                    .map_err(TrackingError::from_source)?
                    .into_iter()
                    .map(FrameObject::Segment)
                    .collect()
            }
        };
        Ok(objects)
    }

    /// Assign frame objects to waiting tracks.
    ///
    /// Returns the columns of the frame objects that extended no track, in
    /// frame order.
    fn calc_assign(
        &self,
        stream: &mut StreamLifecycle<'_>,
        time_idx: usize,
        timestamp: Timestamp,
        frame_objects: &[FrameObject],
    ) -> Result<Vec<usize>, TrackingError> {
        if frame_objects.is_empty() {
            return Ok(Vec::new());
        }

        let mut cost_matrix = self.make_claims(stream, time_idx, timestamp, frame_objects)?;
        let AssignmentResult {
            matches,
            mut unmatched_cols,
        } = matching::resolve_claims(
            &mut cost_matrix,
            self.config.prune_weight,
            self.config.max_weight,
        )?;

        for (row, col) in matches {
            // do not add if cost is too high
            if cost_matrix[[row, col]] >= self.config.max_weight {
                unmatched_cols.push(col);
                continue;
            }
            stream.extend(row, &frame_objects[col], time_idx, timestamp)?;
        }
        unmatched_cols.sort_unstable();
        Ok(unmatched_cols)
    }

    /// Build the waiting (rows) by frame object (cols) cost matrix.
    ///
    /// Cells without a neighbor relation keep `max_weight`. The cost function
    /// is called once with every claimed pair.
    pub fn make_claims(
        &self,
        stream: &StreamLifecycle<'_>,
        time_idx: usize,
        timestamp: Timestamp,
        frame_objects: &[FrameObject],
    ) -> Result<Array2<f64>, TrackingError> {
        let columns: HashMap<ObjectId, usize> = frame_objects
            .iter()
            .enumerate()
            .map(|(col, object)| (object.id(), col))
            .collect();

        let mut cells = Vec::new();
        let mut tracks = Vec::new();
        let mut candidates = Vec::new();
        for (row, entry) in stream.waiting().iter().enumerate() {
            // already extended up to or past this frame
            if entry.last_update >= time_idx {
                continue;
            }
            let track = stream.track(entry.track);
            let neighbors = self
                .source
                .neighbors(track, stream.cam_id(), self.config.radius, timestamp)
                .map_err(TrackingError::from_source)?;

            for neighbor in neighbors {
                let Some(&col) = columns.get(&neighbor.id()) else {
                    trace!(
                        "track {}: neighbor {:?} is not a candidate of this frame",
                        track.id,
                        neighbor.id()
                    );
                    continue;
                };
                cells.push((row, col));
                tracks.push(track);
                candidates.push(&frame_objects[col]);
            }
        }

        let mut cost_matrix = Array2::from_elem(
            (stream.waiting().len(), frame_objects.len()),
            self.config.max_weight,
        );
        if cells.is_empty() {
            return Ok(cost_matrix);
        }

        let scores = self.score_fun.score(&tracks, &candidates)?;
        if scores.len() != cells.len() {
            return Err(TrackingError::LengthMismatch {
                context: "cost function result",
                left: scores.len(),
                right: cells.len(),
            });
        }
        for (&(row, col), &score) in cells.iter().zip(scores.iter()) {
            cost_matrix[[row, col]] = score;
        }
        Ok(cost_matrix)
    }
}
