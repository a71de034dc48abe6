//! Track lifecycle for one stream: creation, extension and closing.
//!
//! Tracks live in an arena owned by [`StreamLifecycle`]; waiting entries and
//! the closed list refer to them by [`TrackHandle`], so splicing a segment
//! onto a track never aliases track state.

use log::trace;

use crate::error::TrackingError;
use crate::tracker::frame_object::{CamId, FrameObject, ObjectKind, Timestamp};
use crate::tracker::stream_state::StreamState;
use crate::tracker::track::{Track, TrackIdAllocator};

/// Index of a track in the stream's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackHandle(usize);

/// An open track plus the time index of its most recent extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitingEntry {
    pub last_update: usize,
    pub track: TrackHandle,
}

/// Open and closed tracks of one stream.
#[derive(Debug)]
pub struct StreamLifecycle<'t> {
    cam_id: CamId,
    timestamps: &'t [Timestamp],
    arena: Vec<Track>,
    waiting: Vec<WaitingEntry>,
    closed: Vec<TrackHandle>,
    exhausted: bool,
}

impl<'t> StreamLifecycle<'t> {
    /// `timestamps` is the stream's full timeline in ascending order.
    pub fn new(cam_id: CamId, timestamps: &'t [Timestamp]) -> Self {
        Self {
            cam_id,
            timestamps,
            arena: Vec::new(),
            waiting: Vec::new(),
            closed: Vec::new(),
            exhausted: false,
        }
    }

    pub fn cam_id(&self) -> CamId {
        self.cam_id
    }

    pub fn state(&self) -> StreamState {
        if self.exhausted {
            StreamState::Exhausted
        } else if self.waiting.is_empty() {
            StreamState::NoOpenTracks
        } else {
            StreamState::HasOpenTracks
        }
    }

    pub fn waiting(&self) -> &[WaitingEntry] {
        &self.waiting
    }

    pub fn closed(&self) -> &[TrackHandle] {
        &self.closed
    }

    pub fn track(&self, handle: TrackHandle) -> &Track {
        &self.arena[handle.0]
    }

    /// Position of `timestamp` in the stream's timeline.
    pub fn time_index_of(&self, timestamp: Timestamp) -> Result<usize, TrackingError> {
        self.timestamps
            .binary_search(&timestamp)
            .map_err(|_| TrackingError::UnknownTimestamp {
                timestamp,
                cam_id: self.cam_id,
            })
    }

    /// Time index a candidate leaves its track at after being added.
    fn resume_index(&self, object: &FrameObject, time_idx: usize) -> Result<usize, TrackingError> {
        match (object.kind(), object.last_timestamp()) {
            (ObjectKind::Segment, Some(last)) => self.time_index_of(last),
            _ => Ok(time_idx),
        }
    }

    /// Open new tracks for unmatched candidates of the current frame.
    ///
    /// Detections always start a track at `time_idx`. Segments start a track
    /// only when they are at least `min_track_start_length` long and wait at
    /// the index of their own last timestamp. Returns the number of tracks
    /// opened.
    pub fn initialize(
        &mut self,
        candidates: Vec<FrameObject>,
        time_idx: usize,
        expected: ObjectKind,
        min_track_start_length: usize,
        ids: &TrackIdAllocator,
    ) -> Result<usize, TrackingError> {
        let mut opened = 0;
        for candidate in candidates {
            if candidate.kind() != expected {
                return Err(TrackingError::UnexpectedObjectKind {
                    expected,
                    found: candidate.kind(),
                });
            }

            if let FrameObject::Segment(segment) = &candidate {
                if segment.len() < min_track_start_length {
                    trace!(
                        "segment {} too short to start a track ({} < {})",
                        segment.id,
                        segment.len(),
                        min_track_start_length
                    );
                    continue;
                }
            }

            let last_update = self.resume_index(&candidate, time_idx)?;
            let track = match candidate {
                FrameObject::Detection(detection) => {
                    Track::from_detection(ids.next_id(), detection)
                }
                FrameObject::Segment(segment) => Track::promote(segment, ids.next_id()),
            };

            let handle = TrackHandle(self.arena.len());
            self.arena.push(track);
            self.waiting.push(WaitingEntry {
                last_update,
                track: handle,
            });
            opened += 1;
        }
        Ok(opened)
    }

    /// Close every waiting track last updated more than `frame_diff` frames
    /// before `time_idx`.
    ///
    /// Returns the handles closed by this call.
    pub fn close_stale(&mut self, time_idx: usize, frame_diff: usize) -> Vec<TrackHandle> {
        let mut newly_closed = Vec::new();
        self.waiting.retain(|entry| {
            if time_idx.saturating_sub(entry.last_update) > frame_diff {
                newly_closed.push(entry.track);
                false
            } else {
                true
            }
        });
        self.closed.extend_from_slice(&newly_closed);
        newly_closed
    }

    /// Extend the track of waiting entry `row` with `object`.
    ///
    /// A detection is recorded at `timestamp`; a segment is spliced in
    /// wholesale and the entry jumps to the index of its last timestamp.
    pub fn extend(
        &mut self,
        row: usize,
        object: &FrameObject,
        time_idx: usize,
        timestamp: Timestamp,
    ) -> Result<(), TrackingError> {
        let last_update = self.resume_index(object, time_idx)?;
        let entry = &mut self.waiting[row];
        entry.last_update = last_update;

        let track = &mut self.arena[entry.track.0];
        match object {
            FrameObject::Detection(detection) => track.push_detection(detection, timestamp),
            FrameObject::Segment(segment) => track.splice(segment),
        }
        Ok(())
    }

    /// Move every remaining waiting track to the closed list.
    pub fn exhaust(&mut self) {
        self.closed.extend(self.waiting.drain(..).map(|entry| entry.track));
        self.exhausted = true;
    }

    /// Closed tracks in the order they were closed.
    ///
    /// Tracks still waiting are not included; call [`Self::exhaust`] first.
    pub fn into_closed(self) -> Vec<Track> {
        let mut slots: Vec<Option<Track>> = self.arena.into_iter().map(Some).collect();
        self.closed
            .into_iter()
            .filter_map(|handle| slots[handle.0].take())
            .collect()
    }
}
