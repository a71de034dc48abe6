//! Track records and track identifier allocation.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::tracker::frame_object::{DetectionId, Timestamp};
use crate::tracker::Detection;

/// Metadata key under which a track keeps its raw detections.
pub const DETECTIONS_KEY: &str = "detections";

/// Unique identifier of a track: a counter value with an optional prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId {
    pub prefix: Option<String>,
    pub number: u64,
}

impl TrackId {
    pub fn new(number: u64) -> Self {
        Self {
            prefix: None,
            number,
        }
    }

    pub fn with_prefix(prefix: impl Into<String>, number: u64) -> Self {
        Self {
            prefix: Some(prefix.into()),
            number,
        }
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}{}", prefix, self.number),
            None => write!(f, "{}", self.number),
        }
    }
}

/// Hands out track identifiers.
///
/// The counter is atomic so one allocator can be shared (behind an `Arc`)
/// between walkers running on different threads. Walkers that run as
/// separate processes should use distinct prefixes instead.
#[derive(Debug, Default)]
pub struct TrackIdAllocator {
    prefix: Option<String>,
    counter: AtomicU64,
}

impl TrackIdAllocator {
    pub fn new(prefix: Option<String>) -> Self {
        Self {
            prefix,
            counter: AtomicU64::new(0),
        }
    }

    /// Get the next unique track ID.
    pub fn next_id(&self) -> TrackId {
        let number = self.counter.fetch_add(1, Ordering::SeqCst);
        TrackId {
            prefix: self.prefix.clone(),
            number,
        }
    }

    /// Number of identifiers handed out so far.
    pub fn issued(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }
}

/// Accumulated observations of one identity.
///
/// `ids` and `timestamps` are parallel and append-only. Every sequence in
/// `meta` is extended alongside them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    /// Detection ids in the order they were added
    pub ids: Vec<DetectionId>,
    /// Timestamp of each entry in `ids`
    pub timestamps: Vec<Timestamp>,
    /// Auxiliary sequences keyed by name, e.g. [`DETECTIONS_KEY`]
    pub meta: BTreeMap<String, Vec<Detection>>,
}

impl Track {
    /// Create a track of length one from a single detection.
    pub fn from_detection(id: TrackId, detection: Detection) -> Self {
        let mut meta = BTreeMap::new();
        let ids = vec![detection.id];
        let timestamps = vec![detection.timestamp];
        meta.insert(DETECTIONS_KEY.to_string(), vec![detection]);
        Self {
            id,
            ids,
            timestamps,
            meta,
        }
    }

    /// Promote a previously built segment to a new track under a fresh id.
    ///
    /// Only the observation data is carried over.
    pub fn promote(segment: Track, id: TrackId) -> Self {
        let Track {
            ids,
            timestamps,
            meta,
            ..
        } = segment;
        Self {
            id,
            ids,
            timestamps,
            meta,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<Timestamp> {
        self.timestamps.first().copied()
    }

    pub fn last_timestamp(&self) -> Option<Timestamp> {
        self.timestamps.last().copied()
    }

    pub fn detections(&self) -> &[Detection] {
        self.meta
            .get(DETECTIONS_KEY)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn first_detection(&self) -> Option<&Detection> {
        self.detections().first()
    }

    pub fn last_detection(&self) -> Option<&Detection> {
        self.detections().last()
    }

    /// Append a single detection observed at `timestamp`.
    pub fn push_detection(&mut self, detection: &Detection, timestamp: Timestamp) {
        self.ids.push(detection.id);
        self.timestamps.push(timestamp);
        if let Some(detections) = self.meta.get_mut(DETECTIONS_KEY) {
            detections.push(detection.clone());
        }
    }

    /// Splice a whole segment onto the end of this track.
    ///
    /// Metadata keys that this track does not own are ignored.
    pub fn splice(&mut self, segment: &Track) {
        self.ids.extend_from_slice(&segment.ids);
        self.timestamps.extend_from_slice(&segment.timestamps);
        for (key, values) in self.meta.iter_mut() {
            if let Some(other) = segment.meta.get(key) {
                values.extend(other.iter().cloned());
            }
        }
    }

    /// `ids`, `timestamps` and every metadata sequence have the same length.
    pub fn is_consistent(&self) -> bool {
        self.ids.len() == self.timestamps.len()
            && self.meta.values().all(|values| values.len() == self.ids.len())
    }
}
