mod frame_object;
mod lifecycle;
mod matching;
mod stream_state;
mod track;
mod walker;

pub use frame_object::{
    CamId, Detection, DetectionId, FrameObject, ObjectId, ObjectKind, Timestamp,
};
pub use lifecycle::{StreamLifecycle, TrackHandle, WaitingEntry};
pub use matching::{AssignmentResult, linear_assignment, prune_costs, resolve_claims};
pub use stream_state::StreamState;
pub use track::{DETECTIONS_KEY, Track, TrackId, TrackIdAllocator};
pub use walker::{Walker, WalkerConfig};
