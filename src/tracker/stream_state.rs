/// Lifecycle state of one stream while the walker sweeps its timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    /// No open tracks; the next frame seeds new tracks without assignment
    #[default]
    NoOpenTracks,
    /// At least one track is waiting to be extended
    HasOpenTracks,
    /// Timeline done, every remaining track has been closed
    Exhausted,
}
