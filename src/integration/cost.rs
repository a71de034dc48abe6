//! Trait for the scoring functions that fill the walker's cost matrix.

use ndarray::Array1;

use crate::error::TrackingError;
use crate::tracker::{FrameObject, Track};

/// Scores a batch of `(track, candidate)` pairs.
///
/// `tracks[i]` is compared to `candidates[i]`; the result holds one
/// non-negative score per pair, lower meaning more compatible. The walker
/// calls this once per frame with every pair that passed the neighbor query.
pub trait CostFunction {
    fn score(
        &self,
        tracks: &[&Track],
        candidates: &[&FrameObject],
    ) -> Result<Array1<f64>, TrackingError>;
}

impl<C: CostFunction + ?Sized> CostFunction for &C {
    fn score(
        &self,
        tracks: &[&Track],
        candidates: &[&FrameObject],
    ) -> Result<Array1<f64>, TrackingError> {
        (**self).score(tracks, candidates)
    }
}

impl<C: CostFunction + ?Sized> CostFunction for Box<C> {
    fn score(
        &self,
        tracks: &[&Track],
        candidates: &[&FrameObject],
    ) -> Result<Array1<f64>, TrackingError> {
        (**self).score(tracks, candidates)
    }
}

/// Fail with [`TrackingError::LengthMismatch`] unless both batches are parallel.
pub fn check_batch(tracks: &[&Track], candidates: &[&FrameObject]) -> Result<(), TrackingError> {
    if tracks.len() != candidates.len() {
        return Err(TrackingError::LengthMismatch {
            context: "cost function batch",
            left: tracks.len(),
            right: candidates.len(),
        });
    }
    Ok(())
}

/// Adapter turning a closure into a [`CostFunction`].
///
/// The batch lengths are checked before the closure runs.
pub struct ScoreFn<F>(F);

impl<F> ScoreFn<F>
where
    F: Fn(&[&Track], &[&FrameObject]) -> Array1<f64>,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> CostFunction for ScoreFn<F>
where
    F: Fn(&[&Track], &[&FrameObject]) -> Array1<f64>,
{
    fn score(
        &self,
        tracks: &[&Track],
        candidates: &[&FrameObject],
    ) -> Result<Array1<f64>, TrackingError> {
        check_batch(tracks, candidates)?;
        Ok((self.0)(tracks, candidates))
    }
}
