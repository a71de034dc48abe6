//! Ready-made cost functions.
//!
//! Each compares the last detection of a track with the first detection of a
//! candidate, so they work for both detections and segments.

use std::f64::consts::PI;

use nalgebra::distance;
use ndarray::Array1;

use crate::error::TrackingError;
use crate::integration::{CostFunction, check_batch};
use crate::tracker::{Detection, FrameObject, Track};

/// Angular distance between two orientations in degrees, in `[0, 180]`.
pub fn distance_orientations(rad1: f64, rad2: f64) -> f64 {
    let distance = (rad1.to_degrees() - rad2.to_degrees()).abs() % 360.0;
    if distance > 180.0 {
        360.0 - distance
    } else {
        distance
    }
}

/// Manhattan distance between two id bit distributions.
pub fn id_distance(id1: &[f64], id2: &[f64]) -> Result<f64, TrackingError> {
    if id1.len() != id2.len() {
        return Err(TrackingError::LengthMismatch {
            context: "id bits",
            left: id1.len(),
            right: id2.len(),
        });
    }
    Ok(id1.iter().zip(id2).map(|(a, b)| (a - b).abs()).sum())
}

fn endpoints<'a>(
    track: &'a Track,
    candidate: &'a FrameObject,
) -> Result<(&'a Detection, &'a Detection), TrackingError> {
    let last = track
        .last_detection()
        .ok_or_else(|| TrackingError::MissingDetections(track.id.clone()))?;
    let first = match candidate {
        FrameObject::Detection(detection) => detection,
        FrameObject::Segment(segment) => segment
            .first_detection()
            .ok_or_else(|| TrackingError::MissingDetections(segment.id.clone()))?,
    };
    Ok((last, first))
}

fn score_pairs<F>(
    tracks: &[&Track],
    candidates: &[&FrameObject],
    pair_score: F,
) -> Result<Array1<f64>, TrackingError>
where
    F: Fn(&Detection, &Detection) -> Result<f64, TrackingError>,
{
    check_batch(tracks, candidates)?;
    let scores = tracks
        .iter()
        .zip(candidates)
        .map(|(track, candidate)| {
            let (last, first) = endpoints(track, candidate)?;
            pair_score(last, first)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Array1::from(scores))
}

/// Manhattan distance between the id bit distributions.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdDistance;

impl CostFunction for IdDistance {
    fn score(
        &self,
        tracks: &[&Track],
        candidates: &[&FrameObject],
    ) -> Result<Array1<f64>, TrackingError> {
        score_pairs(tracks, candidates, |a, b| id_distance(&a.bee_id, &b.bee_id))
    }
}

/// Id distance with a bonus for detections facing the same way.
///
/// When the orientations differ by at most `range_bonus` radians the score
/// drops by `value_bonus / n_bits`, never below zero.
#[derive(Debug, Clone, Copy)]
pub struct IdOrientationDistance {
    pub range_bonus: f64,
    pub value_bonus: f64,
}

impl Default for IdOrientationDistance {
    fn default() -> Self {
        Self {
            range_bonus: PI / 6.0,
            value_bonus: 1.0,
        }
    }
}

impl CostFunction for IdOrientationDistance {
    fn score(
        &self,
        tracks: &[&Track],
        candidates: &[&FrameObject],
    ) -> Result<Array1<f64>, TrackingError> {
        score_pairs(tracks, candidates, |a, b| {
            let score = id_distance(&a.bee_id, &b.bee_id)?;
            let angle = distance_orientations(a.orientation, b.orientation);
            if a.bee_id.is_empty() || angle > self.range_bonus.to_degrees() {
                return Ok(score);
            }
            Ok((score - self.value_bonus / a.bee_id.len() as f64).max(0.0))
        })
    }
}

/// Id distance that tolerates a misread rotation of the tag.
///
/// The candidate's bits are rotated up to half the id length in both
/// directions; each step of rotation costs `rotation_penalty`.
#[derive(Debug, Clone, Copy)]
pub struct RotatingIdDistance {
    pub rotation_penalty: f64,
}

impl Default for RotatingIdDistance {
    fn default() -> Self {
        Self {
            rotation_penalty: 0.5,
        }
    }
}

impl RotatingIdDistance {
    fn best(&self, id1: &[f64], id2: &[f64]) -> Result<f64, TrackingError> {
        let mut best = id_distance(id1, id2)?;
        let n = id2.len();
        for shift in 1..=n.div_ceil(2) {
            let penalty = shift as f64 * self.rotation_penalty;
            if penalty >= best {
                break;
            }
            let mut left = id2.to_vec();
            left.rotate_left(shift % n);
            let mut right = id2.to_vec();
            right.rotate_right(shift % n);
            best = best
                .min(id_distance(id1, &left)? + penalty)
                .min(id_distance(id1, &right)? + penalty);
        }
        Ok(best)
    }
}

impl CostFunction for RotatingIdDistance {
    fn score(
        &self,
        tracks: &[&Track],
        candidates: &[&FrameObject],
    ) -> Result<Array1<f64>, TrackingError> {
        score_pairs(tracks, candidates, |a, b| self.best(&a.bee_id, &b.bee_id))
    }
}

/// Euclidean distance between the positions.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionDistance;

impl CostFunction for PositionDistance {
    fn score(
        &self,
        tracks: &[&Track],
        candidates: &[&FrameObject],
    ) -> Result<Array1<f64>, TrackingError> {
        score_pairs(tracks, candidates, |a, b| {
            Ok(distance(&a.position, &b.position))
        })
    }
}
