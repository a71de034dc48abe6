//! Builder for creating Detection objects.

use nalgebra::Point2;

use crate::tracker::{CamId, Detection, DetectionId, Timestamp};

/// Builder for creating `Detection` objects.
#[derive(Debug, Clone, Default)]
pub struct DetectionBuilder {
    id: DetectionId,
    timestamp: Timestamp,
    cam_id: CamId,
    x: f64,
    y: f64,
    orientation: f64,
    bee_id: Vec<f64>,
}

impl DetectionBuilder {
    /// Create a new detection builder for the given detection id.
    pub fn new(id: DetectionId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn cam_id(mut self, cam_id: CamId) -> Self {
        self.cam_id = cam_id;
        self
    }

    /// Set the position in image coordinates.
    pub fn xy(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Set the orientation in radians.
    pub fn orientation(mut self, orientation: f64) -> Self {
        self.orientation = orientation;
        self
    }

    /// Set the per-bit id frequency distribution.
    pub fn bee_id(mut self, bee_id: impl Into<Vec<f64>>) -> Self {
        self.bee_id = bee_id.into();
        self
    }

    /// Set the id bits from an integer, most significant bit first.
    ///
    /// Bits above the 32 a `u32` holds are zero.
    pub fn bee_id_bits(mut self, value: u32, n_bits: usize) -> Self {
        self.bee_id = (0..n_bits)
            .rev()
            .map(|bit| {
                let shifted = u32::try_from(bit)
                    .ok()
                    .and_then(|bit| value.checked_shr(bit))
                    .unwrap_or(0);
                if shifted & 1 == 1 { 1.0 } else { 0.0 }
            })
            .collect();
        self
    }

    /// Build the final `Detection`.
    pub fn build(self) -> Detection {
        Detection {
            id: self.id,
            timestamp: self.timestamp,
            cam_id: self.cam_id,
            position: Point2::new(self.x, self.y),
            orientation: self.orientation,
            bee_id: self.bee_id,
        }
    }
}
