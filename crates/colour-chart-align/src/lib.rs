//! Scan orientation correction.
//!
//! A slide can land on the scanner bed mirrored, upside down, or slightly
//! rotated. This crate determines the flip state from two rectangle
//! anchors, estimates the residual rotation from near-horizontal Hough
//! lines, applies both to the image, and provides the exact inverse
//! coordinate transform so regions detected in the corrected frame can be
//! reported in raw-scan coordinates.

mod flip;
mod inverse;
mod rotate;

use serde::{Deserialize, Serialize};

pub use flip::{determine_flip, flip_image};
pub use inverse::{restore_original, transform_to_upright};
pub use rotate::{estimate_rotation, rotate_upright, RotationParams};

/// The physical orientation of a scanned slide.
///
/// At most one of the three flip flags is set; `rotation_angle_degrees` is
/// the residual tilt measured after flipping. Determined once per image and
/// immutable afterwards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OrientationState {
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub flip_over: bool,
    pub rotation_angle_degrees: f64,
}

impl OrientationState {
    /// True when any flip flag is set.
    #[inline]
    pub fn is_flipped(&self) -> bool {
        self.flip_horizontal || self.flip_vertical || self.flip_over
    }
}

/// Errors from orientation determination.
#[derive(thiserror::Error, Debug)]
pub enum AlignmentError {
    #[error("anchor rectangle {label:?} missing from the detected grid")]
    MissingAnchor { label: String },

    #[error("orientation undetermined: no near-horizontal lines among {lines_considered} detected")]
    OrientationUndetermined { lines_considered: usize },
}
