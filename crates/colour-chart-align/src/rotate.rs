//! Rotation estimation and correction.
//!
//! The chart's rectangle edges produce strong near-horizontal lines. A
//! Hough transform over the edge plane finds them; lines whose normal angle
//! is within a small window of pi/2 (or 3*pi/2) vote for the tilt, and the
//! rotation angle is `90 deg - mean(theta)`. Anything else on the slide is
//! ignored by the angular window.

use image::{GrayImage, Rgb, Rgb32FImage};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use imageproc::hough::{detect_lines, LineDetectionOptions};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::AlignmentError;

/// Parameters for the Hough-based rotation estimate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RotationParams {
    /// Minimum accumulator votes for a detected line.
    pub vote_threshold: u32,
    /// Non-maximum suppression radius in the Hough accumulator.
    pub suppression_radius: u32,
    /// Half-width of the accepted window around pi/2, in radians.
    pub angular_window_rad: f64,
}

impl Default for RotationParams {
    fn default() -> Self {
        Self {
            vote_threshold: 200,
            suppression_radius: 8,
            angular_window_rad: 0.1,
        }
    }
}

/// Estimate the tilt of the (already flipped) scan from its edge plane.
///
/// Returns the rotation angle in degrees. Fails with
/// [`AlignmentError::OrientationUndetermined`] when no line qualifies; the
/// angle is never silently defaulted to zero.
pub fn estimate_rotation(edges: &GrayImage, params: &RotationParams) -> Result<f64, AlignmentError> {
    let lines = detect_lines(
        edges,
        LineDetectionOptions {
            vote_threshold: params.vote_threshold,
            suppression_radius: params.suppression_radius,
        },
    );

    let window_deg = params.angular_window_rad.to_degrees();
    let thetas: Vec<f64> = lines
        .iter()
        .map(|line| line.angle_in_degrees as f64)
        .filter(|deg| (deg - 90.0).abs() < window_deg || (deg - 270.0).abs() < window_deg)
        .collect();

    if thetas.is_empty() {
        return Err(AlignmentError::OrientationUndetermined {
            lines_considered: lines.len(),
        });
    }

    let mean_theta = thetas.iter().sum::<f64>() / thetas.len() as f64;
    let angle = 90.0 - mean_theta;
    debug!(
        "rotation estimate: {angle:.3} deg from {} of {} lines",
        thetas.len(),
        lines.len()
    );
    Ok(angle)
}

/// Rotate the image content by `-angle_degrees` about its center, producing
/// the upright frame. Exposed pixels are filled with black.
pub fn rotate_upright(image: &Rgb32FImage, angle_degrees: f64) -> Rgb32FImage {
    rotate_about_center(
        image,
        (-angle_degrees).to_radians() as f32,
        Interpolation::Bilinear,
        Rgb([0.0f32, 0.0, 0.0]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::Luma;

    fn horizontal_stripes(width: u32, height: u32, rows: &[u32]) -> GrayImage {
        let mut img = GrayImage::new(width, height);
        for &row in rows {
            for x in 0..width {
                img.put_pixel(x, row, Luma([255]));
            }
        }
        img
    }

    #[test]
    fn horizontal_lines_give_zero_rotation() {
        let edges = horizontal_stripes(400, 300, &[60, 150, 240]);
        let params = RotationParams {
            vote_threshold: 300,
            ..Default::default()
        };
        let angle = estimate_rotation(&edges, &params).expect("lines present");
        assert_relative_eq!(angle, 0.0, epsilon = 1.0);
    }

    #[test]
    fn empty_edge_plane_is_undetermined() {
        let edges = GrayImage::new(200, 200);
        match estimate_rotation(&edges, &RotationParams::default()) {
            Err(AlignmentError::OrientationUndetermined { lines_considered }) => {
                assert_eq!(lines_considered, 0)
            }
            other => panic!("expected OrientationUndetermined, got {other:?}"),
        }
    }

    #[test]
    fn vertical_lines_do_not_qualify() {
        // Vertical stripes have horizontal normals (theta ~ 0), outside the window.
        let mut edges = GrayImage::new(300, 400);
        for &col in &[80u32, 160, 240] {
            for y in 0..400 {
                edges.put_pixel(col, y, Luma([255]));
            }
        }
        let params = RotationParams {
            vote_threshold: 300,
            ..Default::default()
        };
        assert!(matches!(
            estimate_rotation(&edges, &params),
            Err(AlignmentError::OrientationUndetermined { .. })
        ));
    }

    #[test]
    fn rotate_upright_preserves_dimensions() {
        let img = Rgb32FImage::from_pixel(64, 48, Rgb([0.5, 0.5, 0.5]));
        let rotated = rotate_upright(&img, 5.0);
        assert_eq!(rotated.dimensions(), (64, 48));
    }
}
