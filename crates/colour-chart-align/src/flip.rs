//! Flip determination from rectangle anchors.
//!
//! The clear-area patch sits above the densest patch on an upright chart,
//! and the densest patch sits left of the lightest one. The relative
//! positions of those anchors in the scan pin down the flip state as a
//! fixed four-case decision table.

use colour_chart_core::{DetectedRegion, Rect, RegionGrid, RECT_CLEAR_AREA};
use image::{imageops, Rgb32FImage};
use log::debug;

use crate::{AlignmentError, OrientationState};

const RECT_DENSITY_1000: &str = "rect_1000";
const RECT_DENSITY_500: &str = "rect_500";

/// Decide the flip state from the anchor rectangles.
///
/// Requires `rect_CA`, `rect_1000` and `rect_500` in `anchors`; exactly one
/// flip flag (or none) is set in the returned state, and the rotation angle
/// is left at zero for the later rotation estimate.
pub fn determine_flip(anchors: &RegionGrid) -> Result<OrientationState, AlignmentError> {
    let ca = anchor_rect(anchors, RECT_CLEAR_AREA)?;
    let d1000 = anchor_rect(anchors, RECT_DENSITY_1000)?;
    let d500 = anchor_rect(anchors, RECT_DENSITY_500)?;

    let densest_below_clear = d1000.y0 > ca.y0;
    let densest_right_of_lightest = d1000.x0 > d500.x0;

    let mut state = OrientationState::default();
    match (densest_below_clear, densest_right_of_lightest) {
        (true, true) => state.flip_horizontal = true,
        (false, false) => state.flip_vertical = true,
        (false, true) => state.flip_over = true,
        (true, false) => {}
    }
    debug!(
        "flip decision: horizontal={} vertical={} over={}",
        state.flip_horizontal, state.flip_vertical, state.flip_over
    );
    Ok(state)
}

/// Apply the recorded flip to an image. No-op copy when no flip is set.
pub fn flip_image(image: &Rgb32FImage, state: &OrientationState) -> Rgb32FImage {
    if state.flip_horizontal {
        imageops::flip_horizontal(image)
    } else if state.flip_vertical {
        imageops::flip_vertical(image)
    } else if state.flip_over {
        imageops::rotate180(image)
    } else {
        image.clone()
    }
}

fn anchor_rect(anchors: &RegionGrid, label: &str) -> Result<Rect, AlignmentError> {
    match anchors.get(label) {
        Some(DetectedRegion::Rect(r)) => Ok(*r),
        _ => Err(AlignmentError::MissingAnchor {
            label: label.to_string(),
        }),
    }
}
