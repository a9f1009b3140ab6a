//! Forward and inverse coordinate transforms between the raw scan frame and
//! the corrected (flipped + rotated) frame.
//!
//! Forward order is flip first, rotation second, matching the image
//! pipeline. The inverse therefore unwinds the rotation first and the flip
//! second; the two do not commute. Rectangles are transformed as corner
//! pairs without renormalization so that a forward-then-inverse round trip
//! is exact up to floating-point error.

use colour_chart_core::{Circle, DetectedRegion, Rect, RegionGrid};

use crate::OrientationState;

/// Map a region grid from raw-scan coordinates into the corrected frame:
/// flip, then rotate by `-rotation_angle_degrees` about the image center.
pub fn transform_to_upright(
    grid: &RegionGrid,
    width: f64,
    height: f64,
    state: &OrientationState,
) -> RegionGrid {
    let theta = (-state.rotation_angle_degrees).to_radians();
    grid.map_regions(|region| {
        let flipped = flip_region(region, width, height, state);
        rotate_region(&flipped, width, height, theta)
    })
}

/// Map a region grid computed in the corrected frame back into raw-scan
/// coordinates: rotate by `+rotation_angle_degrees`, then undo the flip.
///
/// Exact inverse of [`transform_to_upright`].
pub fn restore_original(
    grid: &RegionGrid,
    width: f64,
    height: f64,
    state: &OrientationState,
) -> RegionGrid {
    let theta = state.rotation_angle_degrees.to_radians();
    grid.map_regions(|region| {
        let unrotated = rotate_region(region, width, height, theta);
        flip_region(&unrotated, width, height, state)
    })
}

/// Rotate a point about `(cx, cy)` by `theta` radians (y-down screen frame).
fn rotate_point(x: f64, y: f64, cx: f64, cy: f64, theta: f64) -> (f64, f64) {
    let (dx, dy) = (x - cx, y - cy);
    let (sin, cos) = theta.sin_cos();
    (dx * cos - dy * sin + cx, dx * sin + dy * cos + cy)
}

fn rotate_region(region: &DetectedRegion, width: f64, height: f64, theta: f64) -> DetectedRegion {
    let (cx, cy) = (width / 2.0, height / 2.0);
    match *region {
        DetectedRegion::Circle(c) => {
            let (x, y) = rotate_point(c.cx, c.cy, cx, cy, theta);
            DetectedRegion::Circle(Circle {
                cx: x,
                cy: y,
                radius: c.radius,
            })
        }
        DetectedRegion::Rect(r) => {
            let (x0, y0) = rotate_point(r.x0, r.y0, cx, cy, theta);
            let (x1, y1) = rotate_point(r.x1, r.y1, cx, cy, theta);
            DetectedRegion::Rect(Rect { y0, y1, x0, x1 })
        }
    }
}

/// The recorded flip as a coordinate map. All three cases are involutions,
/// so the same map serves forward and inverse directions.
fn flip_region(
    region: &DetectedRegion,
    width: f64,
    height: f64,
    state: &OrientationState,
) -> DetectedRegion {
    let map = |x: f64, y: f64| -> (f64, f64) {
        if state.flip_horizontal {
            (width - x, y)
        } else if state.flip_vertical {
            (x, height - y)
        } else if state.flip_over {
            (width - x, height - y)
        } else {
            (x, y)
        }
    };

    match *region {
        DetectedRegion::Circle(c) => {
            let (x, y) = map(c.cx, c.cy);
            DetectedRegion::Circle(Circle {
                cx: x,
                cy: y,
                radius: c.radius,
            })
        }
        DetectedRegion::Rect(r) => {
            let (x0, y0) = map(r.x0, r.y0);
            let (x1, y1) = map(r.x1, r.y1);
            DetectedRegion::Rect(Rect { y0, y1, x0, x1 })
        }
    }
}
