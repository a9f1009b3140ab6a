//! Contour-based patch detection for colour-calibration charts.
//!
//! The chart carries a 4-column grid of circular colour patches plus a few
//! large rectangular reference patches. This crate turns binarized and
//! edge-detected planes into labelled [`RegionGrid`]s:
//!
//! - [`preprocess`]: threshold / blur+Canny planes from a grayscale image
//! - [`shapes`]: raw rectangle and circle candidates from contours
//! - [`resolve`]: dedup, rank and label candidates into the canonical grid
//!
//! An empty candidate set is not an error at this layer; callers decide
//! whether a short count is fatal and raise [`DetectionFailure`].

pub mod preprocess;
pub mod resolve;
pub mod shapes;

use colour_chart_core::Circle;

pub use resolve::{cluster_circles, resolve_circles, resolve_rectangles};
pub use shapes::{find_circles, find_rectangles, RectCandidate};

/// Fatal detection outcomes, with enough context to re-tune thresholds.
#[derive(thiserror::Error, Debug)]
pub enum DetectionFailure {
    #[error("no rectangle candidates with area above {min_area}")]
    NoRectangles { min_area: f64 },

    #[error("no circle candidates passed the circularity filter")]
    NoCircles,

    #[error("resolved {found} circle patches, expected {expected}")]
    CircleCount {
        found: usize,
        expected: usize,
        candidates: Vec<Circle>,
    },
}
