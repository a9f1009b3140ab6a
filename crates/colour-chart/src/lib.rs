//! High-level facade for the `colour-chart-*` workspace.
//!
//! This crate wires the member crates into the end-to-end calibration
//! pipeline: locate the printed chart on a scanned slide, correct the
//! scan's physical orientation, sample each patch, fit a photometric
//! correction model against known reference colours, apply it, and score
//! the result per patch.
//!
//! ## Quickstart
//!
//! ```no_run
//! use colour_chart::{CalibrationPipeline, PipelineParams, ReferenceChart};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // A normalized [0, 1] linear-light image from your decoder.
//! let image: image::Rgb32FImage = todo!();
//! // Reference colours keyed by patch label, from your chart provider.
//! let chart: ReferenceChart = todo!();
//!
//! let pipeline = CalibrationPipeline::new(PipelineParams::default());
//! let outcome = pipeline.calibrate(&image, &chart)?;
//! for (label, delta) in &outcome.delta_e {
//!     println!("{label}: dE = {delta:.2}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - [`core`]: region/grid types, transfer-function table, image helpers.
//! - [`detect`]: preprocessing, contour shape detection, candidate
//!   resolution into labelled grids.
//! - [`align`]: flip/rotation determination and the inverse coordinate
//!   transform back to raw-scan space.
//! - [`correct`]: patch sampling, the correction-model family, CIEDE2000
//!   scoring.

pub use colour_chart_align as align;
pub use colour_chart_core as core;
pub use colour_chart_correct as correct;
pub use colour_chart_detect as detect;

mod pipeline;

pub use colour_chart_align::{AlignmentError, OrientationState, RotationParams};
pub use colour_chart_core::{DetectedRegion, RegionGrid, TransferTable};
pub use colour_chart_correct::{
    BaseLearner, CorrectionModel, ModelOptions, ReferenceChart, SampleReport, TrainingDataError,
};
pub use colour_chart_detect::DetectionFailure;
pub use pipeline::{
    scale_regions_between_levels, CalibrateError, CalibrationOutcome, CalibrationPipeline,
    PipelineParams,
};
