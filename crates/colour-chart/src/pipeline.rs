//! The end-to-end calibration pipeline.

use std::collections::BTreeMap;

use image::Rgb32FImage;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use colour_chart_align::{
    determine_flip, estimate_rotation, flip_image, restore_original, rotate_upright,
    AlignmentError, OrientationState, RotationParams,
};
use colour_chart_core::{grayscale, RegionGrid};
use colour_chart_correct::{
    correct_image, delta_e_ciede2000, fit_model, sample_regions, CorrectionModel, ModelOptions,
    ReferenceChart, SampleReport, TrainingDataError, TrainingSet,
};
use colour_chart_detect::preprocess::{blur_edges, threshold_binary};
use colour_chart_detect::{
    find_circles, find_rectangles, resolve_circles, resolve_rectangles, DetectionFailure,
};

/// Pipeline configuration. Defaults mirror the flatbed scanner profile the
/// chart was designed for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineParams {
    /// Global binary threshold isolating the light reference rectangles.
    pub rect_threshold: u8,
    /// Minimum rectangle candidate area in pixels.
    pub rect_min_area: f64,
    /// Gaussian sigma applied before Canny.
    pub edge_sigma: f32,
    /// Canny hysteresis thresholds.
    pub canny_low: f32,
    pub canny_high: f32,
    /// Circularity tolerance around 1.0 for circle candidates.
    pub circle_tolerance: f64,
    /// Single-link clustering distance for duplicate circle centers, px.
    pub averaging_threshold: f64,
    /// Zone suffix appended to circle labels (e.g. `"_1000"`).
    pub zone: String,
    /// Number of circle patches the chart carries in the sampled zone.
    pub expected_circles: usize,
    /// Fractional shrink of each region before sampling.
    pub margin: f64,
    /// Hough rotation estimation settings.
    pub rotation: RotationParams,
    /// Correction model selection.
    pub model: ModelOptions,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            rect_threshold: 200,
            rect_min_area: 20_000.0,
            edge_sigma: 1.7,
            canny_low: 50.0,
            canny_high: 150.0,
            circle_tolerance: 0.2,
            averaging_threshold: 10.0,
            zone: "_1000".to_string(),
            expected_circles: 24,
            margin: 0.3,
            rotation: RotationParams::default(),
            model: ModelOptions::default(),
        }
    }
}

/// Errors that abort a calibration run.
#[derive(thiserror::Error, Debug)]
pub enum CalibrateError {
    #[error(transparent)]
    Detection(#[from] DetectionFailure),

    #[error(transparent)]
    Alignment(#[from] AlignmentError),

    #[error(transparent)]
    TrainingData(#[from] TrainingDataError),

    #[error("patch {label:?} from the reference chart was not sampled")]
    MissingSample { label: String },
}

/// Everything a calibration run produces.
pub struct CalibrationOutcome {
    /// Flip flags and rotation angle of the raw scan.
    pub orientation: OrientationState,
    /// Labelled regions in the corrected (upright) frame.
    pub regions: RegionGrid,
    /// The same regions mapped back into raw-scan coordinates.
    pub regions_raw: RegionGrid,
    /// Per-patch samples taken from the upright image before correction.
    pub samples: SampleReport,
    /// The orientation-corrected image.
    pub upright: Rgb32FImage,
    /// The photometrically corrected image.
    pub corrected: Rgb32FImage,
    /// The fitted correction model, reusable on further images.
    pub model: Box<dyn CorrectionModel>,
    /// CIEDE2000 score per chart patch, measured on the corrected image.
    pub delta_e: BTreeMap<String, f64>,
}

/// Detect, orient, sample, fit, apply, evaluate.
pub struct CalibrationPipeline {
    params: PipelineParams,
}

impl CalibrationPipeline {
    pub fn new(params: PipelineParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &PipelineParams {
        &self.params
    }

    /// Run the full calibration on a normalized [0, 1] image.
    ///
    /// `chart` supplies the reference colour for every patch label the run
    /// should train on; each chart label must be detected and sampled.
    pub fn calibrate(
        &self,
        image: &Rgb32FImage,
        chart: &ReferenceChart,
    ) -> Result<CalibrationOutcome, CalibrateError> {
        let p = &self.params;

        // Anchor rectangles on the raw scan decide the flip state.
        let anchors = self.detect_rectangles(image)?;
        let mut orientation = determine_flip(&anchors)?;
        let flipped = flip_image(image, &orientation);

        // Residual tilt from the flipped frame, then the upright warp.
        let flipped_edges = blur_edges(
            &grayscale(&flipped),
            p.edge_sigma,
            p.canny_low,
            p.canny_high,
        );
        orientation.rotation_angle_degrees = estimate_rotation(&flipped_edges, &p.rotation)?;
        let upright = rotate_upright(&flipped, orientation.rotation_angle_degrees);
        info!(
            "orientation: flip_h={} flip_v={} flip_over={} rotation={:.3} deg",
            orientation.flip_horizontal,
            orientation.flip_vertical,
            orientation.flip_over,
            orientation.rotation_angle_degrees
        );

        // Re-detect everything in the corrected frame.
        let mut regions = self.detect_rectangles(&upright)?;
        let upright_edges = blur_edges(
            &grayscale(&upright),
            p.edge_sigma,
            p.canny_low,
            p.canny_high,
        );
        let circles = find_circles(&upright_edges, p.circle_tolerance);
        if circles.is_empty() {
            return Err(DetectionFailure::NoCircles.into());
        }
        let circle_grid = resolve_circles(&circles, p.averaging_threshold, &p.zone);
        if circle_grid.len() != p.expected_circles {
            return Err(DetectionFailure::CircleCount {
                found: circle_grid.len(),
                expected: p.expected_circles,
                candidates: circles,
            }
            .into());
        }
        regions.merge(circle_grid);
        debug!("detected {} labelled regions", regions.len());

        // Sample, join with the chart, fit and apply.
        let samples = sample_regions(&upright, &regions, p.margin);
        if !samples.degenerate.is_empty() {
            warn!(
                "{} degenerate patch samples: {:?}",
                samples.degenerate.len(),
                samples.degenerate
            );
        }

        let training = build_training_set(&samples, chart)?;
        let model = fit_model(&p.model, &training)?;
        let corrected = correct_image(model.as_ref(), &upright);

        // Score the correction per patch on re-sampled colours.
        let corrected_samples = sample_regions(&corrected, &regions, p.margin);
        let scored = build_training_set(&corrected_samples, chart)?;
        let deltas = delta_e_ciede2000(scored.observed(), scored.reference())?;
        let delta_e: BTreeMap<String, f64> = scored
            .labels()
            .iter()
            .zip(deltas.iter())
            .map(|(label, &d)| (label.clone(), d))
            .collect();

        let regions_raw = restore_original(
            &regions,
            image.width() as f64,
            image.height() as f64,
            &orientation,
        );

        Ok(CalibrationOutcome {
            orientation,
            regions,
            regions_raw,
            samples,
            upright,
            corrected,
            model,
            delta_e,
        })
    }

    fn detect_rectangles(&self, image: &Rgb32FImage) -> Result<RegionGrid, CalibrateError> {
        let p = &self.params;
        let binary = threshold_binary(&grayscale(image), p.rect_threshold);
        let rects = find_rectangles(&binary, p.rect_min_area);
        if rects.is_empty() {
            return Err(DetectionFailure::NoRectangles {
                min_area: p.rect_min_area,
            }
            .into());
        }
        Ok(resolve_rectangles(&rects))
    }
}

/// Transfer regions detected on a low-resolution pyramid level onto a
/// higher-resolution level of the same scan.
///
/// Pyramid levels differ by integral factors, so the ratio of the two
/// heights is rounded before scaling.
pub fn scale_regions_between_levels(
    grid: &RegionGrid,
    detect_height: u32,
    sample_height: u32,
) -> RegionGrid {
    let factor = (sample_height as f64 / detect_height as f64).round();
    grid.scaled(factor)
}

/// Join sampled colours with the chart, in chart order.
///
/// Every chart label must have been sampled; extra samples (other zones,
/// unreferenced rectangles) are ignored.
fn build_training_set(
    samples: &SampleReport,
    chart: &ReferenceChart,
) -> Result<TrainingSet, CalibrateError> {
    let mut rows = Vec::with_capacity(chart.len());
    for (label, reference) in chart.iter() {
        let observed = samples
            .samples
            .get(label)
            .ok_or_else(|| CalibrateError::MissingSample {
                label: label.to_string(),
            })?;
        rows.push((label.to_string(), *observed, reference));
    }
    TrainingSet::from_rows(&rows).map_err(CalibrateError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use colour_chart_core::{Circle, DetectedRegion};

    #[test]
    fn level_transfer_rounds_the_scale_factor() {
        let mut grid = RegionGrid::new();
        grid.insert(
            "A6",
            DetectedRegion::Circle(Circle {
                cx: 100.0,
                cy: 50.0,
                radius: 10.0,
            }),
        );

        // 4001 / 1000 rounds to the pyramid factor 4.
        let scaled = scale_regions_between_levels(&grid, 1000, 4001);
        match scaled.get("A6").expect("A6 present") {
            DetectedRegion::Circle(c) => {
                assert_eq!(c.cx, 400.0);
                assert_eq!(c.radius, 40.0);
            }
            other => panic!("expected circle, got {other:?}"),
        }
    }

    #[test]
    fn default_params_round_trip_through_serde() {
        let params = PipelineParams::default();
        let json = serde_json::to_string(&params).expect("serialize");
        let back: PipelineParams = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(params, back);
    }

    #[test]
    fn missing_sample_is_reported_with_its_label() {
        let mut chart = ReferenceChart::new();
        chart.insert("A6", [0.5, 0.5, 0.5]);
        let samples = SampleReport::default();
        match build_training_set(&samples, &chart) {
            Err(CalibrateError::MissingSample { label }) => assert_eq!(label, "A6"),
            other => panic!("expected MissingSample, got {other:?}"),
        }
    }

    #[test]
    fn training_rows_follow_chart_order() {
        let mut chart = ReferenceChart::new();
        chart.insert("rect_CA", [1.0, 1.0, 1.0]);
        chart.insert("A6", [0.3, 0.3, 0.3]);

        let mut samples = SampleReport::default();
        samples.samples.insert("A6".into(), [0.25, 0.25, 0.25]);
        samples.samples.insert("rect_CA".into(), [0.95, 0.95, 0.95]);
        samples.samples.insert("unused".into(), [0.0, 0.0, 0.0]);

        let training = build_training_set(&samples, &chart).expect("all labels sampled");
        assert_eq!(training.labels(), ["rect_CA".to_string(), "A6".to_string()]);
        assert_eq!(training.observed()[(0, 0)], 0.95);
        assert_eq!(training.reference()[(1, 0)], 0.3);
    }
}
