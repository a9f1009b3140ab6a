//! The correction-model family.
//!
//! Every variant fits a mapping from observed to reference colours and is
//! applied to images through the same striped path: one horizontal pixel
//! row at a time, output clipped to [0, 1]. Variants are selected by
//! [`ModelOptions`]; ensembles compose the scalar variants through
//! [`BaseLearner`].

mod linear;
mod pls;
mod stacked;
mod tps;
mod voting;

use image::{Rgb, Rgb32FImage};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::training::{TrainingDataError, TrainingSet};

pub use linear::LinearModel;
pub use pls::PlsModel;
pub use stacked::StackedModel;
pub use tps::TpsModel;
pub use voting::VotingModel;

/// A fitted observed-to-reference colour mapping.
///
/// Fit once, predict many: models hold no mutable state after
/// construction. `map_strip` receives one horizontal strip with pixels as
/// rows and channels as columns and returns a matrix of the same shape.
pub trait CorrectionModel {
    fn map_strip(&self, strip: &DMatrix<f64>) -> DMatrix<f64>;
}

/// A base learner inside a stacked or voting ensemble.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum BaseLearner {
    Linear { alpha: f64 },
    PartialLeastSquares { components: usize },
    ThinPlateSpline { alpha: f64 },
}

/// Correction-model selection and per-variant options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ModelOptions {
    /// L1-regularized multi-output linear fit; `alpha = 0` degrades to
    /// ordinary least squares.
    Lasso { alpha: f64 },
    /// Partial least squares with the given component count
    /// (1..=channel count).
    PartialLeastSquares { components: usize },
    /// Thin-plate-spline warp of colour space with smoothing `alpha`.
    ThinPlateSpline { alpha: f64 },
    /// Two-level stacking: base learners feed a ridge meta-model.
    Stacked { base: Vec<BaseLearner> },
    /// Independent per-channel learners, averaged.
    Voting { base: Vec<BaseLearner> },
}

impl ModelOptions {
    /// The stock stacked ensemble: one learner per family.
    pub fn stacked_default() -> Self {
        ModelOptions::Stacked {
            base: vec![
                BaseLearner::Linear { alpha: 1e-3 },
                BaseLearner::PartialLeastSquares { components: 3 },
                BaseLearner::ThinPlateSpline { alpha: 1.0 },
            ],
        }
    }

    /// The stock voting ensemble. PLS is excluded: per-channel inputs have
    /// a single column, so only one component would be admissible.
    pub fn voting_default() -> Self {
        ModelOptions::Voting {
            base: vec![
                BaseLearner::Linear { alpha: 1e-3 },
                BaseLearner::ThinPlateSpline { alpha: 1.0 },
            ],
        }
    }
}

impl Default for ModelOptions {
    fn default() -> Self {
        ModelOptions::Lasso { alpha: 1e-3 }
    }
}

/// Fit the configured model on a validated training set.
pub fn fit_model(
    options: &ModelOptions,
    training: &TrainingSet,
) -> Result<Box<dyn CorrectionModel>, TrainingDataError> {
    let observed = training.observed();
    let reference = training.reference();
    match options {
        ModelOptions::Lasso { alpha } => Ok(Box::new(LinearModel::fit_lasso(
            observed, reference, *alpha,
        )?)),
        ModelOptions::PartialLeastSquares { components } => {
            Ok(Box::new(PlsModel::fit(observed, reference, *components)?))
        }
        ModelOptions::ThinPlateSpline { alpha } => {
            Ok(Box::new(TpsModel::fit(observed, reference, *alpha)?))
        }
        ModelOptions::Stacked { base } => {
            Ok(Box::new(StackedModel::fit(base, observed, reference)?))
        }
        ModelOptions::Voting { base } => Ok(Box::new(VotingModel::fit(base, observed, reference)?)),
    }
}

/// Fit one ensemble base learner on raw matrices.
pub(crate) fn fit_base(
    learner: &BaseLearner,
    observed: &DMatrix<f64>,
    reference: &DMatrix<f64>,
) -> Result<Box<dyn CorrectionModel>, TrainingDataError> {
    match learner {
        BaseLearner::Linear { alpha } => Ok(Box::new(LinearModel::fit_lasso(
            observed, reference, *alpha,
        )?)),
        BaseLearner::PartialLeastSquares { components } => {
            Ok(Box::new(PlsModel::fit(observed, reference, *components)?))
        }
        BaseLearner::ThinPlateSpline { alpha } => {
            Ok(Box::new(TpsModel::fit(observed, reference, *alpha)?))
        }
    }
}

/// Apply a fitted model to a whole image, strip by strip.
///
/// Each pixel row becomes one strip matrix; the mapped strip is clipped to
/// [0, 1] before being written back, for every model family. Keeping the
/// per-strip loop here rather than in the models bounds memory to one row
/// of f64s regardless of image size.
pub fn correct_image(model: &dyn CorrectionModel, image: &Rgb32FImage) -> Rgb32FImage {
    let (width, height) = image.dimensions();
    let mut out = Rgb32FImage::new(width, height);

    let mut strip = DMatrix::<f64>::zeros(width as usize, 3);
    for y in 0..height {
        for x in 0..width {
            let px = image.get_pixel(x, y).0;
            for c in 0..3 {
                strip[(x as usize, c)] = px[c] as f64;
            }
        }
        let mapped = model.map_strip(&strip);
        for x in 0..width {
            let mut px = [0.0f32; 3];
            for (c, out_c) in px.iter_mut().enumerate() {
                *out_c = mapped[(x as usize, c)].clamp(0.0, 1.0) as f32;
            }
            out.put_pixel(x, y, Rgb(px));
        }
    }
    out
}

/// Column means of a matrix.
pub(crate) fn column_means(m: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_fn(m.ncols(), |j, _| m.column(j).mean())
}

/// Subtract per-column means.
pub(crate) fn centered(m: &DMatrix<f64>, means: &DVector<f64>) -> DMatrix<f64> {
    let mut out = m.clone();
    for j in 0..out.ncols() {
        out.column_mut(j).add_scalar_mut(-means[j]);
    }
    out
}

/// Shape validation shared by the matrix-level fits.
pub(crate) fn validate_rows(
    observed: &DMatrix<f64>,
    reference: &DMatrix<f64>,
    required: usize,
) -> Result<(), TrainingDataError> {
    if observed.nrows() != reference.nrows() {
        return Err(TrainingDataError::RowCountMismatch {
            observed: observed.nrows(),
            reference: reference.nrows(),
        });
    }
    if observed.nrows() < required {
        return Err(TrainingDataError::TooFewRows {
            rows: observed.nrows(),
            required,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Training data whose reference values overshoot [0, 1] in both
    /// directions, so unclipped predictions would too.
    fn overshooting_training() -> TrainingSet {
        let rows: Vec<(String, [f64; 3], [f64; 3])> = (0..12)
            .map(|i| {
                let f = |offset: usize| 0.05 + 0.9 * ((i * 7 + offset) % 19) as f64 / 19.0;
                let obs = [f(0), f(5), f(10)];
                let refr = [2.5 * obs[0] - 0.5, 1.5 * (1.0 - obs[1]), obs[2]];
                (format!("P{i}"), obs, refr)
            })
            .collect();
        TrainingSet::from_rows(&rows).expect("valid rows")
    }

    fn gradient_image() -> Rgb32FImage {
        let mut img = Rgb32FImage::new(16, 4);
        for (x, _y, px) in img.enumerate_pixels_mut() {
            let t = x as f32 / 15.0;
            *px = Rgb([t, 1.0 - t, 0.5]);
        }
        img
    }

    #[test]
    fn every_family_clips_predictions_to_unit_range() {
        let training = overshooting_training();
        let image = gradient_image();

        let options = [
            ModelOptions::Lasso { alpha: 1e-4 },
            ModelOptions::PartialLeastSquares { components: 2 },
            ModelOptions::ThinPlateSpline { alpha: 0.1 },
            ModelOptions::stacked_default(),
            ModelOptions::voting_default(),
        ];

        for option in options {
            let model = fit_model(&option, &training)
                .unwrap_or_else(|e| panic!("fit failed for {option:?}: {e}"));
            let corrected = correct_image(model.as_ref(), &image);
            assert_eq!(corrected.dimensions(), image.dimensions());
            for px in corrected.pixels() {
                for &v in &px.0 {
                    assert!(
                        (0.0..=1.0).contains(&v),
                        "unclipped value {v} from {option:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn default_options_round_trip_through_serde() {
        let options = ModelOptions::stacked_default();
        let json = serde_json::to_string(&options).expect("serialize");
        let back: ModelOptions = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(options, back);
    }
}
