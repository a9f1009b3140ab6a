//! Two-level stacked ensemble.
//!
//! Base learners fit the training set directly; their concatenated
//! predictions on that same training set become the feature matrix for a
//! ridge meta-model. Base learners never see meta-model residuals, and the
//! meta fit starts only after every base fit has completed.

use nalgebra::DMatrix;

use super::{fit_base, BaseLearner, CorrectionModel, LinearModel};
use crate::training::TrainingDataError;

/// Ridge strength for the meta-model. Kept small: the meta stage needs
/// numerical regularization, not shrinkage of the handful of training rows.
const META_RIDGE_ALPHA: f64 = 1e-3;

/// K base learners under a ridge meta-regressor.
pub struct StackedModel {
    base: Vec<Box<dyn CorrectionModel>>,
    meta: LinearModel,
}

impl StackedModel {
    pub fn fit(
        learners: &[BaseLearner],
        observed: &DMatrix<f64>,
        reference: &DMatrix<f64>,
    ) -> Result<Self, TrainingDataError> {
        if learners.is_empty() {
            return Err(TrainingDataError::EmptyEnsemble);
        }

        let base: Vec<Box<dyn CorrectionModel>> = learners
            .iter()
            .map(|learner| fit_base(learner, observed, reference))
            .collect::<Result<_, _>>()?;

        let meta_features = concat_predictions(&base, observed);
        let meta = LinearModel::fit_ridge(&meta_features, reference, META_RIDGE_ALPHA)?;

        Ok(Self { base, meta })
    }
}

impl CorrectionModel for StackedModel {
    fn map_strip(&self, strip: &DMatrix<f64>) -> DMatrix<f64> {
        let features = concat_predictions(&self.base, strip);
        self.meta.map_strip(&features)
    }
}

/// Horizontally stack every base model's prediction on `input`.
fn concat_predictions(base: &[Box<dyn CorrectionModel>], input: &DMatrix<f64>) -> DMatrix<f64> {
    let outputs: Vec<DMatrix<f64>> = base.iter().map(|m| m.map_strip(input)).collect();
    let total_cols: usize = outputs.iter().map(|m| m.ncols()).sum();

    let mut features = DMatrix::<f64>::zeros(input.nrows(), total_cols);
    let mut offset = 0;
    for output in outputs {
        features
            .view_mut((0, offset), (output.nrows(), output.ncols()))
            .copy_from(&output);
        offset += output.ncols();
    }
    features
}
