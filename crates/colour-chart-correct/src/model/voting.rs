//! Per-channel voting ensemble.
//!
//! One independent learner set per colour channel, each fitted on that
//! channel's observed/reference column pair; the prediction is the mean of
//! the base predictions. Channel corrections are assumed independent, a
//! deliberate simplification that cannot model cross-channel bleed.

use nalgebra::DMatrix;

use super::{fit_base, BaseLearner, CorrectionModel};
use crate::training::TrainingDataError;

/// Independent per-channel learner sets, averaged at predict time.
pub struct VotingModel {
    channels: Vec<Vec<Box<dyn CorrectionModel>>>,
}

impl VotingModel {
    pub fn fit(
        learners: &[BaseLearner],
        observed: &DMatrix<f64>,
        reference: &DMatrix<f64>,
    ) -> Result<Self, TrainingDataError> {
        if learners.is_empty() {
            return Err(TrainingDataError::EmptyEnsemble);
        }
        if observed.ncols() != reference.ncols() {
            return Err(TrainingDataError::ChannelMismatch {
                observed: observed.ncols(),
                reference: reference.ncols(),
            });
        }

        let mut channels = Vec::with_capacity(observed.ncols());
        for c in 0..observed.ncols() {
            let x = DMatrix::from_fn(observed.nrows(), 1, |i, _| observed[(i, c)]);
            let y = DMatrix::from_fn(reference.nrows(), 1, |i, _| reference[(i, c)]);
            let fitted: Vec<Box<dyn CorrectionModel>> = learners
                .iter()
                .map(|learner| fit_base(learner, &x, &y))
                .collect::<Result<_, _>>()?;
            channels.push(fitted);
        }
        Ok(Self { channels })
    }
}

impl CorrectionModel for VotingModel {
    fn map_strip(&self, strip: &DMatrix<f64>) -> DMatrix<f64> {
        let mut out = DMatrix::<f64>::zeros(strip.nrows(), strip.ncols());
        for (c, learners) in self.channels.iter().enumerate() {
            if c >= strip.ncols() {
                break;
            }
            let column = DMatrix::from_fn(strip.nrows(), 1, |i, _| strip[(i, c)]);
            let mut acc = DMatrix::<f64>::zeros(strip.nrows(), 1);
            for learner in learners {
                acc += learner.map_strip(&column);
            }
            acc /= learners.len() as f64;
            out.set_column(c, &acc.column(0).clone_owned());
        }
        out
    }
}
