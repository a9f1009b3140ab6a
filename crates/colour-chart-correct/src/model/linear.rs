//! Linear correction models: Lasso (coordinate descent) and ridge.
//!
//! Both produce an affine map `y = x W + b`. The lasso fit minimizes
//! `1/(2n) * ||Y - X W||^2 + alpha * ||W||_1` per output column with an
//! unpenalized intercept; `alpha = 0` converges to ordinary least squares.
//! The ridge fit is the closed-form solve used as the stacking meta-model.

use nalgebra::{DMatrix, DVector};

use super::{centered, column_means, validate_rows, CorrectionModel};
use crate::training::TrainingDataError;

const MAX_ITERS: usize = 1000;
const CONVERGENCE_TOL: f64 = 1e-9;

/// An affine colour map `y = x W + b`.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearModel {
    weights: DMatrix<f64>,
    intercept: DVector<f64>,
}

impl LinearModel {
    /// Fit with L1 regularization by cyclic coordinate descent.
    pub fn fit_lasso(
        observed: &DMatrix<f64>,
        reference: &DMatrix<f64>,
        alpha: f64,
    ) -> Result<Self, TrainingDataError> {
        validate_rows(observed, reference, 2)?;

        let n = observed.nrows();
        let d_in = observed.ncols();
        let d_out = reference.ncols();

        let x_mean = column_means(observed);
        let y_mean = column_means(reference);
        let xc = centered(observed, &x_mean);
        let yc = centered(reference, &y_mean);

        let col_norms: Vec<f64> = (0..d_in).map(|j| xc.column(j).norm_squared()).collect();
        let penalty = alpha * n as f64;

        let mut weights = DMatrix::<f64>::zeros(d_in, d_out);
        for out in 0..d_out {
            let mut w = DVector::<f64>::zeros(d_in);
            let mut residual = yc.column(out).clone_owned();

            for _ in 0..MAX_ITERS {
                let mut max_step = 0.0f64;
                for j in 0..d_in {
                    if col_norms[j] == 0.0 {
                        continue;
                    }
                    let rho = xc.column(j).dot(&residual) + col_norms[j] * w[j];
                    let updated = soft_threshold(rho, penalty) / col_norms[j];
                    let step = updated - w[j];
                    if step != 0.0 {
                        residual.axpy(-step, &xc.column(j), 1.0);
                        w[j] = updated;
                        max_step = max_step.max(step.abs());
                    }
                }
                if max_step < CONVERGENCE_TOL {
                    break;
                }
            }
            weights.set_column(out, &w);
        }

        let intercept = intercept_from(&weights, &x_mean, &y_mean);
        Ok(Self { weights, intercept })
    }

    /// Closed-form ridge fit: `W = (Xc^T Xc + alpha I)^-1 Xc^T Yc`.
    pub(crate) fn fit_ridge(
        observed: &DMatrix<f64>,
        reference: &DMatrix<f64>,
        alpha: f64,
    ) -> Result<Self, TrainingDataError> {
        validate_rows(observed, reference, 2)?;

        let d_in = observed.ncols();
        let x_mean = column_means(observed);
        let y_mean = column_means(reference);
        let xc = centered(observed, &x_mean);
        let yc = centered(reference, &y_mean);

        let mut gram = xc.transpose() * &xc;
        for j in 0..d_in {
            gram[(j, j)] += alpha;
        }
        let weights = gram
            .lu()
            .solve(&(xc.transpose() * &yc))
            .ok_or(TrainingDataError::SingularSystem)?;

        let intercept = intercept_from(&weights, &x_mean, &y_mean);
        Ok(Self { weights, intercept })
    }
}

impl CorrectionModel for LinearModel {
    fn map_strip(&self, strip: &DMatrix<f64>) -> DMatrix<f64> {
        let mut out = strip * &self.weights;
        for mut row in out.row_iter_mut() {
            row += self.intercept.transpose();
        }
        out
    }
}

fn intercept_from(
    weights: &DMatrix<f64>,
    x_mean: &DVector<f64>,
    y_mean: &DVector<f64>,
) -> DVector<f64> {
    y_mean - weights.transpose() * x_mean
}

fn soft_threshold(value: f64, penalty: f64) -> f64 {
    if value > penalty {
        value - penalty
    } else if value < -penalty {
        value + penalty
    } else {
        0.0
    }
}
