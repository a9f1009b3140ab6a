//! Partial-least-squares regression (NIPALS, multi-output).

use log::warn;
use nalgebra::{DMatrix, DVector};

use super::{centered, column_means, validate_rows, CorrectionModel};
use crate::training::TrainingDataError;

const MAX_NIPALS_ITERS: usize = 500;
const NIPALS_TOL: f64 = 1e-10;

/// PLS2 regression reduced to its coefficient form `y = (x - mx) B + my`.
#[derive(Clone, Debug, PartialEq)]
pub struct PlsModel {
    x_mean: DVector<f64>,
    y_mean: DVector<f64>,
    coefficients: DMatrix<f64>,
}

impl PlsModel {
    /// Fit with `components` latent directions.
    ///
    /// `components` must lie in `1..=observed.ncols()` and the training set
    /// must have more rows than components.
    pub fn fit(
        observed: &DMatrix<f64>,
        reference: &DMatrix<f64>,
        components: usize,
    ) -> Result<Self, TrainingDataError> {
        let max = observed.ncols();
        if components == 0 || components > max {
            return Err(TrainingDataError::ComponentsOutOfRange { components, max });
        }
        validate_rows(observed, reference, components + 1)?;

        let x_mean = column_means(observed);
        let y_mean = column_means(reference);
        let mut e = centered(observed, &x_mean);
        let mut f = centered(reference, &y_mean);

        let d_in = observed.ncols();
        let d_out = reference.ncols();
        let mut w_mat = DMatrix::<f64>::zeros(d_in, components);
        let mut p_mat = DMatrix::<f64>::zeros(d_in, components);
        let mut q_mat = DMatrix::<f64>::zeros(d_out, components);

        let mut extracted = 0usize;
        for k in 0..components {
            let Some((w, t, q)) = extract_component(&e, &f) else {
                warn!("PLS deflation exhausted after {k} of {components} components");
                break;
            };

            let tt = t.norm_squared();
            let p = e.transpose() * &t / tt;

            e -= &t * p.transpose();
            f -= &t * q.transpose();

            w_mat.set_column(k, &w);
            p_mat.set_column(k, &p);
            q_mat.set_column(k, &q);
            extracted += 1;
        }

        if extracted == 0 {
            return Err(TrainingDataError::SingularSystem);
        }

        let w_mat = w_mat.columns(0, extracted).clone_owned();
        let p_mat = p_mat.columns(0, extracted).clone_owned();
        let q_mat = q_mat.columns(0, extracted).clone_owned();

        // B = W (P^T W)^-1 Q^T
        let pw = p_mat.transpose() * &w_mat;
        let z = pw
            .lu()
            .solve(&q_mat.transpose())
            .ok_or(TrainingDataError::SingularSystem)?;
        let coefficients = w_mat * z;

        Ok(Self {
            x_mean,
            y_mean,
            coefficients,
        })
    }
}

impl CorrectionModel for PlsModel {
    fn map_strip(&self, strip: &DMatrix<f64>) -> DMatrix<f64> {
        let mut out = centered(strip, &self.x_mean) * &self.coefficients;
        for mut row in out.row_iter_mut() {
            row += self.y_mean.transpose();
        }
        out
    }
}

/// One NIPALS iteration: returns the x-weights `w`, scores `t` and
/// y-loadings `q`, or `None` when the residual matrices carry no signal.
fn extract_component(
    e: &DMatrix<f64>,
    f: &DMatrix<f64>,
) -> Option<(DVector<f64>, DVector<f64>, DVector<f64>)> {
    let mut u = f.column(0).clone_owned();
    if u.norm_squared() < NIPALS_TOL {
        // Fall back to the largest-norm response column.
        let best = (0..f.ncols()).max_by(|&a, &b| {
            f.column(a)
                .norm_squared()
                .total_cmp(&f.column(b).norm_squared())
        })?;
        u = f.column(best).clone_owned();
        if u.norm_squared() < NIPALS_TOL {
            return None;
        }
    }

    let mut w = DVector::<f64>::zeros(e.ncols());
    let mut t = DVector::<f64>::zeros(e.nrows());
    for _ in 0..MAX_NIPALS_ITERS {
        w = e.transpose() * &u;
        let wn = w.norm();
        if wn < NIPALS_TOL {
            return None;
        }
        w /= wn;

        let t_new = e * &w;
        let tt = t_new.norm_squared();
        if tt < NIPALS_TOL {
            return None;
        }

        let q = f.transpose() * &t_new / tt;
        let qq = q.norm_squared();
        if qq < NIPALS_TOL {
            return None;
        }
        let u_new = f * &q / qq;

        let converged = (&t_new - &t).norm_squared() < NIPALS_TOL;
        t = t_new;
        u = u_new;
        if converged {
            break;
        }
    }

    let tt = t.norm_squared();
    let q = f.transpose() * &t / tt;
    Some((w, t, q))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn synthetic(n: usize) -> (DMatrix<f64>, DMatrix<f64>) {
        let observed = DMatrix::from_fn(n, 3, |i, j| {
            0.1 + 0.8 * ((i * 7 + j * 3) % 13) as f64 / 13.0
        });
        let reference = observed.map(|v| 2.0 * v);
        (observed, reference)
    }

    #[test]
    fn full_component_fit_recovers_linear_map() {
        let (observed, reference) = synthetic(15);
        let model = PlsModel::fit(&observed, &reference, 3).expect("fit");
        let predicted = model.map_strip(&observed);
        for i in 0..observed.nrows() {
            for j in 0..3 {
                assert_relative_eq!(predicted[(i, j)], reference[(i, j)], epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn single_component_handles_rank_one_signal() {
        // Reference depends on one latent direction only.
        let n = 10;
        let observed = DMatrix::from_fn(n, 3, |i, _| 0.1 + 0.08 * i as f64);
        let reference = observed.map(|v| v * 1.5 + 0.05);
        let model = PlsModel::fit(&observed, &reference, 1).expect("fit");
        let predicted = model.map_strip(&observed);
        for i in 0..n {
            assert_relative_eq!(predicted[(i, 0)], reference[(i, 0)], epsilon = 1e-6);
        }
    }

    #[test]
    fn component_count_is_bounded_by_channels() {
        let (observed, reference) = synthetic(10);
        assert_eq!(
            PlsModel::fit(&observed, &reference, 4),
            Err(TrainingDataError::ComponentsOutOfRange {
                components: 4,
                max: 3
            })
        );
        assert_eq!(
            PlsModel::fit(&observed, &reference, 0),
            Err(TrainingDataError::ComponentsOutOfRange {
                components: 0,
                max: 3
            })
        );
    }

    #[test]
    fn too_few_rows_for_components_is_rejected() {
        let (observed, reference) = synthetic(3);
        assert_eq!(
            PlsModel::fit(&observed, &reference, 3),
            Err(TrainingDataError::TooFewRows {
                rows: 3,
                required: 4
            })
        );
    }
}
