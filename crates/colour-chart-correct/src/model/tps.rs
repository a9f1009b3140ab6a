//! Thin-plate-spline colour warp.
//!
//! Control points are the observed training colours; the spline maps them
//! (exactly for `alpha = 0`, smoothed otherwise) onto the reference
//! colours. The kernel is `phi(r) = r^2 ln r` with an affine term, solved
//! as the standard bordered system
//!
//! ```text
//! | K + alpha*I  P | |w|   |Y|
//! | P^T          0 | |a| = |0|
//! ```

use nalgebra::{DMatrix, DVector};

use super::{validate_rows, CorrectionModel};
use crate::training::TrainingDataError;

/// A fitted thin-plate spline in colour space.
#[derive(Clone, Debug, PartialEq)]
pub struct TpsModel {
    control: DMatrix<f64>,
    weights: DMatrix<f64>,
    affine: DMatrix<f64>,
}

impl TpsModel {
    /// Fit with smoothing `alpha` added to the kernel diagonal.
    ///
    /// Needs at least `channels + 1` rows to determine the affine part.
    pub fn fit(
        observed: &DMatrix<f64>,
        reference: &DMatrix<f64>,
        alpha: f64,
    ) -> Result<Self, TrainingDataError> {
        let d = observed.ncols();
        validate_rows(observed, reference, d + 1)?;

        let n = observed.nrows();
        let d_out = reference.ncols();

        let size = n + d + 1;
        let mut system = DMatrix::<f64>::zeros(size, size);
        for i in 0..n {
            for j in 0..n {
                let r = (observed.row(i) - observed.row(j)).norm();
                system[(i, j)] = kernel(r);
            }
            system[(i, i)] += alpha;

            system[(i, n)] = 1.0;
            system[(n, i)] = 1.0;
            for k in 0..d {
                system[(i, n + 1 + k)] = observed[(i, k)];
                system[(n + 1 + k, i)] = observed[(i, k)];
            }
        }

        let mut rhs = DMatrix::<f64>::zeros(size, d_out);
        rhs.view_mut((0, 0), (n, d_out)).copy_from(reference);

        let solution = system
            .lu()
            .solve(&rhs)
            .ok_or(TrainingDataError::SingularSystem)?;

        Ok(Self {
            control: observed.clone(),
            weights: solution.rows(0, n).clone_owned(),
            affine: solution.rows(n, d + 1).clone_owned(),
        })
    }
}

impl CorrectionModel for TpsModel {
    fn map_strip(&self, strip: &DMatrix<f64>) -> DMatrix<f64> {
        let n = self.control.nrows();
        let d = self.control.ncols();
        let d_out = self.weights.ncols();

        let mut out = DMatrix::<f64>::zeros(strip.nrows(), d_out);
        let mut basis = DVector::<f64>::zeros(n);
        for (i, row) in strip.row_iter().enumerate() {
            for j in 0..n {
                let r = (row - self.control.row(j)).norm();
                basis[j] = kernel(r);
            }
            for c in 0..d_out {
                let mut value = self.affine[(0, c)];
                for k in 0..d {
                    value += self.affine[(1 + k, c)] * row[k];
                }
                value += self.weights.column(c).dot(&basis);
                out[(i, c)] = value;
            }
        }
        out
    }
}

#[inline]
fn kernel(r: f64) -> f64 {
    if r <= 0.0 {
        0.0
    } else {
        r * r * r.ln()
    }
}
