//! Perceptual colour-difference scoring.

use nalgebra::{DMatrix, DVector};
use palette::color_difference::Ciede2000;
use palette::white_point::D65;
use palette::{FromColor, Lab, Xyz};

use crate::training::TrainingDataError;

/// CIEDE2000 distance per patch row.
///
/// Both matrices hold tristimulus (XYZ) rows, one per patch, row-aligned.
/// Rows are converted to Lab (D65) before the distance is taken. Returns
/// one scalar per row; aggregation is the caller's decision.
pub fn delta_e_ciede2000(
    observed: &DMatrix<f64>,
    reference: &DMatrix<f64>,
) -> Result<DVector<f64>, TrainingDataError> {
    if observed.nrows() != reference.nrows() {
        return Err(TrainingDataError::RowCountMismatch {
            observed: observed.nrows(),
            reference: reference.nrows(),
        });
    }
    if observed.ncols() != 3 || reference.ncols() != 3 {
        return Err(TrainingDataError::ChannelMismatch {
            observed: observed.ncols(),
            reference: reference.ncols(),
        });
    }

    let deltas = DVector::from_fn(observed.nrows(), |i, _| {
        let o = row_to_lab(observed, i);
        let r = row_to_lab(reference, i);
        o.difference(r) as f64
    });
    Ok(deltas)
}

fn row_to_lab(m: &DMatrix<f64>, row: usize) -> Lab<D65, f32> {
    let xyz = Xyz::<D65, f32>::new(m[(row, 0)] as f32, m[(row, 1)] as f32, m[(row, 2)] as f32);
    Lab::from_color(xyz)
}
