//! Training sets and reference charts.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Invalid training data for a correction-model fit.
///
/// A failed fit poisons only the model instance being constructed; nothing
/// else holds a reference to its partial state.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum TrainingDataError {
    #[error("observed rows ({observed}) do not match reference rows ({reference})")]
    RowCountMismatch { observed: usize, reference: usize },

    #[error("observed channels ({observed}) do not match reference channels ({reference})")]
    ChannelMismatch { observed: usize, reference: usize },

    #[error("{rows} training rows are too few; this model needs at least {required}")]
    TooFewRows { rows: usize, required: usize },

    #[error("{components} components out of range (1..={max})")]
    ComponentsOutOfRange { components: usize, max: usize },

    #[error("ensemble has no base learners")]
    EmptyEnsemble,

    #[error("training system is singular; add regularization or remove duplicate rows")]
    SingularSystem,
}

/// Row-aligned observed and reference colours for a set of patches.
///
/// Row `i` of both matrices belongs to the patch `labels[i]`. Construction
/// validates the row and channel counts once; fits can then assume aligned
/// shapes.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingSet {
    labels: Vec<String>,
    observed: DMatrix<f64>,
    reference: DMatrix<f64>,
}

impl TrainingSet {
    pub fn new(
        labels: Vec<String>,
        observed: DMatrix<f64>,
        reference: DMatrix<f64>,
    ) -> Result<Self, TrainingDataError> {
        if observed.nrows() != reference.nrows() || observed.nrows() != labels.len() {
            return Err(TrainingDataError::RowCountMismatch {
                observed: observed.nrows(),
                reference: reference.nrows(),
            });
        }
        if observed.ncols() != reference.ncols() {
            return Err(TrainingDataError::ChannelMismatch {
                observed: observed.ncols(),
                reference: reference.ncols(),
            });
        }
        Ok(Self {
            labels,
            observed,
            reference,
        })
    }

    /// Build from per-patch rows of (label, observed, reference).
    pub fn from_rows(rows: &[(String, [f64; 3], [f64; 3])]) -> Result<Self, TrainingDataError> {
        let labels = rows.iter().map(|(l, _, _)| l.clone()).collect();
        let observed =
            DMatrix::from_fn(rows.len(), 3, |i, j| rows[i].1[j]);
        let reference =
            DMatrix::from_fn(rows.len(), 3, |i, j| rows[i].2[j]);
        Self::new(labels, observed, reference)
    }

    #[inline]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    #[inline]
    pub fn observed(&self) -> &DMatrix<f64> {
        &self.observed
    }

    #[inline]
    pub fn reference(&self) -> &DMatrix<f64> {
        &self.reference
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Known reference colours by patch label, in chart order.
///
/// The chart is an opaque lookup supplied by the caller (derived elsewhere
/// from calibration spectra); its insertion order defines the training row
/// order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceChart {
    entries: Vec<(String, [f64; 3])>,
}

impl ReferenceChart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a patch value, replacing an existing entry with the same label.
    pub fn insert(&mut self, label: impl Into<String>, value: [f64; 3]) {
        let label = label.into();
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((label, value)),
        }
    }

    pub fn get(&self, label: &str) -> Option<[f64; 3]> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, [f64; 3])> {
        self.entries.iter().map(|(l, v)| (l.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, [f64; 3])> for ReferenceChart {
    fn from_iter<T: IntoIterator<Item = (String, [f64; 3])>>(iter: T) -> Self {
        let mut chart = Self::new();
        for (label, value) in iter {
            chart.insert(label, value);
        }
        chart
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn training_set_rejects_row_mismatch() {
        let err = TrainingSet::new(
            vec!["A1".into()],
            DMatrix::zeros(1, 3),
            DMatrix::zeros(2, 3),
        )
        .expect_err("row mismatch");
        assert_eq!(
            err,
            TrainingDataError::RowCountMismatch {
                observed: 1,
                reference: 2
            }
        );
    }

    #[test]
    fn training_set_rejects_channel_mismatch() {
        let err = TrainingSet::new(
            vec!["A1".into(), "A2".into()],
            DMatrix::zeros(2, 3),
            DMatrix::zeros(2, 4),
        )
        .expect_err("channel mismatch");
        assert_eq!(
            err,
            TrainingDataError::ChannelMismatch {
                observed: 3,
                reference: 4
            }
        );
    }

    #[test]
    fn from_rows_keeps_label_order() {
        let set = TrainingSet::from_rows(&[
            ("rect_CA".into(), [0.9, 0.9, 0.9], [1.0, 1.0, 1.0]),
            ("A6".into(), [0.1, 0.2, 0.3], [0.2, 0.3, 0.4]),
        ])
        .expect("valid rows");
        assert_eq!(set.labels(), ["rect_CA".to_string(), "A6".to_string()]);
        assert_eq!(set.observed()[(1, 2)], 0.3);
        assert_eq!(set.reference()[(0, 0)], 1.0);
    }

    #[test]
    fn chart_keeps_insertion_order_and_replaces() {
        let mut chart = ReferenceChart::new();
        chart.insert("rect_CA", [1.0, 1.0, 1.0]);
        chart.insert("A6", [0.5, 0.4, 0.3]);
        chart.insert("rect_CA", [0.9, 0.9, 0.9]);

        let labels: Vec<&str> = chart.iter().map(|(l, _)| l).collect();
        assert_eq!(labels, ["rect_CA", "A6"]);
        assert_eq!(chart.get("rect_CA"), Some([0.9, 0.9, 0.9]));
        assert_eq!(chart.get("B1"), None);
    }
}
