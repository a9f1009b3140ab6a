//! Patch sampling and photometric correction.
//!
//! Given a labelled [`RegionGrid`](colour_chart_core::RegionGrid) and the
//! corrected image, [`sample_regions`] extracts one representative colour
//! per patch. Samples joined with a [`ReferenceChart`] form a
//! [`TrainingSet`], on which any member of the [`model`] family can be
//! fitted and then applied to whole images strip by strip. Correction
//! quality is scored per patch with [`delta_e_ciede2000`].

pub mod delta_e;
pub mod model;
pub mod sample;
pub mod training;

pub use delta_e::delta_e_ciede2000;
pub use model::{correct_image, fit_model, BaseLearner, CorrectionModel, ModelOptions};
pub use sample::{sample_regions, SampleReport};
pub use training::{ReferenceChart, TrainingDataError, TrainingSet};
