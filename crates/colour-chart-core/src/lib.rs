//! Core types and utilities for colour-calibration chart detection.
//!
//! This crate is intentionally small. It holds the region/grid vocabulary
//! shared by the detection, alignment and correction crates, plus a few
//! image helpers and the transfer-function table. It does *not* depend on
//! any concrete shape detector or regression backend.

mod image;
mod logger;
mod region;
mod transfer;

pub use crate::image::{clip_unit, grayscale, normalize_rgb8, to_rgb8};
pub use logger::init_with_level;
pub use region::{
    Circle, ColorSample, DetectedRegion, Rect, RegionGrid, RECT_CLEAR_AREA, RECT_DARK, RECT_KEYS,
};
pub use transfer::{TransferFunction, TransferTable};
