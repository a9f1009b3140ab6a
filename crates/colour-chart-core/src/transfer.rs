//! Transfer-function (CCTF) table.
//!
//! Scanned slides arrive display-encoded; detection and correction assume
//! linear-light values. The table maps an encoding name to its decode and
//! encode curves. It is built once and passed by reference wherever needed;
//! there is no process-wide mutable registry.

use image::Rgb32FImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A colour-component transfer function.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum TransferFunction {
    /// Pure power curves with one decoding exponent per channel.
    /// Decoding raises the encoded value to the exponent; encoding applies
    /// the reciprocal exponent.
    Gamma { exponents: [f32; 3] },
    /// The piecewise sRGB curve.
    Srgb,
}

impl TransferFunction {
    /// Decode one encoded channel value to linear light.
    pub fn decode_channel(&self, value: f32, channel: usize) -> f32 {
        match self {
            TransferFunction::Gamma { exponents } => value.max(0.0).powf(exponents[channel]),
            TransferFunction::Srgb => {
                let v = value.max(0.0);
                if v <= 0.040_45 {
                    v / 12.92
                } else {
                    ((v + 0.055) / 1.055).powf(2.4)
                }
            }
        }
    }

    /// Encode one linear-light channel value.
    pub fn encode_channel(&self, value: f32, channel: usize) -> f32 {
        match self {
            TransferFunction::Gamma { exponents } => {
                value.max(0.0).powf(1.0 / exponents[channel])
            }
            TransferFunction::Srgb => {
                let v = value.max(0.0);
                if v <= 0.003_130_8 {
                    v * 12.92
                } else {
                    1.055 * v.powf(1.0 / 2.4) - 0.055
                }
            }
        }
    }
}

/// Immutable name → transfer-function lookup.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferTable {
    functions: BTreeMap<String, TransferFunction>,
}

impl TransferTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock encodings shipped with the scanner profiles.
    pub fn with_defaults() -> Self {
        Self::new()
            .define("Gamma 1.0", TransferFunction::Gamma {
                exponents: [1.0, 1.0, 1.0],
            })
            .define("Gamma 1.8", TransferFunction::Gamma {
                exponents: [1.8, 1.8, 1.8],
            })
            .define("Gamma 1.1, 1.2, 1.9", TransferFunction::Gamma {
                exponents: [1.1, 1.2, 1.9],
            })
            .define("sRGB", TransferFunction::Srgb)
    }

    /// Builder-style insertion; consumed and returned so tables can be
    /// assembled in one expression before freezing.
    pub fn define(mut self, name: impl Into<String>, function: TransferFunction) -> Self {
        self.functions.insert(name.into(), function);
        self
    }

    pub fn get(&self, name: &str) -> Option<&TransferFunction> {
        self.functions.get(name)
    }

    /// Decode `image` with the named curve. `None` if the name is unknown.
    pub fn decode(&self, name: &str, image: &Rgb32FImage) -> Option<Rgb32FImage> {
        let tf = self.get(name)?;
        Some(apply(image, |v, c| tf.decode_channel(v, c)))
    }

    /// Encode `image` with the named curve. `None` if the name is unknown.
    pub fn encode(&self, name: &str, image: &Rgb32FImage) -> Option<Rgb32FImage> {
        let tf = self.get(name)?;
        Some(apply(image, |v, c| tf.encode_channel(v, c)))
    }
}

fn apply(image: &Rgb32FImage, f: impl Fn(f32, usize) -> f32) -> Rgb32FImage {
    let mut out = image.clone();
    for px in out.pixels_mut() {
        for (c, v) in px.0.iter_mut().enumerate() {
            *v = f(*v, c);
        }
    }
    out
}
