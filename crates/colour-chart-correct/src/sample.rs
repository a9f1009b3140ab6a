//! Margin-aware patch sampling.
//!
//! Each region is shrunk by the `margin` fraction of its extent before the
//! per-channel mean is taken, so edge artefacts and background bleed stay
//! out of the sample. A mask that ends up empty (or a non-finite mean)
//! produces the sentinel sample `[0, 0, 0]`; the affected labels are
//! reported so callers can distinguish "no data" from "measured black".

use colour_chart_core::{Circle, ColorSample, DetectedRegion, Rect, RegionGrid};
use image::Rgb32FImage;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sampling output: one colour per label, plus the labels whose mask was
/// degenerate and therefore carry the sentinel zero sample.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleReport {
    pub samples: BTreeMap<String, ColorSample>,
    pub degenerate: Vec<String>,
}

/// Sample every region of `grid` from `image`.
///
/// `margin` is the fractional shrink of each region's extent: 0 samples the
/// full region, values approaching 1 (0.5 per side for rectangles) shrink
/// the mask to nothing and take the sentinel path.
pub fn sample_regions(image: &Rgb32FImage, grid: &RegionGrid, margin: f64) -> SampleReport {
    let mut report = SampleReport::default();

    for (label, region) in grid.iter() {
        let mean = match region {
            DetectedRegion::Circle(c) => mean_in_circle(image, c, margin),
            DetectedRegion::Rect(r) => mean_in_rect(image, r, margin),
        };

        let mut sample = [0.0f64; 3];
        let mut degenerate = mean.is_none();
        if let Some(mean) = mean {
            for (out, value) in sample.iter_mut().zip(mean) {
                if value.is_finite() {
                    *out = value;
                } else {
                    degenerate = true;
                }
            }
        }

        if degenerate {
            warn!("degenerate sample mask for patch {label:?}; using sentinel zero");
            report.degenerate.push(label.to_string());
        }
        report.samples.insert(label.to_string(), sample);
    }

    report
}

/// Mean colour inside the margin-shrunk disk, or `None` for an empty mask.
fn mean_in_circle(image: &Rgb32FImage, circle: &Circle, margin: f64) -> Option<ColorSample> {
    let radius = circle.radius * (1.0 - margin);
    if radius <= 0.0 {
        return None;
    }
    let r2 = radius * radius;

    let x_min = ((circle.cx - radius).floor().max(0.0)) as u32;
    let y_min = ((circle.cy - radius).floor().max(0.0)) as u32;
    let x_max = ((circle.cx + radius).ceil().min(image.width() as f64 - 1.0)).max(0.0) as u32;
    let y_max = ((circle.cy + radius).ceil().min(image.height() as f64 - 1.0)).max(0.0) as u32;

    let mut acc = [0.0f64; 3];
    let mut count = 0usize;
    for y in y_min..=y_max {
        for x in x_min..=x_max {
            let dx = x as f64 - circle.cx;
            let dy = y as f64 - circle.cy;
            if dx * dx + dy * dy > r2 {
                continue;
            }
            let px = image.get_pixel(x, y).0;
            for (a, v) in acc.iter_mut().zip(px) {
                *a += v as f64;
            }
            count += 1;
        }
    }

    (count > 0).then(|| acc.map(|a| a / count as f64))
}

/// Mean colour inside the margin-shrunk rectangle, or `None` when the
/// shrink leaves no interior.
fn mean_in_rect(image: &Rgb32FImage, rect: &Rect, margin: f64) -> Option<ColorSample> {
    let r = rect.normalized();
    let (h, w) = (r.height(), r.width());

    let y0 = r.y0 + h * margin;
    let y1 = r.y1 - h * margin;
    let x0 = r.x0 + w * margin;
    let x1 = r.x1 - w * margin;

    let y_start = y0.floor().max(0.0) as u32;
    let y_end = (y1.floor().min(image.height() as f64)).max(0.0) as u32;
    let x_start = x0.floor().max(0.0) as u32;
    let x_end = (x1.floor().min(image.width() as f64)).max(0.0) as u32;

    let mut acc = [0.0f64; 3];
    let mut count = 0usize;
    for y in y_start..y_end {
        for x in x_start..x_end {
            let px = image.get_pixel(x, y).0;
            for (a, v) in acc.iter_mut().zip(px) {
                *a += v as f64;
            }
            count += 1;
        }
    }

    (count > 0).then(|| acc.map(|a| a / count as f64))
}
