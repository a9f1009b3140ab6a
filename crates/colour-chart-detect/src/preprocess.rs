//! Grayscale-plane preprocessing.
//!
//! Rectangle detection consumes a binary threshold plane; circle detection
//! and rotation estimation consume a Canny edge plane. Both start from the
//! same grayscale conversion in `colour-chart-core`.

use image::{GrayImage, Luma};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use log::debug;

/// Global binary threshold: pixels brighter than `threshold` become 255.
///
/// The default of 200 isolates the light reference rectangles on flatbed
/// scans with a dark slide background.
pub fn threshold_binary(gray: &GrayImage, threshold: u8) -> GrayImage {
    let mut out = GrayImage::new(gray.width(), gray.height());
    for (x, y, px) in gray.enumerate_pixels() {
        let v = if px.0[0] > threshold { 255u8 } else { 0u8 };
        out.put_pixel(x, y, Luma([v]));
    }
    out
}

/// Local-mean adaptive threshold, inverted: pixels darker than the mean of
/// their `block_radius` neighbourhood minus `c` become 255.
///
/// Used for scanner profiles whose background is too uneven for a global
/// threshold.
pub fn threshold_adaptive(gray: &GrayImage, block_radius: u32, c: i32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let integral = integral_image(gray);
    let mut out = GrayImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let mean = local_mean(&integral, width, height, x, y, block_radius);
            let threshold = (mean as i32 - c).clamp(0, 255) as u8;
            let v = if gray.get_pixel(x, y).0[0] < threshold {
                255u8
            } else {
                0u8
            };
            out.put_pixel(x, y, Luma([v]));
        }
    }
    out
}

/// Gaussian blur followed by Canny edge detection.
pub fn blur_edges(gray: &GrayImage, sigma: f32, low: f32, high: f32) -> GrayImage {
    let blurred = gaussian_blur_f32(gray, sigma);
    canny(&blurred, low, high)
}

/// Canny with thresholds derived from the median intensity:
/// `[(1 - sigma) * median, (1 + sigma) * median]`, clamped to [0, 255].
pub fn auto_canny(gray: &GrayImage, sigma: f32) -> GrayImage {
    let median = median_intensity(gray) as f32;
    let low = ((1.0 - sigma) * median).max(0.0);
    let high = ((1.0 + sigma) * median).min(255.0);
    debug!("auto-canny thresholds: low={low:.1} high={high:.1}");
    canny(gray, low, high)
}

/// Summed-area table with a zero-padded border; dimensions (w+1) x (h+1).
fn integral_image(gray: &GrayImage) -> Vec<u64> {
    let (w, h) = gray.dimensions();
    let stride = (w + 1) as usize;
    let mut table = vec![0u64; stride * (h + 1) as usize];

    for y in 0..h {
        let mut row_sum: u64 = 0;
        for x in 0..w {
            row_sum += gray.get_pixel(x, y).0[0] as u64;
            let idx = (y + 1) as usize * stride + (x + 1) as usize;
            let above = y as usize * stride + (x + 1) as usize;
            table[idx] = row_sum + table[above];
        }
    }
    table
}

fn local_mean(integral: &[u64], width: u32, height: u32, cx: u32, cy: u32, radius: u32) -> f64 {
    let stride = (width + 1) as usize;
    let x1 = cx.saturating_sub(radius) as usize;
    let y1 = cy.saturating_sub(radius) as usize;
    let x2 = ((cx + radius + 1) as usize).min(width as usize);
    let y2 = ((cy + radius + 1) as usize).min(height as usize);

    let area = ((x2 - x1) * (y2 - y1)) as f64;
    if area == 0.0 {
        return 128.0;
    }
    let sum = integral[y2 * stride + x2] as f64 - integral[y1 * stride + x2] as f64
        - integral[y2 * stride + x1] as f64
        + integral[y1 * stride + x1] as f64;
    sum / area
}

fn median_intensity(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for px in gray.pixels() {
        histogram[px.0[0] as usize] += 1;
    }
    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 128;
    }
    let mut seen = 0u64;
    for (value, &count) in histogram.iter().enumerate() {
        seen += count;
        if seen * 2 >= total {
            return value as u8;
        }
    }
    255
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_binary_splits_at_value() {
        let mut gray = GrayImage::new(2, 1);
        gray.put_pixel(0, 0, Luma([150]));
        gray.put_pixel(1, 0, Luma([230]));

        let bin = threshold_binary(&gray, 200);
        assert_eq!(bin.get_pixel(0, 0).0[0], 0);
        assert_eq!(bin.get_pixel(1, 0).0[0], 255);
    }

    #[test]
    fn threshold_adaptive_marks_dark_spot() {
        // Uniform bright field with one dark pixel in the middle.
        let mut gray = GrayImage::from_pixel(21, 21, Luma([200]));
        gray.put_pixel(10, 10, Luma([40]));

        let bin = threshold_adaptive(&gray, 5, 10);
        assert_eq!(bin.get_pixel(10, 10).0[0], 255);
        assert_eq!(bin.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn median_intensity_of_uniform_image() {
        let gray = GrayImage::from_pixel(8, 8, Luma([77]));
        assert_eq!(median_intensity(&gray), 77);
    }

    #[test]
    fn blur_edges_of_flat_image_is_empty() {
        let gray = GrayImage::from_pixel(32, 32, Luma([128]));
        let edges = blur_edges(&gray, 1.7, 50.0, 150.0);
        assert!(edges.pixels().all(|p| p.0[0] == 0));
    }
}
