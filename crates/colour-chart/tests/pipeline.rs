//! End-to-end pipeline test on a synthetic slide scan.
//!
//! The synthetic target mirrors the printed chart layout: a large clear-area
//! rectangle up top, a 4x6 grid of circular colour patches, and three
//! density rectangles along the bottom, all on a dark background.

use std::collections::BTreeMap;

use colour_chart::core::{grayscale, DetectedRegion};
use colour_chart::detect::preprocess::threshold_binary;
use colour_chart::detect::find_rectangles;
use colour_chart::{
    CalibrationPipeline, ModelOptions, PipelineParams, ReferenceChart, RotationParams,
};
use image::{imageops, Rgb, Rgb32FImage};

const WIDTH: u32 = 800;
const HEIGHT: u32 = 900;
const BACKGROUND: [f32; 3] = [0.15, 0.15, 0.15];

const CLEAR_AREA: ([u32; 2], [u32; 2], f32) = ([250, 550], [40, 160], 0.95);
const DENSITY_RECTS: [([u32; 2], [u32; 2], f32); 3] = [
    ([60, 240], [720, 820], 0.88),  // rect_1000, largest density patch
    ([310, 480], [720, 820], 0.85), // rect_750
    ([560, 720], [720, 820], 0.92), // rect_500, smallest
];

const CIRCLE_RADIUS: f64 = 30.0;
const CIRCLE_XS: [u32; 4] = [160, 320, 480, 640];
const CIRCLE_YS: [u32; 6] = [280, 350, 420, 490, 560, 630];

/// Distinct, decorrelated patch colours with enough contrast against the
/// background for edge detection.
fn circle_colour(row: usize, col: usize) -> [f32; 3] {
    let k = (row * 4 + col) * 7;
    let f = |offset: usize| 0.30 + 0.45 * ((k + offset) % 19) as f32 / 19.0;
    [f(0), f(5), f(10)]
}

fn circle_label(row: usize, col: usize) -> String {
    let letter = ['A', 'B', 'C', 'D'][col];
    let number = 6 - row;
    format!("{letter}{number}")
}

fn synthetic_slide() -> Rgb32FImage {
    let mut img = Rgb32FImage::from_pixel(WIDTH, HEIGHT, Rgb(BACKGROUND));

    let mut fill_rect = |xs: [u32; 2], ys: [u32; 2], v: f32| {
        for y in ys[0]..ys[1] {
            for x in xs[0]..xs[1] {
                img.put_pixel(x, y, Rgb([v, v, v]));
            }
        }
    };
    fill_rect(CLEAR_AREA.0, CLEAR_AREA.1, CLEAR_AREA.2);
    for (xs, ys, v) in DENSITY_RECTS {
        fill_rect(xs, ys, v);
    }

    for (row, &cy) in CIRCLE_YS.iter().enumerate() {
        for (col, &cx) in CIRCLE_XS.iter().enumerate() {
            let colour = circle_colour(row, col);
            let r2 = CIRCLE_RADIUS * CIRCLE_RADIUS;
            for y in cy - 32..cy + 32 {
                for x in cx - 32..cx + 32 {
                    let dx = x as f64 - cx as f64;
                    let dy = y as f64 - cy as f64;
                    if dx * dx + dy * dy <= r2 {
                        img.put_pixel(x, y, Rgb(colour));
                    }
                }
            }
        }
    }
    img
}

fn reference_chart() -> ReferenceChart {
    let mut chart = ReferenceChart::new();
    chart.insert("rect_CA", [CLEAR_AREA.2 as f64; 3]);
    chart.insert("rect_1000", [DENSITY_RECTS[0].2 as f64; 3]);
    chart.insert("rect_750", [DENSITY_RECTS[1].2 as f64; 3]);
    chart.insert("rect_500", [DENSITY_RECTS[2].2 as f64; 3]);
    chart.insert("rect_dark", [BACKGROUND[0] as f64; 3]);
    for row in 0..6 {
        for col in 0..4 {
            let c = circle_colour(row, col);
            chart.insert(circle_label(row, col), [c[0] as f64, c[1] as f64, c[2] as f64]);
        }
    }
    chart
}

fn test_params() -> PipelineParams {
    PipelineParams {
        rect_min_area: 5_000.0,
        edge_sigma: 1.0,
        canny_low: 20.0,
        canny_high: 60.0,
        zone: String::new(),
        rotation: RotationParams {
            vote_threshold: 150,
            ..Default::default()
        },
        model: ModelOptions::Lasso { alpha: 1e-4 },
        ..Default::default()
    }
}

#[test]
fn rectangles_are_detected_on_the_binary_plane() {
    let slide = synthetic_slide();
    let binary = threshold_binary(&grayscale(&slide), 200);
    let rects = find_rectangles(&binary, 5_000.0);
    assert_eq!(rects.len(), 4, "clear area plus three density rectangles");
}

#[test]
fn upright_slide_calibrates_end_to_end() {
    let _ = env_logger::builder().is_test(true).try_init();
    let slide = synthetic_slide();
    let outcome = CalibrationPipeline::new(test_params())
        .calibrate(&slide, &reference_chart())
        .expect("calibration succeeds");

    assert!(!outcome.orientation.is_flipped());
    assert!(outcome.orientation.rotation_angle_degrees.abs() < 1.0);

    // 24 circles, 4 ranked rectangles, 1 synthetic dark strip.
    assert_eq!(outcome.regions.len(), 29);
    assert!(outcome.samples.degenerate.is_empty());

    // The topmost-left circle is A6 and sits near its drawn center.
    match outcome.regions.get("A6").expect("A6 present") {
        DetectedRegion::Circle(c) => {
            assert!((c.cx - 160.0).abs() < 4.0, "A6 cx = {}", c.cx);
            assert!((c.cy - 280.0).abs() < 4.0, "A6 cy = {}", c.cy);
        }
        other => panic!("expected circle, got {other:?}"),
    }

    // Near-identity data must correct to small perceptual error everywhere.
    assert_eq!(outcome.delta_e.len(), 29);
    for (label, delta) in &outcome.delta_e {
        assert!(*delta < 2.0, "dE for {label} was {delta}");
    }
}

#[test]
fn mirrored_slide_is_unflipped_before_sampling() {
    let slide = synthetic_slide();
    let mirrored = imageops::flip_horizontal(&slide);

    let outcome = CalibrationPipeline::new(test_params())
        .calibrate(&mirrored, &reference_chart())
        .expect("calibration succeeds");

    assert!(outcome.orientation.flip_horizontal);
    assert!(!outcome.orientation.flip_vertical && !outcome.orientation.flip_over);

    // Labels refer to the upright frame, so A6 is at its printed position
    // and maps back to the mirrored location in raw coordinates.
    match outcome.regions.get("A6").expect("A6 present") {
        DetectedRegion::Circle(c) => assert!((c.cx - 160.0).abs() < 4.0),
        other => panic!("expected circle, got {other:?}"),
    }
    match outcome.regions_raw.get("A6").expect("A6 present") {
        DetectedRegion::Circle(c) => assert!((c.cx - 640.0).abs() < 5.0, "raw cx = {}", c.cx),
        other => panic!("expected circle, got {other:?}"),
    }

    for delta in outcome.delta_e.values() {
        assert!(*delta < 2.0);
    }
}

#[test]
fn missing_chart_patch_aborts_with_its_label() {
    let slide = synthetic_slide();
    let mut chart = reference_chart();
    chart.insert("Z9", [0.5, 0.5, 0.5]);

    let err = match CalibrationPipeline::new(test_params()).calibrate(&slide, &chart) {
        Err(err) => err,
        Ok(_) => panic!("calibration should fail for an unknown patch label"),
    };
    let message = err.to_string();
    assert!(message.contains("Z9"), "unexpected error: {message}");
}

#[test]
fn delta_e_scores_are_row_aligned_with_the_chart() {
    let slide = synthetic_slide();
    let chart = reference_chart();
    let outcome = CalibrationPipeline::new(test_params())
        .calibrate(&slide, &chart)
        .expect("calibration succeeds");

    let labels: BTreeMap<String, f64> = outcome.delta_e;
    for (label, _) in chart.iter() {
        assert!(labels.contains_key(label), "no score for {label}");
    }
}
