//! Raw shape candidates from contour analysis.
//!
//! Rectangles come from external contours of the binary plane, approximated
//! to polygons and kept when they have exactly four vertices and enough
//! area. Circles come from all contours of the edge plane, kept when their
//! circularity `4*pi*area / perimeter^2` is close to 1.

use colour_chart_core::{Circle, Rect};
use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;
use log::debug;
use serde::{Deserialize, Serialize};

/// Relative tolerance for polygon approximation (fraction of the perimeter).
const POLY_APPROX_REL_TOLERANCE: f64 = 0.02;

/// A rectangle candidate with its enclosed area, used for ranking.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RectCandidate {
    pub rect: Rect,
    pub area: f64,
}

/// Detect near-axis-aligned light rectangles in a binary image.
///
/// External contours only; each is approximated to a polygon with tolerance
/// proportional to its perimeter, and polygons with exactly four vertices
/// and area above `min_area` are converted to axis-aligned bounding boxes.
/// Returns an empty list when nothing qualifies; the caller decides whether
/// that is fatal.
pub fn find_rectangles(binary: &GrayImage, min_area: f64) -> Vec<RectCandidate> {
    let contours: Vec<Contour<i32>> = find_contours(binary);

    let mut out = Vec::new();
    for contour in &contours {
        if contour.border_type != BorderType::Outer || contour.parent.is_some() {
            continue;
        }
        if contour.points.len() < 4 {
            continue;
        }

        let perimeter = arc_length(&contour.points, true);
        let mut approx =
            approximate_polygon_dp(&contour.points, POLY_APPROX_REL_TOLERANCE * perimeter, true);
        if approx.len() > 1 && approx.first() == approx.last() {
            approx.pop();
        }
        if approx.len() != 4 {
            continue;
        }

        let area = contour_area(&approx);
        if area <= min_area {
            continue;
        }

        let xs = approx.iter().map(|p| p.x);
        let ys = approx.iter().map(|p| p.y);
        let rect = Rect {
            y0: ys.clone().min().unwrap_or(0) as f64,
            y1: ys.max().unwrap_or(0) as f64,
            x0: xs.clone().min().unwrap_or(0) as f64,
            x1: xs.max().unwrap_or(0) as f64,
        };
        out.push(RectCandidate { rect, area });
    }

    debug!(
        "rectangle candidates: {} of {} contours (min_area={min_area})",
        out.len(),
        contours.len()
    );
    out
}

/// Detect circle candidates in an edge image.
///
/// All contours (outer and nested) are considered. A contour qualifies when
/// its perimeter exceeds `width / 6` (rejects small noise blobs) and its
/// circularity lies within `[1 - tolerance, 1 + tolerance]`. Each qualifying
/// contour is summarized by its minimal enclosing circle.
pub fn find_circles(edges: &GrayImage, tolerance: f64) -> Vec<Circle> {
    let contours: Vec<Contour<i32>> = find_contours(edges);
    let min_perimeter = (edges.width() / 6) as f64;

    let mut out = Vec::new();
    for contour in &contours {
        if contour.points.len() < 3 {
            continue;
        }
        let perimeter = arc_length(&contour.points, true);
        if perimeter < min_perimeter {
            continue;
        }
        let circularity = circularity(contour_area(&contour.points), perimeter);
        if !(1.0 - tolerance..=1.0 + tolerance).contains(&circularity) {
            continue;
        }
        out.push(min_enclosing_circle(&contour.points));
    }

    debug!(
        "circle candidates: {} of {} contours (tolerance={tolerance})",
        out.len(),
        contours.len()
    );
    out
}

/// Circularity score `4*pi*area / perimeter^2`; 1.0 for an ideal circle.
pub fn circularity(area: f64, perimeter: f64) -> f64 {
    if perimeter <= 0.0 {
        return 0.0;
    }
    4.0 * std::f64::consts::PI * area / (perimeter * perimeter)
}

/// Enclosed contour area by the shoelace formula.
pub fn contour_area(points: &[Point<i32>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut acc = 0.0f64;
    for i in 0..n {
        let j = (i + 1) % n;
        acc += points[i].x as f64 * points[j].y as f64;
        acc -= points[j].x as f64 * points[i].y as f64;
    }
    acc.abs() / 2.0
}

/// Minimal enclosing circle of a point set (incremental Welzl).
///
/// Deterministic three-level incremental construction; quadratic in the
/// worst case but fast on contour-sized inputs.
pub fn min_enclosing_circle(points: &[Point<i32>]) -> Circle {
    let pts: Vec<(f64, f64)> = points.iter().map(|p| (p.x as f64, p.y as f64)).collect();
    match pts.len() {
        0 => Circle {
            cx: 0.0,
            cy: 0.0,
            radius: 0.0,
        },
        1 => Circle {
            cx: pts[0].0,
            cy: pts[0].1,
            radius: 0.0,
        },
        _ => {
            let mut c = Circle {
                cx: pts[0].0,
                cy: pts[0].1,
                radius: 0.0,
            };
            for i in 1..pts.len() {
                if contains(&c, pts[i]) {
                    continue;
                }
                c = Circle {
                    cx: pts[i].0,
                    cy: pts[i].1,
                    radius: 0.0,
                };
                for j in 0..i {
                    if contains(&c, pts[j]) {
                        continue;
                    }
                    c = circle_from_two(pts[i], pts[j]);
                    for k in 0..j {
                        if !contains(&c, pts[k]) {
                            c = circle_from_three(pts[i], pts[j], pts[k]);
                        }
                    }
                }
            }
            c
        }
    }
}

const MEC_EPS: f64 = 1e-9;

fn contains(c: &Circle, p: (f64, f64)) -> bool {
    let dx = p.0 - c.cx;
    let dy = p.1 - c.cy;
    (dx * dx + dy * dy).sqrt() <= c.radius + MEC_EPS
}

fn circle_from_two(a: (f64, f64), b: (f64, f64)) -> Circle {
    let cx = (a.0 + b.0) / 2.0;
    let cy = (a.1 + b.1) / 2.0;
    let radius = ((a.0 - b.0).hypot(a.1 - b.1)) / 2.0;
    Circle { cx, cy, radius }
}

/// Circumcircle of three points; falls back to the widest two-point circle
/// when the points are (nearly) collinear.
fn circle_from_three(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> Circle {
    let d = 2.0 * (a.0 * (b.1 - c.1) + b.0 * (c.1 - a.1) + c.0 * (a.1 - b.1));
    if d.abs() < MEC_EPS {
        let ab = circle_from_two(a, b);
        let ac = circle_from_two(a, c);
        let bc = circle_from_two(b, c);
        let mut best = ab;
        if ac.radius > best.radius {
            best = ac;
        }
        if bc.radius > best.radius {
            best = bc;
        }
        return best;
    }

    let a2 = a.0 * a.0 + a.1 * a.1;
    let b2 = b.0 * b.0 + b.1 * b.1;
    let c2 = c.0 * c.0 + c.1 * c.1;
    let cx = (a2 * (b.1 - c.1) + b2 * (c.1 - a.1) + c2 * (a.1 - b.1)) / d;
    let cy = (a2 * (c.0 - b.0) + b2 * (a.0 - c.0) + c2 * (b.0 - a.0)) / d;
    let radius = (a.0 - cx).hypot(a.1 - cy);
    Circle { cx, cy, radius }
}
