//! Candidate resolution: dedup raw detections and label them into the
//! canonical grid addressing scheme.
//!
//! Edge images yield several near-duplicate contours per physical patch
//! (inner and outer ring borders), so circle candidates are clustered
//! before labelling. The chart always prints its patches at one size, so
//! every resolved circle takes the global mean radius.

use colour_chart_core::{
    Circle, DetectedRegion, Rect, RegionGrid, RECT_CLEAR_AREA, RECT_DARK, RECT_KEYS,
};
use log::{debug, warn};

use crate::shapes::RectCandidate;

/// Row letters of the circle grid, left to right.
const ROW_LETTERS: [char; 4] = ['A', 'B', 'C', 'D'];

/// Column numbers, in the top-to-bottom order they appear on the scan.
const COLUMN_NUMBERS: [u8; 6] = [6, 5, 4, 3, 2, 1];

/// Offsets of the synthetic dark rectangle below the clear area, as
/// fractions of the clear-area height.
const DARK_OFFSET_TOP: f64 = 0.3;
const DARK_OFFSET_BOTTOM: f64 = 0.6;

/// Group near-duplicate circle centers with single-link clustering.
///
/// A candidate joins the first group whose every member lies within
/// `threshold` pixels of it; otherwise it opens a new group. Each group
/// collapses to its coordinate mean. Re-clustering an already-resolved set
/// with the same threshold is a no-op.
pub fn cluster_circles(candidates: &[Circle], threshold: f64) -> Vec<Circle> {
    let mut groups: Vec<Vec<Circle>> = Vec::new();

    for &candidate in candidates {
        let placed = groups.iter_mut().find(|group| {
            group
                .iter()
                .all(|member| center_distance(&candidate, member) <= threshold)
        });
        match placed {
            Some(group) => group.push(candidate),
            None => groups.push(vec![candidate]),
        }
    }

    groups
        .iter()
        .map(|group| {
            let n = group.len() as f64;
            Circle {
                cx: group.iter().map(|c| c.cx).sum::<f64>() / n,
                cy: group.iter().map(|c| c.cy).sum::<f64>() / n,
                radius: group.iter().map(|c| c.radius).sum::<f64>() / n,
            }
        })
        .collect()
}

/// Deduplicate circle candidates and label them into the canonical grid.
///
/// Resolved circles are sorted by y, partitioned into consecutive runs of
/// four (the chart has four columns), and each run is sorted by x. Labels
/// walk the row letters A..D inside descending column numbers 6..1, so the
/// topmost run becomes `A6 B6 C6 D6`. `zone` is appended verbatim to every
/// label (e.g. `"_1000"` gives `"A6_1000"`).
///
/// Every resolved circle takes the mean radius over all resolved groups.
pub fn resolve_circles(candidates: &[Circle], averaging_threshold: f64, zone: &str) -> RegionGrid {
    let mut resolved = cluster_circles(candidates, averaging_threshold);
    debug!(
        "resolved {} circle groups from {} candidates",
        resolved.len(),
        candidates.len()
    );

    if resolved.is_empty() {
        return RegionGrid::new();
    }

    let mean_radius = resolved.iter().map(|c| c.radius).sum::<f64>() / resolved.len() as f64;

    resolved.sort_by(|a, b| a.cy.total_cmp(&b.cy));
    for run in resolved.chunks_mut(ROW_LETTERS.len()) {
        run.sort_by(|a, b| a.cx.total_cmp(&b.cx));
    }

    let expected = ROW_LETTERS.len() * COLUMN_NUMBERS.len();
    if resolved.len() > expected {
        warn!(
            "{} resolved circles exceed the {expected}-patch grid; extras are dropped",
            resolved.len()
        );
    }

    let mut grid = RegionGrid::new();
    let mut index = 0usize;
    for number in COLUMN_NUMBERS {
        for letter in ROW_LETTERS {
            if index >= resolved.len() {
                break;
            }
            let c = resolved[index];
            grid.insert(
                format!("{letter}{number}{zone}"),
                DetectedRegion::Circle(Circle {
                    cx: c.cx,
                    cy: c.cy,
                    radius: mean_radius,
                }),
            );
            index += 1;
        }
    }
    grid
}

/// Rank rectangle candidates by area and assign the fixed key list.
///
/// The largest candidate is assumed to be the clear-area reference patch.
/// A synthetic dark-reference rectangle is derived just below it, offset by
/// 30%-60% of the clear-area height, so the dark strip needs no detection
/// of its own. With fewer candidates than keys, later keys are omitted.
pub fn resolve_rectangles(candidates: &[RectCandidate]) -> RegionGrid {
    let mut ranked: Vec<RectCandidate> = candidates.to_vec();
    ranked.sort_by(|a, b| b.area.total_cmp(&a.area));

    let mut grid = RegionGrid::new();
    for (key, candidate) in RECT_KEYS.iter().zip(ranked.iter()) {
        grid.insert(*key, DetectedRegion::Rect(candidate.rect));
    }

    if let Some(DetectedRegion::Rect(ca)) = grid.get(RECT_CLEAR_AREA).copied() {
        let height = ca.height();
        grid.insert(
            RECT_DARK,
            DetectedRegion::Rect(Rect {
                y0: ca.y1 + DARK_OFFSET_TOP * height,
                y1: ca.y1 + DARK_OFFSET_BOTTOM * height,
                x0: ca.x0,
                x1: ca.x1,
            }),
        );
    }

    grid
}

fn center_distance(a: &Circle, b: &Circle) -> f64 {
    (a.cx - b.cx).hypot(a.cy - b.cy)
}
