use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label of the clear-area reference rectangle.
pub const RECT_CLEAR_AREA: &str = "rect_CA";

/// Label of the synthetic dark-reference rectangle derived below the clear area.
pub const RECT_DARK: &str = "rect_dark";

/// Rectangle labels in descending area order. The largest candidate is
/// assumed to be the clear-area patch; the rest are the density patches.
pub const RECT_KEYS: [&str; 4] = [RECT_CLEAR_AREA, "rect_1000", "rect_750", "rect_500"];

/// Per-channel mean intensities sampled from one region.
pub type ColorSample = [f64; 3];

/// A circular patch located in image coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub cx: f64,
    pub cy: f64,
    pub radius: f64,
}

/// An axis-aligned rectangular patch.
///
/// Detector output satisfies `y1 > y0` and `x1 > x0`. Coordinate transforms
/// (flips, rotations) may leave the corners unordered; call [`Rect::normalized`]
/// before treating the fields as bounds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub y0: f64,
    pub y1: f64,
    pub x0: f64,
    pub x1: f64,
}

impl Rect {
    /// Return the rectangle with corners sorted so that `y0 <= y1` and `x0 <= x1`.
    pub fn normalized(&self) -> Rect {
        Rect {
            y0: self.y0.min(self.y1),
            y1: self.y0.max(self.y1),
            x0: self.x0.min(self.x1),
            x1: self.x0.max(self.x1),
        }
    }

    #[inline]
    pub fn height(&self) -> f64 {
        (self.y1 - self.y0).abs()
    }

    #[inline]
    pub fn width(&self) -> f64 {
        (self.x1 - self.x0).abs()
    }
}

/// A detected patch region: either a circle or an axis-aligned rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum DetectedRegion {
    Circle(Circle),
    Rect(Rect),
}

impl DetectedRegion {
    /// Scale all coordinates by `factor`.
    ///
    /// Used to transfer regions detected on a low-resolution pyramid level
    /// onto the full-resolution sampling level.
    pub fn scaled(&self, factor: f64) -> DetectedRegion {
        match *self {
            DetectedRegion::Circle(c) => DetectedRegion::Circle(Circle {
                cx: c.cx * factor,
                cy: c.cy * factor,
                radius: c.radius * factor,
            }),
            DetectedRegion::Rect(r) => DetectedRegion::Rect(Rect {
                y0: r.y0 * factor,
                y1: r.y1 * factor,
                x0: r.x0 * factor,
                x1: r.x1 * factor,
            }),
        }
    }
}

/// A labelled set of detected regions.
///
/// Labels follow the canonical chart addressing scheme: circle patches get
/// row-letter/column-number keys like `"A6"` (optionally suffixed with a
/// zone name, e.g. `"A6_1000"`), rectangles get the [`RECT_KEYS`] names.
/// Lookup by label is the primary access pattern; iteration order is the
/// lexicographic label order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionGrid {
    regions: BTreeMap<String, DetectedRegion>,
}

impl RegionGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, region: DetectedRegion) {
        self.regions.insert(label.into(), region);
    }

    pub fn get(&self, label: &str) -> Option<&DetectedRegion> {
        self.regions.get(label)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DetectedRegion)> {
        self.regions.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Absorb all regions of `other`, overwriting labels already present.
    pub fn merge(&mut self, other: RegionGrid) {
        self.regions.extend(other.regions);
    }

    /// Scale every region by `factor` (pyramid-level transfer).
    pub fn scaled(&self, factor: f64) -> RegionGrid {
        RegionGrid {
            regions: self
                .regions
                .iter()
                .map(|(k, v)| (k.clone(), v.scaled(factor)))
                .collect(),
        }
    }

    /// Map every region through `f`, keeping labels.
    pub fn map_regions(&self, mut f: impl FnMut(&DetectedRegion) -> DetectedRegion) -> RegionGrid {
        RegionGrid {
            regions: self
                .regions
                .iter()
                .map(|(k, v)| (k.clone(), f(v)))
                .collect(),
        }
    }
}

impl FromIterator<(String, DetectedRegion)> for RegionGrid {
    fn from_iter<T: IntoIterator<Item = (String, DetectedRegion)>>(iter: T) -> Self {
        RegionGrid {
            regions: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_normalized_sorts_corners() {
        let r = Rect {
            y0: 50.0,
            y1: 10.0,
            x0: 80.0,
            x1: 20.0,
        };
        let n = r.normalized();
        assert_eq!(n.y0, 10.0);
        assert_eq!(n.y1, 50.0);
        assert_eq!(n.x0, 20.0);
        assert_eq!(n.x1, 80.0);
        assert_eq!(n.height(), 40.0);
        assert_eq!(n.width(), 60.0);
    }

    #[test]
    fn grid_scaled_scales_every_coordinate() {
        let mut grid = RegionGrid::new();
        grid.insert(
            "A6",
            DetectedRegion::Circle(Circle {
                cx: 10.0,
                cy: 20.0,
                radius: 5.0,
            }),
        );
        grid.insert(
            RECT_CLEAR_AREA,
            DetectedRegion::Rect(Rect {
                y0: 1.0,
                y1: 2.0,
                x0: 3.0,
                x1: 4.0,
            }),
        );

        let scaled = grid.scaled(4.0);
        match scaled.get("A6").expect("circle present") {
            DetectedRegion::Circle(c) => {
                assert_eq!(c.cx, 40.0);
                assert_eq!(c.cy, 80.0);
                assert_eq!(c.radius, 20.0);
            }
            other => panic!("expected circle, got {other:?}"),
        }
        match scaled.get(RECT_CLEAR_AREA).expect("rect present") {
            DetectedRegion::Rect(r) => assert_eq!((r.y0, r.y1, r.x0, r.x1), (4.0, 8.0, 12.0, 16.0)),
            other => panic!("expected rect, got {other:?}"),
        }
    }

    #[test]
    fn grid_serde_round_trip() {
        let mut grid = RegionGrid::new();
        grid.insert(
            "B3_750",
            DetectedRegion::Circle(Circle {
                cx: 1.5,
                cy: 2.5,
                radius: 3.5,
            }),
        );
        let json = serde_json::to_string(&grid).expect("serialize");
        let back: RegionGrid = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(grid, back);
    }
}
