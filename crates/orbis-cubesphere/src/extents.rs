//! Square patch footprints in a face's local `(u, v)` parameterization.

use serde::{Deserialize, Serialize};

/// Rectangular footprint of a patch on one cube face.
///
/// Coordinates live in the face plane's `[-1, 1]` parameterization: `west`
/// is the minimum `u`, `north` the minimum `v`. Patches are square, so the
/// east and south edges follow from `width`. Instances are immutable;
/// subdivision produces new values.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Extents {
    north: f64,
    west: f64,
    width: f64,
}

impl Extents {
    /// The footprint covering an entire cube face.
    pub const FACE: Extents = Extents {
        north: -1.0,
        west: -1.0,
        width: 2.0,
    };

    /// Create a footprint from its north-west corner and side length.
    ///
    /// # Panics
    ///
    /// Panics if `width` is not strictly positive and finite.
    #[must_use]
    pub fn new(north: f64, west: f64, width: f64) -> Self {
        assert!(
            width > 0.0 && width.is_finite(),
            "extents width must be positive and finite, got {width}"
        );
        Self { north, west, width }
    }

    /// Minimum `v` edge.
    #[must_use]
    pub fn north(&self) -> f64 {
        self.north
    }

    /// Maximum `v` edge.
    #[must_use]
    pub fn south(&self) -> f64 {
        self.north + self.width
    }

    /// Minimum `u` edge.
    #[must_use]
    pub fn west(&self) -> f64 {
        self.west
    }

    /// Maximum `u` edge.
    #[must_use]
    pub fn east(&self) -> f64 {
        self.west + self.width
    }

    /// Side length in face units.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Center as `(u, v)`.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        let half = self.width / 2.0;
        (self.west + half, self.north + half)
    }

    /// Corners as `(u, v)` in the order NW, NE, SW, SE.
    #[must_use]
    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.west, self.north),
            (self.east(), self.north),
            (self.west, self.south()),
            (self.east(), self.south()),
        ]
    }

    /// Area in face units squared.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.width * self.width
    }

    /// Whether `(u, v)` lies inside this footprint (west/north edges inclusive).
    #[must_use]
    pub fn contains(&self, u: f64, v: f64) -> bool {
        u >= self.west && u < self.east() && v >= self.north && v < self.south()
    }

    /// Area shared with `other`; zero when they only touch along an edge.
    #[must_use]
    pub fn overlap_area(&self, other: &Extents) -> f64 {
        let du = self.east().min(other.east()) - self.west.max(other.west);
        let dv = self.south().min(other.south()) - self.north.max(other.north);
        du.max(0.0) * dv.max(0.0)
    }

    /// The four child footprints in the order NW, NE, SW, SE.
    ///
    /// Each child is half as wide; together they tile `self` exactly.
    #[must_use]
    pub fn split(&self) -> [Extents; 4] {
        let half = self.width / 2.0;
        let mid_u = self.west + half;
        let mid_v = self.north + half;
        [
            Extents::new(self.north, self.west, half),
            Extents::new(self.north, mid_u, half),
            Extents::new(mid_v, self.west, half),
            Extents::new(mid_v, mid_u, half),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_extents_cover_unit_square() {
        let e = Extents::FACE;
        assert_eq!(e.west(), -1.0);
        assert_eq!(e.east(), 1.0);
        assert_eq!(e.north(), -1.0);
        assert_eq!(e.south(), 1.0);
        assert_eq!(e.center(), (0.0, 0.0));
    }

    #[test]
    fn test_split_halves_width() {
        let parent = Extents::new(0.0, 0.0, 10.0);
        for child in parent.split() {
            assert_eq!(child.width(), 5.0);
        }
    }

    #[test]
    fn test_split_children_tile_parent_exactly() {
        let parent = Extents::new(-0.5, 0.25, 0.5);
        let children = parent.split();

        let total: f64 = children.iter().map(Extents::area).sum();
        assert!((total - parent.area()).abs() < 1e-12);

        for child in &children {
            assert!((child.overlap_area(&parent) - child.area()).abs() < 1e-12);
        }
        for i in 0..4 {
            for j in (i + 1)..4 {
                assert_eq!(
                    children[i].overlap_area(&children[j]),
                    0.0,
                    "children {i} and {j} overlap"
                );
            }
        }
    }

    #[test]
    fn test_split_order_is_nw_ne_sw_se() {
        let [nw, ne, sw, se] = Extents::FACE.split();
        assert_eq!((nw.west(), nw.north()), (-1.0, -1.0));
        assert_eq!((ne.west(), ne.north()), (0.0, -1.0));
        assert_eq!((sw.west(), sw.north()), (-1.0, 0.0));
        assert_eq!((se.west(), se.north()), (0.0, 0.0));
    }

    #[test]
    fn test_every_point_lands_in_exactly_one_child() {
        let parent = Extents::new(-1.0, -1.0, 2.0);
        let children = parent.split();
        for i in 0..20 {
            for j in 0..20 {
                let u = -1.0 + (i as f64 + 0.5) * 0.1;
                let v = -1.0 + (j as f64 + 0.5) * 0.1;
                let hits = children.iter().filter(|c| c.contains(u, v)).count();
                assert_eq!(hits, 1, "({u}, {v}) landed in {hits} children");
            }
        }
    }

    #[test]
    fn test_corners_order() {
        let e = Extents::new(1.0, 2.0, 4.0);
        assert_eq!(e.corners(), [(2.0, 1.0), (6.0, 1.0), (2.0, 5.0), (6.0, 5.0)]);
    }

    #[test]
    #[should_panic(expected = "extents width must be positive")]
    fn test_zero_width_rejected() {
        let _ = Extents::new(0.0, 0.0, 0.0);
    }
}
