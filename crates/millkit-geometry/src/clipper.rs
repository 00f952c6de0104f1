//! Polygon boolean and offset operations.
//!
//! Wraps `geo-clipper` behind a small engine that fixes the quantization
//! scale and corner join style once per planning run. Regions are plain
//! `geo` multipolygons; every operation returns a normalised region with
//! slivers below the tolerance removed.

use geo::algorithm::orient::{Direction, Orient};
use geo::{Area, Contains, Coord, LineString, MultiPolygon, Polygon};
use geo_clipper::{Clipper, EndType, JoinType};

/// A planar region: disjoint polygons, each with optional holes.
pub type Region = MultiPolygon<f64>;

/// Join type for offset corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetJoin {
    /// Round corners
    #[default]
    Round,
    /// Mitered corners
    Miter,
    /// Square corners
    Square,
}

impl From<OffsetJoin> for JoinType {
    fn from(jt: OffsetJoin) -> Self {
        match jt {
            OffsetJoin::Round => JoinType::Round(0.25),
            OffsetJoin::Miter => JoinType::Miter(2.0),
            OffsetJoin::Square => JoinType::Square,
        }
    }
}

/// Boolean/offset engine with a fixed integer quantization scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BooleanEngine {
    tolerance: f64,
    join: OffsetJoin,
}

impl Default for BooleanEngine {
    fn default() -> Self {
        Self::new(1e-3, OffsetJoin::Round)
    }
}

impl BooleanEngine {
    /// `tolerance` is the smallest distinguishable length; coordinates are
    /// scaled by its inverse before reaching the integer kernel.
    pub fn new(tolerance: f64, join: OffsetJoin) -> Self {
        Self {
            tolerance: tolerance.abs().max(f64::EPSILON),
            join,
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn join(&self) -> OffsetJoin {
        self.join
    }

    fn factor(&self) -> f64 {
        1.0 / self.tolerance
    }

    pub fn union(&self, a: &Region, b: &Region) -> Region {
        if a.0.is_empty() {
            return self.normalize(b);
        }
        if b.0.is_empty() {
            return self.normalize(a);
        }
        self.clean(a.union(b, self.factor()))
    }

    /// Union of any number of regions.
    pub fn union_all<'a>(&self, regions: impl IntoIterator<Item = &'a Region>) -> Region {
        regions
            .into_iter()
            .fold(MultiPolygon::new(vec![]), |acc, r| self.union(&acc, r))
    }

    /// `a` minus `b`.
    pub fn difference(&self, a: &Region, b: &Region) -> Region {
        if a.0.is_empty() {
            return MultiPolygon::new(vec![]);
        }
        if b.0.is_empty() {
            return self.normalize(a);
        }
        self.clean(a.difference(b, self.factor()))
    }

    pub fn intersection(&self, a: &Region, b: &Region) -> Region {
        if a.0.is_empty() || b.0.is_empty() {
            return MultiPolygon::new(vec![]);
        }
        self.clean(a.intersection(b, self.factor()))
    }

    /// Offsets a region; positive `delta` grows it, negative shrinks it.
    pub fn offset(&self, region: &Region, delta: f64) -> Region {
        if region.0.is_empty() {
            return MultiPolygon::new(vec![]);
        }
        self.clean(region.offset(
            delta,
            self.join.into(),
            EndType::ClosedPolygon,
            self.factor(),
        ))
    }

    /// Resolves self-overlaps by a union against nothing.
    pub fn normalize(&self, region: &Region) -> Region {
        if region.0.is_empty() {
            return MultiPolygon::new(vec![]);
        }
        self.clean(region.union(&MultiPolygon::<f64>::new(vec![]), self.factor()))
    }

    /// Builds a region from unordered closed loops.
    ///
    /// Nesting is decided by containment depth: loops inside an even number
    /// of other loops are outer boundaries, the rest are holes of their
    /// nearest enclosing outer loop. Degenerate loops are dropped first.
    pub fn region_from_loops(&self, loops: &[LineString<f64>]) -> Region {
        let loops: Vec<Polygon<f64>> = loops
            .iter()
            .filter(|l| self.is_usable_loop(l))
            .map(|l| Polygon::new(l.clone(), vec![]))
            .collect();

        let areas: Vec<f64> = loops.iter().map(|p| p.unsigned_area()).collect();
        let samples: Vec<Coord<f64>> = loops.iter().map(|p| p.exterior().0[0]).collect();

        let encloses = |outer: usize, inner: usize| {
            outer != inner && areas[outer] > areas[inner] && loops[outer].contains(&samples[inner])
        };

        let depth: Vec<usize> = (0..loops.len())
            .map(|i| (0..loops.len()).filter(|&j| encloses(j, i)).count())
            .collect();

        let polygons = (0..loops.len())
            .filter(|&i| depth[i] % 2 == 0)
            .map(|i| {
                let holes = (0..loops.len())
                    .filter(|&k| depth[k] == depth[i] + 1 && encloses(i, k))
                    .map(|k| loops[k].exterior().clone())
                    .collect();
                Polygon::new(loops[i].exterior().clone(), holes).orient(Direction::Default)
            })
            .collect();

        self.normalize(&MultiPolygon::new(polygons))
    }

    fn is_usable_loop(&self, ring: &LineString<f64>) -> bool {
        let mut distinct = ring.0.clone();
        distinct.dedup();
        if distinct.len() > 1 && distinct.first() == distinct.last() {
            distinct.pop();
        }
        distinct.len() >= 3
            && Polygon::new(ring.clone(), vec![]).unsigned_area() > self.tolerance * self.tolerance
    }

    fn clean(&self, region: Region) -> Region {
        let min_area = self.tolerance * self.tolerance;
        MultiPolygon::new(
            region
                .0
                .into_iter()
                .filter(|p| p.unsigned_area() > min_area)
                .collect(),
        )
    }
}

/// Unsigned area of a region.
pub fn region_area(region: &Region) -> f64 {
    region.unsigned_area()
}

/// Every boundary loop of a region: exteriors first, then holes, per polygon.
pub fn region_loops(region: &Region) -> Vec<LineString<f64>> {
    region
        .0
        .iter()
        .flat_map(|p| std::iter::once(p.exterior().clone()).chain(p.interiors().iter().cloned()))
        .collect()
}

/// Axis-aligned rectangle as a region.
pub fn rectangle(min: (f64, f64), max: (f64, f64)) -> Region {
    MultiPolygon::new(vec![Polygon::new(
        LineString::from(vec![
            (min.0, min.1),
            (max.0, min.1),
            (max.0, max.1),
            (min.0, max.1),
        ]),
        vec![],
    )])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(cx: f64, cy: f64, half: f64) -> LineString<f64> {
        LineString::from(vec![
            (cx - half, cy - half),
            (cx + half, cy - half),
            (cx + half, cy + half),
            (cx - half, cy + half),
        ])
    }

    #[test]
    fn test_union_of_overlapping_squares() {
        let engine = BooleanEngine::default();
        let a = engine.region_from_loops(&[square(0.0, 0.0, 1.0)]);
        let b = engine.region_from_loops(&[square(1.0, 0.0, 1.0)]);
        let u = engine.union(&a, &b);
        assert_eq!(u.0.len(), 1);
        assert!((region_area(&u) - 6.0).abs() < 1e-3);
    }

    #[test]
    fn test_difference_creates_hole() {
        let engine = BooleanEngine::default();
        let outer = rectangle((-10.0, -10.0), (10.0, 10.0));
        let inner = rectangle((-2.0, -2.0), (2.0, 2.0));
        let d = engine.difference(&outer, &inner);
        assert_eq!(d.0.len(), 1);
        assert_eq!(d.0[0].interiors().len(), 1);
        assert!((region_area(&d) - 384.0).abs() < 1e-3);
        assert_eq!(region_loops(&d).len(), 2);
    }

    #[test]
    fn test_inward_offset_of_square() {
        let engine = BooleanEngine::default();
        let r = rectangle((-100.0, -100.0), (100.0, 100.0));
        let shrunk = engine.offset(&r, -6.0);
        assert!((region_area(&shrunk) - 188.0 * 188.0).abs() < 1.0);
        assert!(engine.offset(&r, -101.0).0.is_empty());
    }

    #[test]
    fn test_loops_nest_by_containment() {
        let engine = BooleanEngine::default();
        let region = engine.region_from_loops(&[
            square(0.0, 0.0, 1.0),
            square(0.0, 0.0, 10.0),
            square(0.0, 0.0, 5.0),
        ]);
        // outer ring between 10 and 5, plus the island of half-width 1
        assert_eq!(region.0.len(), 2);
        let expected = 400.0 - 100.0 + 4.0;
        assert!((region_area(&region) - expected).abs() < 1e-3);
    }

    #[test]
    fn test_degenerate_loops_dropped() {
        let engine = BooleanEngine::default();
        let sliver = LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        assert!(engine.region_from_loops(&[sliver]).0.is_empty());
    }
}
