//! Closed boundary curves with arc segments.
//!
//! Pocket boundaries keep their arcs through repeated offsetting, so they
//! are held as `cavalier_contours` polylines (vertices carry a bulge) and
//! only flattened to points when a planner needs positions.

use cavalier_contours::polyline::{PlineSource, PlineSourceMut, PlineVertex, Polyline};
use cavalier_contours::shape_algorithms::{Shape, ShapeOffsetOptions};
use geo::{Contains, Coord, LineString, Polygon};
use std::f64::consts::PI;

/// A closed planar curve made of line and arc segments.
#[derive(Debug, Clone)]
pub struct BoundaryCurve {
    polyline: Polyline<f64>,
}

impl BoundaryCurve {
    /// Closed polygon through the given points.
    pub fn from_points(points: &[(f64, f64)]) -> Self {
        Self::from_vertices(points.iter().map(|&(x, y)| (x, y, 0.0)))
    }

    /// Closed curve from `(x, y, bulge)` vertices.
    pub fn from_vertices(vertices: impl IntoIterator<Item = (f64, f64, f64)>) -> Self {
        let mut polyline = Polyline::new();
        for (x, y, bulge) in vertices {
            polyline.add_vertex(PlineVertex::new(x, y, bulge));
        }
        polyline.set_is_closed(true);
        Self { polyline }
    }

    /// Full circle built from two half arcs.
    pub fn circle(center: (f64, f64), radius: f64) -> Self {
        Self::from_vertices([
            (center.0 - radius, center.1, 1.0),
            (center.0 + radius, center.1, 1.0),
        ])
    }

    pub fn from_line_string(ring: &LineString<f64>) -> Self {
        let mut coords: Vec<(f64, f64)> = ring.coords().map(|c| (c.x, c.y)).collect();
        if coords.len() > 1 && coords.first() == coords.last() {
            coords.pop();
        }
        Self::from_points(&coords)
    }

    pub fn polyline(&self) -> &Polyline<f64> {
        &self.polyline
    }

    pub fn vertex_count(&self) -> usize {
        self.polyline.vertex_count()
    }

    /// Signed area; positive for counter-clockwise curves.
    pub fn signed_area(&self) -> f64 {
        self.polyline.area()
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn is_counter_clockwise(&self) -> bool {
        self.signed_area() > 0.0
    }

    /// Same curve traversed the other way round.
    pub fn reversed(&self) -> Self {
        let n = self.vertex_count();
        let mut polyline = Polyline::new();
        for k in 0..n {
            // The segment ending at vertex i becomes the segment leaving it.
            let i = n - 1 - k;
            let v = self.polyline.at(i);
            let incoming = self.polyline.at((i + n - 1) % n);
            polyline.add_vertex(PlineVertex::new(v.x, v.y, -incoming.bulge));
        }
        polyline.set_is_closed(true);
        Self { polyline }
    }

    fn with_orientation(&self, counter_clockwise: bool) -> Self {
        if self.is_counter_clockwise() == counter_clockwise {
            self.clone()
        } else {
            self.reversed()
        }
    }

    /// Offsets towards the enclosed side by `distance`.
    ///
    /// Returns every resulting closed loop: none when the curve collapses,
    /// several when a narrow neck pinches off.
    pub fn offset_inward(&self, distance: f64) -> Vec<BoundaryCurve> {
        self.offset_signed(distance)
    }

    /// Offsets away from the enclosed side by `distance`.
    pub fn offset_outward(&self, distance: f64) -> Vec<BoundaryCurve> {
        self.offset_signed(-distance)
    }

    fn offset_signed(&self, inward: f64) -> Vec<BoundaryCurve> {
        if self.vertex_count() < 2 || inward == 0.0 {
            return vec![self.clone()];
        }
        // Positive offsets go left of the direction of travel, which is
        // inside for counter-clockwise curves.
        let delta = if self.is_counter_clockwise() {
            inward
        } else {
            -inward
        };
        let results: Vec<Polyline<f64>> = self.polyline.parallel_offset(delta);
        results
            .into_iter()
            .filter(|p| p.is_closed() && p.vertex_count() >= 2 && p.area().abs() > 1e-12)
            .map(|polyline| BoundaryCurve { polyline })
            .collect()
    }

    /// Points along the curve, arcs subdivided so that the chord error stays
    /// below `tolerance`. The loop is not repeated at the end.
    pub fn flatten(&self, tolerance: f64) -> Vec<(f64, f64)> {
        let n = self.polyline.vertex_count();
        let mut points = Vec::with_capacity(n);
        for i in 0..n {
            let v0 = self.polyline.at(i);
            let v1 = self.polyline.at((i + 1) % n);
            points.push((v0.x, v0.y));
            if v0.bulge.abs() > 1e-12 {
                arc_points((v0.x, v0.y), (v1.x, v1.y), v0.bulge, tolerance, &mut points);
            }
        }
        points
    }

    pub fn to_line_string(&self, tolerance: f64) -> LineString<f64> {
        let mut ring: LineString<f64> = self
            .flatten(tolerance)
            .into_iter()
            .map(|(x, y)| Coord { x, y })
            .collect();
        ring.close();
        ring
    }
}

/// An outer boundary with the holes cut out of it.
///
/// The outer loop is held counter-clockwise and every hole clockwise, the
/// convention `cavalier_contours` shapes use.
#[derive(Debug, Clone)]
pub struct BoundaryShape {
    pub outer: BoundaryCurve,
    pub holes: Vec<BoundaryCurve>,
}

impl BoundaryShape {
    pub fn new(outer: BoundaryCurve, holes: Vec<BoundaryCurve>) -> Self {
        Self {
            outer: outer.with_orientation(true),
            holes: holes.iter().map(|h| h.with_orientation(false)).collect(),
        }
    }

    /// Groups loose curves by containment depth: curves at even depth are
    /// outer boundaries, each curve at odd depth is a hole of the boundary
    /// directly enclosing it.
    pub fn nest(curves: &[BoundaryCurve], tolerance: f64) -> Vec<BoundaryShape> {
        let polygons: Vec<Polygon<f64>> = curves
            .iter()
            .map(|c| Polygon::new(c.to_line_string(tolerance), vec![]))
            .collect();
        let parents: Vec<Option<usize>> = (0..curves.len())
            .map(|i| {
                (0..curves.len())
                    .filter(|&j| j != i && polygons[j].contains(&polygons[i]))
                    .min_by(|&a, &b| curves[a].area().total_cmp(&curves[b].area()))
            })
            .collect();
        let depth = |mut i: usize| {
            let mut d = 0;
            while let Some(p) = parents[i] {
                d += 1;
                i = p;
            }
            d
        };

        let mut shapes = Vec::new();
        let mut slot = vec![None; curves.len()];
        for (i, curve) in curves.iter().enumerate() {
            if depth(i) % 2 == 0 {
                slot[i] = Some(shapes.len());
                shapes.push(BoundaryShape::new(curve.clone(), Vec::new()));
            }
        }
        for (i, curve) in curves.iter().enumerate() {
            if let Some(shape) = parents[i].and_then(|p| slot[p]) {
                if depth(i) % 2 == 1 {
                    shapes[shape].holes.push(curve.with_orientation(false));
                }
            }
        }
        shapes
    }

    /// Outer loop first, then the holes.
    pub fn loops(&self) -> impl Iterator<Item = &BoundaryCurve> {
        std::iter::once(&self.outer).chain(self.holes.iter())
    }

    pub fn loop_count(&self) -> usize {
        1 + self.holes.len()
    }

    /// Enclosed area, holes excluded.
    pub fn area(&self) -> f64 {
        self.outer.area() - self.holes.iter().map(BoundaryCurve::area).sum::<f64>()
    }

    /// Shrinks the outer loop and grows the holes by `distance`.
    ///
    /// Returns one shape per disjoint piece; empty once the material
    /// between boundary and holes is used up.
    pub fn offset_inward(&self, distance: f64, tolerance: f64) -> Vec<BoundaryShape> {
        if self.holes.is_empty() {
            return self
                .outer
                .offset_inward(distance)
                .into_iter()
                .map(|outer| BoundaryShape::new(outer, Vec::new()))
                .collect();
        }
        let shape = Shape::from_plines(self.loops().map(|c| c.polyline.clone()));
        let offset = shape.parallel_offset(distance, ShapeOffsetOptions::default());
        let curves: Vec<BoundaryCurve> = offset
            .ccw_plines
            .into_iter()
            .chain(offset.cw_plines)
            .map(|indexed| indexed.polyline)
            .filter(|p| p.is_closed() && p.vertex_count() >= 2 && p.area().abs() > 1e-12)
            .map(|polyline| BoundaryCurve { polyline })
            .collect();
        BoundaryShape::nest(&curves, tolerance)
    }

    /// Outer ring with the holes as interiors.
    pub fn to_polygon(&self, tolerance: f64) -> Polygon<f64> {
        Polygon::new(
            self.outer.to_line_string(tolerance),
            self.holes
                .iter()
                .map(|h| h.to_line_string(tolerance))
                .collect(),
        )
    }
}

/// Interior points of the arc from `p0` to `p1` with the given bulge.
fn arc_points(
    p0: (f64, f64),
    p1: (f64, f64),
    bulge: f64,
    tolerance: f64,
    out: &mut Vec<(f64, f64)>,
) {
    let chord = (p1.0 - p0.0, p1.1 - p0.1);
    let length = chord.0.hypot(chord.1);
    if length < f64::EPSILON {
        return;
    }
    let sweep = 4.0 * bulge.atan();
    let radius = length * (1.0 + bulge * bulge) / (4.0 * bulge.abs());
    let k = (1.0 - bulge * bulge) / (4.0 * bulge);
    let center = (
        (p0.0 + p1.0) / 2.0 - chord.1 * k,
        (p0.1 + p1.1) / 2.0 + chord.0 * k,
    );

    let tol = tolerance.max(1e-9).min(radius);
    let max_step = (2.0 * (1.0 - tol / radius).acos()).clamp(1e-3, PI / 4.0);
    let segments = (sweep.abs() / max_step).ceil().max(1.0) as usize;
    let start = (p0.1 - center.1).atan2(p0.0 - center.0);

    for s in 1..segments {
        let angle = start + sweep * s as f64 / segments as f64;
        out.push((
            center.0 + radius * angle.cos(),
            center.1 + radius * angle.sin(),
        ));
    }
}

/// Index of the point closest to `target`.
pub fn closest_index(points: &[(f64, f64)], target: (f64, f64)) -> Option<usize> {
    points
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            let da = (a.0 - target.0).hypot(a.1 - target.1);
            let db = (b.0 - target.0).hypot(b.1 - target.1);
            da.total_cmp(&db)
        })
        .map(|(i, _)| i)
}
