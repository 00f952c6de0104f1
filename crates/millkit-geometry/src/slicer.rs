//! Planar slicing of triangle meshes.
//!
//! A vertex counts as above the cutting plane only when it is strictly
//! above it, so each slice reports the cross-section of the material just
//! above the plane. Slicing exactly at a top face yields nothing and slicing
//! at a bottom face yields the footprint.

use crate::clipper::{BooleanEngine, Region};
use crate::mesh::{Mesh3D, Triangle3D};
use geo::{Coord, LineString};
use nalgebra::Point3;
use std::collections::HashMap;
use tracing::debug;

type Key = (i64, i64);

/// Cuts meshes with horizontal planes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerSlicer {
    tolerance: f64,
}

impl Default for LayerSlicer {
    fn default() -> Self {
        Self::new(1e-6)
    }
}

impl LayerSlicer {
    /// `tolerance` is the distance under which segment endpoints are joined.
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance: tolerance.abs().max(f64::EPSILON),
        }
    }

    /// Closed loops of the cross-section of `mesh` at height `z`.
    ///
    /// Loop orientation is arbitrary; open chains (non-manifold input) are
    /// discarded.
    pub fn slice_loops(&self, mesh: &Mesh3D, z: f64) -> Vec<LineString<f64>> {
        if mesh.is_empty() || z < mesh.bounds_min.z || z >= mesh.bounds_max.z {
            return Vec::new();
        }

        let segments: Vec<(Coord<f64>, Coord<f64>)> = mesh
            .get_intersecting_triangles(z)
            .into_iter()
            .filter_map(|tri| self.triangle_segment(tri, z))
            .collect();

        let loops = self.chain(&segments);
        debug!(
            "Slice at z = {:.4}: {} segments, {} loops",
            z,
            segments.len(),
            loops.len()
        );
        loops
    }

    /// Cross-section of several meshes as one region.
    pub fn slice(&self, meshes: &[&Mesh3D], z: f64, engine: &BooleanEngine) -> Region {
        let regions: Vec<Region> = meshes
            .iter()
            .map(|mesh| engine.region_from_loops(&self.slice_loops(mesh, z)))
            .collect();
        engine.union_all(regions.iter())
    }

    fn triangle_segment(&self, tri: &Triangle3D, z: f64) -> Option<(Coord<f64>, Coord<f64>)> {
        let mut hits = [Coord { x: 0.0, y: 0.0 }; 2];
        let mut count = 0;
        for i in 0..3 {
            let a = &tri.vertices[i];
            let b = &tri.vertices[(i + 1) % 3];
            if (a.z > z) != (b.z > z) {
                if count == 2 {
                    return None;
                }
                hits[count] = edge_crossing(a, b, z);
                count += 1;
            }
        }
        (count == 2 && self.key(&hits[0]) != self.key(&hits[1])).then_some((hits[0], hits[1]))
    }

    fn key(&self, c: &Coord<f64>) -> Key {
        (
            (c.x / self.tolerance).round() as i64,
            (c.y / self.tolerance).round() as i64,
        )
    }

    fn chain(&self, segments: &[(Coord<f64>, Coord<f64>)]) -> Vec<LineString<f64>> {
        let mut adjacency: HashMap<Key, Vec<usize>> = HashMap::new();
        for (i, (a, b)) in segments.iter().enumerate() {
            adjacency.entry(self.key(a)).or_default().push(i);
            adjacency.entry(self.key(b)).or_default().push(i);
        }

        let mut used = vec![false; segments.len()];
        let mut loops = Vec::new();
        let mut open_chains = 0usize;

        for start in 0..segments.len() {
            if used[start] {
                continue;
            }
            used[start] = true;

            let (first, second) = segments[start];
            let start_key = self.key(&first);
            let mut current = self.key(&second);
            let mut points = vec![first, second];
            let mut closed = false;

            loop {
                if current == start_key {
                    closed = true;
                    break;
                }
                let next = adjacency
                    .get(&current)
                    .and_then(|ids| ids.iter().copied().find(|&j| !used[j]));
                let Some(j) = next else {
                    break;
                };
                used[j] = true;
                let (a, b) = segments[j];
                let other = if self.key(&a) == current { b } else { a };
                points.push(other);
                current = self.key(&other);
            }

            if closed {
                points.pop();
                if points.len() >= 3 {
                    let mut ring = LineString::new(points);
                    ring.close();
                    loops.push(ring);
                }
            } else {
                open_chains += 1;
            }
        }

        if open_chains > 0 {
            debug!("Discarded {} open slice chains", open_chains);
        }
        loops
    }
}

/// Plane crossing of an edge, computed from a canonical endpoint order so
/// that the two triangles sharing an edge produce bit-identical points.
fn edge_crossing(a: &Point3<f64>, b: &Point3<f64>, z: f64) -> Coord<f64> {
    let (p, q) = if a.coords.as_slice() <= b.coords.as_slice() {
        (a, b)
    } else {
        (b, a)
    };
    let t = (z - p.z) / (q.z - p.z);
    Coord {
        x: p.x + t * (q.x - p.x),
        y: p.y + t * (q.y - p.y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipper::region_area;

    fn block() -> Mesh3D {
        Mesh3D::cuboid(Point3::new(-100.0, -100.0, 0.0), Point3::new(100.0, 100.0, 50.0))
    }

    #[test]
    fn test_mid_slice_is_single_square() {
        let slicer = LayerSlicer::default();
        let loops = slicer.slice_loops(&block(), 25.0);
        assert_eq!(loops.len(), 1);
        let region = BooleanEngine::default().region_from_loops(&loops);
        assert!((region_area(&region) - 40_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_extremal_heights() {
        let slicer = LayerSlicer::default();
        let engine = BooleanEngine::default();
        let mesh = block();
        assert!(slicer.slice_loops(&mesh, 50.0).is_empty());
        assert!(slicer.slice_loops(&mesh, 80.0).is_empty());
        assert!(slicer.slice_loops(&mesh, -1.0).is_empty());
        let floor = slicer.slice(&[&mesh], 0.0, &engine);
        assert!((region_area(&floor) - 40_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_hollow_frame_produces_hole() {
        let slicer = LayerSlicer::default();
        let engine = BooleanEngine::default();
        // Four bars forming a square frame.
        let bars = [
            Mesh3D::cuboid(Point3::new(-10.0, -10.0, 0.0), Point3::new(10.0, -8.0, 5.0)),
            Mesh3D::cuboid(Point3::new(-10.0, 8.0, 0.0), Point3::new(10.0, 10.0, 5.0)),
            Mesh3D::cuboid(Point3::new(-10.0, -8.0, 0.0), Point3::new(-8.0, 8.0, 5.0)),
            Mesh3D::cuboid(Point3::new(8.0, -8.0, 0.0), Point3::new(10.0, 8.0, 5.0)),
        ];
        let refs: Vec<&Mesh3D> = bars.iter().collect();
        let region = slicer.slice(&refs, 2.0, &engine);
        assert_eq!(region.0.len(), 1);
        assert_eq!(region.0[0].interiors().len(), 1);
        assert!((region_area(&region) - (400.0 - 256.0)).abs() < 1e-3);
    }
}
