//! Whole-contour rejection for passes hidden under overhangs.

use millkit_core::Path;
use millkit_geometry::SurfaceQuery;
use nalgebra::Vector3;

/// Distance the probe ray starts above each point, so a point resting on
/// the drive surface does not hit its own face.
const PROBE_LIFT: f64 = 1e-6;

/// Accepts a contour only when every point has a clear line of sight to
/// the tool axis direction.
#[derive(Debug, Clone, Copy)]
pub struct UndercutFilter<'a> {
    drive: &'a dyn SurfaceQuery,
    axis: Vector3<f64>,
}

impl<'a> UndercutFilter<'a> {
    /// Probes along +Z.
    pub fn new(drive: &'a dyn SurfaceQuery) -> Self {
        Self::along(drive, Vector3::z())
    }

    pub fn along(drive: &'a dyn SurfaceQuery, axis: Vector3<f64>) -> Self {
        Self {
            drive,
            axis: axis.try_normalize(f64::EPSILON).unwrap_or_else(Vector3::z),
        }
    }

    /// True when no point's probe ray hits the drive geometry.
    pub fn is_reachable(&self, path: &Path) -> bool {
        path.positions().all(|p| {
            let start = p + self.axis * PROBE_LIFT;
            self.drive.ray_intersect(&start, &self.axis).is_none()
        })
    }

    /// Splits contours into accepted and rejected, preserving order.
    pub fn partition(&self, paths: Vec<Path>) -> (Vec<Path>, Vec<Path>) {
        paths.into_iter().partition(|p| self.is_reachable(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use millkit_geometry::{Mesh3D, MeshSurface};
    use nalgebra::Point3;

    #[test]
    fn test_rejects_contour_under_overhang() {
        let shelf = Mesh3D::cuboid(Point3::new(0.0, 0.0, 20.0), Point3::new(10.0, 10.0, 25.0));
        let surface = MeshSurface::new(&shelf).unwrap();
        let filter = UndercutFilter::new(&surface);

        let open = Path::from_points([Point3::new(-5.0, 0.0, 0.0), Point3::new(-5.0, 10.0, 0.0)]);
        let hidden = Path::from_points([Point3::new(-5.0, 5.0, 0.0), Point3::new(5.0, 5.0, 0.0)]);
        let above = Path::from_points([Point3::new(5.0, 5.0, 30.0)]);

        let (kept, dropped) = filter.partition(vec![open, hidden, above]);
        assert_eq!(kept.len(), 2);
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].waypoints[1].frame.origin.x, 5.0);
    }
}
