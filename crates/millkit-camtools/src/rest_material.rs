//! Lifts contour points that would cut below the finished drive surface.

use millkit_core::Path;
use millkit_geometry::MeshSurface;
use tracing::debug;

/// Raises points sitting deeper than the drive surface plus the vertical
/// allowance by more than the tolerance.
#[derive(Debug, Clone, Copy)]
pub struct RestMaterialAdjuster<'a> {
    drive: &'a MeshSurface,
    vertical_allowance: f64,
    vertical_tolerance: f64,
}

impl<'a> RestMaterialAdjuster<'a> {
    pub fn new(drive: &'a MeshSurface, vertical_allowance: f64, vertical_tolerance: f64) -> Self {
        Self {
            drive,
            vertical_allowance,
            vertical_tolerance,
        }
    }

    /// Adjusts `path` in place and returns how many points were raised.
    pub fn adjust(&self, path: &mut Path) -> usize {
        let mut raised = 0;
        for waypoint in path.waypoints.iter_mut() {
            let origin = waypoint.frame.origin;
            let Some(surface_z) = self.drive.height_at(origin.x, origin.y) else {
                continue;
            };
            let floor = surface_z + self.vertical_allowance;
            if floor - origin.z > self.vertical_tolerance {
                waypoint.frame.origin.z = floor;
                raised += 1;
            }
        }
        if raised > 0 {
            debug!("Rest material: raised {} points", raised);
        }
        raised
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use millkit_geometry::Mesh3D;
    use nalgebra::Point3;

    #[test]
    fn test_raises_only_points_below_surface() {
        let drive = Mesh3D::cuboid(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 10.0, 8.0));
        let surface = MeshSurface::new(&drive).unwrap();
        let adjuster = RestMaterialAdjuster::new(&surface, 0.5, 0.01);

        let mut path = Path::from_points([
            Point3::new(5.0, 5.0, 4.0),
            Point3::new(5.0, 5.0, 8.495),
            Point3::new(20.0, 5.0, 4.0),
        ]);
        assert_eq!(adjuster.adjust(&mut path), 1);
        assert!((path.waypoints[0].frame.origin.z - 8.5).abs() < 1e-9);
        assert!((path.waypoints[1].frame.origin.z - 8.495).abs() < 1e-12);
        assert_eq!(path.waypoints[2].frame.origin.z, 4.0);
    }
}
