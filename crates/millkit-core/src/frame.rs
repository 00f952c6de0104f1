//! Oriented frames: a position plus an orthonormal tool basis.
//!
//! Every sample a planner emits carries a full frame so that multi-axis
//! output can follow surface normals. For 3-axis work the frame is simply
//! the world XY basis translated to the tool centre.

use nalgebra::{Point3, Rotation3, Unit, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Tolerance used when checking basis orthonormality.
pub const BASIS_TOLERANCE: f64 = 1e-9;

/// A position with a right-handed orthonormal basis.
///
/// `z_axis` is the tool axis, pointing away from the material.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientedFrame {
    pub origin: Point3<f64>,
    pub x_axis: Vector3<f64>,
    pub y_axis: Vector3<f64>,
    pub z_axis: Vector3<f64>,
}

impl OrientedFrame {
    /// Builds a frame from an origin and two in-plane directions.
    ///
    /// The directions are orthonormalised (Gram-Schmidt on `y` against `x`);
    /// returns `None` when they are degenerate or parallel.
    pub fn new(origin: Point3<f64>, x_dir: Vector3<f64>, y_dir: Vector3<f64>) -> Option<Self> {
        let x = x_dir.try_normalize(BASIS_TOLERANCE)?;
        let y = (y_dir - x * x.dot(&y_dir)).try_normalize(BASIS_TOLERANCE)?;
        let z = x.cross(&y);
        Some(Self {
            origin,
            x_axis: x,
            y_axis: y,
            z_axis: z,
        })
    }

    /// World-aligned frame at `origin` (tool axis = +Z).
    pub fn world_xy(origin: Point3<f64>) -> Self {
        Self {
            origin,
            x_axis: Vector3::x(),
            y_axis: Vector3::y(),
            z_axis: Vector3::z(),
        }
    }

    /// Frame whose tool axis is `normal`; the x axis is chosen to stay as close
    /// as possible to world X.
    pub fn from_normal(origin: Point3<f64>, normal: Vector3<f64>) -> Option<Self> {
        let z = normal.try_normalize(BASIS_TOLERANCE)?;
        let reference = if z.x.abs() < 0.9 {
            Vector3::x()
        } else {
            Vector3::y()
        };
        let x = (reference - z * z.dot(&reference)).try_normalize(BASIS_TOLERANCE)?;
        let y = z.cross(&x);
        Some(Self {
            origin,
            x_axis: x,
            y_axis: y,
            z_axis: z,
        })
    }

    /// Rebuilds a frame from an origin and a rotation taking world axes to
    /// the frame axes.
    pub fn from_rotation(origin: Point3<f64>, rotation: &UnitQuaternion<f64>) -> Self {
        Self {
            origin,
            x_axis: rotation * Vector3::x(),
            y_axis: rotation * Vector3::y(),
            z_axis: rotation * Vector3::z(),
        }
    }

    /// The rotation taking world axes onto this frame's axes.
    pub fn rotation(&self) -> UnitQuaternion<f64> {
        let basis = Rotation3::from_basis_unchecked(&[self.x_axis, self.y_axis, self.z_axis]);
        UnitQuaternion::from_rotation_matrix(&basis)
    }

    /// Tool axis as a unit vector.
    pub fn tool_axis(&self) -> Unit<Vector3<f64>> {
        Unit::new_normalize(self.z_axis)
    }

    /// Same orientation, different origin.
    pub fn with_origin(&self, origin: Point3<f64>) -> Self {
        Self { origin, ..*self }
    }

    /// Copy of the frame moved by `distance` along its own tool axis.
    pub fn raised(&self, distance: f64) -> Self {
        self.with_origin(self.origin + self.z_axis * distance)
    }

    /// Copy of the frame translated by a world vector.
    pub fn translated(&self, delta: &Vector3<f64>) -> Self {
        self.with_origin(self.origin + delta)
    }

    /// Spherical interpolation of orientation and linear interpolation of
    /// origin between two frames.
    pub fn interpolate(&self, other: &OrientedFrame, t: f64) -> Self {
        let origin = self.origin + (other.origin - self.origin) * t;
        let rotation = slerp(&self.rotation(), &other.rotation(), t);
        Self::from_rotation(origin, &rotation)
    }

    /// Checks the unit-length and mutual-perpendicularity invariant.
    pub fn is_orthonormal(&self, tolerance: f64) -> bool {
        let unit = |v: &Vector3<f64>| (v.norm() - 1.0).abs() <= tolerance;
        unit(&self.x_axis)
            && unit(&self.y_axis)
            && unit(&self.z_axis)
            && self.x_axis.dot(&self.y_axis).abs() <= tolerance
            && self.y_axis.dot(&self.z_axis).abs() <= tolerance
            && self.z_axis.dot(&self.x_axis).abs() <= tolerance
            && (self.x_axis.cross(&self.y_axis) - self.z_axis).norm() <= tolerance
    }

    pub fn distance_to(&self, other: &OrientedFrame) -> f64 {
        (other.origin - self.origin).norm()
    }
}

/// Shortest-arc quaternion slerp that never panics.
///
/// Falls back to the start rotation when the interpolation is undefined.
pub fn slerp(a: &UnitQuaternion<f64>, b: &UnitQuaternion<f64>, t: f64) -> UnitQuaternion<f64> {
    a.try_slerp(b, t, 1e-12).unwrap_or(*a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_new_orthonormalises() {
        let frame = OrientedFrame::new(
            Point3::origin(),
            Vector3::new(2.0, 0.0, 0.0),
            Vector3::new(1.0, 3.0, 0.0),
        )
        .unwrap();
        assert!(frame.is_orthonormal(1e-12));
        assert!((frame.z_axis - Vector3::z()).norm() < 1e-12);
    }

    #[test]
    fn test_new_rejects_parallel_axes() {
        let frame = OrientedFrame::new(Point3::origin(), Vector3::x(), Vector3::x() * 4.0);
        assert!(frame.is_none());
    }

    #[test]
    fn test_from_normal_keeps_tool_axis() {
        let n = Vector3::new(0.0, 1.0, 1.0);
        let frame = OrientedFrame::from_normal(Point3::new(1.0, 2.0, 3.0), n).unwrap();
        assert!(frame.is_orthonormal(1e-12));
        assert!((frame.z_axis - n.normalize()).norm() < 1e-12);
    }

    #[test]
    fn test_rotation_round_trip() {
        let q = UnitQuaternion::from_euler_angles(0.3, -0.2, 1.1);
        let frame = OrientedFrame::from_rotation(Point3::new(5.0, 0.0, 0.0), &q);
        assert!(frame.rotation().angle_to(&q) < 1e-9);
    }

    #[test]
    fn test_raised_moves_along_own_axis() {
        let q = UnitQuaternion::from_euler_angles(FRAC_PI_2, 0.0, 0.0);
        let frame = OrientedFrame::from_rotation(Point3::origin(), &q);
        let raised = frame.raised(10.0);
        assert!((raised.origin.coords - frame.z_axis * 10.0).norm() < 1e-12);
        assert_eq!(raised.z_axis, frame.z_axis);
    }

    #[test]
    fn test_interpolate_midpoint() {
        let a = OrientedFrame::world_xy(Point3::origin());
        let q = UnitQuaternion::from_euler_angles(0.0, FRAC_PI_2, 0.0);
        let b = OrientedFrame::from_rotation(Point3::new(10.0, 0.0, 0.0), &q);
        let mid = a.interpolate(&b, 0.5);
        assert!((mid.origin.x - 5.0).abs() < 1e-12);
        assert!(mid.is_orthonormal(1e-9));
        let expected = a.rotation().angle_to(&b.rotation()) / 2.0;
        assert!((mid.rotation().angle_to(&a.rotation()) - expected).abs() < 1e-9);
    }
}
