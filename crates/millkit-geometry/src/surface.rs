//! Ray and closest-point queries against safety and drive geometry.
//!
//! Planners talk to geometry through [`SurfaceQuery`] only. Queries return
//! `Option`: a miss is an expected outcome the caller decides how to handle.

use crate::error::{GeometryError, GeometryResult};
use crate::mesh::Mesh3D;
use nalgebra::{Point3, Unit, Vector3};
use parry3d_f64::query::{PointQueryWithLocation, Ray, RayCast};
use parry3d_f64::shape::TriMesh;
use std::fmt;
use std::sync::Arc;

const PARALLEL_EPSILON: f64 = 1e-12;

/// A point on a surface together with the unit normal there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfacePoint {
    pub point: Point3<f64>,
    pub normal: Unit<Vector3<f64>>,
}

/// Geometry that can answer ray and closest-point queries.
pub trait SurfaceQuery: Send + Sync + fmt::Debug {
    /// First intersection of the ray `origin + t * direction`, `t >= 0`.
    fn ray_intersect(&self, origin: &Point3<f64>, direction: &Vector3<f64>)
        -> Option<Point3<f64>>;

    /// Closest surface point to `point`, with the normal oriented towards
    /// `point` when it lies off the surface.
    fn closest_point(&self, point: &Point3<f64>) -> Option<SurfacePoint>;
}

/// An infinite plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyPlane {
    pub origin: Point3<f64>,
    pub normal: Unit<Vector3<f64>>,
}

impl SafetyPlane {
    /// Returns `None` for a zero normal.
    pub fn new(origin: Point3<f64>, normal: Vector3<f64>) -> Option<Self> {
        Some(Self {
            origin,
            normal: Unit::try_new(normal, PARALLEL_EPSILON)?,
        })
    }

    /// Horizontal plane at height `z`.
    pub fn horizontal(z: f64) -> Self {
        Self {
            origin: Point3::new(0.0, 0.0, z),
            normal: Vector3::z_axis(),
        }
    }

    /// Signed distance from the plane, positive on the normal side.
    pub fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        self.normal.dot(&(point - self.origin))
    }

    /// Orthogonal projection onto the plane.
    pub fn project(&self, point: &Point3<f64>) -> Point3<f64> {
        point - self.normal.into_inner() * self.signed_distance(point)
    }

    /// Intersection with the full line through `origin` along `direction`,
    /// in either direction. `None` when the line is parallel to the plane.
    pub fn line_intersect(
        &self,
        origin: &Point3<f64>,
        direction: &Vector3<f64>,
    ) -> Option<Point3<f64>> {
        let t = self.line_parameter(origin, direction)?;
        Some(origin + direction * t)
    }

    fn line_parameter(&self, origin: &Point3<f64>, direction: &Vector3<f64>) -> Option<f64> {
        let denom = self.normal.dot(direction);
        if denom.abs() < PARALLEL_EPSILON {
            return None;
        }
        Some(-self.signed_distance(origin) / denom)
    }
}

impl SurfaceQuery for SafetyPlane {
    fn ray_intersect(
        &self,
        origin: &Point3<f64>,
        direction: &Vector3<f64>,
    ) -> Option<Point3<f64>> {
        let t = self.line_parameter(origin, direction)?;
        (t >= 0.0).then(|| origin + direction * t)
    }

    fn closest_point(&self, point: &Point3<f64>) -> Option<SurfacePoint> {
        let normal = if self.signed_distance(point) < 0.0 {
            -self.normal
        } else {
            self.normal
        };
        Some(SurfacePoint {
            point: self.project(point),
            normal,
        })
    }
}

/// A triangle mesh prepared for spatial queries.
#[derive(Clone)]
pub struct MeshSurface {
    trimesh: TriMesh,
    bounds_min: Point3<f64>,
    bounds_max: Point3<f64>,
}

impl fmt::Debug for MeshSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshSurface")
            .field("triangles", &self.trimesh.indices().len())
            .field("bounds_min", &self.bounds_min)
            .field("bounds_max", &self.bounds_max)
            .finish()
    }
}

impl MeshSurface {
    pub fn new(mesh: &Mesh3D) -> GeometryResult<Self> {
        let (vertices, indices) = mesh.to_indexed();
        if indices.is_empty() {
            return Err(GeometryError::EmptyMesh("surface".to_string()));
        }
        let trimesh = TriMesh::new(vertices, indices)
            .map_err(|e| GeometryError::InvalidMesh(format!("{:?}", e)))?;
        Ok(Self {
            trimesh,
            bounds_min: mesh.bounds_min,
            bounds_max: mesh.bounds_max,
        })
    }

    pub fn bounds(&self) -> (Point3<f64>, Point3<f64>) {
        (self.bounds_min, self.bounds_max)
    }

    /// Distance along `direction` (unit or not) to the first hit.
    pub fn ray_parameter(&self, origin: &Point3<f64>, direction: &Vector3<f64>) -> Option<f64> {
        let ray = Ray::new(*origin, *direction);
        self.trimesh
            .cast_local_ray_and_get_normal(&ray, f64::MAX, false)
            .map(|hit| hit.time_of_impact)
    }

    /// Height of the highest surface point directly below or above `(x, y)`.
    pub fn height_at(&self, x: f64, y: f64) -> Option<f64> {
        let start = Point3::new(x, y, self.bounds_max.z + 1.0);
        self.ray_intersect(&start, &-Vector3::z()).map(|p| p.z)
    }
}

impl SurfaceQuery for MeshSurface {
    fn ray_intersect(
        &self,
        origin: &Point3<f64>,
        direction: &Vector3<f64>,
    ) -> Option<Point3<f64>> {
        let t = self.ray_parameter(origin, direction)?;
        Some(origin + direction * t)
    }

    fn closest_point(&self, point: &Point3<f64>) -> Option<SurfacePoint> {
        let (projection, (triangle_id, _)) = self
            .trimesh
            .project_local_point_and_get_location(point, false);
        let face_normal = self.trimesh.triangle(triangle_id).normal()?;
        let normal = if face_normal.dot(&(point - projection.point)) < 0.0 {
            -face_normal
        } else {
            face_normal
        };
        Some(SurfacePoint {
            point: projection.point,
            normal,
        })
    }
}

/// Where the tool retreats to between passes.
#[derive(Debug, Clone)]
pub enum SafetyBoundary {
    Plane(SafetyPlane),
    Mesh(Arc<MeshSurface>),
    Surface(Arc<dyn SurfaceQuery>),
}

impl SafetyBoundary {
    pub fn is_plane(&self) -> bool {
        matches!(self, SafetyBoundary::Plane(_))
    }

    pub fn query(&self) -> &dyn SurfaceQuery {
        match self {
            SafetyBoundary::Plane(plane) => plane,
            SafetyBoundary::Mesh(mesh) => mesh.as_ref(),
            SafetyBoundary::Surface(surface) => surface.as_ref(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SafetyBoundary::Plane(_) => "plane",
            SafetyBoundary::Mesh(_) => "mesh",
            SafetyBoundary::Surface(_) => "surface",
        }
    }
}

impl From<SafetyPlane> for SafetyBoundary {
    fn from(plane: SafetyPlane) -> Self {
        SafetyBoundary::Plane(plane)
    }
}

impl From<MeshSurface> for SafetyBoundary {
    fn from(mesh: MeshSurface) -> Self {
        SafetyBoundary::Mesh(Arc::new(mesh))
    }
}
