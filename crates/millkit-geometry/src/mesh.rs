//! # 3D Mesh Module
//!
//! Triangle meshes used for stock, drive and safety geometry.
//!
//! ## Supported Formats
//! - STL (STereoLithography), binary and ASCII
//!
//! ## Features
//! - Indexed and primitive (cuboid) construction
//! - STL import with optional scaling and centering
//! - Coordinate transformation

use crate::error::{GeometryError, GeometryResult};
use nalgebra::{Matrix4, Point3, Vector3};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// A 3D triangle made up of three vertices
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle3D {
    pub vertices: [Point3<f64>; 3],
    pub normal: Vector3<f64>,
}

impl Triangle3D {
    pub fn new(v1: Point3<f64>, v2: Point3<f64>, v3: Point3<f64>) -> Self {
        let normal = face_normal(&v1, &v2, &v3);
        Self {
            vertices: [v1, v2, v3],
            normal,
        }
    }

    /// Get bounding box of the triangle
    pub fn bounds(&self) -> (Point3<f64>, Point3<f64>) {
        let mut min = self.vertices[0];
        let mut max = self.vertices[0];
        for vertex in &self.vertices[1..] {
            min = min.inf(vertex);
            max = max.sup(vertex);
        }
        (min, max)
    }

    /// Check if triangle spans a horizontal plane at given Z height
    pub fn intersects_plane_z(&self, z: f64) -> bool {
        let (min, max) = self.bounds();
        z >= min.z && z <= max.z
    }

    /// Twice the triangle area; zero for degenerate faces.
    pub fn double_area(&self) -> f64 {
        (self.vertices[1] - self.vertices[0])
            .cross(&(self.vertices[2] - self.vertices[0]))
            .norm()
    }
}

fn face_normal(v1: &Point3<f64>, v2: &Point3<f64>, v3: &Point3<f64>) -> Vector3<f64> {
    (v2 - v1)
        .cross(&(v3 - v1))
        .try_normalize(f64::EPSILON)
        .unwrap_or_else(Vector3::zeros)
}

/// A 3D mesh model
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh3D {
    pub triangles: Vec<Triangle3D>,
    pub bounds_min: Point3<f64>,
    pub bounds_max: Point3<f64>,
}

impl Mesh3D {
    pub fn new(triangles: Vec<Triangle3D>) -> Self {
        let mut mesh = Self {
            triangles,
            bounds_min: Point3::origin(),
            bounds_max: Point3::origin(),
        };
        mesh.calculate_bounds();
        mesh
    }

    /// Builds a mesh from a shared vertex list and triangle indices.
    pub fn from_indexed(vertices: &[Point3<f64>], indices: &[[usize; 3]]) -> GeometryResult<Self> {
        let triangles = indices
            .iter()
            .map(|face| {
                let fetch = |i: usize| {
                    vertices.get(i).copied().ok_or_else(|| {
                        GeometryError::InvalidMesh(format!(
                            "vertex index {} out of range ({} vertices)",
                            i,
                            vertices.len()
                        ))
                    })
                };
                Ok(Triangle3D::new(fetch(face[0])?, fetch(face[1])?, fetch(face[2])?))
            })
            .collect::<GeometryResult<Vec<_>>>()?;
        Ok(Self::new(triangles))
    }

    /// Axis-aligned box with outward-facing triangles.
    pub fn cuboid(min: Point3<f64>, max: Point3<f64>) -> Self {
        let v = [
            Point3::new(min.x, min.y, min.z),
            Point3::new(max.x, min.y, min.z),
            Point3::new(max.x, max.y, min.z),
            Point3::new(min.x, max.y, min.z),
            Point3::new(min.x, min.y, max.z),
            Point3::new(max.x, min.y, max.z),
            Point3::new(max.x, max.y, max.z),
            Point3::new(min.x, max.y, max.z),
        ];
        const FACES: [[usize; 3]; 12] = [
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [1, 2, 6],
            [1, 6, 5],
            [2, 3, 7],
            [2, 7, 6],
            [3, 0, 4],
            [3, 4, 7],
        ];
        Self::new(
            FACES
                .iter()
                .map(|f| Triangle3D::new(v[f[0]], v[f[1]], v[f[2]]))
                .collect(),
        )
    }

    pub fn from_stl_mesh(stl_mesh: &stl_io::IndexedMesh) -> GeometryResult<Self> {
        let vertices: Vec<Point3<f64>> = stl_mesh
            .vertices
            .iter()
            .map(|v| Point3::new(v[0] as f64, v[1] as f64, v[2] as f64))
            .collect();
        let indices: Vec<[usize; 3]> = stl_mesh.faces.iter().map(|f| f.vertices).collect();
        Self::from_indexed(&vertices, &indices)
    }

    fn calculate_bounds(&mut self) {
        let Some(first) = self.triangles.first() else {
            self.bounds_min = Point3::origin();
            self.bounds_max = Point3::origin();
            return;
        };

        let (mut min, mut max) = first.bounds();
        for triangle in &self.triangles[1..] {
            let (tri_min, tri_max) = triangle.bounds();
            min = min.inf(&tri_min);
            max = max.sup(&tri_max);
        }

        self.bounds_min = min;
        self.bounds_max = max;
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Size of the bounding box along each axis.
    pub fn extent(&self) -> Vector3<f64> {
        self.bounds_max - self.bounds_min
    }

    /// Transform the mesh using a 4x4 transformation matrix
    pub fn transform(&mut self, transform: &Matrix4<f64>) {
        for triangle in &mut self.triangles {
            for vertex in &mut triangle.vertices {
                *vertex = transform.transform_point(vertex);
            }
            let [a, b, c] = triangle.vertices;
            triangle.normal = face_normal(&a, &b, &c);
        }
        self.calculate_bounds();
    }

    /// Scale the mesh uniformly
    pub fn scale(&mut self, factor: f64) {
        self.transform(&Matrix4::new_scaling(factor));
    }

    /// Translate the mesh
    pub fn translate(&mut self, offset: Vector3<f64>) {
        self.transform(&Matrix4::new_translation(&offset));
    }

    /// Center the mesh at the origin
    pub fn center(&mut self) {
        let center = nalgebra::center(&self.bounds_min, &self.bounds_max);
        self.translate(-center.coords);
    }

    /// Get all triangles that span a horizontal plane at Z height
    pub fn get_intersecting_triangles(&self, z: f64) -> Vec<&Triangle3D> {
        self.triangles
            .iter()
            .filter(|tri| tri.intersects_plane_z(z))
            .collect()
    }

    /// Shared-vertex representation for spatial query structures.
    ///
    /// Vertices with bit-identical coordinates are merged and faces with
    /// zero area are skipped.
    pub fn to_indexed(&self) -> (Vec<Point3<f64>>, Vec<[u32; 3]>) {
        let mut lookup: HashMap<[u64; 3], u32> = HashMap::new();
        let mut vertices = Vec::new();
        let mut indices = Vec::with_capacity(self.triangles.len());

        for triangle in self.triangles.iter().filter(|t| t.double_area() > 0.0) {
            let mut face = [0u32; 3];
            for (slot, vertex) in face.iter_mut().zip(&triangle.vertices) {
                let key = [vertex.x.to_bits(), vertex.y.to_bits(), vertex.z.to_bits()];
                *slot = *lookup.entry(key).or_insert_with(|| {
                    vertices.push(*vertex);
                    (vertices.len() - 1) as u32
                });
            }
            indices.push(face);
        }

        (vertices, indices)
    }
}

/// Supported 3D file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Model3DFormat {
    /// STL (STereoLithography) format
    Stl,
}

/// 3D model importer for converting 3D files to mesh representations
#[derive(Debug, Clone)]
pub struct Model3DImporter {
    pub scale: f64,
    pub center_model: bool,
}

impl Model3DImporter {
    pub fn new() -> Self {
        Self {
            scale: 1.0,
            center_model: false,
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_centering(mut self, center: bool) -> Self {
        self.center_model = center;
        self
    }

    /// Import 3D model from file path
    pub fn import_file(&self, path: &Path) -> GeometryResult<Mesh3D> {
        match self.detect_format(path)? {
            Model3DFormat::Stl => self.import_stl_file(path),
        }
    }

    /// Import STL from file path
    pub fn import_stl_file(&self, path: &Path) -> GeometryResult<Mesh3D> {
        debug!("Importing STL file: {}", path.display());

        let mut file = std::fs::File::open(path)?;
        let stl = stl_io::read_stl(&mut file).map_err(|e| GeometryError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        self.finish(stl)
    }

    /// Import STL from an in-memory buffer
    pub fn import_stl_data(&self, data: &[u8]) -> GeometryResult<Mesh3D> {
        debug!("Importing STL from binary data ({} bytes)", data.len());

        let mut cursor = std::io::Cursor::new(data);
        let stl = stl_io::read_stl(&mut cursor).map_err(|e| GeometryError::Parse {
            path: "<memory>".to_string(),
            reason: e.to_string(),
        })?;

        self.finish(stl)
    }

    fn finish(&self, stl: stl_io::IndexedMesh) -> GeometryResult<Mesh3D> {
        debug!("STL contains {} faces", stl.faces.len());

        let mut mesh = Mesh3D::from_stl_mesh(&stl)?;

        if self.scale != 1.0 {
            debug!("Scaling mesh by factor {}", self.scale);
            mesh.scale(self.scale);
        }

        if self.center_model {
            debug!("Centering mesh at origin");
            mesh.center();
        }

        debug!(
            "Final mesh bounds: {:?} to {:?}",
            mesh.bounds_min, mesh.bounds_max
        );

        Ok(mesh)
    }

    /// Detect file format from file extension
    fn detect_format(&self, path: &Path) -> GeometryResult<Model3DFormat> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|s| s.to_lowercase())
            .ok_or_else(|| GeometryError::UnsupportedFormat(path.display().to_string()))?;

        match extension.as_str() {
            "stl" => Ok(Model3DFormat::Stl),
            _ => Err(GeometryError::UnsupportedFormat(format!(".{}", extension))),
        }
    }
}

impl Default for Model3DImporter {
    fn default() -> Self {
        Self::new()
    }
}
