//! # millkit geometry
//!
//! Adapters over the geometry kernels the planners consume:
//! - [`mesh`]: triangle meshes and STL import
//! - [`slicer`]: mesh/plane cross-sections as closed loops
//! - [`clipper`]: polygon union/difference/offset on a quantized grid
//! - [`contours`]: arc-aware boundary curves and their offsets
//! - [`surface`]: ray and closest-point queries, safety boundaries

pub mod clipper;
pub mod contours;
pub mod error;
pub mod mesh;
pub mod slicer;
pub mod surface;

pub use clipper::{region_area, region_loops, BooleanEngine, OffsetJoin, Region};
pub use contours::{BoundaryCurve, BoundaryShape};
pub use error::{GeometryError, GeometryResult};
pub use mesh::{Mesh3D, Model3DImporter, Triangle3D};
pub use slicer::LayerSlicer;
pub use surface::{MeshSurface, SafetyBoundary, SafetyPlane, SurfacePoint, SurfaceQuery};
