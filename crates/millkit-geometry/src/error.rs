//! Error types for the geometry crate.

use std::io;
use thiserror::Error;

/// Errors raised while building or importing geometry.
#[derive(Error, Debug)]
pub enum GeometryError {
    /// A mesh contains no triangles.
    #[error("Mesh '{0}' is empty")]
    EmptyMesh(String),

    /// Mesh data is malformed (bad indices, kernel build failure).
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// Bounding extent along an axis is too small to work with.
    #[error("Degenerate bounds: extent {extent} along {axis} is below tolerance")]
    DegenerateBounds { axis: char, extent: f64 },

    /// The file extension is not recognized.
    #[error("Unsupported 3D file format: {0}")]
    UnsupportedFormat(String),

    /// Parsing a model file failed.
    #[error("Failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },

    /// I/O error during file reading.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias for geometry operations.
pub type GeometryResult<T> = Result<T, GeometryError>;
