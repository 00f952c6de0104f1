//! Error types for the CAM tools crate.
//!
//! Only fatal conditions become errors. Recoverable degradations during
//! planning are collected as [`crate::diagnostics::PlanWarning`]s instead.

use millkit_core::ConfigError;
use millkit_geometry::GeometryError;
use thiserror::Error;

/// Errors that can occur during toolpath planning.
#[derive(Error, Debug)]
pub enum CamToolError {
    /// Required stock, drive or boundary geometry is missing or empty.
    #[error("Missing geometry: {0}")]
    MissingGeometry(String),

    /// The working volume is too thin to plan in.
    #[error("Degenerate bounds: extent {extent} along {axis}")]
    DegenerateBounds { axis: char, extent: f64 },

    /// A geometry kernel operation failed.
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// A parameter validation error occurred.
    #[error("Parameter error: {0}")]
    Parameter(#[from] ParameterError),

    /// A job configuration error occurred.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors related to planner parameter validation.
#[derive(Error, Debug)]
pub enum ParameterError {
    /// A parameter value is out of the valid range.
    #[error("Parameter '{name}' out of range: {value} (valid: {min}..{max})")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// A parameter value is invalid.
    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue { name: String, reason: String },
}

impl ParameterError {
    /// Checks that `value` is finite and strictly positive.
    pub fn require_positive(name: &str, value: f64) -> ParameterResult<()> {
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(ParameterError::OutOfRange {
                name: name.to_string(),
                value,
                min: 0.0,
                max: f64::MAX,
            })
        }
    }

    /// Checks that `value` is finite and not negative.
    pub fn require_non_negative(name: &str, value: f64) -> ParameterResult<()> {
        if value.is_finite() && value >= 0.0 {
            Ok(())
        } else {
            Err(ParameterError::OutOfRange {
                name: name.to_string(),
                value,
                min: 0.0,
                max: f64::MAX,
            })
        }
    }
}

/// Result type alias for CAM tool operations.
pub type CamToolResult<T> = Result<T, CamToolError>;

/// Result type alias for parameter validation.
pub type ParameterResult<T> = Result<T, ParameterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cam_tool_error_display() {
        let err = CamToolError::MissingGeometry("stock mesh is empty".to_string());
        assert_eq!(err.to_string(), "Missing geometry: stock mesh is empty");

        let err = CamToolError::DegenerateBounds {
            axis: 'x',
            extent: 0.0,
        };
        assert_eq!(err.to_string(), "Degenerate bounds: extent 0 along x");
    }

    #[test]
    fn test_parameter_error_display() {
        let err = ParameterError::OutOfRange {
            name: "step_over".to_string(),
            value: -5.0,
            min: 0.0,
            max: 100.0,
        };
        assert_eq!(
            err.to_string(),
            "Parameter 'step_over' out of range: -5 (valid: 0..100)"
        );
    }

    #[test]
    fn test_require_helpers() {
        assert!(ParameterError::require_positive("d", 1.0).is_ok());
        assert!(ParameterError::require_positive("d", 0.0).is_err());
        assert!(ParameterError::require_positive("d", f64::NAN).is_err());
        assert!(ParameterError::require_non_negative("d", 0.0).is_ok());
        assert!(ParameterError::require_non_negative("d", -0.1).is_err());
    }

    #[test]
    fn test_error_conversion() {
        let cam_err: CamToolError = ParameterError::InvalidValue {
            name: "width".to_string(),
            reason: "must be > 0".to_string(),
        }
        .into();
        assert!(matches!(cam_err, CamToolError::Parameter(_)));

        let cam_err: CamToolError = GeometryError::EmptyMesh("drive".to_string()).into();
        assert!(matches!(cam_err, CamToolError::Geometry(_)));
    }
}
