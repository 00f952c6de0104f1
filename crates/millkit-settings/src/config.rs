//! Job configuration for millkit
//!
//! A job file describes everything a planning run needs besides geometry.
//! Supports JSON and TOML file formats.
//!
//! Configuration is organized into logical sections:
//! - Tool geometry and rates
//! - Area clearance (depth limit, rest allowances, undercut check)
//! - Island pocketing (depths, wall allowance)
//! - Raster and flowline finishing passes
//! - Safety boundary, retract and link parameters
//! - Polygon kernel tolerances

use millkit_core::{ConfigError, Error, Result, ToolSettings};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Offset corner join style for the polygon kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JoinStyle {
    /// Rounded corners
    #[default]
    Round,
    /// Sharp corners, limited by a miter ratio
    Miter,
    /// Squared-off corners
    Square,
}

impl std::fmt::Display for JoinStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Round => write!(f, "round"),
            Self::Miter => write!(f, "miter"),
            Self::Square => write!(f, "square"),
        }
    }
}

/// Safety boundary kind selected by the job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SafetyKind {
    /// Flat plane at `rapid_height`
    #[default]
    Plane,
    /// Triangle mesh supplied alongside the job
    Mesh,
}

/// Area clearance (stock-aware roughing) settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClearanceSettings {
    /// Depth limit below the stock top; `None` machines the full stock height
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<f64>,
    /// Material left on walls
    pub horizontal_allowance: f64,
    /// Material left on floors
    pub vertical_allowance: f64,
    /// Depth error tolerated before the rest-material pass lifts a point
    pub vertical_tolerance: f64,
    /// Lift ring points that sit below the drive surface
    pub rest_material: bool,
    /// Drop rings that would cut under an overhang
    pub undercut_check: bool,
    /// Also emit the tool-centre limit ring of each layer
    pub finish_boundary_ring: bool,
}

impl Default for ClearanceSettings {
    fn default() -> Self {
        Self {
            max_depth: None,
            horizontal_allowance: 0.0,
            vertical_allowance: 0.0,
            vertical_tolerance: 0.01,
            rest_material: false,
            undercut_check: false,
            finish_boundary_ring: false,
        }
    }
}

/// Island pocketing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PocketSettings {
    /// Z of the pocket top
    pub top_z: f64,
    /// Z of the pocket floor
    pub target_z: f64,
    /// Material left on pocket walls
    pub wall_allowance: f64,
}

impl Default for PocketSettings {
    fn default() -> Self {
        Self {
            top_z: 0.0,
            target_z: -5.0,
            wall_allowance: 0.0,
        }
    }
}

/// Raster and flowline finishing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinishingSettings {
    /// Cutting height of raster passes made without a drive surface
    pub raster_z: f64,
    /// Sample spacing along raster spans; half the step-over when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raster_sample_step: Option<f64>,
    /// Sample spacing along flowline rails
    pub flowline_sample_step: f64,
}

impl Default for FinishingSettings {
    fn default() -> Self {
        Self {
            raster_z: 0.0,
            raster_sample_step: None,
            flowline_sample_step: 1.0,
        }
    }
}

/// Safety boundary, retract and link settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetySettings {
    pub boundary: SafetyKind,
    /// Height of the safety plane above the origin
    pub rapid_height: f64,
    /// Normal of the safety plane
    pub plane_normal: [f64; 3],
    /// Distance a pass start/end is raised along its tool axis
    pub safe_height: f64,
    /// Retract along the plane normal rather than the tool axis
    pub vertical_retract: bool,
    /// Step length of a surface link trace
    pub link_step: f64,
    /// Step cap of a surface link trace
    pub max_link_steps: usize,
}

impl Default for SafetySettings {
    fn default() -> Self {
        Self {
            boundary: SafetyKind::Plane,
            rapid_height: 25.0,
            plane_normal: [0.0, 0.0, 1.0],
            safe_height: 5.0,
            vertical_retract: true,
            link_step: 1.0,
            max_link_steps: 2000,
        }
    }
}

/// Polygon kernel settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelSettings {
    /// Smallest distinguishable length; sets the integer quantization scale
    pub tolerance: f64,
    pub join_style: JoinStyle,
    /// Iteration cap for repeated inward offsetting
    pub loop_limit: usize,
}

impl Default for KernelSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-3,
            join_style: JoinStyle::Round,
            loop_limit: 500,
        }
    }
}

/// Complete job configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct JobConfig {
    pub tool: ToolSettings,
    pub clearance: ClearanceSettings,
    pub pocket: PocketSettings,
    pub finishing: FinishingSettings,
    pub safety: SafetySettings,
    pub kernel: KernelSettings,
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::OutOfRange {
            name: name.to_string(),
            value,
            min: 0.0,
            max: f64::MAX,
        }
        .into());
    }
    Ok(())
}

fn positive(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::not_positive(name, value).into());
    }
    Ok(())
}

impl JobConfig {
    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        let config: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)
                .map_err(|e| Error::other(format!("Invalid JSON job file: {}", e)))?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content)
                .map_err(|e| Error::other(format!("Invalid TOML job file: {}", e)))?
        } else {
            return Err(Error::other("Job file must be .json or .toml"));
        };

        config.validate()?;
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        self.validate()?;

        let content = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::to_string_pretty(self)
                .map_err(|e| Error::other(format!("Failed to serialize job: {}", e)))?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::to_string_pretty(self)
                .map_err(|e| Error::other(format!("Failed to serialize job: {}", e)))?
        } else {
            return Err(Error::other("Job file must be .json or .toml"));
        };

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.tool.validate()?;

        if let Some(depth) = self.clearance.max_depth {
            positive("clearance.max_depth", depth)?;
        }
        non_negative(
            "clearance.horizontal_allowance",
            self.clearance.horizontal_allowance,
        )?;
        non_negative(
            "clearance.vertical_allowance",
            self.clearance.vertical_allowance,
        )?;
        positive(
            "clearance.vertical_tolerance",
            self.clearance.vertical_tolerance,
        )?;

        non_negative("pocket.wall_allowance", self.pocket.wall_allowance)?;
        if self.pocket.target_z >= self.pocket.top_z {
            return Err(ConfigError::InvalidValue {
                name: "pocket.target_z".to_string(),
                reason: format!(
                    "must be below pocket.top_z ({} >= {})",
                    self.pocket.target_z, self.pocket.top_z
                ),
            }
            .into());
        }

        if !self.finishing.raster_z.is_finite() {
            return Err(ConfigError::InvalidValue {
                name: "finishing.raster_z".to_string(),
                reason: "must be finite".to_string(),
            }
            .into());
        }
        if let Some(step) = self.finishing.raster_sample_step {
            positive("finishing.raster_sample_step", step)?;
        }
        positive(
            "finishing.flowline_sample_step",
            self.finishing.flowline_sample_step,
        )?;

        non_negative("safety.safe_height", self.safety.safe_height)?;
        positive("safety.link_step", self.safety.link_step)?;
        if self.safety.max_link_steps == 0 {
            return Err(ConfigError::InvalidValue {
                name: "safety.max_link_steps".to_string(),
                reason: "must be > 0".to_string(),
            }
            .into());
        }
        let [nx, ny, nz] = self.safety.plane_normal;
        if (nx * nx + ny * ny + nz * nz).sqrt() < 1e-9 {
            return Err(ConfigError::InvalidValue {
                name: "safety.plane_normal".to_string(),
                reason: "must be a non-zero vector".to_string(),
            }
            .into());
        }

        positive("kernel.tolerance", self.kernel.tolerance)?;
        if self.kernel.loop_limit == 0 {
            return Err(ConfigError::InvalidValue {
                name: "kernel.loop_limit".to_string(),
                reason: "must be > 0".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = JobConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.kernel.loop_limit, 500);
        assert_eq!(config.safety.boundary, SafetyKind::Plane);
    }

    #[test]
    fn test_validate_rejects_inverted_pocket() {
        let mut config = JobConfig::default();
        config.pocket.target_z = 1.0;
        let err = config.validate().unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("pocket.target_z"));
    }

    #[test]
    fn test_validate_rejects_zero_loop_limit() {
        let mut config = JobConfig::default();
        config.kernel.loop_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_allowance() {
        let mut config = JobConfig::default();
        config.clearance.horizontal_allowance = -0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_keeps_io_error() {
        let path = Path::new("/nonexistent/millkit/job.toml");
        let err = JobConfig::load_from_file(path).unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
    }

    #[test]
    fn test_finishing_section_is_independent() {
        let config: JobConfig = toml::from_str(
            r#"
            [finishing]
            raster_z = -1.5
            flowline_sample_step = 0.25

            [safety]
            link_step = 4.0
            "#,
        )
        .unwrap();
        assert_eq!(config.finishing.raster_z, -1.5);
        assert_eq!(config.finishing.raster_sample_step, None);
        assert_eq!(config.finishing.flowline_sample_step, 0.25);
        assert_eq!(config.pocket.target_z, PocketSettings::default().target_z);

        let mut bad = config.clone();
        bad.finishing.raster_sample_step = Some(0.0);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: JobConfig = toml::from_str(
            r#"
            [tool]
            diameter = 12.0
            step_over = 6.0
            step_down = 10.0

            [kernel]
            join_style = "miter"
            "#,
        )
        .unwrap();
        assert_eq!(config.tool.diameter, 12.0);
        assert_eq!(config.tool.feed_rate, ToolSettings::default().feed_rate);
        assert_eq!(config.kernel.join_style, JoinStyle::Miter);
        assert_eq!(config.kernel.loop_limit, 500);
        assert!(config.validate().is_ok());
    }
}
