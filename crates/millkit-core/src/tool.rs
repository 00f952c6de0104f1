//! Cutting tool definition consumed read-only by every planner.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Tool types for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, Default)]
pub enum ToolType {
    /// Flat end mill
    #[default]
    EndMillFlat,
    /// Ball end mill / ball nose
    EndMillBall,
    /// Corner radius end mill
    EndMillCornerRadius,
    /// Drill bit (twist drill)
    DrillBit,
}

impl ToolType {
    /// Get all tool types
    pub fn all() -> &'static [ToolType] {
        &[
            ToolType::EndMillFlat,
            ToolType::EndMillBall,
            ToolType::EndMillCornerRadius,
            ToolType::DrillBit,
        ]
    }
}

impl std::fmt::Display for ToolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EndMillFlat => write!(f, "Flat End Mill"),
            Self::EndMillBall => write!(f, "Ball End Mill"),
            Self::EndMillCornerRadius => write!(f, "Corner Radius End Mill"),
            Self::DrillBit => write!(f, "Drill Bit"),
        }
    }
}

/// Tool geometry and cutting parameters.
///
/// Lengths are in millimetres, rates in mm/min and spindle speed in RPM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub name: String,
    pub tool_type: ToolType,
    pub diameter: f64,
    /// Lateral distance between adjacent passes.
    pub step_over: f64,
    /// Vertical distance between layers.
    pub step_down: f64,
    pub feed_rate: f64,
    pub plunge_rate: f64,
    pub rapid_rate: f64,
    pub spindle_speed: u32,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            name: "6mm flat end mill".to_string(),
            tool_type: ToolType::EndMillFlat,
            diameter: 6.0,
            step_over: 2.4,
            step_down: 2.0,
            feed_rate: 1200.0,
            plunge_rate: 300.0,
            rapid_rate: 5000.0,
            spindle_speed: 18000,
        }
    }
}

impl ToolSettings {
    /// Flat end mill with the given geometry and default rates.
    pub fn end_mill(diameter: f64, step_over: f64, step_down: f64) -> Self {
        Self {
            name: format!("{diameter}mm flat end mill"),
            diameter,
            step_over,
            step_down,
            ..Self::default()
        }
    }

    pub fn radius(&self) -> f64 {
        self.diameter / 2.0
    }

    /// Rejects non-positive geometry or rates.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("tool.diameter", self.diameter),
            ("tool.step_over", self.step_over),
            ("tool.step_down", self.step_down),
            ("tool.feed_rate", self.feed_rate),
            ("tool.plunge_rate", self.plunge_rate),
            ("tool.rapid_rate", self.rapid_rate),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::not_positive(name, value));
            }
        }
        if self.step_over > self.diameter {
            return Err(ConfigError::OutOfRange {
                name: "tool.step_over".to_string(),
                value: self.step_over,
                min: 0.0,
                max: self.diameter,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ToolSettings::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_diameter() {
        let tool = ToolSettings::end_mill(0.0, 1.0, 1.0);
        assert!(matches!(
            tool.validate(),
            Err(ConfigError::OutOfRange { ref name, .. }) if name == "tool.diameter"
        ));
    }

    #[test]
    fn test_validate_rejects_step_over_wider_than_tool() {
        let tool = ToolSettings::end_mill(6.0, 7.0, 1.0);
        assert!(tool.validate().is_err());
    }

    #[test]
    fn test_radius() {
        assert_eq!(ToolSettings::end_mill(12.0, 6.0, 10.0).radius(), 6.0);
    }
}
