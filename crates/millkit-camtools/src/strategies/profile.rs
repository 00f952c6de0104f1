//! Boundary profiling at stepped depths.

use crate::error::{CamToolError, CamToolResult, ParameterError};
use crate::layers::stepped_passes;
use millkit_core::{Path, ToolSettings};
use millkit_geometry::BoundaryCurve;
use millkit_settings::JobConfig;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Which side of the boundary the tool runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileSide {
    Inside,
    #[default]
    Outside,
    On,
}

impl fmt::Display for ProfileSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inside => write!(f, "Inside"),
            Self::Outside => write!(f, "Outside"),
            Self::On => write!(f, "On"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileParams {
    pub tool: ToolSettings,
    pub side: ProfileSide,
    pub top_z: f64,
    pub target_z: f64,
    pub allowance: f64,
    pub flatten_tolerance: f64,
}

impl ProfileParams {
    pub fn new(tool: ToolSettings, side: ProfileSide, top_z: f64, target_z: f64) -> Self {
        Self {
            tool,
            side,
            top_z,
            target_z,
            allowance: 0.0,
            flatten_tolerance: 0.01,
        }
    }

    pub fn from_config(config: &JobConfig, side: ProfileSide) -> Self {
        Self {
            tool: config.tool.clone(),
            side,
            top_z: config.pocket.top_z,
            target_z: config.pocket.target_z,
            allowance: config.pocket.wall_allowance,
            flatten_tolerance: config.kernel.tolerance.max(1e-4) * 10.0,
        }
    }

    pub fn validate(&self) -> CamToolResult<()> {
        self.tool.validate()?;
        ParameterError::require_non_negative("allowance", self.allowance)?;
        ParameterError::require_positive("flatten_tolerance", self.flatten_tolerance)?;
        if self.target_z.is_nan() || self.target_z >= self.top_z {
            return Err(ParameterError::InvalidValue {
                name: "target_z".to_string(),
                reason: format!("must be below top_z ({})", self.top_z),
            }
            .into());
        }
        Ok(())
    }

    fn offset_distance(&self) -> f64 {
        match self.side {
            ProfileSide::On => 0.0,
            _ => self.tool.radius() + self.allowance,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProfilePlanner {
    params: ProfileParams,
}

impl ProfilePlanner {
    pub fn new(params: ProfileParams) -> Self {
        Self { params }
    }

    /// Offset loops of every boundary, repeated at each pass depth.
    ///
    /// Boundaries too small for an inside profile yield nothing.
    pub fn plan(&self, boundaries: &[BoundaryCurve]) -> CamToolResult<Vec<Path>> {
        if boundaries.is_empty() {
            return Err(CamToolError::MissingGeometry(
                "no profile boundary curves".to_string(),
            ));
        }
        self.params.validate()?;

        let distance = self.params.offset_distance();
        let loops: Vec<Vec<(f64, f64)>> = boundaries
            .iter()
            .flat_map(|curve| match self.params.side {
                ProfileSide::On => vec![curve.clone()],
                ProfileSide::Inside => curve.offset_inward(distance),
                ProfileSide::Outside => curve.offset_outward(distance),
            })
            .map(|curve| curve.flatten(self.params.flatten_tolerance))
            .filter(|points| !points.is_empty())
            .collect();

        let depths = stepped_passes(
            self.params.top_z,
            self.params.target_z,
            self.params.tool.step_down,
        );
        let paths: Vec<Path> = depths
            .iter()
            .flat_map(|&z| {
                loops.iter().map(move |points| {
                    Path::from_points(
                        points
                            .iter()
                            .chain(points.first())
                            .map(|&(x, y)| Point3::new(x, y, z)),
                    )
                })
            })
            .collect();

        info!(
            "Profile ({}): {} loops x {} depths",
            self.params.side,
            loops.len(),
            depths.len()
        );
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> BoundaryCurve {
        BoundaryCurve::from_points(&[(0.0, 0.0), (20.0, 0.0), (20.0, 20.0), (0.0, 20.0)])
    }

    fn planner(side: ProfileSide) -> ProfilePlanner {
        ProfilePlanner::new(ProfileParams::new(
            ToolSettings::end_mill(4.0, 2.0, 3.0),
            side,
            0.0,
            -5.0,
        ))
    }

    #[test]
    fn test_sides_and_depths() {
        let inside = planner(ProfileSide::Inside).plan(&[square()]).unwrap();
        assert_eq!(inside.len(), 2);
        assert!(inside[0].positions().all(|p| p.x > 1.99 && p.x < 18.01));
        assert_eq!(inside[0].first().unwrap().frame.origin.z, -3.0);
        assert_eq!(inside[1].first().unwrap().frame.origin.z, -5.0);

        let on = planner(ProfileSide::On).plan(&[square()]).unwrap();
        assert_eq!(on[0].len(), 5);

        let outside = planner(ProfileSide::Outside).plan(&[square()]).unwrap();
        assert!(outside[0].positions().any(|p| p.x < -1.99));
    }

    #[test]
    fn test_inside_profile_of_tiny_boundary_is_empty() {
        let tiny = BoundaryCurve::from_points(&[(0.0, 0.0), (3.0, 0.0), (3.0, 3.0), (0.0, 3.0)]);
        let paths = planner(ProfileSide::Inside).plan(&[tiny]).unwrap();
        assert!(paths.is_empty());
        assert!(planner(ProfileSide::On).plan(&[]).is_err());
    }
}
