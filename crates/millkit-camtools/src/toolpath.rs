//! The toolpath aggregate handed to program emitters.

use millkit_core::{Path, ToolSettings};
use millkit_geometry::SafetyBoundary;
use serde::Serialize;

/// Cutting paths plus everything needed to route between them.
///
/// Mutated in place by the assembler; treat as read-only afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct Toolpath {
    pub name: String,
    pub paths: Vec<Path>,
    pub tool: ToolSettings,
    #[serde(skip)]
    pub boundary: SafetyBoundary,
    pub rapid_height: f64,
    pub safe_height: f64,
    /// Set once the paths have been merged into one linked sequence.
    pub assembled: bool,
}

/// Motion statistics of a toolpath.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToolpathSummary {
    pub paths: usize,
    pub waypoints: usize,
    pub rapid_length: f64,
    pub cutting_length: f64,
}

impl Toolpath {
    pub fn new(
        name: impl Into<String>,
        tool: ToolSettings,
        boundary: SafetyBoundary,
        rapid_height: f64,
        safe_height: f64,
    ) -> Self {
        Self {
            name: name.into(),
            paths: Vec::new(),
            tool,
            boundary,
            rapid_height,
            safe_height,
            assembled: false,
        }
    }

    pub fn with_paths(mut self, paths: Vec<Path>) -> Self {
        self.paths = paths;
        self
    }

    /// Deep copy of paths and settings; the safety geometry is shared.
    pub fn duplicate(&self) -> Toolpath {
        self.clone()
    }

    pub fn summary(&self) -> ToolpathSummary {
        let (rapid_length, cutting_length) = self
            .paths
            .iter()
            .map(Path::motion_lengths)
            .fold((0.0, 0.0), |(r, c), (pr, pc)| (r + pr, c + pc));
        ToolpathSummary {
            paths: self.paths.len(),
            waypoints: self.paths.iter().map(Path::len).sum(),
            rapid_length,
            cutting_length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use millkit_geometry::SafetyPlane;
    use nalgebra::Point3;

    #[test]
    fn test_duplicate_is_independent() {
        let original = Toolpath::new(
            "rough",
            ToolSettings::default(),
            SafetyPlane::horizontal(25.0).into(),
            25.0,
            5.0,
        )
        .with_paths(vec![Path::from_points([
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 4.0, 0.0),
        ])]);

        let mut copy = original.duplicate();
        copy.paths[0].waypoints[0].frame.origin.x = 99.0;
        copy.tool.diameter = 1.0;
        copy.paths.push(Path::new());

        assert_eq!(original.paths.len(), 1);
        assert_eq!(original.paths[0].waypoints[0].frame.origin.x, 0.0);
        assert_eq!(original.tool.diameter, ToolSettings::default().diameter);
    }

    #[test]
    fn test_summary_and_serialization() {
        let toolpath = Toolpath::new(
            "t",
            ToolSettings::default(),
            SafetyPlane::horizontal(10.0).into(),
            10.0,
            2.0,
        )
        .with_paths(vec![Path::from_points([
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 4.0, 0.0),
        ])]);
        let summary = toolpath.summary();
        assert_eq!(summary.waypoints, 2);
        assert!((summary.cutting_length - 5.0).abs() < 1e-12);

        let json = serde_json::to_value(&toolpath).unwrap();
        assert!(json.get("boundary").is_none());
        assert_eq!(json["paths"][0]["waypoints"][1]["type"], 0);
    }
}
