//! Waterline contouring around the drive geometry.

use crate::area_clearance::region_rings;
use crate::error::{CamToolError, CamToolResult, ParameterError};
use crate::layers::equal_step_layers;
use millkit_core::{Path, ToolSettings};
use millkit_geometry::{BooleanEngine, LayerSlicer, Mesh3D};
use millkit_settings::JobConfig;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct ContourParams {
    pub tool: ToolSettings,
    pub max_depth: Option<f64>,
    pub horizontal_allowance: f64,
}

impl ContourParams {
    pub fn new(tool: ToolSettings) -> Self {
        Self {
            tool,
            max_depth: None,
            horizontal_allowance: 0.0,
        }
    }

    pub fn from_config(config: &JobConfig) -> Self {
        Self {
            tool: config.tool.clone(),
            max_depth: config.clearance.max_depth,
            horizontal_allowance: config.clearance.horizontal_allowance,
        }
    }

    pub fn validate(&self) -> CamToolResult<()> {
        self.tool.validate()?;
        ParameterError::require_non_negative("horizontal_allowance", self.horizontal_allowance)?;
        if let Some(depth) = self.max_depth {
            ParameterError::require_positive("max_depth", depth)?;
        }
        Ok(())
    }
}

/// One closed tool-centre loop per drive island, at every layer.
#[derive(Debug, Clone)]
pub struct ContourPlanner {
    params: ContourParams,
    engine: BooleanEngine,
    slicer: LayerSlicer,
}

impl ContourPlanner {
    pub fn new(params: ContourParams, engine: BooleanEngine) -> Self {
        Self {
            params,
            engine,
            slicer: LayerSlicer::default(),
        }
    }

    /// Layers run from the top of `drive` down its full height, or to
    /// `max_depth` below the top.
    pub fn plan(&self, drive: &Mesh3D) -> CamToolResult<Vec<Path>> {
        if drive.is_empty() {
            return Err(CamToolError::MissingGeometry("drive mesh is empty".to_string()));
        }
        self.params.validate()?;

        let height = drive.extent().z;
        let depth = self.params.max_depth.map_or(height, |d| d.min(height));
        let top = drive.bounds_max.z;
        let offset = self.params.tool.radius() + self.params.horizontal_allowance;

        let mut paths = Vec::new();
        for z in equal_step_layers(top, depth, self.params.tool.step_down) {
            let slice = self.slicer.slice(&[drive], z, &self.engine);
            let rings = region_rings(&self.engine.offset(&slice, offset), z);
            debug!("Contour at z = {:.3}: {} loops", z, rings.len());
            paths.extend(rings);
        }

        info!("Contour: {} loops", paths.len());
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn test_block_contour_one_loop_per_layer() {
        let block = Mesh3D::cuboid(Point3::new(0.0, 0.0, 0.0), Point3::new(20.0, 10.0, 10.0));
        let planner = ContourPlanner::new(
            ContourParams::new(ToolSettings::end_mill(4.0, 2.0, 5.0)),
            BooleanEngine::default(),
        );
        let paths = planner.plan(&block).unwrap();
        // z = 5 is a real cut; z = 0 is the bottom face, which slices to the footprint.
        assert_eq!(paths.len(), 2);
        for path in &paths {
            let xs: Vec<f64> = path.positions().map(|p| p.x).collect();
            let min = xs.iter().cloned().fold(f64::INFINITY, f64::min);
            assert!((min + 2.0).abs() < 0.05);
        }
    }
}
