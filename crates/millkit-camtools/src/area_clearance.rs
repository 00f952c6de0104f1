//! Stock-aware roughing by nested inward offsets.
//!
//! For every layer the material still standing is the stock cross-section
//! minus everything the drive geometry has shadowed from above. The tool
//! centre limit of that region is then shrunk by the step-over until it
//! vanishes, and each shrink contributes one set of rings.

use crate::diagnostics::{Diagnostics, PlanWarning};
use crate::error::{CamToolError, CamToolResult, ParameterError};
use crate::layers::equal_step_layers;
use crate::rest_material::RestMaterialAdjuster;
use crate::shadow::ShadowAccumulator;
use crate::undercut::UndercutFilter;
use millkit_core::{Path, ToolSettings};
use millkit_geometry::{region_loops, BooleanEngine, LayerSlicer, Mesh3D, MeshSurface, Region};
use millkit_settings::JobConfig;
use nalgebra::Point3;
use serde::Serialize;
use tracing::{debug, info};

/// Smallest stock extent accepted on any axis.
pub const MIN_EXTENT: f64 = 1e-6;

/// Parameters for an area clearance run.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaClearanceParams {
    pub tool: ToolSettings,
    /// Depth limit below the stock top; `None` machines the full height.
    pub max_depth: Option<f64>,
    pub horizontal_allowance: f64,
    pub vertical_allowance: f64,
    pub vertical_tolerance: f64,
    pub rest_material: bool,
    pub undercut_check: bool,
    /// Also emit the tool-centre limit ring of each layer.
    pub finish_boundary_ring: bool,
    pub loop_limit: usize,
}

impl AreaClearanceParams {
    pub fn new(tool: ToolSettings) -> Self {
        Self {
            tool,
            max_depth: None,
            horizontal_allowance: 0.0,
            vertical_allowance: 0.0,
            vertical_tolerance: 0.01,
            rest_material: false,
            undercut_check: false,
            finish_boundary_ring: false,
            loop_limit: 500,
        }
    }

    pub fn from_config(config: &JobConfig) -> Self {
        Self {
            tool: config.tool.clone(),
            max_depth: config.clearance.max_depth,
            horizontal_allowance: config.clearance.horizontal_allowance,
            vertical_allowance: config.clearance.vertical_allowance,
            vertical_tolerance: config.clearance.vertical_tolerance,
            rest_material: config.clearance.rest_material,
            undercut_check: config.clearance.undercut_check,
            finish_boundary_ring: config.clearance.finish_boundary_ring,
            loop_limit: config.kernel.loop_limit,
        }
    }

    pub fn validate(&self) -> CamToolResult<()> {
        self.tool.validate()?;
        if let Some(depth) = self.max_depth {
            ParameterError::require_positive("max_depth", depth)?;
        }
        ParameterError::require_non_negative("horizontal_allowance", self.horizontal_allowance)?;
        ParameterError::require_non_negative("vertical_allowance", self.vertical_allowance)?;
        ParameterError::require_positive("vertical_tolerance", self.vertical_tolerance)?;
        if self.loop_limit == 0 {
            return Err(ParameterError::InvalidValue {
                name: "loop_limit".to_string(),
                reason: "must be > 0".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Distance kept between the tool centre and material that must stay.
    pub fn wall_margin(&self) -> f64 {
        self.tool.radius() + self.horizontal_allowance
    }
}

/// Rings produced for one layer.
#[derive(Debug, Clone, Serialize)]
pub struct ClearanceLayer {
    pub index: usize,
    pub z: f64,
    pub rings: Vec<Path>,
    /// Shadow area after this layer's drive slice was folded in.
    pub shadow_area: f64,
    pub limit_reached: bool,
    /// Rings dropped by the undercut check.
    pub undercut_rejected: usize,
}

/// Output of [`AreaClearancePlanner::plan`].
#[derive(Debug, Clone, Serialize)]
pub struct AreaClearanceResult {
    pub layers: Vec<ClearanceLayer>,
    pub diagnostics: Diagnostics,
}

impl AreaClearanceResult {
    /// All rings, ordered by layer then ring index.
    pub fn paths(&self) -> Vec<Path> {
        self.layers
            .iter()
            .flat_map(|layer| layer.rings.iter().cloned())
            .collect()
    }

    pub fn ring_counts(&self) -> Vec<usize> {
        self.layers.iter().map(|l| l.rings.len()).collect()
    }

    pub fn cutting_length(&self) -> f64 {
        self.layers
            .iter()
            .flat_map(|l| l.rings.iter())
            .map(Path::length)
            .sum()
    }
}

/// Layered roughing planner.
#[derive(Debug, Clone)]
pub struct AreaClearancePlanner {
    params: AreaClearanceParams,
    engine: BooleanEngine,
    slicer: LayerSlicer,
}

impl AreaClearancePlanner {
    pub fn new(params: AreaClearanceParams, engine: BooleanEngine) -> Self {
        Self {
            params,
            engine,
            slicer: LayerSlicer::default(),
        }
    }

    pub fn params(&self) -> &AreaClearanceParams {
        &self.params
    }

    /// Plans every layer of `stock` outside the region shadowed by `drive`.
    pub fn plan(&self, stock: &Mesh3D, drive: &Mesh3D) -> CamToolResult<AreaClearanceResult> {
        if stock.is_empty() {
            return Err(CamToolError::MissingGeometry("stock mesh is empty".to_string()));
        }
        if drive.is_empty() {
            return Err(CamToolError::MissingGeometry("drive mesh is empty".to_string()));
        }
        self.params.validate()?;

        let extent = stock.extent();
        for (axis, value) in [('x', extent.x), ('y', extent.y), ('z', extent.z)] {
            if value.is_nan() || value <= MIN_EXTENT {
                return Err(CamToolError::DegenerateBounds {
                    axis,
                    extent: value,
                });
            }
        }

        let top = stock.bounds_max.z;
        let depth = self
            .params
            .max_depth
            .map_or(extent.z, |limit| limit.min(extent.z));
        let heights = equal_step_layers(top, depth, self.params.tool.step_down);

        let needs_surface = self.params.rest_material || self.params.undercut_check;
        let drive_surface = if needs_surface {
            Some(MeshSurface::new(drive)?)
        } else {
            None
        };

        info!(
            "Area clearance: {} layers from z = {:.3} to z = {:.3}",
            heights.len(),
            top,
            top - depth
        );

        let mut diagnostics = Diagnostics::new();
        let seed = self.slicer.slice(&[drive], top, &self.engine);
        let (_, layers) = heights.iter().enumerate().fold(
            (ShadowAccumulator::new(seed), Vec::with_capacity(heights.len())),
            |(shadow, mut layers), (index, &z)| {
                let stock_slice = self.slicer.slice(&[stock], z, &self.engine);
                let drive_slice = self.slicer.slice(&[drive], z, &self.engine);
                let (shadow, mut layer) =
                    self.plan_layer(shadow, &stock_slice, &drive_slice, index, z, &mut diagnostics);
                if let Some(surface) = drive_surface.as_ref() {
                    self.post_process(&mut layer, surface, &mut diagnostics);
                }
                layers.push(layer);
                (shadow, layers)
            },
        );

        let result = AreaClearanceResult {
            layers,
            diagnostics,
        };
        info!(
            "Area clearance complete: {} rings, cutting length {:.1}",
            result.ring_counts().iter().sum::<usize>(),
            result.cutting_length()
        );
        Ok(result)
    }

    /// One step of the layer fold: grows the shadow, then generates the
    /// rings for the material left at `z`.
    pub fn plan_layer(
        &self,
        shadow: ShadowAccumulator,
        stock_slice: &Region,
        drive_slice: &Region,
        index: usize,
        z: f64,
        diagnostics: &mut Diagnostics,
    ) -> (ShadowAccumulator, ClearanceLayer) {
        let shadow = shadow.accumulate(&self.engine, drive_slice);
        let margin = self.params.wall_margin();

        let reachable = self.engine.offset(stock_slice, margin);
        let remaining = self.engine.difference(&reachable, shadow.region());
        let limit = self.engine.offset(&remaining, -margin);

        let mut rings = Vec::new();
        if self.params.finish_boundary_ring {
            rings.extend(region_rings(&limit, z));
        }

        let mut current = limit;
        let mut iterations = 0;
        let mut limit_reached = false;
        while !current.0.is_empty() {
            if iterations >= self.params.loop_limit {
                limit_reached = true;
                diagnostics.push(PlanWarning::LoopLimitReached {
                    context: format!("layer {}", index),
                    z,
                    limit: self.params.loop_limit,
                });
                break;
            }
            iterations += 1;
            current = self.engine.offset(&current, -self.params.tool.step_over);
            rings.extend(region_rings(&current, z));
        }

        debug!(
            "Layer {} at z = {:.3}: {} rings, shadow area {:.3}",
            index,
            z,
            rings.len(),
            shadow.area()
        );

        let layer = ClearanceLayer {
            index,
            z,
            rings,
            shadow_area: shadow.area(),
            limit_reached,
            undercut_rejected: 0,
        };
        (shadow, layer)
    }

    fn post_process(
        &self,
        layer: &mut ClearanceLayer,
        surface: &MeshSurface,
        diagnostics: &mut Diagnostics,
    ) {
        if self.params.rest_material {
            let adjuster = RestMaterialAdjuster::new(
                surface,
                self.params.vertical_allowance,
                self.params.vertical_tolerance,
            );
            for ring in layer.rings.iter_mut() {
                adjuster.adjust(ring);
            }
        }
        if self.params.undercut_check {
            let filter = UndercutFilter::new(surface);
            let (kept, rejected) = filter.partition(std::mem::take(&mut layer.rings));
            for _ in &rejected {
                diagnostics.push(PlanWarning::UndercutRemoved { z: layer.z });
            }
            layer.rings = kept;
            layer.undercut_rejected = rejected.len();
        }
    }
}

/// Closed feed paths at height `z`, one per boundary loop of `region`.
pub fn region_rings(region: &Region, z: f64) -> Vec<Path> {
    region_loops(region)
        .iter()
        .map(|ring| Path::from_points(ring.coords().map(|c| Point3::new(c.x, c.y, z))))
        .collect()
}
