//! Job inputs and the exported motion program.
//!
//! Everything here sits at the file boundary: boundary curves and rails are
//! read from JSON, and the assembled toolpath is written out with each
//! waypoint's motion encoded in the emitter bit layout.

use crate::camtools::{
    AreaClearanceParams, AreaClearancePlanner, AssemblerParams, ContourParams, ContourPlanner,
    Diagnostics, FlowlineParams, FlowlinePlanner, PlanWarning, PocketParams, PocketPlanner,
    ProfileParams, ProfilePlanner, ProfileSide, RasterParams, RasterPlanner, Toolpath,
    ToolpathAssembler, ToolpathSummary,
};
use crate::geometry::{
    BooleanEngine, BoundaryCurve, Mesh3D, MeshSurface, OffsetJoin, SafetyBoundary, SafetyPlane,
    SurfaceQuery,
};
use crate::settings::{JobConfig, JoinStyle, SafetyKind};
use anyhow::{anyhow, bail, Context, Result};
use millkit_core::{Path, ToolSettings, Waypoint};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Planning strategy selected for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Strategy {
    AreaClearance,
    Pocket,
    Contour,
    Profile,
    Raster,
    Flowline,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AreaClearance => "area-clearance",
            Self::Pocket => "pocket",
            Self::Contour => "contour",
            Self::Profile => "profile",
            Self::Raster => "raster",
            Self::Flowline => "flowline",
        };
        f.write_str(name)
    }
}

/// A boundary vertex: `[x, y]` or `[x, y, bulge]`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum VertexInput {
    Arc([f64; 3]),
    Point([f64; 2]),
}

/// 2D/3D guide geometry supplied alongside the meshes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BoundaryInput {
    /// Closed boundary curves.
    pub curves: Vec<Vec<VertexInput>>,
    /// Exactly two rails for flowline passes.
    pub rails: Vec<Vec<[f64; 3]>>,
}

impl BoundaryInput {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("invalid boundary JSON")
    }

    pub fn boundary_curves(&self) -> Vec<BoundaryCurve> {
        self.curves
            .iter()
            .filter(|curve| curve.len() >= 2)
            .map(|curve| {
                BoundaryCurve::from_vertices(curve.iter().map(|v| match *v {
                    VertexInput::Arc([x, y, bulge]) => (x, y, bulge),
                    VertexInput::Point([x, y]) => (x, y, 0.0),
                }))
            })
            .collect()
    }

    pub fn rail_points(&self) -> Result<(Vec<Point3<f64>>, Vec<Point3<f64>>)> {
        let [a, b] = self.rails.as_slice() else {
            bail!("flowline needs exactly two rails, got {}", self.rails.len());
        };
        Ok((rail_points(a), rail_points(b)))
    }
}

fn rail_points(rail: &[[f64; 3]]) -> Vec<Point3<f64>> {
    rail.iter().map(|&[x, y, z]| Point3::new(x, y, z)).collect()
}

/// Loaded inputs for one planning run.
#[derive(Debug, Default)]
pub struct JobInputs {
    pub stock: Option<Mesh3D>,
    pub drive: Option<Mesh3D>,
    pub safety: Option<Mesh3D>,
    pub boundary: BoundaryInput,
}

/// One waypoint as handed to a program emitter.
#[derive(Debug, Clone, Serialize)]
pub struct ExportWaypoint {
    pub position: [f64; 3],
    pub x_axis: [f64; 3],
    pub tool_axis: [f64; 3],
    /// Motion flags: 1 rapid, 2 plunge, 4 arc, 8 counter-clockwise.
    #[serde(rename = "type")]
    pub type_bits: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arc_radius: Option<f64>,
}

impl From<&Waypoint> for ExportWaypoint {
    fn from(waypoint: &Waypoint) -> Self {
        let f = &waypoint.frame;
        Self {
            position: [f.origin.x, f.origin.y, f.origin.z],
            x_axis: [f.x_axis.x, f.x_axis.y, f.x_axis.z],
            tool_axis: [f.z_axis.x, f.z_axis.y, f.z_axis.z],
            type_bits: waypoint.type_bits(),
            arc_radius: waypoint.arc_radius,
        }
    }
}

/// The document written by `millkit plan`.
#[derive(Debug, Clone, Serialize)]
pub struct ProgramExport {
    pub name: String,
    pub strategy: String,
    pub tool: ToolSettings,
    pub summary: ToolpathSummary,
    pub warnings: Vec<PlanWarning>,
    pub paths: Vec<Vec<ExportWaypoint>>,
}

impl ProgramExport {
    pub fn new(toolpath: &Toolpath, strategy: Strategy, diagnostics: &Diagnostics) -> Self {
        Self {
            name: toolpath.name.clone(),
            strategy: strategy.to_string(),
            tool: toolpath.tool.clone(),
            summary: toolpath.summary(),
            warnings: diagnostics.iter().cloned().collect(),
            paths: toolpath
                .paths
                .iter()
                .map(|p| p.iter().map(ExportWaypoint::from).collect())
                .collect(),
        }
    }
}

/// Runtime options that are not part of the job file.
#[derive(Debug, Clone, Copy)]
pub struct PlanOptions {
    pub strategy: Strategy,
    pub side: ProfileSide,
    pub raster_angle: f64,
    pub assemble: bool,
}

pub fn boolean_engine(config: &JobConfig) -> BooleanEngine {
    let join = match config.kernel.join_style {
        JoinStyle::Round => OffsetJoin::Round,
        JoinStyle::Miter => OffsetJoin::Miter,
        JoinStyle::Square => OffsetJoin::Square,
    };
    BooleanEngine::new(config.kernel.tolerance, join)
}

pub fn safety_boundary(config: &JobConfig, safety_mesh: Option<&Mesh3D>) -> Result<SafetyBoundary> {
    if let Some(mesh) = safety_mesh {
        return Ok(SafetyBoundary::Mesh(Arc::new(MeshSurface::new(mesh)?)));
    }
    match config.safety.boundary {
        SafetyKind::Mesh => bail!("safety boundary is 'mesh' but no safety mesh was given"),
        SafetyKind::Plane => {
            let [nx, ny, nz] = config.safety.plane_normal;
            let normal = Vector3::new(nx, ny, nz);
            let origin = Point3::new(0.0, 0.0, config.safety.rapid_height);
            let plane = SafetyPlane::new(origin, normal)
                .ok_or_else(|| anyhow!("safety plane normal must be non-zero"))?;
            Ok(plane.into())
        }
    }
}

fn require<'a>(mesh: &'a Option<Mesh3D>, what: &str, strategy: Strategy) -> Result<&'a Mesh3D> {
    mesh.as_ref()
        .ok_or_else(|| anyhow!("{} needs a {} mesh", strategy, what))
}

/// Runs the selected planner and, unless disabled, assembles its passes.
pub fn plan(config: &JobConfig, inputs: &JobInputs, options: PlanOptions) -> Result<ProgramExport> {
    config.validate().context("invalid job configuration")?;
    let engine = boolean_engine(config);
    let mut diagnostics = Diagnostics::new();

    let paths: Vec<Path> = match options.strategy {
        Strategy::AreaClearance => {
            let stock = require(&inputs.stock, "stock", options.strategy)?;
            let drive = require(&inputs.drive, "drive", options.strategy)?;
            let result = AreaClearancePlanner::new(AreaClearanceParams::from_config(config), engine)
                .plan(stock, drive)?;
            let paths = result.paths();
            diagnostics.extend(result.diagnostics);
            paths
        }
        Strategy::Pocket => {
            let result = PocketPlanner::new(PocketParams::from_config(config))
                .plan(&inputs.boundary.boundary_curves())?;
            let paths = result.paths();
            diagnostics.extend(result.diagnostics);
            paths
        }
        Strategy::Contour => {
            let drive = require(&inputs.drive, "drive", options.strategy)?;
            ContourPlanner::new(ContourParams::from_config(config), engine).plan(drive)?
        }
        Strategy::Profile => ProfilePlanner::new(ProfileParams::from_config(config, options.side))
            .plan(&inputs.boundary.boundary_curves())?,
        Strategy::Raster => {
            let tolerance = engine.tolerance() * 10.0;
            let loops: Vec<_> = inputs
                .boundary
                .boundary_curves()
                .iter()
                .map(|c| c.to_line_string(tolerance))
                .collect();
            let region = engine.region_from_loops(&loops);
            let surface = inputs.drive.as_ref().map(MeshSurface::new).transpose()?;
            RasterPlanner::new(RasterParams::from_config(config, options.raster_angle))
                .plan(&region, surface.as_ref())?
        }
        Strategy::Flowline => {
            let (a, b) = inputs.boundary.rail_points()?;
            let surface = inputs.drive.as_ref().map(MeshSurface::new).transpose()?;
            let query = surface.as_ref().map(|s| s as &dyn SurfaceQuery);
            FlowlinePlanner::new(FlowlineParams::from_config(config)).plan(&a, &b, query)?
        }
    };

    let boundary = safety_boundary(config, inputs.safety.as_ref())?;
    let mut toolpath = Toolpath::new(
        options.strategy.to_string(),
        config.tool.clone(),
        boundary,
        config.safety.rapid_height,
        config.safety.safe_height,
    )
    .with_paths(paths);

    if options.assemble {
        let assembler = ToolpathAssembler::new(AssemblerParams::from_config(config));
        diagnostics.extend(assembler.assemble(&mut toolpath)?);
    }

    info!("Planned '{}' with {} warnings", toolpath.name, diagnostics.len());
    Ok(ProgramExport::new(&toolpath, options.strategy, &diagnostics))
}
