//! # millkit camtools
//!
//! Toolpath planners for subtractive machining.
//!
//! - [`area_clearance`]: stock-aware layered roughing with a growing shadow
//! - [`pocket_islands`]: boundary pocketing that splits into islands at necks
//! - [`strategies`]: contour, profile, raster and flowline passes
//! - [`assembler`]: retraction, surface-following links and leads
//!
//! Planners return their paths together with [`Diagnostics`]; only missing
//! geometry and invalid parameters abort a run.

pub mod area_clearance;
pub mod assembler;
pub mod diagnostics;
pub mod error;
pub mod layers;
pub mod pocket_islands;
pub mod rest_material;
pub mod shadow;
pub mod strategies;
pub mod toolpath;
pub mod undercut;

pub use area_clearance::{
    region_rings, AreaClearanceParams, AreaClearancePlanner, AreaClearanceResult, ClearanceLayer,
};
pub use assembler::{AssemblerParams, LinkTrace, ToolpathAssembler};
pub use diagnostics::{Diagnostics, PlanWarning};
pub use error::{CamToolError, CamToolResult, ParameterError, ParameterResult};
pub use layers::{equal_step_layers, stepped_passes};
pub use pocket_islands::{
    IslandRecord, IslandTree, PocketLayer, PocketParams, PocketPlanner, PocketResult,
};
pub use rest_material::RestMaterialAdjuster;
pub use shadow::ShadowAccumulator;
pub use strategies::{
    ContourParams, ContourPlanner, FlowlineParams, FlowlinePlanner, ProfileParams,
    ProfilePlanner, ProfileSide, RasterParams, RasterPlanner,
};
pub use toolpath::{Toolpath, ToolpathSummary};
pub use undercut::UndercutFilter;
