//! Single-pass auxiliary strategies.
//!
//! These run alongside the two main planners and share their parameter and
//! error conventions, but keep no state across layers.

pub mod contour;
pub mod flowline;
pub mod profile;
pub mod raster;

pub use contour::{ContourParams, ContourPlanner};
pub use flowline::{FlowlineParams, FlowlinePlanner};
pub use profile::{ProfileParams, ProfilePlanner, ProfileSide};
pub use raster::{RasterParams, RasterPlanner};
