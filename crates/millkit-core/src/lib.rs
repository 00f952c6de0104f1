//! # millkit core
//!
//! Value types shared by every planning stage: oriented frames, motion
//! classification, waypoints, paths and tool settings, plus the common
//! error types.

pub mod error;
pub mod frame;
pub mod motion;
pub mod path;
pub mod tool;
pub mod waypoint;

pub use error::{ConfigError, Error, Result};
pub use frame::{slerp, OrientedFrame};
pub use motion::{MotionBits, MotionType};
pub use path::Path;
pub use tool::{ToolSettings, ToolType};
pub use waypoint::Waypoint;
