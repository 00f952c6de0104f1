//! # millkit
//!
//! Toolpath planning for subtractive machining: layered stock-aware
//! roughing, island-splitting pocketing and safe linking of the resulting
//! passes into one motion sequence.
//!
//! ## Architecture
//!
//! millkit is organized as a workspace with multiple crates:
//!
//! 1. **millkit-core** - Frames, waypoints, paths, tool settings, errors
//! 2. **millkit-settings** - Job configuration (TOML/JSON)
//! 3. **millkit-geometry** - Meshes, slicing, polygon booleans, surface queries
//! 4. **millkit-camtools** - Planners and the toolpath assembler
//! 5. **millkit** - Command-line front end that ties them together

pub mod cli;
pub mod job;

pub use millkit_camtools as camtools;
pub use millkit_geometry as geometry;
pub use millkit_settings as settings;

pub use millkit_camtools::{
    AreaClearancePlanner, Diagnostics, PlanWarning, PocketPlanner, Toolpath, ToolpathAssembler,
};
pub use millkit_core::{MotionBits, MotionType, OrientedFrame, Path, ToolSettings, Waypoint};
pub use millkit_settings::JobConfig;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Output on stderr, so a program written to stdout stays clean
/// - RUST_LOG environment variable support, INFO otherwise
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(tracing::Level::INFO.to_string()));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
