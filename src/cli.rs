//! Command-line interface.
//!
//! Usage:
//!   millkit plan --strategy area-clearance --stock stock.stl --drive part.stl -o out.json
//!   millkit plan --strategy pocket --boundary curves.json --config job.toml
//!   millkit config > job.toml

use crate::camtools::ProfileSide;
use crate::geometry::{Mesh3D, Model3DImporter};
use crate::job::{self, BoundaryInput, JobInputs, PlanOptions, Strategy};
use crate::settings::JobConfig;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Toolpath planner for subtractive machining
#[derive(Parser, Debug)]
#[command(name = "millkit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Plan a toolpath and write the motion program as JSON
    Plan(PlanArgs),
    /// Print the default job configuration as TOML
    Config,
}

#[derive(clap::Args, Debug)]
pub struct PlanArgs {
    /// Planning strategy
    #[arg(short, long, value_enum, default_value_t = Strategy::AreaClearance)]
    pub strategy: Strategy,

    /// Job configuration file (TOML or JSON)
    #[arg(short, long, value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Stock mesh (STL)
    #[arg(long, value_name = "STL")]
    pub stock: Option<PathBuf>,

    /// Drive/part mesh (STL)
    #[arg(long, value_name = "STL")]
    pub drive: Option<PathBuf>,

    /// Safety mesh (STL); overrides the configured safety plane
    #[arg(long, value_name = "STL")]
    pub safety: Option<PathBuf>,

    /// Boundary curves and rails (JSON)
    #[arg(long, value_name = "JSON")]
    pub boundary: Option<PathBuf>,

    /// Side of the boundary for profile passes
    #[arg(long, value_enum, default_value_t = SideArg::Outside)]
    pub side: SideArg,

    /// Raster scan angle in degrees
    #[arg(long, default_value = "0")]
    pub angle: f64,

    /// Keep the raw passes instead of linking them
    #[arg(long)]
    pub no_assemble: bool,

    /// Output file; stdout when omitted
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SideArg {
    Inside,
    Outside,
    On,
}

impl From<SideArg> for ProfileSide {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Inside => ProfileSide::Inside,
            SideArg::Outside => ProfileSide::Outside,
            SideArg::On => ProfileSide::On,
        }
    }
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Plan(args) => run_plan(&args),
            Commands::Config => {
                let text = toml::to_string_pretty(&JobConfig::default())
                    .context("failed to serialize default configuration")?;
                println!("{}", text);
                Ok(())
            }
        }
    }
}

fn load_mesh(path: &Option<PathBuf>) -> Result<Option<Mesh3D>> {
    path.as_deref()
        .map(|p| {
            Model3DImporter::new()
                .import_file(p)
                .with_context(|| format!("failed to load mesh {}", p.display()))
        })
        .transpose()
}

fn load_boundary(path: Option<&Path>) -> Result<BoundaryInput> {
    let Some(path) = path else {
        return Ok(BoundaryInput::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read boundary file {}", path.display()))?;
    BoundaryInput::from_json(&text).with_context(|| format!("in {}", path.display()))
}

fn run_plan(args: &PlanArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => JobConfig::load_from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => JobConfig::default(),
    };

    let inputs = JobInputs {
        stock: load_mesh(&args.stock)?,
        drive: load_mesh(&args.drive)?,
        safety: load_mesh(&args.safety)?,
        boundary: load_boundary(args.boundary.as_deref())?,
    };
    let options = PlanOptions {
        strategy: args.strategy,
        side: args.side.into(),
        raster_angle: args.angle,
        assemble: !args.no_assemble,
    };

    let export = job::plan(&config, &inputs, options)?;
    let json = serde_json::to_string_pretty(&export).context("failed to serialize toolpath")?;

    match &args.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
            info!("Wrote {} waypoints to {}", export.summary.waypoints, path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plan_arguments() {
        let cli = Cli::parse_from([
            "millkit",
            "plan",
            "--strategy",
            "profile",
            "--side",
            "inside",
            "--boundary",
            "curves.json",
            "--no-assemble",
        ]);
        let Commands::Plan(args) = cli.command else {
            panic!("expected plan");
        };
        assert_eq!(args.strategy, Strategy::Profile);
        assert_eq!(ProfileSide::from(args.side), ProfileSide::Inside);
        assert!(args.no_assemble);
        assert_eq!(args.boundary, Some(PathBuf::from("curves.json")));
    }

    #[test]
    fn test_strategy_names() {
        let cli = Cli::parse_from(["millkit", "plan", "-s", "area-clearance"]);
        let Commands::Plan(args) = cli.command else {
            panic!("expected plan");
        };
        assert_eq!(args.strategy, Strategy::AreaClearance);
        assert!(Cli::try_parse_from(["millkit", "plan", "-s", "drill"]).is_err());
    }
}
