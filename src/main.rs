use clap::Parser;
use millkit::cli::Cli;
use millkit::init_logging;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging()?;
    cli.run()
}
