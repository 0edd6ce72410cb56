//! flagrun - scenario-driven test automation for web resources and APIs
//!
//! Runs YAML suite files through the scenario engine and reports which
//! checks passed.

use clap::Parser;
use flagrun::{cli, commands, common::logging};
use commands::Commands;

#[derive(Parser)]
#[command(name = "flagrun", about = "Scenario-driven web test runner")]
#[command(version, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_cli(cli.debug);

    if let Err(e) = cli::dispatch(cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
