//! dgflow command line interface
//!
//! Runs the built-in 1-D cases with the coupled flow/transport time loop and
//! writes a JSON report next to a short status table.

mod cases;
mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "dgflow")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "DG incompressible flow with scalar transport", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a built-in case
    Run(commands::run::RunArgs),
    /// Validate a parameter file
    Check(commands::check::CheckArgs),
    /// List the built-in cases
    Cases,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run(args) => commands::run::execute(args),
        Commands::Check(args) => commands::check::execute(args),
        Commands::Cases => commands::list_cases(),
    }
}
