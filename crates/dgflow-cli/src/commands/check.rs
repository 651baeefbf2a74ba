//! Parameter file validation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

#[derive(Args)]
pub struct CheckArgs {
    /// Parameter file (JSON)
    pub params: PathBuf,

    /// Print the complete parameter set, defaults filled in
    #[arg(long)]
    pub print: bool,
}

pub fn execute(args: CheckArgs) -> Result<()> {
    let params = dgflow_io::load_parameters(&args.params)
        .with_context(|| format!("invalid parameter file {}", args.params.display()))?;

    for (key, value) in params.summary() {
        info!("{key:<30} {value}");
    }
    if args.print {
        println!("{}", serde_json::to_string_pretty(&params)?);
    }
    println!("{}: ok", args.params.display());
    Ok(())
}
