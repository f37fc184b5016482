//! CLI entry point for comhook-gen.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

/// comhook-gen: generate C++ COM hook layers from interface headers.
#[derive(Parser, Debug)]
#[command(name = "comhook-gen", version, about)]
struct Cli {
    /// Path to the comhook.toml configuration file.
    #[arg(default_value = "comhook.toml")]
    config: PathBuf,

    /// Output directory (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// SDK root directory (overrides config and environment).
    #[arg(long)]
    sdk_root: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("comhook_gen=info")),
        )
        .init();

    let cli = Cli::parse();
    comhook_gen::run(&cli.config, cli.output_dir.as_deref(), cli.sdk_root.as_deref())?;
    Ok(())
}
