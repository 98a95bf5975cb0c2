use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use citytrack_provisioner::{config, driver};

#[derive(Debug, Parser)]
#[command(author, version, about = "Bulk-provision CityTrack departments and workers")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    driver::run(&cfg).await
}
