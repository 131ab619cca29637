use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use fluidcc::{
    driver,
    experiment::{DcConfig, SpaceConfig},
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Fluid congestion-control experiments")]
struct Cli {
    #[command(subcommand)]
    experiment: Experiment,
}

#[derive(Subcommand, Debug)]
enum Experiment {
    /// Reno and DCTCP sharing a data-center bottleneck.
    Dc(RunArgs),
    /// Reno, DCTCP and SpaceCC on a long-RTT link with outages.
    Space(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Experiment configuration (YAML or JSON).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of seeds to run per congestion control.
    #[arg(long, default_value_t = 20)]
    seeds: u64,

    /// Directory the CSV table is written to.
    #[arg(long, default_value = "results")]
    out: PathBuf,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.experiment {
        Experiment::Dc(args) => {
            let path = args.config_or("configs/dc_config.yaml");
            let cfg: DcConfig = load(&path)?;
            let rows = driver::run_dc(&cfg, args.seeds)?;
            save(&args.out, "dc_metrics.csv", &rows)
        }
        Experiment::Space(args) => {
            let path = args.config_or("configs/space_config.yaml");
            let cfg: SpaceConfig = load(&path)?;
            let rows = driver::run_space(&cfg, args.seeds)?;
            save(&args.out, "space_metrics.csv", &rows)
        }
    }
}

impl RunArgs {
    fn config_or(&self, default: &str) -> PathBuf {
        self.config.clone().unwrap_or_else(|| PathBuf::from(default))
    }
}

fn load<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    info!(path = %path.display(), "loading config");
    driver::load_config(path).with_context(|| format!("failed to load {}", path.display()))
}

fn save<T: serde::Serialize>(dir: &Path, name: &str, rows: &[T]) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(name);
    driver::write_csv(&path, rows).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), runs = rows.len(), "saved results");
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
