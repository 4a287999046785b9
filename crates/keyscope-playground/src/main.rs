use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use keyscope_shortcuts::RouterConfig;
use tracing_subscriber::EnvFilter;

mod scenario;

use scenario::{Replay, Scenario};

/// Keyscope shortcut playground
#[derive(Parser, Debug)]
#[command(name = "keyscope-playground")]
#[command(about = "Replay a shortcut scenario through the key router")]
struct Cli {
    /// Scenario file (YAML)
    scenario: PathBuf,

    /// Router configuration file (YAML or JSON); defaults to the user config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<RouterConfig> {
    let config = match path {
        Some(path) => RouterConfig::load(path)?,
        None => match RouterConfig::default_path() {
            Some(path) => RouterConfig::load_or_default(path)?,
            None => RouterConfig::default(),
        },
    };
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = load_config(cli.config.as_ref())?;
    let scenario = Scenario::load(&cli.scenario)?;
    tracing::info!(
        scenario = %cli.scenario.display(),
        steps = scenario.steps.len(),
        "replaying scenario"
    );

    let mut replay = Replay::new(&scenario, &config)?;
    for (index, step) in scenario.steps.iter().enumerate() {
        let lines = replay.step(step)?;
        println!("{:>3}. {}", index + 1, step);
        for line in lines {
            println!("     {}", line);
        }
    }

    Ok(())
}
