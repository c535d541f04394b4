use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use strip_wm::actor::reactor::{Scenario, replay};
use strip_wm::common::config::{Config, config_file};
use strip_wm::common::log;
use tracing::info;

/// Replays a scripted session against the in-memory host and prints the
/// resulting space trees.
#[derive(Parser, Debug)]
#[command(version)]
struct Cli {
    /// RON scenario to replay.
    scenario: PathBuf,

    #[arg(long, default_value_os_t = config_file())]
    config: PathBuf,

    /// Print the dumps and final layout as JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let opt = Cli::parse();
    log::init_logging();

    let config = Config::read(&opt.config)?;
    info!(path = %opt.config.display(), "config loaded");
    let text = std::fs::read_to_string(&opt.scenario)
        .with_context(|| format!("reading scenario {}", opt.scenario.display()))?;
    let scenario = Scenario::parse(&text)
        .with_context(|| format!("parsing scenario {}", opt.scenario.display()))?;

    let out = replay(&scenario, config)?;
    if opt.json {
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for dump in &out.dumps {
            println!("{dump}");
        }
    }
    Ok(())
}
