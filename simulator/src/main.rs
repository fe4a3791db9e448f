use anyhow::Context;
use clap::Parser;
use evaccore::engine::SimulationEngine;
use gui_bridge::bridge::GuiBridge;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use valhalla::ValhallaClient;
use workflow::config::ScenarioConfig;
use workflow::runner::Runner;

mod generator;
mod gui_bridge;
mod valhalla;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Scenario driver for the Rust evacuation platform")]
struct Args {
    /// Run the scripted three-phase rehearsal and print a summary
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Load a scenario config from YAML
    #[arg(long)]
    scenario: Option<PathBuf>,
    #[arg(long, default_value_t = 3)]
    shelters: usize,
    #[arg(long, default_value_t = 10.0)]
    radius_minutes: f64,
    /// Seed for reproducible runs; omit for entropy
    #[arg(long)]
    seed: Option<u64>,
    /// Keep the HTTP bridge alive for an external map front-end
    #[arg(long, default_value_t = false)]
    serve: bool,
    /// Base URL of the isochrone provider used while serving
    #[arg(long, default_value = "http://127.0.0.1:8002")]
    valhalla_url: String,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = if let Some(path) = args.scenario {
        ScenarioConfig::load(path)?
    } else {
        ScenarioConfig::from_args(args.shelters, args.radius_minutes, args.seed)
    };

    let runner = Runner::new(config.clone());

    if args.offline {
        let result = runner.execute()?;
        println!(
            "Offline run -> {} shelter(s), {} household(s) evacuated in {} tick(s), safety {}, {} live hazard(s), {} household(s) returned ({:?})",
            result.shelters,
            result.evacuated_households,
            result.evacuation_ticks,
            result.safety_level,
            result.live_hazards,
            result.households_returned,
            result.return_status,
        );
    }

    if args.serve {
        let mut engine = match config.seed {
            Some(seed) => SimulationEngine::with_seed(seed),
            None => SimulationEngine::new(),
        };
        runner
            .provision(&mut engine)
            .context("preloading scenario shelters")?;

        let engine = Arc::new(RwLock::new(engine));
        let client =
            ValhallaClient::new(&args.valhalla_url).context("building the isochrone client")?;
        let bridge = GuiBridge::new(engine, client);
        bridge.publish_status("HTTP bridge running (Ctrl+C to stop)...");

        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for signal handling")?;
        runtime.block_on(async {
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            Ok::<(), anyhow::Error>(())
        })?;
    }

    Ok(())
}
