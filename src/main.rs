mod cli;
mod config;
mod controller;
mod error;
mod pipeline;
mod services;
mod sim;
mod station;
mod telemetry;
mod ui;

use std::rc::Rc;

use anyhow::Result;
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, PresetStage};
use config::FramecraftConfig;
use controller::PipelineController;
use error::FramecraftError;
use services::Services;
use sim::SimWorld;
use telemetry::PriceTable;
use ui::RunDisplay;

/// Tick cap for simulated runs; a stalled pipeline ends instead of spinning.
const MAX_TICKS: u32 = 10_000;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = FramecraftConfig::load(cli.config.as_deref())?;
    if cli.full_pipeline {
        config.full_pipeline = true;
    }
    if cli.random_breaks {
        config.random_breaks = true;
    }

    match cli.command {
        Command::Run { wood, stage, loads } => run(config, &wood, stage, loads),
        Command::Demo => {
            config.full_pipeline = true;
            run(config, "Teak", PresetStage::Logs, 2)
        }
        Command::Profit => {
            let prices = PriceTable::with_overrides(&config.woods, &config.prices)?;
            ui::print_profit_table(&config.woods, &prices, config.full_pipeline);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "framecraft=debug"
    } else {
        "framecraft=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(config: FramecraftConfig, wood_name: &str, stage: PresetStage, loads: u32) -> Result<()> {
    let wood = config
        .wood_by_name(wood_name)
        .ok_or_else(|| FramecraftError::UnknownWood(wood_name.to_string()))?
        .clone();
    if stage == PresetStage::Logs && !config.full_pipeline {
        warn!("preset holds raw logs but full pipeline is off; pass --full-pipeline");
    }
    let prices = PriceTable::with_overrides(&config.woods, &config.prices)?;

    let world = Rc::new(SimWorld::new(config.clone()));
    let item = match stage {
        PresetStage::Logs => wood.log_id,
        PresetStage::Refined => wood.refined_id,
    };
    for _ in 0..loads {
        world.queue_preset(vec![item; 28]);
    }

    let mut controller = PipelineController::new(config.clone(), Services::from_world(world));
    let display = RunDisplay::start(config.full_pipeline);

    controller.start();
    let running = controller.run_flag();
    let mut ticks = 0;
    while running.is_set() && ticks < MAX_TICKS {
        controller.tick();
        let ctx = controller.context();
        display.update(
            ctx.state,
            ctx.display_wood().map(|w| w.name.as_str()),
            ctx.batches,
        );
        ticks += 1;
    }

    let report = controller.report();
    display.complete(&report);
    display.print_stats(&controller.snapshot(&prices));
    display.print_report(&report);
    Ok(())
}
