//! clap-based command line interface.
//!
//! Subcommands: `run` (drive the controller against the simulated world),
//! `demo` (canned full-pipeline showcase) and `profit` (price table).
//! Pipeline mode flags are global and override the config file.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// framecraft: closed-loop crafting pipeline controller.
#[derive(Debug, Parser)]
#[command(name = "framecraft", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to a framecraft.toml config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Run all three processing steps (logs to frames) instead of only
    /// the workbench step.
    #[arg(long, global = true)]
    pub full_pipeline: bool,

    /// Take randomised AFK breaks while running.
    #[arg(long, global = true)]
    pub random_breaks: bool,

    /// Enable verbose output.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// What the simulated bank preset holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PresetStage {
    /// Raw logs; pair with --full-pipeline.
    Logs,
    /// Refined planks, ready for the workbench.
    Refined,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the controller with a chosen preset until the bank runs dry.
    Run {
        /// Wood tier to fill the preset with.
        #[arg(long, default_value = "Teak")]
        wood: String,

        /// Processing stage of the preset contents.
        #[arg(long, value_enum, default_value_t = PresetStage::Refined)]
        stage: PresetStage,

        /// Number of preset loads waiting in the bank.
        #[arg(long, default_value_t = 3)]
        loads: u32,
    },

    /// Run the built-in full-pipeline demonstration.
    Demo,

    /// Print the per-wood profit table.
    Profit,
}
