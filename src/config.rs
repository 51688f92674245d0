//! Configuration loaded from `framecraft.toml`.
//!
//! [`FramecraftConfig`] holds every tunable: pipeline mode, retry ceiling,
//! per-step timeouts, station ids and coordinates, the wood table and price
//! overrides. Values missing from the file fall back to defaults matching
//! the Fort Forinthry station layout. Item-id tables are data here on
//! purpose: a wrong id is fixed in the file, not in code.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::FramecraftError;
use crate::pipeline::{Wood, default_woods};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FramecraftConfig {
    /// Run all three processing steps instead of only the workbench step.
    #[serde(default)]
    pub full_pipeline: bool,

    /// Take randomised AFK breaks while running.
    #[serde(default)]
    pub random_breaks: bool,

    /// Consecutive preset-load failures tolerated before the run stops.
    #[serde(default = "default_max_load_failures")]
    pub max_load_failures: u32,

    /// Frames produced by one fully completed workbench batch.
    #[serde(default = "default_batch_yield")]
    pub batch_yield: u32,

    #[serde(default)]
    pub timing: Timing,

    #[serde(default)]
    pub stations: Stations,

    /// Wood tier table, highest priority first. Overriding it replaces the
    /// built-in table wholesale.
    #[serde(default = "default_woods")]
    pub woods: Vec<Wood>,

    /// Per-wood price overrides, keyed by wood name.
    #[serde(default)]
    pub prices: HashMap<String, PriceEntry>,
}

fn default_max_load_failures() -> u32 {
    5
}

fn default_batch_yield() -> u32 {
    28
}

/// All delays and deadlines, in milliseconds. Jitter bounds are
/// humanisation, not correctness; everything else is a real deadline.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub jitter_min_ms: u64,
    pub jitter_max_ms: u64,
    /// Wait for a station panel (or the bank) to open after a click.
    pub panel_open_timeout_ms: u64,
    /// Wait for the progress panel to appear after Construct.
    pub progress_open_timeout_ms: u64,
    /// Poll interval while a craft is in progress.
    pub craft_poll_ms: u64,
    /// Pause after a load or craft before reclassifying.
    pub settle_ms: u64,
    /// Back-off after a failed interaction click.
    pub click_fail_backoff_ms: u64,
    /// Back-off after a panel failed to open.
    pub panel_fail_backoff_ms: u64,
    /// Tick delay while the run flag is down.
    pub idle_delay_ms: u64,
    /// Pause after issuing the logout interaction.
    pub logout_delay_ms: u64,
    /// Per-step craft deadlines, slowest observed real duration plus slack.
    pub logs_to_planks_timeout_ms: u64,
    pub planks_to_refined_timeout_ms: u64,
    pub refined_to_frames_timeout_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            jitter_min_ms: 300,
            jitter_max_ms: 800,
            panel_open_timeout_ms: 5_000,
            progress_open_timeout_ms: 5_000,
            craft_poll_ms: 500,
            settle_ms: 600,
            click_fail_backoff_ms: 1_200,
            panel_fail_backoff_ms: 1_000,
            idle_delay_ms: 300,
            logout_delay_ms: 3_000,
            logs_to_planks_timeout_ms: 40_000,
            planks_to_refined_timeout_ms: 20_000,
            refined_to_frames_timeout_ms: 90_000,
        }
    }
}

/// One world object the controller interacts with, plus the panel that
/// proves the interaction landed.
#[derive(Debug, Clone, Deserialize)]
pub struct StationSpec {
    pub object_id: i32,
    pub x: i32,
    pub y: i32,
    pub panel_id: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Stations {
    pub bank_chest: StationSpec,
    pub sawmill: StationSpec,
    pub workbench: StationSpec,
    /// Open while a craft is running; closing is the completion signal.
    pub progress_panel: i32,
    /// Third parameter of the shared Construct dialogue action.
    pub construct_dialogue: i32,
}

impl Default for Stations {
    fn default() -> Self {
        Self {
            bank_chest: StationSpec {
                object_id: 125_239,
                x: 3283,
                y: 3555,
                panel_id: 517,
            },
            sawmill: StationSpec {
                object_id: 125_240,
                x: 3281,
                y: 3550,
                panel_id: 1370,
            },
            workbench: StationSpec {
                object_id: 125_054,
                x: 3282,
                y: 3550,
                panel_id: 1371,
            },
            progress_panel: 1251,
            construct_dialogue: 89_784_350,
        }
    }
}

/// Market value of one frame and cost of its 12-log input, in gp.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PriceEntry {
    pub frame: i64,
    pub logs: i64,
}

impl Default for FramecraftConfig {
    fn default() -> Self {
        Self {
            full_pipeline: false,
            random_breaks: false,
            max_load_failures: default_max_load_failures(),
            batch_yield: default_batch_yield(),
            timing: Timing::default(),
            stations: Stations::default(),
            woods: default_woods(),
            prices: HashMap::new(),
        }
    }
}

impl FramecraftConfig {
    /// Load configuration. An explicit path must exist; with no path,
    /// `framecraft.toml` in the working directory is used if present and
    /// defaults apply otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, FramecraftError> {
        let config = match path {
            Some(p) => {
                let contents = std::fs::read_to_string(p)?;
                toml::from_str::<FramecraftConfig>(&contents)?
            }
            None => {
                let fallback = Path::new("framecraft.toml");
                if fallback.exists() {
                    let contents = std::fs::read_to_string(fallback)?;
                    toml::from_str::<FramecraftConfig>(&contents)?
                } else {
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), FramecraftError> {
        if self.woods.is_empty() {
            return Err(FramecraftError::Config("wood table must not be empty".into()));
        }
        if self.timing.jitter_min_ms > self.timing.jitter_max_ms {
            return Err(FramecraftError::Config(
                "jitter_min_ms must not exceed jitter_max_ms".into(),
            ));
        }
        if self.batch_yield == 0 {
            return Err(FramecraftError::Config("batch_yield must be positive".into()));
        }
        Ok(())
    }

    pub fn wood_by_name(&self, name: &str) -> Option<&Wood> {
        self.woods.iter().find(|w| w.name.eq_ignore_ascii_case(name))
    }
}
