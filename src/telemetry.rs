//! Read-side throughput and profit statistics.
//!
//! Everything here is a pure derivation from the run context's counters,
//! the clock and an experience reading; nothing feeds back into the
//! controller.

use std::collections::HashMap;

use serde::Serialize;

use crate::config::PriceEntry;
use crate::error::FramecraftError;
use crate::pipeline::{RunContext, Wood};

/// Immutable price lookup keyed by finished-frame item id, built once at
/// startup from the built-in estimates plus any config overrides.
#[derive(Debug, Clone)]
pub struct PriceTable {
    frame_gp: HashMap<i32, i64>,
    /// Cost of one frame's worth of input: 12 logs.
    log_gp: HashMap<i32, i64>,
}

impl Default for PriceTable {
    fn default() -> Self {
        // GE estimates per finished frame and per 12-log input batch.
        let frame_gp = HashMap::from([
            (54_452, 44_000),
            (54_454, 35_400),
            (54_848, 38_500),
            (54_456, 41_200),
            (54_850, 25_800),
            (54_852, 48_900),
            (54_458, 52_100),
            (54_854, 58_400),
            (54_856, 64_200),
            (54_858, 192_500),
        ]);
        let log_gp = HashMap::from([
            (54_452, 312),
            (54_454, 7_092),
            (54_848, 2_976),
            (54_456, 1_260),
            (54_850, 4_128),
            (54_852, 14_400),
            (54_458, 5_460),
            (54_854, 2_004),
            (54_856, 4_560),
            (54_858, 106_020),
        ]);
        Self { frame_gp, log_gp }
    }
}

impl PriceTable {
    /// Build the table with per-wood overrides applied on top of the
    /// defaults. Override names must exist in the wood table.
    pub fn with_overrides(
        woods: &[Wood],
        overrides: &HashMap<String, PriceEntry>,
    ) -> Result<Self, FramecraftError> {
        let mut table = Self::default();
        for (name, entry) in overrides {
            let wood = woods
                .iter()
                .find(|w| w.name.eq_ignore_ascii_case(name))
                .ok_or_else(|| FramecraftError::UnknownWood(name.clone()))?;
            table.frame_gp.insert(wood.frame_id, entry.frame);
            table.log_gp.insert(wood.frame_id, entry.logs);
        }
        Ok(table)
    }

    pub fn frame_price(&self, frame_id: i32) -> i64 {
        self.frame_gp.get(&frame_id).copied().unwrap_or(0)
    }

    pub fn log_cost(&self, frame_id: i32) -> i64 {
        self.log_gp.get(&frame_id).copied().unwrap_or(0)
    }
}

/// One point-in-time reading of run statistics, ready for display.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetrySnapshot {
    pub wood: Option<String>,
    pub batches: u32,
    pub frames: u32,
    pub elapsed_ms: u64,
    pub xp_gained: i32,
    pub xp_per_hour: i64,
    pub level: i32,
    pub frame_price: i64,
    pub log_cost: i64,
    pub profit_per_frame: i64,
    pub total_profit: i64,
    pub profit_per_hour: i64,
}

impl TelemetrySnapshot {
    /// Derive the current statistics. In full-pipeline mode profit nets
    /// out the log cost; in frames-only mode the planks are assumed
    /// already owned, so the frame price is pure revenue.
    pub fn compute(
        ctx: &RunContext,
        prices: &PriceTable,
        now_ms: u64,
        current_xp: i32,
        level: i32,
    ) -> Self {
        let elapsed_ms = now_ms.saturating_sub(ctx.start_ms);
        let xp_gained = current_xp - ctx.start_xp;
        let xp_per_hour = per_hour(i64::from(xp_gained), elapsed_ms);

        let (frame_price, log_cost) = ctx
            .display_wood()
            .map(|w| (prices.frame_price(w.frame_id), prices.log_cost(w.frame_id)))
            .unwrap_or((0, 0));
        let profit_per_frame = if ctx.full_pipeline {
            frame_price - log_cost
        } else {
            frame_price
        };
        let total_profit = i64::from(ctx.frames) * profit_per_frame;
        let profit_per_hour = if ctx.frames > 0 {
            per_hour(total_profit, elapsed_ms)
        } else {
            0
        };

        Self {
            wood: ctx.display_wood().map(|w| w.name.clone()),
            batches: ctx.batches,
            frames: ctx.frames,
            elapsed_ms,
            xp_gained,
            xp_per_hour,
            level,
            frame_price,
            log_cost,
            profit_per_frame,
            total_profit,
            profit_per_hour,
        }
    }
}

fn per_hour(amount: i64, elapsed_ms: u64) -> i64 {
    if elapsed_ms == 0 {
        return 0;
    }
    amount * 3_600_000 / elapsed_ms as i64
}

/// `HH:MM:SS` for the time-running display.
pub fn format_hms(ms: u64) -> String {
    let s = ms / 1000;
    format!("{:02}:{:02}:{:02}", s / 3600, (s % 3600) / 60, s % 60)
}
