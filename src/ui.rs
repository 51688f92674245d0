//! Terminal output: spinner and colored status lines.
//!
//! Uses `indicatif` for the run spinner and `console` for styling.
//! Strictly a read-side consumer of the controller's context; nothing here
//! feeds back into the state machine.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::pipeline::{PipelineState, RunReport, Wood};
use crate::telemetry::{PriceTable, TelemetrySnapshot, format_hms};

/// Visual progress for one controller run.
pub struct RunDisplay {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
}

impl RunDisplay {
    pub fn start(full_pipeline: bool) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("invalid template"),
        );
        let route = if full_pipeline {
            "sawmill, sawmill, workbench"
        } else {
            "workbench only"
        };
        pb.set_message(format!("starting (route: {route})"));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Refresh the spinner line with the current state and material.
    pub fn update(&self, state: PipelineState, wood: Option<&str>, batches: u32) {
        self.pb.set_message(format!(
            "{state} | wood: {} | batches: {batches}",
            wood.unwrap_or("?")
        ));
    }

    /// Stop the spinner and print the outcome line.
    pub fn complete(&self, report: &RunReport) {
        self.pb.finish_and_clear();
        if report.batches > 0 {
            println!(
                "  {} Run complete: {} batches, {} frames in {}",
                self.green.apply_to("✓"),
                report.batches,
                report.frames,
                format_hms(report.duration_ms.max(0) as u64),
            );
        } else {
            println!(
                "  {} Run ended with nothing crafted",
                self.red.apply_to("✗")
            );
        }
    }

    /// Pretty-printed JSON run report.
    pub fn print_report(&self, report: &RunReport) {
        println!();
        println!("{}", self.green.apply_to("─── Run Report ───"));
        println!(
            "{}",
            serde_json::to_string_pretty(report).unwrap_or_default()
        );
    }

    /// Telemetry block in the style of the in-game stats panel.
    pub fn print_stats(&self, snap: &TelemetrySnapshot) {
        println!();
        println!("{}", self.green.apply_to("─── Session Stats ───"));
        println!("Wood          : {}", snap.wood.as_deref().unwrap_or("None"));
        println!("Batches       : {}", snap.batches);
        println!("Frames        : {}", snap.frames);
        println!("Level         : {}", snap.level);
        println!("XP Gained     : {}", snap.xp_gained);
        println!("XP / hr       : {}", snap.xp_per_hour);
        println!("Frame Price   : {} gp", snap.frame_price);
        println!("Profit/Frame  : {} gp", snap.profit_per_frame);
        if snap.frames > 0 {
            println!("Profit / hr   : {} gp", snap.profit_per_hour);
            println!("Total Profit  : {} gp", snap.total_profit);
        } else {
            println!("{}", self.yellow.apply_to("Profit        : no batches yet"));
        }
        println!("Time (virtual): {}", format_hms(snap.elapsed_ms));
    }
}

/// Per-wood profit table for the `profit` subcommand.
pub fn print_profit_table(woods: &[Wood], prices: &PriceTable, full_pipeline: bool) {
    let bold = Style::new().bold();
    println!(
        "{}",
        bold.apply_to(format!(
            "{:<10} {:>12} {:>12} {:>14}",
            "Wood", "Frame gp", "Logs gp", "Profit/frame"
        ))
    );
    for wood in woods {
        let frame = prices.frame_price(wood.frame_id);
        let logs = prices.log_cost(wood.frame_id);
        let profit = if full_pipeline { frame - logs } else { frame };
        println!("{:<10} {frame:>12} {logs:>12} {profit:>14}", wood.name);
    }
}
