//! Generic three-phase station protocol: open the station's menu, fire the
//! Construct action, wait for the progress panel to close.
//!
//! Every processing step in the pipeline is this same protocol with a
//! different station, action and deadline; stations are black boxes behind
//! it. All failures here are expected and reported as `false`, never as
//! panics or errors.

use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::{StationSpec, Timing};
use crate::pipeline::RunFlag;
use crate::services::{Clock, Interaction, Panels, Target};

/// Object action slot that opens a station menu.
pub const ACTION_OPEN_MENU: i32 = 1;
/// Object action slot that loads the bank preset.
pub const ACTION_LOAD_PRESET: i32 = 4;

pub struct StationDriver<'a> {
    interaction: &'a dyn Interaction,
    panels: &'a dyn Panels,
    clock: &'a dyn Clock,
    timing: &'a Timing,
    /// Panels accepted as proof a station menu opened. The first open of a
    /// session sometimes lands on the sibling station's panel id, so both
    /// sawmill and workbench ids count.
    accepted_panels: [i32; 2],
    progress_panel: i32,
    construct: Target,
}

impl<'a> StationDriver<'a> {
    pub fn new(
        interaction: &'a dyn Interaction,
        panels: &'a dyn Panels,
        clock: &'a dyn Clock,
        timing: &'a Timing,
        accepted_panels: [i32; 2],
        progress_panel: i32,
        construct_dialogue: i32,
    ) -> Self {
        Self {
            interaction,
            panels,
            clock,
            timing,
            accepted_panels,
            progress_panel,
            construct: Target::Dialogue {
                p1: 0,
                p2: -1,
                p3: construct_dialogue,
            },
        }
    }

    /// Humanised pre-click pause. Bounds come from config and carry no
    /// correctness weight.
    pub fn jitter(&self) {
        let min = self.timing.jitter_min_ms;
        let max = self.timing.jitter_max_ms;
        if max == 0 {
            return;
        }
        let ms = rand::thread_rng().gen_range(min..=max);
        self.clock.delay(ms);
    }

    /// One attempt at opening a station menu: click the object, then wait a
    /// bounded time for its panel (or either accepted alternate) to show.
    /// Backs off briefly after either failure mode so retries don't hot-loop.
    pub fn open(&self, name: &str, station: &StationSpec) -> bool {
        self.jitter();
        let clicked = self.interaction.activate(Target::Object {
            action: ACTION_OPEN_MENU,
            id: station.object_id,
            x: station.x,
            y: station.y,
        });
        if !clicked {
            warn!(station = name, object_id = station.object_id, "station click failed");
            self.clock.delay(self.timing.click_fail_backoff_ms);
            return false;
        }

        let expected = station.panel_id;
        let [alt_a, alt_b] = self.accepted_panels;
        let opened = self.clock.delay_until(self.timing.panel_open_timeout_ms, &mut || {
            self.panels.is_open(expected) || self.panels.is_open(alt_a) || self.panels.is_open(alt_b)
        });
        if !opened {
            warn!(station = name, panel_id = expected, "station panel did not open");
            self.clock.delay(self.timing.panel_fail_backoff_ms);
            return false;
        }
        debug!(station = name, panel_id = expected, "station panel open");
        true
    }

    /// Like [`open`](Self::open), but skips the click when the panel is
    /// already showing. Avoids a redundant interaction mid-session.
    pub fn open_if_closed(&self, name: &str, station: &StationSpec) -> bool {
        if self.panels.is_open(station.panel_id) {
            return true;
        }
        self.open(name, station)
    }

    /// Fire the Construct action and wait for the progress panel to appear.
    pub fn trigger(&self) -> bool {
        self.jitter();
        if !self.interaction.activate(self.construct) {
            warn!("construct click failed");
            self.clock.delay(self.timing.panel_fail_backoff_ms);
            return false;
        }
        let started = self.clock.delay_until(self.timing.progress_open_timeout_ms, &mut || {
            self.panels.is_open(self.progress_panel)
        });
        if !started {
            warn!("progress panel never opened");
        }
        started
    }

    /// Wait for the progress panel to close, the deadline to pass, or the
    /// run flag to drop. A deadline overrun is a soft warning only:
    /// completion is never re-verified here, the caller's next inventory
    /// classification reveals the true state.
    pub fn await_completion(&self, timeout_ms: u64, run: &RunFlag) {
        info!(timeout_s = timeout_ms / 1000, "waiting for craft to finish");
        let deadline = self.clock.now_ms().saturating_add(timeout_ms);
        while self.panels.is_open(self.progress_panel)
            && self.clock.now_ms() < deadline
            && run.is_set()
        {
            self.clock.delay(self.timing.craft_poll_ms);
        }
        if self.panels.is_open(self.progress_panel) {
            warn!("craft progress timed out, continuing anyway");
        }
        self.clock.delay(self.timing.settle_ms);
    }
}
