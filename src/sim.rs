//! Deterministic in-memory game world.
//!
//! Implements every service trait with a virtual clock, so a full crafting
//! session runs in microseconds of real time. Backs the `demo` and `run`
//! subcommands and the controller scenario tests. Failure knobs
//! ([`SimWorld::fail_next_clicks`], [`SimWorld::stick_progress`]) exist so
//! the retry and timeout paths can be exercised on demand.

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::config::FramecraftConfig;
use crate::services::{Clock, Experience, Interaction, Inventory, Panels, Target};
use crate::station::{ACTION_LOAD_PRESET, ACTION_OPEN_MENU};

/// Virtual duration of one craft, bank open/close, and XP per craft.
const CRAFT_MS: u64 = 3_000;
const BANK_MS: u64 = 400;
const XP_PER_CRAFT: i32 = 500;

#[derive(Debug)]
struct SimState {
    now_ms: u64,
    backpack: Vec<i32>,
    preset_loads: VecDeque<Vec<i32>>,
    /// Panel ids of currently open station menus.
    open_station_panel: Option<i32>,
    bank_closes_at: Option<u64>,
    /// An in-flight craft: completion time and the backpack it produces.
    craft: Option<(u64, Vec<i32>)>,
    clicks: u32,
    fail_clicks: u32,
    stuck_progress: bool,
    xp: i32,
}

pub struct SimWorld {
    cfg: FramecraftConfig,
    state: RefCell<SimState>,
}

impl SimWorld {
    pub fn new(cfg: FramecraftConfig) -> Self {
        Self {
            cfg,
            state: RefCell::new(SimState {
                now_ms: 0,
                backpack: Vec::new(),
                preset_loads: VecDeque::new(),
                open_station_panel: None,
                bank_closes_at: None,
                craft: None,
                clicks: 0,
                fail_clicks: 0,
                stuck_progress: false,
                xp: 1_000_000,
            }),
        }
    }

    /// Queue one bank preset load. Each successful bank interaction
    /// replaces the backpack with the next queued load (or empties it).
    pub fn queue_preset(&self, items: Vec<i32>) {
        self.state.borrow_mut().preset_loads.push_back(items);
    }

    /// Make the next `n` interaction attempts fail at issuance.
    #[cfg(test)]
    pub fn fail_next_clicks(&self, n: u32) {
        self.state.borrow_mut().fail_clicks = n;
    }

    /// Make every craft hang: the progress panel never closes and no
    /// output is produced.
    #[cfg(test)]
    pub fn stick_progress(&self) {
        self.state.borrow_mut().stuck_progress = true;
    }

    #[cfg(test)]
    pub fn interactions(&self) -> u32 {
        self.state.borrow().clicks
    }

    #[cfg(test)]
    pub fn backpack(&self) -> Vec<i32> {
        self.state.borrow().backpack.clone()
    }

    /// Apply a finished craft if its completion time has passed.
    fn settle_craft(&self, state: &mut SimState) {
        let due = matches!(state.craft, Some((done_at, _)) if state.now_ms >= done_at);
        if due && let Some((_, result)) = state.craft.take() {
            state.backpack = result;
            state.xp += XP_PER_CRAFT;
        }
    }

    /// What the open station turns the backpack into, id by id.
    fn craft_output(&self, panel_id: i32, backpack: &[i32]) -> Vec<i32> {
        let stations = &self.cfg.stations;
        backpack
            .iter()
            .map(|&item| {
                for w in &self.cfg.woods {
                    if panel_id == stations.sawmill.panel_id {
                        if item == w.log_id {
                            return w.plank_id;
                        }
                        if item == w.plank_id {
                            return w.refined_id;
                        }
                    } else if panel_id == stations.workbench.panel_id && item == w.refined_id {
                        return w.frame_id;
                    }
                }
                item
            })
            .collect()
    }
}

impl Interaction for SimWorld {
    fn activate(&self, target: Target) -> bool {
        let mut state = self.state.borrow_mut();
        state.clicks += 1;
        if state.fail_clicks > 0 {
            state.fail_clicks -= 1;
            return false;
        }

        let stations = &self.cfg.stations;
        match target {
            Target::Object { action, id, .. }
                if action == ACTION_LOAD_PRESET && id == stations.bank_chest.object_id =>
            {
                state.backpack = state.preset_loads.pop_front().unwrap_or_default();
                state.bank_closes_at = Some(state.now_ms + BANK_MS);
                true
            }
            Target::Object { action, id, .. } if action == ACTION_OPEN_MENU => {
                if id == stations.sawmill.object_id {
                    state.open_station_panel = Some(stations.sawmill.panel_id);
                    true
                } else if id == stations.workbench.object_id {
                    state.open_station_panel = Some(stations.workbench.panel_id);
                    true
                } else {
                    false
                }
            }
            Target::Dialogue { p3, .. } if p3 == stations.construct_dialogue => {
                let Some(panel_id) = state.open_station_panel else {
                    return false;
                };
                let output = self.craft_output(panel_id, &state.backpack);
                let done_at = if state.stuck_progress {
                    u64::MAX
                } else {
                    state.now_ms + CRAFT_MS
                };
                state.craft = Some((done_at, output));
                true
            }
            // Logout and other components: always accepted.
            Target::Component { .. } => {
                state.open_station_panel = None;
                true
            }
            _ => false,
        }
    }
}

impl Panels for SimWorld {
    fn is_open(&self, panel_id: i32) -> bool {
        let mut state = self.state.borrow_mut();
        if panel_id == self.cfg.stations.bank_chest.panel_id {
            return state.bank_closes_at.is_some_and(|t| state.now_ms < t);
        }
        if panel_id == self.cfg.stations.progress_panel {
            self.settle_craft(&mut state);
            return state.craft.is_some();
        }
        state.open_station_panel == Some(panel_id)
    }
}

impl Inventory for SimWorld {
    fn contains(&self, item_id: i32) -> bool {
        self.state.borrow().backpack.iter().any(|&i| i == item_id)
    }

    fn items(&self) -> Vec<i32> {
        self.state.borrow().backpack.clone()
    }
}

impl Clock for SimWorld {
    fn now_ms(&self) -> u64 {
        self.state.borrow().now_ms
    }

    fn delay(&self, ms: u64) {
        let mut state = self.state.borrow_mut();
        state.now_ms = state.now_ms.saturating_add(ms);
    }
}

impl Experience for SimWorld {
    fn experience(&self) -> i32 {
        let mut state = self.state.borrow_mut();
        self.settle_craft(&mut state);
        state.xp
    }

    fn level(&self) -> i32 {
        90
    }
}
