//! Trait seams for the game-world collaborators the controller drives.
//!
//! The core never touches a concrete client: inventory, world/UI
//! interaction, panel visibility, the wall clock and skill experience are
//! all reached through these traits. The `sim` module provides a
//! deterministic in-memory implementation; a real backend would implement
//! the same traits and reuse the controller unchanged.

use std::rc::Rc;

/// How often [`Clock::delay_until`] re-checks its predicate.
pub const POLL_INTERVAL_MS: u64 = 100;

/// An interaction target, mirroring the client's mini-menu surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// A world object, addressed by object id and tile coordinates.
    Object { action: i32, id: i32, x: i32, y: i32 },
    /// A dialogue action (the shared Construct button).
    Dialogue { p1: i32, p2: i32, p3: i32 },
    /// A raw interface component (logout button and friends).
    Component { p1: i32, p2: i32, p3: i32 },
}

/// Read-only view of the currently held items.
pub trait Inventory {
    fn contains(&self, item_id: i32) -> bool;
    fn items(&self) -> Vec<i32>;
}

/// Plain item-id lists are inventories; the classifier tests and the
/// simulation backpack both lean on this.
impl Inventory for Vec<i32> {
    fn contains(&self, item_id: i32) -> bool {
        self.as_slice().contains(&item_id)
    }

    fn items(&self) -> Vec<i32> {
        self.clone()
    }
}

/// Issues one interaction attempt. Non-blocking: the return value reports
/// whether the interaction was issued, not whether it took effect.
pub trait Interaction {
    fn activate(&self, target: Target) -> bool;
}

/// Panel (interface) visibility, polled by the station driver.
pub trait Panels {
    fn is_open(&self, panel_id: i32) -> bool;
}

/// Blocking time primitives. Everything in the controller waits through
/// this seam, which is what lets the simulation run a whole session in
/// microseconds of real time.
pub trait Clock {
    fn now_ms(&self) -> u64;

    fn delay(&self, ms: u64);

    /// Poll `pred` until it returns true or `timeout_ms` elapses.
    /// Returns whether the predicate was satisfied in time.
    fn delay_until(&self, timeout_ms: u64, pred: &mut dyn FnMut() -> bool) -> bool {
        let deadline = self.now_ms().saturating_add(timeout_ms);
        loop {
            if pred() {
                return true;
            }
            if self.now_ms() >= deadline {
                return false;
            }
            self.delay(POLL_INTERVAL_MS);
        }
    }
}

/// Read-only skill experience, consumed only by telemetry.
pub trait Experience {
    fn experience(&self) -> i32;
    fn level(&self) -> i32;
}

/// The full set of collaborators handed to the controller. Single-threaded
/// by design, hence `Rc`: one backend object usually implements every
/// trait and fills all five slots.
pub struct Services {
    pub inventory: Rc<dyn Inventory>,
    pub interaction: Rc<dyn Interaction>,
    pub panels: Rc<dyn Panels>,
    pub clock: Rc<dyn Clock>,
    pub experience: Rc<dyn Experience>,
}

impl Services {
    pub fn from_world<W>(world: Rc<W>) -> Self
    where
        W: Inventory + Interaction + Panels + Clock + Experience + 'static,
    {
        Self {
            inventory: Rc::clone(&world) as Rc<dyn Inventory>,
            interaction: Rc::clone(&world) as Rc<dyn Interaction>,
            panels: Rc::clone(&world) as Rc<dyn Panels>,
            clock: Rc::clone(&world) as Rc<dyn Clock>,
            experience: world as Rc<dyn Experience>,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn vec_inventory_contains() {
        let inv: Vec<i32> = vec![6333, 8780];
        assert!(inv.contains(6333));
        assert!(!Inventory::contains(&inv, 1511));
        assert_eq!(inv.items(), vec![6333, 8780]);
    }

    struct TickClock {
        now: Cell<u64>,
    }

    impl Clock for TickClock {
        fn now_ms(&self) -> u64 {
            self.now.get()
        }

        fn delay(&self, ms: u64) {
            self.now.set(self.now.get() + ms);
        }
    }

    #[test]
    fn delay_until_satisfied_before_deadline() {
        let clock = TickClock { now: Cell::new(0) };
        let ok = clock.delay_until(1000, &mut || clock.now_ms() >= 300);
        assert!(ok);
        assert!(clock.now_ms() >= 300);
        assert!(clock.now_ms() < 1000);
    }

    #[test]
    fn delay_until_times_out() {
        let clock = TickClock { now: Cell::new(0) };
        let ok = clock.delay_until(500, &mut || false);
        assert!(!ok);
        assert!(clock.now_ms() >= 500);
    }
}
