use serde::{Deserialize, Serialize};

use crate::services::Inventory;

/// One material tier: the four item ids it passes through on the way from
/// raw log to finished frame.
///
/// The table is configuration data rather than a closed enum: item ids get
/// corrected in the field (the stock Willow plank id is unconfirmed), and a
/// data fix should not require a code fix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wood {
    pub name: String,
    pub log_id: i32,
    pub plank_id: i32,
    pub refined_id: i32,
    pub frame_id: i32,
}

impl Wood {
    fn new(name: &str, log_id: i32, plank_id: i32, refined_id: i32, frame_id: i32) -> Self {
        Self {
            name: name.to_string(),
            log_id,
            plank_id,
            refined_id,
            frame_id,
        }
    }
}

/// The built-in wood table, highest XP tier first. Classification scans in
/// this order, so ordering doubles as the tie-break priority.
pub fn default_woods() -> Vec<Wood> {
    vec![
        Wood::new("Elder", 29556, 54870, 54846, 54858),
        Wood::new("Magic", 1513, 54868, 54844, 54856),
        Wood::new("Yew", 1515, 54866, 54842, 54854),
        Wood::new("Mahogany", 6332, 8782, 54450, 54458),
        Wood::new("Acadia", 40285, 54864, 54840, 54852),
        Wood::new("Maple", 1517, 54862, 54838, 54850),
        Wood::new("Teak", 6333, 8780, 54448, 54456),
        // Willow plank id unconfirmed; override via config if it turns out wrong.
        Wood::new("Willow", 1519, 5486, 54836, 54848),
        Wood::new("Oak", 1521, 8778, 54446, 54454),
        Wood::new("Wooden", 1511, 960, 54444, 54452),
    ]
}

/// Which point of the processing chain the held items represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Logs,
    Planks,
    Refined,
    Unknown,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Logs => write!(f, "LOGS"),
            Stage::Planks => write!(f, "PLANKS"),
            Stage::Refined => write!(f, "REFINED"),
            Stage::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Result of one classification pass over the inventory.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub wood: Option<Wood>,
    pub stage: Stage,
}

impl Classification {
    pub fn unknown() -> Self {
        Self {
            wood: None,
            stage: Stage::Unknown,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.wood.is_none() || self.stage == Stage::Unknown
    }
}

/// Detects the wood tier and pipeline stage of the current inventory.
///
/// Scans the table three times (refined ids first, then plank ids, then
/// log ids) and returns the first match of the earliest pass. A more
/// processed item always wins over a less processed one, since holding it
/// means the pipeline is already past the earlier steps. Within a pass the
/// table order breaks ties. Plank ids `<= 0` are unconfirmed sentinels and
/// are skipped.
///
/// Total and side-effect-free; called at least once per controller tick.
pub fn classify(inventory: &dyn Inventory, woods: &[Wood]) -> Classification {
    for w in woods {
        if inventory.contains(w.refined_id) {
            return Classification {
                wood: Some(w.clone()),
                stage: Stage::Refined,
            };
        }
    }
    for w in woods {
        if w.plank_id > 0 && inventory.contains(w.plank_id) {
            return Classification {
                wood: Some(w.clone()),
                stage: Stage::Planks,
            };
        }
    }
    for w in woods {
        if inventory.contains(w.log_id) {
            return Classification {
                wood: Some(w.clone()),
                stage: Stage::Logs,
            };
        }
    }
    Classification::unknown()
}
