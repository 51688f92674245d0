use serde::{Deserialize, Serialize};

use super::variant::{Classification, Stage};

/// The controller's current activity.
///
/// A run flows LoadPreset → (LogsToPlanks → PlanksToRefined)? →
/// RefinedToFrames → LoadPreset … until the preset runs dry, then Done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    Idle,
    LoadPreset,
    LogsToPlanks,
    PlanksToRefined,
    RefinedToFrames,
    Done,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineState::Idle => write!(f, "IDLE"),
            PipelineState::LoadPreset => write!(f, "LOAD_PRESET"),
            PipelineState::LogsToPlanks => write!(f, "LOGS_TO_PLANKS"),
            PipelineState::PlanksToRefined => write!(f, "PLANKS_TO_REFINED"),
            PipelineState::RefinedToFrames => write!(f, "REFINED_TO_FRAMES"),
            PipelineState::Done => write!(f, "DONE"),
        }
    }
}

/// Maps the classified inventory onto the next pipeline state.
///
/// Unrecognised inventory is the terminal signal. In frames-only mode the
/// preset is assumed to hold refined planks already, so every recognised
/// stage jumps straight to the workbench step. Pure and total.
pub fn resolve_next(classification: &Classification, full_pipeline: bool) -> PipelineState {
    if classification.is_unknown() {
        return PipelineState::Done;
    }
    if !full_pipeline {
        return PipelineState::RefinedToFrames;
    }
    match classification.stage {
        Stage::Logs => PipelineState::LogsToPlanks,
        Stage::Planks => PipelineState::PlanksToRefined,
        Stage::Refined => PipelineState::RefinedToFrames,
        Stage::Unknown => PipelineState::Done,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::variant::Wood;

    fn classified(stage: Stage) -> Classification {
        Classification {
            wood: Some(Wood {
                name: "Teak".into(),
                log_id: 6333,
                plank_id: 8780,
                refined_id: 54448,
                frame_id: 54456,
            }),
            stage,
        }
    }

    #[test]
    fn unknown_resolves_to_done_in_both_modes() {
        assert_eq!(resolve_next(&Classification::unknown(), true), PipelineState::Done);
        assert_eq!(resolve_next(&Classification::unknown(), false), PipelineState::Done);
    }

    #[test]
    fn missing_wood_resolves_to_done_even_with_a_stage() {
        let c = Classification {
            wood: None,
            stage: Stage::Refined,
        };
        assert_eq!(resolve_next(&c, true), PipelineState::Done);
    }

    #[test]
    fn short_mode_always_targets_the_workbench() {
        for stage in [Stage::Logs, Stage::Planks, Stage::Refined] {
            assert_eq!(
                resolve_next(&classified(stage), false),
                PipelineState::RefinedToFrames,
                "stage {stage} should jump straight to frames in short mode"
            );
        }
    }

    #[test]
    fn full_mode_maps_each_stage_to_its_station() {
        assert_eq!(resolve_next(&classified(Stage::Logs), true), PipelineState::LogsToPlanks);
        assert_eq!(
            resolve_next(&classified(Stage::Planks), true),
            PipelineState::PlanksToRefined
        );
        assert_eq!(
            resolve_next(&classified(Stage::Refined), true),
            PipelineState::RefinedToFrames
        );
    }

    #[test]
    fn state_display() {
        assert_eq!(PipelineState::Idle.to_string(), "IDLE");
        assert_eq!(PipelineState::LoadPreset.to_string(), "LOAD_PRESET");
        assert_eq!(PipelineState::LogsToPlanks.to_string(), "LOGS_TO_PLANKS");
        assert_eq!(PipelineState::PlanksToRefined.to_string(), "PLANKS_TO_REFINED");
        assert_eq!(PipelineState::RefinedToFrames.to_string(), "REFINED_TO_FRAMES");
        assert_eq!(PipelineState::Done.to_string(), "DONE");
    }
}
