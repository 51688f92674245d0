use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::PipelineState;
use super::variant::{Classification, Wood};

/// Externally settable run switch with cooperative-cancel semantics: long
/// poll loops check it so a stop request interrupts an in-progress wait
/// instead of only being honored between ticks.
#[derive(Debug, Clone, Default)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Mutable state of one run. Owned exclusively by the controller; the
/// display/telemetry side only ever sees a shared reference.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub state: PipelineState,
    /// Wood and stage from the latest classification pass. Kept as one
    /// value so the pair can never be independently stale.
    pub classification: Classification,
    /// Survives Unknown periods so the display can keep showing the
    /// material of the batch that just finished.
    pub last_known_wood: Option<Wood>,
    pub full_pipeline: bool,
    pub random_breaks: bool,
    pub batches: u32,
    pub frames: u32,
    pub load_failures: u32,
    pub start_xp: i32,
    pub start_ms: u64,
    pub started_at: DateTime<Utc>,
}

impl RunContext {
    pub fn new(full_pipeline: bool, random_breaks: bool) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            state: PipelineState::Idle,
            classification: Classification::unknown(),
            last_known_wood: None,
            full_pipeline,
            random_breaks,
            batches: 0,
            frames: 0,
            load_failures: 0,
            start_xp: 0,
            start_ms: 0,
            started_at: Utc::now(),
        }
    }

    /// Rearm the context for a fresh run. Counters reset; mode flags and
    /// the last known wood survive.
    pub fn reset_for_start(&mut self, start_xp: i32, start_ms: u64) {
        self.run_id = Uuid::new_v4().to_string();
        self.batches = 0;
        self.frames = 0;
        self.load_failures = 0;
        self.start_xp = start_xp;
        self.start_ms = start_ms;
        self.started_at = Utc::now();
        self.state = PipelineState::LoadPreset;
    }

    /// Install a fresh classification, remembering the wood if one was
    /// recognised.
    pub fn apply_classification(&mut self, classification: Classification) {
        if let Some(wood) = &classification.wood {
            self.last_known_wood = Some(wood.clone());
        }
        self.classification = classification;
    }

    /// The wood to show on screen: the current one, or the last one seen.
    pub fn display_wood(&self) -> Option<&Wood> {
        self.classification.wood.as_ref().or(self.last_known_wood.as_ref())
    }
}

/// Structured summary produced when a run reaches Done.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub wood: Option<String>,
    pub full_pipeline: bool,
    pub batches: u32,
    pub frames: u32,
    pub xp_gained: i32,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl RunReport {
    pub fn from_context(ctx: &RunContext, xp_gained: i32) -> Self {
        let now = Utc::now();
        Self {
            run_id: ctx.run_id.clone(),
            wood: ctx.display_wood().map(|w| w.name.clone()),
            full_pipeline: ctx.full_pipeline,
            batches: ctx.batches,
            frames: ctx.frames,
            xp_gained,
            started_at: ctx.started_at,
            ended_at: now,
            duration_ms: (now - ctx.started_at).num_milliseconds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::variant::{Stage, default_woods};

    #[test]
    fn new_context_is_idle_and_zeroed() {
        let ctx = RunContext::new(true, false);
        assert_eq!(ctx.state, PipelineState::Idle);
        assert!(ctx.classification.is_unknown());
        assert_eq!(ctx.batches, 0);
        assert_eq!(ctx.frames, 0);
        assert_eq!(ctx.load_failures, 0);
        assert!(ctx.full_pipeline);
        assert!(!ctx.random_breaks);
    }

    #[test]
    fn reset_clears_counters_and_rearms() {
        let mut ctx = RunContext::new(false, false);
        ctx.batches = 7;
        ctx.frames = 196;
        ctx.load_failures = 3;
        let old_id = ctx.run_id.clone();

        ctx.reset_for_start(1_200_000, 5000);

        assert_eq!(ctx.state, PipelineState::LoadPreset);
        assert_eq!(ctx.batches, 0);
        assert_eq!(ctx.frames, 0);
        assert_eq!(ctx.load_failures, 0);
        assert_eq!(ctx.start_xp, 1_200_000);
        assert_eq!(ctx.start_ms, 5000);
        assert_ne!(ctx.run_id, old_id);
    }

    #[test]
    fn last_known_wood_survives_unknown_classification() {
        let mut ctx = RunContext::new(true, false);
        let teak = default_woods().into_iter().find(|w| w.name == "Teak").unwrap();

        ctx.apply_classification(Classification {
            wood: Some(teak.clone()),
            stage: Stage::Logs,
        });
        assert_eq!(ctx.display_wood().unwrap().name, "Teak");

        ctx.apply_classification(Classification::unknown());
        assert!(ctx.classification.is_unknown());
        assert_eq!(ctx.display_wood().unwrap().name, "Teak");
    }

    #[test]
    fn run_flag_set_clear() {
        let flag = RunFlag::new();
        assert!(!flag.is_set());
        flag.set();
        assert!(flag.is_set());

        let alias = flag.clone();
        alias.clear();
        assert!(!flag.is_set());
    }

    #[test]
    fn report_carries_counters_and_wood() {
        let mut ctx = RunContext::new(true, false);
        ctx.reset_for_start(100, 0);
        let teak = default_woods().into_iter().find(|w| w.name == "Teak").unwrap();
        ctx.apply_classification(Classification {
            wood: Some(teak),
            stage: Stage::Refined,
        });
        ctx.batches = 2;
        ctx.frames = 56;

        let report = RunReport::from_context(&ctx, 4200);
        assert_eq!(report.run_id, ctx.run_id);
        assert_eq!(report.wood.as_deref(), Some("Teak"));
        assert_eq!(report.batches, 2);
        assert_eq!(report.frames, 56);
        assert_eq!(report.xp_gained, 4200);
        assert!(report.full_pipeline);
    }

    #[test]
    fn report_serializes_to_json() {
        let ctx = RunContext::new(false, false);
        let report = RunReport::from_context(&ctx, 0);
        let json = serde_json::to_string(&report).unwrap();
        let back: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.run_id, report.run_id);
        assert_eq!(back.batches, 0);
    }
}
