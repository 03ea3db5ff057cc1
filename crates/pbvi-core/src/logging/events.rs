//! Stage and event-name vocabulary for structured logs.
//!
//! Every event carries a `stage` field and uses one of the names in
//! [`event_names`] as its tracing target, so JSONL output can be filtered by
//! either.

use serde::{Deserialize, Serialize};

/// Phases of a planner invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup, config and model loading.
    Init,
    /// Reachable belief point sampling.
    Sample,
    /// Point-based backups.
    Solve,
    /// Policy persistence and action queries.
    Policy,
    /// Simulated episodes.
    Run,
    /// Multi-episode evaluation.
    Eval,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Sample => "sample",
            Stage::Solve => "solve",
            Stage::Policy => "policy",
            Stage::Run => "run",
            Stage::Eval => "eval",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Config/init events
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";
    pub const MODEL_LOADED: &str = "model.loaded";

    // Sampling
    pub const SAMPLE_STARTED: &str = "sample.started";
    pub const SAMPLE_SKIPPED: &str = "sample.skipped";
    pub const SAMPLE_FINISHED: &str = "sample.finished";

    // Value iteration
    pub const SOLVE_STARTED: &str = "solve.started";
    pub const SOLVE_ITERATION: &str = "solve.iteration";
    pub const SOLVE_SKIPPED: &str = "solve.skipped";
    pub const SOLVE_FINISHED: &str = "solve.finished";

    // Policy artifacts and queries
    pub const POLICY_SAVED: &str = "policy.saved";
    pub const POLICY_LOADED: &str = "policy.loaded";
    pub const POLICY_ACTION: &str = "policy.action";

    // Episodes
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_STEP: &str = "run.step";
    pub const RUN_BUDGET_SPENT: &str = "run.budget_spent";
    pub const RUN_FINISHED: &str = "run.finished";

    // Evaluation
    pub const EVAL_STARTED: &str = "eval.started";
    pub const EVAL_FINISHED: &str = "eval.finished";

    // Any subcommand ending in an error
    pub const COMMAND_FAILED: &str = "command.failed";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_display_matches_serde() {
        for stage in [
            Stage::Init,
            Stage::Sample,
            Stage::Solve,
            Stage::Policy,
            Stage::Run,
            Stage::Eval,
        ] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage));
        }
    }

    #[test]
    fn event_names_are_prefixed_by_stage() {
        assert!(event_names::SOLVE_ITERATION.starts_with("solve."));
        assert!(event_names::SAMPLE_SKIPPED.starts_with("sample."));
        assert!(event_names::RUN_BUDGET_SPENT.starts_with("run."));
    }

    #[test]
    fn command_failure_is_not_an_episode_event() {
        assert_eq!(event_names::COMMAND_FAILED, "command.failed");
        assert_ne!(event_names::COMMAND_FAILED, event_names::RUN_FINISHED);
    }
}
