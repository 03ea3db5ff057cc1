//! Error types for the PBVI planner.
//!
//! Every failure the planner can report is a variant of [`PbviError`] with:
//! - A stable numeric code for machine parsing
//! - A category for grouping
//! - A remediation hint for humans
//!
//! Nothing in the core retries: once the model's pure functions are
//! deterministic there are no transient conditions, so every error is
//! surfaced to the caller as-is.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{ActionId, ObservationId, StateId};

/// Result type alias for planner operations.
pub type Result<T> = std::result::Result<T, PbviError>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed beliefs and impossible posteriors.
    Belief,
    /// Missing or malformed policies.
    Policy,
    /// Indices or tables inconsistent with the model.
    Model,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Belief => write!(f, "belief"),
            ErrorCategory::Policy => write!(f, "policy"),
            ErrorCategory::Model => write!(f, "model"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for the planner.
#[derive(Error, Debug)]
pub enum PbviError {
    // Belief errors (10-19)
    #[error("invalid belief: {reason}")]
    InvalidBelief { reason: String },

    #[error("observation {observation} is impossible after action {action} from this belief")]
    ImpossibleObservation {
        action: ActionId,
        observation: ObservationId,
    },

    // Policy errors (20-29)
    #[error("no policy available: solve or load a policy first")]
    NoPolicy,

    #[error("malformed policy artifact: {0}")]
    MalformedArtifact(String),

    // Model errors (30-39)
    #[error("unknown action {action} (model has {available} actions)")]
    UnknownAction { action: ActionId, available: usize },

    #[error("unknown observation {observation} (model has {available} observations)")]
    UnknownObservation {
        observation: ObservationId,
        available: usize,
    },

    #[error("unknown state {state} (model has {available} states)")]
    UnknownState { state: StateId, available: usize },

    #[error("dimension mismatch: expected {expected} entries, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid model: {0}")]
    InvalidModel(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PbviError {
    /// Shorthand for an [`PbviError::InvalidBelief`] with a formatted reason.
    pub fn invalid_belief(reason: impl Into<String>) -> Self {
        PbviError::InvalidBelief {
            reason: reason.into(),
        }
    }

    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Belief errors
    /// - 20-29: Policy errors
    /// - 30-39: Model errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            PbviError::InvalidBelief { .. } => 10,
            PbviError::ImpossibleObservation { .. } => 11,
            PbviError::NoPolicy => 20,
            PbviError::MalformedArtifact(_) => 21,
            PbviError::UnknownAction { .. } => 30,
            PbviError::UnknownObservation { .. } => 31,
            PbviError::UnknownState { .. } => 32,
            PbviError::DimensionMismatch { .. } => 33,
            PbviError::InvalidModel(_) => 34,
            PbviError::Io(_) => 60,
            PbviError::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            PbviError::InvalidBelief { .. } | PbviError::ImpossibleObservation { .. } => {
                ErrorCategory::Belief
            }
            PbviError::NoPolicy | PbviError::MalformedArtifact(_) => ErrorCategory::Policy,
            PbviError::UnknownAction { .. }
            | PbviError::UnknownObservation { .. }
            | PbviError::UnknownState { .. }
            | PbviError::DimensionMismatch { .. }
            | PbviError::InvalidModel(_) => ErrorCategory::Model,
            PbviError::Io(_) | PbviError::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            PbviError::InvalidBelief { .. } => {
                "Beliefs must have one non-negative entry per state and sum to 1."
            }
            PbviError::ImpossibleObservation { .. } => {
                "The model assigns zero probability to this observation. Check the observation table or reset the belief."
            }
            PbviError::NoPolicy => "Run 'pbvi solve' or load a policy file before asking for actions.",
            PbviError::MalformedArtifact(_) => {
                "Regenerate the policy file with 'pbvi solve'; it must contain an 'alphavec' list."
            }
            PbviError::UnknownAction { .. }
            | PbviError::UnknownObservation { .. }
            | PbviError::UnknownState { .. } => {
                "Indices must come from the model's declared states, actions and observations."
            }
            PbviError::DimensionMismatch { .. } => {
                "The policy or belief was produced for a model with a different number of states."
            }
            PbviError::InvalidModel(_) => {
                "Fix the model tables: probability rows must sum to 1 and discount must lie in (0, 1]."
            }
            PbviError::Io(_) => "Check that the path exists and is writable.",
            PbviError::Json(_) => "Invalid JSON. Check syntax with 'jq .' or regenerate the file.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_grouped_by_category() {
        let cases = [
            (PbviError::invalid_belief("x"), ErrorCategory::Belief, 10),
            (
                PbviError::ImpossibleObservation {
                    action: 0,
                    observation: 1,
                },
                ErrorCategory::Belief,
                11,
            ),
            (PbviError::NoPolicy, ErrorCategory::Policy, 20),
            (
                PbviError::MalformedArtifact("missing".into()),
                ErrorCategory::Policy,
                21,
            ),
            (
                PbviError::UnknownAction {
                    action: 9,
                    available: 3,
                },
                ErrorCategory::Model,
                30,
            ),
        ];
        for (err, category, code) in cases {
            assert_eq!(err.category(), category);
            assert_eq!(err.code(), code);
            assert!(!err.remediation().is_empty());
        }
    }

    #[test]
    fn display_mentions_indices() {
        let err = PbviError::UnknownObservation {
            observation: 7,
            available: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains('7'));
        assert!(msg.contains('2'));
    }

    #[test]
    fn io_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: PbviError = io.into();
        assert_eq!(err.category(), ErrorCategory::Io);
    }
}
