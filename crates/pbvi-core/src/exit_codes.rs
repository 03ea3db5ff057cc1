//! Exit codes for the `pbvi` CLI.
//!
//! Exit codes communicate operation outcome without requiring output parsing.
//!
//! Exit code ranges:
//! - 0: Success
//! - 10-19: User/input errors (fixable by changing arguments or files)
//! - 20-29: Internal and I/O errors

use crate::error::{ErrorCategory, PbviError};

/// Exit codes for `pbvi` commands.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Command completed.
    Clean = 0,

    // ========================================================================
    // User / Input Errors (10-19)
    // ========================================================================
    /// Invalid arguments (including malformed beliefs)
    ArgsError = 10,

    /// Config file missing, unparsable or invalid
    ConfigError = 11,

    /// Model file missing, unparsable or inconsistent
    ModelError = 12,

    /// Policy missing, malformed or built for another model
    PolicyError = 13,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (bug - please report)
    InternalError = 20,

    /// I/O error
    IoError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Clean
    }

    /// Check if this exit code is a user/input error (codes 10-19).
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    /// Check if this exit code is an internal or I/O error (codes 20-29).
    pub fn is_internal_error(self) -> bool {
        (self as i32) >= 20
    }

    /// Get the error code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::ModelError => "ERR_MODEL",
            ExitCode::PolicyError => "ERR_POLICY",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }

    /// Exit code for a planner error.
    ///
    /// An impossible observation during a simulated run means the model and
    /// filter disagree, which is reported as internal.
    pub fn for_error(err: &PbviError) -> Self {
        match err {
            PbviError::InvalidBelief { .. } => ExitCode::ArgsError,
            PbviError::ImpossibleObservation { .. } => ExitCode::InternalError,
            _ => match err.category() {
                ErrorCategory::Belief => ExitCode::ArgsError,
                ErrorCategory::Policy => ExitCode::PolicyError,
                ErrorCategory::Model => ExitCode::ModelError,
                ErrorCategory::Io => ExitCode::IoError,
            },
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
