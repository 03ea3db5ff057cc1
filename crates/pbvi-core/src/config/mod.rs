//! Configuration loading and validation for the planner.
//!
//! This module handles:
//! - Solver and runner settings (`SolverConfig`, `RunConfig`)
//! - Config resolution order (CLI > env > XDG > defaults)
//! - TOML or JSON config files, chosen by extension
//! - Semantic validation (positive sizes, finite tolerances)
//!
//! Nothing here is global: the resolved [`PbviConfig`] is passed explicitly
//! into the solver and runner entry points.

pub mod validation;

pub use validation::{validate_config, ValidationError};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default XDG config directory name.
const CONFIG_DIR_NAME: &str = "pbvi";

/// Default config file name inside the config directory.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "PBVI_CONFIG";

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Invalid JSON in config file {path}: {source}")]
    JsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid TOML in config file {path}: {source}")]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Semantic validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Settings for belief sampling and value iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Number of backup sweeps (T).
    pub horizon: usize,
    /// Upper bound on sampled belief points, including the initial belief.
    pub max_belief_points: usize,
    /// Random-walk steps per sampling round.
    pub trials_per_round: usize,
    /// Sampling rounds before giving up on reaching `max_belief_points`.
    pub max_rounds: usize,
    /// Max-abs difference under which two sampled beliefs count as the same
    /// point. Zero means exact equality.
    pub dedup_tolerance: f64,
    /// Run each backup sweep on the rayon thread pool.
    pub parallel: bool,
    /// Seed for the sampler RNG; entropy-seeded when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Where `solve` persists the resulting policy, if anywhere.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_path: Option<PathBuf>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            horizon: 20,
            max_belief_points: 50,
            trials_per_round: 10,
            max_rounds: 100,
            dedup_tolerance: 0.0,
            parallel: true,
            seed: None,
            policy_path: None,
        }
    }
}

/// Settings for simulated episodes and policy evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Steps per episode.
    pub max_play: usize,
    /// Cost budget per episode; the episode stops once it is spent.
    /// Unlimited when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    /// Independent episodes to average during evaluation.
    pub simulations: usize,
    /// Pick uniformly random actions instead of consulting the policy.
    pub random_policy: bool,
    /// Seed for the environment RNG; entropy-seeded when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_play: 10,
            budget: None,
            simulations: 1,
            random_policy: false,
            seed: None,
        }
    }
}

/// Complete configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PbviConfig {
    pub solver: SolverConfig,
    pub run: RunConfig,
}

/// Where a resolved configuration came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    /// Path given on the command line.
    Explicit(PathBuf),
    /// Path taken from `PBVI_CONFIG`.
    Env(PathBuf),
    /// `$XDG_CONFIG_HOME/pbvi/config.toml`.
    Xdg(PathBuf),
    /// Built-in defaults.
    Defaults,
}

/// Resolved configuration with provenance information.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: PbviConfig,
    pub source: ConfigSource,
}

/// Configuration resolution options.
#[derive(Debug, Default)]
pub struct ConfigOptions {
    /// Explicit config file (highest priority).
    pub config_path: Option<PathBuf>,
    /// Explicit config directory, replacing the XDG lookup.
    pub config_dir: Option<PathBuf>,
    /// Skip the `PBVI_CONFIG` lookup.
    pub ignore_env: bool,
}

/// Load configuration with the standard resolution order.
///
/// Resolution order (highest to lowest priority):
/// 1. Explicit path (via ConfigOptions)
/// 2. Environment variable (PBVI_CONFIG)
/// 3. Config directory (~/.config/pbvi/config.toml) if the file exists
/// 4. Built-in defaults
pub fn load_config(options: &ConfigOptions) -> Result<ResolvedConfig, ConfigError> {
    if let Some(path) = &options.config_path {
        let config = load_config_file(path)?;
        return Ok(ResolvedConfig {
            config,
            source: ConfigSource::Explicit(path.clone()),
        });
    }

    if !options.ignore_env {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let path = PathBuf::from(path);
            let config = load_config_file(&path)?;
            return Ok(ResolvedConfig {
                config,
                source: ConfigSource::Env(path),
            });
        }
    }

    let default_path = resolve_config_dir(options).join(CONFIG_FILE_NAME);
    if default_path.exists() {
        let config = load_config_file(&default_path)?;
        return Ok(ResolvedConfig {
            config,
            source: ConfigSource::Xdg(default_path),
        });
    }

    let config = PbviConfig::default();
    validate_config(&config)?;
    Ok(ResolvedConfig {
        config,
        source: ConfigSource::Defaults,
    })
}

/// Resolve the config directory.
fn resolve_config_dir(options: &ConfigOptions) -> PathBuf {
    if let Some(dir) = &options.config_dir {
        return dir.clone();
    }

    let xdg_config = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config")
        });

    xdg_config.join(CONFIG_DIR_NAME)
}

/// Load and validate a config file. `.json` files are parsed as JSON,
/// everything else as TOML.
pub fn load_config_file(path: &Path) -> Result<PbviConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let config: PbviConfig = if is_json {
        serde_json::from_str(&content).map_err(|e| ConfigError::JsonParse {
            path: path.to_path_buf(),
            source: e,
        })?
    } else {
        toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
            path: path.to_path_buf(),
            source: e,
        })?
    };

    validate_config(&config)?;
    Ok(config)
}
