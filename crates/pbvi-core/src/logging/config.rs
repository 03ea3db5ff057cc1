//! Where the log level and format come from.
//!
//! Lowest to highest precedence: built-in defaults, `RUST_LOG` (level only),
//! `PBVI_LOG` / `PBVI_LOG_FORMAT`, `--log-level` / `--log-format`, and
//! finally `-v` / `-q`.

use clap::ValueEnum;

/// Log level override.
pub const LOG_LEVEL_ENV_VAR: &str = "PBVI_LOG";

/// Log format override (`human` or `jsonl`).
pub const LOG_FORMAT_ENV_VAR: &str = "PBVI_LOG_FORMAT";

/// How log lines are rendered on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    #[value(alias = "console")]
    Human,
    /// One JSON object per line, for scripted solver runs.
    #[value(alias = "json")]
    Jsonl,
}

/// Minimum level that reaches the subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    #[value(alias = "warning")]
    Warn,
    Error,
    #[value(alias = "quiet")]
    Off,
}

impl LogLevel {
    /// Directive understood by `EnvFilter`.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }

    /// Most verbose level named anywhere in a `RUST_LOG` string.
    ///
    /// Per-target directives such as `solve.iteration=debug` count too; the
    /// full directive string is still handed to `EnvFilter` at init.
    fn most_verbose_in(directives: &str) -> Option<LogLevel> {
        let lower = directives.to_ascii_lowercase();
        [LogLevel::Trace, LogLevel::Debug, LogLevel::Info, LogLevel::Warn, LogLevel::Error]
            .into_iter()
            .find(|level| lower.contains(level.as_directive()))
    }
}

/// Resolved logging settings for one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LogLevel,
}

impl LogConfig {
    /// Resolve from the process environment, then the CLI flags.
    pub fn from_env(cli_level: Option<LogLevel>, cli_format: Option<LogFormat>) -> Self {
        Self::resolve(|key| std::env::var(key).ok(), cli_level, cli_format)
    }

    /// Resolve against an arbitrary variable lookup.
    ///
    /// Unparseable variable values are ignored rather than failing startup.
    pub fn resolve<F>(lookup: F, cli_level: Option<LogLevel>, cli_format: Option<LogFormat>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_level = match lookup(LOG_LEVEL_ENV_VAR) {
            Some(val) => LogLevel::from_str(&val, true).ok(),
            None => lookup("RUST_LOG").and_then(|val| LogLevel::most_verbose_in(&val)),
        };
        let env_format = lookup(LOG_FORMAT_ENV_VAR).and_then(|val| LogFormat::from_str(&val, true).ok());

        LogConfig {
            format: cli_format.or(env_format).unwrap_or_default(),
            level: cli_level.or(env_level).unwrap_or_default(),
        }
    }

    /// Apply `-v` / `-q`. `-q` wins over any number of `-v`.
    pub fn with_verbosity(mut self, verbose: u8, quiet: bool) -> Self {
        self.level = match (quiet, verbose) {
            (true, _) => LogLevel::Error,
            (false, 0) => self.level,
            (false, 1) => LogLevel::Debug,
            (false, _) => LogLevel::Trace,
        };
        self
    }

    /// Whether human output should carry targets and source locations.
    pub fn is_verbose(&self) -> bool {
        self.level <= LogLevel::Debug
    }
}
