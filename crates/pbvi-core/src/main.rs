//! PBVI - point-based POMDP planner
//!
//! The main entry point for `pbvi`, handling:
//! - Offline solving and policy persistence
//! - Policy evaluation over simulated episodes
//! - Single simulated runs with either solver
//! - One-off action queries and belief updates
//!
//! Command payloads are JSON on stdout; logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use pbvi_core::config::{
    load_config, validate_config, ConfigError, ConfigOptions, ConfigSource, PbviConfig,
    ResolvedConfig, RunConfig, SolverConfig,
};
use pbvi_core::exit_codes::ExitCode;
use pbvi_core::logging::{event_names, init_logging, LogConfig, LogFormat, LogLevel, Stage};
use pbvi_core::runner::{evaluate_policy, offline_solve, run_episode, seeded_rng, Simulator};
use pbvi_core::{
    log_event, Belief, Model, PbviError, PbviSolver, Solver, SolverKind, TabularModel,
};
use serde::Serialize;
use thiserror::Error;

/// Name accepted by `--model` for the built-in tiger problem.
const BUILTIN_TIGER: &str = "tiger";

/// Point-based value iteration for POMDPs
#[derive(Parser)]
#[command(name = "pbvi")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Config file (TOML, or JSON with a .json extension)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format on stderr (human, jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample reachable beliefs, run the backups and write the policy
    Solve(SolveArgs),

    /// Average total reward of a stored policy over simulated episodes
    Eval(EvalArgs),

    /// Play one simulated episode
    Run(RunArgs),

    /// Best action for a belief under a stored policy
    Action(ActionArgs),

    /// Filter a belief through one action and observation
    Update(UpdateArgs),
}

impl Commands {
    fn stage(&self) -> Stage {
        match self {
            Commands::Solve(_) => Stage::Solve,
            Commands::Eval(_) => Stage::Eval,
            Commands::Run(_) => Stage::Run,
            Commands::Action(_) | Commands::Update(_) => Stage::Policy,
        }
    }
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Model JSON file, or "tiger" for the built-in tiger problem
    #[arg(long, short = 'm')]
    model: String,

    /// Initial belief as comma-separated probabilities (default: uniform)
    #[arg(long, short = 'b')]
    belief: Option<String>,
}

#[derive(Args, Debug)]
struct SolveArgs {
    #[command(flatten)]
    model: ModelArgs,

    /// Where to write the policy
    #[arg(long, short = 'o')]
    out: Option<PathBuf>,

    /// Number of backup sweeps
    #[arg(long)]
    horizon: Option<usize>,

    /// Maximum number of sampled belief points
    #[arg(long)]
    points: Option<usize>,

    /// Seed for belief sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Run backups on a single thread
    #[arg(long)]
    sequential: bool,
}

#[derive(Args, Debug)]
struct EvalArgs {
    #[command(flatten)]
    model: ModelArgs,

    /// Policy file written by `pbvi solve`
    #[arg(long, short = 'p')]
    policy: Option<PathBuf>,

    /// Number of episodes
    #[arg(long)]
    simulations: Option<usize>,

    /// Steps per episode
    #[arg(long)]
    max_play: Option<usize>,

    /// Cost budget per episode
    #[arg(long, allow_negative_numbers = true)]
    budget: Option<f64>,

    /// Ignore the policy and act uniformly at random
    #[arg(long)]
    random_policy: bool,

    /// Seed for the simulated environment
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    model: ModelArgs,

    /// Solver driving the agent
    #[arg(long, value_enum, default_value_t = SolverKind::Pbvi)]
    solver: SolverKind,

    /// Use a stored policy instead of solving first (pbvi only)
    #[arg(long, short = 'p')]
    policy: Option<PathBuf>,

    /// Steps in the episode
    #[arg(long)]
    max_play: Option<usize>,

    /// Cost budget for the episode
    #[arg(long, allow_negative_numbers = true)]
    budget: Option<f64>,

    /// Number of backup sweeps when solving
    #[arg(long)]
    horizon: Option<usize>,

    /// Seed for sampling, the solver and the environment
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct ActionArgs {
    /// Model JSON file, or "tiger" for the built-in tiger problem
    #[arg(long, short = 'm')]
    model: String,

    /// Policy file written by `pbvi solve`
    #[arg(long, short = 'p')]
    policy: PathBuf,

    /// Belief as comma-separated probabilities
    #[arg(long, short = 'b')]
    belief: String,
}

#[derive(Args, Debug)]
struct UpdateArgs {
    /// Model JSON file, or "tiger" for the built-in tiger problem
    #[arg(long, short = 'm')]
    model: String,

    /// Belief as comma-separated probabilities
    #[arg(long, short = 'b')]
    belief: String,

    /// Action taken (index or name)
    #[arg(long, short = 'a')]
    action: String,

    /// Observation received (index or name)
    #[arg(long, short = 'o')]
    observation: String,
}

/// Failures surfaced by the CLI, each mapped to an exit code.
#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Args(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to load model '{name}': {source}")]
    Model {
        name: String,
        #[source]
        source: PbviError,
    },

    #[error(transparent)]
    Planner(#[from] PbviError),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Args(_) => ExitCode::ArgsError,
            CliError::Config(_) => ExitCode::ConfigError,
            CliError::Model { source, .. } => match source {
                PbviError::Io(_) => ExitCode::IoError,
                _ => ExitCode::ModelError,
            },
            CliError::Planner(e) => ExitCode::for_error(e),
        }
    }

    fn remediation(&self) -> Option<&'static str> {
        match self {
            CliError::Args(_) => None,
            CliError::Config(_) => Some("Fix or remove the config file; see 'pbvi --help'."),
            CliError::Model { source, .. } | CliError::Planner(source) => {
                Some(source.remediation())
            }
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::from_env(cli.global.log_level, cli.global.log_format)
        .with_verbosity(cli.global.verbose, cli.global.quiet);
    init_logging(&log_config);

    let result = load_pbvi_config(&cli.global).and_then(|config| match &cli.command {
        Commands::Solve(args) => run_solve(config, args),
        Commands::Eval(args) => run_eval(config, args),
        Commands::Run(args) => run_run(config, args),
        Commands::Action(args) => run_action(args),
        Commands::Update(args) => run_update(args),
    });

    let exit_code = match result {
        Ok(()) => ExitCode::Clean,
        Err(err) => report_error(&err, cli.command.stage()),
    };
    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// Shared helpers
// ============================================================================

fn load_pbvi_config(global: &GlobalOpts) -> Result<PbviConfig, CliError> {
    let options = ConfigOptions {
        config_path: global.config.clone(),
        ..ConfigOptions::default()
    };
    let ResolvedConfig { config, source } = load_config(&options)?;
    match &source {
        ConfigSource::Defaults => log_event!(
            DEBUG,
            event_names::CONFIG_DEFAULT_USED,
            Stage::Init,
            "using built-in defaults"
        ),
        ConfigSource::Explicit(path) | ConfigSource::Env(path) | ConfigSource::Xdg(path) => {
            log_event!(
                INFO,
                event_names::CONFIG_LOADED,
                Stage::Init,
                "config loaded",
                path = tracing::field::display(path.display())
            )
        }
    }
    Ok(config)
}

/// Config files are validated on load; flags layered on top are checked here.
fn validate_overrides(solver: &SolverConfig, run: &RunConfig) -> Result<(), CliError> {
    let merged = PbviConfig {
        solver: solver.clone(),
        run: run.clone(),
    };
    validate_config(&merged).map_err(|e| CliError::Args(e.to_string()))
}

fn load_model(name: &str) -> Result<TabularModel, CliError> {
    let model = if name.eq_ignore_ascii_case(BUILTIN_TIGER) {
        Ok(TabularModel::tiger())
    } else {
        TabularModel::from_json_file(std::path::Path::new(name))
    }
    .map_err(|source| CliError::Model {
        name: name.to_string(),
        source,
    })?;

    log_event!(
        INFO,
        event_names::MODEL_LOADED,
        Stage::Init,
        "model loaded",
        model = model.name.as_deref().unwrap_or(name),
        states = model.num_states(),
        actions = model.num_actions(),
        observations = model.num_observations()
    );
    Ok(model)
}

/// Parse "0.5,0.5" into a belief over `num_states` states.
fn parse_belief(text: &str, num_states: usize) -> Result<Belief, CliError> {
    let probs = text
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|_| CliError::Args(format!("belief entry '{}' is not a number", part.trim())))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let belief = Belief::new(probs)?;
    belief.ensure_len(num_states)?;
    Ok(belief)
}

fn initial_belief(text: Option<&str>, num_states: usize) -> Result<Belief, CliError> {
    match text {
        Some(text) => parse_belief(text, num_states),
        None => Ok(Belief::uniform(num_states)),
    }
}

/// Resolve an index or a name against `names`.
fn parse_index(kind: &str, text: &str, names: &[String]) -> Result<usize, CliError> {
    if let Ok(idx) = text.parse::<usize>() {
        if idx < names.len() {
            return Ok(idx);
        }
    }
    names
        .iter()
        .position(|n| n == text)
        .ok_or_else(|| CliError::Args(format!("unknown {kind} '{text}'")))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value).map_err(PbviError::from)?;
    println!("{}", text);
    Ok(())
}

fn report_error(err: &CliError, stage: Stage) -> ExitCode {
    let exit_code = err.exit_code();
    log_event!(
        ERROR,
        event_names::COMMAND_FAILED,
        stage,
        "command failed",
        exit_code = exit_code.as_i32(),
        error = tracing::field::display(err)
    );
    let planner_code = match err {
        CliError::Planner(e) | CliError::Model { source: e, .. } => Some(e.code()),
        _ => None,
    };
    let response = serde_json::json!({
        "status": "error",
        "error": {
            "exit_code": exit_code.as_i32(),
            "code_name": exit_code.code_name(),
            "code": planner_code,
            "message": err.to_string(),
            "remediation": err.remediation(),
        }
    });
    match serde_json::to_string_pretty(&response) {
        Ok(text) => eprintln!("{}", text),
        Err(_) => eprintln!("error: {}", err),
    }
    exit_code
}

// ============================================================================
// Command implementations
// ============================================================================

fn run_solve(config: PbviConfig, args: &SolveArgs) -> Result<(), CliError> {
    let model = load_model(&args.model.model)?;
    let belief = initial_belief(args.model.belief.as_deref(), model.num_states())?;

    let mut solver_config = config.solver;
    if let Some(horizon) = args.horizon {
        solver_config.horizon = horizon;
    }
    if let Some(points) = args.points {
        solver_config.max_belief_points = points;
    }
    if args.seed.is_some() {
        solver_config.seed = args.seed;
    }
    if args.sequential {
        solver_config.parallel = false;
    }
    if args.out.is_some() {
        solver_config.policy_path = args.out.clone();
    }
    validate_overrides(&solver_config, &config.run)?;

    let mut rng = seeded_rng(solver_config.seed);
    let mut engine = PbviSolver::new(Arc::new(model), solver_config);
    let policy = offline_solve(&mut engine, &belief, &mut rng)?;

    // Without --out the vectors go to stdout instead.
    let inline_policy = engine
        .config()
        .policy_path
        .is_none()
        .then_some(&policy.alpha_vectors);
    let output = serde_json::json!({
        "command": "solve",
        "model": args.model.model,
        "horizon": engine.config().horizon,
        "belief_points": policy.beliefs.len(),
        "alpha_vectors": policy.alpha_vectors.len(),
        "initial_belief": belief,
        "initial_action": engine.get_action(&belief).ok(),
        "initial_value": engine.value(&belief).ok(),
        "policy_path": engine.config().policy_path,
        "policy": inline_policy,
    });
    print_json(&output)
}

fn run_eval(config: PbviConfig, args: &EvalArgs) -> Result<(), CliError> {
    let model = load_model(&args.model.model)?;
    let belief = initial_belief(args.model.belief.as_deref(), model.num_states())?;

    let mut run = config.run;
    if let Some(simulations) = args.simulations {
        run.simulations = simulations;
    }
    if let Some(max_play) = args.max_play {
        run.max_play = max_play;
    }
    if args.budget.is_some() {
        run.budget = args.budget;
    }
    if args.seed.is_some() {
        run.seed = args.seed;
    }
    run.random_policy |= args.random_policy;
    validate_overrides(&config.solver, &run)?;

    let mut engine = PbviSolver::new(Arc::new(model), config.solver);
    match &args.policy {
        Some(path) => engine.load_policy(path)?,
        None if run.random_policy => {}
        None => {
            return Err(CliError::Args(
                "--policy is required unless --random-policy is set".to_string(),
            ))
        }
    }

    let mut solver = Solver::Pbvi(engine);
    let summary = evaluate_policy(&mut solver, &belief, &run)?;

    let output = serde_json::json!({
        "command": "eval",
        "model": args.model.model,
        "random_policy": run.random_policy,
        "max_play": run.max_play,
        "summary": summary,
    });
    print_json(&output)
}

fn run_run(config: PbviConfig, args: &RunArgs) -> Result<(), CliError> {
    let model = Arc::new(load_model(&args.model.model)?);
    let belief = initial_belief(args.model.belief.as_deref(), model.num_states())?;

    let mut solver_config = config.solver;
    let mut run = config.run;
    if let Some(horizon) = args.horizon {
        solver_config.horizon = horizon;
    }
    if let Some(max_play) = args.max_play {
        run.max_play = max_play;
    }
    if args.budget.is_some() {
        run.budget = args.budget;
    }
    if args.seed.is_some() {
        solver_config.seed = args.seed;
        run.seed = args.seed;
    }
    validate_overrides(&solver_config, &run)?;
    if args.solver == SolverKind::Random && args.policy.is_some() {
        return Err(CliError::Args(
            "--policy only applies to --solver pbvi".to_string(),
        ));
    }

    let mut solver = Solver::new(args.solver, Arc::clone(&model), solver_config);
    if let Some(engine) = solver.as_pbvi_mut() {
        match &args.policy {
            Some(path) => engine.load_policy(path)?,
            None => {
                let mut rng = seeded_rng(engine.config().seed);
                offline_solve(engine, &belief, &mut rng)?;
            }
        }
    }

    let mut simulator = Simulator::new(model, &belief, run.seed)?;
    let report = run_episode(&mut solver, &mut simulator, &belief, &run)?;

    let output = serde_json::json!({
        "command": "run",
        "model": args.model.model,
        "solver": args.solver,
        "report": report,
    });
    print_json(&output)
}

fn run_action(args: &ActionArgs) -> Result<(), CliError> {
    let model = load_model(&args.model)?;
    let belief = parse_belief(&args.belief, model.num_states())?;
    let action_names = model.actions().to_vec();

    let mut engine = PbviSolver::new(Arc::new(model), Default::default());
    engine.load_policy(&args.policy)?;
    let action = engine.get_action(&belief)?;
    let value = engine.value(&belief)?;

    log_event!(
        INFO,
        event_names::POLICY_ACTION,
        Stage::Policy,
        "action selected",
        action = action,
        value = value
    );

    let output = serde_json::json!({
        "command": "action",
        "belief": belief,
        "action": action,
        "action_name": action_names.get(action),
        "value": value,
    });
    print_json(&output)
}

fn run_update(args: &UpdateArgs) -> Result<(), CliError> {
    let model = load_model(&args.model)?;
    let belief = parse_belief(&args.belief, model.num_states())?;
    let action = parse_index("action", &args.action, model.actions())?;
    let observation = parse_index("observation", &args.observation, model.observations())?;

    let posterior = pbvi_core::update_belief(&model, &belief, action, observation)?;

    let output = serde_json::json!({
        "command": "update",
        "belief": belief,
        "action": action,
        "observation": observation,
        "posterior": posterior,
    });
    print_json(&output)
}
