//! Simulated episodes and policy evaluation.
//!
//! The [`Simulator`] plays the environment: it holds the true hidden state
//! (drawn from the initial belief) and advances it with the model's
//! stochastic step. The agent side only ever sees observations and keeps its
//! own belief through the solver's filter.

use std::sync::Arc;

use pbvi_math::{mean, std_dev};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::Serialize;

use crate::belief::Belief;
use crate::config::RunConfig;
use crate::error::Result;
use crate::logging::{event_names, format_probs, Stage};
use crate::model::{ActionId, Model, ObservationId, StateId, Step};
use crate::policy::Policy;
use crate::solver::{PbviSolver, Solver};

/// Environment stand-in owning the hidden state and its random source.
#[derive(Debug)]
pub struct Simulator<M: Model> {
    model: Arc<M>,
    state: StateId,
    rng: StdRng,
}

impl<M: Model> Simulator<M> {
    /// Start in a state drawn from `initial`.
    pub fn new(model: Arc<M>, initial: &Belief, seed: Option<u64>) -> Result<Self> {
        initial.ensure_len(model.num_states())?;
        let mut rng = seeded_rng(seed);
        let state = initial.sample_state(&mut rng);
        Ok(Self { model, state, rng })
    }

    /// Start in a known state.
    pub fn with_state(model: Arc<M>, state: StateId, seed: Option<u64>) -> Result<Self> {
        model.ensure_state(state)?;
        Ok(Self {
            model,
            state,
            rng: seeded_rng(seed),
        })
    }

    /// The true hidden state.
    pub fn state(&self) -> StateId {
        self.state
    }

    /// Apply `action` to the hidden state.
    pub fn step(&mut self, action: ActionId) -> Result<Step> {
        self.model.ensure_action(action)?;
        let step = self.model.simulate_action(self.state, action, &mut self.rng);
        self.state = step.next_state;
        Ok(step)
    }

    /// Uniformly random action over the whole action set.
    pub fn random_action(&mut self) -> ActionId {
        self.rng.random_range(0..self.model.num_actions().max(1))
    }
}

/// Seeded generator when `seed` is set, OS entropy otherwise.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// One step of an episode as seen from outside.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    pub step: usize,
    pub action: ActionId,
    pub observation: ObservationId,
    pub reward: f64,
    pub cost: f64,
    /// Hidden state after the step.
    pub state: StateId,
    /// Agent belief after filtering the observation.
    pub belief: Belief,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeReport {
    pub initial_state: StateId,
    pub initial_belief: Belief,
    pub steps: Vec<StepRecord>,
    pub total_reward: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_budget: Option<f64>,
    pub budget_spent: bool,
}

/// Play up to `run.max_play` steps from `belief`.
///
/// Stops early once a configured budget is used up. With
/// `run.random_policy` the solver is bypassed and actions are drawn
/// uniformly.
pub fn run_episode<M: Model>(
    solver: &mut Solver<M>,
    simulator: &mut Simulator<M>,
    belief: &Belief,
    run: &RunConfig,
) -> Result<EpisodeReport> {
    let initial_state = simulator.state();
    let initial_belief = belief.clone();
    let mut belief = belief.clone();
    let mut budget = run.budget;
    let mut total_reward = 0.0;
    let mut budget_spent = false;
    let mut steps = Vec::with_capacity(run.max_play);

    crate::log_event!(
        INFO,
        event_names::RUN_STARTED,
        Stage::Run,
        "episode started",
        state = initial_state,
        belief = tracing::field::display(format_probs(belief.probs())),
        max_play = run.max_play
    );

    for step in 0..run.max_play {
        let action = if run.random_policy {
            simulator.random_action()
        } else {
            solver.get_action(&belief)?
        };
        let outcome = simulator.step(action)?;
        belief = solver.update_belief(&belief, action, outcome.observation)?;
        total_reward += outcome.reward;
        if let Some(b) = budget.as_mut() {
            *b -= outcome.cost;
        }

        crate::log_event!(
            INFO,
            event_names::RUN_STEP,
            Stage::Run,
            "step",
            step = step + 1,
            action = action,
            observation = outcome.observation,
            reward = outcome.reward,
            state = outcome.next_state,
            belief = tracing::field::display(format_probs(belief.probs()))
        );

        steps.push(StepRecord {
            step: step + 1,
            action,
            observation: outcome.observation,
            reward: outcome.reward,
            cost: outcome.cost,
            state: outcome.next_state,
            belief: belief.clone(),
            budget,
        });

        if budget.is_some_and(|b| b <= 0.0) {
            budget_spent = true;
            crate::log_event!(
                INFO,
                event_names::RUN_BUDGET_SPENT,
                Stage::Run,
                "budget spent",
                step = step + 1
            );
            break;
        }
    }

    crate::log_event!(
        INFO,
        event_names::RUN_FINISHED,
        Stage::Run,
        "episode finished",
        steps = steps.len(),
        total_reward = total_reward
    );

    Ok(EpisodeReport {
        initial_state,
        initial_belief,
        steps,
        total_reward,
        remaining_budget: budget,
        budget_spent,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationSummary {
    pub simulations: usize,
    pub mean_total_reward: f64,
    pub std_total_reward: f64,
    pub totals: Vec<f64>,
}

/// Average total reward over `run.simulations` independent episodes.
///
/// Episode `i` seeds its simulator with `run.seed + i` when a seed is set.
pub fn evaluate_policy<M: Model>(
    solver: &mut Solver<M>,
    belief: &Belief,
    run: &RunConfig,
) -> Result<EvaluationSummary> {
    crate::log_event!(
        INFO,
        event_names::EVAL_STARTED,
        Stage::Eval,
        "evaluation started",
        simulations = run.simulations,
        max_play = run.max_play,
        random_policy = run.random_policy
    );

    let model = solver.model_handle();
    let mut totals = Vec::with_capacity(run.simulations);
    for i in 0..run.simulations {
        let seed = run.seed.map(|s| s.wrapping_add(i as u64));
        let mut simulator = Simulator::new(Arc::clone(&model), belief, seed)?;
        let report = run_episode(solver, &mut simulator, belief, run)?;
        totals.push(report.total_reward);
    }

    let summary = EvaluationSummary {
        simulations: totals.len(),
        mean_total_reward: mean(&totals),
        std_total_reward: std_dev(&totals),
        totals,
    };
    crate::log_event!(
        INFO,
        event_names::EVAL_FINISHED,
        Stage::Eval,
        "evaluation finished",
        simulations = summary.simulations,
        mean_total_reward = summary.mean_total_reward,
        std_total_reward = summary.std_total_reward
    );
    Ok(summary)
}

/// Sample reachable beliefs from `belief`, back them up for
/// `config.horizon` sweeps, and return the resulting policy.
///
/// The engine persists the policy itself when `config.policy_path` is set.
pub fn offline_solve<M: Model>(
    solver: &mut PbviSolver<M>,
    belief: &Belief,
    rng: &mut dyn RngCore,
) -> Result<Policy> {
    let max_points = solver.config().max_belief_points;
    let horizon = solver.config().horizon;
    let points = solver.generate_reachable_belief_points(belief, max_points, rng)?;
    solver.add_configs(points)?;
    solver.solve(horizon)?;
    Ok(solver.policy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SolverConfig;
    use crate::model::TabularModel;
    use crate::solver::SolverKind;

    const LISTEN: ActionId = 0;

    fn tiger() -> Arc<TabularModel> {
        Arc::new(TabularModel::tiger())
    }

    fn solved_tiger() -> Solver<TabularModel> {
        let config = SolverConfig {
            seed: Some(1),
            parallel: false,
            ..SolverConfig::default()
        };
        let mut engine = PbviSolver::new(tiger(), config);
        let mut rng = StdRng::seed_from_u64(1);
        offline_solve(&mut engine, &Belief::uniform(2), &mut rng).unwrap();
        Solver::Pbvi(engine)
    }

    #[test]
    fn simulator_starts_in_a_state_the_belief_allows() {
        let certain = Belief::certain(2, 1).unwrap();
        for seed in 0..10 {
            let sim = Simulator::new(tiger(), &certain, Some(seed)).unwrap();
            assert_eq!(sim.state(), 1);
        }
    }

    #[test]
    fn listening_never_moves_the_tiger() {
        let mut sim = Simulator::with_state(tiger(), 0, Some(3)).unwrap();
        for _ in 0..20 {
            let step = sim.step(LISTEN).unwrap();
            assert_eq!(step.next_state, 0);
            assert_eq!(sim.state(), 0);
        }
        assert!(sim.step(9).is_err());
        assert!(Simulator::with_state(tiger(), 2, None).is_err());
    }

    #[test]
    fn episode_runs_max_play_steps() {
        let mut solver = solved_tiger();
        let belief = Belief::uniform(2);
        let mut sim = Simulator::new(solver.model_handle(), &belief, Some(5)).unwrap();
        let run = RunConfig {
            max_play: 7,
            ..RunConfig::default()
        };
        let report = run_episode(&mut solver, &mut sim, &belief, &run).unwrap();
        assert_eq!(report.steps.len(), 7);
        assert_eq!(report.initial_belief, belief);
        assert!(!report.budget_spent);
        let sum: f64 = report.steps.iter().map(|s| s.reward).sum();
        assert!((sum - report.total_reward).abs() < 1e-9);
        // First move from the uniform prior is always to listen.
        assert_eq!(report.steps[0].action, LISTEN);
    }

    #[test]
    fn episode_stops_when_budget_spent() {
        let model = TabularModel::tiger()
            .with_costs(vec![vec![1.0, 1.0], vec![1.0, 1.0], vec![1.0, 1.0]])
            .unwrap();
        let model = Arc::new(model);
        let mut solver = Solver::new(
            SolverKind::Random,
            Arc::clone(&model),
            SolverConfig {
                seed: Some(2),
                ..SolverConfig::default()
            },
        );
        let belief = Belief::uniform(2);
        let mut sim = Simulator::new(model, &belief, Some(2)).unwrap();
        let run = RunConfig {
            max_play: 10,
            budget: Some(3.0),
            ..RunConfig::default()
        };
        let report = run_episode(&mut solver, &mut sim, &belief, &run).unwrap();
        assert_eq!(report.steps.len(), 3);
        assert!(report.budget_spent);
        assert_eq!(report.remaining_budget, Some(0.0));
    }

    #[test]
    fn evaluation_is_reproducible_with_seed() {
        let run = RunConfig {
            max_play: 5,
            simulations: 4,
            seed: Some(10),
            ..RunConfig::default()
        };
        let belief = Belief::uniform(2);
        let a = evaluate_policy(&mut solved_tiger(), &belief, &run).unwrap();
        let b = evaluate_policy(&mut solved_tiger(), &belief, &run).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.simulations, 4);
        assert_eq!(a.totals.len(), 4);
        assert!((a.mean_total_reward - mean(&a.totals)).abs() < 1e-12);
    }

    #[test]
    fn random_policy_bypasses_unsolved_engine() {
        let mut solver = Solver::new(SolverKind::Pbvi, tiger(), SolverConfig::default());
        let run = RunConfig {
            max_play: 3,
            random_policy: true,
            seed: Some(4),
            ..RunConfig::default()
        };
        let summary = evaluate_policy(&mut solver, &Belief::uniform(2), &run).unwrap();
        assert_eq!(summary.totals.len(), 1);
    }
}
