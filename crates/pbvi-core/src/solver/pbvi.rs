//! Point-based value iteration.
//!
//! The engine keeps one alpha vector per belief point. Each backup sweep
//! works in three stages against a frozen snapshot of the previous set Γ:
//!
//! 1. **Projection.** For every action `a`, observation `o` and `α ∈ Γ`:
//!    `Γ_{a,o}(α)[s] = γ · Σ_{s'} T(a,s,s') · O(a,s',o) · α[s']`.
//! 2. **Point-wise cross-sum.** For every action and belief point `b`, start
//!    from the immediate reward vector `R(a,·)` and add, per observation, the
//!    projected vector with the largest value at `b`.
//! 3. **Action choice.** Each belief point keeps the action whose candidate
//!    has the largest value at `b`; the earlier action wins ties.
//!
//! The new set replaces Γ only after every point is done, so the parallel
//! and sequential paths produce identical vectors.
//!
//! `T(a,s,s') · O(a,s',o)` does not depend on Γ and is tabulated once per
//! engine as a projection kernel.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use pbvi_math::{add_assign, argmax_dot, dot};
use rand::RngCore;
use rayon::prelude::*;

use crate::alpha::{best_alpha, value_of, AlphaVector};
use crate::belief::{self, Belief};
use crate::config::SolverConfig;
use crate::error::{PbviError, Result};
use crate::logging::{event_names, Stage};
use crate::model::{ActionId, Model, ObservationId};
use crate::policy::{Policy, PolicyStore};
use crate::sampler::BeliefPointSampler;

/// `T(a,s,s') · O(a,s',o)` laid out as `[a][o][s][s']`.
#[derive(Debug, Clone)]
struct ProjectionKernel {
    num_states: usize,
    num_observations: usize,
    weights: Vec<f64>,
}

impl ProjectionKernel {
    fn build<M: Model + ?Sized>(model: &M) -> Self {
        let (ns, na, no) = (
            model.num_states(),
            model.num_actions(),
            model.num_observations(),
        );
        let mut weights = Vec::with_capacity(na * no * ns * ns);
        for a in 0..na {
            for o in 0..no {
                for s in 0..ns {
                    for next in 0..ns {
                        weights.push(model.transition(a, s, next) * model.observation(a, next, o));
                    }
                }
            }
        }
        Self {
            num_states: ns,
            num_observations: no,
            weights,
        }
    }

    fn row(&self, action: ActionId, observation: ObservationId, state: usize) -> &[f64] {
        let ns = self.num_states;
        let start = ((action * self.num_observations + observation) * ns + state) * ns;
        &self.weights[start..start + ns]
    }

    /// Discounted one-step backup of `values` through `(action, observation)`.
    fn project(
        &self,
        action: ActionId,
        observation: ObservationId,
        values: &[f64],
        discount: f64,
    ) -> Vec<f64> {
        (0..self.num_states)
            .map(|s| discount * dot(self.row(action, observation, s), values))
            .collect()
    }
}

/// PBVI planning engine over a shared model.
pub struct PbviSolver<M: Model> {
    model: Arc<M>,
    config: SolverConfig,
    alpha_vectors: Vec<AlphaVector>,
    belief_points: Vec<Belief>,
    gamma_reward: Vec<Vec<f64>>,
    kernel: ProjectionKernel,
    solved: bool,
}

impl<M: Model> fmt::Debug for PbviSolver<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PbviSolver")
            .field("states", &self.model.num_states())
            .field("actions", &self.model.num_actions())
            .field("alpha_vectors", &self.alpha_vectors.len())
            .field("belief_points", &self.belief_points.len())
            .field("solved", &self.solved)
            .finish_non_exhaustive()
    }
}

impl<M: Model> PbviSolver<M> {
    /// Engine starting from the all-zero placeholder vector and no points.
    pub fn new(model: Arc<M>, config: SolverConfig) -> Self {
        let gamma_reward = (0..model.num_actions())
            .map(|a| (0..model.num_states()).map(|s| model.reward(a, s)).collect())
            .collect();
        let kernel = ProjectionKernel::build(model.as_ref());
        let alpha_vectors = vec![AlphaVector::placeholder(model.num_states())];
        Self {
            model,
            config,
            alpha_vectors,
            belief_points: Vec::new(),
            gamma_reward,
            kernel,
            solved: false,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Shared handle to the model, e.g. for a simulator.
    pub fn model_handle(&self) -> Arc<M> {
        Arc::clone(&self.model)
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn alpha_vectors(&self) -> &[AlphaVector] {
        &self.alpha_vectors
    }

    pub fn belief_points(&self) -> &[Belief] {
        &self.belief_points
    }

    pub fn is_solved(&self) -> bool {
        self.solved
    }

    /// Install the belief points to back up at.
    ///
    /// Resets the value function to the placeholder vector and clears the
    /// solved flag, so the next [`solve`](Self::solve) starts from scratch.
    pub fn add_configs(&mut self, belief_points: Vec<Belief>) -> Result<()> {
        let num_states = self.model.num_states();
        for b in &belief_points {
            b.ensure_len(num_states)?;
        }
        self.belief_points = belief_points;
        self.alpha_vectors = vec![AlphaVector::placeholder(num_states)];
        self.solved = false;
        Ok(())
    }

    /// Sample belief points reachable from `belief` (see [`BeliefPointSampler`]).
    pub fn generate_reachable_belief_points(
        &self,
        belief: &Belief,
        max_points: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Belief>> {
        BeliefPointSampler::new(self.model.as_ref(), &self.config).generate(belief, max_points, rng)
    }

    /// Run `horizon` backup sweeps, then persist the policy if
    /// `config.policy_path` is set. A second call is a no-op.
    pub fn solve(&mut self, horizon: usize) -> Result<()> {
        if self.solved {
            crate::log_event!(
                DEBUG,
                event_names::SOLVE_SKIPPED,
                Stage::Solve,
                "already solved"
            );
            return Ok(());
        }
        if self.model.num_actions() == 0 || self.model.num_observations() == 0 {
            return Err(PbviError::InvalidModel(
                "model has no actions or no observations".to_string(),
            ));
        }

        crate::log_event!(
            INFO,
            event_names::SOLVE_STARTED,
            Stage::Solve,
            "starting backups",
            horizon = horizon,
            belief_points = self.belief_points.len(),
            parallel = self.config.parallel
        );

        if self.belief_points.is_empty() {
            crate::log_event!(
                WARN,
                event_names::SOLVE_SKIPPED,
                Stage::Solve,
                "no belief points; keeping current value function"
            );
        } else {
            for iteration in 0..horizon {
                let next = self.backup(&self.alpha_vectors);
                self.alpha_vectors = next;
                crate::log_event!(
                    DEBUG,
                    event_names::SOLVE_ITERATION,
                    Stage::Solve,
                    "backup sweep done",
                    iteration = iteration + 1,
                    alpha_vectors = self.alpha_vectors.len()
                );
            }
        }

        self.solved = true;
        let best_value = self
            .belief_points
            .iter()
            .filter_map(|b| best_alpha(&self.alpha_vectors, b).map(|(_, v)| v))
            .fold(f64::NEG_INFINITY, f64::max);
        crate::log_event!(
            INFO,
            event_names::SOLVE_FINISHED,
            Stage::Solve,
            "backups finished",
            alpha_vectors = self.alpha_vectors.len(),
            best_value = best_value
        );

        if let Some(path) = self.config.policy_path.clone() {
            self.save_policy(&path)?;
        }
        Ok(())
    }

    /// One backup sweep of `alphas` over the engine's belief points.
    ///
    /// Returns one vector per belief point, in belief-point order.
    pub fn backup(&self, alphas: &[AlphaVector]) -> Vec<AlphaVector> {
        let projections = self.project_all(alphas);
        if self.config.parallel {
            self.belief_points
                .par_iter()
                .filter_map(|b| self.best_for_point(&projections, b))
                .collect()
        } else {
            self.belief_points
                .iter()
                .filter_map(|b| self.best_for_point(&projections, b))
                .collect()
        }
    }

    /// Projected vectors indexed `[a * |O| + o][alpha]`.
    fn project_all(&self, alphas: &[AlphaVector]) -> Vec<Vec<Vec<f64>>> {
        let no = self.model.num_observations();
        let pairs = self.model.num_actions() * no;
        let discount = self.model.discount();
        let project_pair = |pair: usize| -> Vec<Vec<f64>> {
            let (a, o) = (pair / no, pair % no);
            alphas
                .iter()
                .map(|alpha| self.kernel.project(a, o, &alpha.values, discount))
                .collect()
        };
        if self.config.parallel {
            (0..pairs).into_par_iter().map(project_pair).collect()
        } else {
            (0..pairs).map(project_pair).collect()
        }
    }

    fn best_for_point(&self, projections: &[Vec<Vec<f64>>], belief: &Belief) -> Option<AlphaVector> {
        let no = self.model.num_observations();
        let b = belief.probs();
        let mut best: Option<(ActionId, Vec<f64>, f64)> = None;

        for (a, reward) in self.gamma_reward.iter().enumerate() {
            let mut candidate = reward.clone();
            for o in 0..no {
                let branch = &projections[a * no + o];
                if let Some((idx, _)) = argmax_dot(branch, b) {
                    add_assign(&mut candidate, &branch[idx]);
                }
            }
            let value = dot(&candidate, b);
            match &best {
                Some((_, _, best_value)) if value <= *best_value || value.is_nan() => {}
                _ => best = Some((a, candidate, value)),
            }
        }

        best.map(|(action, values, _)| AlphaVector::new(action, values))
    }

    /// Greedy action at `belief` under the current value function.
    ///
    /// Fails with [`PbviError::NoPolicy`] when there is nothing to consult:
    /// no vectors, or only the placeholder of an unsolved engine.
    pub fn get_action(&self, belief: &Belief) -> Result<ActionId> {
        belief.ensure_len(self.model.num_states())?;
        let (idx, value) = best_alpha(&self.alpha_vectors, belief).ok_or(PbviError::NoPolicy)?;
        let action = self.alpha_vectors[idx].action.ok_or(PbviError::NoPolicy)?;
        tracing::trace!(
            target: event_names::POLICY_ACTION,
            action,
            value,
            "greedy action selected"
        );
        Ok(action)
    }

    /// `V(b)` under the current value function.
    pub fn value(&self, belief: &Belief) -> Result<f64> {
        belief.ensure_len(self.model.num_states())?;
        value_of(&self.alpha_vectors, belief).ok_or(PbviError::NoPolicy)
    }

    /// Bayesian filter step under this engine's model.
    pub fn update_belief(
        &self,
        belief: &Belief,
        action: ActionId,
        observation: ObservationId,
    ) -> Result<Belief> {
        belief::update_belief(self.model.as_ref(), belief, action, observation)
    }

    /// Snapshot of the current vectors and belief points.
    pub fn policy(&self) -> Policy {
        Policy::new(self.alpha_vectors.clone(), self.belief_points.clone())
    }

    pub fn save_policy(&self, path: &Path) -> Result<()> {
        PolicyStore::new(path).save(&self.policy())
    }

    /// Replace the value function with a precomputed policy and mark the
    /// engine solved. Belief points are replaced only if the policy has any.
    pub fn set_policy(&mut self, policy: Policy) -> Result<()> {
        policy.check_against(self.model.as_ref())?;
        self.alpha_vectors = policy.alpha_vectors;
        if !policy.beliefs.is_empty() {
            self.belief_points = policy.beliefs;
        }
        self.solved = true;
        Ok(())
    }

    /// Load a policy artifact instead of solving.
    pub fn load_policy(&mut self, path: &Path) -> Result<()> {
        let policy = PolicyStore::new(path).load()?;
        self.set_policy(policy)
    }
}
