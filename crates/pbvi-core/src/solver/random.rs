//! Uniform random baseline.
//!
//! Ignores the belief and picks any action that is legal in at least one
//! state. Useful as the floor that a solved policy should beat in
//! evaluation.

use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::belief::{self, Belief};
use crate::config::SolverConfig;
use crate::error::{PbviError, Result};
use crate::model::{ActionId, Model, ObservationId};

pub struct RandomSolver<M: Model> {
    model: Arc<M>,
    actions: Vec<ActionId>,
    belief_points: Vec<Belief>,
    rng: StdRng,
}

impl<M: Model> fmt::Debug for RandomSolver<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomSolver")
            .field("actions", &self.actions)
            .field("belief_points", &self.belief_points.len())
            .finish_non_exhaustive()
    }
}

impl<M: Model> RandomSolver<M> {
    /// Seeded from `config.seed`, or from OS entropy when unset.
    pub fn new(model: Arc<M>, config: &SolverConfig) -> Self {
        let mut actions: Vec<ActionId> = (0..model.num_states())
            .flat_map(|s| model.legal_actions(s))
            .collect();
        actions.sort_unstable();
        actions.dedup();
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            model,
            actions,
            belief_points: Vec::new(),
            rng,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_handle(&self) -> Arc<M> {
        Arc::clone(&self.model)
    }

    /// Actions the baseline draws from.
    pub fn actions(&self) -> &[ActionId] {
        &self.actions
    }

    /// Kept only for parity with the planning engine.
    pub fn add_configs(&mut self, belief_points: Vec<Belief>) -> Result<()> {
        let num_states = self.model.num_states();
        for b in &belief_points {
            b.ensure_len(num_states)?;
        }
        self.belief_points = belief_points;
        Ok(())
    }

    pub fn solve(&mut self, _horizon: usize) -> Result<()> {
        Ok(())
    }

    pub fn get_action(&mut self, belief: &Belief) -> Result<ActionId> {
        belief.ensure_len(self.model.num_states())?;
        if self.actions.is_empty() {
            return Err(PbviError::NoPolicy);
        }
        let idx = self.rng.random_range(0..self.actions.len());
        Ok(self.actions[idx])
    }

    pub fn update_belief(
        &self,
        belief: &Belief,
        action: ActionId,
        observation: ObservationId,
    ) -> Result<Belief> {
        belief::update_belief(self.model.as_ref(), belief, action, observation)
    }
}
