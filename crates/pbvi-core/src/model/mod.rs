//! The environment model consumed by the planner.
//!
//! A model exposes finite, ordered sets of states, actions and observations
//! (indices are the identifiers), a discount factor and the three POMDP
//! functions:
//!
//!   T(a, s, s') = P(s' | s, a)
//!   O(a, s', o) = P(o | s', a)
//!   R(a, s)
//!
//! The probability functions are treated as pure and may be called from many
//! threads at once during a parallel backup. Stochastic simulation receives
//! its random source per call, so implementations hold no RNG state.

pub mod tabular;

pub use tabular::TabularModel;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::{PbviError, Result};

/// Index into [`Model::states`].
pub type StateId = usize;
/// Index into [`Model::actions`].
pub type ActionId = usize;
/// Index into [`Model::observations`].
pub type ObservationId = usize;

/// Outcome of one simulated environment step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub next_state: StateId,
    pub observation: ObservationId,
    pub reward: f64,
    pub cost: f64,
}

/// A finite POMDP.
pub trait Model: Send + Sync {
    /// State names; the position is the state id.
    fn states(&self) -> &[String];

    /// Action names; the position is the action id.
    fn actions(&self) -> &[String];

    /// Observation names; the position is the observation id.
    fn observations(&self) -> &[String];

    /// Discount factor in (0, 1].
    fn discount(&self) -> f64;

    /// P(to | from, action).
    fn transition(&self, action: ActionId, from: StateId, to: StateId) -> f64;

    /// P(observation | next, action).
    fn observation(&self, action: ActionId, next: StateId, observation: ObservationId) -> f64;

    /// Immediate reward for taking `action` in `state`.
    fn reward(&self, action: ActionId, state: StateId) -> f64;

    /// Resource cost charged for taking `action` in `state`.
    fn cost(&self, _action: ActionId, _state: StateId) -> f64 {
        0.0
    }

    /// Actions available in `state`. Defaults to every action.
    fn legal_actions(&self, _state: StateId) -> Vec<ActionId> {
        (0..self.num_actions()).collect()
    }

    /// Sample one environment step from `state` under `action`.
    ///
    /// The default draws the successor from the transition row and the
    /// observation from the observation row of that successor.
    fn simulate_action(&self, state: StateId, action: ActionId, rng: &mut dyn RngCore) -> Step {
        let next_state = sample_index(
            (0..self.num_states()).map(|to| self.transition(action, state, to)),
            rng,
        );
        let observation = sample_index(
            (0..self.num_observations()).map(|o| self.observation(action, next_state, o)),
            rng,
        );
        Step {
            next_state,
            observation,
            reward: self.reward(action, state),
            cost: self.cost(action, state),
        }
    }

    fn num_states(&self) -> usize {
        self.states().len()
    }

    fn num_actions(&self) -> usize {
        self.actions().len()
    }

    fn num_observations(&self) -> usize {
        self.observations().len()
    }

    /// Fails with [`PbviError::UnknownAction`] if `action` is out of range.
    fn ensure_action(&self, action: ActionId) -> Result<()> {
        if action < self.num_actions() {
            Ok(())
        } else {
            Err(PbviError::UnknownAction {
                action,
                available: self.num_actions(),
            })
        }
    }

    /// Fails with [`PbviError::UnknownObservation`] if `observation` is out of range.
    fn ensure_observation(&self, observation: ObservationId) -> Result<()> {
        if observation < self.num_observations() {
            Ok(())
        } else {
            Err(PbviError::UnknownObservation {
                observation,
                available: self.num_observations(),
            })
        }
    }

    /// Fails with [`PbviError::UnknownState`] if `state` is out of range.
    fn ensure_state(&self, state: StateId) -> Result<()> {
        if state < self.num_states() {
            Ok(())
        } else {
            Err(PbviError::UnknownState {
                state,
                available: self.num_states(),
            })
        }
    }
}

/// Draw an index with probability proportional to its weight.
///
/// Rounding can leave the uniform draw above the cumulative total; the last
/// index with positive weight is returned in that case.
pub fn sample_index<I>(weights: I, rng: &mut dyn RngCore) -> usize
where
    I: IntoIterator<Item = f64>,
{
    let weights: Vec<f64> = weights.into_iter().collect();
    let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
    let mut fallback = 0;
    if total <= 0.0 {
        return fallback;
    }
    let target = rng.random::<f64>() * total;
    let mut cumulative = 0.0;
    for (idx, &w) in weights.iter().enumerate() {
        if w <= 0.0 {
            continue;
        }
        cumulative += w;
        fallback = idx;
        if target < cumulative {
            return idx;
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn sample_index_never_picks_zero_weight() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let idx = sample_index([0.0, 0.3, 0.0, 0.7], &mut rng);
            assert!(idx == 1 || idx == 3);
        }
    }

    #[test]
    fn sample_index_degenerate() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(sample_index([0.0, 1.0], &mut rng), 1);
        assert_eq!(sample_index([0.0, 0.0], &mut rng), 0);
    }

    #[test]
    fn default_simulation_follows_tables() {
        let model = TabularModel::tiger();
        let mut rng = StdRng::seed_from_u64(11);
        let listen = 0;
        for _ in 0..50 {
            let step = model.simulate_action(0, listen, &mut rng);
            // Listening never moves the tiger.
            assert_eq!(step.next_state, 0);
            assert_eq!(step.reward, -1.0);
            assert_eq!(step.cost, 0.0);
        }
    }

    #[test]
    fn ensure_checks_ranges() {
        let model = TabularModel::tiger();
        assert!(model.ensure_action(2).is_ok());
        assert!(matches!(
            model.ensure_action(3),
            Err(PbviError::UnknownAction { action: 3, available: 3 })
        ));
        assert!(matches!(
            model.ensure_observation(2),
            Err(PbviError::UnknownObservation { .. })
        ));
        assert!(matches!(model.ensure_state(5), Err(PbviError::UnknownState { .. })));
    }
}
