//! Belief states and the Bayesian belief update.
//!
//! A belief is a probability distribution over the model's states. After
//! taking action `a` and observing `o`, the posterior is
//!
//!   b'(s') ∝ O(a, s', o) · Σ_s T(a, s, s') · b(s)
//!
//! normalized by the total posterior mass. A zero mass means the model rules
//! the observation out entirely for this belief and action; that case is
//! reported as [`PbviError::ImpossibleObservation`] instead of producing NaN.

use pbvi_math::{
    approx_eq_slices, argmax_by, is_distribution, normalize_in_place, sum, DISTRIBUTION_TOLERANCE,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{PbviError, Result};
use crate::model::{sample_index, ActionId, Model, ObservationId, StateId};

/// Probability distribution over states. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Belief(Vec<f64>);

impl Belief {
    /// Create a belief from probabilities, validating that they form a distribution.
    pub fn new(probs: Vec<f64>) -> Result<Self> {
        if probs.is_empty() {
            return Err(PbviError::invalid_belief("belief has no entries"));
        }
        if let Some(p) = probs.iter().find(|p| !p.is_finite() || **p < 0.0) {
            return Err(PbviError::invalid_belief(format!(
                "entry {p} is negative or not finite"
            )));
        }
        if !is_distribution(&probs, DISTRIBUTION_TOLERANCE) {
            return Err(PbviError::invalid_belief(format!(
                "entries sum to {}, expected 1",
                sum(&probs)
            )));
        }
        Ok(Self(probs))
    }

    /// Uniform belief over `num_states` states.
    ///
    /// A belief can never be empty, so `uniform(0)` returns the single-state
    /// belief `[1.0]`. Models reject zero states at validation, so any
    /// dimension check against a real model still catches the mismatch.
    pub fn uniform(num_states: usize) -> Self {
        let p = 1.0 / num_states.max(1) as f64;
        Self(vec![p; num_states.max(1)])
    }

    /// Belief concentrated on a single state.
    pub fn certain(num_states: usize, state: StateId) -> Result<Self> {
        if state >= num_states {
            return Err(PbviError::UnknownState {
                state,
                available: num_states,
            });
        }
        let mut probs = vec![0.0; num_states];
        probs[state] = 1.0;
        Ok(Self(probs))
    }

    /// Probabilities, one per state.
    pub fn probs(&self) -> &[f64] {
        &self.0
    }

    /// Probability of a single state.
    pub fn prob(&self, state: StateId) -> f64 {
        self.0.get(state).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Most likely state (first on ties).
    pub fn argmax(&self) -> StateId {
        argmax_by(self.0.iter(), |p| *p).map_or(0, |(idx, _)| idx)
    }

    /// Entropy of the distribution in nats.
    pub fn entropy(&self) -> f64 {
        -self
            .0
            .iter()
            .map(|&p| if p > 0.0 { p * p.ln() } else { 0.0 })
            .sum::<f64>()
    }

    /// Element-wise equality within `tol` (exact when `tol == 0`).
    pub fn approx_eq(&self, other: &Belief, tol: f64) -> bool {
        approx_eq_slices(&self.0, &other.0, tol)
    }

    /// Draw a state according to this belief.
    pub fn sample_state(&self, rng: &mut dyn RngCore) -> StateId {
        sample_index(self.0.iter().copied(), rng)
    }

    /// Fails unless this belief has one entry per model state.
    pub fn ensure_len(&self, num_states: usize) -> Result<()> {
        if self.0.len() == num_states {
            Ok(())
        } else {
            Err(PbviError::DimensionMismatch {
                expected: num_states,
                actual: self.0.len(),
            })
        }
    }
}

impl TryFrom<Vec<f64>> for Belief {
    type Error = PbviError;

    fn try_from(probs: Vec<f64>) -> Result<Self> {
        Belief::new(probs)
    }
}

impl From<Belief> for Vec<f64> {
    fn from(belief: Belief) -> Self {
        belief.0
    }
}

impl AsRef<[f64]> for Belief {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

/// Posterior belief after taking `action` and observing `observation`.
pub fn update_belief<M: Model + ?Sized>(
    model: &M,
    belief: &Belief,
    action: ActionId,
    observation: ObservationId,
) -> Result<Belief> {
    model.ensure_action(action)?;
    model.ensure_observation(observation)?;
    let num_states = model.num_states();
    belief.ensure_len(num_states)?;

    let mut posterior = vec![0.0; num_states];
    for (next, slot) in posterior.iter_mut().enumerate() {
        let likelihood = model.observation(action, next, observation);
        if likelihood == 0.0 {
            continue;
        }
        let predicted: f64 = belief
            .probs()
            .iter()
            .enumerate()
            .map(|(from, &p)| model.transition(action, from, next) * p)
            .sum();
        *slot = likelihood * predicted;
    }

    if normalize_in_place(&mut posterior).is_none() {
        return Err(PbviError::ImpossibleObservation {
            action,
            observation,
        });
    }
    Ok(Belief(posterior))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TabularModel;

    const LISTEN: ActionId = 0;
    const OPEN_LEFT: ActionId = 1;
    const HEAR_LEFT: ObservationId = 0;
    const HEAR_RIGHT: ObservationId = 1;

    #[test]
    fn uniform_over_zero_states_is_a_point_mass() {
        let b = Belief::uniform(0);
        assert_eq!(b.len(), 1);
        assert_eq!(b.probs(), &[1.0]);
        assert_eq!(Belief::uniform(4).probs(), &[0.25; 4]);
    }

    #[test]
    fn belief_new_validates() {
        assert!(Belief::new(vec![0.4, 0.6]).is_ok());
        assert!(matches!(
            Belief::new(vec![0.5, 0.6]),
            Err(PbviError::InvalidBelief { .. })
        ));
        assert!(matches!(
            Belief::new(vec![1.5, -0.5]),
            Err(PbviError::InvalidBelief { .. })
        ));
        assert!(Belief::new(vec![]).is_err());
        assert!(Belief::new(vec![f64::NAN, 1.0]).is_err());
    }

    #[test]
    fn uniform_and_certain() {
        let u = Belief::uniform(4);
        assert_eq!(u.probs(), &[0.25; 4]);
        let c = Belief::certain(3, 2).unwrap();
        assert_eq!(c.probs(), &[0.0, 0.0, 1.0]);
        assert_eq!(c.argmax(), 2);
        assert_eq!(c.entropy(), 0.0);
        assert!(Belief::certain(3, 3).is_err());
    }

    #[test]
    fn entropy_of_uniform_is_ln_n() {
        let u = Belief::uniform(2);
        assert!((u.entropy() - 2.0f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn listening_shifts_belief_toward_heard_side() {
        let tiger = TabularModel::tiger();
        let b = Belief::uniform(2);
        let post = update_belief(&tiger, &b, LISTEN, HEAR_LEFT).unwrap();
        assert!((post.prob(0) - 0.85).abs() < 1e-12);
        assert!((post.prob(1) - 0.15).abs() < 1e-12);

        let post2 = update_belief(&tiger, &post, LISTEN, HEAR_LEFT).unwrap();
        let expected = 0.85 * 0.85 / (0.85 * 0.85 + 0.15 * 0.15);
        assert!((post2.prob(0) - expected).abs() < 1e-12);
    }

    #[test]
    fn opening_a_door_resets_belief() {
        let tiger = TabularModel::tiger();
        let b = Belief::new(vec![0.97, 0.03]).unwrap();
        let post = update_belief(&tiger, &b, OPEN_LEFT, HEAR_RIGHT).unwrap();
        assert!(post.approx_eq(&Belief::uniform(2), 1e-12));
    }

    #[test]
    fn impossible_observation_is_reported() {
        // Observation 1 can never follow action 0.
        let model = TabularModel::new(
            vec!["s0".into(), "s1".into()],
            vec!["a0".into()],
            vec!["o0".into(), "o1".into()],
            0.9,
            vec![vec![vec![1.0, 0.0], vec![0.0, 1.0]]],
            vec![vec![vec![1.0, 0.0], vec![1.0, 0.0]]],
            vec![vec![0.0, 0.0]],
        )
        .unwrap();
        let err = update_belief(&model, &Belief::uniform(2), 0, 1).unwrap_err();
        assert!(matches!(
            err,
            PbviError::ImpossibleObservation {
                action: 0,
                observation: 1
            }
        ));
    }

    #[test]
    fn unknown_indices_are_rejected() {
        let tiger = TabularModel::tiger();
        let b = Belief::uniform(2);
        assert!(matches!(
            update_belief(&tiger, &b, 5, 0),
            Err(PbviError::UnknownAction { .. })
        ));
        assert!(matches!(
            update_belief(&tiger, &b, 0, 5),
            Err(PbviError::UnknownObservation { .. })
        ));
        assert!(matches!(
            update_belief(&tiger, &Belief::uniform(3), 0, 0),
            Err(PbviError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn serde_rejects_invalid_belief() {
        let ok: Belief = serde_json::from_str("[0.25, 0.75]").unwrap();
        assert_eq!(ok.probs(), &[0.25, 0.75]);
        assert!(serde_json::from_str::<Belief>("[0.9, 0.9]").is_err());
        assert_eq!(serde_json::to_string(&ok).unwrap(), "[0.25,0.75]");
    }
}
