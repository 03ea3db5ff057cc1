//! Alpha vectors: the pieces of a piecewise-linear convex value function.
//!
//! Each alpha vector is the expected discounted return, per true state, of
//! following one fixed conditional plan whose first action is `action`. For a
//! set Γ of vectors the value of a belief is
//!
//!   V(b) = max_{α ∈ Γ} α · b
//!
//! and the maximizing vector's action is the greedy choice at `b`.

use pbvi_math::{argmax_by, dot};
use serde::{Deserialize, Serialize};

use crate::belief::Belief;
use crate::model::ActionId;

/// One `(action, value-vector)` pair.
///
/// `action` is `None` only for the placeholder vector a fresh engine starts
/// from; every vector produced by a backup carries a model action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlphaVector {
    pub action: Option<ActionId>,
    pub values: Vec<f64>,
}

impl AlphaVector {
    pub fn new(action: ActionId, values: Vec<f64>) -> Self {
        Self {
            action: Some(action),
            values,
        }
    }

    /// All-zero vector with no action, used to seed value iteration.
    pub fn placeholder(num_states: usize) -> Self {
        Self {
            action: None,
            values: vec![0.0; num_states],
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.action.is_none()
    }

    /// Expected return of this plan under `belief`.
    pub fn value_at(&self, belief: &[f64]) -> f64 {
        dot(&self.values, belief)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Index and value of the best vector at `belief`; earlier vectors win ties.
pub fn best_alpha(alphas: &[AlphaVector], belief: &Belief) -> Option<(usize, f64)> {
    argmax_by(alphas.iter(), |alpha| alpha.value_at(belief.probs()))
}

/// `V(b)` for a set of alpha vectors, or `None` when the set is empty.
pub fn value_of(alphas: &[AlphaVector], belief: &Belief) -> Option<f64> {
    best_alpha(alphas, belief).map(|(_, value)| value)
}
