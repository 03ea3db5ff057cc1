//! Dense-table POMDP model.
//!
//! Tables are indexed `[action][state][next_state]` for transitions,
//! `[action][next_state][observation]` for observations and
//! `[action][state]` for rewards and costs. The JSON form uses the same
//! layout:
//!
//! ```json
//! {
//!   "states": ["tiger-left", "tiger-right"],
//!   "actions": ["listen", "open-left", "open-right"],
//!   "observations": ["hear-left", "hear-right"],
//!   "discount": 0.95,
//!   "transition": [[[1, 0], [0, 1]], ...],
//!   "observation": [[[0.85, 0.15], [0.15, 0.85]], ...],
//!   "reward": [[-1, -1], ...]
//! }
//! ```

use std::path::Path;

use pbvi_math::{is_distribution, DISTRIBUTION_TOLERANCE};
use serde::{Deserialize, Serialize};

use super::{ActionId, Model, ObservationId, StateId};
use crate::error::{PbviError, Result};

/// POMDP backed by explicit probability and reward tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabularModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub states: Vec<String>,
    pub actions: Vec<String>,
    pub observations: Vec<String>,
    pub discount: f64,
    /// `[action][state][next_state]`.
    #[serde(rename = "transition")]
    pub transition_table: Vec<Vec<Vec<f64>>>,
    /// `[action][next_state][observation]`.
    #[serde(rename = "observation")]
    pub observation_table: Vec<Vec<Vec<f64>>>,
    /// `[action][state]`.
    #[serde(rename = "reward")]
    pub reward_table: Vec<Vec<f64>>,
    /// `[action][state]`; all zero when absent.
    #[serde(rename = "cost", default, skip_serializing_if = "Option::is_none")]
    pub cost_table: Option<Vec<Vec<f64>>>,
    /// Per-state legal actions; every action when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_actions: Option<Vec<Vec<ActionId>>>,
}

impl TabularModel {
    /// Build and validate a model from its tables.
    pub fn new(
        states: Vec<String>,
        actions: Vec<String>,
        observations: Vec<String>,
        discount: f64,
        transition_table: Vec<Vec<Vec<f64>>>,
        observation_table: Vec<Vec<Vec<f64>>>,
        reward_table: Vec<Vec<f64>>,
    ) -> Result<Self> {
        let model = Self {
            name: None,
            states,
            actions,
            observations,
            discount,
            transition_table,
            observation_table,
            reward_table,
            cost_table: None,
            legal_actions: None,
        };
        model.validate()?;
        Ok(model)
    }

    /// Attach a name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach a cost table (`[action][state]`).
    pub fn with_costs(mut self, cost_table: Vec<Vec<f64>>) -> Result<Self> {
        self.cost_table = Some(cost_table);
        self.validate()?;
        Ok(self)
    }

    /// Restrict the actions available per state.
    pub fn with_legal_actions(mut self, legal: Vec<Vec<ActionId>>) -> Result<Self> {
        self.legal_actions = Some(legal);
        self.validate()?;
        Ok(self)
    }

    /// Parse and validate a model from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(text)
            .map_err(|e| PbviError::InvalidModel(format!("parse error: {e}")))?;
        model.validate()?;
        Ok(model)
    }

    /// Read, parse and validate a model file.
    ///
    /// A model without a `name` field is named after the file stem.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let model = Self::from_json_str(&text)?;
        match (&model.name, path.file_stem().and_then(|s| s.to_str())) {
            (None, Some(stem)) => Ok(model.with_name(stem)),
            _ => Ok(model),
        }
    }

    /// The classic tiger problem.
    ///
    /// A tiger hides behind one of two doors. Listening costs 1 and reports
    /// the correct side with probability 0.85. Opening the tiger's door costs
    /// 100, opening the other door pays 10, and either opening resets the
    /// tiger uniformly.
    pub fn tiger() -> Self {
        let uniform = vec![vec![0.5, 0.5], vec![0.5, 0.5]];
        Self {
            name: Some("tiger".to_string()),
            states: vec!["tiger-left".into(), "tiger-right".into()],
            actions: vec!["listen".into(), "open-left".into(), "open-right".into()],
            observations: vec!["hear-left".into(), "hear-right".into()],
            discount: 0.95,
            transition_table: vec![
                vec![vec![1.0, 0.0], vec![0.0, 1.0]],
                uniform.clone(),
                uniform.clone(),
            ],
            observation_table: vec![
                vec![vec![0.85, 0.15], vec![0.15, 0.85]],
                uniform.clone(),
                uniform,
            ],
            reward_table: vec![vec![-1.0, -1.0], vec![-100.0, 10.0], vec![10.0, -100.0]],
            cost_table: None,
            legal_actions: None,
        }
    }

    /// Check table shapes, probability rows, and the discount factor.
    pub fn validate(&self) -> Result<()> {
        let (ns, na, no) = (self.states.len(), self.actions.len(), self.observations.len());
        if ns == 0 || na == 0 || no == 0 {
            return Err(PbviError::InvalidModel(format!(
                "model needs at least one state, action and observation (got {ns}, {na}, {no})"
            )));
        }
        if !(self.discount > 0.0 && self.discount <= 1.0) {
            return Err(PbviError::InvalidModel(format!(
                "discount must lie in (0, 1], got {}",
                self.discount
            )));
        }

        check_len("transition", self.transition_table.len(), na)?;
        check_len("observation", self.observation_table.len(), na)?;
        check_len("reward", self.reward_table.len(), na)?;

        for a in 0..na {
            check_len(&format!("transition[{a}]"), self.transition_table[a].len(), ns)?;
            for (s, row) in self.transition_table[a].iter().enumerate() {
                check_len(&format!("transition[{a}][{s}]"), row.len(), ns)?;
                check_row(&format!("transition[{a}][{s}]"), row)?;
            }
            check_len(&format!("observation[{a}]"), self.observation_table[a].len(), ns)?;
            for (s, row) in self.observation_table[a].iter().enumerate() {
                check_len(&format!("observation[{a}][{s}]"), row.len(), no)?;
                check_row(&format!("observation[{a}][{s}]"), row)?;
            }
            check_len(&format!("reward[{a}]"), self.reward_table[a].len(), ns)?;
            if self.reward_table[a].iter().any(|r| !r.is_finite()) {
                return Err(PbviError::InvalidModel(format!(
                    "reward[{a}] contains a non-finite value"
                )));
            }
        }

        if let Some(costs) = &self.cost_table {
            check_len("cost", costs.len(), na)?;
            for (a, row) in costs.iter().enumerate() {
                check_len(&format!("cost[{a}]"), row.len(), ns)?;
            }
        }

        if let Some(legal) = &self.legal_actions {
            check_len("legal_actions", legal.len(), ns)?;
            for (s, list) in legal.iter().enumerate() {
                if list.is_empty() {
                    return Err(PbviError::InvalidModel(format!(
                        "legal_actions[{s}] is empty"
                    )));
                }
                if let Some(bad) = list.iter().find(|a| **a >= na) {
                    return Err(PbviError::InvalidModel(format!(
                        "legal_actions[{s}] names unknown action {bad}"
                    )));
                }
            }
        }

        Ok(())
    }
}

fn check_len(what: &str, actual: usize, expected: usize) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(PbviError::InvalidModel(format!(
            "{what} has {actual} entries, expected {expected}"
        )))
    }
}

fn check_row(what: &str, row: &[f64]) -> Result<()> {
    if row.iter().any(|p| *p > 1.0) || !is_distribution(row, DISTRIBUTION_TOLERANCE) {
        return Err(PbviError::InvalidModel(format!(
            "{what} is not a probability distribution: {row:?}"
        )));
    }
    Ok(())
}

impl Model for TabularModel {
    fn states(&self) -> &[String] {
        &self.states
    }

    fn actions(&self) -> &[String] {
        &self.actions
    }

    fn observations(&self) -> &[String] {
        &self.observations
    }

    fn discount(&self) -> f64 {
        self.discount
    }

    fn transition(&self, action: ActionId, from: StateId, to: StateId) -> f64 {
        self.transition_table[action][from][to]
    }

    fn observation(&self, action: ActionId, next: StateId, observation: ObservationId) -> f64 {
        self.observation_table[action][next][observation]
    }

    fn reward(&self, action: ActionId, state: StateId) -> f64 {
        self.reward_table[action][state]
    }

    fn cost(&self, action: ActionId, state: StateId) -> f64 {
        self.cost_table
            .as_ref()
            .map_or(0.0, |costs| costs[action][state])
    }

    fn legal_actions(&self, state: StateId) -> Vec<ActionId> {
        match &self.legal_actions {
            Some(legal) => legal[state].clone(),
            None => (0..self.actions.len()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiger_is_valid() {
        let tiger = TabularModel::tiger();
        tiger.validate().unwrap();
        assert_eq!(tiger.num_states(), 2);
        assert_eq!(tiger.num_actions(), 3);
        assert_eq!(tiger.num_observations(), 2);
        assert_eq!(tiger.reward(1, 0), -100.0);
        assert_eq!(tiger.reward(2, 0), 10.0);
        assert_eq!(tiger.legal_actions(1), vec![0, 1, 2]);
    }

    #[test]
    fn json_round_trip_preserves_tables() {
        let tiger = TabularModel::tiger();
        let text = serde_json::to_string(&tiger).unwrap();
        assert!(text.contains("\"transition\""));
        let back = TabularModel::from_json_str(&text).unwrap();
        assert_eq!(back.transition_table, tiger.transition_table);
        assert_eq!(back.observation_table, tiger.observation_table);
        assert_eq!(back.reward_table, tiger.reward_table);
    }

    #[test]
    fn rejects_bad_transition_row() {
        let mut tiger = TabularModel::tiger();
        tiger.transition_table[0][0] = vec![0.7, 0.7];
        let err = tiger.validate().unwrap_err();
        assert!(matches!(err, PbviError::InvalidModel(msg) if msg.contains("transition[0][0]")));
    }

    #[test]
    fn rejects_bad_discount() {
        let mut tiger = TabularModel::tiger();
        tiger.discount = 0.0;
        assert!(tiger.validate().is_err());
        tiger.discount = 1.0;
        assert!(tiger.validate().is_ok());
        tiger.discount = 1.5;
        assert!(tiger.validate().is_err());
    }

    #[test]
    fn rejects_shape_mismatch() {
        let mut tiger = TabularModel::tiger();
        tiger.reward_table.pop();
        assert!(tiger.validate().is_err());
    }

    #[test]
    fn legal_actions_and_costs() {
        let model = TabularModel::tiger()
            .with_legal_actions(vec![vec![0], vec![0, 2]])
            .unwrap()
            .with_costs(vec![vec![1.0, 1.0], vec![0.0, 0.0], vec![0.0, 0.0]])
            .unwrap();
        assert_eq!(model.legal_actions(0), vec![0]);
        assert_eq!(model.cost(0, 1), 1.0);
        assert!(TabularModel::tiger()
            .with_legal_actions(vec![vec![], vec![0]])
            .is_err());
        assert!(TabularModel::tiger()
            .with_legal_actions(vec![vec![9], vec![0]])
            .is_err());
    }

    #[test]
    fn unnamed_model_file_takes_its_stem() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut tiger = TabularModel::tiger();
        tiger.name = None;
        let unnamed = dir.path().join("doors.json");
        std::fs::write(&unnamed, serde_json::to_string(&tiger).unwrap()).unwrap();
        let named = dir.path().join("other.json");
        std::fs::write(&named, serde_json::to_string(&TabularModel::tiger()).unwrap()).unwrap();

        assert_eq!(TabularModel::from_json_file(&unnamed).unwrap().name.as_deref(), Some("doors"));
        assert_eq!(TabularModel::from_json_file(&named).unwrap().name.as_deref(), Some("tiger"));
    }

    #[test]
    fn malformed_json_is_invalid_model() {
        let err = TabularModel::from_json_str("{\"states\": []}").unwrap_err();
        assert!(matches!(err, PbviError::InvalidModel(_)));
    }
}
