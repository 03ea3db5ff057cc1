//! Solver variants sharing one capability set.
//!
//! Callers that only need to plan and act go through [`Solver`]; code that
//! needs engine internals (alpha vectors, policy persistence) matches on the
//! [`Solver::Pbvi`] variant.

pub mod pbvi;
pub mod random;

pub use pbvi::PbviSolver;
pub use random::RandomSolver;

use std::sync::Arc;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::belief::Belief;
use crate::config::SolverConfig;
use crate::error::Result;
use crate::model::{ActionId, Model, ObservationId};
use crate::sampler::BeliefPointSampler;

/// Which solver to build.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    /// Point-based value iteration.
    #[default]
    Pbvi,
    /// Uniformly random legal action.
    Random,
}

impl std::str::FromStr for SolverKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pbvi" => Ok(SolverKind::Pbvi),
            "random" => Ok(SolverKind::Random),
            _ => Err(format!("unknown solver: {}", s)),
        }
    }
}

impl std::fmt::Display for SolverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverKind::Pbvi => write!(f, "pbvi"),
            SolverKind::Random => write!(f, "random"),
        }
    }
}

#[derive(Debug)]
pub enum Solver<M: Model> {
    Pbvi(PbviSolver<M>),
    Random(RandomSolver<M>),
}

impl<M: Model> Solver<M> {
    pub fn new(kind: SolverKind, model: Arc<M>, config: SolverConfig) -> Self {
        match kind {
            SolverKind::Pbvi => Solver::Pbvi(PbviSolver::new(model, config)),
            SolverKind::Random => Solver::Random(RandomSolver::new(model, &config)),
        }
    }

    pub fn kind(&self) -> SolverKind {
        match self {
            Solver::Pbvi(_) => SolverKind::Pbvi,
            Solver::Random(_) => SolverKind::Random,
        }
    }

    pub fn model(&self) -> &M {
        match self {
            Solver::Pbvi(s) => s.model(),
            Solver::Random(s) => s.model(),
        }
    }

    pub fn model_handle(&self) -> Arc<M> {
        match self {
            Solver::Pbvi(s) => s.model_handle(),
            Solver::Random(s) => s.model_handle(),
        }
    }

    pub fn add_configs(&mut self, belief_points: Vec<Belief>) -> Result<()> {
        match self {
            Solver::Pbvi(s) => s.add_configs(belief_points),
            Solver::Random(s) => s.add_configs(belief_points),
        }
    }

    pub fn solve(&mut self, horizon: usize) -> Result<()> {
        match self {
            Solver::Pbvi(s) => s.solve(horizon),
            Solver::Random(s) => s.solve(horizon),
        }
    }

    pub fn get_action(&mut self, belief: &Belief) -> Result<ActionId> {
        match self {
            Solver::Pbvi(s) => s.get_action(belief),
            Solver::Random(s) => s.get_action(belief),
        }
    }

    pub fn update_belief(
        &self,
        belief: &Belief,
        action: ActionId,
        observation: ObservationId,
    ) -> Result<Belief> {
        match self {
            Solver::Pbvi(s) => s.update_belief(belief, action, observation),
            Solver::Random(s) => s.update_belief(belief, action, observation),
        }
    }

    /// Reachable beliefs from `belief`; the walk only needs the model, so
    /// every variant supports it.
    pub fn generate_reachable_belief_points(
        &self,
        belief: &Belief,
        max_points: usize,
        config: &SolverConfig,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Belief>> {
        BeliefPointSampler::new(self.model(), config).generate(belief, max_points, rng)
    }

    pub fn as_pbvi(&self) -> Option<&PbviSolver<M>> {
        match self {
            Solver::Pbvi(s) => Some(s),
            Solver::Random(_) => None,
        }
    }

    pub fn as_pbvi_mut(&mut self) -> Option<&mut PbviSolver<M>> {
        match self {
            Solver::Pbvi(s) => Some(s),
            Solver::Random(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TabularModel;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn kind_parses_and_displays() {
        assert_eq!("pbvi".parse::<SolverKind>().unwrap(), SolverKind::Pbvi);
        assert_eq!("RANDOM".parse::<SolverKind>().unwrap(), SolverKind::Random);
        assert!("pomcp".parse::<SolverKind>().is_err());
        assert_eq!(SolverKind::Random.to_string(), "random");
    }

    #[test]
    fn variants_share_capabilities() {
        let config = SolverConfig {
            seed: Some(2),
            parallel: false,
            ..SolverConfig::default()
        };
        for kind in [SolverKind::Pbvi, SolverKind::Random] {
            let mut solver = Solver::new(kind, Arc::new(TabularModel::tiger()), config.clone());
            assert_eq!(solver.kind(), kind);
            let mut rng = StdRng::seed_from_u64(8);
            let points = solver
                .generate_reachable_belief_points(&Belief::uniform(2), 8, &config, &mut rng)
                .unwrap();
            solver.add_configs(points).unwrap();
            solver.solve(10).unwrap();
            let action = solver.get_action(&Belief::uniform(2)).unwrap();
            assert!(action < 3);
            let next = solver.update_belief(&Belief::uniform(2), 0, 0).unwrap();
            assert!((next.prob(0) - 0.85).abs() < 1e-12);
        }
    }

    #[test]
    fn as_pbvi_only_for_engine() {
        let config = SolverConfig::default();
        let pbvi = Solver::new(SolverKind::Pbvi, Arc::new(TabularModel::tiger()), config.clone());
        let random = Solver::new(SolverKind::Random, Arc::new(TabularModel::tiger()), config);
        assert!(pbvi.as_pbvi().is_some());
        assert!(random.as_pbvi().is_none());
    }
}
