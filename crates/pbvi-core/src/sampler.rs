//! Reachable belief point sampling.
//!
//! Point-based value iteration only backs up the value function at a finite
//! set of beliefs, so the quality of the policy depends on those beliefs
//! being ones the agent can actually reach. The sampler grows that set with a
//! random walk through the model:
//!
//! 1. draw a state uniformly and one of its legal actions uniformly
//! 2. simulate the step to get an observation
//! 3. filter the working belief through `(action, observation)`
//! 4. keep the posterior if it is new, and continue the walk from it either way
//!
//! Walks run in rounds of `trials_per_round` steps for at most `max_rounds`
//! rounds, stopping as soon as `max_points` beliefs are held. Because the
//! walk state is drawn independently of the working belief, some steps yield
//! an observation the belief rules out; those steps are skipped.

use rand::{Rng, RngCore};

use crate::belief::{update_belief, Belief};
use crate::config::SolverConfig;
use crate::error::{PbviError, Result};
use crate::logging::{event_names, Stage};
use crate::model::Model;

/// Random-walk generator of reachable beliefs.
#[derive(Debug)]
pub struct BeliefPointSampler<'a, M: Model + ?Sized> {
    model: &'a M,
    trials_per_round: usize,
    max_rounds: usize,
    dedup_tolerance: f64,
}

impl<'a, M: Model + ?Sized> BeliefPointSampler<'a, M> {
    /// Sampler with the walk limits and duplicate tolerance from `config`.
    pub fn new(model: &'a M, config: &SolverConfig) -> Self {
        Self {
            model,
            trials_per_round: config.trials_per_round.max(1),
            max_rounds: config.max_rounds,
            dedup_tolerance: config.dedup_tolerance,
        }
    }

    /// Collect up to `max_points` distinct beliefs reachable from `initial`.
    ///
    /// The result always starts with `initial`; `max_points == 0` is treated
    /// as 1.
    pub fn generate(
        &self,
        initial: &Belief,
        max_points: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Belief>> {
        let model = self.model;
        initial.ensure_len(model.num_states())?;
        let max_points = max_points.max(1);

        crate::log_event!(
            DEBUG,
            event_names::SAMPLE_STARTED,
            Stage::Sample,
            "sampling reachable beliefs",
            max_points = max_points,
            trials_per_round = self.trials_per_round,
            max_rounds = self.max_rounds
        );

        let mut beliefs = vec![initial.clone()];
        let mut working = initial.clone();
        let mut skipped = 0usize;
        let mut rounds = 0usize;

        while beliefs.len() < max_points && rounds < self.max_rounds {
            for _ in 0..self.trials_per_round {
                let state = rng.random_range(0..model.num_states());
                let legal = model.legal_actions(state);
                if legal.is_empty() {
                    skipped += 1;
                    continue;
                }
                let action = legal[rng.random_range(0..legal.len())];
                let step = model.simulate_action(state, action, rng);

                let next = match update_belief(model, &working, action, step.observation) {
                    Ok(next) => next,
                    Err(PbviError::ImpossibleObservation { .. }) => {
                        skipped += 1;
                        continue;
                    }
                    Err(e) => return Err(e),
                };

                if !self.contains(&beliefs, &next) {
                    beliefs.push(next.clone());
                }
                working = next;
                if beliefs.len() >= max_points {
                    break;
                }
            }
            rounds += 1;
        }

        if skipped > 0 {
            crate::log_event!(
                DEBUG,
                event_names::SAMPLE_SKIPPED,
                Stage::Sample,
                "walk steps skipped",
                skipped = skipped
            );
        }
        crate::log_event!(
            INFO,
            event_names::SAMPLE_FINISHED,
            Stage::Sample,
            "belief sampling finished",
            points = beliefs.len(),
            rounds = rounds
        );

        Ok(beliefs)
    }

    fn contains(&self, beliefs: &[Belief], candidate: &Belief) -> bool {
        beliefs
            .iter()
            .any(|b| b.approx_eq(candidate, self.dedup_tolerance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TabularModel;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config() -> SolverConfig {
        SolverConfig::default()
    }

    #[test]
    fn result_starts_with_initial_belief() {
        let tiger = TabularModel::tiger();
        let sampler = BeliefPointSampler::new(&tiger, &config());
        let mut rng = StdRng::seed_from_u64(3);
        let initial = Belief::uniform(2);
        let points = sampler.generate(&initial, 10, &mut rng).unwrap();
        assert_eq!(points[0], initial);
        assert!(!points.is_empty() && points.len() <= 10);
    }

    #[test]
    fn zero_max_points_yields_only_initial() {
        let tiger = TabularModel::tiger();
        let sampler = BeliefPointSampler::new(&tiger, &config());
        let mut rng = StdRng::seed_from_u64(3);
        let points = sampler.generate(&Belief::uniform(2), 0, &mut rng).unwrap();
        assert_eq!(points, vec![Belief::uniform(2)]);
    }

    #[test]
    fn points_are_distinct() {
        let tiger = TabularModel::tiger();
        let sampler = BeliefPointSampler::new(&tiger, &config());
        let mut rng = StdRng::seed_from_u64(21);
        let points = sampler.generate(&Belief::uniform(2), 25, &mut rng).unwrap();
        for (i, a) in points.iter().enumerate() {
            for b in &points[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn listen_only_walk_reaches_listening_posteriors() {
        let tiger = TabularModel::tiger()
            .with_legal_actions(vec![vec![0], vec![0]])
            .unwrap();
        let sampler = BeliefPointSampler::new(&tiger, &config());
        let mut rng = StdRng::seed_from_u64(5);
        let points = sampler.generate(&Belief::uniform(2), 3, &mut rng).unwrap();
        assert_eq!(points.len(), 3);
        // First listen moves the uniform belief to 0.85 / 0.15 either way.
        assert!((points[1].prob(0) - 0.85).abs() < 1e-12 || (points[1].prob(0) - 0.15).abs() < 1e-12);
    }

    #[test]
    fn walk_continues_through_revisited_beliefs() {
        // Opening a door resets tiger to the uniform belief, which is always
        // already held. The walk must still move on from there.
        let tiger = TabularModel::tiger();
        let sampler = BeliefPointSampler::new(&tiger, &config());
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let points = sampler.generate(&Belief::uniform(2), 50, &mut rng).unwrap();
            assert!(points.iter().any(|p| p.prob(0) > 0.5), "seed {seed}");
            assert!(points.iter().any(|p| p.prob(0) < 0.5), "seed {seed}");
        }
    }

    #[test]
    fn coarse_tolerance_collapses_neighbours() {
        let tiger = TabularModel::tiger();
        let mut cfg = config();
        cfg.dedup_tolerance = 1.0;
        let sampler = BeliefPointSampler::new(&tiger, &cfg);
        let mut rng = StdRng::seed_from_u64(9);
        let points = sampler.generate(&Belief::uniform(2), 10, &mut rng).unwrap();
        assert_eq!(points.len(), 1);
    }

    #[test]
    fn same_seed_same_points() {
        let tiger = TabularModel::tiger();
        let sampler = BeliefPointSampler::new(&tiger, &config());
        let a = sampler
            .generate(&Belief::uniform(2), 15, &mut StdRng::seed_from_u64(77))
            .unwrap();
        let b = sampler
            .generate(&Belief::uniform(2), 15, &mut StdRng::seed_from_u64(77))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn wrong_dimension_is_rejected() {
        let tiger = TabularModel::tiger();
        let sampler = BeliefPointSampler::new(&tiger, &config());
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            sampler.generate(&Belief::uniform(3), 5, &mut rng),
            Err(PbviError::DimensionMismatch { .. })
        ));
    }
}
