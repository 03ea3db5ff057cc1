//! PBVI Core Library
//!
//! Point-based value iteration for finite POMDPs:
//! - Model interface and a dense-table model (`model`)
//! - Beliefs and the Bayesian belief update (`belief`)
//! - Alpha vectors and the PBVI backup engine (`alpha`, `solver`)
//! - Reachable belief point sampling (`sampler`)
//! - Policy artifacts (`policy`)
//! - Simulated episodes and evaluation (`runner`)
//! - Configuration, logging, errors and exit codes
//!
//! The binary entry point is in `main.rs`.

pub mod alpha;
pub mod belief;
pub mod config;
pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod model;
pub mod policy;
pub mod runner;
pub mod sampler;
pub mod solver;

pub use alpha::AlphaVector;
pub use belief::{update_belief, Belief};
pub use error::{PbviError, Result};
pub use model::{ActionId, Model, ObservationId, StateId, Step, TabularModel};
pub use policy::{Policy, PolicyStore};
pub use sampler::BeliefPointSampler;
pub use solver::{PbviSolver, RandomSolver, Solver, SolverKind};
