//! PBVI math utilities.

pub mod math;

pub use math::stats::*;
pub use math::vector::*;
