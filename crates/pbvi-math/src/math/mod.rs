//! Core math modules.

pub mod stats;
pub mod vector;
