//! # rf-cascade-sim — Batch Round Simulator
//!
//! Plays large numbers of full rounds (spin, stage-clears, cascades) against
//! an in-process oracle policy and reports RTP, hit rate, progression and
//! enforcement statistics.

pub mod policy;
pub mod simulation;
pub mod stats;

pub use policy::*;
pub use simulation::*;
pub use stats::*;
