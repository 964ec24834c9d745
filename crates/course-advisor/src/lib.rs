//! Course recommendation engine: candidate generation, scoring, merge and lifecycle
//! management for learner course plans.

pub mod config;
pub mod error;
pub mod recommendations;
pub mod telemetry;
