//! examkit-core: assessment engine for quiz attempts.
//!
//! This crate owns the attempt lifecycle state machine, the per-type
//! question scorers, and the statistics calculator. Persistence and
//! lookup concerns live behind the traits in [`traits`].

pub mod algebra;
pub mod error;
pub mod geometry;
pub mod lifecycle;
pub mod model;
pub mod prerequisites;
pub mod scoring;
pub mod similarity;
pub mod statistics;
pub mod traits;
