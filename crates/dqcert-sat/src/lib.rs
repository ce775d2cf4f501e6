#![doc = include_str!("../README.md")]

pub mod engine;
pub mod solver;

pub use engine::{SatEngine, SatError};
pub use solver::CdclSolver;
