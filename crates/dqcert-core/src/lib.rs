#![doc = include_str!("../README.md")]

pub mod deps;
pub mod formula;
pub mod parser;
pub mod rename;

pub use deps::{extended_dependencies, DependencyMap};
pub use formula::{var_of, CandidateModel, Clause, DqbfFormula, Lit, Var};
pub use parser::{parse_dqdimacs, parse_model, ParseError};
