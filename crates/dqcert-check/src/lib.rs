#![doc = include_str!("../README.md")]

pub mod entailment;
pub mod oracles;
pub mod pipeline;
pub mod scope;
pub mod verdict;

pub use entailment::{check_matrix, MatrixCheck};
pub use oracles::{
    CegarConsistency, ConsistencyOracle, ConsistencyOutcome, DefinabilityOracle,
    DefinabilityOutcome, OracleError, PadoaDefinability,
};
pub use pipeline::{Certifier, CertifyConfig, CertifyError, DependencyScheme};
pub use scope::validate_block;
pub use verdict::{CheckFailure, Verdict};
