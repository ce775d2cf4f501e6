//! Structured certification verdicts and failure diagnostics.

use std::fmt;

use dqcert_core::{Clause, Lit, Var};
use serde::Serialize;

/// Why a candidate model failed to certify.
///
/// Each variant carries enough structure to explain the failure precisely;
/// `Display` renders the human-readable diagnostic line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum CheckFailure {
    /// A model block references a declared variable outside its allowed set.
    ScopeViolation { variable: Var, invalid: Vec<Var> },
    /// The flattened model clauses are unsatisfiable.
    ModelUnsat,
    /// The consistency oracle found a universal assignment that cannot be
    /// extended to satisfy the model.
    Inconsistent {
        #[serde(skip_serializing_if = "Option::is_none")]
        counterexample: Option<Vec<Lit>>,
    },
    /// The model does not uniquely define an existential variable from its
    /// dependencies.
    NotDefined {
        variable: Var,
        /// A dependency assignment under which the variable can take either
        /// value.
        #[serde(skip_serializing_if = "Option::is_none")]
        counterexample: Option<Vec<Lit>>,
    },
    /// A matrix clause is not entailed by the model.
    ClauseNotEntailed {
        clause: Clause,
        universal_assignment: Vec<Lit>,
        existential_assignment: Vec<Lit>,
    },
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckFailure::ScopeViolation { variable, invalid } => write!(
                f,
                "The given model for variable {variable} contains the invalid variables: {invalid:?}."
            ),
            CheckFailure::ModelUnsat | CheckFailure::Inconsistent { .. } => {
                write!(f, "Model inconsistent")
            }
            CheckFailure::NotDefined { variable, .. } => write!(
                f,
                "The model does not uniquely define variable: {variable}"
            ),
            CheckFailure::ClauseNotEntailed { clause, .. } => {
                write!(f, "Falsified Clause: {clause:?}")
            }
        }
    }
}

/// Outcome of one certification run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// Every enabled check passed; the candidate certifies the DQBF true.
    Certified,
    /// Some check failed. This only means the candidate fails to certify,
    /// never that the DQBF is false.
    Refuted { failure: CheckFailure },
}

impl Verdict {
    pub fn is_certified(&self) -> bool {
        matches!(self, Verdict::Certified)
    }
}
