//! The abstract incremental SAT engine contract.

use dqcert_core::{Lit, Var};
use thiserror::Error;

/// Errors surfaced through the engine seam.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SatError {
    #[error("literal 0 passed to the SAT engine")]
    ZeroLiteral,
    #[error("SAT backend failure: {0}")]
    Backend(String),
}

/// An incremental SAT engine.
///
/// Clauses accumulate across calls; `solve` may be invoked repeatedly with
/// varying assumption literals without losing previously added clauses. This
/// is the only solver interface the certification kernel uses, so backends
/// can be swapped without touching the checks built on top.
pub trait SatEngine {
    /// Make variables `1..=num_vars` known to the engine.
    fn ensure_vars(&mut self, num_vars: Var);

    /// Add a clause. Literals name variables by signed magnitude; the engine
    /// grows its variable range as needed.
    fn add_clause(&mut self, clause: &[Lit]);

    /// Decide satisfiability of the accumulated clauses under the given
    /// assumption literals.
    fn solve(&mut self, assumptions: &[Lit]) -> Result<bool, SatError>;

    /// The total assignment found by the most recent satisfiable [`solve`].
    ///
    /// Contains one literal per known variable. Contents are unspecified if
    /// no satisfiable solve happened yet.
    ///
    /// [`solve`]: SatEngine::solve
    fn model(&self) -> Vec<Lit>;
}
