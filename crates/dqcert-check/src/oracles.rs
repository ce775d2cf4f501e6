//! Oracle seams for consistency and definability, with solver-backed
//! default implementations.
//!
//! The pipeline only depends on the two traits, so proof-based or external
//! implementations can replace the built-in ones without touching the
//! orchestration.

use std::collections::{BTreeMap, BTreeSet};

use dqcert_core::rename::{equality_gate, max_var_index, rename_formula};
use dqcert_core::{var_of, Clause, Lit, Var};
use dqcert_sat::{CdclSolver, SatEngine, SatError};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("SAT engine failure inside an oracle: {0}")]
    Sat(#[from] SatError),
}

/// Outcome of the consistency game `∀ universals ∃ existential-like. clauses`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyOutcome {
    Consistent,
    /// A universal assignment that no existential assignment can complete.
    Inconsistent { universal_counterexample: Vec<Lit> },
}

/// Decides whether every total universal assignment can be extended to a
/// satisfying assignment of the clauses.
pub trait ConsistencyOracle {
    fn check(
        &mut self,
        clauses: &[Clause],
        universals: &BTreeSet<Var>,
        existential_like: &BTreeSet<Var>,
    ) -> Result<ConsistencyOutcome, OracleError>;
}

/// Outcome of a definability query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinabilityOutcome {
    Defined,
    /// An assignment to the dependency set under which the variable can take
    /// either value.
    NotDefined { counterexample: Vec<Lit> },
}

/// Decides whether the clauses the oracle was built over functionally
/// determine a variable from a dependency set alone.
pub trait DefinabilityOracle {
    fn check(
        &mut self,
        depends_on: &BTreeSet<Var>,
        variable: Var,
    ) -> Result<DefinabilityOutcome, OracleError>;
}

/// Counterexample-guided consistency check.
///
/// A candidate solver over the universal variables proposes total universal
/// assignments; the main solver checks the clauses under each proposal as
/// assumptions. A satisfiable check blocks the proposal, an unsatisfiable one
/// is the counterexample. Candidate exhaustion proves consistency.
///
/// Universals that never occur in the clauses cannot influence satisfaction,
/// so the game is restricted to the occurring ones. The existential-like side
/// of the partition is exactly the variables the main solver is free to
/// assign, so it needs no explicit encoding here.
#[derive(Debug, Clone, Copy, Default)]
pub struct CegarConsistency;

impl ConsistencyOracle for CegarConsistency {
    fn check(
        &mut self,
        clauses: &[Clause],
        universals: &BTreeSet<Var>,
        existential_like: &BTreeSet<Var>,
    ) -> Result<ConsistencyOutcome, OracleError> {
        debug_assert!(clauses
            .iter()
            .flatten()
            .all(|&l| universals.contains(&var_of(l)) || existential_like.contains(&var_of(l))));

        let mut main = CdclSolver::new();
        for clause in clauses {
            main.add_clause(clause);
        }

        let occurring: Vec<Var> = clauses
            .iter()
            .flatten()
            .map(|&l| var_of(l))
            .filter(|v| universals.contains(v))
            .collect::<BTreeSet<Var>>()
            .into_iter()
            .collect();
        if occurring.is_empty() {
            return Ok(if main.solve(&[])? {
                ConsistencyOutcome::Consistent
            } else {
                ConsistencyOutcome::Inconsistent {
                    universal_counterexample: Vec::new(),
                }
            });
        }

        let mut candidates = CdclSolver::new();
        if let Some(&max) = occurring.last() {
            candidates.ensure_vars(max);
        }
        let mut rounds = 0u64;
        loop {
            if !candidates.solve(&[])? {
                debug!(rounds, "all universal assignments covered");
                return Ok(ConsistencyOutcome::Consistent);
            }
            let proposal = candidates.model();
            let tau: Vec<Lit> = occurring
                .iter()
                .map(|&u| proposal[u as usize - 1])
                .collect();
            if main.solve(&tau)? {
                let blocking: Vec<Lit> = tau.iter().map(|&l| -l).collect();
                candidates.add_clause(&blocking);
                rounds += 1;
            } else {
                debug!(rounds, "universal counterexample found");
                return Ok(ConsistencyOutcome::Inconsistent {
                    universal_counterexample: tau,
                });
            }
        }
    }
}

/// Padoa-style definability check over two renamed copies of the clauses.
///
/// The solver holds the clauses, a copy with every variable shifted by
/// `offset`, and one switched equality gate per variable. A query asserts the
/// switches of the dependency set plus `variable` in one copy and its
/// negation in the other: a satisfiable result exhibits two satisfying
/// assignments that agree on the dependencies but disagree on the variable.
pub struct PadoaDefinability {
    solver: CdclSolver,
    offset: Var,
}

impl PadoaDefinability {
    /// Build the two-copy solver over the model clauses.
    pub fn new(clauses: &[Clause]) -> Self {
        let offset = max_var_index(clauses);
        let mut solver = CdclSolver::new();
        solver.ensure_vars(3 * offset);
        let renaming: BTreeMap<Var, Var> = (1..=offset).map(|v| (v, v + offset)).collect();
        for clause in clauses {
            solver.add_clause(clause);
        }
        for clause in rename_formula(clauses, &renaming) {
            solver.add_clause(&clause);
        }
        for v in 1..=offset {
            let switch = (2 * offset + v) as Lit;
            for gate in equality_gate(v as Lit, (v + offset) as Lit, switch) {
                solver.add_clause(&gate);
            }
        }
        PadoaDefinability { solver, offset }
    }

    fn switch(&self, var: Var) -> Lit {
        (2 * self.offset + var) as Lit
    }
}

impl DefinabilityOracle for PadoaDefinability {
    fn check(
        &mut self,
        depends_on: &BTreeSet<Var>,
        variable: Var,
    ) -> Result<DefinabilityOutcome, OracleError> {
        if variable > self.offset {
            // The clauses never mention the variable, so it is unconstrained
            // and takes both values under any satisfying dependency
            // assignment. Unsatisfiable clauses define everything vacuously.
            if !self.solver.solve(&[])? {
                return Ok(DefinabilityOutcome::Defined);
            }
            let model = self.solver.model();
            let counterexample: Vec<Lit> = depends_on
                .iter()
                .filter(|&&d| d <= self.offset)
                .map(|&d| model[d as usize - 1])
                .collect();
            return Ok(DefinabilityOutcome::NotDefined { counterexample });
        }
        let mut assumptions: Vec<Lit> = depends_on
            .iter()
            .filter(|&&d| d <= self.offset)
            .map(|&d| self.switch(d))
            .collect();
        assumptions.push(variable as Lit);
        assumptions.push(-((variable + self.offset) as Lit));
        if self.solver.solve(&assumptions)? {
            let model = self.solver.model();
            let counterexample: Vec<Lit> = depends_on
                .iter()
                .filter(|&&d| d <= self.offset)
                .map(|&d| model[d as usize - 1])
                .collect();
            Ok(DefinabilityOutcome::NotDefined { counterexample })
        } else {
            Ok(DefinabilityOutcome::Defined)
        }
    }
}
