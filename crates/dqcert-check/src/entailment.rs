//! Clause-at-a-time matrix entailment.

use dqcert_core::{Clause, Lit};
use dqcert_sat::{SatEngine, SatError};
use tracing::debug;

/// Result of the matrix-entailment phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatrixCheck {
    /// The engine's clauses entail every matrix clause.
    Entailed,
    /// The first matrix clause (in file order) that is not entailed, with the
    /// satisfying total assignment of `engine ∧ ¬clause`.
    Falsified {
        index: usize,
        clause: Clause,
        assignment: Vec<Lit>,
    },
}

/// Prove `engine ⊨ clause` for every matrix clause, in file order.
///
/// The negation of a clause is a conjunction of unit literals, so each proof
/// obligation is a single assumption-based query: a satisfiable result is a
/// counterexample and stops the check at that clause.
pub fn check_matrix<E>(engine: &mut E, matrix: &[Clause]) -> Result<MatrixCheck, SatError>
where
    E: SatEngine + ?Sized,
{
    for (index, clause) in matrix.iter().enumerate() {
        let negated: Vec<Lit> = clause.iter().map(|&lit| -lit).collect();
        if engine.solve(&negated)? {
            debug!(index, "matrix clause not entailed");
            return Ok(MatrixCheck::Falsified {
                index,
                clause: clause.clone(),
                assignment: engine.model(),
            });
        }
    }
    Ok(MatrixCheck::Entailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dqcert_core::Var;

    /// Scripted engine that records every assumption query.
    struct ScriptedEngine {
        results: Vec<bool>,
        queries: Vec<Vec<Lit>>,
        model: Vec<Lit>,
    }

    impl ScriptedEngine {
        fn new(results: &[bool], model: &[Lit]) -> Self {
            ScriptedEngine {
                results: results.to_vec(),
                queries: Vec::new(),
                model: model.to_vec(),
            }
        }
    }

    impl SatEngine for ScriptedEngine {
        fn ensure_vars(&mut self, _num_vars: Var) {}

        fn add_clause(&mut self, _clause: &[Lit]) {}

        fn solve(&mut self, assumptions: &[Lit]) -> Result<bool, SatError> {
            let result = self.results[self.queries.len()];
            self.queries.push(assumptions.to_vec());
            Ok(result)
        }

        fn model(&self) -> Vec<Lit> {
            self.model.clone()
        }
    }

    #[test]
    fn queries_negate_every_clause_literal() {
        let mut engine = ScriptedEngine::new(&[false, false], &[]);
        let matrix = vec![vec![1, -2], vec![3]];
        let outcome = check_matrix(&mut engine, &matrix).expect("check should succeed");
        assert_eq!(outcome, MatrixCheck::Entailed);
        assert_eq!(engine.queries, vec![vec![-1, 2], vec![-3]]);
    }

    #[test]
    fn first_falsified_clause_short_circuits_the_rest() {
        let mut engine = ScriptedEngine::new(&[true, false], &[-1, -2]);
        let matrix = vec![vec![1, 2], vec![-1, 2]];
        let outcome = check_matrix(&mut engine, &matrix).expect("check should succeed");
        assert_eq!(
            outcome,
            MatrixCheck::Falsified {
                index: 0,
                clause: vec![1, 2],
                assignment: vec![-1, -2],
            }
        );
        // The second clause was never queried.
        assert_eq!(engine.queries.len(), 1);
    }

    #[test]
    fn empty_matrix_is_trivially_entailed() {
        let mut engine = ScriptedEngine::new(&[], &[]);
        assert_eq!(
            check_matrix(&mut engine, &[]).expect("check should succeed"),
            MatrixCheck::Entailed
        );
    }
}
