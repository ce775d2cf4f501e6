//! The certification pipeline: strictly sequential, abort on first failure.

use std::collections::BTreeSet;

use dqcert_core::deps::{extended_dependencies, DependencyMap};
use dqcert_core::{var_of, CandidateModel, Clause, DqbfFormula, Var};
use dqcert_sat::{CdclSolver, SatEngine, SatError};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::entailment::{check_matrix, MatrixCheck};
use crate::oracles::{
    CegarConsistency, ConsistencyOracle, ConsistencyOutcome, DefinabilityOracle,
    DefinabilityOutcome, OracleError, PadoaDefinability,
};
use crate::scope::validate_block;
use crate::verdict::{CheckFailure, Verdict};

/// Which dependency sets the scope and definability checks use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyScheme {
    /// The dependency sets declared in the formula.
    Standard,
    /// The extended-dependency closure, admitting more valid models.
    #[default]
    Extended,
}

/// Configuration of one certification run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CertifyConfig {
    /// Check that each existential is uniquely defined by its dependencies.
    pub check_definability: bool,
    /// Check the universal/existential consistency game over the model.
    pub check_consistency: bool,
    pub dependency_scheme: DependencyScheme,
}

/// Faults of the machinery itself, as opposed to certification failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CertifyError {
    #[error(transparent)]
    Sat(#[from] SatError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
}

/// Sequences the certification checks over one formula/model pair.
///
/// Each run owns its SAT engine; the engine is dropped on every exit path,
/// success or abort.
#[derive(Debug, Clone, Default)]
pub struct Certifier {
    config: CertifyConfig,
}

impl Certifier {
    pub fn new(config: CertifyConfig) -> Self {
        Certifier { config }
    }

    pub fn config(&self) -> &CertifyConfig {
        &self.config
    }

    /// Certify with the built-in solver-backed oracles.
    pub fn certify(
        &self,
        formula: &DqbfFormula,
        model: &CandidateModel,
    ) -> Result<Verdict, CertifyError> {
        self.certify_with(formula, model, &mut CegarConsistency, PadoaDefinability::new)
    }

    /// Certify with caller-provided oracle implementations.
    ///
    /// `definability` builds the oracle over the model's flattened clauses;
    /// it is only invoked when definability checking is enabled.
    pub fn certify_with<C, D, F>(
        &self,
        formula: &DqbfFormula,
        model: &CandidateModel,
        consistency: &mut C,
        definability: F,
    ) -> Result<Verdict, CertifyError>
    where
        C: ConsistencyOracle + ?Sized,
        D: DefinabilityOracle,
        F: FnOnce(&[Clause]) -> D,
    {
        let dependencies: DependencyMap = match self.config.dependency_scheme {
            DependencyScheme::Standard => formula.dependencies.clone(),
            DependencyScheme::Extended => extended_dependencies(&formula.dependencies),
        };
        debug!(
            scheme = ?self.config.dependency_scheme,
            existentials = dependencies.len(),
            "effective dependencies computed"
        );

        // Phase 1: variable scopes of every model block for a declared
        // existential. The model may define extra variables beyond the
        // formula's universe; those are checked like any block, with every
        // out-of-universe reference permitted.
        let universe = formula.declared_universe();
        for (&e, deps) in &dependencies {
            let Some(block) = model.block(e) else {
                continue;
            };
            let mut allowed = deps.clone();
            allowed.insert(e);
            if let Err(invalid) = validate_block(block, &universe, &allowed) {
                return Ok(refuted(CheckFailure::ScopeViolation {
                    variable: e,
                    invalid,
                }));
            }
        }

        // Phase 2: the model must be satisfiable at all; the loaded engine is
        // reused for the entailment phase.
        let mut engine = CdclSolver::new();
        engine.ensure_vars(formula.num_vars.max(model.max_var()));
        for clause in &model.clauses {
            engine.add_clause(clause);
        }
        info!(clauses = model.clauses.len(), "model clauses loaded");
        if !engine.solve(&[])? {
            return Ok(refuted(CheckFailure::ModelUnsat));
        }

        // Phase 3: consistency game. Auxiliary variables occurring only in
        // the model play on the existential side.
        if self.config.check_consistency {
            let existential_like: BTreeSet<Var> = dependencies
                .keys()
                .copied()
                .chain(
                    model
                        .clauses
                        .iter()
                        .flatten()
                        .map(|&l| var_of(l))
                        .filter(|v| !formula.universals.contains(v)),
                )
                .collect();
            match consistency.check(&model.clauses, &formula.universals, &existential_like)? {
                ConsistencyOutcome::Consistent => debug!("consistency check passed"),
                ConsistencyOutcome::Inconsistent {
                    universal_counterexample,
                } => {
                    return Ok(refuted(CheckFailure::Inconsistent {
                        counterexample: Some(universal_counterexample),
                    }));
                }
            }
        }

        // Phase 4: definability of every declared existential.
        if self.config.check_definability {
            let mut oracle = definability(&model.clauses);
            for (&e, deps) in &dependencies {
                match oracle.check(deps, e)? {
                    DefinabilityOutcome::Defined => debug!(variable = e, "uniquely defined"),
                    DefinabilityOutcome::NotDefined { counterexample } => {
                        return Ok(refuted(CheckFailure::NotDefined {
                            variable: e,
                            counterexample: Some(counterexample),
                        }));
                    }
                }
            }
        }

        // Phase 5: matrix entailment, on the engine loaded in phase 2.
        match check_matrix(&mut engine, &formula.matrix)? {
            MatrixCheck::Entailed => {
                info!("certified");
                Ok(Verdict::Certified)
            }
            MatrixCheck::Falsified {
                clause, assignment, ..
            } => {
                let universal_assignment = assignment
                    .iter()
                    .copied()
                    .filter(|&l| formula.universals.contains(&var_of(l)))
                    .collect();
                let existential_assignment = assignment
                    .iter()
                    .copied()
                    .filter(|&l| formula.dependencies.contains_key(&var_of(l)))
                    .collect();
                Ok(refuted(CheckFailure::ClauseNotEntailed {
                    clause,
                    universal_assignment,
                    existential_assignment,
                }))
            }
        }
    }
}

fn refuted(failure: CheckFailure) -> Verdict {
    debug!(%failure, "certification failed");
    Verdict::Refuted { failure }
}
