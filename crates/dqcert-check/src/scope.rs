//! Variable-scope validation for per-variable model blocks.

use std::collections::BTreeSet;

use dqcert_core::{var_of, Clause, Var};

/// Check that every literal of `block` whose variable belongs to `universe`
/// names a variable in `allowed`.
///
/// Variables outside `universe` are fresh auxiliaries introduced only inside
/// the model and are always permitted. On violation returns the offending
/// variable ids of the first offending clause, in ascending order.
pub fn validate_block(
    block: &[Clause],
    universe: &BTreeSet<Var>,
    allowed: &BTreeSet<Var>,
) -> Result<(), Vec<Var>> {
    for clause in block {
        let considered: BTreeSet<Var> = clause
            .iter()
            .map(|&lit| var_of(lit))
            .filter(|v| universe.contains(v))
            .collect();
        if !considered.is_subset(allowed) {
            return Err(considered.difference(allowed).copied().collect());
        }
    }
    Ok(())
}
