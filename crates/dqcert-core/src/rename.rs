//! Shared clause utilities: literal renaming and equality-gate encoding.

use std::collections::BTreeMap;

use crate::formula::{var_of, Clause, Lit, Var};

/// Largest variable index occurring in `clauses`, 0 when there is none.
pub fn max_var_index(clauses: &[Clause]) -> Var {
    clauses
        .iter()
        .flatten()
        .map(|&l| var_of(l))
        .max()
        .unwrap_or(0)
}

/// Rename a literal, keeping its polarity. Variables absent from the map are
/// left unchanged.
pub fn rename_literal(lit: Lit, renaming: &BTreeMap<Var, Var>) -> Lit {
    let var = var_of(lit);
    let renamed = *renaming.get(&var).unwrap_or(&var) as Lit;
    if lit > 0 {
        renamed
    } else {
        -renamed
    }
}

/// Rename every literal of a clause.
pub fn rename_clause(clause: &[Lit], renaming: &BTreeMap<Var, Var>) -> Clause {
    clause.iter().map(|&l| rename_literal(l, renaming)).collect()
}

/// Rename every clause of a formula.
pub fn rename_formula(clauses: &[Clause], renaming: &BTreeMap<Var, Var>) -> Vec<Clause> {
    clauses.iter().map(|c| rename_clause(c, renaming)).collect()
}

/// Encode `switch -> (lit1 <-> lit2)` as two clauses.
///
/// While the switch literal is not asserted the gate is inert, so the
/// equivalence can be turned on per query via solver assumptions.
pub fn equality_gate(lit1: Lit, lit2: Lit, switch: Lit) -> [Clause; 2] {
    [vec![-switch, lit1, -lit2], vec![-switch, -lit1, lit2]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_var_index_of_empty_formula_is_zero() {
        assert_eq!(max_var_index(&[]), 0);
        assert_eq!(max_var_index(&[vec![]]), 0);
    }

    #[test]
    fn max_var_index_ignores_polarity() {
        assert_eq!(max_var_index(&[vec![1, -7], vec![3]]), 7);
    }

    #[test]
    fn renaming_preserves_polarity_and_skips_unmapped_variables() {
        let renaming = BTreeMap::from([(2, 12)]);
        assert_eq!(rename_literal(2, &renaming), 12);
        assert_eq!(rename_literal(-2, &renaming), -12);
        assert_eq!(rename_literal(-3, &renaming), -3);
        assert_eq!(rename_clause(&[2, -3], &renaming), vec![12, -3]);
        assert_eq!(
            rename_formula(&[vec![2], vec![-2, 3]], &renaming),
            vec![vec![12], vec![-12, 3]]
        );
    }

    #[test]
    fn equality_gate_is_inert_without_its_switch() {
        let [c1, c2] = equality_gate(1, 2, 3);
        assert_eq!(c1, vec![-3, 1, -2]);
        assert_eq!(c2, vec![-3, -1, 2]);
        // Both clauses are satisfied by -3 alone.
        assert!(c1.contains(&-3) && c2.contains(&-3));
    }
}
