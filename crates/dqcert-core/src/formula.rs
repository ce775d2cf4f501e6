//! Core data model: literals, clauses, formulas and candidate models.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;

/// A variable identifier. Variable 0 is invalid.
pub type Var = u32;

/// A signed DIMACS-style literal: magnitude is the variable, sign the polarity.
pub type Lit = i32;

/// A disjunction of literals. Element order carries no logical meaning but is
/// preserved for diagnostics.
pub type Clause = Vec<Lit>;

/// The variable of a literal.
#[inline]
pub fn var_of(lit: Lit) -> Var {
    lit.unsigned_abs()
}

/// A parsed DQBF in prenex CNF with explicit per-existential dependency sets.
///
/// The keys of `dependencies` are exactly the existential variables; every
/// dependency value is a subset of `universals`, and `universals` is disjoint
/// from the existential set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DqbfFormula {
    /// Variable count declared by the `p cnf` header.
    pub num_vars: u32,
    /// Universal variables, in declaration order-independent form.
    pub universals: BTreeSet<Var>,
    /// Dependency set of each existential variable.
    pub dependencies: BTreeMap<Var, BTreeSet<Var>>,
    /// The quantifier-free CNF body, in file order.
    pub matrix: Vec<Clause>,
}

impl DqbfFormula {
    /// The existential variables in ascending order.
    pub fn existentials(&self) -> impl Iterator<Item = Var> + '_ {
        self.dependencies.keys().copied()
    }

    /// All declared variables of the formula: universals and existentials.
    pub fn declared_universe(&self) -> BTreeSet<Var> {
        self.universals
            .iter()
            .copied()
            .chain(self.existentials())
            .collect()
    }

    /// Render the formula back into DQDIMACS text.
    ///
    /// Every existential is emitted as an `e` line followed by an explicit `d`
    /// line, so partial dependency sets survive. Parsing the output yields a
    /// formula equal to `self`.
    pub fn to_dqdimacs(&self) -> String {
        let mut out = format!("p cnf {} {}\n", self.num_vars, self.matrix.len());
        if !self.universals.is_empty() {
            out.push('a');
            for &u in &self.universals {
                out.push_str(&format!(" {u}"));
            }
            out.push_str(" 0\n");
        }
        for (&e, deps) in &self.dependencies {
            out.push_str(&format!("e {e} 0\n"));
            out.push_str(&format!("d {e}"));
            for &u in deps {
                out.push_str(&format!(" {u}"));
            }
            out.push_str(" 0\n");
        }
        for clause in &self.matrix {
            for &lit in clause {
                out.push_str(&format!("{lit} "));
            }
            out.push_str("0\n");
        }
        out
    }
}

/// A candidate Skolem model: one CNF clause block per existential variable.
///
/// `clauses` is the concatenation, in file order, of all per-variable blocks.
/// A variable is a key of `per_variable` iff a `c Model for variable <id>.`
/// marker for it appeared in the model file, even when its block is empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CandidateModel {
    /// Clause block of each marked variable, in marker order.
    pub per_variable: IndexMap<Var, Vec<Clause>>,
    /// All model clauses, flattened in file order.
    pub clauses: Vec<Clause>,
}

impl CandidateModel {
    /// The clause block recorded for `var`, if a marker for it was seen.
    pub fn block(&self, var: Var) -> Option<&[Clause]> {
        self.per_variable.get(&var).map(Vec::as_slice)
    }

    /// Largest variable index occurring in the model clauses, 0 when empty.
    pub fn max_var(&self) -> Var {
        crate::rename::max_var_index(&self.clauses)
    }
}
