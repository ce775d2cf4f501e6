//! Extended-dependency closure over existential variables.

use std::collections::{BTreeMap, BTreeSet};

use crate::formula::Var;

/// Dependency set per existential variable.
pub type DependencyMap = BTreeMap<Var, BTreeSet<Var>>;

/// Compute the extended dependency map for `raw`.
///
/// An existential whose raw dependency set is a proper subset of another's
/// becomes an extra dependency of that other variable; for exactly equal raw
/// sets the tie is broken by numeric id, the lower id being absorbed into the
/// higher id's extended set. Comparisons always use the raw sets, never the
/// partially extended ones, and variables are enumerated in ascending id
/// order, so the result is a pure function of `raw`:
///
/// `ext(e) = dep(e) ∪ { v | dep(v) ⊂ dep(e), or dep(v) = dep(e) and v < e }`
pub fn extended_dependencies(raw: &DependencyMap) -> DependencyMap {
    let mut extended = raw.clone();
    let order: Vec<Var> = raw.keys().copied().collect();
    for (i, &v1) in order.iter().enumerate() {
        let dep1 = &raw[&v1];
        for &v2 in &order[..i] {
            let dep2 = &raw[&v2];
            if dep1.is_subset(dep2) {
                if dep1.len() == dep2.len() {
                    // Equal sets: only one direction applies, decided by id.
                    let (absorbed, gains) = if v1 < v2 { (v1, v2) } else { (v2, v1) };
                    extend(&mut extended, gains, absorbed);
                } else {
                    extend(&mut extended, v2, v1);
                }
            } else if dep2.is_subset(dep1) {
                extend(&mut extended, v1, v2);
            }
        }
    }
    extended
}

fn extend(extended: &mut DependencyMap, var: Var, extra: Var) {
    if let Some(set) = extended.get_mut(&var) {
        set.insert(extra);
    }
}
