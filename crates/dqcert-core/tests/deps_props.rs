//! Property tests for the extended-dependency closure.

use std::collections::BTreeSet;

use dqcert_core::deps::{extended_dependencies, DependencyMap};
use proptest::prelude::*;

fn dependency_maps() -> impl Strategy<Value = DependencyMap> {
    // Existential ids from 10.. so they never collide with the universal
    // ids 1..=6 used inside the dependency sets.
    prop::collection::btree_map(
        10u32..40,
        prop::collection::btree_set(1u32..7, 0..5),
        0..10,
    )
}

/// The closed-form definition the pairwise algorithm must agree with.
fn closed_form(raw: &DependencyMap) -> DependencyMap {
    raw.iter()
        .map(|(&e, dep_e)| {
            let mut ext: BTreeSet<u32> = dep_e.clone();
            for (&v, dep_v) in raw {
                if v == e {
                    continue;
                }
                let proper = dep_v.is_subset(dep_e) && dep_v.len() < dep_e.len();
                let equal_lower = dep_v == dep_e && v < e;
                if proper || equal_lower {
                    ext.insert(v);
                }
            }
            (e, ext)
        })
        .collect()
}

proptest! {
    #[test]
    fn extension_is_monotone(raw in dependency_maps()) {
        let ext = extended_dependencies(&raw);
        for (v, deps) in &raw {
            prop_assert!(deps.is_subset(&ext[v]), "raw deps of {v} must survive");
        }
    }

    #[test]
    fn extension_matches_the_closed_form(raw in dependency_maps()) {
        prop_assert_eq!(extended_dependencies(&raw), closed_form(&raw));
    }

    #[test]
    fn extension_is_idempotent(raw in dependency_maps()) {
        let once = extended_dependencies(&raw);
        let twice = extended_dependencies(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn extras_are_existing_existentials(raw in dependency_maps()) {
        let ext = extended_dependencies(&raw);
        for (v, deps) in &ext {
            for extra in deps.difference(&raw[v]) {
                prop_assert!(raw.contains_key(extra));
                prop_assert!(extra != v, "no variable depends on itself");
            }
        }
    }
}
