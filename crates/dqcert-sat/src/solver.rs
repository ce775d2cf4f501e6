//! A compact CDCL solver backing the [`SatEngine`] seam.
//!
//! Two-watched-literal propagation, first-UIP conflict analysis with
//! backjumping, activity-based decisions with decay, phase saving, and
//! MiniSat-style assumption handling (assumptions are forced as the first
//! decisions of every search). Learned clauses are kept across `solve`
//! calls, which is what makes repeated assumption queries cheap.

use dqcert_core::{var_of, Lit, Var};
use hashbrown::HashSet;
use tracing::debug;

use crate::engine::{SatEngine, SatError};

const ACTIVITY_DECAY: f64 = 0.95;
const ACTIVITY_RESCALE: f64 = 1e100;

/// Watcher entry: the clause index plus a blocker literal for cheap skips.
#[derive(Debug, Clone, Copy)]
struct Watch {
    clause: usize,
    blocker: Lit,
}

/// Incremental CDCL solver.
pub struct CdclSolver {
    num_vars: usize,
    /// Problem clauses followed by learned clauses; watch lists index here.
    clauses: Vec<Vec<Lit>>,
    /// Watch lists, two per variable (positive and negative literal).
    watches: Vec<Vec<Watch>>,
    /// Assignment per variable, `None` when unassigned.
    assign: Vec<Option<bool>>,
    /// Decision level of each assigned variable.
    level: Vec<u32>,
    /// Antecedent clause of each propagated variable.
    reason: Vec<Option<usize>>,
    /// Assignment trail in chronological order.
    trail: Vec<Lit>,
    /// Trail indices where each decision level starts.
    trail_lim: Vec<usize>,
    /// Next trail position to propagate.
    qhead: usize,
    activity: Vec<f64>,
    var_inc: f64,
    /// Saved phases; unconstrained variables default to false.
    phase: Vec<bool>,
    /// Set once the clause set is unsatisfiable without assumptions.
    unsat: bool,
    last_model: Vec<Lit>,
    conflicts: u64,
}

impl Default for CdclSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CdclSolver {
    pub fn new() -> Self {
        CdclSolver {
            num_vars: 0,
            clauses: Vec::new(),
            watches: Vec::new(),
            assign: Vec::new(),
            level: Vec::new(),
            reason: Vec::new(),
            trail: Vec::new(),
            trail_lim: Vec::new(),
            qhead: 0,
            activity: Vec::new(),
            var_inc: 1.0,
            phase: Vec::new(),
            unsat: false,
            last_model: Vec::new(),
            conflicts: 0,
        }
    }

    /// Total number of conflicts seen so far, across all `solve` calls.
    pub fn num_conflicts(&self) -> u64 {
        self.conflicts
    }

    #[inline]
    fn vidx(lit: Lit) -> usize {
        var_of(lit) as usize - 1
    }

    #[inline]
    fn watch_idx(lit: Lit) -> usize {
        (var_of(lit) as usize - 1) * 2 + usize::from(lit < 0)
    }

    #[inline]
    fn value_lit(&self, lit: Lit) -> Option<bool> {
        self.assign[Self::vidx(lit)].map(|b| if lit > 0 { b } else { !b })
    }

    #[inline]
    fn decision_level(&self) -> usize {
        self.trail_lim.len()
    }

    fn grow(&mut self, num_vars: usize) {
        if num_vars <= self.num_vars {
            return;
        }
        self.num_vars = num_vars;
        self.assign.resize(num_vars, None);
        self.level.resize(num_vars, 0);
        self.reason.resize(num_vars, None);
        self.activity.resize(num_vars, 0.0);
        self.phase.resize(num_vars, false);
        self.watches.resize(num_vars * 2, Vec::new());
    }

    fn enqueue(&mut self, lit: Lit, reason: Option<usize>) {
        let v = Self::vidx(lit);
        debug_assert!(self.assign[v].is_none());
        self.assign[v] = Some(lit > 0);
        self.level[v] = self.decision_level() as u32;
        self.reason[v] = reason;
        self.phase[v] = lit > 0;
        self.trail.push(lit);
    }

    fn cancel_until(&mut self, level: usize) {
        if self.decision_level() <= level {
            return;
        }
        let target = self.trail_lim[level];
        while self.trail.len() > target {
            if let Some(lit) = self.trail.pop() {
                let v = Self::vidx(lit);
                self.assign[v] = None;
                self.reason[v] = None;
            }
        }
        self.trail_lim.truncate(level);
        self.qhead = self.trail.len();
    }

    /// Propagate all pending assignments; returns a conflicting clause index.
    fn propagate(&mut self) -> Option<usize> {
        while self.qhead < self.trail.len() {
            let lit = self.trail[self.qhead];
            self.qhead += 1;
            let false_lit = -lit;
            let widx = Self::watch_idx(false_lit);
            let mut ws = std::mem::take(&mut self.watches[widx]);
            let mut i = 0;
            while i < ws.len() {
                if self.value_lit(ws[i].blocker) == Some(true) {
                    i += 1;
                    continue;
                }
                let ci = ws[i].clause;
                // Normalize so the falsified watch sits at position 1.
                if self.clauses[ci][0] == false_lit {
                    self.clauses[ci].swap(0, 1);
                }
                let first = self.clauses[ci][0];
                if self.value_lit(first) == Some(true) {
                    ws[i].blocker = first;
                    i += 1;
                    continue;
                }
                // Look for a replacement watch.
                let mut moved = false;
                for k in 2..self.clauses[ci].len() {
                    if self.value_lit(self.clauses[ci][k]) != Some(false) {
                        self.clauses[ci].swap(1, k);
                        let new_watch = self.clauses[ci][1];
                        self.watches[Self::watch_idx(new_watch)].push(Watch {
                            clause: ci,
                            blocker: first,
                        });
                        ws.swap_remove(i);
                        moved = true;
                        break;
                    }
                }
                if moved {
                    continue;
                }
                if self.value_lit(first) == Some(false) {
                    // Conflict: keep the remaining watchers and stop.
                    self.watches[widx] = ws;
                    self.qhead = self.trail.len();
                    return Some(ci);
                }
                self.enqueue(first, Some(ci));
                i += 1;
            }
            self.watches[widx] = ws;
        }
        None
    }

    fn bump(&mut self, v: usize) {
        self.activity[v] += self.var_inc;
        if self.activity[v] > ACTIVITY_RESCALE {
            for a in &mut self.activity {
                *a /= ACTIVITY_RESCALE;
            }
            self.var_inc /= ACTIVITY_RESCALE;
        }
    }

    fn decay(&mut self) {
        self.var_inc /= ACTIVITY_DECAY;
    }

    /// First-UIP conflict analysis. Returns the learned clause (asserting
    /// literal first, a deepest remaining literal second) and the backjump
    /// level.
    fn analyze(&mut self, conflict: usize) -> (Vec<Lit>, usize) {
        let current = self.decision_level() as u32;
        let mut seen = vec![false; self.num_vars];
        let mut learned: Vec<Lit> = vec![0];
        let mut pending = 0usize;
        let mut expand_from = 0usize;
        let mut index = self.trail.len();
        let mut confl = conflict;
        loop {
            // Copy the literals out so activity bumping can borrow mutably.
            let reason_lits: Vec<Lit> = self.clauses[confl][expand_from..].to_vec();
            for q in reason_lits {
                let v = Self::vidx(q);
                if !seen[v] && self.level[v] > 0 {
                    seen[v] = true;
                    self.bump(v);
                    if self.level[v] >= current {
                        pending += 1;
                    } else {
                        learned.push(q);
                    }
                }
            }
            // Walk the trail backwards to the next marked literal.
            loop {
                index -= 1;
                if seen[Self::vidx(self.trail[index])] {
                    break;
                }
            }
            let lit = self.trail[index];
            seen[Self::vidx(lit)] = false;
            pending -= 1;
            if pending == 0 {
                learned[0] = -lit;
                break;
            }
            confl = self.reason[Self::vidx(lit)]
                .expect("every non-decision literal above level 0 has an antecedent");
            // The antecedent's first literal is `lit` itself; skip it.
            expand_from = 1;
        }
        let backjump = learned[1..]
            .iter()
            .map(|&l| self.level[Self::vidx(l)])
            .max()
            .unwrap_or(0) as usize;
        if learned.len() > 2 {
            // Watch a literal of the backjump level at position 1.
            if let Some(deepest) = (1..learned.len())
                .max_by_key(|&i| self.level[Self::vidx(learned[i])])
            {
                learned.swap(1, deepest);
            }
        }
        (learned, backjump)
    }

    fn apply_learned(&mut self, learned: Vec<Lit>, backjump: usize) {
        self.conflicts += 1;
        self.cancel_until(backjump);
        if learned.len() == 1 {
            self.enqueue(learned[0], None);
        } else {
            let ci = self.clauses.len();
            let (w0, w1) = (learned[0], learned[1]);
            self.watches[Self::watch_idx(w0)].push(Watch {
                clause: ci,
                blocker: w1,
            });
            self.watches[Self::watch_idx(w1)].push(Watch {
                clause: ci,
                blocker: w0,
            });
            self.clauses.push(learned);
            self.enqueue(w0, Some(ci));
        }
    }

    fn pick_branch_var(&self) -> Option<usize> {
        let mut best: Option<usize> = None;
        for v in 0..self.num_vars {
            if self.assign[v].is_none()
                && best.map_or(true, |b| self.activity[v] > self.activity[b])
            {
                best = Some(v);
            }
        }
        best
    }

    fn snapshot_model(&mut self) {
        self.last_model = (1..=self.num_vars)
            .map(|v| match self.assign[v - 1] {
                Some(true) => v as Lit,
                _ => -(v as Lit),
            })
            .collect();
    }
}

impl SatEngine for CdclSolver {
    fn ensure_vars(&mut self, num_vars: Var) {
        self.grow(num_vars as usize);
    }

    fn add_clause(&mut self, clause: &[Lit]) {
        self.cancel_until(0);
        if let Some(max) = clause.iter().map(|&l| var_of(l)).max() {
            self.grow(max as usize);
        }
        let mut lits: Vec<Lit> = Vec::with_capacity(clause.len());
        let mut distinct: HashSet<Lit> = HashSet::with_capacity(clause.len());
        for &lit in clause {
            debug_assert_ne!(lit, 0, "literal 0 is invalid");
            if distinct.contains(&-lit) {
                return; // tautology
            }
            if !distinct.insert(lit) {
                continue;
            }
            match self.value_lit(lit) {
                Some(true) => return, // satisfied at the top level
                Some(false) => continue,
                None => lits.push(lit),
            }
        }
        match lits.as_slice() {
            [] => self.unsat = true,
            [unit] => self.enqueue(*unit, None),
            [w0, w1, ..] => {
                let ci = self.clauses.len();
                self.watches[Self::watch_idx(*w0)].push(Watch {
                    clause: ci,
                    blocker: *w1,
                });
                self.watches[Self::watch_idx(*w1)].push(Watch {
                    clause: ci,
                    blocker: *w0,
                });
                self.clauses.push(lits);
            }
        }
    }

    fn solve(&mut self, assumptions: &[Lit]) -> Result<bool, SatError> {
        for &a in assumptions {
            if a == 0 {
                return Err(SatError::ZeroLiteral);
            }
            self.grow(var_of(a) as usize);
        }
        self.cancel_until(0);
        if self.unsat {
            return Ok(false);
        }
        if self.propagate().is_some() {
            self.unsat = true;
            return Ok(false);
        }
        loop {
            if let Some(confl) = self.propagate() {
                if self.decision_level() == 0 {
                    self.unsat = true;
                    return Ok(false);
                }
                let (learned, backjump) = self.analyze(confl);
                self.apply_learned(learned, backjump);
                self.decay();
            } else {
                let level = self.decision_level();
                if level < assumptions.len() {
                    let a = assumptions[level];
                    match self.value_lit(a) {
                        Some(true) => {
                            // Already implied; open an empty level so the
                            // next assumption gets its own slot.
                            self.trail_lim.push(self.trail.len());
                        }
                        Some(false) => {
                            debug!(conflicts = self.conflicts, "unsat under assumptions");
                            self.cancel_until(0);
                            return Ok(false);
                        }
                        None => {
                            self.trail_lim.push(self.trail.len());
                            self.enqueue(a, None);
                        }
                    }
                } else if let Some(v) = self.pick_branch_var() {
                    let lit = if self.phase[v] {
                        (v + 1) as Lit
                    } else {
                        -((v + 1) as Lit)
                    };
                    self.trail_lim.push(self.trail.len());
                    self.enqueue(lit, None);
                } else {
                    debug!(conflicts = self.conflicts, "satisfiable");
                    self.snapshot_model();
                    self.cancel_until(0);
                    return Ok(true);
                }
            }
        }
    }

    fn model(&self) -> Vec<Lit> {
        self.last_model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(clauses: &[&[Lit]]) -> CdclSolver {
        let mut solver = CdclSolver::new();
        for c in clauses {
            solver.add_clause(c);
        }
        solver
    }

    fn model_value(model: &[Lit], var: Var) -> bool {
        model.contains(&(var as Lit))
    }

    #[test]
    fn empty_clause_set_is_satisfiable() {
        let mut solver = CdclSolver::new();
        assert!(solver.solve(&[]).expect("solve should succeed"));
    }

    #[test]
    fn unit_propagation_chain_finds_the_forced_model() {
        let mut solver = loaded(&[&[1], &[-1, 2], &[-2, 3]]);
        assert!(solver.solve(&[]).expect("solve should succeed"));
        let model = solver.model();
        assert!(model_value(&model, 1));
        assert!(model_value(&model, 2));
        assert!(model_value(&model, 3));
    }

    #[test]
    fn contradictory_units_are_unsat() {
        let mut solver = loaded(&[&[2], &[-2]]);
        assert!(!solver.solve(&[]).expect("solve should succeed"));
        // Unsatisfiability is permanent.
        assert!(!solver.solve(&[]).expect("solve should succeed"));
    }

    #[test]
    fn empty_clause_makes_everything_unsat() {
        let mut solver = CdclSolver::new();
        solver.add_clause(&[]);
        assert!(!solver.solve(&[]).expect("solve should succeed"));
    }

    #[test]
    fn conflict_analysis_handles_an_xor_style_contradiction() {
        // 1 <-> 2, 2 <-> 3, with 1 and -3 forced: unsat.
        let mut solver = loaded(&[
            &[-1, 2],
            &[1, -2],
            &[-2, 3],
            &[2, -3],
            &[1],
            &[-3],
        ]);
        assert!(!solver.solve(&[]).expect("solve should succeed"));
    }

    #[test]
    fn assumptions_restrict_without_destroying_state() {
        let mut solver = loaded(&[&[1, 2]]);
        assert!(solver.solve(&[-1]).expect("solve should succeed"));
        assert!(model_value(&solver.model(), 2));
        assert!(!solver.solve(&[-1, -2]).expect("solve should succeed"));
        // Previous assumption queries leave the clause set intact.
        assert!(solver.solve(&[]).expect("solve should succeed"));
        assert!(solver.solve(&[1, -2]).expect("solve should succeed"));
    }

    #[test]
    fn implied_assumption_conflicts_are_detected() {
        let mut solver = loaded(&[&[-1, 2], &[-2, 3]]);
        assert!(!solver.solve(&[1, -3]).expect("solve should succeed"));
        assert!(solver.solve(&[1, 3]).expect("solve should succeed"));
    }

    #[test]
    fn clauses_added_between_solves_take_effect() {
        let mut solver = loaded(&[&[1, 2]]);
        assert!(solver.solve(&[]).expect("solve should succeed"));
        solver.add_clause(&[-1]);
        solver.add_clause(&[-2]);
        assert!(!solver.solve(&[]).expect("solve should succeed"));
    }

    #[test]
    fn tautological_clauses_are_ignored() {
        let mut solver = loaded(&[&[1, -1], &[2]]);
        assert!(solver.solve(&[-1]).expect("solve should succeed"));
        assert!(model_value(&solver.model(), 2));
    }

    #[test]
    fn model_covers_unconstrained_variables() {
        let mut solver = loaded(&[&[1]]);
        solver.ensure_vars(4);
        assert!(solver.solve(&[]).expect("solve should succeed"));
        assert_eq!(solver.model().len(), 4);
        // Unconstrained variables default to false.
        assert!(!model_value(&solver.model(), 4));
    }

    #[test]
    fn zero_assumption_literal_is_rejected() {
        let mut solver = CdclSolver::new();
        assert_eq!(solver.solve(&[0]), Err(SatError::ZeroLiteral));
    }

    fn xorshift(state: &mut u32) -> u32 {
        *state ^= *state << 13;
        *state ^= *state >> 17;
        *state ^= *state << 5;
        *state
    }

    fn brute_force_sat(clauses: &[Vec<Lit>], num_vars: u32) -> bool {
        (0u32..1 << num_vars).any(|bits| {
            clauses.iter().all(|clause| {
                clause.iter().any(|&l| {
                    let val = (bits >> (var_of(l) - 1)) & 1 == 1;
                    if l > 0 {
                        val
                    } else {
                        !val
                    }
                })
            })
        })
    }

    fn satisfies(clauses: &[Vec<Lit>], model: &[Lit]) -> bool {
        clauses
            .iter()
            .all(|clause| clause.iter().any(|l| model.contains(l)))
    }

    #[test]
    fn incremental_solving_agrees_with_brute_force() {
        const NUM_VARS: u32 = 5;
        let mut state = 0x0b5a_d4ec_u32;
        for _ in 0..60 {
            let mut solver = CdclSolver::new();
            solver.ensure_vars(NUM_VARS);
            let mut clauses: Vec<Vec<Lit>> = Vec::new();
            for _ in 0..12 {
                let len = 1 + (xorshift(&mut state) % 3) as usize;
                let mut clause = Vec::with_capacity(len);
                for _ in 0..len {
                    let var = 1 + (xorshift(&mut state) % NUM_VARS) as Lit;
                    clause.push(if xorshift(&mut state) & 1 == 0 {
                        var
                    } else {
                        -var
                    });
                }
                solver.add_clause(&clause);
                clauses.push(clause);
                let expected = brute_force_sat(&clauses, NUM_VARS);
                let got = solver.solve(&[]).expect("solve should succeed");
                assert_eq!(got, expected, "clauses: {clauses:?}");
                if got {
                    assert!(
                        satisfies(&clauses, &solver.model()),
                        "model must satisfy {clauses:?}"
                    );
                }
                if !expected {
                    break;
                }
            }
        }
    }

    #[test]
    fn small_pigeonhole_is_unsat() {
        // Three pigeons, two holes: var (p, h) = p * 2 + h - 2.
        let mut solver = CdclSolver::new();
        for p in 0..3i32 {
            solver.add_clause(&[p * 2 + 1, p * 2 + 2]);
        }
        for h in 1..=2i32 {
            for p1 in 0..3i32 {
                for p2 in (p1 + 1)..3i32 {
                    solver.add_clause(&[-(p1 * 2 + h), -(p2 * 2 + h)]);
                }
            }
        }
        assert!(!solver.solve(&[]).expect("solve should succeed"));
    }
}
