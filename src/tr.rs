// Copyright 2020 Xavier Gillard
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Transition Relation construction, merging, and image/preimage (spec
//! §4.2). This is the heart of the engine: every operator becomes one or
//! more BDDs over `pre ∪ eff` variables, optionally strengthened against
//! the mutex sets, optionally cloned per SDAC cost case, and merged
//! disjunctively with same-cost siblings to keep the open list's buckets
//! small.

use std::collections::BTreeSet;

use biodivine_lib_bdd::{Bdd, BddVariable};

use crate::common::{BddStep, Budget, Cost, Fact, FdVar, OpId};
use crate::config::{CondEffTr, MutexType};
use crate::dd::{and_abstract, checked, checked_timed};
use crate::error::PlannerError;
use crate::mutex::MutexSets;
use crate::task::{AbstractTask, Operator};
use crate::vars::{Side, Vars};

/// How a transition relation's BDD was assembled; purely informational,
/// kept for diagnostics and for choosing a merge/image strategy.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TrKind {
    Monolithic,
    Disjunctive,
    Conjunctive,
}

/// A transition relation: one BDD (or, under `Conjunctive`, a set of
/// per-variable BDDs) relating pre-state to post-state for one or more
/// operators of equal cost.
#[derive(Clone)]
pub struct TransitionRelation {
    pub tr_bdd: Bdd,
    /// Present only for `TrKind::Conjunctive`; each entry is the
    /// per-variable effect BDD, combined via `AndAbstract` at image time.
    pub conjuncts: Vec<Bdd>,
    pub cost: Cost,
    pub eff_vars: Vec<FdVar>,
    /// Pre bits of `eff_vars`: the `AndAbstract` cube for `image`, and one
    /// half of the touched-variable rename pair (spec §3, "exist_vars").
    /// Seeded from this TR's own `eff_vars` at construction, widened to the
    /// union inside `merge_disjunctive` — never the whole task's pre bits,
    /// or an operator that leaves some variable untouched would have that
    /// variable's value discarded before the rename step gets a chance to
    /// re-pin it.
    pub exist_vars: Vec<BddVariable>,
    /// Eff bits of `eff_vars`: the `AndAbstract` cube for `preimage`, the
    /// "exists_bw_vars" counterpart of `exist_vars`.
    pub exists_bw_vars: Vec<BddVariable>,
    pub ops_ids: BTreeSet<usize>,
    pub kind: TrKind,
}

impl TransitionRelation {
    /// The full relation, folding the `Conjunctive` per-variable effect
    /// BDDs into the precondition/e-deletion BDD. Under `Monolithic` or
    /// `Disjunctive`, `conjuncts` is empty and this is just `tr_bdd`.
    fn full_bdd(&self) -> Bdd {
        let mut bdd = self.tr_bdd.clone();
        for c in &self.conjuncts {
            bdd = bdd.and(c);
        }
        bdd
    }

    /// `image(S) = swap_pre_eff(AndAbstract(tr_bdd, S, exist_vars))`. `S`
    /// must be a pure-pre state set. The rename step (renaming this TR's
    /// touched variables from eff back to pre) is restricted to
    /// `exist_vars`/`exists_bw_vars` rather than every task variable, so a
    /// variable this operator doesn't mention keeps whatever pre-value `S`
    /// already pinned it to.
    pub fn image(&self, vars: &Vars, s: &Bdd, budget: &Budget) -> BddStep<Bdd> {
        let quantified = and_abstract(&self.full_bdd(), s, &self.exist_vars);
        checked(|| vars.swap_subset(&quantified, Side::Eff, &self.exist_vars, &self.exists_bw_vars), budget)
    }

    /// `preimage(S) = AndAbstract(tr_bdd, swap_pre_eff(S), exists_bw_vars)`.
    /// `S` must be a pure-pre state set. As in `image`, both the rename and
    /// the final `AndAbstract` are restricted to this TR's own touched
    /// variables.
    pub fn preimage(&self, vars: &Vars, s: &Bdd, budget: &Budget) -> BddStep<Bdd> {
        let swapped = vars.swap_subset(s, Side::Pre, &self.exist_vars, &self.exists_bw_vars);
        let result = and_abstract(&self.full_bdd(), &swapped, &self.exists_bw_vars);
        checked(|| result, budget)
    }
}

/// Builds the frame-preserving effect BDD for one variable under
/// conditional effects (spec §4.2):
/// `effect_bdd(var) = Σ_i (cond_i ∧ eff_bdd(var, val_i)) + (¬Σcond_i ∧ biimp(var))`.
fn conditional_effect_bdd(vars: &Vars, op: &Operator, var: FdVar) -> Bdd {
    let mut any_condition = vars.mk_false();
    let mut effect = vars.mk_false();
    for e in op.effects.iter().filter(|e| e.target.var == var) {
        let cond = vars.partial_state_bdd(&e.conditions);
        any_condition = any_condition.or(&cond);
        effect = effect.or(&cond.and(vars.eff_bdd(e.target)));
    }
    let frame = any_condition.not().and(vars.biimp(var));
    effect.or(&frame)
}

/// Builds the transition relation for a single grounded operator, ignoring
/// SDAC (the caller clones per cost case afterwards if `op.sdac.is_some()`).
pub fn build_operator_tr(
    vars: &Vars,
    op: &Operator,
    op_id: OpId,
    cond_eff_tr: CondEffTr,
    mutex: &MutexSets,
    mutex_type: MutexType,
    budget: &Budget,
) -> Result<BddStep<TransitionRelation>, PlannerError> {
    let affected = op.affected_variables();
    let exist_vars = vars.pre_bits_for(&affected);
    let exists_bw_vars = vars.eff_bits_for(&affected);
    let preconditions = vars.partial_state_bdd(&op.preconditions);

    if !op.has_conditional_effects() {
        let mut tr_bdd = preconditions;
        for e in &op.effects {
            tr_bdd = tr_bdd.and(vars.eff_bdd(e.target));
        }
        if matches!(mutex_type, MutexType::Edeletion) {
            tr_bdd = apply_edeletion(vars, op, &tr_bdd, mutex);
        }
        return Ok(match checked_timed(|| tr_bdd.clone(), budget) {
            BddStep::Ready(tr_bdd) => BddStep::Ready(TransitionRelation {
                tr_bdd,
                conjuncts: Vec::new(),
                cost: op.cost,
                eff_vars: affected,
                exist_vars,
                exists_bw_vars,
                ops_ids: [op_id.0].into_iter().collect(),
                kind: TrKind::Monolithic,
            }),
            BddStep::Truncated => BddStep::Truncated,
        });
    }

    match cond_eff_tr {
        CondEffTr::Monolithic => {
            let mut tr_bdd = preconditions;
            for &var in &affected {
                tr_bdd = tr_bdd.and(&conditional_effect_bdd(vars, op, var));
            }
            if matches!(mutex_type, MutexType::Edeletion) {
                tr_bdd = apply_edeletion(vars, op, &tr_bdd, mutex);
            }
            Ok(match checked_timed(|| tr_bdd.clone(), budget) {
                BddStep::Ready(tr_bdd) => BddStep::Ready(TransitionRelation {
                    tr_bdd,
                    conjuncts: Vec::new(),
                    cost: op.cost,
                    eff_vars: affected,
                    exist_vars,
                    exists_bw_vars,
                    ops_ids: [op_id.0].into_iter().collect(),
                    kind: TrKind::Monolithic,
                }),
                BddStep::Truncated => BddStep::Truncated,
            })
        }
        CondEffTr::Conjunctive | CondEffTr::ConjunctiveEarlyQuant => {
            let mut conjuncts: Vec<Bdd> = Vec::with_capacity(affected.len());
            for &var in &affected {
                conjuncts.push(conditional_effect_bdd(vars, op, var));
            }
            let tr_bdd = preconditions;
            let tr_bdd = if matches!(mutex_type, MutexType::Edeletion) {
                apply_edeletion(vars, op, &tr_bdd, mutex)
            } else {
                tr_bdd
            };
            Ok(match checked_timed(|| tr_bdd.clone(), budget) {
                BddStep::Ready(tr_bdd) => BddStep::Ready(TransitionRelation {
                    tr_bdd,
                    conjuncts,
                    cost: op.cost,
                    eff_vars: affected,
                    exist_vars,
                    exists_bw_vars,
                    ops_ids: [op_id.0].into_iter().collect(),
                    kind: TrKind::Conjunctive,
                }),
                BddStep::Truncated => BddStep::Truncated,
            })
        }
    }
}

/// E-deletion strengthening (spec §4.2): for each effect `(var, v')` with
/// precondition value `v` on `var` (or absent), conjoin the relevant
/// `notMutex` and `exactlyOne` BDDs into `tr_bdd`.
fn apply_edeletion(vars: &Vars, op: &Operator, tr_bdd: &Bdd, mutex: &MutexSets) -> Bdd {
    let mut result = tr_bdd.clone();
    for e in &op.effects {
        let pre_value = op
            .preconditions
            .iter()
            .find(|f| f.var == e.target.var)
            .copied();

        let bw_guard = match pre_value {
            Some(f) => mutex.not_mutex_bw_fact(vars, f),
            None => (0..vars.domain_size(e.target.var))
                .map(|v| mutex.not_mutex_bw_fact(vars, Fact::new(e.target.var, v)))
                .fold(vars.mk_false(), |acc, bdd| acc.or(&bdd)),
        };
        let fw_guard = vars.swap_pre_eff(&mutex.not_mutex_fw_fact(vars, e.target), Side::Pre);
        let exactly_one = mutex.exactly_one_fact(vars, e.target);

        result = result.and(&bw_guard).and(&fw_guard).and(&exactly_one);
    }
    result
}

/// Cost-conditioned clones for a state-dependent action cost (SDAC)
/// operator: one `TransitionRelation` per grounded cost case, each
/// additionally guarded by its case's condition.
pub fn build_sdac_clones(
    vars: &Vars,
    op: &Operator,
    op_id: OpId,
    template: &TransitionRelation,
    budget: &Budget,
) -> BddStep<Vec<TransitionRelation>> {
    let cases = match &op.sdac {
        Some(cases) => cases,
        None => return BddStep::Ready(vec![template.clone()]),
    };
    let mut clones = Vec::with_capacity(cases.len());
    for case in cases {
        let guard = vars.partial_state_bdd(&case.guard);
        let tr_bdd = template.tr_bdd.and(&guard);
        match checked_timed(|| tr_bdd.clone(), budget) {
            BddStep::Ready(tr_bdd) => clones.push(TransitionRelation {
                tr_bdd,
                conjuncts: template.conjuncts.clone(),
                cost: case.cost,
                eff_vars: template.eff_vars.clone(),
                exist_vars: template.exist_vars.clone(),
                exists_bw_vars: template.exists_bw_vars.clone(),
                ops_ids: [op_id.0].into_iter().collect(),
                kind: template.kind,
            }),
            BddStep::Truncated => return BddStep::Truncated,
        }
    }
    BddStep::Ready(clones)
}

/// Disjunctive merge of two same-cost transition relations (spec §4.2).
/// On node-budget overflow, signals "merge failed, keep both" by
/// returning `Truncated`; callers must retain the unmerged TRs.
pub fn merge_disjunctive(
    vars: &Vars,
    t1: &TransitionRelation,
    t2: &TransitionRelation,
    budget: &Budget,
) -> BddStep<TransitionRelation> {
    debug_assert_eq!(t1.cost, t2.cost);

    let mut eff_vars: Vec<FdVar> = t1.eff_vars.iter().chain(t2.eff_vars.iter()).copied().collect();
    eff_vars.sort_by_key(|v| v.id());
    eff_vars.dedup();

    let widen = |tr: &TransitionRelation| -> Bdd {
        let mut bdd = tr.tr_bdd.clone();
        for &c in &tr.conjuncts {
            bdd = bdd.and(&c);
        }
        for &var in &eff_vars {
            if !tr.eff_vars.contains(&var) {
                bdd = bdd.and(vars.biimp(var));
            }
        }
        bdd
    };

    let wide1 = widen(t1);
    let wide2 = widen(t2);

    match checked_timed(|| wide1.or(&wide2), budget) {
        BddStep::Ready(tr_bdd) => {
            let mut ops_ids = t1.ops_ids.clone();
            ops_ids.extend(t2.ops_ids.iter().copied());
            // `exist_vars`/`exists_bw_vars` widen to the union cube right
            // alongside `eff_vars` (spec §4.2, disjunctive merge point 4):
            // rebuilding from the merged `eff_vars` rather than
            // concatenating `t1`/`t2`'s own lists sidesteps re-deduping
            // bits shared by both operands.
            let exist_vars = vars.pre_bits_for(&eff_vars);
            let exists_bw_vars = vars.eff_bits_for(&eff_vars);
            BddStep::Ready(TransitionRelation {
                tr_bdd,
                conjuncts: Vec::new(),
                cost: t1.cost,
                eff_vars,
                exist_vars,
                exists_bw_vars,
                ops_ids,
                kind: TrKind::Disjunctive,
            })
        }
        BddStep::Truncated => BddStep::Truncated,
    }
}

/// Builds every transition relation for `task`: per-operator TRs (with
/// SDAC clones expanded), not yet merged. Returns `Err` only for task
/// feature combinations that cannot be represented (spec severity 4).
pub fn build_all(
    vars: &Vars,
    task: &dyn AbstractTask,
    mutex: &MutexSets,
    cond_eff_tr: CondEffTr,
    mutex_type: MutexType,
    budget: &Budget,
) -> Result<Vec<TransitionRelation>, PlannerError> {
    let mut all = Vec::new();
    for i in 0..task.num_operators() {
        let op_id = OpId(i);
        let op = task.operator(op_id);
        if op.sdac.is_some() && matches!(cond_eff_tr, CondEffTr::Conjunctive | CondEffTr::ConjunctiveEarlyQuant)
            && op.has_conditional_effects()
        {
            return Err(PlannerError::UnsupportedTaskFeature(format!(
                "operator '{}' combines SDAC with a non-monolithic conditional-effect encoding",
                op.name
            )));
        }
        let template = match build_operator_tr(vars, op, op_id, cond_eff_tr, mutex, mutex_type, budget)? {
            BddStep::Ready(tr) => tr,
            BddStep::Truncated => {
                return Err(PlannerError::UnsupportedTaskFeature(format!(
                    "operator '{}' exceeds the transition-relation node budget",
                    op.name
                )))
            }
        };
        match build_sdac_clones(vars, op, op_id, &template, budget) {
            BddStep::Ready(mut clones) => all.append(&mut clones),
            BddStep::Truncated => {
                return Err(PlannerError::UnsupportedTaskFeature(format!(
                    "operator '{}' exceeds the SDAC clone node budget",
                    op.name
                )))
            }
        }
    }
    Ok(all)
}
