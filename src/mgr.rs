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

//! The State-Space Manager: owns the shared, read-only symbolic model
//! (variables, mutex sets, transition relations) that both search
//! directions query. Neither direction mutates this state; each keeps its
//! own open/closed/frontier structures.

use std::collections::BTreeMap;
use std::time::Instant;

use biodivine_lib_bdd::Bdd;

use crate::common::{Budget, Cost};
use crate::config::{MutexType, SearchConfig};
use crate::dd::checked;
use crate::error::PlannerError;
use crate::mutex::MutexSets;
use crate::open_list::Bucket;
use crate::ordering::variable_order;
use crate::task::AbstractTask;
use crate::tr::{self, TransitionRelation};
use crate::vars::Vars;

pub struct Mgr {
    vars: Vars,
    mutex: MutexSets,
    /// Disjunctively pooled per-cost transition relations, used by the
    /// frontier during search to cut down on per-step image calls.
    zero_cost_trs: Vec<TransitionRelation>,
    cost_trs: Vec<TransitionRelation>,
    /// The original, unmerged, one-operator-per-entry transition
    /// relations, kept for plan reconstruction (spec §4.8 needs to name
    /// the exact operator that produced a given step, which a merged,
    /// multi-operator relation cannot).
    per_op_trs: Vec<TransitionRelation>,
    min_action_cost: Cost,
    init_bdd: Bdd,
    goal_bdd: Bdd,
}

impl Mgr {
    pub fn build(task: &dyn AbstractTask, config: &SearchConfig) -> Result<Mgr, PlannerError> {
        let order = if config.gamer_ordering {
            variable_order(task)
        } else {
            (0..task.num_variables()).collect()
        };
        let vars = Vars::build(task, order);

        let mutex = MutexSets::build(&vars, task.mutex_groups(), &config.mutex_budget());

        let per_op_trs = tr::build_all(&vars, task, &mutex, config.cond_eff_tr, config.mutex_type, &config.tr_budget())?;

        let mut zero_group = Vec::new();
        let mut cost_groups: BTreeMap<Cost, Vec<TransitionRelation>> = BTreeMap::new();
        let mut min_action_cost = crate::common::INFINITY;
        for t in &per_op_trs {
            if t.cost == 0 {
                zero_group.push(t.clone());
            } else {
                min_action_cost = min_action_cost.min(t.cost);
                cost_groups.entry(t.cost).or_default().push(t.clone());
            }
        }
        if min_action_cost == crate::common::INFINITY {
            min_action_cost = 0;
        }

        let tr_budget = config.tr_budget();
        let zero_cost_trs = merge_same_cost(&vars, zero_group, &tr_budget);
        let mut cost_trs = Vec::new();
        for (_, group) in cost_groups {
            cost_trs.extend(merge_same_cost(&vars, group, &tr_budget));
        }

        let init_bdd = vars.state_bdd(&task.initial_state());
        let goal_bdd = vars.partial_state_bdd(&task.goal());

        Ok(Mgr { vars, mutex, zero_cost_trs, cost_trs, per_op_trs, min_action_cost, init_bdd, goal_bdd })
    }

    pub fn vars(&self) -> &Vars {
        &self.vars
    }

    pub fn init_bdd(&self) -> &Bdd {
        &self.init_bdd
    }

    pub fn goal_bdd(&self) -> &Bdd {
        &self.goal_bdd
    }

    pub fn min_action_cost(&self) -> Cost {
        self.min_action_cost
    }

    pub fn has_zero_cost_operators(&self) -> bool {
        !self.zero_cost_trs.is_empty()
    }

    pub fn filter_mutex(
        &self,
        s: &Bdd,
        fw: bool,
        initializing: bool,
        mutex_type: MutexType,
        budget: &Budget,
    ) -> crate::common::BddStep<Bdd> {
        self.mutex.filter(&self.vars, s, fw, initializing, mutex_type, budget)
    }

    /// Disjunctive OR of two bucket entries under budget, used by the
    /// frontier's `Smerge` stage.
    pub fn merge_bucket(&self, a: &Bdd, b: &Bdd, budget: &Budget) -> crate::common::BddStep<Bdd> {
        checked(|| a.or(b), budget)
    }

    /// Tournament-merges `bucket` in place: pairs up adjacent elements each
    /// round (an odd one out is merged with its neighbor first to force an
    /// even count), OR-ing each pair under `budget`. A pair that would
    /// exceed the node budget is kept as two separate surviving entries
    /// (the smaller of the two goes on to the next round, the larger is set
    /// aside) rather than failing the merge outright, so a bucket stays a
    /// valid disjunctive `Vec<Bdd>` of however many pieces the budget
    /// allowed instead of collapsing to one BDD or refusing to merge at
    /// all. Stops early once the wall-clock half of `budget` is spent,
    /// leaving whatever remains unmerged.
    pub fn merge_bucket_tournament(&self, bucket: &mut Bucket, budget: &Budget) {
        if bucket.len() <= 1 {
            return;
        }
        let start = Instant::now();
        let mut result: Vec<Bdd> = Vec::new();
        while bucket.len() > 1 && (start.elapsed().as_millis() as u64) < budget.max_time_ms {
            if bucket.len() % 2 == 1 {
                let last = bucket.pop().expect("len > 1 implies non-empty");
                let second_last = bucket.pop().expect("len was odd and > 1");
                match self.merge_bucket(&second_last, &last, budget) {
                    crate::common::BddStep::Ready(merged) => bucket.push(merged),
                    crate::common::BddStep::Truncated => {
                        bucket.push(second_last);
                        result.push(last);
                    }
                }
            }
            let mut aux = Vec::with_capacity(bucket.len() / 2 + 1);
            let mut i = 1;
            while i < bucket.len() {
                match self.merge_bucket(&bucket[i - 1], &bucket[i], budget) {
                    crate::common::BddStep::Ready(merged) => aux.push(merged),
                    crate::common::BddStep::Truncated => {
                        if bucket[i].size() < bucket[i - 1].size() {
                            result.push(bucket[i - 1].clone());
                            aux.push(bucket[i].clone());
                        } else {
                            result.push(bucket[i].clone());
                            aux.push(bucket[i - 1].clone());
                        }
                    }
                }
                i += 2;
            }
            *bucket = aux;
        }
        result.append(bucket);
        *bucket = result;
    }

    /// Applies every zero-cost transition relation's image (`fw`) or
    /// preimage (`!fw`) to `s`, returning one BDD per relation.
    pub fn zero_cost_step(&self, s: &Bdd, fw: bool, budget: &Budget) -> crate::common::BddStep<Vec<Bdd>> {
        step_all(&self.zero_cost_trs, &self.vars, s, fw, budget)
    }

    /// Applies every positive-cost transition relation's image/preimage to
    /// `s`, grouped by the relation's cost.
    pub fn cost_step(&self, s: &Bdd, fw: bool, budget: &Budget) -> crate::common::BddStep<BTreeMap<Cost, Bucket>> {
        let mut by_cost: BTreeMap<Cost, Bucket> = BTreeMap::new();
        for t in &self.cost_trs {
            let step = if fw { t.image(&self.vars, s, budget) } else { t.preimage(&self.vars, s, budget) };
            match step {
                crate::common::BddStep::Ready(bdd) => {
                    if !bdd.is_false() {
                        by_cost.entry(t.cost).or_default().push(bdd);
                    }
                }
                crate::common::BddStep::Truncated => return crate::common::BddStep::Truncated,
            }
        }
        crate::common::BddStep::Ready(by_cost)
    }

    /// The unmerged, one-operator-per-entry transition relations at a
    /// given positive cost, for plan reconstruction.
    pub fn per_op_trs_at_cost(&self, cost: Cost) -> impl Iterator<Item = &TransitionRelation> {
        self.per_op_trs.iter().filter(move |t| t.cost == cost)
    }

    /// The unmerged zero-cost transition relations, for plan
    /// reconstruction.
    pub fn per_op_zero_cost_trs(&self) -> impl Iterator<Item = &TransitionRelation> {
        self.per_op_trs.iter().filter(|t| t.cost == 0)
    }

    /// The unmerged transition relation naming exactly `op`, for replaying
    /// a reconstructed plan from the initial state.
    pub fn per_op_tr(&self, op: crate::common::OpId) -> Option<&TransitionRelation> {
        self.per_op_trs.iter().find(|t| t.ops_ids.contains(&op.0))
    }

    /// The distinct positive operator costs present in the task, smallest
    /// first; used by plan reconstruction to enumerate candidate steps
    /// without scanning every integer up to the remaining budget.
    pub fn distinct_op_costs(&self) -> Vec<Cost> {
        let mut costs: Vec<Cost> = self.per_op_trs.iter().map(|t| t.cost).filter(|&c| c > 0).collect();
        costs.sort_unstable();
        costs.dedup();
        costs
    }
}

fn step_all(trs: &[TransitionRelation], vars: &Vars, s: &Bdd, fw: bool, budget: &Budget) -> crate::common::BddStep<Vec<Bdd>> {
    let mut out = Vec::with_capacity(trs.len());
    for t in trs {
        let step = if fw { t.image(vars, s, budget) } else { t.preimage(vars, s, budget) };
        match step {
            crate::common::BddStep::Ready(bdd) => {
                if !bdd.is_false() {
                    out.push(bdd);
                }
            }
            crate::common::BddStep::Truncated => return crate::common::BddStep::Truncated,
        }
    }
    crate::common::BddStep::Ready(out)
}

/// Folds same-cost transition relations together via disjunctive merge,
/// left to right; a truncated merge keeps the unmerged remainder as
/// separate entries rather than failing the whole pool.
fn merge_same_cost(vars: &Vars, group: Vec<TransitionRelation>, budget: &Budget) -> Vec<TransitionRelation> {
    let mut acc: Vec<TransitionRelation> = Vec::new();
    for t in group {
        match acc.pop() {
            Some(last) => match tr::merge_disjunctive(vars, &last, &t, budget) {
                crate::common::BddStep::Ready(merged) => acc.push(merged),
                crate::common::BddStep::Truncated => {
                    acc.push(last);
                    acc.push(t);
                }
            },
            // `acc` is empty only for the very first relation in the group:
            // nothing to merge it with yet, so it goes in unmerged and
            // becomes the accumulator for the next iteration.
            None => acc.push(t),
        }
    }
    acc
}
