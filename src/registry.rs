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

//! Solution Registry and Plan Reconstruction (spec §4.8): a priority
//! queue of registered cuts ordered by `g + h`, each expanded by a
//! depth-first backward/forward walk over the closed lists into one or
//! more concrete plans.

use std::cmp::Ordering;

use biodivine_lib_bdd::Bdd;
use binary_heap_plus::BinaryHeap;
use compare::Compare;
use fxhash::FxHashSet;

use crate::closed_list::ClosedList;
use crate::common::{BddStep, Budget, Cost, Cut, OpId, Plan};
use crate::config::SearchMode;
use crate::mgr::Mgr;
use crate::tr::TransitionRelation;

struct CutOrder;
impl Compare<Cut> for CutOrder {
    /// Lowest `g + h` first: `BinaryHeap` pops the element this orders as
    /// greatest, so cheaper cuts must compare as greater.
    fn compare(&self, a: &Cut, b: &Cut) -> Ordering {
        b.cost().cmp(&a.cost())
    }
}

/// Collects registered cuts, reconstructs them into plans, deduplicates
/// by action sequence, and enforces the configured `SearchMode`'s
/// emission limit.
pub struct SolutionRegistry {
    heap: BinaryHeap<Cut, CutOrder>,
    seen: FxHashSet<Plan>,
    plans: Vec<Plan>,
    mode: SearchMode,
    simple: bool,
    cheapest_cost: Option<Cost>,
    /// An a-priori upper bound injected via [`SolutionRegistry::set_primal_bound`]
    /// (SPEC_FULL.md §3, "Cost-bound short-circuit"), independent of any
    /// registered cut.
    primal_bound: Option<Cost>,
}

impl SolutionRegistry {
    pub fn new(mode: SearchMode, simple: bool) -> Self {
        SolutionRegistry {
            heap: BinaryHeap::from_vec_cmp(Vec::new(), CutOrder),
            seen: FxHashSet::default(),
            plans: Vec::new(),
            mode,
            simple,
            cheapest_cost: None,
            primal_bound: None,
        }
    }

    pub fn register_cut(&mut self, cut: Cut) {
        self.heap.push(cut);
    }

    /// Tightens the upper bound with an externally supplied cost, if it
    /// improves on whatever primal bound is already known. Does not
    /// register a plan: this is a pruning aid, not a reported solution.
    pub fn set_primal_bound(&mut self, cost: Cost) {
        self.primal_bound = Some(match self.primal_bound {
            Some(existing) => existing.min(cost),
            None => cost,
        });
    }

    /// The current upper bound: the cheapest registered cut's cost (or
    /// `INFINITY` before any cut is known), scaled by the quality
    /// multiplier under `TopQ`, tightened further by any injected primal
    /// bound.
    pub fn upper_bound(&self) -> Cost {
        let from_cuts = match self.cheapest_cost {
            None => crate::common::INFINITY,
            Some(c) => match self.mode {
                SearchMode::TopQ(q) => ((c as f64) * q).floor() as Cost,
                _ => c,
            },
        };
        from_cuts.min(self.primal_bound.unwrap_or(crate::common::INFINITY))
    }

    pub fn optimal_cost(&self) -> Option<Cost> {
        self.cheapest_cost
    }

    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    fn satisfied(&self) -> bool {
        match self.mode {
            SearchMode::Single => !self.plans.is_empty(),
            SearchMode::TopK(k) => self.plans.len() >= k,
            SearchMode::TopQ(_) => false,
        }
    }

    /// Pops registered cuts cheapest-first and reconstructs each into
    /// every valid plan (spec §4.8, "Top-K enumeration": reconstruction
    /// is a DFS over all `(c, t)` decompositions, not just one), stopping
    /// once the configured mode is satisfied (or the heap is drained).
    /// `bw_closed` is `None` in unidirectional forward search; a cut's
    /// `h` is then always 0 and no suffix walk runs.
    pub fn drain(&mut self, mgr: &Mgr, fw_closed: &ClosedList, bw_closed: Option<&ClosedList>, budget: &Budget) {
        while !self.satisfied() {
            let cut = match self.heap.pop() {
                Some(c) => c,
                None => break,
            };
            if self.cheapest_cost.is_none() {
                self.cheapest_cost = Some(cut.cost());
            }
            reconstruct(mgr, fw_closed, bw_closed, &cut, self.simple, budget, &mut |plan| {
                if self.seen.insert(plan.clone()) {
                    self.plans.push(plan);
                }
                !self.satisfied()
            });
        }
    }
}

/// Reconstructs every plan reachable from a cut: a prefix walked
/// backward (via `preimage`) from `cut.cut_bdd` down to `g == 0` in the
/// forward closed list, combined (if `cut.h > 0`) with every suffix
/// walked forward (via `image`) down to `h == 0` in the backward closed
/// list. Each complete plan is passed to `emit` in DFS order; `emit`
/// returns `false` to request the walk stop early (the registry is
/// already satisfied).
fn reconstruct(
    mgr: &Mgr,
    fw_closed: &ClosedList,
    bw_closed: Option<&ClosedList>,
    cut: &Cut,
    simple: bool,
    budget: &Budget,
    emit: &mut dyn FnMut(Plan) -> bool,
) {
    walk(mgr, fw_closed, true, cut.cut_bdd.clone(), cut.g, simple, budget, &mut |prefix_rev| {
        let mut prefix: Plan = prefix_rev.to_vec();
        prefix.reverse();

        match (bw_closed, cut.h) {
            (Some(bw), h) if h > 0 => {
                let mut keep_going = true;
                walk(mgr, bw, false, cut.cut_bdd.clone(), h, simple, budget, &mut |suffix| {
                    let mut plan = prefix.clone();
                    plan.extend_from_slice(suffix);
                    keep_going = emit_verified(mgr, cut, plan, budget, emit);
                    keep_going
                });
                keep_going
            }
            _ => emit_verified(mgr, cut, prefix, budget, emit),
        }
    });
}

/// Replays `plan` forward from the initial state before handing it to
/// `emit` (SPEC_FULL.md §3, "Plan validation hook": a debug-only
/// consistency check mirroring the original's internal assertion-only
/// plan replay).
fn emit_verified(mgr: &Mgr, cut: &Cut, plan: Plan, budget: &Budget, emit: &mut dyn FnMut(Plan) -> bool) -> bool {
    debug_assert!(
        replay_reaches_goal(mgr, &plan, budget),
        "reconstructed plan of cost {} does not reach the goal when replayed from the initial state",
        cut.cost()
    );
    emit(plan)
}

/// Applies every operator's image in sequence from `mgr.init_bdd()` and
/// checks the result intersects the goal. A budget truncation along the
/// way is not treated as a failure: it just means this debug check
/// couldn't be completed, not that the plan is wrong.
fn replay_reaches_goal(mgr: &Mgr, plan: &[OpId], budget: &Budget) -> bool {
    let mut state = mgr.init_bdd().clone();
    for &op in plan {
        let t = match mgr.per_op_tr(op) {
            Some(t) => t,
            None => return false,
        };
        state = match t.image(mgr.vars(), &state, budget) {
            BddStep::Ready(bdd) => bdd,
            BddStep::Truncated => return true,
        };
        if state.is_false() {
            return false;
        }
    }
    !state.and(mgr.goal_bdd()).is_false()
}

/// Walks from `x` (a set of states at distance `remaining` from the
/// anchor: the initial state under `use_preimage`, the goal otherwise)
/// down to distance 0 via DFS backtracking, exploring every valid
/// `(c, t)` decomposition at each step (spec §4.8, "Top-K enumeration")
/// rather than committing to the first one found. Zero-cost steps are
/// preferred within the current zero-closure layering: if any zero-cost
/// step applies, *all* such steps are explored and no positive-cost step
/// is tried at this `x` (spec §4.8, "if no zero-step applies"). Each
/// complete operator-id sequence (reconstruction-direction, not
/// necessarily chronological — see callers) is passed to `emit`, which
/// returns `false` to stop the whole walk early.
fn walk(
    mgr: &Mgr,
    closed: &ClosedList,
    use_preimage: bool,
    x: Bdd,
    remaining: Cost,
    simple: bool,
    budget: &Budget,
    emit: &mut dyn FnMut(&[OpId]) -> bool,
) -> bool {
    let mut ops = Vec::new();
    let visited = if simple { Some(x.clone()) } else { None };
    walk_step(mgr, closed, use_preimage, x, remaining, simple, budget, &mut ops, visited, emit)
}

#[allow(clippy::too_many_arguments)]
fn walk_step(
    mgr: &Mgr,
    closed: &ClosedList,
    use_preimage: bool,
    x: Bdd,
    remaining: Cost,
    simple: bool,
    budget: &Budget,
    ops: &mut Vec<OpId>,
    visited: Option<Bdd>,
    emit: &mut dyn FnMut(&[OpId]) -> bool,
) -> bool {
    if remaining == 0 {
        return emit(ops);
    }

    let vars = mgr.vars();
    let layers = closed.zero_cost_layers(remaining);
    if let Some(zi) = layers.iter().position(|layer| x.and_not(layer).is_false()) {
        let mut any_zero = false;
        for t in mgr.per_op_zero_cost_trs() {
            for (succ, _zp) in step_into_all_layers(mgr, t, use_preimage, &x, &layers[..zi], &visited, budget) {
                any_zero = true;
                ops.push(op_id_of(t));
                let next_visited = mark_visited(&visited, &x);
                let keep_going = walk_step(mgr, closed, use_preimage, succ, remaining, simple, budget, ops, next_visited, emit);
                ops.pop();
                if !keep_going {
                    return false;
                }
            }
        }
        if any_zero {
            return true;
        }
    }

    for &c in mgr.distinct_op_costs().iter().filter(|&&c| c <= remaining) {
        let target = remaining - c;
        let closed_target = match closed.closed_at(target) {
            Some(bdd) => bdd,
            None => continue,
        };
        for t in mgr.per_op_trs_at_cost(c) {
            if let Some(succ) = step_into(vars, t, use_preimage, &x, closed_target, &visited, budget) {
                ops.push(op_id_of(t));
                let next_visited = mark_visited(&visited, &x);
                let keep_going = walk_step(mgr, closed, use_preimage, succ, target, simple, budget, ops, next_visited, emit);
                ops.pop();
                if !keep_going {
                    return false;
                }
            }
        }
    }

    true
}

fn op_id_of(t: &TransitionRelation) -> OpId {
    OpId(*t.ops_ids.iter().next().expect("transition relation always names its operator"))
}

fn mark_visited(visited: &Option<Bdd>, x: &Bdd) -> Option<Bdd> {
    visited.as_ref().map(|v| v.or(x))
}

fn step_into(
    vars: &crate::vars::Vars,
    t: &TransitionRelation,
    use_preimage: bool,
    x: &Bdd,
    target: &Bdd,
    visited: &Option<Bdd>,
    budget: &Budget,
) -> Option<Bdd> {
    let succ = match if use_preimage { t.preimage(vars, x, budget) } else { t.image(vars, x, budget) } {
        BddStep::Ready(bdd) => bdd,
        BddStep::Truncated => return None,
    };
    let mut candidate = succ.and(target);
    if let Some(v) = visited {
        candidate = candidate.and_not(v);
    }
    if candidate.is_false() {
        None
    } else {
        Some(candidate)
    }
}

/// Like [`step_into`], but returns every `earlier_layers` entry the
/// transition's successor intersects, rather than just the first, so the
/// caller can branch over all of them.
fn step_into_all_layers(
    mgr: &Mgr,
    t: &TransitionRelation,
    use_preimage: bool,
    x: &Bdd,
    earlier_layers: &[Bdd],
    visited: &Option<Bdd>,
    budget: &Budget,
) -> Vec<(Bdd, usize)> {
    let vars = mgr.vars();
    let succ = match if use_preimage { t.preimage(vars, x, budget) } else { t.image(vars, x, budget) } {
        BddStep::Ready(bdd) => bdd,
        BddStep::Truncated => return Vec::new(),
    };
    if succ.is_false() {
        return Vec::new();
    }
    let mut out = Vec::new();
    for (zp, layer) in earlier_layers.iter().enumerate() {
        let mut candidate = succ.and(layer);
        if let Some(v) = visited {
            candidate = candidate.and_not(v);
        }
        if !candidate.is_false() {
            out.push((candidate, zp));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Fact, FdVar};
    use crate::config::SearchConfig;
    use crate::task::{AbstractTask, Effect, MutexGroup, Operator};

    struct Chain {
        ops: Vec<Operator>,
    }
    impl AbstractTask for Chain {
        fn num_variables(&self) -> usize {
            1
        }
        fn domain_size(&self, _var: FdVar) -> u32 {
            3
        }
        fn initial_state(&self) -> Vec<u32> {
            vec![0]
        }
        fn goal(&self) -> Vec<Fact> {
            vec![Fact::new(FdVar(0), 2)]
        }
        fn num_operators(&self) -> usize {
            self.ops.len()
        }
        fn operator(&self, id: OpId) -> &Operator {
            &self.ops[id.0]
        }
        fn mutex_groups(&self) -> &[MutexGroup] {
            &[]
        }
    }

    #[test]
    fn reconstructs_a_two_step_forward_chain() {
        let ops = vec![
            Operator {
                name: "zero_to_one".into(),
                preconditions: vec![Fact::new(FdVar(0), 0)],
                effects: vec![Effect { target: Fact::new(FdVar(0), 1), conditions: vec![] }],
                cost: 1,
                sdac: None,
            },
            Operator {
                name: "one_to_two".into(),
                preconditions: vec![Fact::new(FdVar(0), 1)],
                effects: vec![Effect { target: Fact::new(FdVar(0), 2), conditions: vec![] }],
                cost: 1,
                sdac: None,
            },
        ];
        let task = Chain { ops };
        let config = SearchConfig::default();
        let mgr = Mgr::build(&task, &config).unwrap();
        let vars = mgr.vars();

        let mut fw_closed = ClosedList::new(vars, false);
        fw_closed.insert(vars, 0, mgr.init_bdd());
        let mid = vars.state_bdd(&[1]);
        fw_closed.insert(vars, 1, &mid);
        fw_closed.insert(vars, 2, mgr.goal_bdd());

        let budget = Budget::new(1_000_000, 5_000);
        let cut = Cut { g: 2, h: 0, cut_bdd: mgr.goal_bdd().clone() };
        let mut plans = Vec::new();
        reconstruct(&mgr, &fw_closed, None, &cut, false, &budget, &mut |plan| {
            plans.push(plan);
            true
        });
        assert_eq!(1, plans.len());
        assert_eq!(vec![OpId(0), OpId(1)], plans[0]);
    }

    #[test]
    fn enumerates_every_same_cost_decomposition() {
        let ops = vec![
            Operator {
                name: "via_one".into(),
                preconditions: vec![Fact::new(FdVar(0), 0)],
                effects: vec![Effect { target: Fact::new(FdVar(0), 2), conditions: vec![] }],
                cost: 2,
                sdac: None,
            },
            Operator {
                name: "via_two".into(),
                preconditions: vec![Fact::new(FdVar(0), 0)],
                effects: vec![Effect { target: Fact::new(FdVar(0), 2), conditions: vec![] }],
                cost: 2,
                sdac: None,
            },
        ];
        let task = Chain { ops };
        let config = SearchConfig::default();
        let mgr = Mgr::build(&task, &config).unwrap();
        let vars = mgr.vars();

        let mut fw_closed = ClosedList::new(vars, false);
        fw_closed.insert(vars, 0, mgr.init_bdd());
        fw_closed.insert(vars, 2, mgr.goal_bdd());

        let budget = Budget::new(1_000_000, 5_000);
        let cut = Cut { g: 2, h: 0, cut_bdd: mgr.goal_bdd().clone() };
        let mut plans = Vec::new();
        reconstruct(&mgr, &fw_closed, None, &cut, false, &budget, &mut |plan| {
            plans.push(plan);
            true
        });
        assert_eq!(2, plans.len());
        assert!(plans.contains(&vec![OpId(0)]));
        assert!(plans.contains(&vec![OpId(1)]));
    }

    #[test]
    fn dedup_drops_repeated_action_sequence() {
        let task = Chain {
            ops: vec![Operator {
                name: "noop_like".into(),
                preconditions: vec![Fact::new(FdVar(0), 0)],
                effects: vec![Effect { target: Fact::new(FdVar(0), 1), conditions: vec![] }],
                cost: 1,
                sdac: None,
            }],
        };
        let config = SearchConfig::default();
        let mgr = Mgr::build(&task, &config).unwrap();
        let vars = mgr.vars();
        let mut fw_closed = ClosedList::new(vars, false);
        fw_closed.insert(vars, 0, mgr.init_bdd());
        let target = vars.state_bdd(&[1]);
        fw_closed.insert(vars, 1, &target);

        let mut registry = SolutionRegistry::new(SearchMode::TopK(5), false);
        registry.register_cut(Cut { g: 1, h: 0, cut_bdd: target.clone() });
        registry.register_cut(Cut { g: 1, h: 0, cut_bdd: target });
        let budget = Budget::new(1_000_000, 5_000);
        registry.drain(&mgr, &fw_closed, None, &budget);
        assert_eq!(1, registry.plans().len());
    }
}
