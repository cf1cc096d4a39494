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

//! Single-direction Uniform-Cost Search (spec §4.6): owns one open list,
//! one frontier, one closed list, and one step estimator, and advances
//! them one budgeted tick at a time against an `Oracle` supplied by the
//! caller (the opposite direction's closed list, or a fixed goal/init
//! BDD in unidirectional mode).

use std::time::Instant;

use biodivine_lib_bdd::Bdd;

use crate::closed_list::{ClosedList, Oracle};
use crate::common::Cost;
use crate::config::{AllotedBounds, MutexType, SearchMode};
use crate::frontier::{ExpandOutcome, Frontier, FrontierStatus};
use crate::mgr::Mgr;
use crate::open_list::OpenList;
use crate::registry::SolutionRegistry;
use crate::step_estimator::{Branch, StepEstimator};

#[derive(Debug, Eq, PartialEq)]
pub enum StepOutcome {
    /// Made progress this tick; call `step` again.
    Progressed,
    /// A stage was truncated by budget; the estimator grew the budget,
    /// retry the same call.
    Truncated,
    /// Open and frontier are both empty: this direction can contribute no
    /// more states.
    Exhausted,
}

pub struct Ucs {
    fw: bool,
    open: OpenList,
    frontier: Frontier,
    closed: ClosedList,
    estimator: StepEstimator,
    initializing: bool,
    exhausted: bool,
}

impl Ucs {
    pub fn new(mgr: &Mgr, fw: bool, step_budget: crate::common::Budget, bounds: AllotedBounds) -> Self {
        let vars = mgr.vars();
        let init = if fw { mgr.init_bdd().clone() } else { mgr.goal_bdd().clone() };
        let has0 = mgr.has_zero_cost_operators();

        let mut closed = ClosedList::new(vars, has0);
        closed.insert(vars, 0, &init);

        let mut frontier = Frontier::new(has0);
        frontier.pop(0, vec![init]);

        Ucs {
            fw,
            open: OpenList::new(),
            frontier,
            closed,
            estimator: StepEstimator::new(step_budget, bounds),
            initializing: true,
            exhausted: false,
        }
    }

    pub fn closed(&self) -> &ClosedList {
        &self.closed
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// `open.min_next_g(frontier, min_action_cost)`: this direction's own
    /// f-lower-bound contribution (spec §4.6, "Bound maintenance").
    pub fn f_bound(&self, mgr: &Mgr) -> Cost {
        self.open.min_next_g(self.frontier.g_value(), mgr.min_action_cost())
    }

    pub fn g_value(&self) -> Cost {
        self.frontier.g_value()
    }

    /// The estimator's node-count prediction for this direction's next
    /// pending branch; used by bidirectional search to pick the cheaper
    /// direction to step.
    pub fn next_step_nodes(&self) -> usize {
        self.estimator.next_step(Branch::Cost, self.frontier.g_value() as usize).output_nodes
    }

    /// Advances this direction by one tick. `mask_not_closed` is true in
    /// single-plan mode (spec §4.6: "additionally mask out
    /// `oracle.not_closed()` before insertion").
    pub fn step(
        &mut self,
        mgr: &Mgr,
        mutex_type: MutexType,
        mode: SearchMode,
        oracle: &dyn Oracle,
        registry: &mut SolutionRegistry,
    ) -> StepOutcome {
        let budget = self.estimator.current_budget();
        let mask_not_closed = !mode.is_top_k_or_q();

        match self.frontier.prepare(mgr, mutex_type, self.fw, self.initializing, &budget) {
            FrontierStatus::Truncated => {
                self.estimator.violated(budget.max_time_ms, budget.max_time_ms, budget.max_nodes);
                return StepOutcome::Truncated;
            }
            FrontierStatus::Ready(bucket) => {
                self.initializing = false;
                let g = self.frontier.g_value();
                for bdd in &bucket {
                    self.closed.insert(mgr.vars(), g, bdd);
                    self.check_cuts(oracle, bdd, g, mode, registry);
                }
            }
        }

        let expand_started = Instant::now();
        match self.frontier.expand(mgr, self.fw, &budget) {
            ExpandOutcome::Truncated => {
                self.estimator.violated(budget.max_time_ms, budget.max_time_ms, budget.max_nodes);
                StepOutcome::Truncated
            }
            ExpandOutcome::ZeroReentry(_) => StepOutcome::Progressed,
            ExpandOutcome::CostBuckets(by_cost) => {
                let mut output_nodes = 0;
                for (c, mut bucket) in by_cost {
                    let g_new = self.frontier.g_value() + c;
                    mgr.merge_bucket_tournament(&mut bucket, &budget);
                    for bdd in bucket {
                        if bdd.is_false() {
                            continue;
                        }
                        output_nodes += bdd.size();
                        self.check_cuts(oracle, &bdd, g_new, mode, registry);
                        let to_insert = if mask_not_closed { bdd.and(&oracle.not_closed(mgr.vars())) } else { bdd };
                        self.open.insert(to_insert, g_new);
                    }
                }
                let elapsed_ms = expand_started.elapsed().as_millis() as f64;
                self.estimator.step_taken(Branch::Cost, self.frontier.g_value() as usize, elapsed_ms, output_nodes);
                StepOutcome::Progressed
            }
            ExpandOutcome::Empty => self.advance_to_next_layer(),
        }
    }

    fn advance_to_next_layer(&mut self) -> StepOutcome {
        match self.open.min_g() {
            Some(g) => {
                let bucket = self.open.pop(g).expect("min_g reports a populated bucket");
                self.frontier.pop(g, bucket);
                StepOutcome::Progressed
            }
            None => {
                self.exhausted = true;
                self.closed.set_exhausted();
                StepOutcome::Exhausted
            }
        }
    }

    fn check_cuts(&self, oracle: &dyn Oracle, bdd: &Bdd, g: Cost, mode: SearchMode, registry: &mut SolutionRegistry) {
        if mode.is_top_k_or_q() {
            let lower_bound = registry.upper_bound();
            for cut in oracle.all_cuts(bdd, g, self.fw, lower_bound) {
                registry.register_cut(cut);
            }
        } else if let Some(cut) = oracle.cheapest_cut(bdd, g, self.fw) {
            registry.register_cut(cut);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closed_list::FixedOracle;
    use crate::common::{Fact, FdVar, OpId};
    use crate::config::SearchConfig;
    use crate::task::{AbstractTask, Effect, MutexGroup, Operator};

    struct OneStep {
        ops: Vec<Operator>,
    }
    impl AbstractTask for OneStep {
        fn num_variables(&self) -> usize {
            1
        }
        fn domain_size(&self, _var: FdVar) -> u32 {
            2
        }
        fn initial_state(&self) -> Vec<u32> {
            vec![0]
        }
        fn goal(&self) -> Vec<Fact> {
            vec![Fact::new(FdVar(0), 1)]
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
    fn single_step_operator_is_found_within_a_few_ticks() {
        let task = OneStep {
            ops: vec![Operator {
                name: "flip".into(),
                preconditions: vec![Fact::new(FdVar(0), 0)],
                effects: vec![Effect { target: Fact::new(FdVar(0), 1), conditions: vec![] }],
                cost: 1,
                sdac: None,
            }],
        };
        let config = SearchConfig::default();
        let mgr = Mgr::build(&task, &config).unwrap();
        let mut ucs = Ucs::new(&mgr, true, config.step_budget(), config.alloted);
        let oracle = FixedOracle { target: mgr.goal_bdd().clone() };
        let mut registry = SolutionRegistry::new(config.mode, config.simple);

        for _ in 0..10 {
            if !registry.plans().is_empty() {
                break;
            }
            let outcome = ucs.step(&mgr, config.mutex_type, config.mode, &oracle, &mut registry);
            let budget = crate::common::Budget::new(1_000_000, 5_000);
            registry.drain(&mgr, ucs.closed(), None, &budget);
            if outcome == StepOutcome::Exhausted {
                break;
            }
        }
        assert_eq!(1, registry.plans().len());
        assert_eq!(vec![OpId(0)], registry.plans()[0]);
    }
}
