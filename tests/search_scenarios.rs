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

//! End-to-end scenarios (spec.md §8).

use std::collections::HashSet;

use symplan::{
    AbstractTask, Completion, Direction, Effect, Engine, Fact, FdVar, Mgr, MutexGroup, OpId,
    Operator, SearchConfig, SearchConfigBuilder, SearchMode,
};

struct Task {
    num_vars: usize,
    domains: Vec<u32>,
    initial: Vec<u32>,
    goal: Vec<Fact>,
    ops: Vec<Operator>,
}
impl AbstractTask for Task {
    fn num_variables(&self) -> usize {
        self.num_vars
    }
    fn domain_size(&self, var: FdVar) -> u32 {
        self.domains[var.id()]
    }
    fn initial_state(&self) -> Vec<u32> {
        self.initial.clone()
    }
    fn goal(&self) -> Vec<Fact> {
        self.goal.clone()
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

fn op(name: &str, pre: Vec<Fact>, effects: Vec<Effect>, cost: u64) -> Operator {
    Operator { name: name.into(), preconditions: pre, effects, cost, sdac: None }
}

fn unconditional(target: Fact) -> Effect {
    Effect { target, conditions: vec![] }
}

#[test]
fn s1_trivial_single_operator_is_optimal() {
    let task = Task {
        num_vars: 1,
        domains: vec![2],
        initial: vec![0],
        goal: vec![Fact::new(FdVar(0), 1)],
        ops: vec![op(
            "flip",
            vec![Fact::new(FdVar(0), 0)],
            vec![unconditional(Fact::new(FdVar(0), 1))],
            7,
        )],
    };

    let config = SearchConfig::default();
    let mgr = Mgr::build(&task, &config).unwrap();
    let mut engine = Engine::new(mgr, config);

    match engine.run(200) {
        Completion::Solved { is_exact, cost } => {
            assert!(is_exact);
            assert_eq!(7, cost);
        }
        other => panic!("expected a solved verdict, got {other:?}"),
    }
    assert_eq!(1, engine.registry().plans().len());
    assert_eq!(vec![OpId(0)], engine.registry().plans()[0]);
}

#[test]
fn s2_zero_cost_step_is_folded_into_the_cheapest_plan() {
    let task = Task {
        num_vars: 2,
        domains: vec![2, 2],
        initial: vec![0, 0],
        goal: vec![Fact::new(FdVar(0), 1), Fact::new(FdVar(1), 1)],
        ops: vec![
            op(
                "a",
                vec![Fact::new(FdVar(0), 0)],
                vec![unconditional(Fact::new(FdVar(0), 1))],
                3,
            ),
            op(
                "z",
                vec![Fact::new(FdVar(0), 1), Fact::new(FdVar(1), 0)],
                vec![unconditional(Fact::new(FdVar(1), 1))],
                0,
            ),
        ],
    };

    let config = SearchConfig::default();
    let mgr = Mgr::build(&task, &config).unwrap();
    let mut engine = Engine::new(mgr, config);

    match engine.run(200) {
        Completion::Solved { is_exact, cost } => {
            assert!(is_exact);
            assert_eq!(3, cost);
        }
        other => panic!("expected a solved verdict, got {other:?}"),
    }
    assert_eq!(1, engine.registry().plans().len());
    assert_eq!(vec![OpId(0), OpId(1)], engine.registry().plans()[0]);
}

#[test]
fn s2_top_k_two_yields_a_single_plan() {
    let task = Task {
        num_vars: 2,
        domains: vec![2, 2],
        initial: vec![0, 0],
        goal: vec![Fact::new(FdVar(0), 1), Fact::new(FdVar(1), 1)],
        ops: vec![
            op(
                "a",
                vec![Fact::new(FdVar(0), 0)],
                vec![unconditional(Fact::new(FdVar(0), 1))],
                3,
            ),
            op(
                "z",
                vec![Fact::new(FdVar(0), 1), Fact::new(FdVar(1), 0)],
                vec![unconditional(Fact::new(FdVar(1), 1))],
                0,
            ),
        ],
    };

    let config = SearchConfigBuilder::default().mode(SearchMode::TopK(2)).build().unwrap();
    let mgr = Mgr::build(&task, &config).unwrap();
    let mut engine = Engine::new(mgr, config);

    engine.run(200);
    assert_eq!(1, engine.registry().plans().len());
    assert_eq!(vec![OpId(0), OpId(1)], engine.registry().plans()[0]);
}

#[test]
fn s3_simple_top_3_finds_the_single_loopless_plan() {
    let task = Task {
        num_vars: 1,
        domains: vec![4],
        initial: vec![0],
        goal: vec![Fact::new(FdVar(0), 3)],
        ops: vec![
            op("o0", vec![Fact::new(FdVar(0), 0)], vec![unconditional(Fact::new(FdVar(0), 1))], 1),
            op("o1", vec![Fact::new(FdVar(0), 1)], vec![unconditional(Fact::new(FdVar(0), 2))], 1),
            op("o2", vec![Fact::new(FdVar(0), 2)], vec![unconditional(Fact::new(FdVar(0), 3))], 1),
            op("loop", vec![Fact::new(FdVar(0), 0)], vec![unconditional(Fact::new(FdVar(0), 0))], 1),
        ],
    };

    let config = SearchConfigBuilder::default()
        .mode(SearchMode::TopK(3))
        .simple(true)
        .build()
        .unwrap();
    let mgr = Mgr::build(&task, &config).unwrap();
    let mut engine = Engine::new(mgr, config);

    engine.run(300);
    assert_eq!(1, engine.registry().plans().len());
    assert_eq!(vec![OpId(0), OpId(1), OpId(2)], engine.registry().plans()[0]);
}

#[test]
fn s3_top_5_plan_costs_are_non_decreasing() {
    let task = Task {
        num_vars: 1,
        domains: vec![4],
        initial: vec![0],
        goal: vec![Fact::new(FdVar(0), 3)],
        ops: vec![
            op("o0", vec![Fact::new(FdVar(0), 0)], vec![unconditional(Fact::new(FdVar(0), 1))], 1),
            op("o1", vec![Fact::new(FdVar(0), 1)], vec![unconditional(Fact::new(FdVar(0), 2))], 1),
            op("o2", vec![Fact::new(FdVar(0), 2)], vec![unconditional(Fact::new(FdVar(0), 3))], 1),
            op("loop", vec![Fact::new(FdVar(0), 0)], vec![unconditional(Fact::new(FdVar(0), 0))], 1),
        ],
    };

    let config = SearchConfigBuilder::default()
        .mode(SearchMode::TopK(5))
        .simple(false)
        .build()
        .unwrap();
    let mgr = Mgr::build(&task, &config).unwrap();
    let mut engine = Engine::new(mgr, config);

    engine.run(500);
    let costs: Vec<u64> = engine
        .registry()
        .plans()
        .iter()
        .map(|plan| {
            plan.iter()
                .map(|opid| task.operator(*opid).cost)
                .sum()
        })
        .collect();
    assert!(!costs.is_empty());
    let mut sorted = costs.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, costs, "emitted plan costs must be non-decreasing");
}

#[test]
fn s4_bidirectional_search_meets_in_the_middle() {
    let task = Task {
        num_vars: 2,
        domains: vec![2, 2],
        initial: vec![0, 0],
        goal: vec![Fact::new(FdVar(0), 1), Fact::new(FdVar(1), 1)],
        ops: vec![
            op(
                "f0",
                vec![Fact::new(FdVar(0), 0)],
                vec![unconditional(Fact::new(FdVar(0), 1))],
                5,
            ),
            op(
                "f1",
                vec![Fact::new(FdVar(1), 0)],
                vec![unconditional(Fact::new(FdVar(1), 1))],
                5,
            ),
        ],
    };

    let config = SearchConfig::default();
    assert_eq!(Direction::Bidirectional, config.direction);
    let mgr = Mgr::build(&task, &config).unwrap();
    let mut engine = Engine::new(mgr, config);

    match engine.run(200) {
        Completion::Solved { is_exact, cost } => {
            assert!(is_exact);
            assert_eq!(10, cost);
        }
        other => panic!("expected a solved verdict, got {other:?}"),
    }
    let plan = &engine.registry().plans()[0];
    let used: HashSet<OpId> = plan.iter().copied().collect();
    assert_eq!(2, plan.len());
    assert_eq!(HashSet::from([OpId(0), OpId(1)]), used);
}

#[test]
fn s6_no_operators_is_proven_unsolvable() {
    let task = Task {
        num_vars: 1,
        domains: vec![2],
        initial: vec![0],
        goal: vec![Fact::new(FdVar(0), 1)],
        ops: vec![],
    };

    let config = SearchConfig::default();
    let mgr = Mgr::build(&task, &config).unwrap();
    let mut engine = Engine::new(mgr, config);

    match engine.run(50) {
        Completion::Unsolvable => {}
        other => panic!("expected Unsolvable, got {other:?}"),
    }
    assert!(engine.registry().plans().is_empty());
}
