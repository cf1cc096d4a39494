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

//! Mutex Sets (spec §4.3): forward and backward invariant BDDs built from
//! the preprocessor's mutex groups, used to filter unreachable states out
//! of the frontier and (under e-deletion) out of transition relations
//! directly.

use fxhash::FxHashMap;

use biodivine_lib_bdd::Bdd;

use crate::common::{BddStep, Budget, Fact};
use crate::config::MutexType;
use crate::dd::{checked, checked_timed};
use crate::task::MutexGroup;
use crate::vars::{Side, Vars};

/// Forward and backward `notMutex`/`exactlyOne` BDDs, plus their per-fact
/// refinements used only by e-deletion.
pub struct MutexSets {
    not_mutex_fw: Vec<Bdd>,
    not_mutex_bw: Vec<Bdd>,
    not_mutex_fw_fact: FxHashMap<Fact, Bdd>,
    not_mutex_bw_fact: FxHashMap<Fact, Bdd>,
    exactly_one_fact: FxHashMap<Fact, Bdd>,
}

impl MutexSets {
    /// Builds from the task's mutex groups, chunking `notMutex` BDDs so
    /// each stays under `budget` (spec: "chunked to keep each BDD under a
    /// configured node size and wall-clock budget"). On overflow, the
    /// current chunk is closed off and a new one started; this degrades
    /// pruning strength gracefully instead of failing setup.
    pub fn build(vars: &Vars, groups: &[MutexGroup], budget: &Budget) -> MutexSets {
        let mut not_mutex_fw = Vec::new();
        let mut not_mutex_bw = Vec::new();
        let mut chunk_fw = vars.mk_true();
        let mut chunk_bw = vars.mk_true();

        let mut not_mutex_fw_fact: FxHashMap<Fact, Bdd> = FxHashMap::default();
        let mut not_mutex_bw_fact: FxHashMap<Fact, Bdd> = FxHashMap::default();
        let mut exactly_one_fact: FxHashMap<Fact, Bdd> = FxHashMap::default();

        for group in groups {
            for i in 0..group.facts.len() {
                for j in (i + 1)..group.facts.len() {
                    let f1 = group.facts[i];
                    let f2 = group.facts[j];
                    let pair_fw = vars
                        .pre_bdd(f1)
                        .and(vars.pre_bdd(f2))
                        .not();
                    let pair_bw = vars
                        .eff_bdd(f1)
                        .and(vars.eff_bdd(f2))
                        .not();

                    match checked_timed(|| chunk_fw.and(&pair_fw), budget) {
                        BddStep::Ready(next) => chunk_fw = next,
                        BddStep::Truncated => {
                            not_mutex_fw.push(std::mem::replace(&mut chunk_fw, vars.mk_true()));
                            chunk_fw = chunk_fw.and(&pair_fw);
                        }
                    }
                    match checked_timed(|| chunk_bw.and(&pair_bw), budget) {
                        BddStep::Ready(next) => chunk_bw = next,
                        BddStep::Truncated => {
                            not_mutex_bw.push(std::mem::replace(&mut chunk_bw, vars.mk_true()));
                            chunk_bw = chunk_bw.and(&pair_bw);
                        }
                    }

                    for (fact, other) in [(f1, f2), (f2, f1)] {
                        let refine_fw = not_mutex_fw_fact
                            .entry(fact)
                            .or_insert_with(|| vars.mk_true());
                        *refine_fw = refine_fw.and(&vars.pre_bdd(other).not());
                        let refine_bw = not_mutex_bw_fact
                            .entry(fact)
                            .or_insert_with(|| vars.mk_true());
                        *refine_bw = refine_bw.and(&vars.eff_bdd(other).not());
                    }
                }
            }

            if group.exactly_one {
                let disjunction = group
                    .facts
                    .iter()
                    .fold(vars.mk_false(), |acc, &f| acc.or(vars.pre_bdd(f)));
                for &f in &group.facts {
                    let entry = exactly_one_fact.entry(f).or_insert_with(|| vars.mk_true());
                    *entry = entry.and(&disjunction);
                }
            }
        }

        not_mutex_fw.push(chunk_fw);
        not_mutex_bw.push(chunk_bw);

        MutexSets {
            not_mutex_fw,
            not_mutex_bw,
            not_mutex_fw_fact,
            not_mutex_bw_fact,
            exactly_one_fact,
        }
    }

    pub fn not_mutex_fw_fact(&self, vars: &Vars, fact: Fact) -> Bdd {
        self.not_mutex_fw_fact
            .get(&fact)
            .cloned()
            .unwrap_or_else(|| vars.mk_true())
    }

    pub fn not_mutex_bw_fact(&self, vars: &Vars, fact: Fact) -> Bdd {
        self.not_mutex_bw_fact
            .get(&fact)
            .cloned()
            .unwrap_or_else(|| vars.mk_true())
    }

    pub fn exactly_one_fact(&self, vars: &Vars, fact: Fact) -> Bdd {
        self.exactly_one_fact
            .get(&fact)
            .cloned()
            .unwrap_or_else(|| vars.mk_true())
    }

    /// `filter_mutex(S, fw, initializing)`: conjoins the relevant dead-end
    /// ("valid values") BDD always, and the `notMutex` chunks when
    /// `initializing` or `mutex_type == And` (spec §4.3 / open question 3:
    /// under `MutexType::None`, only the dead-end BDD applies).
    pub fn filter(
        &self,
        vars: &Vars,
        s: &Bdd,
        fw: bool,
        initializing: bool,
        mutex_type: MutexType,
        budget: &Budget,
    ) -> BddStep<Bdd> {
        let side = if fw { Side::Pre } else { Side::Eff };
        let mut result = match checked(|| s.and(vars.valid_values(side)), budget) {
            BddStep::Ready(r) => r,
            BddStep::Truncated => return BddStep::Truncated,
        };

        let apply_not_mutex = initializing || matches!(mutex_type, MutexType::And | MutexType::Edeletion);
        if apply_not_mutex {
            let chunks = if fw { &self.not_mutex_fw } else { &self.not_mutex_bw };
            for chunk in chunks {
                match checked(|| result.and(chunk), budget) {
                    BddStep::Ready(r) => result = r,
                    BddStep::Truncated => return BddStep::Truncated,
                }
            }
        }
        BddStep::Ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::FdVar;
    use crate::task::{AbstractTask, Operator};

    struct Dummy;
    impl AbstractTask for Dummy {
        fn num_variables(&self) -> usize {
            2
        }
        fn domain_size(&self, _var: FdVar) -> u32 {
            2
        }
        fn initial_state(&self) -> Vec<u32> {
            vec![0, 0]
        }
        fn goal(&self) -> Vec<Fact> {
            vec![]
        }
        fn num_operators(&self) -> usize {
            0
        }
        fn operator(&self, _id: crate::common::OpId) -> &Operator {
            unimplemented!()
        }
        fn mutex_groups(&self) -> &[MutexGroup] {
            &[]
        }
    }

    #[test]
    fn mutex_pair_excludes_joint_state() {
        let vars = Vars::build(&Dummy, vec![0, 1]);
        let groups = vec![MutexGroup {
            facts: vec![Fact::new(FdVar(0), 1), Fact::new(FdVar(1), 1)],
            exactly_one: false,
            detected_forward: true,
        }];
        let budget = Budget::new(1_000_000, 5_000);
        let mutex = MutexSets::build(&vars, &groups, &budget);

        let both = vars
            .pre_bdd(Fact::new(FdVar(0), 1))
            .and(vars.pre_bdd(Fact::new(FdVar(1), 1)));
        let filtered = mutex.filter(&vars, &both, true, true, MutexType::And, &budget);
        match filtered {
            BddStep::Ready(bdd) => assert!(bdd.is_false()),
            BddStep::Truncated => panic!("unexpected truncation"),
        }
    }

    #[test]
    fn mutex_type_none_does_not_filter_pairs() {
        let vars = Vars::build(&Dummy, vec![0, 1]);
        let groups = vec![MutexGroup {
            facts: vec![Fact::new(FdVar(0), 1), Fact::new(FdVar(1), 1)],
            exactly_one: false,
            detected_forward: true,
        }];
        let budget = Budget::new(1_000_000, 5_000);
        let mutex = MutexSets::build(&vars, &groups, &budget);

        let both = vars
            .pre_bdd(Fact::new(FdVar(0), 1))
            .and(vars.pre_bdd(Fact::new(FdVar(1), 1)));
        let filtered = mutex.filter(&vars, &both, true, false, MutexType::None, &budget);
        match filtered {
            BddStep::Ready(bdd) => assert_eq!(both, bdd),
            BddStep::Truncated => panic!("unexpected truncation"),
        }
    }
}
