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

//! The grounded-task capability the engine consumes. Parsing, grounding,
//! mutex-group computation and SDAC/axiom compilation all happen upstream;
//! this module only defines the interface boundary (spec §6).

use crate::common::{Cost, Fact, FdVar, OpId};

/// One effect of an operator: assigns `target` when `conditions` all hold
/// in the pre-state (an empty `conditions` is an unconditional effect).
#[derive(Clone, Debug)]
pub struct Effect {
    pub target: Fact,
    pub conditions: Vec<Fact>,
}

/// One grounded cost case of a state-dependent action cost (SDAC)
/// operator: `cost` applies when every fact in `guard` holds in the
/// pre-state, in addition to the operator's own preconditions.
#[derive(Clone, Debug)]
pub struct SdacCase {
    pub guard: Vec<Fact>,
    pub cost: Cost,
}

/// One grounded operator.
#[derive(Clone, Debug)]
pub struct Operator {
    pub name: String,
    pub preconditions: Vec<Fact>,
    pub effects: Vec<Effect>,
    pub cost: Cost,
    /// `Some` when the operator's cost depends on the state; the grounded
    /// cost cases are assumed mutually exclusive and jointly exhaustive
    /// over the operator's applicable states, with `cost` above used as a
    /// fallback for any uncovered state.
    pub sdac: Option<Vec<SdacCase>>,
}
impl Operator {
    pub fn has_conditional_effects(&self) -> bool {
        self.effects.iter().any(|e| !e.conditions.is_empty())
    }

    pub fn affected_variables(&self) -> Vec<FdVar> {
        let mut vars: Vec<FdVar> = self.effects.iter().map(|e| e.target.var).collect();
        vars.sort_by_key(|v| v.id());
        vars.dedup();
        vars
    }
}

/// A mutex group: a set of facts, at most one of which (or exactly one, if
/// `exactly_one`) can hold in any reachable state.
#[derive(Clone, Debug)]
pub struct MutexGroup {
    pub facts: Vec<Fact>,
    pub exactly_one: bool,
    pub detected_forward: bool,
}

/// The grounded planning task, as handed to the engine by an external
/// parser/grounder. Every accessor is expected to be cheap (O(1) or a slice
/// index); no accessor is expected to allocate on each call in a hot loop,
/// though the trait does not enforce this.
pub trait AbstractTask {
    fn num_variables(&self) -> usize;
    fn domain_size(&self, var: FdVar) -> u32;
    fn fact_name(&self, fact: Fact) -> String {
        format!("var{}={}", fact.var.id(), fact.value)
    }

    /// A complete assignment, indexed by `FdVar::id()`.
    fn initial_state(&self) -> Vec<u32>;
    /// A partial assignment: the task is solved once every listed fact
    /// holds simultaneously.
    fn goal(&self) -> Vec<Fact>;

    fn num_operators(&self) -> usize;
    fn operator(&self, id: OpId) -> &Operator;

    fn mutex_groups(&self) -> &[MutexGroup];
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Toy;
    impl AbstractTask for Toy {
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
            1
        }
        fn operator(&self, _id: OpId) -> &Operator {
            unimplemented!()
        }
        fn mutex_groups(&self) -> &[MutexGroup] {
            &[]
        }
    }

    #[test]
    fn default_fact_name_is_readable() {
        let t = Toy;
        assert_eq!("var0=1", t.fact_name(Fact::new(FdVar(0), 1)));
    }

    #[test]
    fn affected_variables_are_sorted_and_deduped() {
        let op = Operator {
            name: "op".into(),
            preconditions: vec![],
            effects: vec![
                Effect { target: Fact::new(FdVar(2), 0), conditions: vec![] },
                Effect { target: Fact::new(FdVar(0), 1), conditions: vec![] },
                Effect { target: Fact::new(FdVar(2), 1), conditions: vec![Fact::new(FdVar(0), 0)] },
            ],
            cost: 1,
            sdac: None,
        };
        assert_eq!(vec![FdVar(0), FdVar(2)], op.affected_variables());
        assert!(op.has_conditional_effects());
    }
}
