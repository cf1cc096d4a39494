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

//! Variable Encoding (spec §4.1). Allocates two interleaved copies (`pre`,
//! `eff`) of a binary encoding for every finite-domain variable, and builds
//! and caches the BDDs every other module is expressed in terms of.

use fxhash::FxHashMap;

use biodivine_lib_bdd::{Bdd, BddVariable, BddVariableSet};

use crate::common::{Fact, FdVar};
use crate::dd::build_variable_set;
use crate::task::AbstractTask;

fn bits_for_domain(domain_size: u32) -> u32 {
    if domain_size <= 1 {
        0
    } else {
        (32 - (domain_size - 1).leading_zeros()).max(1)
    }
}

/// Which side of a transition a BDD is defined over. `swap_pre_eff`
/// re-expresses a BDD defined purely on one side in terms of the other
/// (see the relational-composition note on [`Vars::swap_pre_eff`]).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Side {
    Pre,
    Eff,
}

/// Owns the BDD variable universe and every per-fact / per-variable BDD
/// built from it. Built once from the task and shared, read-only, by both
/// search directions (spec §5, "the `Vars` object is read-only after
/// construction").
pub struct Vars {
    universe: BddVariableSet,
    order: Vec<usize>,
    domain_size: Vec<u32>,
    pre_bits: Vec<Vec<BddVariable>>,
    eff_bits: Vec<Vec<BddVariable>>,
    pre_fact: FxHashMap<Fact, Bdd>,
    eff_fact: FxHashMap<Fact, Bdd>,
    biimp: Vec<Bdd>,
    biimp_all: Bdd,
    all_pre: Vec<BddVariable>,
    all_eff: Vec<BddVariable>,
    valid_values_pre: Bdd,
    valid_values_eff: Bdd,
}

impl Vars {
    /// Builds the encoding for `task`, using `order` as the permutation of
    /// finite-domain variables (an identity order, or the output of the
    /// Gamer-style optimizer in [`crate::ordering`]).
    pub fn build(task: &dyn AbstractTask, order: Vec<usize>) -> Vars {
        let n = task.num_variables();
        debug_assert_eq!(order.len(), n);

        let domain_size: Vec<u32> = (0..n)
            .map(|v| task.domain_size(crate::common::FdVar(v)))
            .collect();

        // Allocate names in `order`, interleaving pre/eff per variable so
        // that transition BDDs stay small (spec §3 "Variable Encoding").
        let mut names = Vec::new();
        let mut pre_slot: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut eff_slot: Vec<Vec<usize>> = vec![Vec::new(); n];
        for &v in &order {
            let bits = bits_for_domain(domain_size[v]);
            for b in 0..bits {
                names.push(format!("pre.v{v}.b{b}"));
                pre_slot[v].push(names.len() - 1);
                names.push(format!("eff.v{v}.b{b}"));
                eff_slot[v].push(names.len() - 1);
            }
        }
        let (universe, handles) = build_variable_set(&names);

        let pre_bits: Vec<Vec<BddVariable>> = pre_slot
            .iter()
            .map(|idxs| idxs.iter().map(|&i| handles[i]).collect())
            .collect();
        let eff_bits: Vec<Vec<BddVariable>> = eff_slot
            .iter()
            .map(|idxs| idxs.iter().map(|&i| handles[i]).collect())
            .collect();

        let all_pre: Vec<BddVariable> = pre_bits.iter().flatten().copied().collect();
        let all_eff: Vec<BddVariable> = eff_bits.iter().flatten().copied().collect();

        let mut pre_fact = FxHashMap::default();
        let mut eff_fact = FxHashMap::default();
        let mut biimp = Vec::with_capacity(n);
        let mut valid_values_pre = universe.mk_true();
        let mut valid_values_eff = universe.mk_true();
        let mut biimp_all = universe.mk_true();

        for v in 0..n {
            let bits = pre_bits[v].len();
            let mut var_biimp = universe.mk_true();
            for b in 0..bits {
                let bit_biimp = var_biimp_bit(&universe, pre_bits[v][b], eff_bits[v][b]);
                var_biimp = var_biimp.and(&bit_biimp);
                biimp_all = biimp_all.and(&bit_biimp);
            }
            biimp.push(var_biimp);

            let mut disjunct_pre = universe.mk_false();
            let mut disjunct_eff = universe.mk_false();
            for value in 0..domain_size[v] {
                let pre_bdd = encode_value(&universe, &pre_bits[v], value);
                let eff_bdd = encode_value(&universe, &eff_bits[v], value);
                disjunct_pre = disjunct_pre.or(&pre_bdd);
                disjunct_eff = disjunct_eff.or(&eff_bdd);
                pre_fact.insert(Fact::new(crate::common::FdVar(v), value), pre_bdd);
                eff_fact.insert(Fact::new(crate::common::FdVar(v), value), eff_bdd);
            }
            valid_values_pre = valid_values_pre.and(&disjunct_pre);
            valid_values_eff = valid_values_eff.and(&disjunct_eff);
        }

        Vars {
            universe,
            order,
            domain_size,
            pre_bits,
            eff_bits,
            pre_fact,
            eff_fact,
            biimp,
            biimp_all,
            all_pre,
            all_eff,
            valid_values_pre,
            valid_values_eff,
        }
    }

    pub fn num_variables(&self) -> usize {
        self.domain_size.len()
    }

    pub fn domain_size(&self, var: crate::common::FdVar) -> u32 {
        self.domain_size[var.id()]
    }

    pub fn variable_order(&self) -> &[usize] {
        &self.order
    }

    /// Flattened pre bits of `vars`, in the order given. Used to build a
    /// `TransitionRelation`'s own `exist_vars` cube (spec §3), restricted
    /// to the operator's touched variables rather than every task variable.
    pub fn pre_bits_for(&self, vars: &[FdVar]) -> Vec<BddVariable> {
        vars.iter().flat_map(|v| self.pre_bits[v.id()].iter().copied()).collect()
    }

    /// Flattened eff bits of `vars`, the `exists_bw_vars` counterpart of
    /// [`Vars::pre_bits_for`].
    pub fn eff_bits_for(&self, vars: &[FdVar]) -> Vec<BddVariable> {
        vars.iter().flat_map(|v| self.eff_bits[v.id()].iter().copied()).collect()
    }

    /// `pre_bdd(var, value)`: the pre copy of `var` equals `value`.
    pub fn pre_bdd(&self, fact: Fact) -> &Bdd {
        self.pre_fact
            .get(&fact)
            .expect("fact references an out-of-domain value")
    }

    /// `eff_bdd(var, value)`: the eff copy of `var` equals `value`.
    pub fn eff_bdd(&self, fact: Fact) -> &Bdd {
        self.eff_fact
            .get(&fact)
            .expect("fact references an out-of-domain value")
    }

    /// `biimp(var)`: `pre(var) = eff(var)`, the frame axiom conjoined for
    /// variables an operator's effects do not touch.
    pub fn biimp(&self, var: crate::common::FdVar) -> &Bdd {
        &self.biimp[var.id()]
    }

    /// Conjunction of `pre_bdd` over a complete assignment, indexed by
    /// `FdVar::id()`.
    pub fn state_bdd(&self, assignment: &[u32]) -> Bdd {
        debug_assert_eq!(assignment.len(), self.num_variables());
        let mut bdd = self.universe.mk_true();
        for (v, &value) in assignment.iter().enumerate() {
            bdd = bdd.and(self.pre_bdd(Fact::new(crate::common::FdVar(v), value)));
        }
        bdd
    }

    /// Conjunction of `pre_bdd` over a partial assignment (e.g. a goal).
    pub fn partial_state_bdd(&self, facts: &[Fact]) -> Bdd {
        let mut bdd = self.universe.mk_true();
        for &f in facts {
            bdd = bdd.and(self.pre_bdd(f));
        }
        bdd
    }

    /// The "valid values" dead-end BDD: excludes binary codes left unused
    /// when `domain(var) < 2^bits(var)` (spec §4.1 invariants).
    pub fn valid_values(&self, side: Side) -> &Bdd {
        match side {
            Side::Pre => &self.valid_values_pre,
            Side::Eff => &self.valid_values_eff,
        }
    }

    pub fn mk_true(&self) -> Bdd {
        self.universe.mk_true()
    }

    pub fn mk_false(&self) -> Bdd {
        self.universe.mk_false()
    }

    /// Renames a BDD defined purely on one side (all-pre or all-eff) to
    /// the other side. Implemented via the relational-composition identity
    /// `swap(S) = exists(side_vars, S ∧ biimp_all(pre, eff))`, since the
    /// external BDD package's `SwapVariables` primitive is not exposed by
    /// this crate's choice of BDD package (recorded as a design decision:
    /// see `DESIGN.md`). `image`/`preimage` only ever call this on
    /// single-sided inputs (never a BDD that already mixes pre and eff
    /// variables freely), which is exactly what makes the identity exact
    /// rather than merely an over-approximation.
    pub fn swap_pre_eff(&self, bdd: &Bdd, from: Side) -> Bdd {
        let conjoined = bdd.and(&self.biimp_all);
        match from {
            Side::Pre => conjoined.exists(&self.all_pre),
            Side::Eff => conjoined.exists(&self.all_eff),
        }
    }

    /// Same identity as [`Vars::swap_pre_eff`], restricted to a given pair
    /// of parallel pre/eff bit lists instead of every task variable. This
    /// is what a `TransitionRelation` uses for `image`/`preimage`: only the
    /// operator's own touched variables (`exist_vars`/`exists_bw_vars`) may
    /// be renamed, so variables the operator doesn't mention are neither
    /// conjoined with a biimplication nor quantified, and their value in
    /// `bdd` survives untouched (the frame axiom spec §3's "Invariant on TR
    /// construction" requires, without needing one baked into `tr_bdd`
    /// itself for every untouched variable at construction time).
    pub fn swap_subset(&self, bdd: &Bdd, from: Side, pre_bits: &[BddVariable], eff_bits: &[BddVariable]) -> Bdd {
        debug_assert_eq!(pre_bits.len(), eff_bits.len());
        let mut biimp = self.universe.mk_true();
        for (&pre, &eff) in pre_bits.iter().zip(eff_bits) {
            biimp = biimp.and(&var_biimp_bit(&self.universe, pre, eff));
        }
        let conjoined = bdd.and(&biimp);
        match from {
            Side::Pre => conjoined.exists(pre_bits),
            Side::Eff => conjoined.exists(eff_bits),
        }
    }
}

fn var_biimp_bit(universe: &BddVariableSet, pre: BddVariable, eff: BddVariable) -> Bdd {
    universe
        .mk_literal(pre, true)
        .iff(&universe.mk_literal(eff, true))
}

fn encode_value(universe: &BddVariableSet, bits: &[BddVariable], value: u32) -> Bdd {
    let mut bdd = universe.mk_true();
    for (i, &bit) in bits.iter().enumerate() {
        let set = (value >> i) & 1 == 1;
        bdd = bdd.and(&universe.mk_literal(bit, set));
    }
    bdd
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::FdVar;
    use crate::task::{AbstractTask, MutexGroup, Operator};

    struct TwoBool;
    impl AbstractTask for TwoBool {
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
            vec![Fact::new(FdVar(0), 1), Fact::new(FdVar(1), 1)]
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
    fn distinct_values_are_mutually_exclusive() {
        let vars = Vars::build(&TwoBool, vec![0, 1]);
        let a = vars.pre_bdd(Fact::new(FdVar(0), 0));
        let b = vars.pre_bdd(Fact::new(FdVar(0), 1));
        assert!(a.and(b).is_false());
    }

    #[test]
    fn state_bdd_matches_conjunction_of_facts() {
        let vars = Vars::build(&TwoBool, vec![0, 1]);
        let s = vars.state_bdd(&[0, 1]);
        let expected = vars
            .pre_bdd(Fact::new(FdVar(0), 0))
            .and(vars.pre_bdd(Fact::new(FdVar(1), 1)));
        assert_eq!(expected, s);
    }

    #[test]
    fn swap_pre_eff_is_involutive_on_state_sets() {
        let vars = Vars::build(&TwoBool, vec![0, 1]);
        let s = vars.state_bdd(&[0, 1]);
        let swapped = vars.swap_pre_eff(&s, Side::Pre);
        let back = vars.swap_pre_eff(&swapped, Side::Eff);
        assert_eq!(s, back);
    }

    #[test]
    fn biimp_holds_exactly_when_pre_equals_eff() {
        let vars = Vars::build(&TwoBool, vec![0, 1]);
        let frame = vars.biimp(FdVar(0));
        let pre0 = vars.pre_bdd(Fact::new(FdVar(0), 0));
        let eff1 = vars.eff_bdd(Fact::new(FdVar(0), 1));
        assert!(frame.and(pre0).and(eff1).is_false());
    }

    #[test]
    fn swap_subset_leaves_untouched_variables_alone() {
        let vars = Vars::build(&TwoBool, vec![0, 1]);
        let s = vars.state_bdd(&[0, 1]);
        let pre0 = vars.pre_bits_for(&[FdVar(0)]);
        let eff0 = vars.eff_bits_for(&[FdVar(0)]);
        let swapped = vars.swap_subset(&s, Side::Pre, &pre0, &eff0);
        // v0 moves to eff-representation, v1 (not in the subset) stays pre.
        let expected = vars.eff_bdd(Fact::new(FdVar(0), 0)).and(vars.pre_bdd(Fact::new(FdVar(1), 1)));
        assert_eq!(expected, swapped);
    }
}
