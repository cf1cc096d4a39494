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

//! Closed List (spec §4.4): the per-direction archive of expanded g-layers,
//! doubling as the `Oracle` the opposite search direction queries for
//! frontier cuts (spec §9, "Polymorphism over capabilities").

use std::collections::BTreeMap;

use biodivine_lib_bdd::Bdd;

use crate::common::{Cost, Cut};
use crate::vars::Vars;

/// `cheapest_cut`/`all_cuts`/`not_closed`/`h_not_closed`/`exhausted`: the
/// capability the opposite direction's closed list offers as a read-only
/// oracle, or that a fixed-goal trivial oracle offers in unidirectional
/// mode.
pub trait Oracle {
    fn cheapest_cut(&self, s: &Bdd, g: Cost, fw: bool) -> Option<Cut>;
    fn all_cuts(&self, s: &Bdd, g: Cost, fw: bool, lower_bound: Cost) -> Vec<Cut>;
    fn not_closed(&self, vars: &Vars) -> Bdd;
    fn h_not_closed(&self) -> Cost;
    fn exhausted(&self) -> bool;
}

pub struct ClosedList {
    has0: bool,
    closed: BTreeMap<Cost, Bdd>,
    zero_cost_closed: BTreeMap<Cost, Vec<Bdd>>,
    closed_total: Bdd,
    h_not_closed: Cost,
    exhausted: bool,
}

impl ClosedList {
    pub fn new(vars: &Vars, has0: bool) -> Self {
        ClosedList {
            has0,
            closed: BTreeMap::new(),
            zero_cost_closed: BTreeMap::new(),
            closed_total: vars.mk_false(),
            h_not_closed: 0,
            exhausted: false,
        }
    }

    /// `insert(g, S)`: adds `S` to `closed[g]`, unions into `closedTotal`,
    /// and (if `HAS0`) appends to `zeroCostClosed[g]`'s layering.
    pub fn insert(&mut self, vars: &Vars, g: Cost, s: &Bdd) {
        let entry = self.closed.entry(g).or_insert_with(|| vars.mk_false());
        *entry = entry.or(s);
        self.closed_total = self.closed_total.or(s);
        if self.has0 {
            self.zero_cost_closed.entry(g).or_default().push(s.clone());
        }
    }

    pub fn closed_at(&self, g: Cost) -> Option<&Bdd> {
        self.closed.get(&g)
    }

    pub fn closed_total(&self) -> &Bdd {
        &self.closed_total
    }

    /// The zero-cost closure layers recorded at `g`, in the order they
    /// were produced; used by plan reconstruction to walk zig-zagging
    /// zero-cost steps (spec §4.8).
    pub fn zero_cost_layers(&self, g: Cost) -> &[Bdd] {
        self.zero_cost_closed.get(&g).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Monotone raise of the lower bound for un-expanded states; used by
    /// the opposite search's f-bound.
    pub fn set_h_not_closed(&mut self, h: Cost) {
        if h > self.h_not_closed {
            self.h_not_closed = h;
        }
    }

    pub fn set_exhausted(&mut self) {
        self.exhausted = true;
    }

    /// A cut at exactly `(s, g)`: `s ∩ closed[h]` for every recorded `h`,
    /// non-empty, cheapest `h` first. `fw` names which direction `s`/`g`
    /// belong to (the *other* direction, since this closed list is itself
    /// the oracle of the opposite search); kept for symmetry with the
    /// `Oracle` trait even though a closed list's own cuts don't need it.
    fn cuts_against(&self, s: &Bdd, g: Cost, lower_bound: Option<Cost>) -> Vec<Cut> {
        let mut cuts = Vec::new();
        for (&h, bdd) in &self.closed {
            if let Some(lb) = lower_bound {
                if h < lb.saturating_sub(g) {
                    continue;
                }
            }
            let cut_bdd = s.and(bdd);
            if !cut_bdd.is_false() {
                cuts.push(Cut { g, h, cut_bdd });
            }
        }
        cuts.sort_by_key(|c| c.h);
        cuts
    }
}

impl Oracle for ClosedList {
    fn cheapest_cut(&self, s: &Bdd, g: Cost, _fw: bool) -> Option<Cut> {
        self.cuts_against(s, g, None).into_iter().next()
    }

    fn all_cuts(&self, s: &Bdd, g: Cost, _fw: bool, lower_bound: Cost) -> Vec<Cut> {
        self.cuts_against(s, g, Some(lower_bound))
    }

    fn not_closed(&self, vars: &Vars) -> Bdd {
        vars.mk_true().and_not(&self.closed_total)
    }

    fn h_not_closed(&self) -> Cost {
        self.h_not_closed
    }

    fn exhausted(&self) -> bool {
        self.exhausted
    }
}

/// A trivial oracle for unidirectional search: the fixed goal (forward) or
/// initial-state (backward) BDD stands in for "the opposite closed list".
pub struct FixedOracle {
    pub target: Bdd,
}
impl Oracle for FixedOracle {
    fn cheapest_cut(&self, s: &Bdd, g: Cost, _fw: bool) -> Option<Cut> {
        let cut_bdd = s.and(&self.target);
        if cut_bdd.is_false() {
            None
        } else {
            Some(Cut { g, h: 0, cut_bdd })
        }
    }

    fn all_cuts(&self, s: &Bdd, g: Cost, fw: bool, _lower_bound: Cost) -> Vec<Cut> {
        self.cheapest_cut(s, g, fw).into_iter().collect()
    }

    fn not_closed(&self, vars: &Vars) -> Bdd {
        vars.mk_true()
    }

    fn h_not_closed(&self) -> Cost {
        0
    }

    fn exhausted(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::FdVar;
    use crate::task::{AbstractTask, MutexGroup, Operator};

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
        fn goal(&self) -> Vec<crate::common::Fact> {
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
    fn insert_then_closed_total_contains_state() {
        let vars = Vars::build(&Toy, vec![0]);
        let mut closed = ClosedList::new(&vars, false);
        let s = vars.state_bdd(&[1]);
        closed.insert(&vars, 3, &s);
        assert_eq!(&s, closed.closed_at(3).unwrap());
        assert!(!closed.closed_total().and(&s).is_false());
    }

    #[test]
    fn cheapest_cut_picks_lowest_h() {
        let vars = Vars::build(&Toy, vec![0]);
        let mut closed = ClosedList::new(&vars, false);
        let s = vars.state_bdd(&[1]);
        closed.insert(&vars, 2, &s);
        closed.insert(&vars, 5, &s);
        let cut = closed.cheapest_cut(&s, 0, true).unwrap();
        assert_eq!(2, cut.h);
    }

    #[test]
    fn set_h_not_closed_is_monotone() {
        let vars = Vars::build(&Toy, vec![0]);
        let mut closed = ClosedList::new(&vars, false);
        closed.set_h_not_closed(5);
        closed.set_h_not_closed(2);
        assert_eq!(5, closed.h_not_closed());
        closed.set_h_not_closed(9);
        assert_eq!(9, closed.h_not_closed());
    }
}
