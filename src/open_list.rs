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

//! Open List (spec §4.4): a mapping from integer g-cost to a disjunctive
//! bucket of BDDs, ordered by g.

use std::collections::BTreeMap;

use biodivine_lib_bdd::Bdd;

use crate::common::{Cost, INFINITY};

/// A disjunctively represented set of states: kept as a vector rather than
/// eagerly OR'd together, to control intermediate node blow-up (spec
/// glossary, "Bucket").
pub type Bucket = Vec<Bdd>;

#[derive(Default)]
pub struct OpenList {
    buckets: BTreeMap<Cost, Bucket>,
}

impl OpenList {
    pub fn new() -> Self {
        OpenList { buckets: BTreeMap::new() }
    }

    /// Appends `bdd` to bucket `g`. Maintains the "no bucket value is
    /// empty" invariant by never inserting an empty vector and dropping a
    /// bucket key if it would otherwise end up empty (it never does here,
    /// since we only ever append).
    pub fn insert(&mut self, bdd: Bdd, g: Cost) {
        if bdd.is_false() {
            return;
        }
        self.buckets.entry(g).or_default().push(bdd);
    }

    /// The lowest non-empty bucket's key, or `None` if open is empty.
    pub fn min_g(&self) -> Option<Cost> {
        self.buckets.keys().next().copied()
    }

    /// `min(open.min_g, frontier.g + min_action_cost)`, or `INFINITY` if
    /// both are exhausted.
    pub fn min_next_g(&self, frontier_g: Cost, min_action_cost: Cost) -> Cost {
        let from_open = self.min_g().unwrap_or(INFINITY);
        let from_frontier = frontier_g.saturating_add(min_action_cost);
        from_open.min(from_frontier)
    }

    /// Removes and returns the bucket at `g`, if any.
    pub fn pop(&mut self, g: Cost) -> Option<Bucket> {
        self.buckets.remove(&g)
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biodivine_lib_bdd::BddVariableSetBuilder;

    #[test]
    fn min_g_is_lowest_nonempty_bucket() {
        let mut builder = BddVariableSetBuilder::new();
        let v = builder.make_variable("v");
        let universe = builder.build();

        let mut open = OpenList::new();
        open.insert(universe.mk_literal(v, true), 5);
        open.insert(universe.mk_literal(v, false), 2);
        assert_eq!(Some(2), open.min_g());
    }

    #[test]
    fn min_next_g_prefers_smaller_of_open_and_frontier() {
        let open = OpenList::new();
        assert_eq!(7, open.min_next_g(3, 4));
    }

    #[test]
    fn empty_open_reports_infinity_when_frontier_also_exhausted() {
        let open = OpenList::new();
        assert_eq!(INFINITY, open.min_next_g(INFINITY, 1));
    }

    #[test]
    fn false_bdd_is_not_inserted() {
        let mut builder = BddVariableSetBuilder::new();
        let v = builder.make_variable("v");
        let universe = builder.build();

        let mut open = OpenList::new();
        open.insert(universe.mk_false(), 1);
        assert!(open.is_empty());
        let _ = v;
    }
}
