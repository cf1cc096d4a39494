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

//! The Frontier (spec §4.4): the four-stage pipeline holding the g-layer
//! currently being expanded (`Sfilter → Smerge → Szero → S`). At any
//! moment exactly one non-empty stage is eligible to advance.

use std::collections::BTreeMap;

use crate::common::{BddStep, Budget, Cost};
use crate::config::MutexType;
use crate::mgr::Mgr;
use crate::open_list::Bucket;

/// What `prepare` reports back to the owning `UCS`. `Ready` carries the
/// (possibly multi-entry, possibly empty) bucket produced by merging
/// `Smerge` this call; the caller inserts each entry into `closed[g]` and
/// checks it for frontier cuts before the next tick. A budget-bounded
/// merge may leave more than one BDD here rather than collapsing the
/// bucket into a single disjunction.
pub enum FrontierStatus {
    Ready(Bucket),
    /// A budget was exceeded mid-stage; retry the same call next tick
    /// with (presumably) a larger budget from the step estimator.
    Truncated,
}

pub struct Frontier {
    has0: bool,
    g_value: Cost,
    s_filter: Bucket,
    s_merge: Bucket,
    s_zero: Bucket,
    s: Bucket,
}

impl Frontier {
    pub fn new(has0: bool) -> Self {
        Frontier {
            has0,
            g_value: 0,
            s_filter: Vec::new(),
            s_merge: Vec::new(),
            s_zero: Vec::new(),
            s: Vec::new(),
        }
    }

    pub fn g_value(&self) -> Cost {
        self.g_value
    }

    pub fn is_idle(&self) -> bool {
        self.s_filter.is_empty() && self.s_merge.is_empty() && self.s_zero.is_empty() && self.s.is_empty()
    }

    /// `pop(g)`: moves `bucket` into `Sfilter`, sets `g_value := g`.
    pub fn pop(&mut self, g: Cost, bucket: Bucket) {
        debug_assert!(self.is_idle(), "pop() called while a previous layer is still in flight");
        self.g_value = g;
        self.s_filter = bucket;
    }

    /// Drains `Sfilter → Smerge` via `filter_mutex`, then tournament-merges
    /// `Smerge` via disjunctive OR under budget (keeping however many
    /// pieces the budget allowed merged into one bucket). If `HAS0`,
    /// duplicates the merged bucket into both `S` and `Szero`; otherwise
    /// only into `S`.
    pub fn prepare(
        &mut self,
        mgr: &Mgr,
        mutex_type: MutexType,
        fw: bool,
        initializing: bool,
        budget: &Budget,
    ) -> FrontierStatus {
        while let Some(bdd) = self.s_filter.pop() {
            match mgr.filter_mutex(&bdd, fw, initializing, mutex_type, budget) {
                BddStep::Ready(filtered) => {
                    if !filtered.is_false() {
                        self.s_merge.push(filtered);
                    }
                }
                BddStep::Truncated => {
                    self.s_filter.push(bdd);
                    return FrontierStatus::Truncated;
                }
            }
        }

        if self.s_merge.is_empty() {
            return FrontierStatus::Ready(Vec::new());
        }

        mgr.merge_bucket_tournament(&mut self.s_merge, budget);
        let merged: Bucket = std::mem::take(&mut self.s_merge).into_iter().filter(|b| !b.is_false()).collect();

        self.s.extend(merged.iter().cloned());
        if self.has0 {
            self.s_zero.extend(merged.iter().cloned());
        }
        FrontierStatus::Ready(merged)
    }

    /// If `Szero` is non-empty, computes zero-cost images and re-enters
    /// `Sfilter` at the same `g_value`; otherwise computes the cost image
    /// of `S`, grouping results by the delta cost `c > 0` of the
    /// transition relation(s) that produced them. `fw` selects image
    /// (forward search) vs preimage (backward search).
    pub fn expand(&mut self, mgr: &Mgr, fw: bool, budget: &Budget) -> ExpandOutcome {
        if let Some(bdd) = self.s_zero.pop() {
            match mgr.zero_cost_step(&bdd, fw, budget) {
                BddStep::Ready(images) => {
                    let reentry: Bucket = images.into_iter().filter(|b| !b.is_false()).collect();
                    if !reentry.is_empty() {
                        self.s_filter.extend(reentry.clone());
                    }
                    return ExpandOutcome::ZeroReentry(reentry);
                }
                BddStep::Truncated => {
                    self.s_zero.push(bdd);
                    return ExpandOutcome::Truncated;
                }
            }
        }

        if let Some(bdd) = self.s.pop() {
            match mgr.cost_step(&bdd, fw, budget) {
                BddStep::Ready(by_cost) => {
                    return ExpandOutcome::CostBuckets(by_cost);
                }
                BddStep::Truncated => {
                    self.s.push(bdd);
                    return ExpandOutcome::Truncated;
                }
            }
        }

        ExpandOutcome::Empty
    }
}

pub enum ExpandOutcome {
    ZeroReentry(Bucket),
    CostBuckets(BTreeMap<Cost, Bucket>),
    Truncated,
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_frontier_is_idle() {
        let frontier = Frontier::new(false);
        assert!(frontier.is_idle());
    }
}
