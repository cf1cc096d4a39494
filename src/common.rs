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

//! This module defines the most basic data types that are used throughout all
//! the code of this crate (both at the abstraction and implementation
//! levels). These are also the types client code is likely to work with.

use biodivine_lib_bdd::Bdd;

// ----------------------------------------------------------------------------
// --- VARIABLE / FACT ----------------------------------------------------
// ----------------------------------------------------------------------------

/// A finite-domain variable of the grounded planning task, identified by its
/// index into `AbstractTask::num_variables()`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct FdVar(pub usize);
impl FdVar {
    #[inline]
    pub fn id(self) -> usize {
        self.0
    }
}

/// A `Fact` pairs a finite-domain variable with one of the values in its
/// domain. `0 <= value < domain_size(var)` is a precondition enforced by
/// callers, not by this type.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Fact {
    pub var: FdVar,
    pub value: u32,
}
impl Fact {
    pub fn new(var: FdVar, value: u32) -> Self {
        Fact { var, value }
    }
}

/// The non-negative integer cost of an operator, a transition relation, or a
/// partial/complete plan.
pub type Cost = u64;

/// Sentinel used in place of a mathematical `+infinity` for bounds that have
/// not yet been reached (an empty open list, an un-registered cut, ...).
pub const INFINITY: Cost = u64::MAX;

/// A grounded-operator index: position of the operator in the original task.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct OpId(pub usize);

/// A plan is nothing but a sequence of operator ids, in application order.
pub type Plan = Vec<OpId>;

// ----------------------------------------------------------------------------
// --- RESULTS --------------------------------------------------------------
// ----------------------------------------------------------------------------

/// A reason explaining why the engine stopped before reaching a verdict.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Reason {
    /// A configured wall-clock or node-budget cutoff was hit.
    CutoffOccurred,
    /// The engine could no longer make progress within the per-step budgets
    /// the step estimator was willing to grant (spec severity 2).
    InfeasibleUnderBudget,
}

/// The outcome of a completed (or aborted) search.
#[derive(Debug, Clone)]
pub enum Completion {
    /// At least one plan was found; `is_exact` tells whether optimality (or,
    /// in top-k mode, exhaustiveness up to the requested count) was proven.
    Solved { is_exact: bool, cost: Cost },
    /// The open list and frontier were exhausted with no registered cut: the
    /// task is proven unsolvable.
    Unsolvable,
    /// The search was aborted before a verdict could be reached.
    Aborted { reason: Reason },
}

/// Every long-running BDD primitive (image, preimage, merge, filter_mutex)
/// is budgeted and may be truncated; this sum type keeps that possibility
/// explicit in every signature rather than smuggling it through panics or
/// sentinel values (design notes, "Budget exceptions").
#[derive(Debug, Clone)]
pub enum BddStep<T> {
    Ready(T),
    Truncated,
}
impl<T> BddStep<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> BddStep<U> {
        match self {
            BddStep::Ready(v) => BddStep::Ready(f(v)),
            BddStep::Truncated => BddStep::Truncated,
        }
    }
    pub fn is_truncated(&self) -> bool {
        matches!(self, BddStep::Truncated)
    }
}

/// A node-count budget paired with a wall-clock budget, passed down to every
/// primitive that may need to abort mid-way (spec §5).
#[derive(Copy, Clone, Debug)]
pub struct Budget {
    pub max_nodes: usize,
    pub max_time_ms: u64,
}
impl Budget {
    pub fn new(max_nodes: usize, max_time_ms: u64) -> Self {
        Budget { max_nodes, max_time_ms }
    }

    /// Checks a freshly built BDD against the node half of this budget.
    /// Time budgets are enforced by callers via an `Instant` they own,
    /// since this type has no notion of "when a step started".
    pub fn fits(&self, bdd: &Bdd) -> bool {
        bdd.size() <= self.max_nodes
    }
}

/// A "cut": a non-empty set of states reached from both directions of a
/// bidirectional search at cost `g` (forward) and `h` (backward). Total cost
/// is `g + h`.
#[derive(Clone)]
pub struct Cut {
    pub g: Cost,
    pub h: Cost,
    pub cut_bdd: Bdd,
}
impl Cut {
    pub fn cost(&self) -> Cost {
        self.g + self.h
    }
}
