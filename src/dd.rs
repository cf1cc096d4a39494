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

//! Thin wrapper around the external BDD package (`biodivine_lib_bdd`). Every
//! other module in this crate reaches the BDD package only through here, so
//! that budget enforcement (spec §5, "every long-running primitive accepts
//! a node budget") lives in one place instead of being re-derived at every
//! call site.

use std::time::Instant;

use biodivine_lib_bdd::{Bdd, BddVariable, BddVariableSet, BddVariableSetBuilder};

use crate::common::{Budget, BddStep};

/// Allocates one boolean BDD variable per element of `names`, in order.
/// Variable identity, not the name, is what every other module keys on;
/// the name only exists for the rare case a caller wants to print a
/// variable for debugging.
pub fn build_variable_set(names: &[String]) -> (BddVariableSet, Vec<BddVariable>) {
    let mut builder = BddVariableSetBuilder::new();
    let vars = names.iter().map(|n| builder.make_variable(n)).collect();
    (builder.build(), vars)
}

/// Runs `f`, then checks the result's node count against `budget`. This is
/// a build-then-check strategy rather than an aborting-construction one:
/// the BDD package builds the full result and we reject it after the fact.
/// Inputs are never mutated by a `Bdd` operation (the package is immutable
/// per-value), so a rejected result leaves no trace in caller state,
/// satisfying "input BDDs are unchanged" (spec §8, property 10).
pub fn checked<F: FnOnce() -> Bdd>(f: F, budget: &Budget) -> BddStep<Bdd> {
    let result = f();
    if budget.fits(&result) {
        BddStep::Ready(result)
    } else {
        BddStep::Truncated
    }
}

/// Same as [`checked`], but also enforces the wall-clock half of `budget`
/// by timing the closure. Used for steps whose cost is dominated by BDD
/// package internals we cannot interrupt mid-flight; the time check simply
/// refuses to use a result that took too long to build.
pub fn checked_timed<F: FnOnce() -> Bdd>(f: F, budget: &Budget) -> BddStep<Bdd> {
    let start = Instant::now();
    let result = f();
    let elapsed = start.elapsed().as_millis() as u64;
    if elapsed > budget.max_time_ms {
        return BddStep::Truncated;
    }
    if budget.fits(&result) {
        BddStep::Ready(result)
    } else {
        BddStep::Truncated
    }
}

/// `AndAbstract(a, b, vars) = exists(vars, a ∧ b)`, the single primitive
/// image/preimage are built from (spec §4.2).
pub fn and_abstract(a: &Bdd, b: &Bdd, vars: &[BddVariable]) -> Bdd {
    a.and(b).exists(vars)
}
