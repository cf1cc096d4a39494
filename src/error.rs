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

//! Error kinds surfaced by the engine. "Budget exceeded" is deliberately
//! absent from this enum: it is always caught locally (see
//! [`crate::common::BddStep`]) and never escapes as an `Err`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlannerError {
    /// The engine detected that it cannot make progress: every step
    /// consistently aborts even at the minimum configured budget.
    #[error("search infeasible under the configured budget")]
    Infeasible,

    /// The open list and frontier were exhausted with no registered cut.
    /// Normally surfaced as `Ok(Completion::Unsolvable)` rather than this
    /// variant; kept here for callers that prefer `?`-style propagation.
    #[error("task proven unsolvable: no plan exists")]
    Unsolvable,

    /// A combination of task features the engine cannot represent, and
    /// cannot gracefully degrade (e.g. SDAC combined with a
    /// non-monolithic conditional-effect encoding of a kind that defeats
    /// early quantification).
    #[error("unsupported task feature: {0}")]
    UnsupportedTaskFeature(String),

    /// The `SearchConfig` is self-contradictory, e.g. `mode = Single`
    /// together with `num_plans > 1`.
    #[error("inconsistent configuration: {0}")]
    InvalidConfiguration(String),
}

pub type PlannerResult<T> = Result<T, PlannerError>;
