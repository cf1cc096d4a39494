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

//! Search configuration. Built with [`derive_builder`] the same way the
//! rest of this crate's ancestry builds its option structs, so every knob
//! has a sensible default and callers only override what they care about.

use derive_builder::Builder;

use crate::error::PlannerError;

/// Which direction(s) the search explores.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Direction {
    Fw,
    Bw,
    Bidirectional,
}

/// What the search is trying to produce.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SearchMode {
    /// Stop at the first (cheapest) plan.
    Single,
    /// Enumerate up to `n` cheapest plans, in non-decreasing cost order.
    TopK(usize),
    /// Enumerate every plan whose cost is within `quality_multiplier` of
    /// the cheapest plan's cost.
    TopQ(f64),
}

/// How aggressively mutex information prunes the search.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MutexType {
    /// Only the "valid values" dead-end BDD is ever conjoined.
    None,
    /// `notMutex` BDDs are conjoined into frontier filtering.
    And,
    /// `notMutex` information is additionally baked into each operator's
    /// transition relation (e-deletion strengthening).
    Edeletion,
}

/// How a conditional-effect operator's transition relation is represented.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CondEffTr {
    /// One BDD for the whole operator.
    Monolithic,
    /// One TR per affected variable, combined via `AndAbstract` at image
    /// time.
    Conjunctive,
    /// Conjunctive, with early quantification of variables not used by
    /// later TRs in the chain.
    ConjunctiveEarlyQuant,
}

/// Adaptation bounds the step estimator applies to per-step budgets
/// (spec §4.5 / §6 "min/max/ratio alloted_*").
#[derive(Copy, Clone, Debug)]
pub struct AllotedBounds {
    pub min_nodes: usize,
    pub max_nodes: usize,
    pub min_time_ms: u64,
    pub max_time_ms: u64,
    /// Multiplicative penalty applied to the next budget after a violation.
    pub growth_ratio: f64,
}
impl Default for AllotedBounds {
    fn default() -> Self {
        AllotedBounds {
            min_nodes: 1_000,
            max_nodes: 50_000_000,
            min_time_ms: 10,
            max_time_ms: 60_000,
            growth_ratio: 1.5,
        }
    }
}

/// Every configuration option recognized by the engine (spec §6).
#[derive(Clone, Debug, Builder)]
#[builder(setter(into), default)]
pub struct SearchConfig {
    pub direction: Direction,
    pub mode: SearchMode,
    pub quality_multiplier: f64,

    pub mutex_type: MutexType,
    pub cond_eff_tr: CondEffTr,

    pub max_tr_size: usize,
    pub max_tr_time: u64,

    pub max_mutex_size: usize,
    pub max_mutex_time: u64,

    pub max_aux_nodes: usize,
    pub max_aux_time: u64,

    pub max_step_nodes: usize,
    pub max_step_time: u64,

    pub alloted: AllotedBounds,

    /// Enable the Gamer-style pair-distance variable-ordering optimizer.
    pub gamer_ordering: bool,
    /// Loopless ("simple") plan reconstruction.
    pub simple: bool,
    /// Suppress bound-progress output.
    pub silent: bool,
    /// Bidirectional direction-selection policy: alternate instead of
    /// always stepping the cheapest direction (spec §9 open question 1).
    pub alternating: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            direction: Direction::Bidirectional,
            mode: SearchMode::Single,
            quality_multiplier: 1.0,
            mutex_type: MutexType::And,
            cond_eff_tr: CondEffTr::Conjunctive,
            max_tr_size: 1_000_000,
            max_tr_time: 5_000,
            max_mutex_size: 1_000_000,
            max_mutex_time: 5_000,
            max_aux_nodes: 1_000_000,
            max_aux_time: 5_000,
            max_step_nodes: 1_000_000,
            max_step_time: 5_000,
            alloted: AllotedBounds::default(),
            gamer_ordering: true,
            simple: false,
            silent: false,
            alternating: false,
        }
    }
}

impl SearchConfig {
    /// Checks the combinations the spec declares inconsistent (severity 5)
    /// or unsupported (severity 4, where it cannot be auto-downgraded).
    /// Called once at engine setup, before any search state is built.
    pub fn validate(&self) -> Result<(), PlannerError> {
        match self.mode {
            SearchMode::Single => {}
            SearchMode::TopK(n) => {
                if n == 0 {
                    return Err(PlannerError::InvalidConfiguration(
                        "mode = top_k requires num_plans >= 1".into(),
                    ));
                }
            }
            SearchMode::TopQ(q) => {
                if q < 1.0 {
                    return Err(PlannerError::InvalidConfiguration(
                        "mode = top_q requires quality_multiplier >= 1.0".into(),
                    ));
                }
            }
        }
        if self.alloted.min_nodes > self.alloted.max_nodes {
            return Err(PlannerError::InvalidConfiguration(
                "alloted min_nodes exceeds max_nodes".into(),
            ));
        }
        if self.alloted.min_time_ms > self.alloted.max_time_ms {
            return Err(PlannerError::InvalidConfiguration(
                "alloted min_time_ms exceeds max_time_ms".into(),
            ));
        }
        Ok(())
    }

    pub fn aux_budget(&self) -> crate::common::Budget {
        crate::common::Budget::new(self.max_aux_nodes, self.max_aux_time)
    }

    pub fn step_budget(&self) -> crate::common::Budget {
        crate::common::Budget::new(self.max_step_nodes, self.max_step_time)
    }

    pub fn tr_budget(&self) -> crate::common::Budget {
        crate::common::Budget::new(self.max_tr_size, self.max_tr_time)
    }

    pub fn mutex_budget(&self) -> crate::common::Budget {
        crate::common::Budget::new(self.max_mutex_size, self.max_mutex_time)
    }
}

/// `num_plans` / `quality_multiplier` convenience accessor so callers don't
/// need to match on `SearchMode` everywhere an upper-bound-on-count or
/// quality-window check is needed.
impl SearchMode {
    pub fn num_plans(&self) -> Option<usize> {
        match self {
            SearchMode::TopK(n) => Some(*n),
            _ => None,
        }
    }

    pub fn quality(&self) -> Option<f64> {
        match self {
            SearchMode::TopQ(q) => Some(*q),
            _ => None,
        }
    }

    pub fn is_top_k_or_q(&self) -> bool {
        !matches!(self, SearchMode::Single)
    }
}
