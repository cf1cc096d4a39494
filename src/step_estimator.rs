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

//! Step Estimator (spec §4.5): predicts the time/node cost of the next
//! image step from the size of its input, and adapts per-step budgets
//! when a step is aborted.

use crate::config::AllotedBounds;

#[derive(Copy, Clone, Debug)]
pub struct StepPrediction {
    pub time_ms: f64,
    pub output_nodes: usize,
}

#[derive(Copy, Clone, Debug)]
struct Observation {
    input_nodes: usize,
    time_ms: f64,
    output_nodes: usize,
}

/// Which of the two image branches a table and observation belongs to
/// (spec: "for both the zero-cost and cost-image branches").
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Branch {
    Zero,
    Cost,
}

/// A linear-interpolation/extrapolation table from input node count to
/// predicted `(ms, output nodes)`, one per branch, plus the adaptive
/// budget currently in force.
pub struct StepEstimator {
    zero_table: Vec<Observation>,
    cost_table: Vec<Observation>,
    bounds: AllotedBounds,
    current_node_budget: usize,
    current_time_budget_ms: u64,
}

impl StepEstimator {
    /// `initial` is the nominal per-tick frontier-expansion budget
    /// (`max_step_nodes`/`max_step_time`); `bounds` separately clamps how
    /// far `violated` may grow or shrink it.
    pub fn new(initial: crate::common::Budget, bounds: AllotedBounds) -> Self {
        StepEstimator {
            zero_table: Vec::new(),
            cost_table: Vec::new(),
            bounds,
            current_node_budget: initial.max_nodes.clamp(bounds.min_nodes, bounds.max_nodes),
            current_time_budget_ms: initial.max_time_ms.clamp(bounds.min_time_ms, bounds.max_time_ms),
        }
    }

    fn table(&self, branch: Branch) -> &[Observation] {
        match branch {
            Branch::Zero => &self.zero_table,
            Branch::Cost => &self.cost_table,
        }
    }

    fn table_mut(&mut self, branch: Branch) -> &mut Vec<Observation> {
        match branch {
            Branch::Zero => &mut self.zero_table,
            Branch::Cost => &mut self.cost_table,
        }
    }

    /// Interpolates (or, beyond the largest recorded input, linearly
    /// extrapolates) a prediction for `n` input nodes.
    pub fn next_step(&self, branch: Branch, n: usize) -> StepPrediction {
        let table = self.table(branch);
        if table.is_empty() {
            return StepPrediction {
                time_ms: self.current_time_budget_ms as f64,
                output_nodes: n.max(1),
            };
        }
        if table.len() == 1 || n <= table[0].input_nodes {
            let o = &table[0];
            return scale(o, n);
        }
        for w in table.windows(2) {
            let (a, b) = (&w[0], &w[1]);
            if n >= a.input_nodes && n <= b.input_nodes {
                return interpolate(a, b, n);
            }
        }
        let last2 = &table[table.len() - 2..];
        extrapolate(&last2[0], &last2[1], n)
    }

    /// Records an observation, keeping the table sorted by input size and
    /// enforcing monotonicity (a later, larger input may not predict a
    /// smaller output than an earlier, smaller one; such an observation
    /// is recorded as-is but the larger of the two is used for both when
    /// producing predictions, so interpolation stays monotone).
    pub fn step_taken(&mut self, branch: Branch, input_nodes: usize, time_ms: f64, output_nodes: usize) {
        let table = self.table_mut(branch);
        let idx = table.partition_point(|o| o.input_nodes < input_nodes);
        table.insert(idx, Observation { input_nodes, time_ms, output_nodes });
        for i in 1..table.len() {
            if table[i].output_nodes < table[i - 1].output_nodes {
                table[i].output_nodes = table[i - 1].output_nodes;
            }
            if table[i].time_ms < table[i - 1].time_ms {
                table[i].time_ms = table[i - 1].time_ms;
            }
        }
    }

    /// On an aborted step, penalizes the prediction so the next budget
    /// request is larger: the node budget grows multiplicatively by
    /// `alloted.growth_ratio`, clamped to `[min_nodes, max_nodes]`; same
    /// for the time budget.
    pub fn violated(&mut self, _elapsed_ms: u64, _time_limit: u64, _node_limit: usize) {
        let grown_nodes = (self.current_node_budget as f64 * self.bounds.growth_ratio) as usize;
        self.current_node_budget = grown_nodes.clamp(self.bounds.min_nodes, self.bounds.max_nodes);
        let grown_time = (self.current_time_budget_ms as f64 * self.bounds.growth_ratio) as u64;
        self.current_time_budget_ms = grown_time.clamp(self.bounds.min_time_ms, self.bounds.max_time_ms);
    }

    pub fn current_budget(&self) -> crate::common::Budget {
        crate::common::Budget::new(self.current_node_budget, self.current_time_budget_ms)
    }
}

fn scale(o: &Observation, n: usize) -> StepPrediction {
    if o.input_nodes == 0 {
        return StepPrediction { time_ms: o.time_ms, output_nodes: o.output_nodes };
    }
    let ratio = n as f64 / o.input_nodes as f64;
    StepPrediction {
        time_ms: o.time_ms * ratio,
        output_nodes: ((o.output_nodes as f64) * ratio) as usize,
    }
}

fn interpolate(a: &Observation, b: &Observation, n: usize) -> StepPrediction {
    let span = (b.input_nodes - a.input_nodes).max(1) as f64;
    let t = (n - a.input_nodes) as f64 / span;
    StepPrediction {
        time_ms: a.time_ms + t * (b.time_ms - a.time_ms),
        output_nodes: (a.output_nodes as f64 + t * (b.output_nodes as f64 - a.output_nodes as f64)) as usize,
    }
}

fn extrapolate(a: &Observation, b: &Observation, n: usize) -> StepPrediction {
    let span = (b.input_nodes as f64 - a.input_nodes as f64).max(1.0);
    let slope_time = (b.time_ms - a.time_ms) / span;
    let slope_nodes = (b.output_nodes as f64 - a.output_nodes as f64) / span;
    let delta = n as f64 - b.input_nodes as f64;
    StepPrediction {
        time_ms: (b.time_ms + slope_time * delta).max(0.0),
        output_nodes: (b.output_nodes as f64 + slope_nodes * delta).max(0.0) as usize,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_predicts_identity() {
        let bounds = AllotedBounds::default();
        let estimator = StepEstimator::new(crate::common::Budget::new(bounds.max_nodes, bounds.max_time_ms), bounds);
        let p = estimator.next_step(Branch::Cost, 100);
        assert_eq!(100, p.output_nodes);
    }

    #[test]
    fn interpolates_between_two_observations() {
        let bounds = AllotedBounds::default();
        let mut estimator = StepEstimator::new(crate::common::Budget::new(bounds.max_nodes, bounds.max_time_ms), bounds);
        estimator.step_taken(Branch::Cost, 100, 10.0, 200);
        estimator.step_taken(Branch::Cost, 300, 30.0, 600);
        let p = estimator.next_step(Branch::Cost, 200);
        assert_eq!(20.0, p.time_ms);
        assert_eq!(400, p.output_nodes);
    }

    #[test]
    fn violated_grows_budget_within_bounds() {
        let bounds = AllotedBounds { min_nodes: 10, max_nodes: 1_000, min_time_ms: 1, max_time_ms: 100, growth_ratio: 2.0 };
        let mut estimator = StepEstimator::new(crate::common::Budget::new(bounds.max_nodes, bounds.max_time_ms), bounds);
        estimator.current_node_budget = 100;
        estimator.violated(0, 0, 0);
        assert_eq!(200, estimator.current_budget().max_nodes);
    }
}
