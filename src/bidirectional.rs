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

//! Bidirectional search (spec §4.7): couples a forward and a backward
//! `Ucs` sharing one `Mgr`, each using the other's closed list as its
//! `Oracle`. Also the entry point for unidirectional search, which is
//! just the degenerate one-direction case against a `FixedOracle`.

use crate::closed_list::FixedOracle;
use crate::common::{Completion, Cost, Reason, INFINITY};
use crate::config::{Direction, SearchConfig};
use crate::mgr::Mgr;
use crate::registry::SolutionRegistry;
use crate::ucs::{StepOutcome, Ucs};

pub struct Engine {
    mgr: Mgr,
    config: SearchConfig,
    fw: Option<Ucs>,
    bw: Option<Ucs>,
    registry: SolutionRegistry,
    alternate_next: bool,
}

impl Engine {
    pub fn new(mgr: Mgr, config: SearchConfig) -> Engine {
        let (fw, bw) = match config.direction {
            Direction::Fw => (Some(Ucs::new(&mgr, true, config.step_budget(), config.alloted)), None),
            Direction::Bw => (None, Some(Ucs::new(&mgr, false, config.step_budget(), config.alloted))),
            Direction::Bidirectional => (
                Some(Ucs::new(&mgr, true, config.step_budget(), config.alloted)),
                Some(Ucs::new(&mgr, false, config.step_budget(), config.alloted)),
            ),
        };
        let registry = SolutionRegistry::new(config.mode, config.simple);
        Engine { mgr, config, fw, bw, registry, alternate_next: true }
    }

    pub fn registry(&self) -> &SolutionRegistry {
        &self.registry
    }

    /// `max( max(fw.f, bw.f), fw.g + bw.g + min_action_cost )` when both
    /// directions are active; a single direction's own `f_bound`
    /// otherwise.
    pub fn lower_bound(&self) -> Cost {
        match (&self.fw, &self.bw) {
            (Some(fw), Some(bw)) => {
                let split_bound = fw.g_value().saturating_add(bw.g_value()).saturating_add(self.mgr.min_action_cost());
                fw.f_bound(&self.mgr).max(bw.f_bound(&self.mgr)).max(split_bound)
            }
            (Some(fw), None) => fw.f_bound(&self.mgr),
            (None, Some(bw)) => bw.f_bound(&self.mgr),
            (None, None) => INFINITY,
        }
    }

    pub fn upper_bound(&self) -> Cost {
        self.registry.upper_bound()
    }

    /// Injects an a-priori primal bound, short-circuiting `Single` mode
    /// the moment the known lower bound meets it (mirrors the teacher's
    /// `Solver::set_primal`; minimization means the bound only ever
    /// tightens, never needs a "best-so-far" solution to go with it).
    pub fn set_primal_bound(&mut self, cost: Cost) {
        self.registry.set_primal_bound(cost);
    }

    fn both_exhausted(&self) -> bool {
        let fw_done = self.fw.as_ref().map(Ucs::is_exhausted).unwrap_or(true);
        let bw_done = self.bw.as_ref().map(Ucs::is_exhausted).unwrap_or(true);
        fw_done && bw_done
    }

    /// Runs one tick: steps the best direction, drains any newly
    /// registered cuts into the solution registry, and reports whether
    /// the search has reached a verdict.
    pub fn tick(&mut self) -> Completion {
        self.step_best_direction();

        let budget = self.config.aux_budget();
        let (fw_closed, bw_closed) = match (&self.fw, &self.bw) {
            (Some(fw), Some(bw)) => (Some(fw.closed()), Some(bw.closed())),
            (Some(fw), None) => (Some(fw.closed()), None),
            (None, Some(bw)) => (None, Some(bw.closed())),
            (None, None) => (None, None),
        };
        match (fw_closed, bw_closed) {
            (Some(primary), secondary) => self.registry.drain(&self.mgr, primary, secondary, &budget),
            (None, Some(primary)) => self.registry.drain(&self.mgr, primary, None, &budget),
            (None, None) => {}
        }

        if !self.config.silent {
            println!(
                "Explored g_fw {}, g_bw {}, LB {}, UB {}, Plans {}",
                self.fw.as_ref().map(Ucs::g_value).unwrap_or(0),
                self.bw.as_ref().map(Ucs::g_value).unwrap_or(0),
                self.lower_bound(),
                self.upper_bound(),
                self.registry.plans().len(),
            );
        }

        self.verdict()
    }

    /// spec §4.6, "Termination (single-plan)": `lower >= upper` declares
    /// solved whenever a cut is already known, for every mode alike — a
    /// plan found before the bound closes is not yet provably optimal
    /// (spec §8 testable property 4) and must not be reported early.
    fn verdict(&self) -> Completion {
        let lower = self.lower_bound();
        let upper = self.upper_bound();

        if !self.registry.plans().is_empty() && lower >= upper {
            return Completion::Solved { is_exact: true, cost: upper };
        }
        if self.both_exhausted() {
            if self.registry.plans().is_empty() {
                return Completion::Unsolvable;
            }
            return Completion::Solved { is_exact: true, cost: self.registry.optimal_cost().unwrap_or(upper) };
        }
        Completion::Aborted { reason: Reason::CutoffOccurred }
    }

    /// One full run: ticks until a verdict is reached or `max_ticks` is
    /// exhausted (a caller-side cooperative-scheduling cutoff; the spec
    /// itself imposes no tick limit).
    pub fn run(&mut self, max_ticks: usize) -> Completion {
        for _ in 0..max_ticks {
            match self.tick() {
                Completion::Aborted { .. } => continue,
                verdict => return verdict,
            }
        }
        Completion::Aborted { reason: Reason::CutoffOccurred }
    }

    fn step_best_direction(&mut self) {
        match (self.fw.is_some(), self.bw.is_some()) {
            (true, false) => {
                let oracle = FixedOracle { target: self.mgr.goal_bdd().clone() };
                let fw = self.fw.as_mut().expect("checked Some above");
                fw.step(&self.mgr, self.config.mutex_type, self.config.mode, &oracle, &mut self.registry);
            }
            (false, true) => {
                let oracle = FixedOracle { target: self.mgr.init_bdd().clone() };
                let bw = self.bw.as_mut().expect("checked Some above");
                bw.step(&self.mgr, self.config.mutex_type, self.config.mode, &oracle, &mut self.registry);
            }
            (true, true) => self.step_bidirectional(),
            (false, false) => {}
        }
    }

    /// Picks the direction whose next pending branch is predicted
    /// cheapest (ties to forward), unless one side is already exhausted,
    /// and steps it against the other side's closed list as its oracle.
    /// Accessing `self.fw`/`self.bw` as disjoint fields (rather than
    /// through a helper taking `&mut self`) lets the borrow checker prove
    /// the mutable borrow of one direction and the immutable borrow of
    /// the other's closed list never alias.
    fn step_bidirectional(&mut self) {
        let fw = self.fw.as_ref().expect("checked Some above");
        let bw = self.bw.as_ref().expect("checked Some above");

        let step_fw = if self.config.alternating {
            let choice = self.alternate_next;
            self.alternate_next = !self.alternate_next;
            choice
        } else if fw.is_exhausted() {
            false
        } else if bw.is_exhausted() {
            true
        } else {
            fw.next_step_nodes() <= bw.next_step_nodes()
        };

        if step_fw {
            let bw = self.bw.as_ref().expect("checked Some above");
            let fw = self.fw.as_mut().expect("checked Some above");
            fw.step(&self.mgr, self.config.mutex_type, self.config.mode, bw, &mut self.registry);
        } else {
            let fw = self.fw.as_ref().expect("checked Some above");
            let bw = self.bw.as_mut().expect("checked Some above");
            bw.step(&self.mgr, self.config.mutex_type, self.config.mode, fw, &mut self.registry);
        }
    }
}
