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

//! # symplan
//!
//! `symplan` is a symbolic (BDD-based) uniform-cost search engine for
//! optimal and top-k classical planning. It compiles a grounded planning
//! task into a set of `biodivine_lib_bdd::Bdd` transition relations and
//! searches the state space symbolically, one g-cost layer at a time,
//! rather than expanding individual states.
//!
//! ## Quick example
//!
//! To run the engine you implement [`AbstractTask`] for your planning
//! domain (variables, operators, the goal condition), build a [`Mgr`]
//! from it, and drive a [`bidirectional::Engine`] until it reaches a
//! verdict:
//!
//! ```no_run
//! use symplan::{AbstractTask, Completion, Engine, Fact, FdVar, Mgr, MutexGroup, Operator, OpId, SearchConfig};
//!
//! struct MyTask;
//! impl AbstractTask for MyTask {
//!     fn num_variables(&self) -> usize { 1 }
//!     fn domain_size(&self, _var: FdVar) -> u32 { 2 }
//!     fn initial_state(&self) -> Vec<u32> { vec![0] }
//!     fn goal(&self) -> Vec<Fact> { vec![Fact::new(FdVar(0), 1)] }
//!     fn num_operators(&self) -> usize { 0 }
//!     fn operator(&self, id: OpId) -> &Operator { unreachable!("no operators: {:?}", id) }
//!     fn mutex_groups(&self) -> &[MutexGroup] { &[] }
//! }
//!
//! let task = MyTask;
//! let config = SearchConfig::default();
//! let mgr = Mgr::build(&task, &config).expect("building the state-space manager");
//! let mut engine = Engine::new(mgr, config);
//! match engine.run(10_000) {
//!     Completion::Solved { cost, is_exact } => println!("found a plan of cost {cost} (exact: {is_exact})"),
//!     Completion::Unsolvable => println!("no plan exists"),
//!     Completion::Aborted { reason } => println!("search aborted: {reason:?}"),
//! }
//! ```
//!
//! ## Layout
//!
//! - [`task::AbstractTask`] is the trait callers implement to describe a
//!   planning domain; [`task::Operator`] and [`task::Effect`] describe
//!   grounded actions, including conditional effects and state-dependent
//!   action costs.
//! - [`mgr::Mgr`] compiles a task into the shared symbolic state (variable
//!   ordering, mutex sets, transition relations) both search directions
//!   query.
//! - [`ucs::Ucs`] drives one direction of uniform-cost search through its
//!   [`frontier::Frontier`], [`open_list::OpenList`] and
//!   [`closed_list::ClosedList`].
//! - [`bidirectional::Engine`] couples a forward and a backward `Ucs` (or
//!   runs a single direction) and reports a [`common::Completion`].
//! - [`registry::SolutionRegistry`] reconstructs and deduplicates plans
//!   from the cuts each direction discovers.
//! - [`config::SearchConfig`] holds every tunable knob; [`error::PlannerError`]
//!   is the crate's error type.

mod closed_list;
mod common;
mod config;
mod dd;
mod error;
mod frontier;
mod mgr;
mod mutex;
mod open_list;
mod ordering;
mod registry;
mod step_estimator;
mod task;
mod tr;
mod ucs;
mod vars;

pub mod bidirectional;

pub use bidirectional::Engine;
pub use closed_list::{ClosedList, FixedOracle, Oracle};
pub use common::{BddStep, Budget, Completion, Cost, Cut, Fact, FdVar, OpId, Plan, Reason, INFINITY};
pub use config::{
    AllotedBounds, CondEffTr, Direction, MutexType, SearchConfig, SearchConfigBuilder, SearchMode,
};
pub use error::{PlannerError, PlannerResult};
pub use mgr::Mgr;
pub use registry::SolutionRegistry;
pub use task::{AbstractTask, Effect, MutexGroup, Operator, SdacCase};
