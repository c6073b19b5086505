//! `PathTrial`: resumable best-first search inside one domain.
//!
//! # Algorithm
//!
//! A* over the options offered by the registered [`ModeProvider`]s:
//!
//! ```text
//! pop lowest f = g + h from the frontier
//! skip if already settled; settle it
//! destination?  → reconstruct path from predecessors, Successful
//! for each provider the flags allow, for each option of an allowed mode:
//!     g' = g + accumulator.increment(cell, option.destination, option.cost)
//!     if g' improves the best known g for that cell → record predecessor, push
//! ```
//!
//! # Slices
//!
//! [`step`][PathTrial::step] runs at most N pops and returns.  The frontier,
//! settled set and predecessor table persist between calls, so a trial can
//! be suspended at any slice boundary and resumed later.  Cancellation is
//! observed at the start of each slice.
//!
//! # Storage
//!
//! Cells are interned into dense `u32` indices on first sight; per-cell
//! search state lives in parallel vectors indexed by that number.  Heap
//! entries carry a push sequence number so equal-priority entries pop in
//! insertion order.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;

use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;
use tracing::{debug, error, trace};

use nav_core::{BudgetMeter, Cell, CostFunctions, ModeType, Path, SearchBudget, Step};

use crate::event::emit_with;
use crate::{
    CancelToken, EventKind, EventSink, FailReason, ModeProvider, NoopSink, SearchError,
    SearchEvent, SearchFlags, SearchResult, Trial, TrialStatus,
};

/// How a settled cell was reached.
#[derive(Clone, Debug)]
struct Predecessor {
    parent: u32,
    delta:  f64,
    mode:   ModeType,
}

pub struct PathTrial {
    origin:      Cell,
    destination: Cell,
    providers:   Vec<Arc<dyn ModeProvider>>,
    costs:       CostFunctions,
    flags:       SearchFlags,
    sink:        Arc<dyn EventSink>,
    cancel:      CancelToken,

    status: TrialStatus,
    meter:  BudgetMeter,
    result: Option<Path>,

    // ── Search state ─────────────────────────────────────────────────────
    frontier: BinaryHeap<Reverse<(OrderedFloat<f64>, u64, u32)>>,
    seq:      u64,
    cells:    Vec<Cell>,
    index:    FxHashMap<Cell, u32>,
    g:        Vec<f64>,
    settled:  Vec<bool>,
    pred:     Vec<Option<Predecessor>>,
    visited:  usize,
}

impl PathTrial {
    pub fn new(
        origin:      Cell,
        destination: Cell,
        providers:   Vec<Arc<dyn ModeProvider>>,
        costs:       CostFunctions,
    ) -> Self {
        Self {
            origin,
            destination,
            providers,
            costs,
            flags:    SearchFlags::default(),
            sink:     Arc::new(NoopSink),
            cancel:   CancelToken::new(),
            status:   TrialStatus::Idle,
            meter:    BudgetMeter::new(SearchBudget::UNLIMITED),
            result:   None,
            frontier: BinaryHeap::new(),
            seq:      0,
            cells:    Vec::new(),
            index:    FxHashMap::default(),
            g:        Vec::new(),
            settled:  Vec::new(),
            pred:     Vec::new(),
            visited:  0,
        }
    }

    pub fn with_flags(mut self, flags: SearchFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_budget(mut self, budget: SearchBudget) -> Self {
        self.meter = BudgetMeter::new(budget);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn origin(&self) -> &Cell {
        &self.origin
    }

    pub fn destination(&self) -> &Cell {
        &self.destination
    }

    pub fn status(&self) -> &TrialStatus {
        &self.status
    }

    /// The path found, once Successful.
    pub fn path(&self) -> Option<&Path> {
        self.result.as_ref()
    }

    pub fn take_path(&mut self) -> Option<Path> {
        self.result.take()
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Cells settled so far.
    pub fn visited(&self) -> usize {
        self.visited
    }

    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    /// Iterations consumed across all slices.
    pub fn iterations(&self) -> u64 {
        self.meter.iterations()
    }

    pub fn elapsed(&self) -> Duration {
        self.meter.elapsed()
    }

    // ── Driving ───────────────────────────────────────────────────────────

    /// Run at most `max_iterations` pops.
    ///
    /// # Errors
    /// A provider fault, an invalid option or a path that fails its own
    /// invariants.  The trial is left in [`TrialStatus::Error`].
    pub fn step(&mut self, max_iterations: u64) -> SearchResult<TrialStatus> {
        if self.status.is_terminal() {
            return Ok(self.status.clone());
        }
        if self.cancel.is_canceled() {
            self.finish(TrialStatus::Canceled);
            return Ok(self.status.clone());
        }
        if self.status == TrialStatus::Idle {
            self.start();
            if self.status.is_terminal() {
                return Ok(self.status.clone());
            }
        }

        for _ in 0..max_iterations {
            if self.meter.exhausted() {
                self.finish(TrialStatus::Failed(FailReason::BudgetExhausted));
                break;
            }
            let Some(Reverse((_, _, node))) = self.frontier.pop() else {
                self.finish(TrialStatus::Failed(FailReason::Unreachable));
                break;
            };
            let n = node as usize;
            if self.settled[n] {
                continue;
            }
            self.settled[n] = true;
            self.visited += 1;
            self.meter.tick();
            emit_with(self.sink.as_ref(), EventKind::Visitation, || SearchEvent::Visitation {
                cell: self.cells[n].clone(),
                g:    self.g[n],
            });

            if self.cells[n] == self.destination {
                match self.reconstruct(node) {
                    Ok(path) => {
                        self.result = Some(path);
                        self.finish(TrialStatus::Successful);
                        break;
                    }
                    Err(e) => return Err(self.fault(e)),
                }
            }
            if let Err(e) = self.expand(node) {
                return Err(self.fault(e));
            }
        }

        if self.status == TrialStatus::Running {
            trace!(
                origin = %self.origin,
                destination = %self.destination,
                visited = self.visited,
                frontier = self.frontier.len(),
                "path trial slice"
            );
        }
        Ok(self.status.clone())
    }

    /// Step until terminal.
    pub fn run(&mut self) -> SearchResult<TrialStatus> {
        while !self.status.is_terminal() {
            self.step(u64::MAX)?;
        }
        Ok(self.status.clone())
    }

    /// Back to Idle with every piece of search state dropped.
    pub fn reset(&mut self) {
        self.status = TrialStatus::Idle;
        self.meter.reset();
        self.result = None;
        self.frontier.clear();
        self.seq = 0;
        self.cells.clear();
        self.index.clear();
        self.g.clear();
        self.settled.clear();
        self.pred.clear();
        self.visited = 0;
    }

    /// Cancel now; a non-terminal trial becomes Canceled immediately.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        if !self.status.is_terminal() {
            self.finish(TrialStatus::Canceled);
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn start(&mut self) {
        self.meter.start();
        self.status = TrialStatus::Running;
        if self.origin == self.destination {
            self.result = Some(Path::stationary(self.origin.clone()));
            self.finish(TrialStatus::Successful);
            return;
        }
        if !self.providers.iter().any(|p| self.flags.allows(p.mode_type())) {
            self.finish(TrialStatus::Failed(FailReason::NoProviders));
            return;
        }
        if !self.origin.same_domain(&self.destination) {
            self.finish(TrialStatus::Failed(FailReason::DomainMismatch));
            return;
        }
        let origin = self.intern(self.origin.clone());
        self.g[origin as usize] = 0.0;
        self.push(origin, 0.0);
    }

    fn finish(&mut self, status: TrialStatus) {
        debug!(
            origin = %self.origin,
            destination = %self.destination,
            status = %status,
            visited = self.visited,
            iterations = self.meter.iterations(),
            "path trial finished"
        );
        self.status = status;
    }

    /// Enter the Error status and hand `e` back to the caller.
    fn fault(&mut self, e: SearchError) -> SearchError {
        error!(
            origin = %self.origin,
            destination = %self.destination,
            error = %e,
            "path trial faulted"
        );
        self.status = TrialStatus::Error(e.to_string());
        e
    }

        fn intern(&mut self, cell: Cell) -> u32 {
        if let Some(&i) = self.index.get(&cell) {
            return i;
        }
        let i = self.cells.len() as u32;
        self.index.insert(cell.clone(), i);
        self.cells.push(cell);
        self.g.push(f64::INFINITY);
        self.settled.push(false);
        self.pred.push(None);
        i
    }

    fn push(&mut self, node: u32, g: f64) {
        let f = self.costs.priority(g, &self.cells[node as usize], &self.destination);
        self.seq += 1;
        self.frontier.push(Reverse((OrderedFloat(f), self.seq, node)));
    }

    fn expand(&mut self, node: u32) -> SearchResult<()> {
        let from = self.cells[node as usize].clone();
        let g_from = self.g[node as usize];

        for p in 0..self.providers.len() {
            let provider = Arc::clone(&self.providers[p]);
            let mode = provider.mode_type();
            if !self.flags.allows(mode) {
                continue;
            }
            let options = match provider.collect_options(&from, &self.flags) {
                Ok(options) => options,
                Err(e) => {
                    emit_with(self.sink.as_ref(), EventKind::ModeFailure, || SearchEvent::ModeFailure {
                        from:   from.clone(),
                        mode,
                        reason: e.to_string(),
                    });
                    return Err(SearchError::Provider { mode, origin: from, message: e.0 });
                }
            };
            if options.is_empty() {
                emit_with(self.sink.as_ref(), EventKind::ModeFailure, || SearchEvent::ModeFailure {
                    from:   from.clone(),
                    mode,
                    reason: "no options".into(),
                });
                continue;
            }
            emit_with(self.sink.as_ref(), EventKind::ModeSuccess, || SearchEvent::ModeSuccess {
                from: from.clone(),
                mode,
                options: options.len(),
            });

            for option in options {
                if !option.cost.is_finite() || option.cost < 0.0 {
                    return Err(SearchError::InvalidOption {
                        mode:        option.mode,
                        destination: option.destination,
                        cost:        option.cost,
                    });
                }
                if !self.flags.allows(option.mode) || !option.destination.same_domain(&from) {
                    continue;
                }
                let delta = self.costs.accumulator.increment(&from, &option.destination, option.cost);
                let candidate = g_from + delta;
                let next = self.intern(option.destination);
                let n = next as usize;
                if self.settled[n] || candidate >= self.g[n] {
                    continue;
                }
                self.g[n] = candidate;
                self.pred[n] = Some(Predecessor { parent: node, delta, mode: option.mode });
                self.push(next, candidate);
                emit_with(self.sink.as_ref(), EventKind::Step, || SearchEvent::Step {
                    from: from.clone(),
                    step: Step::new(self.cells[n].clone(), delta, option.mode),
                });
            }
        }
        Ok(())
    }

    fn reconstruct(&self, node: u32) -> SearchResult<Path> {
        let mut steps = Vec::new();
        let mut cur = node;
        while let Some(p) = &self.pred[cur as usize] {
            steps.push(Step::new(self.cells[cur as usize].clone(), p.delta, p.mode));
            cur = p.parent;
        }
        steps.reverse();
        Path::new(self.origin.clone(), steps).map_err(SearchError::from)
    }
}

impl Trial for PathTrial {
    fn step(&mut self, max_iterations: u64) -> SearchResult<TrialStatus> {
        PathTrial::step(self, max_iterations)
    }

    fn reset(&mut self) {
        PathTrial::reset(self);
    }

    fn cancel(&mut self) {
        PathTrial::cancel(self);
    }

    fn status(&self) -> &TrialStatus {
        &self.status
    }

    fn label(&self) -> String {
        format!("path {} -> {}", self.origin, self.destination)
    }
}
