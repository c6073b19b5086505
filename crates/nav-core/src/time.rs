//! Host ticks and search budgets.
//!
//! # Ticks
//!
//! The host advances a monotonically increasing [`Tick`] counter (one per
//! game/server frame).  The executor uses ticks for repeating tasks; search
//! code never reads the host clock directly.
//!
//! # Budgets
//!
//! Every trial carries a [`SearchBudget`]: an optional cap on total
//! iterations and an optional wall-clock timeout.  Exhausting either ends
//! the trial as *Failed*, never *Error*.  The timeout clock starts on the
//! first slice, not on construction, so time spent waiting for a scheduler
//! slot does not count against the search.

use std::fmt;
use std::time::{Duration, Instant};

// ── Tick ─────────────────────────────────────────────────────────────────────

/// An absolute host tick counter.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    /// Return the tick `n` steps after `self`.
    #[inline]
    pub fn offset(self, n: u64) -> Tick {
        Tick(self.0 + n)
    }

    /// Ticks elapsed from `earlier` to `self`.
    #[inline]
    pub fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl std::ops::Add<u64> for Tick {
    type Output = Tick;
    #[inline]
    fn add(self, rhs: u64) -> Tick {
        Tick(self.0 + rhs)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ── SearchBudget ──────────────────────────────────────────────────────────────

/// Total effort a trial may spend before giving up.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchBudget {
    /// Maximum iterations across all slices.  `None` = unlimited.
    pub max_iterations: Option<u64>,
    /// Maximum wall-clock time from the first slice.  `None` = unlimited.
    pub timeout: Option<Duration>,
}

impl SearchBudget {
    pub const UNLIMITED: SearchBudget = SearchBudget { max_iterations: None, timeout: None };

    pub fn iterations(max: u64) -> Self {
        Self { max_iterations: Some(max), timeout: None }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Tracks consumption of a [`SearchBudget`] across slices.
#[derive(Clone, Debug, Default)]
pub struct BudgetMeter {
    budget:     SearchBudget,
    iterations: u64,
    started:    Option<Instant>,
}

impl BudgetMeter {
    pub fn new(budget: SearchBudget) -> Self {
        Self { budget, iterations: 0, started: None }
    }

    pub fn budget(&self) -> SearchBudget {
        self.budget
    }

    /// Start the wall clock if this is the first slice.
    pub fn start(&mut self) {
        self.started.get_or_insert_with(Instant::now);
    }

    /// Count one iteration.
    #[inline]
    pub fn tick(&mut self) {
        self.iterations += 1;
    }

    /// Count `n` iterations spent elsewhere (e.g. by a nested trial).
    #[inline]
    pub fn add(&mut self, n: u64) {
        self.iterations += n;
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Wall-clock time since the first slice.
    pub fn elapsed(&self) -> Duration {
        self.started.map(|t| t.elapsed()).unwrap_or_default()
    }

    pub fn exhausted(&self) -> bool {
        if self.budget.max_iterations.is_some_and(|max| self.iterations >= max) {
            return true;
        }
        match (self.budget.timeout, self.started) {
            (Some(limit), Some(start)) => start.elapsed() >= limit,
            _ => false,
        }
    }

    /// What is left of the budget, for handing to a nested search.
    pub fn remaining(&self) -> SearchBudget {
        SearchBudget {
            max_iterations: self.budget.max_iterations.map(|max| max.saturating_sub(self.iterations)),
            timeout:        self.budget.timeout.map(|limit| limit.saturating_sub(self.elapsed())),
        }
    }

    /// Forget all consumption; used by trial resets.
    pub fn reset(&mut self) {
        self.iterations = 0;
        self.started = None;
    }
}
