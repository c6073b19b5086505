//! Costed movement sequences.
//!
//! A [`Path`] is an origin cell followed by zero or more [`Step`]s.  Each step
//! records the *incremental* cost of reaching its cell from the previous one,
//! and the path caches the total.  Construction rejects negative or
//! non-finite deltas, which keeps two invariants true for every `Path` value:
//!
//! - `cost() == steps().map(|s| s.delta).sum()`
//! - the running cost along the steps never decreases.

use crate::{Cell, ModeType, ModeTypeGroup, NavError, NavResult};

/// Tolerance used when re-checking a stored total against its deltas.
pub const COST_EPSILON: f64 = 1e-6;

// ── Step ──────────────────────────────────────────────────────────────────────

/// One move: the cell reached, what it cost, and how the agent got there.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Step {
    pub cell:  Cell,
    pub delta: f64,
    pub mode:  ModeType,
}

impl Step {
    pub fn new(cell: Cell, delta: f64, mode: ModeType) -> Self {
        Self { cell, delta, mode }
    }
}

// ── Path ──────────────────────────────────────────────────────────────────────

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Path {
    origin: Cell,
    steps:  Vec<Step>,
    cost:   f64,
}

impl Path {
    /// A zero-length path that never leaves `origin`.
    pub fn stationary(origin: Cell) -> Self {
        Self { origin, steps: Vec::new(), cost: 0.0 }
    }

    /// Build a path from `origin` and `steps`, summing the deltas.
    pub fn new(origin: Cell, steps: Vec<Step>) -> NavResult<Self> {
        let mut path = Path::stationary(origin);
        path.steps.reserve(steps.len());
        for step in steps {
            path.push(step)?;
        }
        Ok(path)
    }

    /// A one-step path whose delta the caller has already validated.
    pub(crate) fn single(origin: Cell, step: Step) -> Self {
        Self { origin, cost: step.delta, steps: vec![step] }
    }

    /// Append one step.
    ///
    /// # Errors
    /// [`NavError::InvalidPath`] if `step.delta` is negative or not finite.
    pub fn push(&mut self, step: Step) -> NavResult<()> {
        if !step.delta.is_finite() || step.delta < 0.0 {
            return Err(NavError::InvalidPath(format!(
                "step to {} has invalid delta {}",
                step.cell, step.delta
            )));
        }
        self.cost += step.delta;
        self.steps.push(step);
        Ok(())
    }

    /// Join `next` onto the end of this path.
    ///
    /// # Errors
    /// [`NavError::InvalidPath`] if `next` does not start where `self` ends.
    pub fn concat(mut self, next: Path) -> NavResult<Path> {
        if next.origin != *self.destination() {
            return Err(NavError::InvalidPath(format!(
                "cannot join path ending at {} to path starting at {}",
                self.destination(),
                next.origin
            )));
        }
        for step in next.steps {
            self.push(step)?;
        }
        Ok(self)
    }

    #[inline]
    pub fn origin(&self) -> &Cell {
        &self.origin
    }

    /// The last cell reached, or the origin for a stationary path.
    #[inline]
    pub fn destination(&self) -> &Cell {
        self.steps.last().map(|s| &s.cell).unwrap_or(&self.origin)
    }

    #[inline]
    pub fn cost(&self) -> f64 {
        self.cost
    }

    #[inline]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Number of steps (not cells).
    #[inline]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[inline]
    pub fn is_stationary(&self) -> bool {
        self.steps.is_empty()
    }

    /// Origin followed by every step's cell.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        std::iter::once(&self.origin).chain(self.steps.iter().map(|s| &s.cell))
    }

    /// Running total after each step.
    pub fn cumulative_costs(&self) -> impl Iterator<Item = f64> + '_ {
        self.steps.iter().scan(0.0, |acc, s| {
            *acc += s.delta;
            Some(*acc)
        })
    }

    /// The set of movement kinds used along the path.
    pub fn modes(&self) -> ModeTypeGroup {
        self.steps.iter().map(|s| s.mode).collect()
    }

    /// Re-check the cost invariants.  Used on values that crossed a trust
    /// boundary (deserialized or cached records).
    pub fn validate(&self) -> NavResult<()> {
        let mut sum = 0.0;
        for step in &self.steps {
            if !step.delta.is_finite() || step.delta < 0.0 {
                return Err(NavError::InvalidPath(format!(
                    "step to {} has invalid delta {}",
                    step.cell, step.delta
                )));
            }
            sum += step.delta;
        }
        if (sum - self.cost).abs() > COST_EPSILON {
            return Err(NavError::InvalidPath(format!(
                "stored cost {} does not match step total {}",
                self.cost, sum
            )));
        }
        Ok(())
    }
}
