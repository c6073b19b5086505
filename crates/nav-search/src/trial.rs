//! Shared trial vocabulary: status, failure reasons, cancellation.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::SearchResult;

/// Why a trial ended as Failed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FailReason {
    /// No mode providers were supplied.
    NoProviders,
    /// Origin and destination are in different domains.
    DomainMismatch,
    /// The frontier ran dry before reaching the destination.
    Unreachable,
    /// Every candidate route through the port graph failed validation.
    NoRoute,
    /// The iteration or wall-clock budget ran out.
    BudgetExhausted,
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailReason::NoProviders     => "no mode providers",
            FailReason::DomainMismatch  => "origin and destination are in different domains",
            FailReason::Unreachable     => "destination unreachable",
            FailReason::NoRoute         => "no route remains",
            FailReason::BudgetExhausted => "search budget exhausted",
        })
    }
}

/// Lifecycle of a trial.
///
/// `Idle → Running → {Successful, Failed, Canceled, Error}`.  Terminal states
/// are final until an explicit reset.
#[derive(Clone, Debug, PartialEq)]
pub enum TrialStatus {
    Idle,
    Running,
    Successful,
    Failed(FailReason),
    Canceled,
    /// Internal fault, with the error message.
    Error(String),
}

impl TrialStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TrialStatus::Idle | TrialStatus::Running)
    }

    pub fn is_successful(&self) -> bool {
        matches!(self, TrialStatus::Successful)
    }
}

impl fmt::Display for TrialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrialStatus::Idle       => f.write_str("idle"),
            TrialStatus::Running    => f.write_str("running"),
            TrialStatus::Successful => f.write_str("successful"),
            TrialStatus::Failed(r)  => write!(f, "failed ({r})"),
            TrialStatus::Canceled   => f.write_str("canceled"),
            TrialStatus::Error(e)   => write!(f, "error ({e})"),
        }
    }
}

/// Cross-thread cancellation flag, observed at the next slice boundary.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A resumable search driven in bounded slices.
pub trait Trial: Send {
    /// Run at most `max_iterations` iterations.
    ///
    /// # Errors
    /// An internal fault.  The trial is left in [`TrialStatus::Error`].
    fn step(&mut self, max_iterations: u64) -> SearchResult<TrialStatus>;

    /// Return to a fresh Idle state.
    fn reset(&mut self);

    /// Stop now.  Non-terminal trials become Canceled.
    fn cancel(&mut self);

    fn status(&self) -> &TrialStatus;

    /// Short human-readable label for logs and scheduler reports.
    fn label(&self) -> String;
}
