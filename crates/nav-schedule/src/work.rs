//! The unit of resumable computation driven by the work manager.

use nav_core::OwnerId;

use crate::{WorkError, WorkOutcome};

/// Result of one `run` slice.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WorkStatus {
    /// Finished; the manager retires the item.
    Done,
    /// More work remains; run again on a later pass.
    NotDone,
}

impl WorkStatus {
    #[inline]
    pub fn is_done(self) -> bool {
        matches!(self, WorkStatus::Done)
    }
}

/// A named unit of resumable computation billed to an owner.
///
/// The manager never runs an item concurrently with itself.  Each `run`
/// should perform a bounded slice of work and return.
pub trait WorkItem: Send {
    fn name(&self) -> &str;

    fn owner(&self) -> OwnerId;

    /// Perform one slice.
    fn run(&mut self) -> Result<WorkStatus, WorkError>;

    /// Discard all progress.  Called before the first slice after the
    /// manager deactivated the item to make room for another owner.
    fn reset(&mut self);

    /// Called exactly once when the item leaves the manager for good.
    fn retire(&mut self, _outcome: &WorkOutcome) {}
}
