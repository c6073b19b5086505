//! `SearchSession` — one itinerary request, driven by the work manager.
//!
//! # Lifecycle
//!
//! ```text
//! Pending ──first slice──▶ Running ──▶ Succeeded | Failed | Canceled | Error
//! ```
//!
//! The session is a [`WorkItem`]: each `run` advances its
//! [`ItineraryTrial`] by one slice and copies any newly validated itinerary
//! into state shared with the caller's [`SessionHandle`].
//!
//! # Delivered and prospective itineraries
//!
//! The first validated itinerary is *delivered*.  Later, cheaper ones found
//! by refinement are *prospective*: they are offered alongside the delivered
//! one and never retract it.  [`SessionHandle::itinerary`] returns the
//! cheapest of the two.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{error, info};

use nav_core::{Cell, ItemId, Itinerary, OwnerId, SessionId};
use nav_schedule::{DistributedWorkManager, ScheduleError, WorkError, WorkItem, WorkOutcome, WorkStatus};
use nav_search::{
    CancelToken, EventKind, EventSink, FailReason, ItineraryTrial, SearchEvent, TrialStatus,
};

// ── Status ────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub enum SessionStatus {
    /// Submitted, not yet given a slice.
    Pending,
    Running,
    Succeeded,
    Failed(FailReason),
    Canceled,
    Error(String),
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Pending | SessionStatus::Running)
    }

    fn from_trial(status: &TrialStatus) -> Self {
        match status {
            TrialStatus::Idle                => SessionStatus::Pending,
            TrialStatus::Running             => SessionStatus::Running,
            TrialStatus::Successful          => SessionStatus::Succeeded,
            TrialStatus::Failed(reason)      => SessionStatus::Failed(*reason),
            TrialStatus::Canceled            => SessionStatus::Canceled,
            TrialStatus::Error(message)      => SessionStatus::Error(message.clone()),
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Pending        => f.write_str("pending"),
            SessionStatus::Running        => f.write_str("running"),
            SessionStatus::Succeeded      => f.write_str("succeeded"),
            SessionStatus::Failed(reason) => write!(f, "failed ({reason})"),
            SessionStatus::Canceled       => f.write_str("canceled"),
            SessionStatus::Error(message) => write!(f, "error: {message}"),
        }
    }
}

// ── Shared state ──────────────────────────────────────────────────────────────

#[derive(Debug)]
pub(crate) struct SessionState {
    status:      SessionStatus,
    delivered:   Option<Arc<Itinerary>>,
    prospective: Option<Arc<Itinerary>>,
    started:     Option<Instant>,
    elapsed:     Option<Duration>,
}

impl SessionState {
    pub(crate) fn new() -> Self {
        Self {
            status:      SessionStatus::Pending,
            delivered:   None,
            prospective: None,
            started:     None,
            elapsed:     None,
        }
    }

    fn best(&self) -> Option<&Arc<Itinerary>> {
        self.prospective.as_ref().or(self.delivered.as_ref())
    }

    /// Keep `itinerary` if it is the first or cheaper than the best so far.
    fn offer(&mut self, itinerary: &Arc<Itinerary>) -> bool {
        match self.best() {
            None => {
                self.delivered = Some(Arc::clone(itinerary));
                true
            }
            Some(best) if itinerary.total_cost() < best.total_cost() => {
                self.prospective = Some(Arc::clone(itinerary));
                true
            }
            Some(_) => false,
        }
    }

    fn elapsed(&self) -> Duration {
        self.elapsed
            .or_else(|| self.started.map(|t| t.elapsed()))
            .unwrap_or_default()
    }
}

// ── SearchSession ─────────────────────────────────────────────────────────────

/// The schedulable side of a session.  Built by
/// [`SessionBuilder`][crate::SessionBuilder].
pub struct SearchSession {
    pub(crate) id:          SessionId,
    pub(crate) owner:       OwnerId,
    pub(crate) name:        String,
    pub(crate) origin:      Cell,
    pub(crate) destination: Cell,
    pub(crate) slice:       u64,
    pub(crate) trial:       ItineraryTrial,
    pub(crate) sink:        Arc<dyn EventSink>,
    pub(crate) state:       Arc<Mutex<SessionState>>,
    /// Trial generation last copied into `state`.
    pub(crate) seen:        u64,
}

impl SearchSession {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.state.lock().status.clone()
    }

    fn begin(&mut self) {
        {
            let mut state = self.state.lock();
            if state.status != SessionStatus::Pending {
                return;
            }
            state.status = SessionStatus::Running;
            state.started.get_or_insert_with(Instant::now);
        }
        info!(
            session = %self.id,
            owner = %self.owner,
            origin = %self.origin,
            destination = %self.destination,
            "search session started"
        );
        if self.sink.wants(EventKind::Start) {
            self.sink.emit(&SearchEvent::Start {
                owner:       self.owner,
                origin:      self.origin.clone(),
                destination: self.destination.clone(),
            });
        }
    }

    /// Copy a newly improved itinerary out of the trial.
    fn collect(&mut self) {
        if self.trial.generation() == self.seen {
            return;
        }
        self.seen = self.trial.generation();
        if let Some(best) = self.trial.best() {
            self.state.lock().offer(best);
        }
    }

    /// Move to a terminal status unless one is already set.
    fn conclude(&self, status: SessionStatus) {
        let (status, elapsed, cost) = {
            let mut state = self.state.lock();
            if state.status.is_terminal() {
                return;
            }
            state.elapsed = Some(state.elapsed());
            state.status = status;
            (state.status.clone(), state.elapsed(), state.best().map(|i| i.total_cost()))
        };
        match &status {
            SessionStatus::Error(message) => error!(
                session = %self.id,
                owner = %self.owner,
                item = %self.name,
                error = %message,
                "search session faulted"
            ),
            _ => info!(
                session = %self.id,
                owner = %self.owner,
                status = %status,
                cost = ?cost,
                elapsed_ms = elapsed.as_millis() as u64,
                "search session finished"
            ),
        }
    }
}

impl WorkItem for SearchSession {
    fn name(&self) -> &str {
        &self.name
    }

    fn owner(&self) -> OwnerId {
        self.owner
    }

    fn run(&mut self) -> Result<WorkStatus, WorkError> {
        self.begin();
        let status = match self.trial.step(self.slice) {
            Ok(status) => status,
            Err(e) => {
                self.collect();
                self.conclude(SessionStatus::Error(e.to_string()));
                return Err(WorkError::new(e.to_string()));
            }
        };
        self.collect();
        if status.is_terminal() {
            self.conclude(SessionStatus::from_trial(&status));
            Ok(WorkStatus::Done)
        } else {
            Ok(WorkStatus::NotDone)
        }
    }

    fn reset(&mut self) {
        self.trial.reset();
        self.seen = 0;
    }

    fn retire(&mut self, outcome: &WorkOutcome) {
        match outcome {
            WorkOutcome::Completed => {}
            WorkOutcome::Canceled => {
                self.trial.cancel();
                self.conclude(SessionStatus::Canceled);
            }
            WorkOutcome::Error(message) => self.conclude(SessionStatus::Error(message.clone())),
        }
    }
}

// ── SessionHandle ─────────────────────────────────────────────────────────────

/// The caller's view of a session: status, results and cancellation.
///
/// Cheap to clone; every clone observes the same session.
#[derive(Clone)]
pub struct SessionHandle {
    pub(crate) id:          SessionId,
    pub(crate) owner:       OwnerId,
    pub(crate) origin:      Cell,
    pub(crate) destination: Cell,
    pub(crate) state:       Arc<Mutex<SessionState>>,
    pub(crate) cancel:      CancelToken,
    pub(crate) scheduled:   Option<(ItemId, Arc<DistributedWorkManager>)>,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    pub fn origin(&self) -> &Cell {
        &self.origin
    }

    pub fn destination(&self) -> &Cell {
        &self.destination
    }

    /// Work-manager item id, if the session was submitted.
    pub fn item(&self) -> Option<ItemId> {
        self.scheduled.as_ref().map(|(id, _)| *id)
    }

    pub fn status(&self) -> SessionStatus {
        self.state.lock().status.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.state.lock().status.is_terminal()
    }

    /// Cheapest itinerary validated so far.
    pub fn itinerary(&self) -> Option<Arc<Itinerary>> {
        self.state.lock().best().cloned()
    }

    /// First itinerary delivered.
    pub fn delivered(&self) -> Option<Arc<Itinerary>> {
        self.state.lock().delivered.clone()
    }

    /// Cheaper itinerary found after delivery, if any.
    pub fn prospective(&self) -> Option<Arc<Itinerary>> {
        self.state.lock().prospective.clone()
    }

    /// Time spent searching; frozen once the session finishes.
    pub fn elapsed(&self) -> Duration {
        self.state.lock().elapsed()
    }

    /// Request cancellation.  The search observes it at its next slice
    /// boundary; a scheduled session also releases its manager slot now.
    ///
    /// Returns `false` if the session had already finished.
    pub fn cancel(&self) -> bool {
        if self.is_finished() {
            return false;
        }
        self.cancel.cancel();
        if let Some((item, manager)) = &self.scheduled {
            match manager.cancel(*item) {
                Ok(()) | Err(ScheduleError::UnknownItem(_)) => {}
                Err(e) => error!(session = %self.id, error = %e, "failed to cancel work item"),
            }
        }
        true
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("status", &self.status())
            .finish()
    }
}
