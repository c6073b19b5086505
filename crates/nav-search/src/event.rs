//! Search lifecycle events and their delivery.
//!
//! Trials and sessions report progress through an [`EventSink`].  Emission
//! is fire-and-forget: sinks must not block, and nothing a sink does can
//! change a search outcome.  Producers ask [`EventSink::wants`] before
//! building high-volume events (visitations, steps) so an uninterested sink
//! costs almost nothing.
//!
//! [`EventBus`] fans events out to any number of subscribers, each
//! registered for a set of [`EventKind`]s; a subscriber only ever sees the
//! kinds it registered for.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use nav_core::{Cell, Itinerary, ModeType, OwnerId, Step};

// ── Event types ───────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Start,
    Visitation,
    ModeSuccess,
    ModeFailure,
    Step,
    LegStart,
    LegStop,
    ItineraryStart,
    ItineraryStop,
    FoundSolution,
}

impl EventKind {
    pub const ALL: [EventKind; 10] = [
        EventKind::Start,
        EventKind::Visitation,
        EventKind::ModeSuccess,
        EventKind::ModeFailure,
        EventKind::Step,
        EventKind::LegStart,
        EventKind::LegStop,
        EventKind::ItineraryStart,
        EventKind::ItineraryStop,
        EventKind::FoundSolution,
    ];

    #[inline]
    fn bit(self) -> u16 {
        1 << self as u16
    }
}

/// A set of [`EventKind`]s.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct EventKinds(u16);

impl EventKinds {
    pub const NONE: EventKinds = EventKinds(0);
    pub const ALL: EventKinds = EventKinds(0b11_1111_1111);

    pub fn of(kinds: &[EventKind]) -> Self {
        kinds.iter().copied().collect()
    }

    #[inline]
    pub fn contains(self, kind: EventKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn with(self, kind: EventKind) -> Self {
        EventKinds(self.0 | kind.bit())
    }

    pub fn union(self, other: EventKinds) -> Self {
        EventKinds(self.0 | other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl FromIterator<EventKind> for EventKinds {
    fn from_iter<I: IntoIterator<Item = EventKind>>(iter: I) -> Self {
        iter.into_iter().fold(EventKinds::NONE, EventKinds::with)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SearchEvent {
    /// A session began searching.
    Start { owner: OwnerId, origin: Cell, destination: Cell },
    /// A local search settled `cell` at cost `g`.
    Visitation { cell: Cell, g: f64 },
    /// A provider offered at least one option from `from`.
    ModeSuccess { from: Cell, mode: ModeType, options: usize },
    /// A provider offered nothing from `from`, or faulted.
    ModeFailure { from: Cell, mode: ModeType, reason: String },
    /// A local search found a cheaper way to reach `step.cell`.
    Step { from: Cell, step: Step },
    LegStart { origin: Cell, destination: Cell },
    /// `cost` is `None` when the leg could not be validated.
    LegStop { origin: Cell, destination: Cell, cost: Option<f64> },
    ItineraryStart { origin: Cell, destination: Cell },
    ItineraryStop { origin: Cell, destination: Cell, succeeded: bool },
    /// A validated itinerary.  `prospective` is set when it supersedes one
    /// that was already delivered.
    FoundSolution { itinerary: Arc<Itinerary>, prospective: bool },
}

impl SearchEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SearchEvent::Start { .. }          => EventKind::Start,
            SearchEvent::Visitation { .. }     => EventKind::Visitation,
            SearchEvent::ModeSuccess { .. }    => EventKind::ModeSuccess,
            SearchEvent::ModeFailure { .. }    => EventKind::ModeFailure,
            SearchEvent::Step { .. }           => EventKind::Step,
            SearchEvent::LegStart { .. }       => EventKind::LegStart,
            SearchEvent::LegStop { .. }        => EventKind::LegStop,
            SearchEvent::ItineraryStart { .. } => EventKind::ItineraryStart,
            SearchEvent::ItineraryStop { .. }  => EventKind::ItineraryStop,
            SearchEvent::FoundSolution { .. }  => EventKind::FoundSolution,
        }
    }
}

// ── Sinks ─────────────────────────────────────────────────────────────────────

/// Receiver of search events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &SearchEvent);

    /// Whether events of `kind` are worth building.  Default: all.
    fn wants(&self, _kind: EventKind) -> bool {
        true
    }
}

/// Build and emit an event only if the sink wants its kind.
#[inline]
pub(crate) fn emit_with(sink: &dyn EventSink, kind: EventKind, build: impl FnOnce() -> SearchEvent) {
    if sink.wants(kind) {
        sink.emit(&build());
    }
}

/// Discards everything.
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: &SearchEvent) {}

    fn wants(&self, _kind: EventKind) -> bool {
        false
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Fans events out to subscribers by kind.
#[derive(Default)]
pub struct EventBus {
    inner: RwLock<BusInner>,
}

#[derive(Default)]
struct BusInner {
    next_id:     u64,
    subscribers: Vec<(SubscriptionId, EventKinds, Arc<dyn EventSink>)>,
    /// Union of every subscriber's kinds.
    wanted:      EventKinds,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, kinds: EventKinds, sink: Arc<dyn EventSink>) -> SubscriptionId {
        let mut inner = self.inner.write();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.subscribers.push((id, kinds, sink));
        inner.wanted = inner.wanted.union(kinds);
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.write();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|(sid, _, _)| *sid != id);
        inner.wanted = inner
            .subscribers
            .iter()
            .fold(EventKinds::NONE, |acc, (_, kinds, _)| acc.union(*kinds));
        inner.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.read().subscribers.len()
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: &SearchEvent) {
        let kind = event.kind();
        let inner = self.inner.read();
        for (_, kinds, sink) in &inner.subscribers {
            if kinds.contains(kind) {
                sink.emit(event);
            }
        }
    }

    fn wants(&self, kind: EventKind) -> bool {
        self.inner.read().wanted.contains(kind)
    }
}

/// Collects every event it receives, for telemetry and tests.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SearchEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SearchEvent> {
        self.events.lock().clone()
    }

    pub fn take(&self) -> Vec<SearchEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events.lock().iter().filter(|e| e.kind() == kind).count()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().iter().map(SearchEvent::kind).collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &SearchEvent) {
        self.events.lock().push(event.clone());
    }
}
