//! Fluent builder for search sessions.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use nav_core::{Cell, OwnerId, Port, SearchBudget};
use nav_search::{
    CancelToken, EventSink, ItineraryConfig, ItineraryTrial, ModeProvider, NodeWeightFn,
    SearchFlags,
};

use crate::session::SessionState;
use crate::{NavContext, SearchSession, SessionError, SessionHandle, SessionResult};

/// Fluent builder for a [`SearchSession`].
///
/// # Required inputs
///
/// - `origin`, `destination` — the request endpoints
/// - `owner` — who the work is billed to for scheduling fairness
///
/// # Optional inputs (have defaults)
///
/// | Method              | Default                         |
/// |---------------------|---------------------------------|
/// | `.flags(f)`         | `SearchFlags::default()`        |
/// | `.provider(p)`      | none (only port hops possible)  |
/// | `.ports(v)`         | none                            |
/// | `.sink(s)`          | the context's `EventBus`        |
/// | `.node_weight(f)`   | no node penalty                 |
///
/// # Example
///
/// ```rust,ignore
/// let handle = ctx
///     .session()
///     .origin(Cell::new("overworld", 0, 64, 0))
///     .destination(Cell::new("nether", 12, 64, 0))
///     .owner(OwnerId(7))
///     .provider(walk)
///     .ports(ports)
///     .submit()?;
/// ```
pub struct SessionBuilder<'a> {
    ctx:         &'a NavContext,
    origin:      Option<Cell>,
    destination: Option<Cell>,
    owner:       Option<OwnerId>,
    flags:       SearchFlags,
    providers:   Vec<Arc<dyn ModeProvider>>,
    ports:       Vec<Port>,
    sink:        Option<Arc<dyn EventSink>>,
    node_weight: Option<NodeWeightFn>,
}

impl<'a> SessionBuilder<'a> {
    pub fn new(ctx: &'a NavContext) -> Self {
        Self {
            ctx,
            origin:      None,
            destination: None,
            owner:       None,
            flags:       SearchFlags::default(),
            providers:   Vec::new(),
            ports:       Vec::new(),
            sink:        None,
            node_weight: None,
        }
    }

    pub fn origin(mut self, origin: Cell) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn destination(mut self, destination: Cell) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn owner(mut self, owner: OwnerId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn flags(mut self, flags: SearchFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Add one mode provider.
    pub fn provider(mut self, provider: Arc<dyn ModeProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn providers(mut self, providers: impl IntoIterator<Item = Arc<dyn ModeProvider>>) -> Self {
        self.providers.extend(providers);
        self
    }

    /// Ports available to this session; static for its lifetime.
    pub fn ports(mut self, ports: impl IntoIterator<Item = Port>) -> Self {
        self.ports.extend(ports);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Extra cost for entering a port-graph node, e.g. a crowded domain.
    pub fn node_weight(mut self, node_weight: NodeWeightFn) -> Self {
        self.node_weight = Some(node_weight);
        self
    }

    /// Validate inputs and return the session with its caller-side handle.
    ///
    /// The session is not scheduled; drive it through
    /// [`WorkItem::run`][nav_schedule::WorkItem::run] or use
    /// [`submit`][Self::submit].
    pub fn build(self) -> SessionResult<(SearchSession, SessionHandle)> {
        let origin = self.origin.ok_or(SessionError::Missing("origin"))?;
        let destination = self.destination.ok_or(SessionError::Missing("destination"))?;
        let owner = self.owner.ok_or(SessionError::Missing("owner"))?;

        let config = self.ctx.config();
        let timeout = self.flags.timeout(config.default_timeout);
        let trial_config = ItineraryConfig {
            budget:              SearchBudget::UNLIMITED.with_timeout(timeout),
            leg_iteration_cap:   Some(config.leg_iteration_cap),
            max_leg_validations: config.max_legs,
            leg_estimate_weight: config.leg_estimate_weight,
            refine:              config.refine,
        };
        let sink: Arc<dyn EventSink> = match self.sink {
            Some(sink) => sink,
            None => Arc::clone(self.ctx.events()) as Arc<dyn EventSink>,
        };
        let cancel = CancelToken::new();

        let mut trial = ItineraryTrial::new(
            origin.clone(),
            destination.clone(),
            self.ports.into(),
            self.providers,
            config.costs.build(),
        )
        .with_flags(self.flags)
        .with_config(trial_config)
        .with_cache(Arc::clone(self.ctx.cache()))
        .with_sink(Arc::clone(&sink))
        .with_cancel_token(cancel.clone());
        if let Some(node_weight) = self.node_weight {
            trial = trial.with_node_weight(node_weight);
        }

        let id = self.ctx.next_session_id();
        let state = Arc::new(Mutex::new(SessionState::new()));
        let session = SearchSession {
            id,
            owner,
            name: format!("session {} for {owner}", id.0),
            origin: origin.clone(),
            destination: destination.clone(),
            slice: config.slice_iterations,
            trial,
            sink,
            state: Arc::clone(&state),
            seen: 0,
        };
        let handle = SessionHandle {
            id,
            owner,
            origin,
            destination,
            state,
            cancel,
            scheduled: None,
        };
        Ok((session, handle))
    }

    /// Build the session and hand it to the context's work manager.
    pub fn submit(self) -> SessionResult<SessionHandle> {
        let manager = Arc::clone(self.ctx.manager());
        let (session, mut handle) = self.build()?;
        let item = manager.submit(Box::new(session));
        debug!(session = %handle.id, owner = %handle.owner, item = %item, "session submitted");
        handle.scheduled = Some((item, manager));
        Ok(handle)
    }
}
