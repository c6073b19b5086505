//! `ItineraryTrial`: cross-domain search over a port graph.
//!
//! # Port graph
//!
//! Nodes are the overall origin and destination plus every port endpoint.
//! Edges are:
//!
//! * one edge per registered port, weighted by the port's cost;
//! * one *leg* edge between every ordered pair of nodes in the same domain,
//!   weighted by the heuristic estimate times `leg_estimate_weight` until a
//!   [`PathTrial`] validates it, then by the validated path cost.
//!
//! # Plan / validate loop
//!
//! ```text
//! Plan:     Dijkstra over the port graph → candidate route (None → Failed)
//! Validate: for each unvalidated leg on the route
//!               cache hit  → accept the cached path
//!               otherwise  → drive a PathTrial in slices
//!                   Successful → accept, report to the cache
//!                   Failed     → mark the leg impassable, back to Plan
//!           all legs valid → assemble the itinerary and deliver it
//! ```
//!
//! Validated legs are memoized, so rerouting never repeats work.
//!
//! # Refinement
//!
//! With `refine` set (the default), delivery does not end the trial: it
//! keeps planning while Dijkstra still reports a route whose partly
//! estimated cost is below the best validated one.  A cheaper validated
//! route replaces the best itinerary and bumps [`generation`][ItineraryTrial::generation];
//! the session surfaces it as a prospective itinerary.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, error, warn};

use nav_core::path::COST_EPSILON;
use nav_core::{
    BudgetMeter, Cell, CostFunctions, GraphEdgeId, Itinerary, ItineraryBuilder, ModeTypeGroup,
    Path, Port, SearchBudget,
};
use nav_graph::{GraphWeights, WeightedGraph};

use crate::event::emit_with;
use crate::provider::allowed_modes;
use crate::{
    CancelToken, EventKind, EventSink, FailReason, ModeProvider, NoPathCache, NoopSink, PathKey,
    PathRecord, PathRecordManager, PathTrial, SearchError, SearchEvent, SearchFlags, SearchResult,
    Trial, TrialStatus,
};

/// Extra cost for entering a port-graph node.
pub type NodeWeightFn = Arc<dyn Fn(&Cell) -> f64 + Send + Sync>;

/// Tuning for one itinerary search.
#[derive(Clone, Debug, PartialEq)]
pub struct ItineraryConfig {
    /// Whole-trial budget, leg searches included.
    pub budget: SearchBudget,
    /// Iteration cap for each leg's [`PathTrial`].
    pub leg_iteration_cap: Option<u64>,
    /// Maximum number of legs validated before giving up.
    pub max_leg_validations: usize,
    /// Multiplier applied to heuristic leg estimates.
    pub leg_estimate_weight: f64,
    /// Keep searching for cheaper routes after the first delivery.
    pub refine: bool,
}

impl Default for ItineraryConfig {
    fn default() -> Self {
        Self {
            budget:              SearchBudget::UNLIMITED,
            leg_iteration_cap:   Some(100_000),
            max_leg_validations: 64,
            leg_estimate_weight: 1.0,
            refine:              true,
        }
    }
}

#[derive(Clone, Debug)]
enum RouteEdge {
    /// Index into the port list.
    Port(usize),
    Leg { estimate: f64, validated: Option<f64> },
}

struct RouteWeights<'a> {
    ports:       &'a [Port],
    node_weight: Option<&'a NodeWeightFn>,
}

impl GraphWeights<Cell, RouteEdge> for RouteWeights<'_> {
    fn node_weight(&self, cell: &Cell) -> f64 {
        self.node_weight.map_or(0.0, |f| f(cell))
    }

    fn edge_length(&self, edge: &RouteEdge) -> f64 {
        match edge {
            RouteEdge::Port(i) => self.ports.get(*i).map_or(f64::INFINITY, Port::cost),
            RouteEdge::Leg { estimate, validated } => validated.unwrap_or(*estimate),
        }
    }
}

enum Phase {
    Plan,
    Validate {
        route: Vec<GraphEdgeId>,
        /// Leg currently being searched.
        leg:   Option<(GraphEdgeId, PathTrial)>,
    },
}

pub struct ItineraryTrial {
    origin:      Cell,
    destination: Cell,
    ports:       Arc<[Port]>,
    providers:   Vec<Arc<dyn ModeProvider>>,
    costs:       CostFunctions,
    flags:       SearchFlags,
    config:      ItineraryConfig,
    cache:       Arc<dyn PathRecordManager>,
    sink:        Arc<dyn EventSink>,
    cancel:      CancelToken,
    node_weight: Option<NodeWeightFn>,

    status: TrialStatus,
    meter:  BudgetMeter,
    modes:  ModeTypeGroup,
    graph:  WeightedGraph<Cell, RouteEdge>,
    legs:   FxHashMap<GraphEdgeId, Path>,
    phase:  Phase,

    best:            Option<Arc<Itinerary>>,
    best_route_cost: f64,
    generation:      u64,
    legs_validated:  usize,
    routes_planned:  usize,
}

impl ItineraryTrial {
    pub fn new(
        origin:      Cell,
        destination: Cell,
        ports:       Arc<[Port]>,
        providers:   Vec<Arc<dyn ModeProvider>>,
        costs:       CostFunctions,
    ) -> Self {
        let config = ItineraryConfig::default();
        Self {
            origin,
            destination,
            ports,
            providers,
            costs,
            flags:       SearchFlags::default(),
            meter:       BudgetMeter::new(config.budget),
            config,
            cache:       Arc::new(NoPathCache),
            sink:        Arc::new(NoopSink),
            cancel:      CancelToken::new(),
            node_weight: None,
            status:      TrialStatus::Idle,
            modes:       ModeTypeGroup::EMPTY,
            graph:       WeightedGraph::new(),
            legs:        FxHashMap::default(),
            phase:       Phase::Plan,
            best:            None,
            best_route_cost: f64::INFINITY,
            generation:      0,
            legs_validated:  0,
            routes_planned:  0,
        }
    }

    pub fn with_flags(mut self, flags: SearchFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_config(mut self, config: ItineraryConfig) -> Self {
        self.meter = BudgetMeter::new(config.budget);
        self.config = config;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn PathRecordManager>) -> Self {
        self.cache = cache;
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

    pub fn with_node_weight(mut self, node_weight: NodeWeightFn) -> Self {
        self.node_weight = Some(node_weight);
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

    /// Cheapest validated itinerary so far.
    pub fn best(&self) -> Option<&Arc<Itinerary>> {
        self.best.as_ref()
    }

    /// Number of times [`best`][Self::best] has improved.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn legs_validated(&self) -> usize {
        self.legs_validated
    }

    pub fn routes_planned(&self) -> usize {
        self.routes_planned
    }

    pub fn iterations(&self) -> u64 {
        self.meter.iterations()
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// `(nodes, edges)` of the port graph; zero before the first slice.
    pub fn graph_size(&self) -> (usize, usize) {
        (self.graph.node_count(), self.graph.edge_count())
    }

    // ── Driving ───────────────────────────────────────────────────────────

    /// Spend at most `max_iterations` iterations (leg searches included).
    ///
    /// # Errors
    /// Provider faults, malformed cached records and graph faults.  The
    /// trial is left in [`TrialStatus::Error`].
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
        }

        let mut remaining = max_iterations;
        while remaining > 0 && self.status == TrialStatus::Running {
            if self.meter.exhausted() {
                self.conclude(FailReason::BudgetExhausted);
                break;
            }
            let phase = std::mem::replace(&mut self.phase, Phase::Plan);
            let next = match phase {
                Phase::Plan => {
                    remaining -= 1;
                    self.meter.tick();
                    Ok(self.plan())
                }
                Phase::Validate { route, leg } => self.validate(route, leg, &mut remaining),
            };
            match next {
                Ok(next) => self.phase = next,
                Err(e) => {
                    error!(
                        origin = %self.origin,
                        destination = %self.destination,
                        error = %e,
                        "itinerary trial faulted"
                    );
                    self.status = TrialStatus::Error(e.to_string());
                    self.emit_stop(false);
                    return Err(e);
                }
            }
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

    /// Back to Idle; the graph, memoized legs and best itinerary are dropped.
    pub fn reset(&mut self) {
        self.status = TrialStatus::Idle;
        self.meter.reset();
        self.graph = WeightedGraph::new();
        self.legs.clear();
        self.phase = Phase::Plan;
        self.best = None;
        self.best_route_cost = f64::INFINITY;
        self.generation = 0;
        self.legs_validated = 0;
        self.routes_planned = 0;
    }

    pub fn cancel(&mut self) {
        self.cancel.cancel();
        if !self.status.is_terminal() {
            self.finish(TrialStatus::Canceled);
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    fn start(&mut self) {
        self.meter.start();
        self.status = TrialStatus::Running;
        self.modes = allowed_modes(&self.providers, &self.flags);
        emit_with(self.sink.as_ref(), EventKind::ItineraryStart, || SearchEvent::ItineraryStart {
            origin:      self.origin.clone(),
            destination: self.destination.clone(),
        });

        if self.origin == self.destination {
            self.offer(Itinerary::stationary(self.origin.clone()), 0.0);
            self.finish(TrialStatus::Successful);
            return;
        }
        self.build_graph();
        self.phase = Phase::Plan;
        debug!(
            origin = %self.origin,
            destination = %self.destination,
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            "built port graph"
        );
    }

    fn build_graph(&mut self) {
        let mut graph = WeightedGraph::new();
        graph.add_node(self.origin.clone());
        graph.add_node(self.destination.clone());
        for (i, port) in self.ports.iter().enumerate() {
            if port.is_stationary() {
                continue;
            }
            graph.add_edge(port.origin().clone(), port.destination().clone(), RouteEdge::Port(i));
        }

        let endpoints: Vec<Cell> = graph.nodes().to_vec();
        for a in &endpoints {
            if *a == self.destination {
                continue;
            }
            for b in &endpoints {
                if a == b || *b == self.origin || !a.same_domain(b) {
                    continue;
                }
                let estimate = self.costs.heuristic.estimate(a, b) * self.config.leg_estimate_weight;
                graph.add_edge(a.clone(), b.clone(), RouteEdge::Leg { estimate, validated: None });
            }
        }
        self.graph = graph;
    }

    /// End with Successful if anything was delivered, otherwise Failed.
    fn conclude(&mut self, reason: FailReason) {
        if self.best.is_some() {
            self.finish(TrialStatus::Successful);
        } else {
            self.finish(TrialStatus::Failed(reason));
        }
    }

    fn finish(&mut self, status: TrialStatus) {
        debug!(
            origin = %self.origin,
            destination = %self.destination,
            status = %status,
            routes = self.routes_planned,
            legs = self.legs_validated,
            "itinerary trial finished"
        );
        self.status = status;
        self.emit_stop(self.status.is_successful());
    }

    fn emit_stop(&self, succeeded: bool) {
        emit_with(self.sink.as_ref(), EventKind::ItineraryStop, || SearchEvent::ItineraryStop {
            origin:      self.origin.clone(),
            destination: self.destination.clone(),
            succeeded,
        });
    }

    // ── Plan ──────────────────────────────────────────────────────────────

    fn weights(&self) -> RouteWeights<'_> {
        RouteWeights { ports: &self.ports, node_weight: self.node_weight.as_ref() }
    }

    fn plan(&mut self) -> Phase {
        let Some(route) = self.graph.find_minimum_path(&self.origin, &self.destination, &self.weights())
        else {
            self.conclude(FailReason::NoRoute);
            return Phase::Plan;
        };
        if route.cost >= self.best_route_cost - COST_EPSILON {
            // Nothing left that could beat the delivered itinerary.
            self.finish(TrialStatus::Successful);
            return Phase::Plan;
        }
        self.routes_planned += 1;
        debug!(estimated_cost = route.cost, hops = route.edges.len(), "planned candidate route");
        Phase::Validate { route: route.edges, leg: None }
    }

    // ── Validate ──────────────────────────────────────────────────────────

    fn validate(
        &mut self,
        route:     Vec<GraphEdgeId>,
        leg:       Option<(GraphEdgeId, PathTrial)>,
        remaining: &mut u64,
    ) -> SearchResult<Phase> {
        let (edge, mut trial) = match leg {
            Some(leg) => leg,
            None => {
                let Some(edge) = self.next_unvalidated(&route) else {
                    self.deliver(&route)?;
                    return Ok(Phase::Plan);
                };
                if self.legs_validated >= self.config.max_leg_validations {
                    self.conclude(FailReason::BudgetExhausted);
                    return Ok(Phase::Plan);
                }
                *remaining -= 1;
                self.meter.tick();

                let (a, b) = self.endpoints(edge)?;
                let key = PathKey { origin: a.clone(), destination: b.clone(), modes: self.modes };
                if let Some(record) = self.cache.lookup(&key)? {
                    record.check(&key)?;
                    self.accept_leg(edge, record.path)?;
                    return Ok(Phase::Validate { route, leg: None });
                }

                emit_with(self.sink.as_ref(), EventKind::LegStart, || SearchEvent::LegStart {
                    origin:      a.clone(),
                    destination: b.clone(),
                });
                let trial = PathTrial::new(a, b, self.providers.clone(), self.costs.clone())
                    .with_flags(self.flags.clone())
                    .with_budget(self.leg_budget())
                    .with_sink(Arc::clone(&self.sink))
                    .with_cancel_token(self.cancel.clone());
                (edge, trial)
            }
        };

        let before = trial.iterations();
        let status = trial.step(*remaining)?;
        let used = trial.iterations() - before;
        self.meter.add(used);
        *remaining = remaining.saturating_sub(used.max(1));

        match status {
            TrialStatus::Idle | TrialStatus::Running => {
                Ok(Phase::Validate { route, leg: Some((edge, trial)) })
            }
            TrialStatus::Successful => {
                let Some(path) = trial.take_path() else {
                    return Err(SearchError::LegFault(format!("{} finished without a path", trial.label())));
                };
                let record = PathRecord::new(path.clone(), self.modes, trial.elapsed());
                if let Err(e) = self.cache.report(record) {
                    warn!(error = %e, "failed to report path record");
                }
                self.emit_leg_stop(trial.origin(), trial.destination(), Some(path.cost()));
                self.accept_leg(edge, path)?;
                Ok(Phase::Validate { route, leg: None })
            }
            TrialStatus::Failed(reason) => {
                self.emit_leg_stop(trial.origin(), trial.destination(), None);
                if reason == FailReason::BudgetExhausted && self.meter.exhausted() {
                    self.conclude(FailReason::BudgetExhausted);
                    return Ok(Phase::Plan);
                }
                self.graph.set_passable(edge, false)?;
                debug!(
                    origin = %trial.origin(),
                    destination = %trial.destination(),
                    reason = %reason,
                    "leg failed; rerouting"
                );
                Ok(Phase::Plan)
            }
            TrialStatus::Canceled => {
                self.finish(TrialStatus::Canceled);
                Ok(Phase::Plan)
            }
            TrialStatus::Error(message) => Err(SearchError::LegFault(message)),
        }
    }

    /// The per-leg cap, bounded by what is left of this trial's budget.
    fn leg_budget(&self) -> SearchBudget {
        let left = self.meter.remaining();
        let max_iterations = match (self.config.leg_iteration_cap, left.max_iterations) {
            (Some(cap), Some(left)) => Some(cap.min(left)),
            (cap, left) => cap.or(left),
        };
        SearchBudget { max_iterations, timeout: left.timeout }
    }

    fn emit_leg_stop(&self, origin: &Cell, destination: &Cell, cost: Option<f64>) {
        emit_with(self.sink.as_ref(), EventKind::LegStop, || SearchEvent::LegStop {
            origin:      origin.clone(),
            destination: destination.clone(),
            cost,
        });
    }

    fn endpoints(&self, edge: GraphEdgeId) -> SearchResult<(Cell, Cell)> {
        let e = self
            .graph
            .edge(edge)
            .ok_or(SearchError::Graph(nav_graph::GraphError::EdgeNotFound(edge)))?;
        let a = self.graph.node(e.from).cloned();
        let b = self.graph.node(e.to).cloned();
        a.zip(b)
            .ok_or_else(|| SearchError::LegFault(format!("edge {edge} has a dangling endpoint")))
    }

    fn next_unvalidated(&self, route: &[GraphEdgeId]) -> Option<GraphEdgeId> {
        route.iter().copied().find(|e| {
            matches!(self.graph.edge(*e).map(|edge| &edge.data), Some(RouteEdge::Leg { .. }))
                && !self.legs.contains_key(e)
        })
    }

    fn accept_leg(&mut self, edge: GraphEdgeId, path: Path) -> SearchResult<()> {
        if let RouteEdge::Leg { validated, .. } = self.graph.edge_data_mut(edge)? {
            *validated = Some(path.cost());
        }
        self.legs.insert(edge, path);
        self.legs_validated += 1;
        Ok(())
    }

    // ── Deliver ───────────────────────────────────────────────────────────

    /// Exact graph cost of a fully validated route.
    fn route_cost(&self, route: &[GraphEdgeId]) -> f64 {
        let weights = self.weights();
        route
            .iter()
            .filter_map(|&e| self.graph.edge(e))
            .map(|edge| {
                let entry = self.graph.node(edge.to).map_or(0.0, |n| weights.node_weight(n));
                weights.edge_length(&edge.data) + entry
            })
            .sum()
    }

    fn deliver(&mut self, route: &[GraphEdgeId]) -> SearchResult<()> {
        let itinerary = self.assemble(route)?;
        let cost = self.route_cost(route);
        self.offer(itinerary, cost);
        if !self.config.refine {
            self.finish(TrialStatus::Successful);
        }
        Ok(())
    }

    /// Record `itinerary` as the new best if it beats the current one.
    fn offer(&mut self, itinerary: Itinerary, route_cost: f64) {
        if route_cost >= self.best_route_cost - COST_EPSILON {
            return;
        }
        let prospective = self.best.is_some();
        let itinerary = Arc::new(itinerary);
        self.best = Some(Arc::clone(&itinerary));
        self.best_route_cost = route_cost;
        self.generation += 1;
        debug!(
            cost = itinerary.total_cost(),
            crossings = itinerary.crossing_count(),
            generation = self.generation,
            prospective,
            "itinerary validated"
        );
        emit_with(self.sink.as_ref(), EventKind::FoundSolution, || SearchEvent::FoundSolution {
            itinerary,
            prospective,
        });
    }

    /// Package a validated route as ports alternating with paths.
    fn assemble(&self, route: &[GraphEdgeId]) -> SearchResult<Itinerary> {
        let mut builder: Option<ItineraryBuilder> = None;
        let mut pending: Option<Path> = None;

        for &e in route {
            let edge = self
                .graph
                .edge(e)
                .ok_or(SearchError::Graph(nav_graph::GraphError::EdgeNotFound(e)))?;
            match &edge.data {
                RouteEdge::Port(i) => {
                    let port = self.ports.get(*i).cloned().ok_or_else(|| {
                        SearchError::LegFault(format!("route uses unknown port {i}"))
                    })?;
                    match builder.as_mut() {
                        Some(b) => {
                            let path = pending
                                .take()
                                .unwrap_or_else(|| Path::stationary(port.origin().clone()));
                            b.append(path, port);
                        }
                        None => {
                            let b = match pending.take() {
                                Some(path) => {
                                    let mut b = Itinerary::builder(Port::stationary(self.origin.clone()));
                                    b.append(path, port);
                                    b
                                }
                                None => Itinerary::builder(port),
                            };
                            builder = Some(b);
                        }
                    }
                }
                RouteEdge::Leg { .. } => {
                    let leg = self.legs.get(&e).cloned().ok_or_else(|| {
                        SearchError::LegFault(format!("route uses unvalidated leg {e}"))
                    })?;
                    pending = Some(match pending.take() {
                        Some(path) => path.concat(leg)?,
                        None => leg,
                    });
                }
            }
        }

        let mut builder =
            builder.unwrap_or_else(|| Itinerary::builder(Port::stationary(self.origin.clone())));
        if let Some(path) = pending {
            builder.append(path, Port::stationary(self.destination.clone()));
        }
        Ok(builder.build())
    }
}

impl Trial for ItineraryTrial {
    fn step(&mut self, max_iterations: u64) -> SearchResult<TrialStatus> {
        ItineraryTrial::step(self, max_iterations)
    }

    fn reset(&mut self) {
        ItineraryTrial::reset(self);
    }

    fn cancel(&mut self) {
        ItineraryTrial::cancel(self);
    }

    fn status(&self) -> &TrialStatus {
        &self.status
    }

    fn label(&self) -> String {
        format!("itinerary {} -> {}", self.origin, self.destination)
    }
}
