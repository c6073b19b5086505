//! Unit tests for nav-search.

use std::sync::Arc;
use std::time::Duration;

use nav_core::{Cell, CostFunctions, ModeType, ModeTypeGroup, Path, Port, SearchBudget};

use crate::{
    AxisStepProvider, ModeOption, ModeProvider, ProviderError, SearchFlags,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn a(x: i32, y: i32, z: i32) -> Cell {
    Cell::new("a", x, y, z)
}

fn b(x: i32, y: i32, z: i32) -> Cell {
    Cell::new("b", x, y, z)
}

fn walk() -> Vec<Arc<dyn ModeProvider>> {
    vec![Arc::new(AxisStepProvider::unobstructed(ModeType::Walk, 1.0))]
}

fn in_bounds(c: &Cell) -> bool {
    c.x.abs() <= 6 && c.z.abs() <= 6 && c.y == 0
}

/// 13×13 floor per domain; `a(3,0,0)` cannot be entered.
fn sealed(c: &Cell) -> bool {
    in_bounds(c) && !(c.domain.as_str() == "a" && c.x == 3 && c.z == 0)
}

/// 13×13 floor per domain; domain `a` has a wall at x = 2, |z| ≤ 3.
fn walled(c: &Cell) -> bool {
    in_bounds(c) && !(c.domain.as_str() == "a" && c.x == 2 && c.z.abs() <= 3)
}

fn bounded_walk(passable: fn(&Cell) -> bool) -> Vec<Arc<dyn ModeProvider>> {
    vec![Arc::new(AxisStepProvider::new(ModeType::Walk, 1.0, passable))]
}

fn door(from: Cell, to: Cell) -> Port {
    Port::new(from, to, ModeType::Door, 1.0).unwrap()
}

fn close(x: f64, y: f64) -> bool {
    (x - y).abs() < 1e-9
}

struct FaultyProvider;

impl ModeProvider for FaultyProvider {
    fn mode_type(&self) -> ModeType {
        ModeType::Climb
    }

    fn collect_options(&self, _: &Cell, _: &SearchFlags) -> Result<Vec<ModeOption>, ProviderError> {
        Err(ProviderError::new("world query failed"))
    }
}

struct NegativeProvider;

impl ModeProvider for NegativeProvider {
    fn mode_type(&self) -> ModeType {
        ModeType::Jump
    }

    fn collect_options(&self, origin: &Cell, _: &SearchFlags) -> Result<Vec<ModeOption>, ProviderError> {
        Ok(vec![ModeOption { destination: origin.offset(1, 0, 0), cost: -1.0, mode: ModeType::Jump }])
    }
}

/// Offers unit moves in `mode` along +x/-x, whatever the flags say.
struct IgnoresFlags {
    provider_mode: ModeType,
    option_mode:   ModeType,
}

impl ModeProvider for IgnoresFlags {
    fn mode_type(&self) -> ModeType {
        self.provider_mode
    }

    fn collect_options(&self, origin: &Cell, _: &SearchFlags) -> Result<Vec<ModeOption>, ProviderError> {
        Ok([1, -1]
            .into_iter()
            .map(|dx| ModeOption { destination: origin.offset(dx, 0, 0), cost: 1.0, mode: self.option_mode })
            .collect())
    }
}

// ── Flags and providers ───────────────────────────────────────────────────────

#[cfg(test)]
mod flags_and_providers {
    use super::*;
    use crate::allowed_modes;

    #[test]
    fn flags_gate_restricted_modes() {
        let flags = SearchFlags::default();
        assert!(flags.allows(ModeType::Walk));
        assert!(!flags.allows(ModeType::Fly));
        assert!(!flags.allows(ModeType::Tunnel));
        assert!(!flags.allows(ModeType::Door));

        let flags = SearchFlags { fly_allowed: true, dig_allowed: true, ..SearchFlags::default() };
        assert!(flags.allows(ModeType::Fly));
        assert!(flags.allows(ModeType::Dig));
    }

    #[test]
    fn timeout_falls_back_to_default() {
        let default = Duration::from_secs(30);
        assert_eq!(SearchFlags::default().timeout(default), default);
        let flags = SearchFlags { timeout_secs: 5, ..SearchFlags::default() };
        assert_eq!(flags.timeout(default), Duration::from_secs(5));
    }

    #[test]
    fn axis_provider_offers_horizontal_neighbours() {
        let p = AxisStepProvider::unobstructed(ModeType::Walk, 1.0);
        let options = p.collect_options(&a(0, 0, 0), &SearchFlags::default()).unwrap();
        assert_eq!(options.len(), 4);
        assert!(options.iter().all(|o| o.destination.y == 0 && o.mode == ModeType::Walk));
    }

    #[test]
    fn axis_provider_vertical_and_passability() {
        let p = AxisStepProvider::new(ModeType::Climb, 2.0, |c: &Cell| c.x >= 0).with_vertical();
        let options = p.collect_options(&a(0, 0, 0), &SearchFlags::default()).unwrap();
        // -x is blocked; ±y added.
        assert_eq!(options.len(), 5);
        assert!(options.iter().all(|o| o.cost == 2.0));
    }

    #[test]
    fn disallowed_provider_offers_nothing() {
        let p = AxisStepProvider::unobstructed(ModeType::Fly, 1.0);
        assert!(p.collect_options(&a(0, 0, 0), &SearchFlags::default()).unwrap().is_empty());
    }

    #[test]
    fn allowed_modes_respects_flags() {
        let providers: Vec<Arc<dyn ModeProvider>> = vec![
            Arc::new(AxisStepProvider::unobstructed(ModeType::Walk, 1.0)),
            Arc::new(AxisStepProvider::unobstructed(ModeType::Fly, 1.0)),
        ];
        let modes = allowed_modes(&providers, &SearchFlags::default());
        assert!(modes.contains(ModeType::Walk));
        assert!(!modes.contains(ModeType::Fly));
    }
}

// ── Events ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod events {
    use super::*;
    use crate::{EventBus, EventKind, EventKinds, EventSink, NoopSink, RecordingSink, SearchEvent};

    fn leg_stop() -> SearchEvent {
        SearchEvent::LegStop { origin: a(0, 0, 0), destination: a(1, 0, 0), cost: Some(1.0) }
    }

    #[test]
    fn kinds_set_operations() {
        let kinds = EventKinds::of(&[EventKind::Start, EventKind::LegStop]);
        assert!(kinds.contains(EventKind::Start));
        assert!(!kinds.contains(EventKind::Visitation));
        assert!(EventKinds::NONE.is_empty());
        assert!(EventKind::ALL.iter().all(|&k| EventKinds::ALL.contains(k)));
    }

    #[test]
    fn bus_filters_by_kind() {
        let bus = EventBus::new();
        let legs = Arc::new(RecordingSink::new());
        let all = Arc::new(RecordingSink::new());
        bus.subscribe(EventKinds::of(&[EventKind::LegStop]), legs.clone());
        bus.subscribe(EventKinds::ALL, all.clone());

        bus.emit(&leg_stop());
        bus.emit(&SearchEvent::Visitation { cell: a(0, 0, 0), g: 0.0 });

        assert_eq!(legs.kinds(), vec![EventKind::LegStop]);
        assert_eq!(all.events().len(), 2);
    }

    #[test]
    fn bus_wants_tracks_subscriptions() {
        let bus = EventBus::new();
        assert!(!bus.wants(EventKind::Step));
        let id = bus.subscribe(EventKinds::of(&[EventKind::Step]), Arc::new(RecordingSink::new()));
        assert!(bus.wants(EventKind::Step));
        assert!(!bus.wants(EventKind::Start));
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert!(!bus.wants(EventKind::Step));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn noop_sink_wants_nothing() {
        assert!(EventKind::ALL.iter().all(|&k| !NoopSink.wants(k)));
    }

    #[test]
    fn recording_sink_take_drains() {
        let sink = RecordingSink::new();
        sink.emit(&leg_stop());
        assert_eq!(sink.count(EventKind::LegStop), 1);
        assert_eq!(sink.take().len(), 1);
        assert!(sink.events().is_empty());
    }
}

// ── Path cache ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod cache {
    use super::*;
    use nav_core::Step;

    use crate::{InMemoryPathCache, PathKey, PathRecord, PathRecordManager, SearchError};

    fn straight(len: i32, factor: f64) -> Path {
        let steps = (1..=len).map(|x| Step::new(a(x, 0, 0), factor, ModeType::Walk)).collect();
        Path::new(a(0, 0, 0), steps).unwrap()
    }

    fn walk_modes() -> ModeTypeGroup {
        [ModeType::Walk].into_iter().collect()
    }

    fn record(path: Path) -> PathRecord {
        PathRecord::new(path, walk_modes(), Duration::from_millis(1))
    }

    #[test]
    fn report_then_lookup() {
        let cache = InMemoryPathCache::new(100);
        let rec = record(straight(3, 1.0));
        let key = rec.key();
        cache.report(rec.clone()).unwrap();
        assert_eq!(cache.lookup(&key).unwrap(), Some(rec));
        assert_eq!(cache.cached_cells(), 4);
    }

    #[test]
    fn keeps_cheaper_record() {
        let cache = InMemoryPathCache::new(100);
        cache.report(record(straight(3, 1.0))).unwrap();
        cache.report(record(straight(3, 2.0))).unwrap();
        let key = record(straight(3, 1.0)).key();
        assert!(close(cache.lookup(&key).unwrap().unwrap().path.cost(), 3.0));

        cache.report(record(straight(3, 0.5))).unwrap();
        assert!(close(cache.lookup(&key).unwrap().unwrap().path.cost(), 1.5));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn over_budget_is_skipped_without_error() {
        let cache = InMemoryPathCache::new(5);
        cache.report(record(straight(3, 1.0))).unwrap();
        cache.report(record(straight(5, 1.0))).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.cached_cells(), 4);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn check_rejects_mismatched_record() {
        let rec = record(straight(3, 1.0));
        let wrong = PathKey { origin: a(0, 0, 0), destination: a(9, 0, 0), modes: walk_modes() };
        assert!(matches!(rec.check(&wrong), Err(SearchError::MalformedRecord { .. })));

        let other_modes = PathKey { modes: ModeTypeGroup::EMPTY, ..rec.key() };
        assert!(rec.check(&other_modes).is_err());
        assert!(rec.check(&rec.key()).is_ok());
    }
}

// ── PathTrial ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod path_trial {
    use super::*;
    use nav_core::{AccumulatorKind, CostConfig};

    use crate::{
        CancelToken, EventKind, FailReason, PathTrial, RecordingSink, SearchError, TrialStatus,
    };

    fn trial(from: Cell, to: Cell) -> PathTrial {
        PathTrial::new(from, to, walk(), CostFunctions::default())
    }

    #[test]
    fn corridor_walk() {
        let mut t = trial(a(0, 0, 0), a(4, 0, 0));
        assert_eq!(t.run().unwrap(), TrialStatus::Successful);
        let path = t.path().unwrap();
        assert_eq!(path.len(), 4);
        assert!(close(path.cost(), 4.0));
        assert_eq!(path.destination(), &a(4, 0, 0));
        assert!(path.validate().is_ok());
    }

    #[test]
    fn origin_equals_destination() {
        let mut t = PathTrial::new(a(1, 0, 1), a(1, 0, 1), Vec::new(), CostFunctions::default());
        assert_eq!(t.step(1).unwrap(), TrialStatus::Successful);
        assert!(t.path().unwrap().is_stationary());
    }

    #[test]
    fn no_providers_fails_immediately() {
        let mut t = PathTrial::new(a(0, 0, 0), a(2, 0, 0), Vec::new(), CostFunctions::default());
        assert_eq!(t.step(1).unwrap(), TrialStatus::Failed(FailReason::NoProviders));
        assert_eq!(t.iterations(), 0);
    }

    #[test]
    fn domain_mismatch_fails() {
        let mut t = trial(a(0, 0, 0), b(0, 0, 0));
        assert_eq!(t.run().unwrap(), TrialStatus::Failed(FailReason::DomainMismatch));
    }

    #[test]
    fn slices_resume_to_same_result() {
        let mut whole = trial(a(0, 0, 0), a(3, 0, 2));
        whole.run().unwrap();

        let mut sliced = trial(a(0, 0, 0), a(3, 0, 2));
        let mut slices = 0;
        while !sliced.step(1).unwrap().is_terminal() {
            slices += 1;
        }
        assert!(slices > 1);
        assert_eq!(sliced.status(), &TrialStatus::Successful);
        assert!(close(sliced.path().unwrap().cost(), whole.path().unwrap().cost()));
        assert!(close(sliced.path().unwrap().cost(), 5.0));
    }

    #[test]
    fn unreachable_in_bounded_world() {
        let mut t = PathTrial::new(a(0, 0, 0), a(3, 0, 0), bounded_walk(sealed), CostFunctions::default());
        assert_eq!(t.run().unwrap(), TrialStatus::Failed(FailReason::Unreachable));
        assert_eq!(t.visited(), 13 * 13 - 1);
    }

    #[test]
    fn detour_around_wall() {
        let mut t = PathTrial::new(a(0, 0, 0), a(3, 0, 0), bounded_walk(walled), CostFunctions::default());
        assert_eq!(t.run().unwrap(), TrialStatus::Successful);
        assert!(close(t.path().unwrap().cost(), 11.0));
    }

    #[test]
    fn budget_exhaustion_fails() {
        let mut t = trial(a(0, 0, 0), a(20, 0, 0)).with_budget(SearchBudget::iterations(3));
        assert_eq!(t.run().unwrap(), TrialStatus::Failed(FailReason::BudgetExhausted));
        assert_eq!(t.iterations(), 3);
    }

    #[test]
    fn disallowed_providers_count_as_none() {
        let providers: Vec<Arc<dyn ModeProvider>> =
            vec![Arc::new(AxisStepProvider::unobstructed(ModeType::Fly, 1.0))];
        let mut t = PathTrial::new(a(0, 0, 0), a(2, 0, 0), providers.clone(), CostFunctions::default());
        assert_eq!(t.run().unwrap(), TrialStatus::Failed(FailReason::NoProviders));

        let flags = SearchFlags { fly_allowed: true, ..SearchFlags::default() };
        let mut t = PathTrial::new(a(0, 0, 0), a(2, 0, 0), providers, CostFunctions::default())
            .with_flags(flags);
        assert_eq!(t.run().unwrap(), TrialStatus::Successful);
        assert_eq!(t.path().unwrap().modes(), [ModeType::Fly].into_iter().collect());
    }

    #[test]
    fn flags_bind_providers_that_ignore_them() {
        let fly: Vec<Arc<dyn ModeProvider>> = vec![
            Arc::new(IgnoresFlags { provider_mode: ModeType::Fly, option_mode: ModeType::Fly }),
        ];
        let mut t = PathTrial::new(a(0, 0, 0), a(3, 0, 0), fly.clone(), CostFunctions::default());
        assert_eq!(t.run().unwrap(), TrialStatus::Failed(FailReason::NoProviders));

        // A fly provider next to walking is skipped; the path is walked.
        let mut providers = walk();
        providers.extend(fly);
        let mut t = PathTrial::new(a(0, 0, 0), a(3, 0, 0), providers, CostFunctions::default());
        assert_eq!(t.run().unwrap(), TrialStatus::Successful);
        assert_eq!(t.path().unwrap().modes(), [ModeType::Walk].into_iter().collect());
    }

    #[test]
    fn disallowed_option_modes_are_dropped() {
        let providers: Vec<Arc<dyn ModeProvider>> = vec![
            Arc::new(IgnoresFlags { provider_mode: ModeType::Walk, option_mode: ModeType::Dig }),
        ];
        let mut t = PathTrial::new(a(0, 0, 0), a(3, 0, 0), providers.clone(), CostFunctions::default());
        assert_eq!(t.run().unwrap(), TrialStatus::Failed(FailReason::Unreachable));

        let flags = SearchFlags { dig_allowed: true, ..SearchFlags::default() };
        let mut t = PathTrial::new(a(0, 0, 0), a(3, 0, 0), providers, CostFunctions::default())
            .with_flags(flags);
        assert_eq!(t.run().unwrap(), TrialStatus::Successful);
        assert_eq!(t.path().unwrap().modes(), [ModeType::Dig].into_iter().collect());
    }

    #[test]
    fn invalid_path_leaves_trial_in_error() {
        let costs = CostConfig {
            accumulator: AccumulatorKind::Weighted { weight: -1.0 },
            ..CostConfig::default()
        }
        .build();
        let mut t = PathTrial::new(a(0, 0, 0), a(3, 0, 0), walk(), costs);
        assert!(matches!(t.step(100), Err(SearchError::Core(_))));
        assert!(matches!(t.status(), TrialStatus::Error(_)));
        assert!(t.path().is_none());
        assert!(matches!(t.step(1).unwrap(), TrialStatus::Error(_)));
    }

    #[test]
    fn cancel_token_observed_at_slice_start() {
        let token = CancelToken::new();
        let mut t = trial(a(0, 0, 0), a(10, 0, 0)).with_cancel_token(token.clone());
        assert_eq!(t.step(2).unwrap(), TrialStatus::Running);
        token.cancel();
        assert_eq!(t.step(2).unwrap(), TrialStatus::Canceled);
        assert!(t.path().is_none());
    }

    #[test]
    fn direct_cancel_is_immediate() {
        let mut t = trial(a(0, 0, 0), a(10, 0, 0));
        t.step(1).unwrap();
        t.cancel();
        assert_eq!(t.status(), &TrialStatus::Canceled);
        assert!(t.cancel_token().is_canceled());
    }

    #[test]
    fn provider_fault_is_an_error() {
        let providers: Vec<Arc<dyn ModeProvider>> = vec![Arc::new(FaultyProvider)];
        let mut t = PathTrial::new(a(0, 0, 0), a(2, 0, 0), providers, CostFunctions::default());
        let err = t.step(10).unwrap_err();
        assert!(matches!(err, SearchError::Provider { mode: ModeType::Climb, .. }));
        assert!(matches!(t.status(), TrialStatus::Error(_)));
        // Terminal: further steps report the same status.
        assert!(matches!(t.step(10).unwrap(), TrialStatus::Error(_)));
    }

    #[test]
    fn negative_option_cost_is_rejected() {
        let providers: Vec<Arc<dyn ModeProvider>> = vec![Arc::new(NegativeProvider)];
        let mut t = PathTrial::new(a(0, 0, 0), a(2, 0, 0), providers, CostFunctions::default());
        assert!(matches!(t.step(10), Err(SearchError::InvalidOption { .. })));
    }

    #[test]
    fn reset_allows_rerun() {
        let mut t = trial(a(0, 0, 0), a(2, 0, 0));
        t.run().unwrap();
        t.reset();
        assert_eq!(t.status(), &TrialStatus::Idle);
        assert_eq!(t.iterations(), 0);
        assert!(t.path().is_none());
        assert_eq!(t.run().unwrap(), TrialStatus::Successful);
        assert!(close(t.path().unwrap().cost(), 2.0));
    }

    #[test]
    fn emits_visitation_and_step_events() {
        let sink = Arc::new(RecordingSink::new());
        let mut t = trial(a(0, 0, 0), a(2, 0, 0)).with_sink(sink.clone());
        t.run().unwrap();
        assert_eq!(sink.count(EventKind::Visitation), t.visited());
        assert!(sink.count(EventKind::Step) >= 2);
        assert!(sink.count(EventKind::ModeSuccess) >= 1);
    }
}

// ── ItineraryTrial ────────────────────────────────────────────────────────────

#[cfg(test)]
mod itinerary_trial {
    use super::*;
    use crate::{
        CancelToken, EventKind, FailReason, InMemoryPathCache, ItineraryConfig, ItineraryTrial,
        PathKey, PathRecord, PathRecordManager, RecordingSink, SearchError, SearchEvent,
        SearchResult, TrialStatus,
    };

    fn itinerary(
        from:      Cell,
        to:        Cell,
        ports:     Vec<Port>,
        providers: Vec<Arc<dyn ModeProvider>>,
    ) -> ItineraryTrial {
        ItineraryTrial::new(from, to, ports.into(), providers, CostFunctions::default())
    }

    #[test]
    fn same_domain_without_ports() {
        let mut t = itinerary(a(0, 0, 0), a(3, 0, 0), Vec::new(), walk());
        assert_eq!(t.run().unwrap(), TrialStatus::Successful);
        let best = t.best().unwrap();
        assert_eq!(best.crossing_count(), 0);
        assert_eq!(best.paths().len(), 1);
        assert!(close(best.total_cost(), 3.0));
    }

    #[test]
    fn two_domains_through_one_port() {
        let sink = Arc::new(RecordingSink::new());
        let ports = vec![door(a(3, 0, 0), b(0, 0, 0))];
        let mut t = itinerary(a(0, 0, 0), b(2, 0, 0), ports, walk()).with_sink(sink.clone());
        assert_eq!(t.run().unwrap(), TrialStatus::Successful);

        let best = t.best().unwrap();
        assert_eq!(best.origin(), &a(0, 0, 0));
        assert_eq!(best.destination(), &b(2, 0, 0));
        assert_eq!(best.crossing_count(), 1);
        assert_eq!(best.paths().len(), 2);
        assert_eq!(best.paths()[0].len(), 3);
        assert_eq!(best.paths()[1].len(), 2);
        assert!(close(best.total_cost(), 6.0));
        assert_eq!(t.generation(), 1);

        assert_eq!(sink.count(EventKind::ItineraryStart), 1);
        assert_eq!(sink.count(EventKind::ItineraryStop), 1);
        assert_eq!(sink.count(EventKind::LegStart), 2);
        assert_eq!(sink.count(EventKind::FoundSolution), 1);
    }

    #[test]
    fn port_only_route_needs_no_providers() {
        let ports = vec![door(a(3, 0, 0), b(0, 0, 0))];
        let mut t = itinerary(a(3, 0, 0), b(0, 0, 0), ports, Vec::new());
        assert_eq!(t.run().unwrap(), TrialStatus::Successful);
        let best = t.best().unwrap();
        assert_eq!(best.crossing_count(), 1);
        assert!(best.paths().is_empty());
        assert!(close(best.total_cost(), 1.0));
    }

    #[test]
    fn stationary_request() {
        let mut t = itinerary(b(1, 0, 1), b(1, 0, 1), Vec::new(), Vec::new());
        assert_eq!(t.step(1).unwrap(), TrialStatus::Successful);
        let best = t.best().unwrap();
        assert_eq!(best.crossing_count(), 0);
        assert!(close(best.total_cost(), 0.0));
    }

    #[test]
    fn no_port_between_domains_fails() {
        let mut t = itinerary(a(0, 0, 0), b(2, 0, 0), Vec::new(), walk());
        assert_eq!(t.run().unwrap(), TrialStatus::Failed(FailReason::NoRoute));
        assert!(t.best().is_none());
    }

    #[test]
    fn no_providers_fails_when_legs_are_needed() {
        let ports = vec![door(a(3, 0, 0), b(0, 0, 0))];
        let mut t = itinerary(a(0, 0, 0), b(2, 0, 0), ports, Vec::new());
        assert_eq!(t.run().unwrap(), TrialStatus::Failed(FailReason::NoRoute));
    }

    #[test]
    fn reroutes_around_failed_leg() {
        let sink = Arc::new(RecordingSink::new());
        let ports = vec![door(a(3, 0, 0), b(0, 0, 0)), door(a(0, 0, 4), b(0, 0, 0))];
        let mut t = itinerary(a(0, 0, 0), b(2, 0, 0), ports, bounded_walk(sealed)).with_sink(sink.clone());
        assert_eq!(t.run().unwrap(), TrialStatus::Successful);

        let best = t.best().unwrap();
        assert!(close(best.total_cost(), 7.0));
        assert_eq!(best.ports()[1].origin(), &a(0, 0, 4));
        assert!(t.routes_planned() >= 2);

        let failed_legs = sink
            .events()
            .iter()
            .filter(|e| matches!(e, SearchEvent::LegStop { cost: None, .. }))
            .count();
        assert_eq!(failed_legs, 1);
    }

    #[test]
    fn refinement_delivers_cheaper_itinerary() {
        let sink = Arc::new(RecordingSink::new());
        let ports = vec![door(a(3, 0, 0), b(0, 0, 0)), door(a(0, 0, 5), b(0, 0, 0))];
        let mut t = itinerary(a(0, 0, 0), b(2, 0, 0), ports, bounded_walk(walled)).with_sink(sink.clone());
        assert_eq!(t.run().unwrap(), TrialStatus::Successful);

        assert_eq!(t.generation(), 2);
        assert!(close(t.best().unwrap().total_cost(), 8.0));

        let found: Vec<(f64, bool)> = sink
            .events()
            .iter()
            .filter_map(|e| match e {
                SearchEvent::FoundSolution { itinerary, prospective } => {
                    Some((itinerary.total_cost(), *prospective))
                }
                _ => None,
            })
            .collect();
        assert_eq!(found.len(), 2);
        assert!(close(found[0].0, 14.0) && !found[0].1);
        assert!(close(found[1].0, 8.0) && found[1].1);
    }

    #[test]
    fn without_refinement_first_route_wins() {
        let ports = vec![door(a(3, 0, 0), b(0, 0, 0)), door(a(0, 0, 5), b(0, 0, 0))];
        let config = ItineraryConfig { refine: false, ..ItineraryConfig::default() };
        let mut t = itinerary(a(0, 0, 0), b(2, 0, 0), ports, bounded_walk(walled)).with_config(config);
        assert_eq!(t.run().unwrap(), TrialStatus::Successful);
        assert_eq!(t.generation(), 1);
        assert!(close(t.best().unwrap().total_cost(), 14.0));
    }

    #[test]
    fn budget_exhaustion_without_solution_fails() {
        let ports = vec![door(a(3, 0, 0), b(0, 0, 0))];
        let config = ItineraryConfig { budget: SearchBudget::iterations(1), ..ItineraryConfig::default() };
        let mut t = itinerary(a(0, 0, 0), b(2, 0, 0), ports, walk()).with_config(config);
        assert_eq!(t.run().unwrap(), TrialStatus::Failed(FailReason::BudgetExhausted));
    }

    /// Unit walk that takes a millisecond per expansion.
    struct SlowWalk;

    impl ModeProvider for SlowWalk {
        fn mode_type(&self) -> ModeType {
            ModeType::Walk
        }

        fn collect_options(&self, origin: &Cell, flags: &SearchFlags) -> Result<Vec<ModeOption>, ProviderError> {
            std::thread::sleep(Duration::from_millis(1));
            AxisStepProvider::unobstructed(ModeType::Walk, 1.0).collect_options(origin, flags)
        }
    }

    #[test]
    fn timeout_bounds_a_long_leg() {
        let config = ItineraryConfig {
            budget: SearchBudget::UNLIMITED.with_timeout(Duration::from_millis(50)),
            ..ItineraryConfig::default()
        };
        let providers: Vec<Arc<dyn ModeProvider>> = vec![Arc::new(SlowWalk)];
        let mut t = itinerary(a(0, 0, 0), a(5_000, 0, 0), Vec::new(), providers).with_config(config);

        let started = std::time::Instant::now();
        assert_eq!(t.step(u64::MAX).unwrap(), TrialStatus::Failed(FailReason::BudgetExhausted));
        assert!(started.elapsed() < Duration::from_secs(3), "leg ran past the deadline");
    }

    #[test]
    fn leg_validation_limit() {
        let ports = vec![door(a(3, 0, 0), b(0, 0, 0))];
        let config = ItineraryConfig { max_leg_validations: 1, ..ItineraryConfig::default() };
        let mut t = itinerary(a(0, 0, 0), b(2, 0, 0), ports, walk()).with_config(config);
        assert_eq!(t.run().unwrap(), TrialStatus::Failed(FailReason::BudgetExhausted));
        assert_eq!(t.legs_validated(), 1);
    }

    #[test]
    fn shared_cache_skips_leg_searches() {
        let cache = Arc::new(InMemoryPathCache::new(1_000));
        let ports: Vec<Port> = vec![door(a(3, 0, 0), b(0, 0, 0))];

        let mut first = itinerary(a(0, 0, 0), b(2, 0, 0), ports.clone(), walk()).with_cache(cache.clone());
        first.run().unwrap();
        assert_eq!(cache.len(), 2);

        let sink = Arc::new(RecordingSink::new());
        let mut second = itinerary(a(0, 0, 0), b(2, 0, 0), ports, walk())
            .with_cache(cache.clone())
            .with_sink(sink.clone());
        assert_eq!(second.run().unwrap(), TrialStatus::Successful);
        assert_eq!(sink.count(EventKind::LegStart), 0);
        assert!(close(second.best().unwrap().total_cost(), 6.0));
    }

    struct LyingCache;

    impl PathRecordManager for LyingCache {
        fn lookup(&self, _key: &PathKey) -> SearchResult<Option<PathRecord>> {
            Ok(Some(PathRecord::new(Path::stationary(a(9, 0, 9)), ModeTypeGroup::EMPTY, Duration::ZERO)))
        }

        fn report(&self, _record: PathRecord) -> SearchResult<()> {
            Ok(())
        }
    }

    #[test]
    fn malformed_cached_record_is_an_error() {
        let ports = vec![door(a(3, 0, 0), b(0, 0, 0))];
        let mut t = itinerary(a(0, 0, 0), b(2, 0, 0), ports, walk()).with_cache(Arc::new(LyingCache));
        assert!(matches!(t.run(), Err(SearchError::MalformedRecord { .. })));
        assert!(matches!(t.status(), TrialStatus::Error(_)));
    }

    #[test]
    fn cancel_mid_search() {
        let token = CancelToken::new();
        let ports = vec![door(a(3, 0, 0), b(0, 0, 0))];
        let mut t = itinerary(a(0, 0, 0), b(2, 0, 0), ports, walk()).with_cancel_token(token.clone());
        assert_eq!(t.step(2).unwrap(), TrialStatus::Running);
        token.cancel();
        assert_eq!(t.step(100).unwrap(), TrialStatus::Canceled);
        assert!(t.best().is_none());
    }

    #[test]
    fn node_weight_steers_route() {
        // Two equal doors; the weighted landing makes the second one cheaper.
        let ports = vec![door(a(2, 0, 0), b(0, 0, 0)), door(a(-2, 0, 0), b(0, 0, 4))];
        let heavy = b(0, 0, 0);
        let mut t = itinerary(a(0, 0, 0), b(0, 0, 2), ports, walk())
            .with_node_weight(Arc::new(move |c: &Cell| if *c == heavy { 10.0 } else { 0.0 }));
        assert_eq!(t.run().unwrap(), TrialStatus::Successful);
        assert_eq!(t.best().unwrap().ports()[1].origin(), &a(-2, 0, 0));
    }

    #[test]
    fn reset_clears_results() {
        let ports = vec![door(a(3, 0, 0), b(0, 0, 0))];
        let mut t = itinerary(a(0, 0, 0), b(2, 0, 0), ports, walk());
        t.run().unwrap();
        t.reset();
        assert_eq!(t.status(), &TrialStatus::Idle);
        assert!(t.best().is_none());
        assert_eq!(t.generation(), 0);
        assert_eq!(t.run().unwrap(), TrialStatus::Successful);
        assert_eq!(t.generation(), 1);
    }
}

// ── Work adapter ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod work {
    use super::*;
    use nav_core::OwnerId;
    use nav_schedule::{DistributedWorkManager, ManagerConfig, WorkOutcome};
    use parking_lot::Mutex;

    use crate::{ItineraryTrial, ItineraryTrialWork, PathTrial, PathTrialWork, TrialStatus};

    #[test]
    fn manager_drives_path_trial_to_completion() {
        let manager = DistributedWorkManager::new(ManagerConfig::default()).unwrap();
        let trial = Arc::new(Mutex::new(PathTrial::new(a(0, 0, 0), a(5, 0, 0), walk(), CostFunctions::default())));
        manager.submit(Box::new(PathTrialWork::new(OwnerId(1), 2, trial.clone())));

        let passes = manager.run_until_idle(1_000);
        assert!(passes > 1);
        assert_eq!(trial.lock().status(), &TrialStatus::Successful);
        let finished = manager.take_finished();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].outcome, WorkOutcome::Completed);
    }

    #[test]
    fn canceled_item_cancels_trial() {
        let manager = DistributedWorkManager::new(ManagerConfig::default()).unwrap();
        let ports: Vec<Port> = vec![door(a(3, 0, 0), b(0, 0, 0))];
        let trial = Arc::new(Mutex::new(ItineraryTrial::new(
            a(0, 0, 0),
            b(2, 0, 0),
            ports.into(),
            walk(),
            CostFunctions::default(),
        )));
        let id = manager.submit(Box::new(ItineraryTrialWork::new(OwnerId(1), 1, trial.clone())));
        manager.run_pass();
        manager.cancel(id).unwrap();
        manager.run_until_idle(10);
        assert_eq!(trial.lock().status(), &TrialStatus::Canceled);
    }
}

// ── Loader ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod loader {
    use std::io::Write;

    use super::*;
    use crate::{load_ports_csv, load_ports_reader, SearchError};

    const PORTS: &str = "\
origin_domain,ox,oy,oz,dest_domain,dx,dy,dz,mode,cost
a,3,0,0,b,0,0,0,door,1.0
b, 0, 0, 0, a, 3, 0, 0, Door, 1.5
";

    #[test]
    fn parses_rows() {
        let ports = load_ports_reader(PORTS.as_bytes()).unwrap();
        assert_eq!(ports.len(), 2);
        assert_eq!(ports[0].origin(), &a(3, 0, 0));
        assert_eq!(ports[0].destination(), &b(0, 0, 0));
        assert_eq!(ports[1].mode(), ModeType::Door);
        assert!(close(ports[1].cost(), 1.5));
    }

    #[test]
    fn rejects_unknown_mode() {
        let csv = "origin_domain,ox,oy,oz,dest_domain,dx,dy,dz,mode,cost\na,0,0,0,b,0,0,0,warp,1\n";
        assert!(matches!(load_ports_reader(csv.as_bytes()), Err(SearchError::Parse(_))));
    }

    #[test]
    fn rejects_stationary_row() {
        let csv = "origin_domain,ox,oy,oz,dest_domain,dx,dy,dz,mode,cost\na,1,1,1,a,1,1,1,door,1\n";
        assert!(load_ports_reader(csv.as_bytes()).is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PORTS.as_bytes()).unwrap();
        let ports = load_ports_csv(file.path()).unwrap();
        assert_eq!(ports.len(), 2);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_ports_csv(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, SearchError::Io(_)));
    }
}

// ── Properties ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod properties {
    use proptest::prelude::*;

    use super::*;
    use crate::{PathTrial, TrialStatus};

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// On an open floor with unit moves the path cost is the Manhattan
        /// distance and every step has unit delta.
        #[test]
        fn open_floor_cost_is_manhattan(x in -5i32..=5, z in -5i32..=5, slice in 1u64..16) {
            let mut t = PathTrial::new(a(0, 0, 0), a(x, 0, z), walk(), CostFunctions::default());
            while !t.step(slice).unwrap().is_terminal() {}
            prop_assert_eq!(t.status(), &TrialStatus::Successful);
            let path = t.path().unwrap();
            prop_assert!(close(path.cost(), f64::from(x.abs() + z.abs())));
            prop_assert!(path.steps().iter().all(|s| close(s.delta, 1.0)));
            prop_assert!(path.validate().is_ok());
        }
    }
}
