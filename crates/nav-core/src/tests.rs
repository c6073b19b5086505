//! Unit tests for nav-core primitives.

#[cfg(test)]
mod ids {
    use crate::{ItemId, OwnerId};

    #[test]
    fn index_roundtrip() {
        let id = OwnerId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(OwnerId::try_from(42usize).unwrap(), id);
    }

    #[test]
    fn next_increments() {
        assert_eq!(ItemId(0).next(), ItemId(1));
    }

    #[test]
    fn display() {
        assert_eq!(OwnerId(7).to_string(), "OwnerId(7)");
    }
}

// ── Cells ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod cells {
    use std::collections::HashMap;

    use crate::{Cell, DomainId, DomainLookup};

    #[test]
    fn equality_covers_domain() {
        let a = Cell::new("A", 1, 2, 3);
        let b = Cell::new("B", 1, 2, 3);
        assert_ne!(a, b);
        assert_eq!(a, Cell::new("A", 1, 2, 3));
    }

    #[test]
    fn distances() {
        let a = Cell::new("A", 0, 0, 0);
        let b = Cell::new("A", 3, 4, 0);
        assert!((a.euclidean(&b) - 5.0).abs() < 1e-9);
        assert!((a.manhattan(&b) - 7.0).abs() < 1e-9);
    }

    #[test]
    fn offset_saturates_at_coordinate_limits() {
        let edge = Cell::new("A", i32::MAX, i32::MIN, 0);
        let moved = edge.offset(1, -1, 1);
        assert_eq!(moved, Cell::new("A", i32::MAX, i32::MIN, 1));
        assert_eq!(Cell::new("A", 0, 0, 0).offset(2, -3, 4), Cell::new("A", 2, -3, 4));
    }

    struct Worlds(HashMap<DomainId, &'static str>);

    impl DomainLookup for Worlds {
        type Domain = &'static str;
        fn resolve(&self, id: &DomainId) -> Option<&'static str> {
            self.0.get(id).copied()
        }
    }

    #[test]
    fn lazy_domain_resolution() {
        let worlds = Worlds(HashMap::from([(DomainId::new("A"), "overworld")]));
        assert_eq!(Cell::new("A", 0, 0, 0).resolve(&worlds), Some("overworld"));
        assert_eq!(Cell::new("B", 0, 0, 0).resolve(&worlds), None);
    }
}

// ── Modes ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod modes {
    use crate::{ModeType, ModeTypeGroup};

    #[test]
    fn ids_are_stable() {
        let ids: Vec<u8> = ModeType::ALL.iter().map(|m| m.id()).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(ModeType::Walk.id(), 1);
        assert_eq!(ModeType::Tunnel.id(), 9);
    }

    #[test]
    fn from_id_inverts_id() {
        for mode in ModeType::ALL {
            assert_eq!(ModeType::from_id(mode.id()).unwrap(), mode);
        }
        assert!(ModeType::from_id(10).is_err());
    }

    #[test]
    fn parse_names() {
        assert_eq!("Fly".parse::<ModeType>().unwrap(), ModeType::Fly);
        assert!("teleport".parse::<ModeType>().is_err());
    }

    #[test]
    fn group_is_unordered() {
        let a: ModeTypeGroup = [ModeType::Walk, ModeType::Swim].into_iter().collect();
        let b: ModeTypeGroup = [ModeType::Swim, ModeType::Walk, ModeType::Walk].into_iter().collect();
        assert_eq!(a, b);
        assert_eq!(a.accumulation(), b.accumulation());
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn accumulation_roundtrip() {
        let g: ModeTypeGroup = [ModeType::Dig, ModeType::Door].into_iter().collect();
        let back = ModeTypeGroup::from_accumulation(g.accumulation()).unwrap();
        assert_eq!(back, g);
        assert!(ModeTypeGroup::from_accumulation(1 << 12).is_err());
    }

    #[test]
    fn display_lists_members() {
        let g: ModeTypeGroup = [ModeType::Fly, ModeType::Walk].into_iter().collect();
        assert_eq!(g.to_string(), "[walk,fly]");
    }
}

// ── Paths and ports ───────────────────────────────────────────────────────────

#[cfg(test)]
mod paths {
    use crate::{Cell, ModeType, Path, Port, Step};

    fn c(x: i32) -> Cell {
        Cell::new("A", x, 0, 0)
    }

    #[test]
    fn stationary_path() {
        let p = Path::stationary(c(0));
        assert!(p.is_stationary());
        assert_eq!(p.cost(), 0.0);
        assert_eq!(p.destination(), &c(0));
    }

    #[test]
    fn rejects_negative_delta() {
        let err = Path::new(c(0), vec![Step::new(c(1), -1.0, ModeType::Walk)]);
        assert!(err.is_err());
        let err = Path::new(c(0), vec![Step::new(c(1), f64::NAN, ModeType::Walk)]);
        assert!(err.is_err());
    }

    #[test]
    fn concat_requires_continuity() {
        let a = Path::new(c(0), vec![Step::new(c(1), 1.0, ModeType::Walk)]).unwrap();
        let b = Path::new(c(1), vec![Step::new(c(2), 2.0, ModeType::Swim)]).unwrap();
        let joined = a.clone().concat(b).unwrap();
        assert_eq!(joined.cost(), 3.0);
        assert_eq!(joined.destination(), &c(2));
        assert_eq!(joined.modes().len(), 2);

        let gap = Path::stationary(c(5));
        assert!(a.concat(gap).is_err());
    }

    #[test]
    fn port_as_single_step_path() {
        let port = Port::new(c(0), Cell::new("B", 10, 0, 0), ModeType::Tunnel, 3.5).unwrap();
        assert!(port.crosses_domains());
        let path = port.to_path();
        assert_eq!(path.len(), 1);
        assert_eq!(path.cost(), 3.5);
        assert_eq!(path.steps()[0].mode, ModeType::Tunnel);
    }

    #[test]
    fn stationary_port() {
        let port = Port::stationary(c(3));
        assert!(port.is_stationary());
        assert!(port.to_path().is_stationary());
        assert!(Port::new(c(0), c(1), ModeType::Walk, -0.5).is_err());
    }
}

#[cfg(test)]
mod path_props {
    use proptest::prelude::*;

    use crate::{Cell, ModeType, ModeTypeGroup, Path, Step};

    fn arb_steps() -> impl Strategy<Value = Vec<(i32, f64)>> {
        prop::collection::vec((-50i32..50, 0.0f64..100.0), 0..40)
    }

    fn arb_modes() -> impl Strategy<Value = Vec<u8>> {
        prop::collection::vec(0u8..10, 0..12)
    }

    proptest! {
        #[test]
        fn cost_is_sum_of_deltas_and_monotone(steps in arb_steps()) {
            let origin = Cell::new("A", 0, 0, 0);
            let steps: Vec<Step> = steps
                .iter()
                .map(|&(x, d)| Step::new(Cell::new("A", x, 0, 0), d, ModeType::Walk))
                .collect();
            let expected: f64 = steps.iter().map(|s| s.delta).sum();
            let path = Path::new(origin, steps).unwrap();

            prop_assert!((path.cost() - expected).abs() < 1e-6);
            prop_assert!(path.validate().is_ok());

            let running: Vec<f64> = path.cumulative_costs().collect();
            prop_assert!(running.windows(2).all(|w| w[0] <= w[1]));
        }

        #[test]
        fn groups_equal_iff_same_members(a in arb_modes(), b in arb_modes()) {
            let ga: ModeTypeGroup = a.iter().map(|&i| ModeType::from_id(i).unwrap()).collect();
            let gb: ModeTypeGroup = b.iter().map(|&i| ModeType::from_id(i).unwrap()).collect();

            let sa: std::collections::BTreeSet<u8> = a.iter().copied().collect();
            let sb: std::collections::BTreeSet<u8> = b.iter().copied().collect();

            prop_assert_eq!(ga == gb, sa == sb);
            prop_assert_eq!(ga.accumulation() == gb.accumulation(), sa == sb);
            prop_assert_eq!(ga, ga);
            prop_assert_eq!(ga == gb, gb == ga);
        }
    }

    #[test]
    fn every_subset_has_a_distinct_accumulation() {
        let mut seen = std::collections::HashSet::new();
        for bits in 0u16..(1 << ModeType::ALL.len()) {
            let group: ModeTypeGroup = ModeType::ALL
                .iter()
                .copied()
                .filter(|m| bits & (1 << m.id()) != 0)
                .collect();
            assert!(seen.insert(group.accumulation()), "collision at {bits:#x}");
        }
        assert_eq!(seen.len(), 1 << ModeType::ALL.len());
    }
}

// ── Alternating sequence and itinerary ───────────────────────────────────────

#[cfg(test)]
mod alternating {
    use crate::{AlternatingBuilder, Element, ElementKind};

    #[test]
    fn builder_grows_both_ends() {
        let mut b = AlternatingBuilder::new("P1");
        b.append(1, "P2").prepend("P0", 0).append(2, "P3");
        let seq = b.build();

        assert_eq!(seq.majors(), &["P0", "P1", "P2", "P3"]);
        assert_eq!(seq.minors(), &[0, 1, 2]);
        assert_eq!(*seq.first(), "P0");
        assert_eq!(*seq.last(), "P3");
        assert_eq!(seq.majors().len(), seq.minors().len() + 1);
    }

    #[test]
    fn cursor_alternates() {
        let mut b = AlternatingBuilder::new('a');
        b.append(1u8, 'b');
        let seq = b.build();

        let mut cur = seq.cursor();
        assert_eq!(cur.peek_kind(), Some(ElementKind::Major));
        assert_eq!(cur.next_minor(), None, "minor requested out of turn");
        assert_eq!(cur.next_major(), Some(&'a'));
        assert_eq!(cur.next_major(), None);
        assert_eq!(cur.next_minor(), Some(&1));
        assert_eq!(cur.next_major(), Some(&'b'));
        assert!(!cur.has_next());
    }

    #[test]
    fn flatten_and_map() {
        let mut b = AlternatingBuilder::new(10);
        b.append("x", 20);
        let seq = b.build();

        let flat = seq.flatten(|m| m.to_string(), |s| s.to_string());
        assert_eq!(flat, vec!["10", "x", "20"]);

        let mapped = seq.map(|m| m * 2, |s| s.len());
        assert_eq!(mapped.majors(), &[20, 40]);
        assert_eq!(mapped.minors(), &[1]);

        let kinds: Vec<bool> = seq.iter().map(|e| matches!(e, Element::Major(_))).collect();
        assert_eq!(kinds, vec![true, false, true]);
    }
}

#[cfg(test)]
mod itinerary {
    use crate::{Cell, Itinerary, ModeType, Path, Port, Step};

    #[test]
    fn cost_sums_ports_and_paths() {
        let a0 = Cell::new("A", 0, 0, 0);
        let b10 = Cell::new("B", 10, 0, 0);
        let b12 = Cell::new("B", 12, 0, 0);

        let port = Port::new(a0.clone(), b10.clone(), ModeType::Tunnel, 5.0).unwrap();
        let tail = Path::new(
            b10.clone(),
            vec![
                Step::new(Cell::new("B", 11, 0, 0), 1.0, ModeType::Walk),
                Step::new(b12.clone(), 1.0, ModeType::Walk),
            ],
        )
        .unwrap();

        let mut b = Itinerary::builder(port);
        b.append(tail, Port::stationary(b12.clone()));
        let it = b.build();

        assert_eq!(it.total_cost(), 7.0);
        assert_eq!(it.origin(), &a0);
        assert_eq!(it.destination(), &b12);
        assert_eq!(it.crossing_count(), 1);
        assert_eq!(it.ports().len(), it.paths().len() + 1);
        assert_eq!(it.segments().len(), 3);
    }

    #[test]
    fn stationary_itinerary() {
        let it = Itinerary::stationary(Cell::new("A", 1, 1, 1));
        assert_eq!(it.total_cost(), 0.0);
        assert_eq!(it.ports().len(), 1);
        assert!(it.paths().is_empty());
    }
}

// ── Cost functions ────────────────────────────────────────────────────────────

#[cfg(test)]
mod cost {
    use crate::{AccumulatorKind, Cell, CostConfig, HeuristicKind, NavError};

    fn c(x: i32, y: i32, z: i32) -> Cell {
        Cell::new("A", x, y, z)
    }

    #[test]
    fn unit_walk_costs_one_under_every_accumulator() {
        for kind in [AccumulatorKind::Euclidean, AccumulatorKind::Manhattan] {
            let f = CostConfig { accumulator: kind, ..Default::default() }.build();
            assert_eq!(f.accumulator.increment(&c(0, 0, 0), &c(1, 0, 0), 1.0), 1.0);
            assert_eq!(f.accumulator.accumulate(3.0, &c(0, 0, 0), &c(0, 0, 1), 1.0), 4.0);
        }
        let w = CostConfig {
            accumulator: AccumulatorKind::Weighted { weight: 2.5 },
            ..Default::default()
        }
        .build();
        assert_eq!(w.accumulator.increment(&c(0, 0, 0), &c(1, 0, 0), 1.0), 2.5);
    }

    #[test]
    fn planar_charges_vertical_as_stairs() {
        let f = CostConfig { heuristic: HeuristicKind::PlanarOriented, ..Default::default() }.build();
        let flat = f.heuristic.estimate(&c(0, 0, 0), &c(3, 0, 4));
        assert!((flat - 5.0).abs() < 1e-9);
        let up = f.heuristic.estimate(&c(0, 0, 0), &c(0, 2, 0));
        assert!((up - 2.0 * std::f64::consts::SQRT_2).abs() < 1e-9);
    }

    #[test]
    fn blended_penalizes_altitude() {
        let f = CostConfig {
            heuristic: HeuristicKind::Blended { altitude_threshold: 10, altitude_penalty: 1.0 },
            ..Default::default()
        }
        .build();
        let low = f.heuristic.estimate(&c(0, 5, 0), &c(5, 5, 0));
        let high = f.heuristic.estimate(&c(0, 15, 0), &c(5, 15, 0));
        assert!((low - 5.0).abs() < 1e-9);
        assert!((high - 10.0).abs() < 1e-9);
    }

    #[test]
    fn validate_rejects_negative_or_non_finite_parameters() {
        assert!(CostConfig::default().validate().is_ok());
        for weight in [-1.0, f64::NAN, f64::INFINITY] {
            let config = CostConfig {
                accumulator: AccumulatorKind::Weighted { weight },
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(NavError::Config(_))), "weight {weight}");
        }
        let config = CostConfig {
            heuristic: HeuristicKind::Blended { altitude_threshold: 0, altitude_penalty: f64::NAN },
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = CostConfig {
            accumulator: AccumulatorKind::Weighted { weight: 0.0 },
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn priority_is_g_plus_h() {
        let f = CostConfig { heuristic: HeuristicKind::Manhattan, ..Default::default() }.build();
        assert_eq!(f.priority(2.0, &c(0, 0, 0), &c(1, 1, 1)), 5.0);
    }
}

// ── Budgets ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod budget {
    use std::time::Duration;

    use crate::{BudgetMeter, SearchBudget, Tick};

    #[test]
    fn iteration_cap() {
        let mut m = BudgetMeter::new(SearchBudget::iterations(2));
        m.start();
        assert!(!m.exhausted());
        m.tick();
        m.tick();
        assert!(m.exhausted());
        m.reset();
        assert!(!m.exhausted());
    }

    #[test]
    fn zero_timeout_expires_after_start() {
        let mut m = BudgetMeter::new(SearchBudget::UNLIMITED.with_timeout(Duration::ZERO));
        assert!(!m.exhausted(), "clock has not started");
        m.start();
        assert!(m.exhausted());
    }

    #[test]
    fn remaining_shrinks_with_use() {
        let mut m = BudgetMeter::new(SearchBudget::iterations(5).with_timeout(Duration::from_secs(60)));
        assert_eq!(m.remaining(), m.budget(), "nothing spent before start");
        m.start();
        m.tick();
        m.add(2);
        let left = m.remaining();
        assert_eq!(left.max_iterations, Some(2));
        assert!(left.timeout.is_some_and(|t| t <= Duration::from_secs(60)));
        assert_eq!(BudgetMeter::new(SearchBudget::UNLIMITED).remaining(), SearchBudget::UNLIMITED);
    }

    #[test]
    fn tick_arithmetic() {
        assert_eq!(Tick(3) + 2, Tick(5));
        assert_eq!(Tick(5).since(Tick(3)), 2);
        assert_eq!(Tick(1).since(Tick(3)), 0);
    }
}
