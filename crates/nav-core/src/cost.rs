//! Pluggable cost strategies for local search.
//!
//! Local search orders its frontier by `f(n) = g(n) + h(n)`:
//!
//! - a [`CostAccumulator`] produces `g(n)` from the parent's cost and one
//!   move, and
//! - a [`Heuristic`] estimates `h(n)`, the remaining cost to the goal.
//!
//! Both are selected at runtime through [`CostConfig`], so search code never
//! names a concrete metric.
//!
//! # Axis convention
//!
//! `y` is vertical.  `x` and `z` span the horizontal plane.
//!
//! # Option costs
//!
//! Mode providers report a per-move *cost factor* (1.0 for a plain walk,
//! more for slow or risky movement).  Accumulators scale the metric length of
//! the move by that factor, so a unit axis-aligned walk costs exactly 1.0
//! under every metric.

use std::fmt;
use std::sync::Arc;

use crate::{Cell, NavError, NavResult};

/// √2, the horizontal-plus-vertical length of one stair step.
const STAIR_FACTOR: f64 = std::f64::consts::SQRT_2;

// ── Traits ────────────────────────────────────────────────────────────────────

/// Computes `g(n)` for a move from `from` to `to`.
pub trait CostAccumulator: Send + Sync {
    /// Cost of the move alone (the step delta recorded in a path).
    fn increment(&self, from: &Cell, to: &Cell, factor: f64) -> f64;

    /// `g(to)` given `g(from)`.
    #[inline]
    fn accumulate(&self, parent: f64, from: &Cell, to: &Cell, factor: f64) -> f64 {
        parent + self.increment(from, to, factor)
    }
}

/// Estimates the remaining cost `h(n)` from `cell` to `goal`.
pub trait Heuristic: Send + Sync {
    fn estimate(&self, cell: &Cell, goal: &Cell) -> f64;
}

// ── Accumulators ──────────────────────────────────────────────────────────────

pub struct EuclideanAccumulator;

impl CostAccumulator for EuclideanAccumulator {
    #[inline]
    fn increment(&self, from: &Cell, to: &Cell, factor: f64) -> f64 {
        from.euclidean(to) * factor
    }
}

pub struct ManhattanAccumulator;

impl CostAccumulator for ManhattanAccumulator {
    #[inline]
    fn increment(&self, from: &Cell, to: &Cell, factor: f64) -> f64 {
        from.manhattan(to) * factor
    }
}

/// Euclidean length scaled by a constant weight.
pub struct WeightedAccumulator {
    pub weight: f64,
}

impl CostAccumulator for WeightedAccumulator {
    #[inline]
    fn increment(&self, from: &Cell, to: &Cell, factor: f64) -> f64 {
        from.euclidean(to) * factor * self.weight
    }
}

// ── Heuristics ────────────────────────────────────────────────────────────────

pub struct EuclideanHeuristic;

impl Heuristic for EuclideanHeuristic {
    #[inline]
    fn estimate(&self, cell: &Cell, goal: &Cell) -> f64 {
        cell.euclidean(goal)
    }
}

pub struct ManhattanHeuristic;

impl Heuristic for ManhattanHeuristic {
    #[inline]
    fn estimate(&self, cell: &Cell, goal: &Cell) -> f64 {
        cell.manhattan(goal)
    }
}

/// Horizontal distance plus a stair-like diagonal charge per vertical unit.
pub struct PlanarOrientedHeuristic;

impl PlanarOrientedHeuristic {
    #[inline]
    fn planar(cell: &Cell, goal: &Cell) -> f64 {
        let (dx, dy, dz) = cell.deltas(goal);
        (dx * dx + dz * dz).sqrt() + dy * STAIR_FACTOR
    }
}

impl Heuristic for PlanarOrientedHeuristic {
    #[inline]
    fn estimate(&self, cell: &Cell, goal: &Cell) -> f64 {
        Self::planar(cell, goal)
    }
}

/// Mean of Euclidean and planar-oriented estimates, plus a penalty for every
/// unit of altitude above `altitude_threshold`.
pub struct BlendedHeuristic {
    pub altitude_threshold: i32,
    pub altitude_penalty:   f64,
}

impl Heuristic for BlendedHeuristic {
    fn estimate(&self, cell: &Cell, goal: &Cell) -> f64 {
        let blended = (cell.euclidean(goal) + PlanarOrientedHeuristic::planar(cell, goal)) * 0.5;
        let above = (cell.y - self.altitude_threshold).max(0) as f64;
        blended + above * self.altitude_penalty
    }
}

// ── Configuration ─────────────────────────────────────────────────────────────

/// Which heuristic to use.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case", tag = "kind"))]
pub enum HeuristicKind {
    #[default]
    Euclidean,
    Manhattan,
    PlanarOriented,
    Blended {
        altitude_threshold: i32,
        altitude_penalty:   f64,
    },
}

/// Which accumulator to use.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case", tag = "kind"))]
pub enum AccumulatorKind {
    #[default]
    Euclidean,
    Manhattan,
    Weighted { weight: f64 },
}

/// `{heuristic, accumulator}` selection.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CostConfig {
    pub heuristic:   HeuristicKind,
    pub accumulator: AccumulatorKind,
}

impl CostConfig {
    /// Reject parameters that would yield negative or non-finite costs.
    pub fn validate(&self) -> NavResult<()> {
        if let HeuristicKind::Blended { altitude_penalty, .. } = self.heuristic {
            if !altitude_penalty.is_finite() || altitude_penalty < 0.0 {
                return Err(NavError::Config(format!(
                    "altitude_penalty must be finite and non-negative, got {altitude_penalty}"
                )));
            }
        }
        if let AccumulatorKind::Weighted { weight } = self.accumulator {
            if !weight.is_finite() || weight < 0.0 {
                return Err(NavError::Config(format!(
                    "accumulator weight must be finite and non-negative, got {weight}"
                )));
            }
        }
        Ok(())
    }

    pub fn build(&self) -> CostFunctions {
        let heuristic: Arc<dyn Heuristic> = match self.heuristic {
            HeuristicKind::Euclidean      => Arc::new(EuclideanHeuristic),
            HeuristicKind::Manhattan      => Arc::new(ManhattanHeuristic),
            HeuristicKind::PlanarOriented => Arc::new(PlanarOrientedHeuristic),
            HeuristicKind::Blended { altitude_threshold, altitude_penalty } => {
                Arc::new(BlendedHeuristic { altitude_threshold, altitude_penalty })
            }
        };
        let accumulator: Arc<dyn CostAccumulator> = match self.accumulator {
            AccumulatorKind::Euclidean          => Arc::new(EuclideanAccumulator),
            AccumulatorKind::Manhattan          => Arc::new(ManhattanAccumulator),
            AccumulatorKind::Weighted { weight } => Arc::new(WeightedAccumulator { weight }),
        };
        CostFunctions { accumulator, heuristic }
    }
}

/// A built accumulator/heuristic pair.  Cheap to clone and shareable across
/// threads.
#[derive(Clone)]
pub struct CostFunctions {
    pub accumulator: Arc<dyn CostAccumulator>,
    pub heuristic:   Arc<dyn Heuristic>,
}

impl CostFunctions {
    /// `f(n) = g(n) + h(n)`.
    #[inline]
    pub fn priority(&self, g: f64, cell: &Cell, goal: &Cell) -> f64 {
        g + self.heuristic.estimate(cell, goal)
    }
}

impl Default for CostFunctions {
    fn default() -> Self {
        CostConfig::default().build()
    }
}

impl fmt::Debug for CostFunctions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CostFunctions").finish_non_exhaustive()
    }
}
