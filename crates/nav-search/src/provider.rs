//! Mode providers: the pluggable source of local movement options.

use std::sync::Arc;

use nav_core::{Cell, ModeType, ModeTypeGroup};

use crate::{ProviderError, SearchFlags};

/// One reachable neighbour proposed by a provider.
///
/// `cost` is the provider's price per unit of distance; the configured
/// [`CostAccumulator`][nav_core::CostAccumulator] turns it into the step
/// delta.
#[derive(Clone, Debug, PartialEq)]
pub struct ModeOption {
    pub destination: Cell,
    pub cost:        f64,
    pub mode:        ModeType,
}

/// Enumerates the cells reachable from a cell by one kind of movement.
///
/// Implementations may perform expensive world queries but must not depend
/// on search state.  Options leading into another domain are ignored.
pub trait ModeProvider: Send + Sync {
    fn mode_type(&self) -> ModeType;

    fn collect_options(
        &self,
        origin: &Cell,
        flags:  &SearchFlags,
    ) -> Result<Vec<ModeOption>, ProviderError>;
}

/// The set of modes a provider list may use under `flags`.
pub fn allowed_modes(providers: &[Arc<dyn ModeProvider>], flags: &SearchFlags) -> ModeTypeGroup {
    providers
        .iter()
        .map(|p| p.mode_type())
        .filter(|&m| flags.allows(m))
        .collect()
}

// ── AxisStepProvider ──────────────────────────────────────────────────────────

const HORIZONTAL: [(i32, i32, i32); 4] = [(1, 0, 0), (-1, 0, 0), (0, 0, 1), (0, 0, -1)];
const VERTICAL: [(i32, i32, i32); 2] = [(0, 1, 0), (0, -1, 0)];

/// Unit moves along the axes, filtered by a passability predicate.
///
/// Horizontal moves (±x, ±z) are always considered; vertical moves (±y) only
/// after [`with_vertical`][Self::with_vertical].
pub struct AxisStepProvider<F> {
    mode:     ModeType,
    cost:     f64,
    vertical: bool,
    passable: F,
}

impl<F> AxisStepProvider<F>
where
    F: Fn(&Cell) -> bool + Send + Sync,
{
    pub fn new(mode: ModeType, cost: f64, passable: F) -> Self {
        Self { mode, cost, vertical: false, passable }
    }

    pub fn with_vertical(mut self) -> Self {
        self.vertical = true;
        self
    }
}

fn open(_: &Cell) -> bool {
    true
}

impl AxisStepProvider<fn(&Cell) -> bool> {
    /// Axis moves with nothing in the way.
    pub fn unobstructed(mode: ModeType, cost: f64) -> Self {
        Self::new(mode, cost, open as fn(&Cell) -> bool)
    }
}

impl<F> ModeProvider for AxisStepProvider<F>
where
    F: Fn(&Cell) -> bool + Send + Sync,
{
    fn mode_type(&self) -> ModeType {
        self.mode
    }

    fn collect_options(
        &self,
        origin: &Cell,
        flags:  &SearchFlags,
    ) -> Result<Vec<ModeOption>, ProviderError> {
        if !flags.allows(self.mode) {
            return Ok(Vec::new());
        }
        let vertical: &[(i32, i32, i32)] = if self.vertical { &VERTICAL } else { &[] };
        Ok(HORIZONTAL
            .iter()
            .chain(vertical)
            .map(|&(dx, dy, dz)| origin.offset(dx, dy, dz))
            .filter(|cell| (self.passable)(cell))
            .map(|destination| ModeOption { destination, cost: self.cost, mode: self.mode })
            .collect())
    }
}
