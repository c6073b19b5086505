//! Registered long-range connections.

use std::fmt;

use crate::{Cell, ModeType, NavError, NavResult, Path, Step};

/// A direct connection between two (usually non-adjacent, possibly
/// cross-domain) cells with a fixed mode and cost.
///
/// A port is a single-step [`Path`]; [`Port::to_path`] gives that view.  The
/// *stationary* port (origin = destination, cost 0) bookends itineraries that
/// start or end with a local leg.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Port {
    origin:      Cell,
    destination: Cell,
    mode:        ModeType,
    cost:        f64,
}

impl Port {
    /// # Errors
    /// [`NavError::InvalidPath`] if `cost` is negative or not finite.
    pub fn new(origin: Cell, destination: Cell, mode: ModeType, cost: f64) -> NavResult<Self> {
        if !cost.is_finite() || cost < 0.0 {
            return Err(NavError::InvalidPath(format!(
                "port {origin} -> {destination} has invalid cost {cost}"
            )));
        }
        Ok(Self { origin, destination, mode, cost })
    }

    pub fn stationary(cell: Cell) -> Self {
        Self {
            origin:      cell.clone(),
            destination: cell,
            mode:        ModeType::None,
            cost:        0.0,
        }
    }

    #[inline]
    pub fn origin(&self) -> &Cell {
        &self.origin
    }

    #[inline]
    pub fn destination(&self) -> &Cell {
        &self.destination
    }

    #[inline]
    pub fn mode(&self) -> ModeType {
        self.mode
    }

    #[inline]
    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn is_stationary(&self) -> bool {
        self.origin == self.destination && self.cost == 0.0
    }

    pub fn crosses_domains(&self) -> bool {
        !self.origin.same_domain(&self.destination)
    }

    /// The single-step path this port represents (empty when stationary).
    pub fn to_path(&self) -> Path {
        if self.is_stationary() {
            return Path::stationary(self.origin.clone());
        }
        Path::single(
            self.origin.clone(),
            Step::new(self.destination.clone(), self.cost, self.mode),
        )
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} =[{} {:.2}]=> {}", self.origin, self.mode, self.cost, self.destination)
    }
}
