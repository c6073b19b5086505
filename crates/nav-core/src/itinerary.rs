//! Full origin-to-destination plans.

use std::fmt;

use crate::alternating::{AlternatingBuilder, AlternatingSequence, Cursor};
use crate::{Cell, Path, Port};

/// A plan alternating [`Port`]s (majors) and [`Path`]s (minors).
///
/// Always starts and ends with a port; stationary ports stand in at either
/// end when the plan begins or finishes with a local leg.
#[derive(Clone, PartialEq, Debug)]
pub struct Itinerary {
    legs: AlternatingSequence<Port, Path>,
    cost: f64,
}

impl Itinerary {
    /// An itinerary that goes nowhere: a single stationary port at `cell`.
    pub fn stationary(cell: Cell) -> Self {
        Self::from_sequence(AlternatingSequence::single(Port::stationary(cell)))
    }

    pub fn from_sequence(legs: AlternatingSequence<Port, Path>) -> Self {
        let cost = legs.majors().iter().map(Port::cost).sum::<f64>()
            + legs.minors().iter().map(Path::cost).sum::<f64>();
        Self { legs, cost }
    }

    /// Start building at `first`.
    pub fn builder(first: Port) -> ItineraryBuilder {
        ItineraryBuilder { inner: AlternatingBuilder::new(first) }
    }

    /// Sum of every port and path cost.
    #[inline]
    pub fn total_cost(&self) -> f64 {
        self.cost
    }

    pub fn origin(&self) -> &Cell {
        self.legs.first().origin()
    }

    pub fn destination(&self) -> &Cell {
        self.legs.last().destination()
    }

    pub fn ports(&self) -> &[Port] {
        self.legs.majors()
    }

    pub fn paths(&self) -> &[Path] {
        self.legs.minors()
    }

    /// Number of non-stationary ports used.
    pub fn crossing_count(&self) -> usize {
        self.ports().iter().filter(|p| !p.is_stationary()).count()
    }

    pub fn sequence(&self) -> &AlternatingSequence<Port, Path> {
        &self.legs
    }

    pub fn cursor(&self) -> Cursor<'_, Port, Path> {
        self.legs.cursor()
    }

    /// Every port and path as a path, in travel order.
    pub fn segments(&self) -> Vec<Path> {
        self.legs.flatten(Port::to_path, Path::clone)
    }
}

impl fmt::Display for Itinerary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "itinerary {} -> {} ({} crossings, {} paths, cost {:.2})",
            self.origin(),
            self.destination(),
            self.crossing_count(),
            self.paths().len(),
            self.cost
        )
    }
}

/// Builder for [`Itinerary`]; thin wrapper over [`AlternatingBuilder`].
#[derive(Debug)]
pub struct ItineraryBuilder {
    inner: AlternatingBuilder<Port, Path>,
}

impl ItineraryBuilder {
    pub fn append(&mut self, path: Path, port: Port) -> &mut Self {
        self.inner.append(path, port);
        self
    }

    pub fn prepend(&mut self, port: Port, path: Path) -> &mut Self {
        self.inner.prepend(port, path);
        self
    }

    pub fn last_port(&self) -> &Port {
        self.inner.last()
    }

    pub fn build(self) -> Itinerary {
        Itinerary::from_sequence(self.inner.build())
    }
}
