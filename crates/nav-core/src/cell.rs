//! Discrete world coordinates.
//!
//! A [`Cell`] is an integer `(x, y, z)` position inside one domain.  The
//! domain itself (a map, a world, a dimension) is never stored by value: the
//! cell only carries a cheap [`DomainId`] and resolves the real domain through
//! a host-supplied [`DomainLookup`] when something actually needs it.

use std::fmt;
use std::sync::Arc;

// ── DomainId ──────────────────────────────────────────────────────────────────

/// Opaque identifier of a domain.  Cloning is a reference-count bump.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct DomainId(Arc<str>);

impl DomainId {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DomainId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for DomainId {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for DomainId {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let name = String::deserialize(d)?;
        Ok(DomainId::new(name))
    }
}

// ── DomainLookup ──────────────────────────────────────────────────────────────

/// Host-side resolver from a [`DomainId`] to the live domain object.
///
/// Returns `None` when the domain is not (or no longer) loaded.
pub trait DomainLookup {
    type Domain;

    fn resolve(&self, id: &DomainId) -> Option<Self::Domain>;
}

// ── Cell ──────────────────────────────────────────────────────────────────────

/// An integer position inside one domain.
///
/// Equality and hashing cover all four fields, so the same coordinates in two
/// domains are different cells.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cell {
    pub domain: DomainId,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Cell {
    pub fn new(domain: impl Into<DomainId>, x: i32, y: i32, z: i32) -> Self {
        Self { domain: domain.into(), x, y, z }
    }

    /// The cell displaced by `(dx, dy, dz)` in the same domain.
    /// Coordinates saturate at the bounds of `i32`.
    #[inline]
    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Cell {
        Cell {
            domain: self.domain.clone(),
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            z: self.z.saturating_add(dz),
        }
    }

    #[inline]
    pub fn same_domain(&self, other: &Cell) -> bool {
        self.domain == other.domain
    }

    /// Resolve the live domain through `lookup`.
    pub fn resolve<L: DomainLookup>(&self, lookup: &L) -> Option<L::Domain> {
        lookup.resolve(&self.domain)
    }

    /// Per-axis absolute deltas `(|dx|, |dy|, |dz|)` as floats.
    #[inline]
    pub fn deltas(&self, other: &Cell) -> (f64, f64, f64) {
        (
            (other.x as f64 - self.x as f64).abs(),
            (other.y as f64 - self.y as f64).abs(),
            (other.z as f64 - self.z as f64).abs(),
        )
    }

    /// Straight-line distance, ignoring domains.
    #[inline]
    pub fn euclidean(&self, other: &Cell) -> f64 {
        let (dx, dy, dz) = self.deltas(other);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Taxicab distance, ignoring domains.
    #[inline]
    pub fn manhattan(&self, other: &Cell) -> f64 {
        let (dx, dy, dz) = self.deltas(other);
        dx + dy + dz
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:({}, {}, {})", self.domain, self.x, self.y, self.z)
    }
}
