//! Path record cache contract and an in-memory implementation.
//!
//! Itinerary search consults a [`PathRecordManager`] before validating a
//! leg and reports every leg it validates.  Storage is the implementor's
//! concern; [`InMemoryPathCache`] keeps records in a hash map and stops
//! inserting once a total cell budget is reached.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::warn;

use nav_core::{Cell, ModeTypeGroup, Path};

use crate::{SearchError, SearchResult};

/// Cache key: a leg and the set of modes it may use.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PathKey {
    pub origin:      Cell,
    pub destination: Cell,
    pub modes:       ModeTypeGroup,
}

/// A validated path and how it was obtained.
#[derive(Clone, Debug, PartialEq)]
pub struct PathRecord {
    pub path:     Path,
    pub modes:    ModeTypeGroup,
    /// Wall-clock time the search took.
    pub duration: Duration,
    /// Optional per-cell diagnostics.
    pub cell_metadata: Vec<(Cell, String)>,
}

impl PathRecord {
    pub fn new(path: Path, modes: ModeTypeGroup, duration: Duration) -> Self {
        Self { path, modes, duration, cell_metadata: Vec::new() }
    }

    pub fn key(&self) -> PathKey {
        PathKey {
            origin:      self.path.origin().clone(),
            destination: self.path.destination().clone(),
            modes:       self.modes,
        }
    }

    /// Check that the record answers `key` and that its path is well formed.
    ///
    /// # Errors
    /// [`SearchError::MalformedRecord`] describing the first problem found.
    pub fn check(&self, key: &PathKey) -> SearchResult<()> {
        let malformed = |reason: String| SearchError::MalformedRecord {
            origin:      key.origin.clone(),
            destination: key.destination.clone(),
            reason,
        };
        if self.path.origin() != &key.origin || self.path.destination() != &key.destination {
            return Err(malformed(format!(
                "record covers {} -> {}",
                self.path.origin(),
                self.path.destination()
            )));
        }
        if self.modes != key.modes {
            return Err(malformed(format!("record modes {} differ from {}", self.modes, key.modes)));
        }
        self.path.validate().map_err(|e| malformed(e.to_string()))
    }
}

/// Lookup/report contract for previously validated paths.
pub trait PathRecordManager: Send + Sync {
    /// Pure read.
    fn lookup(&self, key: &PathKey) -> SearchResult<Option<PathRecord>>;

    /// Offer a record for storage.  Implementations may silently decline.
    fn report(&self, record: PathRecord) -> SearchResult<()>;
}

/// Never stores anything.
pub struct NoPathCache;

impl PathRecordManager for NoPathCache {
    fn lookup(&self, _key: &PathKey) -> SearchResult<Option<PathRecord>> {
        Ok(None)
    }

    fn report(&self, _record: PathRecord) -> SearchResult<()> {
        Ok(())
    }
}

// ── InMemoryPathCache ─────────────────────────────────────────────────────────

#[derive(Default)]
struct CacheInner {
    records: FxHashMap<PathKey, PathRecord>,
    /// Sum of `path.len() + 1` over all records.
    cells:   usize,
}

/// Thread-safe in-memory record store with a total cell budget.
///
/// A report for an existing key replaces the record only if the new path is
/// cheaper.  Once the budget is reached further insertions are skipped and a
/// single warning is logged.
pub struct InMemoryPathCache {
    max_cells: usize,
    inner:     RwLock<CacheInner>,
    warned:    AtomicBool,
}

impl InMemoryPathCache {
    pub fn new(max_cells: usize) -> Self {
        Self { max_cells, inner: RwLock::new(CacheInner::default()), warned: AtomicBool::new(false) }
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cells currently held across all records.
    pub fn cached_cells(&self) -> usize {
        self.inner.read().cells
    }

    pub fn max_cells(&self) -> usize {
        self.max_cells
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.records.clear();
        inner.cells = 0;
    }
}

fn cell_count(path: &Path) -> usize {
    path.len() + 1
}

impl PathRecordManager for InMemoryPathCache {
    fn lookup(&self, key: &PathKey) -> SearchResult<Option<PathRecord>> {
        Ok(self.inner.read().records.get(key).cloned())
    }

    fn report(&self, record: PathRecord) -> SearchResult<()> {
        let key = record.key();
        let new_cells = cell_count(&record.path);
        let mut inner = self.inner.write();

        let old_cells = match inner.records.get(&key) {
            Some(existing) if existing.path.cost() <= record.path.cost() => return Ok(()),
            Some(existing) => cell_count(&existing.path),
            None => 0,
        };
        if inner.cells - old_cells + new_cells > self.max_cells {
            if !self.warned.swap(true, Ordering::Relaxed) {
                warn!(
                    max_cells = self.max_cells,
                    cached_cells = inner.cells,
                    "path cache cell budget reached; further records are not stored"
                );
            }
            return Ok(());
        }
        inner.cells = inner.cells - old_cells + new_cells;
        inner.records.insert(key, record);
        Ok(())
    }
}
