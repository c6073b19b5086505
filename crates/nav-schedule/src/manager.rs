//! `DistributedWorkManager`: fair, capped, cooperative scheduling of
//! [`WorkItem`]s across owners.
//!
//! # Caps
//!
//! At most `global_cap` items are *active* at once, and at most
//! `per_owner_cap` of them may belong to one owner.  Everything else waits in
//! a pending queue ordered by submission.
//!
//! # Admission
//!
//! Whenever slots free up, the manager admits pending items one at a time.
//! Only the oldest pending item of each owner is a candidate, which keeps
//! admission FIFO within an owner.  Among candidates whose owner is below
//! the per-owner cap, the winner is chosen by:
//!
//! 1. fewest active items for its owner,
//! 2. least recently served owner,
//! 3. oldest submission.
//!
//! # Deactivation
//!
//! At the start of a pass, if the global cap is saturated and a candidate is
//! waiting, the manager looks for an owner holding at least two more active
//! items than the waiting owner.  That owner's most recently admitted item
//! returns to the pending queue at its original position, and the waiting
//! item takes the slot.  The returned item is `reset` at the start of its
//! next slice, outside the manager lock.  An owner loses at most one item to
//! deactivation per pass, so every pass makes progress on every owner that
//! kept a slot.
//!
//! # Locking
//!
//! All bookkeeping sits behind one `parking_lot::Mutex`.  A pass checks items
//! out of their slots under the lock, runs them with the lock released, and
//! checks them back in.  A checked-out item still counts against both caps.
//! No `WorkItem` method is ever called with the lock held.
//! Panics inside `run` are caught and retire the item as an Error.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};

use parking_lot::Mutex;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, error, trace};

use nav_core::{ItemId, OwnerId};

use crate::{ScheduleError, ScheduleResult, WorkItem, WorkStatus};

// ── Config ────────────────────────────────────────────────────────────────────

/// Global cap G and per-owner cap P.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ManagerConfig {
    pub global_cap:    usize,
    pub per_owner_cap: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self { global_cap: 8, per_owner_cap: 2 }
    }
}

impl ManagerConfig {
    /// Require `1 ≤ P ≤ G`.
    pub fn validate(&self) -> ScheduleResult<()> {
        if self.global_cap == 0 {
            return Err(ScheduleError::InvalidConfig("global cap must be at least 1".into()));
        }
        if self.per_owner_cap == 0 {
            return Err(ScheduleError::InvalidConfig("per-owner cap must be at least 1".into()));
        }
        if self.per_owner_cap > self.global_cap {
            return Err(ScheduleError::InvalidConfig(format!(
                "per-owner cap {} exceeds global cap {}",
                self.per_owner_cap, self.global_cap
            )));
        }
        Ok(())
    }
}

// ── Reports ───────────────────────────────────────────────────────────────────

/// How an item left the manager.
#[derive(Clone, Debug, PartialEq)]
pub enum WorkOutcome {
    Completed,
    Canceled,
    /// `run` returned an error or panicked.
    Error(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FinishedWork {
    pub item:    ItemId,
    pub owner:   OwnerId,
    pub name:    String,
    pub outcome: WorkOutcome,
}

/// Point-in-time counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ManagerStats {
    pub active:  usize,
    pub pending: usize,
    /// Active items per owner, sorted by owner.  Owners with none are omitted.
    pub per_owner_active: Vec<(OwnerId, usize)>,
    pub submitted:     u64,
    pub completed:     u64,
    pub canceled:      u64,
    pub errored:       u64,
    pub deactivations: u64,
    pub passes:        u64,
}

// ── Internal state ────────────────────────────────────────────────────────────

struct PendingEntry {
    id:    ItemId,
    owner: OwnerId,
    item:  Box<dyn WorkItem>,
    /// Deactivated; reset before the next slice.
    stale: bool,
}

struct ActiveEntry {
    id:    ItemId,
    owner: OwnerId,
    name:  String,
    /// `None` while checked out for a pass.
    item:  Option<Box<dyn WorkItem>>,
    stale: bool,
    cancel_requested: bool,
}

/// An item checked out of its slot for one slice.
struct CheckedOut {
    id:    ItemId,
    item:  Box<dyn WorkItem>,
    stale: bool,
}

struct SliceResult {
    id:     ItemId,
    item:   Box<dyn WorkItem>,
    result: Result<WorkStatus, String>,
}

#[derive(Default)]
struct ManagerState {
    next_id: u64,
    /// Sorted by `id`, which is the submission order.
    pending: VecDeque<PendingEntry>,
    /// In admission order.
    active: Vec<ActiveEntry>,
    owner_active: FxHashMap<OwnerId, usize>,
    /// Pass number at which each owner last had an item run.
    last_served: FxHashMap<OwnerId, u64>,
    /// Owners that already lost an item during the current pass.
    deactivated: FxHashSet<OwnerId>,
    finished: Vec<FinishedWork>,

    submitted:     u64,
    completed:     u64,
    canceled:      u64,
    errored:       u64,
    deactivations: u64,
    passes:        u64,
}

impl ManagerState {
    fn active_of(&self, owner: OwnerId) -> usize {
        self.owner_active.get(&owner).copied().unwrap_or(0)
    }

    /// Position in `pending` of the best admissible candidate, ignoring the
    /// global cap.
    fn next_candidate(&self, per_owner_cap: usize) -> Option<usize> {
        let mut seen = FxHashSet::default();
        let mut best: Option<((usize, u64, ItemId), usize)> = None;
        for (pos, entry) in self.pending.iter().enumerate() {
            if !seen.insert(entry.owner) {
                continue;
            }
            let active = self.active_of(entry.owner);
            if active >= per_owner_cap {
                continue;
            }
            let served = self.last_served.get(&entry.owner).copied().unwrap_or(0);
            let key = (active, served, entry.id);
            if best.as_ref().is_none_or(|(k, _)| key < *k) {
                best = Some((key, pos));
            }
        }
        best.map(|(_, pos)| pos)
    }

    fn admit(&mut self, config: &ManagerConfig, preempt: bool) {
        while let Some(pos) = self.next_candidate(config.per_owner_cap) {
            if self.active.len() < config.global_cap {
                self.activate(pos);
            } else if !(preempt && self.deactivate_for(pos)) {
                break;
            }
        }
    }

    fn activate(&mut self, pos: usize) {
        let Some(entry) = self.pending.remove(pos) else { return };
        *self.owner_active.entry(entry.owner).or_insert(0) += 1;
        debug!(item = %entry.id, owner = %entry.owner, name = entry.item.name(), "admitted work item");
        self.active.push(ActiveEntry {
            id:    entry.id,
            owner: entry.owner,
            name:  entry.item.name().to_owned(),
            item:  Some(entry.item),
            stale: entry.stale,
            cancel_requested: false,
        });
    }

    /// Free one slot for the candidate at `pos` by deactivating an item of an
    /// over-represented owner.  Returns `false` if no owner qualifies.
    fn deactivate_for(&mut self, pos: usize) -> bool {
        let waiting = self.pending[pos].owner;
        let waiting_active = self.active_of(waiting);

        let victim_owner = self
            .owner_active
            .iter()
            .filter(|&(&owner, &count)| {
                owner != waiting
                    && count > waiting_active + 1
                    && !self.deactivated.contains(&owner)
            })
            .max_by_key(|&(&owner, &count)| {
                (count, self.last_served.get(&owner).copied().unwrap_or(0), owner)
            })
            .map(|(&owner, _)| owner);
        let Some(victim_owner) = victim_owner else { return false };

        let Some(idx) = self
            .active
            .iter()
            .rposition(|a| a.owner == victim_owner && a.item.is_some() && !a.cancel_requested)
        else {
            return false;
        };
        let entry = self.active.remove(idx);
        self.release_slot(entry.owner);
        let Some(item) = entry.item else { return false };

        debug!(
            item = %entry.id,
            owner = %entry.owner,
            name = %entry.name,
            for_owner = %waiting,
            "deactivated work item"
        );
        let at = self.pending.partition_point(|p| p.id < entry.id);
        self.pending.insert(at, PendingEntry { id: entry.id, owner: entry.owner, item, stale: true });
        self.deactivated.insert(victim_owner);
        self.deactivations += 1;
        true
    }

    fn release_slot(&mut self, owner: OwnerId) {
        if let Some(count) = self.owner_active.get_mut(&owner) {
            *count -= 1;
            if *count == 0 {
                self.owner_active.remove(&owner);
            }
        }
    }

    /// Remove the active entry at `idx` and record its outcome.
    fn retire(&mut self, idx: usize, outcome: WorkOutcome) -> ActiveEntry {
        let entry = self.active.remove(idx);
        self.release_slot(entry.owner);
        self.record(entry.id, entry.owner, entry.name.clone(), outcome);
        entry
    }

    fn record(&mut self, item: ItemId, owner: OwnerId, name: String, outcome: WorkOutcome) {
        match outcome {
            WorkOutcome::Completed => self.completed += 1,
            WorkOutcome::Canceled  => self.canceled += 1,
            WorkOutcome::Error(_)  => self.errored += 1,
        }
        self.finished.push(FinishedWork { item, owner, name, outcome });
    }
}

// ── DistributedWorkManager ────────────────────────────────────────────────────

/// Fair cooperative scheduler over opaque [`WorkItem`]s.
///
/// Shareable across threads (`&self` API).  Drive it by calling
/// [`run_pass`][Self::run_pass] (or the rayon-backed
/// [`run_pass_parallel`][Self::run_pass_parallel]) repeatedly, typically from
/// a repeating executor task.
pub struct DistributedWorkManager {
    config: ManagerConfig,
    state:  Mutex<ManagerState>,
}

impl DistributedWorkManager {
    pub fn new(config: ManagerConfig) -> ScheduleResult<Self> {
        config.validate()?;
        Ok(Self { config, state: Mutex::new(ManagerState::default()) })
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Queue `item`, admitting it immediately if a slot is free.
    pub fn submit(&self, item: Box<dyn WorkItem>) -> ItemId {
        let mut state = self.state.lock();
        let id = ItemId(state.next_id);
        state.next_id += 1;
        state.submitted += 1;
        let owner = item.owner();
        trace!(item = %id, owner = %owner, name = item.name(), "submitted work item");
        state.pending.push_back(PendingEntry { id, owner, item, stale: false });
        state.admit(&self.config, false);
        id
    }

    /// Run one slice of every active item on the calling thread.
    ///
    /// Returns the number of items run.
    pub fn run_pass(&self) -> usize {
        let batch = self.begin_pass();
        let ran = batch.len();
        let results = batch.into_iter().map(run_slice).collect();
        self.end_pass(results);
        ran
    }

    /// Like [`run_pass`][Self::run_pass], running the slices on the rayon
    /// pool.
    pub fn run_pass_parallel(&self) -> usize {
        let batch = self.begin_pass();
        let ran = batch.len();
        let results = batch.into_par_iter().map(run_slice).collect();
        self.end_pass(results);
        ran
    }

    /// Run passes until nothing is left or `max_passes` is reached.
    ///
    /// Returns the number of passes run.
    pub fn run_until_idle(&self, max_passes: usize) -> usize {
        let mut passes = 0;
        while passes < max_passes && !self.is_idle() {
            self.run_pass();
            passes += 1;
        }
        passes
    }

    fn begin_pass(&self) -> Vec<CheckedOut> {
        let mut state = self.state.lock();
        state.passes += 1;
        let pass = state.passes;
        state.deactivated.clear();
        state.admit(&self.config, true);

        let mut batch = Vec::with_capacity(state.active.len());
        let mut served = Vec::with_capacity(state.active.len());
        for entry in state.active.iter_mut() {
            if let Some(item) = entry.item.take() {
                served.push(entry.owner);
                batch.push(CheckedOut { id: entry.id, item, stale: std::mem::take(&mut entry.stale) });
            }
        }
        for owner in served {
            state.last_served.insert(owner, pass);
        }
        batch
    }

    fn end_pass(&self, results: Vec<SliceResult>) {
        let mut retired = Vec::new();
        {
            let mut state = self.state.lock();
            for SliceResult { id, item, result } in results {
                let Some(idx) = state.active.iter().position(|a| a.id == id) else { continue };
                if state.active[idx].cancel_requested {
                    state.retire(idx, WorkOutcome::Canceled);
                    retired.push((item, WorkOutcome::Canceled));
                    continue;
                }
                match result {
                    Ok(WorkStatus::NotDone) => state.active[idx].item = Some(item),
                    Ok(WorkStatus::Done) => {
                        let entry = state.retire(idx, WorkOutcome::Completed);
                        debug!(item = %entry.id, owner = %entry.owner, name = %entry.name, "work item completed");
                        retired.push((item, WorkOutcome::Completed));
                    }
                    Err(message) => {
                        let entry = state.retire(idx, WorkOutcome::Error(message.clone()));
                        error!(
                            item = %entry.id,
                            owner = %entry.owner,
                            name = %entry.name,
                            error = %message,
                            "work item faulted"
                        );
                        retired.push((item, WorkOutcome::Error(message)));
                    }
                }
            }
            state.admit(&self.config, false);
        }
        for (mut item, outcome) in retired {
            item.retire(&outcome);
        }
    }

    /// Cancel one item.
    ///
    /// Pending and idle active items are retired at once.  An item that is
    /// running in a pass is retired as Canceled when its slice returns.
    ///
    /// # Errors
    /// [`ScheduleError::UnknownItem`] if `id` is not (or no longer) managed.
    pub fn cancel(&self, id: ItemId) -> ScheduleResult<()> {
        let item = {
            let mut state = self.state.lock();
            if let Some(pos) = state.pending.iter().position(|p| p.id == id) {
                let Some(entry) = state.pending.remove(pos) else {
                    return Err(ScheduleError::UnknownItem(id));
                };
                let name = entry.item.name().to_owned();
                state.record(entry.id, entry.owner, name, WorkOutcome::Canceled);
                Some(entry.item)
            } else if let Some(idx) = state.active.iter().position(|a| a.id == id) {
                if state.active[idx].cancel_requested {
                    return Err(ScheduleError::UnknownItem(id));
                }
                if state.active[idx].item.is_some() {
                    let entry = state.retire(idx, WorkOutcome::Canceled);
                    state.admit(&self.config, false);
                    entry.item
                } else {
                    state.active[idx].cancel_requested = true;
                    None
                }
            } else {
                return Err(ScheduleError::UnknownItem(id));
            }
        };
        debug!(item = %id, "canceled work item");
        if let Some(mut item) = item {
            item.retire(&WorkOutcome::Canceled);
        }
        Ok(())
    }

    /// Cancel every pending and active item of `owner`.  Returns how many
    /// were canceled.
    pub fn cancel_owner(&self, owner: OwnerId) -> usize {
        let ids: Vec<ItemId> = {
            let state = self.state.lock();
            state
                .pending
                .iter()
                .filter(|p| p.owner == owner)
                .map(|p| p.id)
                .chain(
                    state
                        .active
                        .iter()
                        .filter(|a| a.owner == owner && !a.cancel_requested)
                        .map(|a| a.id),
                )
                .collect()
        };
        ids.into_iter().filter(|&id| self.cancel(id).is_ok()).count()
    }

    /// Drain the reports of items retired since the last call.
    pub fn take_finished(&self) -> Vec<FinishedWork> {
        std::mem::take(&mut self.state.lock().finished)
    }

    pub fn stats(&self) -> ManagerStats {
        let state = self.state.lock();
        let mut per_owner_active: Vec<(OwnerId, usize)> =
            state.owner_active.iter().map(|(&o, &n)| (o, n)).collect();
        per_owner_active.sort_unstable();
        ManagerStats {
            active:  state.active.len(),
            pending: state.pending.len(),
            per_owner_active,
            submitted:     state.submitted,
            completed:     state.completed,
            canceled:      state.canceled,
            errored:       state.errored,
            deactivations: state.deactivations,
            passes:        state.passes,
        }
    }

    /// `true` if `id` is pending or active.
    pub fn contains(&self, id: ItemId) -> bool {
        let state = self.state.lock();
        state.pending.iter().any(|p| p.id == id) || state.active.iter().any(|a| a.id == id)
    }

    pub fn is_idle(&self) -> bool {
        let state = self.state.lock();
        state.pending.is_empty() && state.active.is_empty()
    }
}

fn run_slice(CheckedOut { id, mut item, stale }: CheckedOut) -> SliceResult {
    let slice = || {
        if stale {
            item.reset();
        }
        item.run()
    };
    let result = match panic::catch_unwind(AssertUnwindSafe(slice)) {
        Ok(Ok(status)) => Ok(status),
        Ok(Err(err)) => Err(err.to_string()),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    };
    SliceResult { id, item, result }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}
