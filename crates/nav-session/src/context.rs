//! The navigation context: every shared collaborator a session needs.
//!
//! A host creates one [`NavContext`] and hands it to whatever creates
//! sessions.  Nothing in this workspace reaches for global state; the work
//! manager, scheduler, path cache and event bus all live here.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};

use nav_core::{OwnerId, SessionId, TaskId};
use nav_schedule::{DistributedWorkManager, SchedulingManager};
use nav_search::{EventBus, InMemoryPathCache, PathRecordManager};

use crate::{SearchConfig, SessionBuilder, SessionResult};

pub struct NavContext {
    config:       SearchConfig,
    manager:      Arc<DistributedWorkManager>,
    scheduler:    Arc<dyn SchedulingManager>,
    cache:        Arc<dyn PathRecordManager>,
    events:       Arc<EventBus>,
    next_session: AtomicU64,
}

impl NavContext {
    /// Validate `config` and build a context with an in-memory path cache
    /// and an empty event bus.
    pub fn new(config: SearchConfig, scheduler: Arc<dyn SchedulingManager>) -> SessionResult<Self> {
        config.validate()?;
        let manager = DistributedWorkManager::new(config.manager)?;
        let cache = Arc::new(InMemoryPathCache::new(config.cache_max_cells));
        Ok(Self {
            manager: Arc::new(manager),
            scheduler,
            cache,
            events: Arc::new(EventBus::new()),
            next_session: AtomicU64::new(0),
            config,
        })
    }

    /// Replace the path cache (e.g. with a persistent store).
    pub fn with_cache(mut self, cache: Arc<dyn PathRecordManager>) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn manager(&self) -> &Arc<DistributedWorkManager> {
        &self.manager
    }

    pub fn scheduler(&self) -> &Arc<dyn SchedulingManager> {
        &self.scheduler
    }

    pub fn cache(&self) -> &Arc<dyn PathRecordManager> {
        &self.cache
    }

    /// Default sink for sessions; subscribe here to observe searches.
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Start describing a new session.
    pub fn session(&self) -> SessionBuilder<'_> {
        SessionBuilder::new(self)
    }

    pub(crate) fn next_session_id(&self) -> SessionId {
        SessionId(self.next_session.fetch_add(1, Ordering::Relaxed))
    }

    /// Cancel every scheduled item of `owner`.  Its sessions end Canceled.
    ///
    /// Returns the number of items canceled.
    pub fn disconnect_owner(&self, owner: OwnerId) -> usize {
        let canceled = self.manager.cancel_owner(owner);
        info!(owner = %owner, canceled, "owner disconnected");
        canceled
    }

    /// Register a repeating task that runs one work-manager pass every
    /// `period` ticks, on the primary queue or (if `is_async`) the pool.
    pub fn start_pump(&self, period: u64, is_async: bool) -> SessionResult<TaskId> {
        let manager = Arc::clone(&self.manager);
        let id = self.scheduler.schedule_repeating(
            Box::new(move || {
                run_pass(&manager);
            }),
            is_async,
            period,
        )?;
        debug!(task = %id, period, is_async, "work manager pump started");
        Ok(id)
    }

    pub fn stop_pump(&self, id: TaskId) -> SessionResult<()> {
        self.scheduler.cancel_task(id)?;
        Ok(())
    }
}

#[cfg(not(feature = "parallel"))]
fn run_pass(manager: &DistributedWorkManager) -> usize {
    manager.run_pass()
}

#[cfg(feature = "parallel")]
fn run_pass(manager: &DistributedWorkManager) -> usize {
    manager.run_pass_parallel()
}
