//! Two-queue executor behind the [`SchedulingManager`] interface.
//!
//! * The **primary queue** is drained by [`TickExecutor::tick`] on the thread
//!   that created the executor.  Work that must serialize with host state
//!   goes here.
//! * The **async queue** is a rayon thread pool for pure computation.
//!
//! Repeating tasks are kept in a [`TimerQueue`] keyed by the tick they next
//! fire at, and are rescheduled `period` ticks later each time they fire.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use nav_core::{TaskId, Tick};

use crate::{ScheduleError, ScheduleResult, TimerQueue};

/// A one-shot task.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// A task run every `period` ticks.
pub type RepeatingTask = Box<dyn FnMut() + Send + 'static>;

/// Host scheduling operations used by sessions and the work-manager pump.
pub trait SchedulingManager: Send + Sync {
    /// Run `task` once: on the primary queue, or on the worker pool if
    /// `is_async`.
    fn schedule(&self, task: Task, is_async: bool);

    /// Run `task` every `period` ticks until canceled.
    fn schedule_repeating(
        &self,
        task:     RepeatingTask,
        is_async: bool,
        period:   u64,
    ) -> ScheduleResult<TaskId>;

    fn cancel_task(&self, id: TaskId) -> ScheduleResult<()>;

    /// `true` on the thread that drains the primary queue.
    fn is_primary_thread(&self) -> bool;
}

struct RepeatingEntry {
    task:     Arc<Mutex<RepeatingTask>>,
    is_async: bool,
    period:   u64,
}

#[derive(Default)]
struct ExecutorState {
    now:       Tick,
    next_task: u64,
    primary:   VecDeque<Task>,
    repeating: FxHashMap<TaskId, RepeatingEntry>,
    timers:    TimerQueue,
}

/// Tick-driven [`SchedulingManager`].
///
/// The creating thread becomes the primary thread; the host calls
/// [`tick`][Self::tick] from it once per frame.
pub struct TickExecutor {
    primary_thread: ThreadId,
    pool:           rayon::ThreadPool,
    state:          Mutex<ExecutorState>,
}

impl TickExecutor {
    /// Create an executor with `worker_threads` pool threads (`0` lets rayon
    /// pick one per core).
    pub fn new(worker_threads: usize) -> ScheduleResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_threads)
            .thread_name(|i| format!("nav-worker-{i}"))
            .build()
            .map_err(|e| ScheduleError::Pool(e.to_string()))?;
        Ok(Self {
            primary_thread: thread::current().id(),
            pool,
            state: Mutex::new(ExecutorState::default()),
        })
    }

    pub fn now(&self) -> Tick {
        self.state.lock().now
    }

    /// One-shot tasks waiting for the next tick.
    pub fn queued_primary(&self) -> usize {
        self.state.lock().primary.len()
    }

    pub fn repeating_count(&self) -> usize {
        self.state.lock().repeating.len()
    }

    /// Advance one tick: run queued one-shot tasks, then fire due repeating
    /// tasks.  Async repeating tasks are handed to the pool.
    ///
    /// Returns the number of tasks run on this thread.
    ///
    /// # Errors
    /// [`ScheduleError::NotPrimaryThread`] when called off the primary thread.
    pub fn tick(&self) -> ScheduleResult<usize> {
        if !self.is_primary_thread() {
            return Err(ScheduleError::NotPrimaryThread("TickExecutor::tick"));
        }

        let (one_shots, due_primary) = {
            let mut state = self.state.lock();
            state.now = state.now + 1;
            let now = state.now;
            let one_shots: Vec<Task> = state.primary.drain(..).collect();

            let mut due_primary = Vec::new();
            for id in state.timers.drain_due(now) {
                let Some(entry) = state.repeating.get(&id) else { continue };
                let task = Arc::clone(&entry.task);
                let (is_async, period) = (entry.is_async, entry.period);
                state.timers.push(now + period, id);
                if is_async {
                    self.pool.spawn(move || {
                        let mut f = task.lock();
                        (*f)();
                    });
                } else {
                    due_primary.push(task);
                }
            }
            (one_shots, due_primary)
        };

        let ran = one_shots.len() + due_primary.len();
        trace!(ran, "executor tick");
        for task in one_shots {
            task();
        }
        for task in due_primary {
            let mut f = task.lock();
            (*f)();
        }
        Ok(ran)
    }
}

impl SchedulingManager for TickExecutor {
    fn schedule(&self, task: Task, is_async: bool) {
        if is_async {
            self.pool.spawn(task);
        } else {
            self.state.lock().primary.push_back(task);
        }
    }

    fn schedule_repeating(
        &self,
        task:     RepeatingTask,
        is_async: bool,
        period:   u64,
    ) -> ScheduleResult<TaskId> {
        if period == 0 {
            return Err(ScheduleError::ZeroPeriod);
        }
        let mut state = self.state.lock();
        let id = TaskId(state.next_task);
        state.next_task += 1;
        let first = state.now + period;
        state.timers.push(first, id);
        state.repeating.insert(id, RepeatingEntry {
            task: Arc::new(Mutex::new(task)),
            is_async,
            period,
        });
        debug!(task = %id, is_async, period, "scheduled repeating task");
        Ok(id)
    }

    fn cancel_task(&self, id: TaskId) -> ScheduleResult<()> {
        let mut state = self.state.lock();
        if state.repeating.remove(&id).is_none() {
            return Err(ScheduleError::UnknownTask(id));
        }
        state.timers.remove(id);
        debug!(task = %id, "canceled repeating task");
        Ok(())
    }

    fn is_primary_thread(&self) -> bool {
        thread::current().id() == self.primary_thread
    }
}
