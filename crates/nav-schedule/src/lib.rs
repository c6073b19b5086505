//! `nav-schedule` — fair cooperative work scheduling and tick execution.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                      |
//! |-----------------|---------------------------------------------------------------|
//! | [`work`]        | `WorkItem` trait, `WorkStatus`                                |
//! | [`manager`]     | `DistributedWorkManager`, `ManagerConfig`, `ManagerStats`, `WorkOutcome` |
//! | [`timer_queue`] | `TimerQueue` (`BTreeMap<Tick, Vec<TaskId>>`)                  |
//! | [`executor`]    | `SchedulingManager` trait, `TickExecutor`                     |
//! | [`error`]       | `ScheduleError`, `ScheduleResult<T>`, `WorkError`             |
//!
//! Nothing here knows about cells, paths or search.  Search trials are
//! wrapped as [`WorkItem`]s by `nav-search`, and the manager is pumped by a
//! repeating [`SchedulingManager`] task.

pub mod error;
pub mod executor;
pub mod manager;
pub mod timer_queue;
pub mod work;


pub use error::{ScheduleError, ScheduleResult, WorkError};
pub use executor::{RepeatingTask, SchedulingManager, Task, TickExecutor};
pub use manager::{DistributedWorkManager, FinishedWork, ManagerConfig, ManagerStats, WorkOutcome};
pub use timer_queue::TimerQueue;
pub use work::{WorkItem, WorkStatus};
