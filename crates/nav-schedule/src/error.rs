use thiserror::Error;

use nav_core::{ItemId, TaskId};

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid manager config: {0}")]
    InvalidConfig(String),

    #[error("unknown work item {0}")]
    UnknownItem(ItemId),

    #[error("unknown task {0}")]
    UnknownTask(TaskId),

    #[error("repeating period must be at least one tick")]
    ZeroPeriod,

    #[error("{0} must be called on the primary thread")]
    NotPrimaryThread(&'static str),

    #[error("thread pool error: {0}")]
    Pool(String),
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// Fault raised by a [`WorkItem`][crate::WorkItem] from `run`.
///
/// The manager retires the item with an Error outcome; other owners'
/// bookkeeping is unaffected.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct WorkError(pub String);

impl WorkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
