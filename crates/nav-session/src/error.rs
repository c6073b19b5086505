use nav_schedule::ScheduleError;
use nav_search::SearchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session configuration error: {0}")]
    Config(String),

    #[error("session request is missing its {0}")]
    Missing(&'static str),

    #[error("scheduler error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("search error: {0}")]
    Search(#[from] SearchError),
}

pub type SessionResult<T> = Result<T, SessionError>;
