use thiserror::Error;

use nav_core::{Cell, ModeType, NavError};
use nav_graph::GraphError;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("mode provider {mode} failed at {origin}: {message}")]
    Provider {
        mode:    ModeType,
        origin:  Cell,
        message: String,
    },

    #[error("mode provider {mode} offered an invalid cost {cost} to {destination}")]
    InvalidOption {
        mode:        ModeType,
        destination: Cell,
        cost:        f64,
    },

    #[error("malformed cached record for {origin} -> {destination}: {reason}")]
    MalformedRecord {
        origin:      Cell,
        destination: Cell,
        reason:      String,
    },

    #[error("leg search faulted: {0}")]
    LegFault(String),

    #[error("path cache error: {0}")]
    Cache(String),

    #[error("port registry parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] NavError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

pub type SearchResult<T> = Result<T, SearchError>;

/// Fault reported by a [`ModeProvider`][crate::ModeProvider].
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ProviderError(pub String);

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
