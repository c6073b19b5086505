//! Graph error type.

use thiserror::Error;

use nav_core::GraphEdgeId;

/// Errors produced by `nav-graph`.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("edge {0} not found in graph")]
    EdgeNotFound(GraphEdgeId),
}

pub type GraphResult<T> = Result<T, GraphError>;
