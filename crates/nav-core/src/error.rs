//! Core error type.
//!
//! Sub-crates define their own error enums and wrap `NavError` as one
//! variant via `#[from]`.

use thiserror::Error;

/// Errors produced by `nav-core` value constructors and parsers.
#[derive(Debug, Error)]
pub enum NavError {
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("unknown mode type id {0}")]
    UnknownModeId(u8),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Shorthand result type for `nav-core`.
pub type NavResult<T> = Result<T, NavError>;
