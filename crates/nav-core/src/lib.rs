//! `nav-core` — foundational types for the `rust_nav` itinerary planner.
//!
//! This crate is a dependency of every other `nav-*` crate.  It has no
//! `nav-*` dependencies and only `thiserror` (plus optional `serde`) from
//! outside.
//!
//! # What lives here
//!
//! | Module          | Contents                                                  |
//! |-----------------|-----------------------------------------------------------|
//! | [`ids`]         | `OwnerId`, `ItemId`, `TaskId`, `SessionId`, graph ids     |
//! | [`cell`]        | `Cell`, `DomainId`, `DomainLookup`                        |
//! | [`mode`]        | `ModeType`, `ModeTypeGroup`                               |
//! | [`path`]        | `Step`, `Path`                                            |
//! | [`port`]        | `Port`                                                    |
//! | [`alternating`] | `AlternatingSequence`, `AlternatingBuilder`, `Cursor`     |
//! | [`itinerary`]   | `Itinerary`, `ItineraryBuilder`                           |
//! | [`cost`]        | accumulators, heuristics, `CostConfig`, `CostFunctions`   |
//! | [`time`]        | `Tick`, `SearchBudget`, `BudgetMeter`                     |
//! | [`error`]       | `NavError`, `NavResult`                                   |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to value and config types.  |

pub mod alternating;
pub mod cell;
pub mod cost;
pub mod error;
pub mod ids;
pub mod itinerary;
pub mod mode;
pub mod path;
pub mod port;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use alternating::{AlternatingBuilder, AlternatingSequence, Cursor, Element, ElementKind};
pub use cell::{Cell, DomainId, DomainLookup};
pub use cost::{
    AccumulatorKind, CostAccumulator, CostConfig, CostFunctions, Heuristic, HeuristicKind,
};
pub use error::{NavError, NavResult};
pub use ids::{GraphEdgeId, GraphNodeId, ItemId, OwnerId, SessionId, TaskId};
pub use itinerary::{Itinerary, ItineraryBuilder};
pub use mode::{ModeType, ModeTypeGroup};
pub use path::{Path, Step};
pub use port::Port;
pub use time::{BudgetMeter, SearchBudget, Tick};
