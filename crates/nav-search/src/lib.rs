//! `nav-search` — resumable local and cross-domain route search.
//!
//! # Crate layout
//!
//! | Module              | Contents                                                     |
//! |---------------------|--------------------------------------------------------------|
//! | [`flags`]           | `SearchFlags` — per-request mode permissions and timeout      |
//! | [`provider`]        | `ModeProvider` trait, `AxisStepProvider`                      |
//! | [`trial`]           | `Trial` trait, `TrialStatus`, `FailReason`, `CancelToken`     |
//! | [`path_trial`]      | `PathTrial` — A* inside one domain, run in slices             |
//! | [`itinerary_trial`] | `ItineraryTrial` — port-graph planning with leg validation    |
//! | [`cache`]           | `PathRecordManager` trait, `InMemoryPathCache`                |
//! | [`event`]           | `SearchEvent`, `EventSink`, `EventBus`, `RecordingSink`       |
//! | [`work`]            | `TrialWork<T>` — adapts a trial to the work manager           |
//! | [`loader`]          | Port CSV loader                                               |
//! | [`error`]           | `SearchError`, `SearchResult<T>`                              |
//!
//! # Search model
//!
//! A request travels from an origin cell to a destination cell, possibly in
//! another domain.  [`ItineraryTrial`] plans over a small graph of ports,
//! then validates every in-domain leg of the planned route with a
//! [`PathTrial`].  Both trials advance in bounded slices through
//! [`Trial::step`], so a scheduler can interleave many searches on one
//! thread.

pub mod cache;
pub mod error;
pub mod event;
pub mod flags;
pub mod itinerary_trial;
pub mod loader;
pub mod path_trial;
pub mod provider;
pub mod trial;
pub mod work;

#[cfg(test)]
mod tests;

pub use cache::{InMemoryPathCache, NoPathCache, PathKey, PathRecord, PathRecordManager};
pub use error::{ProviderError, SearchError, SearchResult};
pub use event::{
    EventBus, EventKind, EventKinds, EventSink, NoopSink, RecordingSink, SearchEvent,
    SubscriptionId,
};
pub use flags::SearchFlags;
pub use itinerary_trial::{ItineraryConfig, ItineraryTrial, NodeWeightFn};
pub use loader::{load_ports_csv, load_ports_reader};
pub use path_trial::PathTrial;
pub use provider::{allowed_modes, AxisStepProvider, ModeOption, ModeProvider};
pub use trial::{CancelToken, FailReason, Trial, TrialStatus};
pub use work::{ItineraryTrialWork, PathTrialWork, TrialWork};
