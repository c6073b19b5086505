//! `nav-session` — per-request search sessions for the rust_nav planner.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                          |
//! |-------------|-------------------------------------------------------------------|
//! | [`config`]  | `SearchConfig` — timeouts, slice size, caps, cost functions       |
//! | [`context`] | `NavContext` — manager, scheduler, path cache and event bus       |
//! | [`builder`] | `SessionBuilder` — validated construction and submission          |
//! | [`session`] | `SearchSession` (work item), `SessionHandle`, `SessionStatus`     |
//! | [`error`]   | `SessionError`, `SessionResult<T>`                                |
//!
//! # Driving sessions
//!
//! ```text
//! host tick ──▶ TickExecutor::tick
//!                 └─ pump task ──▶ DistributedWorkManager::run_pass
//!                                     └─ SearchSession::run  (one slice)
//!                                          └─ ItineraryTrial::step
//!                                               └─ PathTrial::step (legs)
//! ```
//!
//! [`NavContext::start_pump`] installs the pump.  Callers keep a
//! [`SessionHandle`] to watch status, read itineraries and cancel.
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                  |
//! |------------|---------------------------------------------------------|
//! | `parallel` | The pump runs each pass's slices on the rayon pool.     |
//! | `serde`    | Serialize/deserialize `SearchConfig`.                   |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! let executor = Arc::new(TickExecutor::new(2)?);
//! let ctx = NavContext::new(SearchConfig::default(), executor.clone())?;
//! ctx.start_pump(1, false)?;
//! let handle = ctx.session().origin(from).destination(to).owner(OwnerId(1))
//!     .provider(walk).ports(ports).submit()?;
//! while !handle.is_finished() {
//!     executor.tick()?;
//! }
//! ```

pub mod builder;
pub mod config;
pub mod context;
pub mod error;
pub mod session;


pub use builder::SessionBuilder;
pub use config::SearchConfig;
pub use context::NavContext;
pub use error::{SessionError, SessionResult};
pub use session::{SearchSession, SessionHandle, SessionStatus};
