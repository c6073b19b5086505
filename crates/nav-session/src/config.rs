//! Session-level configuration.

use std::time::Duration;

use nav_core::CostConfig;
use nav_schedule::ManagerConfig;

use crate::{SessionError, SessionResult};

/// Tuning shared by every session created from one [`NavContext`][crate::NavContext].
///
/// | Field                  | Default      |
/// |------------------------|--------------|
/// | `default_timeout`      | 30 s         |
/// | `leg_iteration_cap`    | 50 000       |
/// | `max_legs`             | 64           |
/// | `slice_iterations`     | 256          |
/// | `leg_estimate_weight`  | 1.0          |
/// | `refine`               | `true`       |
/// | `costs`                | Euclidean / Euclidean |
/// | `manager`              | G = 8, P = 2 |
/// | `cache_max_cells`      | 1 000 000    |
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchConfig {
    /// Wall-clock limit when a request's flags leave it at 0.
    pub default_timeout:     Duration,
    /// Iteration cap for each leg's local search.
    pub leg_iteration_cap:   u64,
    /// Legs validated per itinerary before giving up.
    pub max_legs:            usize,
    /// Iterations per scheduler slice.
    pub slice_iterations:    u64,
    pub leg_estimate_weight: f64,
    /// Keep looking for cheaper itineraries after the first one.
    pub refine:              bool,
    pub costs:               CostConfig,
    pub manager:             ManagerConfig,
    /// Total cells the in-memory path cache may hold.
    pub cache_max_cells:     usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_timeout:     Duration::from_secs(30),
            leg_iteration_cap:   50_000,
            max_legs:            64,
            slice_iterations:    256,
            leg_estimate_weight: 1.0,
            refine:              true,
            costs:               CostConfig::default(),
            manager:             ManagerConfig::default(),
            cache_max_cells:     1_000_000,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> SessionResult<()> {
        if self.slice_iterations == 0 {
            return Err(SessionError::Config("slice_iterations must be at least 1".into()));
        }
        if self.leg_iteration_cap == 0 {
            return Err(SessionError::Config("leg_iteration_cap must be at least 1".into()));
        }
        if self.max_legs == 0 {
            return Err(SessionError::Config("max_legs must be at least 1".into()));
        }
        if !self.leg_estimate_weight.is_finite() || self.leg_estimate_weight <= 0.0 {
            return Err(SessionError::Config(format!(
                "leg_estimate_weight must be positive, got {}",
                self.leg_estimate_weight
            )));
        }
        if self.default_timeout.is_zero() {
            return Err(SessionError::Config("default_timeout must be non-zero".into()));
        }
        self.costs.validate().map_err(|e| SessionError::Config(e.to_string()))?;
        self.manager.validate()?;
        Ok(())
    }
}
