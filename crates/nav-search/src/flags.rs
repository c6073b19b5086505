//! Per-request search flags.

use std::time::Duration;

use nav_core::ModeType;

/// Options a caller attaches to one search request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchFlags {
    /// Wall-clock limit in seconds; `0` selects the configured default.
    pub timeout_secs: u32,
    pub fly_allowed:  bool,
    pub dig_allowed:  bool,
    pub door_allowed: bool,
    /// Navigator used to animate the result.  Opaque to the search.
    pub navigator: Option<String>,
}

impl SearchFlags {
    /// Whether providers of `mode` may be consulted under these flags.
    pub fn allows(&self, mode: ModeType) -> bool {
        match mode {
            ModeType::Fly => self.fly_allowed,
            ModeType::Dig | ModeType::Tunnel => self.dig_allowed,
            ModeType::Door => self.door_allowed,
            _ => true,
        }
    }

    /// The effective timeout, falling back to `default` when unset.
    pub fn timeout(&self, default: Duration) -> Duration {
        if self.timeout_secs == 0 {
            default
        } else {
            Duration::from_secs(u64::from(self.timeout_secs))
        }
    }
}
