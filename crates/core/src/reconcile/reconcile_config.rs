//! Timeouts for store calls made during reconciliation.

use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_LOOKUP_TIMEOUT_MS, DEFAULT_WRITE_TIMEOUT_MS, LOOKUP_TIMEOUT_ENV, WRITE_TIMEOUT_ENV,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconcileConfig {
    /// Bound for each lookup. A lookup that times out advances to the next tier.
    pub lookup_timeout_ms: u64,
    /// Bound for each record write. A write that times out marks that record failed.
    pub write_timeout_ms: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            lookup_timeout_ms: DEFAULT_LOOKUP_TIMEOUT_MS,
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT_MS,
        }
    }
}

impl ReconcileConfig {
    /// Reads overrides from the environment, keeping defaults for anything
    /// absent or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            lookup_timeout_ms: read_millis(&lookup, LOOKUP_TIMEOUT_ENV, defaults.lookup_timeout_ms),
            write_timeout_ms: read_millis(&lookup, WRITE_TIMEOUT_ENV, defaults.write_timeout_ms),
        }
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

fn read_millis(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> u64 {
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(value) if value > 0 => value,
            _ => {
                warn!("Ignoring invalid {}='{}', using {}ms", key, raw, default);
                default
            }
        },
    }
}
