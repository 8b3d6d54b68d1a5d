//! Per-identity rate limit policy.
//!
//! The policy table is the adaptive half of admission control: the feedback
//! controller rewrites entries as anomaly verdicts arrive, while every
//! in-flight admission check reads them. Reads may observe a slightly stale
//! limit; each individual mutation is atomic per key.

use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory mapping from client identity to its admitted-requests-per-window
/// limit. Identities without an entry use the default limit.
pub struct PolicyTable {
    limits: RwLock<HashMap<String, u32>>,
    default_limit: u32,
}

impl PolicyTable {
    pub fn new(default_limit: u32) -> Self {
        Self {
            limits: RwLock::new(HashMap::new()),
            default_limit,
        }
    }

    /// Current limit for `identity`, falling back to the default
    pub fn limit_for(&self, identity: &str) -> u32 {
        let limits = self.limits.read().unwrap();
        limits.get(identity).copied().unwrap_or(self.default_limit)
    }

    /// Overwrite the limit for `identity`
    pub fn set_limit(&self, identity: &str, limit: u32) {
        let mut limits = self.limits.write().unwrap();
        limits.insert(identity.to_string(), limit);
    }

    /// Atomically rewrite the limit for `identity` from its current value,
    /// returning the new limit. Unset entries are presented to `f` as the
    /// default limit.
    pub fn update_limit(&self, identity: &str, f: impl FnOnce(u32) -> u32) -> u32 {
        let mut limits = self.limits.write().unwrap();
        let current = limits.get(identity).copied().unwrap_or(self.default_limit);
        let next = f(current);
        limits.insert(identity.to_string(), next);
        next
    }

    pub fn default_limit(&self) -> u32 {
        self.default_limit
    }

    /// Point-in-time copy of every explicit policy entry
    pub fn snapshot(&self) -> HashMap<String, u32> {
        self.limits.read().unwrap().clone()
    }
}
