//! Temporary ban registry.
//!
//! Bans are TTL records in the backing store: presence means banned, expiry
//! means the identity reverts to normal counter-based evaluation. A repeated
//! ban overwrites the record and restarts the clock. Nothing removes a ban
//! early.

use std::sync::Arc;

use crate::core::store::{AdmissionStore, StoreResult};
use crate::utils::ban_key;

pub struct BanRegistry {
    store: Arc<dyn AdmissionStore>,
    ban_duration_seconds: u64,
}

impl BanRegistry {
    pub fn new(store: Arc<dyn AdmissionStore>, ban_duration_seconds: u64) -> Self {
        Self {
            store,
            ban_duration_seconds,
        }
    }

    /// Ban `identity` for the configured duration, extending any existing ban
    pub async fn ban(&self, identity: &str) -> StoreResult<()> {
        self.store
            .set_with_ttl(&ban_key(identity), "1", self.ban_duration_seconds)
            .await
    }

    /// Whether `identity` currently has a non-expired ban record
    pub async fn is_banned(&self, identity: &str) -> StoreResult<bool> {
        Ok(self.store.get(&ban_key(identity)).await?.is_some())
    }
}
