//! Per-request admission decisions.
//!
//! The hot path takes no global lock: it reads the ban registry and policy
//! table, performs one atomic counter increment, and fires a traffic sample
//! at the detectors without waiting for them.

use std::sync::Arc;

use log::warn;
use metrics::counter;
use serde::Serialize;

use crate::core::ban::BanRegistry;
use crate::core::dispatcher::{SampleDispatcher, TrafficSample};
use crate::core::policy::PolicyTable;
use crate::core::store::AdmissionStore;
use crate::models::AdmissionConfig;
use crate::utils::{counter_key, seconds_until_next_window, window_index};

/// Why a request was admitted or rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    Admitted,
    RateLimited,
    Banned,
}

/// Outcome of one admission check, carrying everything the HTTP layer needs
/// for the rate-limit response headers
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub admitted: bool,
    pub reason: DecisionReason,
    pub limit: u32,
    pub remaining: u32,
    /// Seconds until the window rolls over; set on rate-limited rejections
    pub retry_after_seconds: Option<u64>,
}

impl Decision {
    fn admitted(limit: u32, remaining: u32) -> Self {
        Self {
            admitted: true,
            reason: DecisionReason::Admitted,
            limit,
            remaining,
            retry_after_seconds: None,
        }
    }

    fn rate_limited(limit: u32, retry_after_seconds: u64) -> Self {
        Self {
            admitted: false,
            reason: DecisionReason::RateLimited,
            limit,
            remaining: 0,
            retry_after_seconds: Some(retry_after_seconds),
        }
    }

    fn banned(limit: u32) -> Self {
        Self {
            admitted: false,
            reason: DecisionReason::Banned,
            limit,
            remaining: 0,
            retry_after_seconds: None,
        }
    }
}

pub struct AdmissionController {
    store: Arc<dyn AdmissionStore>,
    policy: Arc<PolicyTable>,
    bans: Arc<BanRegistry>,
    dispatcher: Arc<SampleDispatcher>,
    config: AdmissionConfig,
}

impl AdmissionController {
    pub fn new(
        store: Arc<dyn AdmissionStore>,
        policy: Arc<PolicyTable>,
        bans: Arc<BanRegistry>,
        dispatcher: Arc<SampleDispatcher>,
        config: AdmissionConfig,
    ) -> Self {
        Self {
            store,
            policy,
            bans,
            dispatcher,
            config,
        }
    }

    /// Decide whether to admit one request from `identity`.
    ///
    /// Banned identities are rejected without touching the counter or the
    /// detectors. Otherwise the request increments this window's counter,
    /// a sample goes to the detectors regardless of the outcome, and the
    /// post-increment count is compared against the identity's current limit.
    ///
    /// Store failures never propagate: the configured fail-open or
    /// fail-closed policy decides instead.
    pub async fn decide(&self, identity: &str, endpoint: &str, now_ms: i64) -> Decision {
        let limit = self.policy.limit_for(identity);

        match self.bans.is_banned(identity).await {
            Ok(true) => {
                counter!("admission_rejected_banned_total", 1);
                return Decision::banned(limit);
            }
            Ok(false) => {}
            Err(e) => {
                warn!("ban lookup failed for {}: {}", identity, e);
                if !self.config.fail_open {
                    return self.reject_unavailable(limit, now_ms);
                }
                // Fail open: treat as not banned and continue to the counter
            }
        }

        let key = counter_key(identity, window_index(now_ms, self.config.window_seconds));
        let count = match self.store.increment(&key).await {
            Ok(count) => {
                if count == 1 {
                    // First request of the window starts its expiry clock
                    if let Err(e) = self.store.expire(&key, self.config.window_seconds).await {
                        warn!("failed to set expiry on {}: {}", key, e);
                    }
                }
                count
            }
            Err(e) => {
                warn!("counter increment failed for {}: {}", identity, e);
                counter!("admission_store_failures_total", 1);
                if self.config.fail_open {
                    // The detectors still see the traffic the store could
                    // not count
                    self.dispatcher.dispatch(TrafficSample {
                        identity: identity.to_string(),
                        timestamp_ms: now_ms,
                        endpoint: endpoint.to_string(),
                    });
                    counter!("admission_admitted_total", 1);
                    return Decision::admitted(limit, limit);
                }
                return self.reject_unavailable(limit, now_ms);
            }
        };

        // Fire-and-forget: rejected traffic is exactly what the detectors
        // need to see
        self.dispatcher.dispatch(TrafficSample {
            identity: identity.to_string(),
            timestamp_ms: now_ms,
            endpoint: endpoint.to_string(),
        });

        if count > limit as u64 {
            counter!("admission_rejected_total", 1);
            let retry_after = seconds_until_next_window(now_ms, self.config.window_seconds);
            return Decision::rate_limited(limit, retry_after);
        }

        counter!("admission_admitted_total", 1);
        Decision::admitted(limit, limit - count as u32)
    }

    fn reject_unavailable(&self, limit: u32, now_ms: i64) -> Decision {
        counter!("admission_rejected_total", 1);
        let retry_after = seconds_until_next_window(now_ms, self.config.window_seconds);
        Decision::rate_limited(limit, retry_after)
    }
}
