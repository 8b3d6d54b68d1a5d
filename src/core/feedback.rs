//! Applies anomaly verdicts to the policy table and ban registry.
//!
//! Verdicts are consumed by a single task in arrival order, which preserves
//! per-identity ordering: each mutation builds on the value the previous
//! verdict left behind. Adapted limits always stay within
//! `[min_limit, max_limit]`.

use std::sync::Arc;

use log::{info, warn};
use metrics::counter;
use tokio::sync::mpsc;

use crate::core::ban::BanRegistry;
use crate::core::detector::{AnomalyVerdict, VerdictAction};
use crate::core::policy::PolicyTable;
use crate::models::AdmissionConfig;

pub struct FeedbackController {
    policy: Arc<PolicyTable>,
    bans: Arc<BanRegistry>,
    config: AdmissionConfig,
}

impl FeedbackController {
    pub fn new(policy: Arc<PolicyTable>, bans: Arc<BanRegistry>, config: AdmissionConfig) -> Self {
        Self {
            policy,
            bans,
            config,
        }
    }

    /// Apply one verdict.
    ///
    /// A ban writes a TTL record and clamps the identity's limit to a fifth
    /// of the default; the limit is not restored when the ban expires, the
    /// identity has to earn it back through `increase` verdicts. Decrease
    /// halves, increase doubles, both saturating at the configured bounds.
    pub async fn apply(&self, verdict: AnomalyVerdict) {
        let AdmissionConfig {
            default_limit,
            min_limit,
            max_limit,
            ..
        } = self.config;

        match verdict.action {
            VerdictAction::Ban => {
                if let Err(e) = self.bans.ban(&verdict.identity).await {
                    // The tightened limit below still applies
                    warn!("failed to store ban for {}: {}", verdict.identity, e);
                }
                let limit = std::cmp::max(min_limit, default_limit / 5);
                self.policy.set_limit(&verdict.identity, limit);
                counter!("admission_bans_total", 1);
                info!("banned {} and set limit to {}", verdict.identity, limit);
            }
            VerdictAction::Decrease => {
                let limit = self
                    .policy
                    .update_limit(&verdict.identity, |cur| std::cmp::max(min_limit, cur / 2));
                counter!("admission_limit_decreases_total", 1);
                info!("decreased limit for {} to {}", verdict.identity, limit);
            }
            VerdictAction::Increase => {
                let limit = self.policy.update_limit(&verdict.identity, |cur| {
                    std::cmp::min(max_limit, cur.saturating_mul(2))
                });
                counter!("admission_limit_increases_total", 1);
                info!("increased limit for {} to {}", verdict.identity, limit);
            }
        }
    }

    /// Consumer loop: runs until every detector has dropped its verdict sender
    pub async fn run(self, mut verdicts: mpsc::Receiver<AnomalyVerdict>) {
        while let Some(verdict) = verdicts.recv().await {
            self.apply(verdict).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;

    fn controller() -> (FeedbackController, Arc<PolicyTable>, Arc<BanRegistry>) {
        let config = AdmissionConfig::default();
        let store = Arc::new(MemoryStore::new());
        let policy = Arc::new(PolicyTable::new(config.default_limit));
        let bans = Arc::new(BanRegistry::new(store, config.ban_duration_seconds));
        (
            FeedbackController::new(policy.clone(), bans.clone(), config),
            policy,
            bans,
        )
    }

    fn verdict(identity: &str, action: VerdictAction) -> AnomalyVerdict {
        AnomalyVerdict {
            identity: identity.to_string(),
            action,
        }
    }

    #[tokio::test]
    async fn test_ban_verdict() {
        let (controller, policy, bans) = controller();

        controller.apply(verdict("1.2.3.4", VerdictAction::Ban)).await;

        assert!(bans.is_banned("1.2.3.4").await.unwrap());
        // max(10, 100 / 5) = 20
        assert_eq!(policy.limit_for("1.2.3.4"), 20);
    }

    #[tokio::test]
    async fn test_decrease_halves_and_floors() {
        let (controller, policy, _) = controller();

        // First decrease starts from the default
        controller
            .apply(verdict("1.2.3.4", VerdictAction::Decrease))
            .await;
        assert_eq!(policy.limit_for("1.2.3.4"), 50);

        for _ in 0..10 {
            controller
                .apply(verdict("1.2.3.4", VerdictAction::Decrease))
                .await;
        }
        assert_eq!(policy.limit_for("1.2.3.4"), 10);
    }

    #[tokio::test]
    async fn test_increase_doubles_and_caps() {
        let (controller, policy, _) = controller();

        controller
            .apply(verdict("1.2.3.4", VerdictAction::Increase))
            .await;
        assert_eq!(policy.limit_for("1.2.3.4"), 200);

        // Repeated increases converge at the ceiling and stay there
        for _ in 0..10 {
            controller
                .apply(verdict("1.2.3.4", VerdictAction::Increase))
                .await;
        }
        assert_eq!(policy.limit_for("1.2.3.4"), 200);
    }

    #[tokio::test]
    async fn test_bounded_adaptation() {
        let (controller, policy, _) = controller();

        let actions = [
            VerdictAction::Decrease,
            VerdictAction::Ban,
            VerdictAction::Decrease,
            VerdictAction::Decrease,
            VerdictAction::Increase,
            VerdictAction::Increase,
            VerdictAction::Increase,
            VerdictAction::Increase,
            VerdictAction::Decrease,
        ];
        for action in actions {
            controller.apply(verdict("1.2.3.4", action)).await;
            let limit = policy.limit_for("1.2.3.4");
            assert!((10..=200).contains(&limit), "limit {} out of bounds", limit);
        }
    }

    #[tokio::test]
    async fn test_ban_does_not_restore_limit_on_expiry() {
        let config = AdmissionConfig {
            ban_duration_seconds: 1,
            ..AdmissionConfig::default()
        };
        let store = Arc::new(MemoryStore::new());
        let policy = Arc::new(PolicyTable::new(config.default_limit));
        let bans = Arc::new(BanRegistry::new(store, config.ban_duration_seconds));
        let controller = FeedbackController::new(policy.clone(), bans.clone(), config);

        controller.apply(verdict("1.2.3.4", VerdictAction::Ban)).await;
        assert_eq!(policy.limit_for("1.2.3.4"), 20);

        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

        // Ban expiry is purely time-based and leaves the tightened limit alone
        assert!(!bans.is_banned("1.2.3.4").await.unwrap());
        assert_eq!(policy.limit_for("1.2.3.4"), 20);
    }
}
