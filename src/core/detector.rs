//! Statistical anomaly detection over per-identity request rates.
//!
//! Each detector worker owns a private map from identity to the timestamps of
//! that identity's recent samples. An identity's windowed count is scored as a
//! z-score against the counts of every identity the worker currently tracks.
//! Workers receive samples round-robin, so each one scores against its own
//! partition of identities rather than the global population. That is a
//! deliberate approximation: it shards the detection workload and costs some
//! statistical power, and centralizing the state would serialize the workers.

use std::collections::{HashMap, VecDeque};

use log::{debug, info, warn};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::core::dispatcher::TrafficSample;
use crate::models::DetectionConfig;

/// A ban requires this many samples in the window on top of the z-score,
/// so a short burst against a quiet population is throttled before it is
/// banned.
const BAN_MIN_COUNT: usize = 20;

/// An identity only earns a limit increase while clearly quieter than its
/// peers and nearly idle itself.
const INCREASE_Z_THRESHOLD: f64 = -1.0;
const INCREASE_MAX_COUNT: usize = 5;

/// Recommended policy action for one identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictAction {
    Ban,
    Decrease,
    Increase,
}

/// Output of a detector: what the feedback controller should do to an identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyVerdict {
    pub identity: String,
    pub action: VerdictAction,
}

/// One anomaly detection worker. Single-threaded by construction: it owns its
/// history outright and processes its queue sequentially, so no locking is
/// needed anywhere inside.
pub struct AnomalyDetector {
    config: DetectionConfig,
    history: HashMap<String, VecDeque<i64>>,
}

impl AnomalyDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self {
            config,
            history: HashMap::new(),
        }
    }

    /// Record one sample and score its identity against the local population.
    ///
    /// Returns a verdict when the decision policy matches, in order:
    /// ban, decrease, increase. A population of one has zero standard
    /// deviation and is defined as z = 0: no signal without a peer population.
    pub fn observe(&mut self, sample: &TrafficSample) -> Option<AnomalyVerdict> {
        if sample.identity.is_empty() || sample.timestamp_ms <= 0 {
            counter!("admission_samples_malformed_total", 1);
            debug!("malformed sample dropped: {:?}", sample);
            return None;
        }

        let now = sample.timestamp_ms;
        let window = self.config.window_ms as i64;

        self.history
            .entry(sample.identity.clone())
            .or_default()
            .push_back(now);
        // Re-window every tracked identity so population counts stay current
        self.history.retain(|_, timestamps| {
            timestamps.retain(|t| now - *t < window);
            !timestamps.is_empty()
        });

        let count = self
            .history
            .get(&sample.identity)
            .map_or(0, |timestamps| timestamps.len());
        let counts: Vec<f64> = self.history.values().map(|t| t.len() as f64).collect();
        let mean = counts.iter().sum::<f64>() / counts.len() as f64;
        let variance = counts.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / counts.len() as f64;
        let std = variance.sqrt();
        let z = if std == 0.0 {
            0.0
        } else {
            (count as f64 - mean) / std
        };

        debug!(
            "identity={} count={} mean={:.2} std={:.2} z={:.2}",
            sample.identity, count, mean, std, z
        );

        let action = if z > self.config.ban_threshold && count > BAN_MIN_COUNT {
            Some(VerdictAction::Ban)
        } else if z > self.config.decrease_threshold {
            Some(VerdictAction::Decrease)
        } else if z < INCREASE_Z_THRESHOLD && count < INCREASE_MAX_COUNT {
            Some(VerdictAction::Increase)
        } else {
            None
        };

        action.map(|action| AnomalyVerdict {
            identity: sample.identity.clone(),
            action,
        })
    }

    /// Worker loop: drain the sample queue until the engine drops it, pushing
    /// verdicts toward the feedback controller. A full verdict queue drops the
    /// verdict; the policy simply stays at its previous state.
    pub async fn run(
        mut self,
        mut samples: mpsc::Receiver<TrafficSample>,
        verdicts: mpsc::Sender<AnomalyVerdict>,
    ) {
        while let Some(sample) = samples.recv().await {
            if let Some(verdict) = self.observe(&sample) {
                info!(
                    "anomaly detected for {}: {:?}",
                    verdict.identity, verdict.action
                );
                if verdicts.try_send(verdict).is_err() {
                    counter!("admission_verdicts_dropped_total", 1);
                    warn!("verdict queue full, verdict for {} dropped", sample.identity);
                }
            }
        }
    }
}
