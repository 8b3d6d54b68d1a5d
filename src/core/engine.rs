//! Engine assembly.
//!
//! `AdmissionEngine` owns the whole adaptive pipeline: policy table, ban
//! registry, sample dispatcher, detector workers and the feedback task. It is
//! a plain injectable object, so tests and embedders can run several
//! independent engines in one process.

use std::collections::HashMap;
use std::sync::Arc;

use log::info;
use tokio::sync::mpsc;

use crate::core::admission::{AdmissionController, Decision};
use crate::core::ban::BanRegistry;
use crate::core::detector::AnomalyDetector;
use crate::core::dispatcher::SampleDispatcher;
use crate::core::feedback::FeedbackController;
use crate::core::policy::PolicyTable;
use crate::core::store::AdmissionStore;
use crate::models::{AdmissionConfig, DetectionConfig};

pub struct AdmissionEngine {
    controller: AdmissionController,
    policy: Arc<PolicyTable>,
}

impl AdmissionEngine {
    /// Build the pipeline and spawn its worker tasks.
    ///
    /// Detector and feedback tasks run until the engine is dropped: dropping
    /// the dispatcher closes the sample queues, finished detectors drop their
    /// verdict senders, and the feedback task drains out.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        store: Arc<dyn AdmissionStore>,
        admission: AdmissionConfig,
        detection: DetectionConfig,
    ) -> Self {
        let policy = Arc::new(PolicyTable::new(admission.default_limit));
        let bans = Arc::new(BanRegistry::new(
            store.clone(),
            admission.ban_duration_seconds,
        ));

        let detectors = detector_count(&detection);
        let (verdict_tx, verdict_rx) = mpsc::channel(detection.verdict_queue_depth);
        let mut senders = Vec::with_capacity(detectors);
        for _ in 0..detectors {
            let (sample_tx, sample_rx) = mpsc::channel(detection.sample_queue_depth);
            senders.push(sample_tx);
            tokio::spawn(
                AnomalyDetector::new(detection.clone()).run(sample_rx, verdict_tx.clone()),
            );
        }
        drop(verdict_tx);
        info!("started {} anomaly detector workers", detectors);

        let feedback = FeedbackController::new(policy.clone(), bans.clone(), admission.clone());
        tokio::spawn(feedback.run(verdict_rx));

        let dispatcher = Arc::new(SampleDispatcher::new(senders));
        let controller = AdmissionController::new(store, policy.clone(), bans, dispatcher, admission);

        Self { controller, policy }
    }

    /// Run the admission check for one request
    pub async fn decide(&self, identity: &str, endpoint: &str, now_ms: i64) -> Decision {
        self.controller.decide(identity, endpoint, now_ms).await
    }

    /// Read-only snapshot of the adapted per-identity limits
    pub fn limits(&self) -> HashMap<String, u32> {
        self.policy.snapshot()
    }
}

fn detector_count(detection: &DetectionConfig) -> usize {
    if detection.detectors > 0 {
        return detection.detectors;
    }
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2);
    std::cmp::max(2, cpus.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detector_count() {
        let auto = DetectionConfig {
            detectors: 0,
            ..DetectionConfig::default()
        };
        assert!(detector_count(&auto) >= 2);

        let fixed = DetectionConfig {
            detectors: 4,
            ..DetectionConfig::default()
        };
        assert_eq!(detector_count(&fixed), 4);
    }
}
