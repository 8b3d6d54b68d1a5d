//! Round-robin fan-out of traffic samples to the detector workers.

use std::sync::atomic::{AtomicUsize, Ordering};

use log::debug;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// One observed request, forwarded to a detector for scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficSample {
    /// Client identity (source IP or equivalent)
    pub identity: String,
    /// Request timestamp in milliseconds since the Unix epoch
    pub timestamp_ms: i64,
    /// Request path
    pub endpoint: String,
}

/// Distributes samples across the detector queues.
///
/// The cursor is the dispatcher's only shared state. Its advancement is
/// relaxed: under concurrent dispatch two consecutive samples may land on the
/// same detector, which only skews the distribution, never loses a sample at
/// this layer. A full detector queue drops the sample instead of blocking the
/// admission path.
pub struct SampleDispatcher {
    senders: Vec<mpsc::Sender<TrafficSample>>,
    cursor: AtomicUsize,
}

impl SampleDispatcher {
    pub fn new(senders: Vec<mpsc::Sender<TrafficSample>>) -> Self {
        assert!(!senders.is_empty(), "dispatcher requires at least one detector");
        Self {
            senders,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Fire-and-forget delivery of one sample
    pub fn dispatch(&self, sample: TrafficSample) {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.senders.len();
        if self.senders[index].try_send(sample).is_err() {
            counter!("admission_samples_dropped_total", 1);
            debug!("detector {} queue full, sample dropped", index);
        }
    }

    pub fn detector_count(&self) -> usize {
        self.senders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(identity: &str) -> TrafficSample {
        TrafficSample {
            identity: identity.to_string(),
            timestamp_ms: 0,
            endpoint: "/test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_round_robin_distribution() {
        let mut senders = Vec::new();
        let mut receivers = Vec::new();
        for _ in 0..3 {
            let (tx, rx) = mpsc::channel(64);
            senders.push(tx);
            receivers.push(rx);
        }
        let dispatcher = SampleDispatcher::new(senders);

        for i in 0..10 {
            dispatcher.dispatch(sample(&format!("10.0.0.{}", i)));
        }

        // Sequential dispatch of 10 samples over 3 queues: 4/3/3
        let mut counts = Vec::new();
        for rx in &mut receivers {
            let mut n = 0;
            while rx.try_recv().is_ok() {
                n += 1;
            }
            counts.push(n);
        }
        assert_eq!(counts, vec![4, 3, 3]);
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let (tx, mut rx) = mpsc::channel(1);
        let dispatcher = SampleDispatcher::new(vec![tx]);

        dispatcher.dispatch(sample("1.2.3.4"));
        dispatcher.dispatch(sample("1.2.3.4"));
        dispatcher.dispatch(sample("1.2.3.4"));

        // Only the first sample fits; the rest were dropped, not queued
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
