//! End-to-end test of the adaptive pipeline against the in-memory store:
//! a flood from one address must tighten its limit, get it banned, and leave
//! quiet peers untouched.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use adaptive_admission_service::core::{AdmissionEngine, DecisionReason, MemoryStore};
use adaptive_admission_service::models::{AdmissionConfig, DetectionConfig};
use adaptive_admission_service::utils::now_millis;

#[tokio::test]
async fn test_flood_is_throttled_then_banned() {
    let admission = AdmissionConfig::default();
    // One detector so every sample lands in the same population
    let detection = DetectionConfig {
        detectors: 1,
        ..DetectionConfig::default()
    };
    let engine = AdmissionEngine::new(Arc::new(MemoryStore::new()), admission, detection);

    let now = now_millis();

    // Quiet background traffic from ten peers
    for i in 0..10 {
        let decision = engine.decide(&format!("10.0.0.{}", i), "/orders", now).await;
        assert!(decision.admitted);
    }

    // One address floods well past the ban floor of the detector
    for i in 0..30i64 {
        engine.decide("6.6.6.6", "/orders", now + i).await;
    }

    // Let the detector and feedback tasks drain their queues
    sleep(Duration::from_millis(300)).await;

    // The flood's limit was overwritten by the ban verdict: max(10, 100/5)
    let limits = engine.limits();
    assert_eq!(limits.get("6.6.6.6"), Some(&20));

    // The ban record now short-circuits admission regardless of counters
    let decision = engine.decide("6.6.6.6", "/orders", now + 1000).await;
    assert!(!decision.admitted);
    assert_eq!(decision.reason, DecisionReason::Banned);

    // Quiet peers still get through at their usual limit
    let decision = engine.decide("10.0.0.1", "/orders", now + 1000).await;
    assert!(decision.admitted);
    assert_eq!(decision.limit, 100);
}

#[tokio::test]
async fn test_limit_plus_one_rejected_within_window() {
    let admission = AdmissionConfig {
        default_limit: 100,
        ..AdmissionConfig::default()
    };
    let detection = DetectionConfig {
        detectors: 2,
        ..DetectionConfig::default()
    };
    let engine = AdmissionEngine::new(Arc::new(MemoryStore::new()), admission, detection);

    let now = now_millis();
    for i in 1..=100u32 {
        let decision = engine.decide("1.2.3.4", "/orders", now).await;
        assert!(decision.admitted, "request {} should be admitted", i);
        assert_eq!(decision.remaining, 100 - i);
    }

    let decision = engine.decide("1.2.3.4", "/orders", now).await;
    assert!(!decision.admitted);
    assert_eq!(decision.reason, DecisionReason::RateLimited);
    assert_eq!(decision.remaining, 0);
    assert!(decision.retry_after_seconds.unwrap() > 0);
}
