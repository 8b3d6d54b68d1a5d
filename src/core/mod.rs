//! Core functionality for the adaptive admission control service.
//!
//! This module contains the engine's components: the per-request admission
//! controller, the backing store abstraction, the ban registry and policy
//! table, and the anomaly detection pipeline that adapts per-identity limits.

pub mod admission;
pub mod ban;
pub mod detector;
pub mod dispatcher;
pub mod engine;
pub mod feedback;
pub mod policy;
pub mod store;

pub use admission::{AdmissionController, Decision, DecisionReason};
pub use ban::BanRegistry;
pub use detector::{AnomalyDetector, AnomalyVerdict, VerdictAction};
pub use dispatcher::{SampleDispatcher, TrafficSample};
pub use engine::AdmissionEngine;
pub use feedback::FeedbackController;
pub use policy::PolicyTable;
pub use store::{AdmissionStore, MemoryStore, RedisStore, StoreError};
