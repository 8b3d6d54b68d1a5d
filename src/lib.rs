//! Adaptive admission control for HTTP services.
//!
//! Per-request admit/reject decisions against a per-client traffic budget
//! that adapts to observed behavior: a fixed-window counter in a pluggable
//! backing store, a TTL ban registry, parallel z-score anomaly detectors fed
//! round-robin, and a feedback loop that tightens or relaxes per-client
//! limits.

pub mod api;
pub mod config;
pub mod core;
pub mod models;
pub mod utils;
