use serde::{Deserialize, Serialize};

/// Admission control configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Default rate limit (requests per window) for identities without a
    /// policy entry
    pub default_limit: u32,
    /// Time window in seconds
    pub window_seconds: u64,
    /// Ban duration in seconds
    pub ban_duration_seconds: u64,
    /// Lower bound for adapted per-identity limits
    pub min_limit: u32,
    /// Upper bound for adapted per-identity limits
    pub max_limit: u32,
    /// Whether to admit requests when the backing store is unreachable.
    /// `true` keeps the service available at the cost of unmetered traffic;
    /// `false` rejects until the store recovers.
    pub fail_open: bool,
}

/// Anomaly detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Number of detector workers. `0` selects
    /// `max(2, available_parallelism - 1)`.
    pub detectors: usize,
    /// Detection window in milliseconds
    pub window_ms: u64,
    /// Z-score above which a heavily-counted identity is banned.
    /// Historical deployments ran this at 1.8 or 3.0; 1.8 is the default.
    pub ban_threshold: f64,
    /// Z-score above which an identity's limit is decreased.
    /// Historical deployments ran this at 1.0 or 2.0; 1.0 is the default.
    pub decrease_threshold: f64,
    /// Capacity of each detector's sample queue; samples are dropped when full
    pub sample_queue_depth: usize,
    /// Capacity of the verdict queue feeding the feedback controller
    pub verdict_queue_depth: usize,
}

/// Backing store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store backend: "redis" or "memory"
    pub backend: String,
    /// Redis connection URL
    pub url: String,
    /// Redis connection pool size
    pub pool_size: u32,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Backing store configuration
    pub store: StoreConfig,
    /// Admission control configuration
    pub admission: AdmissionConfig,
    /// Anomaly detection configuration
    pub detection: DetectionConfig,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            default_limit: 100,
            window_seconds: 60,
            ban_duration_seconds: 300,
            min_limit: 10,
            max_limit: 200,
            fail_open: true,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            detectors: 0,
            window_ms: 60_000,
            ban_threshold: 1.8,
            decrease_threshold: 1.0,
            sample_queue_depth: 1024,
            verdict_queue_depth: 256,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            store: StoreConfig {
                backend: "redis".to_string(),
                url: "redis://127.0.0.1:6379".to_string(),
                pool_size: 10,
            },
            admission: AdmissionConfig::default(),
            detection: DetectionConfig::default(),
        }
    }
}
