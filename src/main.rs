//! Adaptive Admission Control Service
//!
//! This is the main entry point for the service.
//! It initializes the application components and starts the web server.

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;
use log::info;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;

use adaptive_admission_service::api::{self, ApiState};
use adaptive_admission_service::config;
use adaptive_admission_service::core::{AdmissionEngine, AdmissionStore, MemoryStore, RedisStore};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    info!("Starting Adaptive Admission Control Service...");

    // Load configuration
    let config = config::load_config().context("failed to load configuration")?;
    let config = Arc::new(config);

    // Expose Prometheus metrics
    PrometheusBuilder::new()
        .install()
        .context("failed to install Prometheus exporter")?;

    // Initialize the backing store
    let store: Arc<dyn AdmissionStore> = match config.store.backend.as_str() {
        "memory" => Arc::new(MemoryStore::new()),
        _ => Arc::new(
            RedisStore::connect(&config.store.url)
                .await
                .context("failed to connect to Redis")?,
        ),
    };

    // Build the admission engine and spawn its workers
    let engine = Arc::new(AdmissionEngine::new(
        store,
        config.admission.clone(),
        config.detection.clone(),
    ));

    // Create API state
    let state = web::Data::new(ApiState {
        engine,
        config: config.clone(),
    });

    // Start HTTP server
    HttpServer::new(move || App::new().app_data(state.clone()).configure(api::config))
        .bind((config.server.host.as_str(), config.server.port))?
        .run()
        .await
        .context("server error")
}
