//! API endpoints for the adaptive admission control service.
//!
//! This module provides HTTP endpoints for interacting with the service:
//! the admission check itself, a probe endpoint that checks the caller's own
//! address, and a read-only view of the adapted limits.

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::{AdmissionEngine, Decision, DecisionReason};
use crate::models::Config;
use crate::utils::now_millis;

pub struct ApiState {
    pub engine: Arc<AdmissionEngine>,
    pub config: Arc<Config>,
}

/// API configuration function for Actix-web
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(web::resource("/health").route(web::get().to(health_check)))
            .service(web::resource("/check").route(web::post().to(check_admission)))
            .service(web::resource("/limits").route(web::get().to(current_limits))),
    )
    .service(web::resource("/test").route(web::get().to(probe)));
}

/// Health check endpoint response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Admission check request
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckRequest {
    /// Client identity to check (IP address or equivalent)
    pub key: String,
    /// Endpoint the request targets; informational, forwarded to the detectors
    #[serde(default)]
    pub endpoint: String,
}

/// Body shared by admit and reject responses
#[derive(Serialize)]
struct CheckResponse {
    success: bool,
    message: String,
}

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Admission check for an explicit identity
async fn check_admission(
    state: web::Data<ApiState>,
    req: web::Json<CheckRequest>,
) -> impl Responder {
    let decision = state
        .engine
        .decide(&req.key, &req.endpoint, now_millis())
        .await;
    decision_response(&decision)
}

/// Probe endpoint: runs the admission check against the caller's own address
async fn probe(state: web::Data<ApiState>, req: HttpRequest) -> impl Responder {
    let identity = req
        .peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let decision = state.engine.decide(&identity, req.path(), now_millis()).await;
    decision_response(&decision)
}

/// Read-only snapshot of the adapted per-identity limits
async fn current_limits(state: web::Data<ApiState>) -> impl Responder {
    HttpResponse::Ok().json(state.engine.limits())
}

fn decision_response(decision: &Decision) -> HttpResponse {
    match decision.reason {
        DecisionReason::Admitted => HttpResponse::Ok()
            .insert_header(("X-RateLimit-Limit", decision.limit.to_string()))
            .insert_header(("X-RateLimit-Remaining", decision.remaining.to_string()))
            .json(CheckResponse {
                success: true,
                message: "Request allowed.".to_string(),
            }),
        DecisionReason::RateLimited => {
            let mut builder = HttpResponse::TooManyRequests();
            builder
                .insert_header(("X-RateLimit-Limit", decision.limit.to_string()))
                .insert_header(("X-RateLimit-Remaining", "0"));
            if let Some(seconds) = decision.retry_after_seconds {
                builder.insert_header(("Retry-After", seconds.to_string()));
            }
            builder.json(CheckResponse {
                success: false,
                message: "Rate limit exceeded.".to_string(),
            })
        }
        DecisionReason::Banned => HttpResponse::TooManyRequests().json(CheckResponse {
            success: false,
            message: "IP temporarily banned for suspicious activity.".to_string(),
        }),
    }
}
