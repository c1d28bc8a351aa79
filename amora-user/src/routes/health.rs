use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use amora_shared::clients::redis::RedisClient;
use amora_shared::{HealthCheck, HealthResponse, HealthStatus};

use crate::repository::PgRepository;
use crate::AppState;

/// A dependency the health endpoint reports on.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    fn name(&self) -> &'static str;

    async fn probe(&self) -> Result<(), String>;
}

#[async_trait]
impl HealthProbe for PgRepository {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn probe(&self) -> Result<(), String> {
        self.ping().map_err(|e| e.to_string())
    }
}

#[async_trait]
impl HealthProbe for RedisClient {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn probe(&self) -> Result<(), String> {
        self.ping().await.map_err(|e| e.to_string())
    }
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    let mut checks = Vec::with_capacity(state.probes.len());
    for probe in &state.probes {
        let check = match probe.probe().await {
            Ok(()) => HealthCheck::up(probe.name()),
            Err(e) => {
                tracing::warn!(dependency = probe.name(), error = %e, "health probe failed");
                HealthCheck::down(probe.name(), e)
            }
        };
        checks.push(check);
    }

    let response = HealthResponse::new("amora-user", env!("CARGO_PKG_VERSION"), checks);
    let status = match response.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(response)).into_response()
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    state.metrics_handle.render()
}
