/**
 * Health Routes
 * Endpoints for checking backend health status
 */
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::public::PublicContent;

/// Single service check result
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCheck {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Simple health response
#[derive(Debug, Serialize, Deserialize)]
pub struct SimpleHealthResponse {
    pub status: String,
}

/// GET /health - Simple health ping
pub async fn health_ping() -> Json<SimpleHealthResponse> {
    Json(SimpleHealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /health/database - Database health check.
/// Always 200; the body says whether the store answered.
pub async fn health_database(State(content): State<PublicContent>) -> Json<ServiceCheck> {
    let Some(store) = content.store() else {
        return Json(ServiceCheck {
            status: "unhealthy".to_string(),
            response_time: None,
            error: Some("Database not configured".to_string()),
        });
    };

    let check = match store.ping().await {
        Ok(duration) => ServiceCheck {
            status: "healthy".to_string(),
            response_time: Some(duration.as_millis() as u64),
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "database health check failed");
            ServiceCheck {
                status: "unhealthy".to_string(),
                response_time: None,
                error: Some(e.to_string()),
            }
        }
    };
    Json(check)
}
