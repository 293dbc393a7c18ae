/**
 * Audit Logger
 * Best-effort record of admin mutations; failures are logged and swallowed
 */
use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use serde_json::Value;

use crate::db::models::{AuditAction, AuditEntry, ResourceKind};
use crate::db::AuditSink;
use crate::session::AdminSession;

const UNKNOWN: &str = "unknown";

/// Caller address: first `x-forwarded-for` hop, then `x-real-ip`, then
/// `cf-connecting-ip`, else "unknown".
pub fn client_ip(headers: &HeaderMap) -> String {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    header_str("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header_str("x-real-ip"))
        .or_else(|| header_str("cf-connecting-ip"))
        .unwrap_or(UNKNOWN)
        .to_string()
}

/// Where a request came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    pub ip: String,
    pub user_agent: String,
}

impl RequestOrigin {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            ip: client_ip(headers),
            user_agent: headers
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .unwrap_or(UNKNOWN)
                .to_string(),
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestOrigin {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

#[derive(Clone)]
pub struct AuditLogger {
    sink: Option<Arc<dyn AuditSink>>,
}

impl AuditLogger {
    pub fn new(sink: Option<Arc<dyn AuditSink>>) -> Self {
        Self { sink }
    }

    /// Append one entry. Never fails; call only after the mutation committed.
    pub async fn record(
        &self,
        actor: &AdminSession,
        action: AuditAction,
        kind: ResourceKind,
        resource_id: Option<&str>,
        origin: &RequestOrigin,
        metadata: Option<Value>,
    ) {
        let Some(sink) = &self.sink else {
            tracing::warn!(
                action = %action,
                resource_type = %kind,
                "audit log store not configured, entry dropped"
            );
            return;
        };

        let entry = AuditEntry {
            actor_id: actor.user_id.clone(),
            action,
            resource_type: kind,
            resource_id: resource_id.map(str::to_string),
            ip_address: origin.ip.clone(),
            user_agent: origin.user_agent.clone(),
            metadata,
        };

        if let Err(e) = sink.append(entry).await {
            tracing::error!(
                error = %e,
                user_id = %actor.user_id,
                action = %action,
                resource_type = %kind,
                resource_id = ?resource_id,
                "failed to write audit log entry"
            );
        }
    }
}
