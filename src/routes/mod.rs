/**
 * Routes Module
 * API route handlers
 */

pub mod admin;
pub mod blog;
pub mod contact;
pub mod health;
pub mod portfolio;
pub mod upload;

use axum::body::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;

/// Success response (for delete)
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Decode a JSON request body. An empty body reads as `{}`.
pub(crate) fn json_body(body: &Bytes) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "rejected malformed JSON body");
        ApiError::BadRequest("Invalid JSON body".to_string())
    })
}
