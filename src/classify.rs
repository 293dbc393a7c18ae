/**
 * Error Classifier
 * Turns internal failures into messages that are safe to send to the client
 */
use std::fmt::Display;

use serde_json::Value;

use crate::config::Environment;
use crate::error::{ApiError, StoreError};
use crate::validation::ValidationErrors;

pub const GENERIC_ERROR: &str = "An error occurred. Please try again later.";
pub const DATABASE_ERROR: &str = "Database operation failed. Please try again.";
pub const VALIDATION_ERROR: &str = "Invalid input. Please check your data and try again.";

/// Environment-aware mapping from internal errors to client messages.
/// Every call logs the full detail before returning.
#[derive(Debug, Clone, Copy)]
pub struct ErrorClassifier {
    environment: Environment,
}

impl ErrorClassifier {
    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn safe_error(&self, context: &str, err: &dyn Display, meta: Value) -> String {
        tracing::error!(context = %context, error = %err, meta = %meta, "operation failed");
        if self.environment.is_development() {
            err.to_string()
        } else {
            GENERIC_ERROR.to_string()
        }
    }

    pub fn safe_database_error(&self, context: &str, err: &dyn Display, meta: Value) -> String {
        tracing::error!(context = %context, error = %err, meta = %meta, "database operation failed");
        if self.environment.is_development() {
            err.to_string()
        } else {
            DATABASE_ERROR.to_string()
        }
    }

    pub fn safe_validation_error(&self, context: &str, err: &dyn Display, meta: Value) -> String {
        tracing::warn!(context = %context, error = %err, meta = %meta, "validation failed");
        let message = err.to_string();
        if self.environment.is_development() || mentions_rule(&message) {
            message
        } else {
            VALIDATION_ERROR.to_string()
        }
    }

    /// Build the 400 response for a failed schema check. The field map is
    /// only attached in development.
    pub fn validation_failure(&self, context: &str, errors: ValidationErrors, meta: Value) -> ApiError {
        let message = self.safe_validation_error(context, &errors, meta);
        ApiError::Validation {
            message,
            fields: self.environment.is_development().then_some(errors),
        }
    }

    /// Build the response for a failed store call. Unique violations become
    /// 409 with a fixed message; everything else is a 500.
    pub fn storage_failure(&self, context: &str, err: &StoreError, meta: Value) -> ApiError {
        match err {
            StoreError::Conflict(_) => {
                tracing::warn!(context = %context, error = %err, meta = %meta, "unique constraint violated");
                ApiError::Conflict("A record with this identifier already exists".to_string())
            }
            _ => ApiError::Storage(self.safe_database_error(context, err, meta)),
        }
    }
}

fn mentions_rule(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["invalid", "required", "must"]
        .iter()
        .any(|marker| lower.contains(marker))
}
