/**
 * Contact Form
 * Rate limiting, sanitising, validation, spam screening and delivery
 */
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};

use crate::audit::RequestOrigin;
use crate::classify::ErrorClassifier;
use crate::error::ApiError;
use crate::mailer::{ContactMessage, Mailer};
use crate::rate_limit::RateLimiter;
use crate::validation::{EMAIL_REGEX, MAX_EMAIL_LENGTH};

pub const MAX_INPUT_CHARS: usize = 5000;
pub const MIN_MESSAGE_CHARS: usize = 10;

const SPAM_KEYWORDS: &[&str] = &[
    "viagra",
    "cialis",
    "lottery",
    "winner",
    "prize",
    "click here",
    "buy now",
    "limited time",
    "act now",
    "cryptocurrency",
    "bitcoin",
    "forex",
    "casino",
];

lazy_static! {
    static ref CONTACT_NAME_REGEX: Regex = Regex::new(r"^[a-zA-Z\s\-']{2,50}$").unwrap();
}

/// Trim, strip angle brackets and cap the length.
pub fn sanitize_input(input: &str) -> String {
    input
        .trim()
        .chars()
        .filter(|c| *c != '<' && *c != '>')
        .take(MAX_INPUT_CHARS)
        .collect()
}

pub fn is_valid_contact_name(name: &str) -> bool {
    CONTACT_NAME_REGEX.is_match(name)
}

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= MAX_EMAIL_LENGTH && EMAIL_REGEX.is_match(email)
}

pub fn contains_spam(text: &str) -> bool {
    let lower = text.to_lowercase();
    SPAM_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

#[derive(Debug, Serialize)]
pub struct ContactReceipt {
    pub success: bool,
    pub message: String,
}

#[derive(Clone)]
pub struct ContactService {
    limiter: RateLimiter,
    mailer: Option<Arc<dyn Mailer>>,
    errors: ErrorClassifier,
}

impl ContactService {
    pub fn new(limiter: RateLimiter, mailer: Option<Arc<dyn Mailer>>, errors: ErrorClassifier) -> Self {
        Self {
            limiter,
            mailer,
            errors,
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub async fn submit(&self, origin: &RequestOrigin, body: &Value) -> Result<ContactReceipt, ApiError> {
        if !self.limiter.check(&origin.ip).await {
            tracing::warn!(ip = %origin.ip, "contact form rate limit exceeded");
            return Err(ApiError::RateLimited);
        }

        let field = |name: &str| {
            body.get(name)
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
        };
        let (Some(name), Some(email), Some(message)) =
            (field("name"), field("email"), field("message"))
        else {
            return Err(ApiError::BadRequest("All fields are required".to_string()));
        };

        let name = sanitize_input(name);
        let email = sanitize_input(email);
        let message = sanitize_input(message);

        if !is_valid_contact_name(&name) {
            return Err(ApiError::BadRequest(
                "Invalid name format. Only letters, spaces, and hyphens allowed.".to_string(),
            ));
        }
        if !is_valid_email(&email) {
            return Err(ApiError::BadRequest("Invalid email format".to_string()));
        }

        let length = message.chars().count();
        if length < MIN_MESSAGE_CHARS {
            return Err(ApiError::BadRequest(
                "Message is too short. Please provide more details.".to_string(),
            ));
        }
        if length > MAX_INPUT_CHARS {
            return Err(ApiError::BadRequest(
                "Message is too long. Please keep it under 5000 characters.".to_string(),
            ));
        }

        if contains_spam(&name) || contains_spam(&message) {
            tracing::warn!(name = %name, email = %email, ip = %origin.ip, "contact message flagged as spam");
            return Err(ApiError::BadRequest(
                "Message flagged as spam. Please contact me through other channels.".to_string(),
            ));
        }

        let Some(mailer) = &self.mailer else {
            tracing::error!("contact form used but SMTP is not configured");
            return Err(ApiError::Unavailable(
                "Email service is not configured. Please contact me through other channels."
                    .to_string(),
            ));
        };

        if let Err(e) = mailer.verify().await {
            tracing::error!(error = %e, "SMTP connection failed");
            return Err(ApiError::Unavailable(
                "Email service temporarily unavailable. Please try again later.".to_string(),
            ));
        }

        let submission = ContactMessage {
            name,
            email,
            message,
            ip: origin.ip.clone(),
            user_agent: origin.user_agent.clone(),
        };
        mailer.send(&submission).await.map_err(|e| {
            self.errors
                .safe_error("contact.send", &e, json!({ "ip": origin.ip }));
            ApiError::Internal("Failed to send message. Please try again later.".to_string())
        })?;

        Ok(ContactReceipt {
            success: true,
            message: "Message sent successfully! I will get back to you soon.".to_string(),
        })
    }
}
