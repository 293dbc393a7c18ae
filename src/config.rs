/**
 * Configuration
 * Process configuration read once from the environment and injected into the app
 */
use std::time::Duration;

use crate::db::DbConfig;

/// Default JWT secret. Refused in production.
pub const INSECURE_JWT_SECRET: &str = "default-jwt-secret-change-in-production";

/// Deployment mode. Controls error verbosity and log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Anything other than an explicit development value is treated as production.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            _ => Environment::Production,
        }
    }

    pub fn is_development(self) -> bool {
        self == Environment::Development
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

/// Hosted object storage (Supabase Storage REST API).
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub url: String,
    pub service_role_key: String,
    pub bucket: String,
}

/// Outbound SMTP settings for the contact form.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// Implicit TLS (port 465) instead of STARTTLS.
    pub secure: bool,
    pub user: String,
    pub password: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub database: Option<DbConfig>,
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub session_cookie: String,
    pub storage: Option<StorageConfig>,
    pub upload_dir: String,
    pub smtp: Option<SmtpConfig>,
    pub allowed_origins: Vec<String>,
    pub contact_max_requests: u32,
    pub contact_window: Duration,
    pub log_dir: String,
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            host: "127.0.0.1".to_string(),
            port: 3001,
            database: None,
            jwt_secret: INSECURE_JWT_SECRET.to_string(),
            jwt_audience: "authenticated".to_string(),
            session_cookie: "sb-access-token".to_string(),
            storage: None,
            upload_dir: "uploads".to_string(),
            smtp: None,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            contact_max_requests: 3,
            contact_window: Duration::from_secs(60 * 60),
            log_dir: "logs".to_string(),
            log_level: None,
        }
    }
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    var(name).and_then(|v| v.parse().ok())
}

impl AppConfig {
    /// Read configuration from the process environment.
    /// Call after `dotenvy::dotenv()`.
    pub fn from_env() -> Self {
        let defaults = AppConfig::default();

        let environment = var("ENVIRONMENT")
            .map(|v| Environment::parse(&v))
            .unwrap_or(Environment::Production);

        let database = var("DATABASE_URL").map(|_| DbConfig::default());

        let storage = match (
            var("SUPABASE_URL").or_else(|| var("NEXT_PUBLIC_SUPABASE_URL")),
            var("SUPABASE_SERVICE_ROLE_KEY"),
        ) {
            (Some(url), Some(key)) => Some(StorageConfig {
                url: url.trim_end_matches('/').to_string(),
                service_role_key: key,
                bucket: var("STORAGE_BUCKET").unwrap_or_else(|| "public".to_string()),
            }),
            _ => None,
        };

        let smtp = match (var("SMTP_HOST"), var("SMTP_USER"), var("SMTP_PASSWORD")) {
            (Some(host), Some(user), Some(password)) => Some(SmtpConfig {
                host,
                port: parsed("SMTP_PORT").unwrap_or(587),
                secure: var("SMTP_SECURE").as_deref() == Some("true"),
                from: var("SMTP_FROM").unwrap_or_else(|| user.clone()),
                to: var("SMTP_TO").unwrap_or_else(|| user.clone()),
                user,
                password,
            }),
            _ => None,
        };

        let allowed_origins = var("ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty())
            .or_else(|| var("FRONTEND_ORIGIN").map(|origin| vec![origin]))
            .unwrap_or(defaults.allowed_origins);

        Self {
            environment,
            host: var("HOST").unwrap_or(defaults.host),
            port: parsed("PORT").unwrap_or(defaults.port),
            database,
            jwt_secret: var("SUPABASE_JWT_SECRET")
                .or_else(|| var("JWT_SECRET"))
                .unwrap_or(defaults.jwt_secret),
            jwt_audience: var("JWT_AUDIENCE").unwrap_or(defaults.jwt_audience),
            session_cookie: var("SESSION_COOKIE").unwrap_or(defaults.session_cookie),
            storage,
            upload_dir: var("UPLOAD_DIR").unwrap_or(defaults.upload_dir),
            smtp,
            allowed_origins,
            contact_max_requests: parsed("CONTACT_MAX_REQUESTS")
                .unwrap_or(defaults.contact_max_requests),
            contact_window: parsed("CONTACT_WINDOW_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.contact_window),
            log_dir: var("LOG_DIR").unwrap_or(defaults.log_dir),
            log_level: var("LOG_LEVEL"),
        }
    }

    pub fn uses_insecure_secret(&self) -> bool {
        self.jwt_secret.is_empty() || self.jwt_secret == INSECURE_JWT_SECRET
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parse_defaults_to_production() {
        assert_eq!(Environment::parse("development"), Environment::Development);
        assert_eq!(Environment::parse(" Dev "), Environment::Development);
        assert_eq!(Environment::parse("production"), Environment::Production);
        assert_eq!(Environment::parse("staging"), Environment::Production);
        assert_eq!(Environment::parse(""), Environment::Production);
    }

    #[test]
    fn test_default_config_is_offline() {
        let config = AppConfig::default();
        assert!(config.database.is_none());
        assert!(config.storage.is_none());
        assert!(config.smtp.is_none());
        assert!(config.uses_insecure_secret());
        assert_eq!(config.contact_max_requests, 3);
    }
}
