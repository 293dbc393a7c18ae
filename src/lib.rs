//! Portfolio API - library for app logic and testing

pub mod audit;
pub mod classify;
pub mod client;
pub mod config;
pub mod contact;
pub mod db;
pub mod error;
pub mod fallback;
pub mod logging;
pub mod mailer;
pub mod public;
pub mod rate_limit;
pub mod resource;
pub mod routes;
pub mod session;
pub mod storage;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    services::ServeDir, trace::TraceLayer,
};

use crate::audit::AuditLogger;
use crate::classify::ErrorClassifier;
use crate::config::AppConfig;
use crate::contact::ContactService;
use crate::db::models::{BlogPost, Experience, Project};
use crate::db::Backend;
use crate::fallback::FallbackData;
use crate::mailer::{Mailer, SmtpMailer};
use crate::public::PublicContent;
use crate::rate_limit::RateLimiter;
use crate::resource::{ProfileController, ResourceController};
use crate::session::SessionResolver;
use crate::storage::{FileStore, LocalDiskStorage, SupabaseStorage, UploadService, MAX_UPLOAD_BYTES};

/// Cap for JSON request bodies.
pub const JSON_BODY_LIMIT: usize = 2 * 1024 * 1024;
/// Cap for the multipart upload route: the file ceiling plus form overhead.
pub const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 1024 * 1024;

const RATE_LIMIT_PRUNE_EVERY: Duration = Duration::from_secs(60 * 60);

/// Everything a handler can extract with `State<_>`.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: SessionResolver,
    pub errors: ErrorClassifier,
    pub blogs: ResourceController<BlogPost>,
    pub projects: ResourceController<Project>,
    pub experiences: ResourceController<Experience>,
    pub profile: ProfileController,
    pub public: PublicContent,
    pub contact: ContactService,
    pub uploads: UploadService,
}

impl AppState {
    /// Wire services over the given backends. `backend: None` runs on
    /// fallback data with admin writes disabled.
    pub fn new(
        config: AppConfig,
        backend: Option<Backend>,
        files: Arc<dyn FileStore>,
        mailer: Option<Arc<dyn Mailer>>,
    ) -> Self {
        let errors = ErrorClassifier::new(config.environment);
        let audit = AuditLogger::new(backend.as_ref().map(|b| b.audit.clone()));
        let limiter = RateLimiter::new(config.contact_max_requests, config.contact_window);

        Self {
            sessions: SessionResolver::from_config(&config),
            errors,
            blogs: ResourceController::new(
                backend.as_ref().map(|b| b.blogs.clone()),
                audit.clone(),
                errors,
            ),
            projects: ResourceController::new(
                backend.as_ref().map(|b| b.projects.clone()),
                audit.clone(),
                errors,
            ),
            experiences: ResourceController::new(
                backend.as_ref().map(|b| b.experiences.clone()),
                audit.clone(),
                errors,
            ),
            profile: ProfileController::new(
                backend.as_ref().map(|b| b.profile.clone()),
                audit.clone(),
                errors,
            ),
            public: PublicContent::new(
                backend.as_ref().map(|b| b.public.clone()),
                backend.as_ref().map(|b| b.profile.clone()),
                FallbackData::bundled(),
                errors,
            ),
            contact: ContactService::new(limiter, mailer, errors),
            uploads: UploadService::new(files, audit, errors),
            config: Arc::new(config),
        }
    }
}

/// Configure CORS from the allowed origin list.
pub fn configure_cors(config: &AppConfig) -> CorsLayer {
    let allowed_origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Create and configure the application router.
pub fn create_app(state: AppState) -> Router {
    let cors = configure_cors(&state.config);

    let api = Router::new()
        .route("/api/blogs", get(routes::blog::list_posts))
        .route("/api/blogs/{id}", get(routes::blog::get_post))
        .route("/api/blogs/{id}/like", post(routes::blog::like_post))
        .route("/api/blogs/{id}/comment", post(routes::blog::comment_on_post))
        .route("/api/portfolio/projects", get(routes::portfolio::list_projects))
        .route("/api/portfolio/experiences", get(routes::portfolio::list_experiences))
        .route("/api/portfolio/user", get(routes::portfolio::get_profile))
        .route("/api/contact", post(routes::contact::submit))
        .route("/api/admin/blogs", post(routes::admin::create::<BlogPost>))
        .route(
            "/api/admin/blogs/{id}",
            put(routes::admin::update::<BlogPost>).delete(routes::admin::delete::<BlogPost>),
        )
        .route("/api/admin/projects", post(routes::admin::create::<Project>))
        .route(
            "/api/admin/projects/{id}",
            put(routes::admin::update::<Project>).delete(routes::admin::delete::<Project>),
        )
        .route("/api/admin/experiences", post(routes::admin::create::<Experience>))
        .route(
            "/api/admin/experiences/{id}",
            put(routes::admin::update::<Experience>).delete(routes::admin::delete::<Experience>),
        )
        .route(
            "/api/admin/profile",
            put(routes::admin::save_profile).patch(routes::admin::save_profile),
        )
        .route("/health", get(routes::health::health_ping))
        .route("/health/database", get(routes::health::health_database))
        .layer(RequestBodyLimitLayer::new(JSON_BODY_LIMIT));

    let uploads = Router::new()
        .route(
            "/api/admin/upload",
            post(routes::upload::upload_file).delete(routes::upload::delete_file),
        )
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .layer(RequestBodyLimitLayer::new(UPLOAD_BODY_LIMIT));

    let mut app = Router::new().merge(api).merge(uploads);
    if let Some(root) = state.uploads.local_root() {
        app = app.nest_service("/uploads", ServeDir::new(root));
    }

    app.with_state(state)
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        // Compress responses with gzip/br/zstd automatically
        .layer(CompressionLayer::new())
        .layer(cors)
}

fn file_store(config: &AppConfig) -> Arc<dyn FileStore> {
    match &config.storage {
        Some(storage) => {
            tracing::info!(bucket = %storage.bucket, "uploads go to hosted storage");
            Arc::new(SupabaseStorage::new(storage.clone()))
        }
        None => {
            tracing::info!(dir = %config.upload_dir, "uploads go to local disk");
            Arc::new(LocalDiskStorage::new(&config.upload_dir))
        }
    }
}

fn mailer(config: &AppConfig) -> Option<Arc<dyn Mailer>> {
    let Some(smtp) = &config.smtp else {
        tracing::info!("SMTP not configured. Contact form is disabled.");
        return None;
    };
    match SmtpMailer::new(smtp) {
        Ok(mailer) => Some(Arc::new(mailer)),
        Err(e) => {
            tracing::warn!(error = %e, "invalid SMTP configuration. Contact form is disabled.");
            None
        }
    }
}

async fn backend(config: &AppConfig) -> Option<Backend> {
    let Some(db_config) = &config.database else {
        tracing::info!("DATABASE_URL not set. Running on fallback data.");
        return None;
    };

    match db::init_pool(db_config).await {
        Ok(pool) => {
            if let Err(e) = db::run_migrations(&pool).await {
                tracing::error!("Failed to run database migrations: {}", e);
            }
            Some(Backend::postgres(pool))
        }
        Err(e) => {
            tracing::warn!(
                "Failed to initialize database pool: {}. Continuing on fallback data.",
                e
            );
            None
        }
    }
}

/// Run the server (used by main).
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env();

    // Guards MUST be held for the programme's lifetime; dropping them early
    // shuts down background log-writer threads and loses buffered log lines.
    let _log_guards = logging::init(&config);

    if config.uses_insecure_secret() {
        if !config.environment.is_development() {
            anyhow::bail!(
                "JWT secret must be set to a secure, unique value in production. \
                 Refusing to start with the default secret."
            );
        }
        tracing::warn!("SECURITY: using the default JWT secret. Set SUPABASE_JWT_SECRET.");
    }

    let state = AppState::new(
        config.clone(),
        backend(&config).await,
        file_store(&config),
        mailer(&config),
    );
    let _pruner = state.contact.limiter().spawn_pruner(RATE_LIMIT_PRUNE_EVERY);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid HOST/PORT configuration")?;
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(
        listener,
        create_app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}
