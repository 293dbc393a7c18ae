/*!
 * Admin Resources
 * Schema, patch semantics and the validate -> mutate -> audit pipeline
 * shared by every admin-managed content type
 */
pub mod blog;
pub mod experience;
pub mod profile;
pub mod project;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::audit::{AuditLogger, RequestOrigin};
use crate::classify::ErrorClassifier;
use crate::db::models::{AuditAction, Profile, ResourceKind};
use crate::db::{ProfileStore, Repository};
use crate::error::ApiError;
use crate::session::AdminSession;
use crate::validation::ValidationErrors;

pub use blog::{BlogPatch, NewBlogPost};
pub use experience::{ExperiencePatch, NewExperience};
pub use profile::ProfilePatch;
pub use project::{NewProject, ProjectPatch};

pub const DATABASE_UNAVAILABLE: &str = "Database is not configured";

/// A content type managed through the admin API.
pub trait Resource: Clone + Serialize + Send + Sync + 'static {
    const KIND: ResourceKind;

    /// Validated create payload with defaults applied.
    type New: Send + Sync + 'static;
    /// Validated update payload. `None` fields stay unchanged.
    type Patch: Send + Sync + 'static;

    fn id(&self) -> &str;

    fn parse_new(body: &Value) -> Result<Self::New, ValidationErrors>;

    fn parse_patch(body: &Value) -> Result<Self::Patch, ValidationErrors>;

    fn build(id: String, created: DateTime<Utc>, new: Self::New) -> Self;

    fn apply(&mut self, patch: Self::Patch);

    fn changed_fields(patch: &Self::Patch) -> Vec<&'static str>;

    /// Identifying fields recorded in the audit log.
    fn summary(&self) -> Value;
}

/// Unwrap a field the create schema has already required.
pub(crate) fn present<T>(value: Option<T>, field: &str) -> Result<T, ValidationErrors> {
    value.ok_or_else(|| ValidationErrors::single(field, "is required"))
}

/// Create / update / delete for one resource kind, with audit logging.
pub struct ResourceController<R: Resource> {
    repo: Option<Arc<dyn Repository<R>>>,
    audit: AuditLogger,
    errors: ErrorClassifier,
}

impl<R: Resource> Clone for ResourceController<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            audit: self.audit.clone(),
            errors: self.errors,
        }
    }
}

impl<R: Resource> ResourceController<R> {
    pub fn new(
        repo: Option<Arc<dyn Repository<R>>>,
        audit: AuditLogger,
        errors: ErrorClassifier,
    ) -> Self {
        Self { repo, audit, errors }
    }

    fn repo(&self) -> Result<&Arc<dyn Repository<R>>, ApiError> {
        self.repo
            .as_ref()
            .ok_or_else(|| ApiError::Unavailable(DATABASE_UNAVAILABLE.to_string()))
    }

    fn context(operation: &str) -> String {
        format!("{}.{}", R::KIND, operation)
    }

    pub async fn create(
        &self,
        session: &AdminSession,
        origin: &RequestOrigin,
        body: &Value,
    ) -> Result<R, ApiError> {
        let context = Self::context("create");
        let new = R::parse_new(body).map_err(|errors| {
            self.errors
                .validation_failure(&context, errors, json!({ "actor": session.user_id }))
        })?;

        let record = self.repo()?.insert(new).await.map_err(|err| {
            self.errors
                .storage_failure(&context, &err, json!({ "actor": session.user_id }))
        })?;

        self.audit
            .record(
                session,
                AuditAction::Create,
                R::KIND,
                Some(record.id()),
                origin,
                Some(record.summary()),
            )
            .await;

        Ok(record)
    }

    pub async fn update(
        &self,
        session: &AdminSession,
        origin: &RequestOrigin,
        id: &str,
        body: &Value,
    ) -> Result<R, ApiError> {
        let context = Self::context("update");
        let meta = json!({ "actor": session.user_id, "id": id });
        let patch = R::parse_patch(body)
            .map_err(|errors| self.errors.validation_failure(&context, errors, meta.clone()))?;
        let fields = R::changed_fields(&patch);

        let record = self
            .repo()?
            .update(id, patch)
            .await
            .map_err(|err| self.errors.storage_failure(&context, &err, meta))?
            .ok_or_else(|| ApiError::NotFound(format!("{} not found", R::KIND)))?;

        self.audit
            .record(
                session,
                AuditAction::Update,
                R::KIND,
                Some(id),
                origin,
                Some(json!({ "fields": fields })),
            )
            .await;

        Ok(record)
    }

    pub async fn delete(
        &self,
        session: &AdminSession,
        origin: &RequestOrigin,
        id: &str,
    ) -> Result<(), ApiError> {
        let context = Self::context("delete");
        let meta = json!({ "actor": session.user_id, "id": id });
        let repo = self.repo()?;

        let snapshot = match repo.find(id).await {
            Ok(found) => found.map(|record| record.summary()),
            Err(err) => {
                tracing::warn!(
                    context = %context,
                    id = %id,
                    error = %err,
                    "could not read snapshot before delete"
                );
                None
            }
        };

        let deleted = repo
            .delete(id)
            .await
            .map_err(|err| self.errors.storage_failure(&context, &err, meta))?;
        if !deleted {
            return Err(ApiError::NotFound(format!("{} not found", R::KIND)));
        }

        self.audit
            .record(session, AuditAction::Delete, R::KIND, Some(id), origin, snapshot)
            .await;

        Ok(())
    }
}

/// Saves the singleton profile.
#[derive(Clone)]
pub struct ProfileController {
    store: Option<Arc<dyn ProfileStore>>,
    audit: AuditLogger,
    errors: ErrorClassifier,
}

impl ProfileController {
    pub fn new(
        store: Option<Arc<dyn ProfileStore>>,
        audit: AuditLogger,
        errors: ErrorClassifier,
    ) -> Self {
        Self { store, audit, errors }
    }

    pub async fn save(
        &self,
        session: &AdminSession,
        origin: &RequestOrigin,
        body: &Value,
    ) -> Result<Profile, ApiError> {
        let context = "profile.save";
        let meta = json!({ "actor": session.user_id });
        let patch = ProfilePatch::parse(body)
            .map_err(|errors| self.errors.validation_failure(context, errors, meta.clone()))?;
        let fields = patch.changed_fields();

        let store = self
            .store
            .as_ref()
            .ok_or_else(|| ApiError::Unavailable(DATABASE_UNAVAILABLE.to_string()))?;
        let profile = store
            .upsert(patch)
            .await
            .map_err(|err| self.errors.storage_failure(context, &err, meta))?;

        self.audit
            .record(
                session,
                AuditAction::Update,
                ResourceKind::Profile,
                None,
                origin,
                Some(json!({ "fields": fields })),
            )
            .await;

        Ok(profile)
    }
}
