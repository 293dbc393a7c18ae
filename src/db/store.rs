//! Store traits. Handlers only see these; Postgres is one implementation.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;

use super::models::{AuditEntry, BlogPost, Comment, Experience, Profile, Project};
use super::postgres::PgStore;
use crate::error::StoreError;
use crate::resource::{ProfilePatch, Resource};

/// CRUD over one resource table.
#[async_trait]
pub trait Repository<R: Resource>: Send + Sync {
    async fn insert(&self, new: R::New) -> Result<R, StoreError>;

    /// `Ok(None)` when no row has this id.
    async fn update(&self, id: &str, patch: R::Patch) -> Result<Option<R>, StoreError>;

    async fn find(&self, id: &str) -> Result<Option<R>, StoreError>;

    /// `Ok(false)` when no row has this id.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

/// The singleton profile row.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self) -> Result<Option<Profile>, StoreError>;

    /// Insert the row if absent, then apply the patch. Never creates a
    /// second row, even under concurrent calls.
    async fn upsert(&self, patch: ProfilePatch) -> Result<Profile, StoreError>;
}

/// Reads and counters used by the public site.
#[async_trait]
pub trait PublicStore: Send + Sync {
    /// Published posts, newest first, with their comments.
    async fn published_posts(&self) -> Result<Vec<BlogPost>, StoreError>;

    async fn published_post(&self, id_or_slug: &str) -> Result<Option<BlogPost>, StoreError>;

    async fn projects(&self) -> Result<Vec<Project>, StoreError>;

    async fn experiences(&self) -> Result<Vec<Experience>, StoreError>;

    /// Add `delta` to the like count, clamped at zero. `Ok(None)` when the
    /// post does not exist.
    async fn adjust_likes(&self, id: &str, delta: i64) -> Result<Option<i64>, StoreError>;

    /// Append a comment to a published post. `Ok(None)` when the post is
    /// missing or still a draft.
    async fn add_comment(
        &self,
        post_id: &str,
        author: &str,
        message: &str,
    ) -> Result<Option<Comment>, StoreError>;

    async fn ping(&self) -> Result<std::time::Duration, StoreError>;
}

/// Append-only audit log.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: AuditEntry) -> Result<(), StoreError>;
}

/// Every store the application needs, behind trait objects.
#[derive(Clone)]
pub struct Backend {
    pub blogs: Arc<dyn Repository<BlogPost>>,
    pub projects: Arc<dyn Repository<Project>>,
    pub experiences: Arc<dyn Repository<Experience>>,
    pub profile: Arc<dyn ProfileStore>,
    pub public: Arc<dyn PublicStore>,
    pub audit: Arc<dyn AuditSink>,
}

impl Backend {
    pub fn postgres(pool: PgPool) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Self {
            blogs: store.clone(),
            projects: store.clone(),
            experiences: store.clone(),
            profile: store.clone(),
            public: store.clone(),
            audit: store,
        }
    }
}
