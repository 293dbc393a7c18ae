//! Postgres implementation of the store traits.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, FromRow, PgConnection, PgPool};
use uuid::Uuid;

use super::models::{AuditEntry, BlogPost, Comment, Experience, Profile, Project};
use super::store::{AuditSink, ProfileStore, PublicStore, Repository};
use crate::error::StoreError;
use crate::resource::{ProfilePatch, Resource};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn comments_for(&self, ids: &[String]) -> Result<HashMap<String, Vec<Comment>>, StoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<CommentRow> = sqlx::query_as(
            r#"
            SELECT blog_id, id, author, message, created_at
            FROM blog_comments
            WHERE blog_id = ANY($1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        let mut grouped: HashMap<String, Vec<Comment>> = HashMap::new();
        for row in rows {
            grouped.entry(row.blog_id).or_default().push(row.comment);
        }
        Ok(grouped)
    }
}

#[derive(FromRow)]
struct CommentRow {
    blog_id: String,
    #[sqlx(flatten)]
    comment: Comment,
}

/// Table mapping for a resource stored in Postgres.
#[async_trait]
pub trait PgRecord: Resource + for<'r> FromRow<'r, PgRow> + Unpin {
    const TABLE: &'static str;

    async fn insert_row(&self, conn: &mut PgConnection) -> Result<Self, sqlx::Error>;

    async fn update_row(&self, conn: &mut PgConnection) -> Result<Self, sqlx::Error>;
}

#[async_trait]
impl PgRecord for BlogPost {
    const TABLE: &'static str = "blogs";

    async fn insert_row(&self, conn: &mut PgConnection) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r#"
            INSERT INTO blogs
                (id, title, slug, content, excerpt, cover_image_url, tags, status, featured, likes, created_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(&self.id)
        .bind(&self.title)
        .bind(&self.slug)
        .bind(&self.content)
        .bind(&self.excerpt)
        .bind(&self.cover_image_url)
        .bind(&self.tags)
        .bind(self.status.as_str())
        .bind(self.featured)
        .bind(self.likes)
        .bind(self.created_date)
        .fetch_one(conn)
        .await
    }

    async fn update_row(&self, conn: &mut PgConnection) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r#"
            UPDATE blogs SET
                title = $2, slug = $3, content = $4, excerpt = $5, cover_image_url = $6,
                tags = $7, status = $8, featured = $9, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(&self.id)
        .bind(&self.title)
        .bind(&self.slug)
        .bind(&self.content)
        .bind(&self.excerpt)
        .bind(&self.cover_image_url)
        .bind(&self.tags)
        .bind(self.status.as_str())
        .bind(self.featured)
        .fetch_one(conn)
        .await
    }
}

#[async_trait]
impl PgRecord for Project {
    const TABLE: &'static str = "portfolio_projects";

    async fn insert_row(&self, conn: &mut PgConnection) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r#"
            INSERT INTO portfolio_projects
                (id, title, description, technologies, github_url, demo_url, image_url, category, featured, created_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(&self.id)
        .bind(&self.title)
        .bind(&self.description)
        .bind(&self.technologies)
        .bind(&self.github_url)
        .bind(&self.demo_url)
        .bind(&self.image_url)
        .bind(self.category.as_str())
        .bind(self.featured)
        .bind(self.created_date)
        .fetch_one(conn)
        .await
    }

    async fn update_row(&self, conn: &mut PgConnection) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r#"
            UPDATE portfolio_projects SET
                title = $2, description = $3, technologies = $4, github_url = $5,
                demo_url = $6, image_url = $7, category = $8, featured = $9
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(&self.id)
        .bind(&self.title)
        .bind(&self.description)
        .bind(&self.technologies)
        .bind(&self.github_url)
        .bind(&self.demo_url)
        .bind(&self.image_url)
        .bind(self.category.as_str())
        .bind(self.featured)
        .fetch_one(conn)
        .await
    }
}

#[async_trait]
impl PgRecord for Experience {
    const TABLE: &'static str = "portfolio_experiences";

    async fn insert_row(&self, conn: &mut PgConnection) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r#"
            INSERT INTO portfolio_experiences
                (id, title, organization, start_date, end_date, description, type, current)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&self.id)
        .bind(&self.title)
        .bind(&self.organization)
        .bind(&self.start_date)
        .bind(&self.end_date)
        .bind(&self.description)
        .bind(self.kind.as_str())
        .bind(self.current)
        .fetch_one(conn)
        .await
    }

    async fn update_row(&self, conn: &mut PgConnection) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r#"
            UPDATE portfolio_experiences SET
                title = $2, organization = $3, start_date = $4, end_date = $5,
                description = $6, type = $7, current = $8
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(&self.id)
        .bind(&self.title)
        .bind(&self.organization)
        .bind(&self.start_date)
        .bind(&self.end_date)
        .bind(&self.description)
        .bind(self.kind.as_str())
        .bind(self.current)
        .fetch_one(conn)
        .await
    }
}

#[async_trait]
impl<R: PgRecord> Repository<R> for PgStore {
    async fn insert(&self, new: R::New) -> Result<R, StoreError> {
        let record = R::build(Uuid::new_v4().to_string(), Utc::now(), new);
        let mut conn = self.pool.acquire().await.map_err(StoreError::from_sqlx)?;
        record
            .insert_row(&mut conn)
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn update(&self, id: &str, patch: R::Patch) -> Result<Option<R>, StoreError> {
        let sql = format!("SELECT * FROM {} WHERE id = $1 FOR UPDATE", R::TABLE);
        let mut tx = self.pool.begin().await.map_err(StoreError::from_sqlx)?;

        let existing: Option<R> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(StoreError::from_sqlx)?;
        let Some(mut record) = existing else {
            return Ok(None);
        };

        record.apply(patch);
        let saved = record
            .update_row(&mut tx)
            .await
            .map_err(StoreError::from_sqlx)?;
        tx.commit().await.map_err(StoreError::from_sqlx)?;

        Ok(Some(saved))
    }

    async fn find(&self, id: &str) -> Result<Option<R>, StoreError> {
        let sql = format!("SELECT * FROM {} WHERE id = $1", R::TABLE);
        sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", R::TABLE);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn get(&self) -> Result<Option<Profile>, StoreError> {
        sqlx::query_as("SELECT * FROM portfolio_profile WHERE singleton")
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn upsert(&self, patch: ProfilePatch) -> Result<Profile, StoreError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from_sqlx)?;

        sqlx::query(
            "INSERT INTO portfolio_profile (singleton) VALUES (true) ON CONFLICT (singleton) DO NOTHING",
        )
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        let mut profile: Profile =
            sqlx::query_as("SELECT * FROM portfolio_profile WHERE singleton FOR UPDATE")
                .fetch_one(&mut *tx)
                .await
                .map_err(StoreError::from_sqlx)?;

        patch.apply(&mut profile);

        let saved: Profile = sqlx::query_as(
            r#"
            UPDATE portfolio_profile SET
                full_name = $1, email = $2, bio = $3, title = $4, location = $5,
                profile_image_url = $6, resume_url = $7, github_url = $8, linkedin_url = $9,
                updated_at = now()
            WHERE singleton
            RETURNING *
            "#,
        )
        .bind(&profile.full_name)
        .bind(&profile.email)
        .bind(&profile.bio)
        .bind(&profile.title)
        .bind(&profile.location)
        .bind(&profile.profile_image_url)
        .bind(&profile.resume_url)
        .bind(&profile.github_url)
        .bind(&profile.linkedin_url)
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        tx.commit().await.map_err(StoreError::from_sqlx)?;
        Ok(saved)
    }
}

#[async_trait]
impl PublicStore for PgStore {
    async fn published_posts(&self) -> Result<Vec<BlogPost>, StoreError> {
        let mut posts: Vec<BlogPost> = sqlx::query_as(
            "SELECT * FROM blogs WHERE status = 'published' ORDER BY created_date DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        let ids: Vec<String> = posts.iter().map(|p| p.id.clone()).collect();
        let mut comments = self.comments_for(&ids).await?;
        for post in &mut posts {
            post.comments = comments.remove(&post.id).unwrap_or_default();
        }
        Ok(posts)
    }

    async fn published_post(&self, id_or_slug: &str) -> Result<Option<BlogPost>, StoreError> {
        let post: Option<BlogPost> = sqlx::query_as(
            "SELECT * FROM blogs WHERE status = 'published' AND (id = $1 OR slug = $1)",
        )
        .bind(id_or_slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        let Some(mut post) = post else {
            return Ok(None);
        };
        let mut comments = self.comments_for(std::slice::from_ref(&post.id)).await?;
        post.comments = comments.remove(&post.id).unwrap_or_default();
        Ok(Some(post))
    }

    async fn projects(&self) -> Result<Vec<Project>, StoreError> {
        sqlx::query_as("SELECT * FROM portfolio_projects ORDER BY created_date DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn experiences(&self) -> Result<Vec<Experience>, StoreError> {
        let rows: Vec<Experience> =
            sqlx::query_as("SELECT * FROM portfolio_experiences ORDER BY start_date DESC")
                .fetch_all(&self.pool)
                .await
                .map_err(StoreError::from_sqlx)?;
        Ok(rows.into_iter().map(Experience::normalized).collect())
    }

    async fn adjust_likes(&self, id: &str, delta: i64) -> Result<Option<i64>, StoreError> {
        sqlx::query_scalar(
            "UPDATE blogs SET likes = GREATEST(likes + $2, 0) WHERE id = $1 RETURNING likes",
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn add_comment(
        &self,
        post_id: &str,
        author: &str,
        message: &str,
    ) -> Result<Option<Comment>, StoreError> {
        sqlx::query_as(
            r#"
            INSERT INTO blog_comments (id, blog_id, author, message)
            SELECT $1, id, $3, $4 FROM blogs WHERE id = $2 AND status = 'published'
            RETURNING id, author, message, created_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(post_id)
        .bind(author)
        .bind(message)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn ping(&self) -> Result<Duration, StoreError> {
        super::health_check(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)
    }
}

#[async_trait]
impl AuditSink for PgStore {
    async fn append(&self, entry: AuditEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO admin_audit_logs
                (user_id, action, resource_type, resource_id, ip_address, user_agent, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&entry.actor_id)
        .bind(entry.action.as_str())
        .bind(entry.resource_type.as_str())
        .bind(&entry.resource_id)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(&entry.metadata)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;
        Ok(())
    }
}
