/**
 * Public Content
 * Reads for the public site, like counter and comments, with fallback data
 */
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};

use crate::classify::ErrorClassifier;
use crate::db::models::{BlogPost, Comment, Experience, Profile, Project};
use crate::db::{ProfileStore, PublicStore};
use crate::error::ApiError;
use crate::fallback::FallbackData;
use crate::validation::{Mode, Payload, Text};

pub const FALLBACK_LIKES_WARNING: &str =
    "Database not configured. Like counts are read-only in fallback mode.";
pub const MISSING_POST_WARNING: &str =
    "Post not found in the database. Like counts are read-only in fallback mode.";

pub const COMMENT_AUTHOR: Text = Text::between(2, 50);
pub const COMMENT_MESSAGE: Text = Text::between(5, 500);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LikeResponse {
    pub likes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Validated comment input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub author: String,
    pub message: String,
}

impl NewComment {
    pub fn parse(body: &Value) -> Result<Self, crate::validation::ValidationErrors> {
        let mut p = Payload::parse(body, Mode::Create)?;
        let author = p.required_text("author", COMMENT_AUTHOR);
        let message = p.required_text("message", COMMENT_MESSAGE);
        p.finish()?;
        Ok(Self {
            author: crate::resource::present(author, "author")?,
            message: crate::resource::present(message, "message")?,
        })
    }
}

#[derive(Clone)]
pub struct PublicContent {
    store: Option<Arc<dyn PublicStore>>,
    profile: Option<Arc<dyn ProfileStore>>,
    fallback: Arc<FallbackData>,
    errors: ErrorClassifier,
}

impl PublicContent {
    pub fn new(
        store: Option<Arc<dyn PublicStore>>,
        profile: Option<Arc<dyn ProfileStore>>,
        fallback: Arc<FallbackData>,
        errors: ErrorClassifier,
    ) -> Self {
        Self {
            store,
            profile,
            fallback,
            errors,
        }
    }

    pub fn store(&self) -> Option<&Arc<dyn PublicStore>> {
        self.store.as_ref()
    }

    pub async fn posts(&self) -> Vec<BlogPost> {
        let Some(store) = &self.store else {
            return self.fallback.published_posts();
        };
        match store.published_posts().await {
            Ok(posts) => posts,
            Err(e) => {
                tracing::warn!(error = %e, "blog list unavailable, serving fallback data");
                self.fallback.published_posts()
            }
        }
    }

    pub async fn post(&self, id_or_slug: &str) -> Option<BlogPost> {
        if let Some(store) = &self.store {
            match store.published_post(id_or_slug).await {
                Ok(Some(post)) => return Some(post),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(id = %id_or_slug, error = %e, "blog post unavailable, trying fallback data");
                }
            }
        }
        self.fallback.find_post(id_or_slug)
    }

    pub async fn projects(&self) -> Vec<Project> {
        let Some(store) = &self.store else {
            return self.fallback.projects();
        };
        store.projects().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "projects unavailable, serving fallback data");
            self.fallback.projects()
        })
    }

    pub async fn experiences(&self) -> Vec<Experience> {
        let Some(store) = &self.store else {
            return self.fallback.experiences();
        };
        store.experiences().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "experiences unavailable, serving fallback data");
            self.fallback.experiences()
        })
    }

    pub async fn profile(&self) -> Profile {
        let Some(store) = &self.profile else {
            return self.fallback.profile();
        };
        match store.get().await {
            Ok(Some(profile)) => profile,
            Ok(None) => self.fallback.profile(),
            Err(e) => {
                tracing::warn!(error = %e, "profile unavailable, serving fallback data");
                self.fallback.profile()
            }
        }
    }

    /// Like or unlike a post. The live count never goes below zero.
    pub async fn toggle_like(&self, id: &str, unlike: bool) -> Result<LikeResponse, ApiError> {
        let Some(store) = &self.store else {
            return Ok(LikeResponse {
                likes: self.fallback.likes_for(id).unwrap_or(0),
                warning: Some(FALLBACK_LIKES_WARNING.to_string()),
            });
        };

        let delta = if unlike { -1 } else { 1 };
        match store.adjust_likes(id, delta).await {
            Ok(Some(likes)) => Ok(LikeResponse {
                likes,
                warning: None,
            }),
            Ok(None) => match self.fallback.likes_for(id) {
                Some(likes) => Ok(LikeResponse {
                    likes,
                    warning: Some(MISSING_POST_WARNING.to_string()),
                }),
                None => Err(ApiError::NotFound("Blog not found".to_string())),
            },
            Err(e) => Err(ApiError::Storage(self.errors.safe_database_error(
                "blogs.like",
                &e,
                json!({ "id": id, "unlike": unlike }),
            ))),
        }
    }

    pub async fn post_comment(&self, id: &str, body: &Value) -> Result<Comment, ApiError> {
        let Some(store) = &self.store else {
            return Err(ApiError::Unavailable(
                "Comments are not available. Database is not configured.".to_string(),
            ));
        };

        let input = NewComment::parse(body).map_err(|errors| {
            self.errors
                .validation_failure("blogs.comment", errors, json!({ "id": id }))
        })?;

        match store.add_comment(id, &input.author, &input.message).await {
            Ok(Some(comment)) => Ok(comment),
            Ok(None) => {
                tracing::warn!(id = %id, "comment on missing or unpublished post");
                Err(ApiError::NotFound("Blog not found".to_string()))
            }
            Err(e) => Err(ApiError::Storage(self.errors.safe_database_error(
                "blogs.comment",
                &e,
                json!({ "id": id, "author": input.author }),
            ))),
        }
    }
}
