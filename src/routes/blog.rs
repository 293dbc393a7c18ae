/**
 * Blog Routes
 * Public blog reads, likes and comments
 */
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::db::models::{BlogPost, Comment};
use crate::error::ApiError;
use crate::public::{LikeResponse, PublicContent};
use crate::routes::json_body;

/// Request body for POST /api/blogs/{id}/like
#[derive(Debug, Deserialize)]
pub struct LikeRequest {
    #[serde(default)]
    pub unlike: bool,
}

/// GET /api/blogs
pub async fn list_posts(State(content): State<PublicContent>) -> Json<Vec<BlogPost>> {
    Json(content.posts().await)
}

/// GET /api/blogs/{id-or-slug}
pub async fn get_post(
    State(content): State<PublicContent>,
    Path(id): Path<String>,
) -> Result<Json<BlogPost>, ApiError> {
    content
        .post(&id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Blog post not found".to_string()))
}

/// POST /api/blogs/{id}/like
pub async fn like_post(
    State(content): State<PublicContent>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<LikeResponse>, ApiError> {
    let request: LikeRequest = serde_json::from_value(json_body(&body)?).map_err(|e| {
        tracing::debug!(id = %id, error = %e, "rejected like body");
        ApiError::BadRequest("Invalid like request".to_string())
    })?;
    let response = content.toggle_like(&id, request.unlike).await?;
    tracing::debug!(id = %id, unlike = request.unlike, likes = response.likes, "like toggled");
    Ok(Json(response))
}

/// POST /api/blogs/{id}/comment
pub async fn comment_on_post(
    State(content): State<PublicContent>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let body = json_body(&body)?;
    let comment = content.post_comment(&id, &body).await?;
    tracing::info!(id = %id, comment_id = %comment.id, "comment added");
    Ok((StatusCode::CREATED, Json(comment)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::{Method, StatusCode};
    use chrono::Utc;
    use serde_json::json;

    use crate::config::Environment;
    use crate::db::memory::MemoryStore;
    use crate::db::models::{BlogPost, BlogStatus};
    use crate::public::{FALLBACK_LIKES_WARNING, MISSING_POST_WARNING};
    use crate::testing::{app_with, json_request, offline_app, send, state_with};

    fn post(id: &str, slug: &str, status: BlogStatus, likes: i64) -> BlogPost {
        BlogPost {
            id: id.to_string(),
            title: format!("Post {id}"),
            slug: slug.to_string(),
            content: Some("Body".to_string()),
            excerpt: None,
            cover_image_url: None,
            tags: vec!["rust".to_string()],
            status,
            featured: false,
            likes,
            created_date: Utc::now(),
            comments: Vec::new(),
        }
    }

    fn seeded() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::default());
        store.seed_blog(post("live-1", "live-post", BlogStatus::Published, 1));
        store.seed_blog(post("draft-1", "draft-post", BlogStatus::Draft, 0));
        store
    }

    #[tokio::test]
    async fn test_list_only_published() {
        let (status, body) = send(
            app_with(&seeded()),
            json_request(Method::GET, "/api/blogs", None, None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let posts = body.as_array().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0]["slug"], "live-post");
    }

    #[tokio::test]
    async fn test_get_by_slug_and_missing() {
        let app = app_with(&seeded());
        let (status, body) = send(app.clone(), json_request(Method::GET, "/api/blogs/live-post", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "live-1");

        let (status, body) = send(app, json_request(Method::GET, "/api/blogs/draft-post", None, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Blog post not found");
    }

    #[tokio::test]
    async fn test_reads_fall_back_when_store_fails() {
        let store = seeded();
        store.fail_reads();
        let app = app_with(&store);

        let (status, body) = send(app.clone(), json_request(Method::GET, "/api/blogs", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (status, body) = send(
            app,
            json_request(Method::GET, "/api/blogs/notes-on-gradient-boosting", None, None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "2");
    }

    #[tokio::test]
    async fn test_reads_without_database_use_fallback() {
        let (status, body) = send(offline_app(), json_request(Method::GET, "/api/blogs", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body
            .as_array()
            .unwrap()
            .iter()
            .all(|p| p["status"] == "published"));
    }

    #[tokio::test]
    async fn test_unlike_at_zero_stays_zero() {
        let store = Arc::new(MemoryStore::default());
        store.seed_blog(post("p", "p", BlogStatus::Published, 0));
        for _ in 0..3 {
            let (status, body) = send(
                app_with(&store),
                json_request(Method::POST, "/api/blogs/p/like", None, Some(json!({ "unlike": true }))),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({ "likes": 0 }));
        }
        assert_eq!(store.likes_of("p"), Some(0));
    }

    #[tokio::test]
    async fn test_like_increments_with_empty_body() {
        let store = seeded();
        let request = axum::http::Request::post("/api/blogs/live-1/like")
            .body(axum::body::Body::empty())
            .unwrap();
        let (status, body) = send(app_with(&store), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["likes"], 2);
        assert!(body.get("warning").is_none());
    }

    #[tokio::test]
    async fn test_malformed_like_body_is_rejected_without_counting() {
        let store = seeded();
        let (status, body) = send(
            app_with(&store),
            json_request(Method::POST, "/api/blogs/live-1/like", None, Some(json!({ "unlike": "yes" }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Invalid like request" }));
        assert_eq!(store.likes_of("live-1"), Some(1));
    }

    #[tokio::test]
    async fn test_like_on_fallback_only_post_returns_fallback_count() {
        let (status, body) = send(
            app_with(&seeded()),
            json_request(Method::POST, "/api/blogs/1/like", None, Some(json!({}))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["likes"], 12);
        assert_eq!(body["warning"], MISSING_POST_WARNING);
    }

    #[tokio::test]
    async fn test_like_unknown_everywhere_is_not_found() {
        let (status, body) = send(
            app_with(&seeded()),
            json_request(Method::POST, "/api/blogs/nope/like", None, None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Blog not found");
    }

    #[tokio::test]
    async fn test_like_without_database_is_read_only() {
        let (status, body) = send(
            offline_app(),
            json_request(Method::POST, "/api/blogs/2/like", None, None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["likes"], 4);
        assert_eq!(body["warning"], FALLBACK_LIKES_WARNING);
    }

    #[tokio::test]
    async fn test_like_store_failure_is_generic_in_production() {
        let store = seeded();
        store.fail_writes("deadlock detected on relation blogs");
        let app = crate::create_app(state_with(Environment::Production, Some(&store), None));
        let (status, body) = send(app, json_request(Method::POST, "/api/blogs/live-1/like", None, None)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], crate::classify::DATABASE_ERROR);
    }

    #[tokio::test]
    async fn test_comment_created() {
        let store = seeded();
        let (status, body) = send(
            app_with(&store),
            json_request(
                Method::POST,
                "/api/blogs/live-1/comment",
                None,
                Some(json!({ "author": "Jo", "message": "Great read!" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["author"], "Jo");
        assert_eq!(body["message"], "Great read!");
        assert!(body["id"].is_string());
        assert!(body["date"].is_string());
    }

    #[tokio::test]
    async fn test_short_comment_rejected_naming_message() {
        for env in [Environment::Development, Environment::Production] {
            let app = crate::create_app(state_with(env, Some(&seeded()), None));
            let (status, body) = send(
                app,
                json_request(
                    Method::POST,
                    "/api/blogs/live-1/comment",
                    None,
                    Some(json!({ "author": "Jo", "message": "hi" })),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body["error"].as_str().unwrap().contains("message"));
        }
    }

    #[tokio::test]
    async fn test_comment_on_missing_or_draft_post_is_not_found() {
        let app = app_with(&seeded());
        for id in ["nope", "draft-1"] {
            let (status, body) = send(
                app.clone(),
                json_request(
                    Method::POST,
                    &format!("/api/blogs/{id}/comment"),
                    None,
                    Some(json!({ "author": "Jo", "message": "Great read!" })),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["error"], "Blog not found");
        }
    }

    #[tokio::test]
    async fn test_comment_without_database_is_unavailable() {
        let (status, _) = send(
            offline_app(),
            json_request(
                Method::POST,
                "/api/blogs/1/comment",
                None,
                Some(json!({ "author": "Jo", "message": "Great read!" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
