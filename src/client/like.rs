use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::ClientError;

/// Where a like toggle stands relative to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikePhase {
    Idle,
    /// Local state flipped, request pending. Holds what to restore on failure.
    Optimistic { liked: bool, count: i64 },
    Confirmed,
    RolledBack,
}

/// Local liked flag and counter for one post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeToggle {
    post_id: String,
    liked: bool,
    count: i64,
    phase: LikePhase,
}

impl LikeToggle {
    pub fn new(post_id: impl Into<String>, liked: bool, count: i64) -> Self {
        Self {
            post_id: post_id.into(),
            liked,
            count: count.max(0),
            phase: LikePhase::Idle,
        }
    }

    pub fn post_id(&self) -> &str {
        &self.post_id
    }

    pub fn liked(&self) -> bool {
        self.liked
    }

    pub fn count(&self) -> i64 {
        self.count
    }

    pub fn phase(&self) -> LikePhase {
        self.phase
    }

    /// Flip the flag and counter ahead of the request. Returns whether the
    /// request is an unlike.
    pub fn begin(&mut self) -> Result<bool, ClientError> {
        if matches!(self.phase, LikePhase::Optimistic { .. }) {
            return Err(ClientError::InFlight);
        }
        let unlike = self.liked;
        self.phase = LikePhase::Optimistic {
            liked: self.liked,
            count: self.count,
        };
        self.liked = !unlike;
        self.count = if unlike { (self.count - 1).max(0) } else { self.count + 1 };
        Ok(unlike)
    }

    /// Adopt the server's count.
    pub fn confirm(&mut self, likes: i64) {
        if matches!(self.phase, LikePhase::Optimistic { .. }) {
            self.count = likes.max(0);
            self.phase = LikePhase::Confirmed;
        }
    }

    /// Restore the state from before [`LikeToggle::begin`].
    pub fn roll_back(&mut self) {
        if let LikePhase::Optimistic { liked, count } = self.phase {
            self.liked = liked;
            self.count = count;
            self.phase = LikePhase::RolledBack;
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LikedPostsFile {
    #[serde(rename = "likedPosts", default)]
    liked_posts: BTreeMap<String, bool>,
}

/// Per-post liked flags persisted to a JSON file.
#[derive(Debug)]
pub struct LikedPosts {
    path: PathBuf,
    data: LikedPostsFile,
}

impl LikedPosts {
    /// Load from `path`. A missing or unparsable file is an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ClientError> {
        let path = path.into();
        let data = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "unreadable liked posts, starting empty");
                LikedPostsFile::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LikedPostsFile::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_liked(&self, post_id: &str) -> bool {
        self.data.liked_posts.get(post_id).copied().unwrap_or(false)
    }

    pub fn set(&mut self, post_id: &str, liked: bool) -> Result<(), ClientError> {
        self.data.liked_posts.insert(post_id.to_string(), liked);
        self.save()
    }

    fn save(&self) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(&self.data)?)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LikeOutcome {
    pub likes: i64,
    #[serde(default)]
    pub warning: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PostCounts {
    id: String,
    likes: i64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct LikeClient {
    http: reqwest::Client,
    base_url: String,
}

impl LikeClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build a toggle for a post from its current server state and the
    /// locally remembered liked flag.
    pub async fn load(&self, id_or_slug: &str, liked: &LikedPosts) -> Result<LikeToggle, ClientError> {
        let response = self
            .http
            .get(format!("{}/api/blogs/{}", self.base_url, id_or_slug))
            .send()
            .await?;
        let post: PostCounts = Self::decode(response).await?;
        Ok(LikeToggle::new(
            post.id.clone(),
            liked.is_liked(&post.id),
            post.likes,
        ))
    }

    /// Flip locally, send, then confirm or roll back. The liked file follows
    /// the local flag at every step.
    pub async fn toggle(
        &self,
        toggle: &mut LikeToggle,
        liked: &mut LikedPosts,
    ) -> Result<LikeOutcome, ClientError> {
        let unlike = toggle.begin()?;

        let sent = match liked.set(toggle.post_id(), toggle.liked()) {
            Ok(()) => self.send(toggle.post_id(), unlike).await,
            Err(e) => Err(e),
        };

        match sent {
            Ok(outcome) => {
                toggle.confirm(outcome.likes);
                if let Some(warning) = &outcome.warning {
                    tracing::warn!(post = %toggle.post_id(), %warning, "like not persisted");
                }
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!(post = %toggle.post_id(), error = %e, "like failed, rolling back");
                toggle.roll_back();
                if let Err(save) = liked.set(toggle.post_id(), toggle.liked()) {
                    tracing::warn!(path = %liked.path().display(), error = %save, "could not restore liked flag");
                }
                Err(e)
            }
        }
    }

    async fn send(&self, post_id: &str, unlike: bool) -> Result<LikeOutcome, ClientError> {
        let response = self
            .http
            .post(format!("{}/api/blogs/{}/like", self.base_url, post_id))
            .json(&json!({ "unlike": unlike }))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.canonical_reason().unwrap_or("error").to_string(),
        };
        Err(ClientError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::db::memory::MemoryStore;
    use crate::testing::{app_with, offline_app, scratch_dir};

    async fn serve(app: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_begin_flips_and_confirm_adopts_server_count() {
        let mut toggle = LikeToggle::new("p", false, 4);
        assert_eq!(toggle.begin().unwrap(), false);
        assert!(toggle.liked());
        assert_eq!(toggle.count(), 5);
        assert!(matches!(toggle.begin(), Err(ClientError::InFlight)));

        toggle.confirm(9);
        assert_eq!(toggle.phase(), LikePhase::Confirmed);
        assert_eq!(toggle.count(), 9);
        assert!(toggle.liked());
    }

    #[test]
    fn test_roll_back_restores_previous_state() {
        let mut toggle = LikeToggle::new("p", true, 1);
        assert_eq!(toggle.begin().unwrap(), true);
        assert!(!toggle.liked());
        assert_eq!(toggle.count(), 0);

        toggle.roll_back();
        assert_eq!(toggle.phase(), LikePhase::RolledBack);
        assert!(toggle.liked());
        assert_eq!(toggle.count(), 1);
    }

    #[test]
    fn test_optimistic_unlike_never_negative() {
        let mut toggle = LikeToggle::new("p", true, 0);
        toggle.begin().unwrap();
        assert_eq!(toggle.count(), 0);
        toggle.confirm(-3);
        assert_eq!(toggle.count(), 0);
    }

    #[test]
    fn test_confirm_and_roll_back_ignored_when_idle() {
        let mut toggle = LikeToggle::new("p", false, 2);
        toggle.confirm(10);
        toggle.roll_back();
        assert_eq!(toggle.phase(), LikePhase::Idle);
        assert_eq!(toggle.count(), 2);
    }

    #[test]
    fn test_liked_posts_persist() {
        let dir = scratch_dir();
        let path = dir.join("liked.json");

        let mut liked = LikedPosts::load(&path).unwrap();
        assert!(!liked.is_liked("1"));
        liked.set("1", true).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["likedPosts"]["1"], true);
        assert!(LikedPosts::load(&path).unwrap().is_liked("1"));

    }

    #[test]
    fn test_corrupt_liked_posts_file_starts_empty() {
        let dir = scratch_dir();
        std::fs::create_dir_all(dir.path()).unwrap();
        let path = dir.join("liked.json");
        std::fs::write(&path, "{ not json").unwrap();

        let mut liked = LikedPosts::load(&path).unwrap();
        assert!(!liked.is_liked("1"));
        liked.set("1", true).unwrap();
        assert!(LikedPosts::load(&path).unwrap().is_liked("1"));
    }

    #[tokio::test]
    async fn test_unwritable_liked_file_rolls_back_before_sending() {
        let dir = scratch_dir();
        let path = dir.join("liked.json");
        let mut liked = LikedPosts::load(&path).unwrap();
        // A directory where the file should be makes every save fail.
        std::fs::create_dir_all(&path).unwrap();

        let client = LikeClient::new("http://127.0.0.1:9");
        let mut toggle = LikeToggle::new("1", false, 3);
        let err = client.toggle(&mut toggle, &mut liked).await.unwrap_err();
        assert!(matches!(err, ClientError::Io(_)));
        assert_eq!(toggle.phase(), LikePhase::RolledBack);
        assert!(!toggle.liked());
        assert_eq!(toggle.count(), 3);

        assert_eq!(toggle.begin().unwrap(), false);
    }

    #[tokio::test]
    async fn test_toggle_against_fallback_server() {
        let base = serve(offline_app()).await;
        let dir = scratch_dir();
        let mut liked = LikedPosts::load(dir.join("liked.json")).unwrap();
        let client = LikeClient::new(&base);

        let mut toggle = client.load("notes-on-gradient-boosting", &liked).await.unwrap();
        assert_eq!(toggle.post_id(), "2");
        assert_eq!(toggle.count(), 4);

        let outcome = client.toggle(&mut toggle, &mut liked).await.unwrap();
        assert_eq!(outcome.likes, 4);
        assert!(outcome.warning.is_some());
        assert_eq!(toggle.phase(), LikePhase::Confirmed);
        assert_eq!(toggle.count(), 4);
        assert!(liked.is_liked("2"));

    }

    #[tokio::test]
    async fn test_failed_request_rolls_back_local_state() {
        let base = serve(app_with(&Arc::new(MemoryStore::default()))).await;
        let dir = scratch_dir();
        let mut liked = LikedPosts::load(dir.join("liked.json")).unwrap();
        let client = LikeClient::new(&base);

        let mut toggle = LikeToggle::new("unknown-post", false, 3);
        let err = client.toggle(&mut toggle, &mut liked).await.unwrap_err();
        match err {
            ClientError::Status { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Blog not found");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(toggle.phase(), LikePhase::RolledBack);
        assert!(!toggle.liked());
        assert_eq!(toggle.count(), 3);
        assert!(!liked.is_liked("unknown-post"));

    }
}
