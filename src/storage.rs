/**
 * File Storage
 * Upload targets (hosted object storage or local disk) and the admin upload service
 */
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use once_cell::sync::Lazy;
use rand::distr::{Alphanumeric, SampleString};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::audit::{AuditLogger, RequestOrigin};
use crate::classify::ErrorClassifier;
use crate::config::StorageConfig;
use crate::db::models::{AuditAction, ResourceKind};
use crate::error::ApiError;
use crate::session::AdminSession;

pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
pub const DEFAULT_DIRECTORY: &str = "misc";

/// Accepted upload types. SVG is excluded because it can carry script.
pub const ALLOWED_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
    "video/mp4",
    "video/webm",
];

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("file already exists: {0}")]
    AlreadyExists(String),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("storage rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: String,
    pub url: String,
}

/// Somewhere uploaded files live. `put` must never overwrite.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn put(&self, path: &str, content_type: &str, bytes: Bytes) -> Result<StoredFile, FileStoreError>;

    async fn remove(&self, path: &str) -> Result<(), FileStoreError>;

    /// Local directory to serve under `/uploads`, if any.
    fn local_root(&self) -> Option<&Path> {
        None
    }
}

/// Supabase Storage REST API.
pub struct SupabaseStorage {
    config: StorageConfig,
}

impl SupabaseStorage {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.config.url, self.config.bucket, path
        )
    }

    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.config.url, self.config.bucket, path
        )
    }

    async fn rejected(response: reqwest::Response) -> FileStoreError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        FileStoreError::Rejected { status, message }
    }
}

#[async_trait]
impl FileStore for SupabaseStorage {
    async fn put(&self, path: &str, content_type: &str, bytes: Bytes) -> Result<StoredFile, FileStoreError> {
        let response = HTTP_CLIENT
            .post(self.object_url(path))
            .bearer_auth(&self.config.service_role_key)
            .header("apikey", &self.config.service_role_key)
            .header("content-type", content_type)
            .header("cache-control", "max-age=3600")
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::CONFLICT {
            return Err(FileStoreError::AlreadyExists(path.to_string()));
        }
        if !status.is_success() {
            return Err(Self::rejected(response).await);
        }

        Ok(StoredFile {
            path: path.to_string(),
            url: self.public_url(path),
        })
    }

    async fn remove(&self, path: &str) -> Result<(), FileStoreError> {
        let response = HTTP_CLIENT
            .delete(format!(
                "{}/storage/v1/object/{}",
                self.config.url, self.config.bucket
            ))
            .bearer_auth(&self.config.service_role_key)
            .header("apikey", &self.config.service_role_key)
            .json(&json!({ "prefixes": [path] }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }
        Ok(())
    }
}

/// Files on the local filesystem, served by the app under `/uploads`.
pub struct LocalDiskStorage {
    root: PathBuf,
}

impl LocalDiskStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl FileStore for LocalDiskStorage {
    async fn put(&self, path: &str, _content_type: &str, bytes: Bytes) -> Result<StoredFile, FileStoreError> {
        let target = self.root.join(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(FileStoreError::AlreadyExists(path.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(&bytes).await?;
        file.flush().await?;

        Ok(StoredFile {
            path: path.to_string(),
            url: format!("/uploads/{path}"),
        })
    }

    async fn remove(&self, path: &str) -> Result<(), FileStoreError> {
        match tokio::fs::remove_file(self.root.join(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FileStoreError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn local_root(&self) -> Option<&Path> {
        Some(&self.root)
    }
}

/// Storage-safe name: sanitized stem, millisecond timestamp, random suffix.
pub fn generate_unique_file_name(original: &str, content_type: &str) -> String {
    let (stem, ext) = match original.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, ext.to_lowercase()),
        _ => (original, extension_for(content_type).to_string()),
    };

    let mut sanitized: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    if sanitized.is_empty() {
        sanitized.push_str("file");
    }

    let ext: String = ext.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    let ext = if ext.is_empty() {
        extension_for(content_type).to_string()
    } else {
        ext
    };

    let timestamp = chrono::Utc::now().timestamp_millis();
    let random = Alphanumeric
        .sample_string(&mut rand::rng(), 7)
        .to_lowercase();

    format!("{sanitized}-{timestamp}-{random}.{ext}")
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "application/pdf" => "pdf",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        _ => "bin",
    }
}

/// Whether the leading bytes match the declared type.
pub fn content_matches(content_type: &str, bytes: &[u8]) -> bool {
    match content_type {
        "image/jpeg" | "image/jpg" => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
        "image/png" => bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]),
        "image/gif" => bytes.starts_with(b"GIF8"),
        "image/webp" => bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP",
        "application/pdf" => bytes.starts_with(b"%PDF"),
        "video/mp4" => bytes.len() >= 8 && &bytes[4..8] == b"ftyp",
        "video/webm" => bytes.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]),
        _ => false,
    }
}

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Relative, traversal-free storage path.
pub fn valid_storage_path(path: &str) -> bool {
    !path.starts_with('/') && path.split('/').all(valid_segment)
}

/// A file received from the admin upload form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub directory: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub url: String,
    pub path: String,
    pub file_name: String,
}

#[derive(Clone)]
pub struct UploadService {
    store: Arc<dyn FileStore>,
    audit: AuditLogger,
    errors: ErrorClassifier,
}

impl UploadService {
    pub fn new(store: Arc<dyn FileStore>, audit: AuditLogger, errors: ErrorClassifier) -> Self {
        Self { store, audit, errors }
    }

    pub fn local_root(&self) -> Option<PathBuf> {
        self.store.local_root().map(Path::to_path_buf)
    }

    pub async fn upload(
        &self,
        session: &AdminSession,
        origin: &RequestOrigin,
        upload: Upload,
    ) -> Result<UploadResponse, ApiError> {
        if upload.bytes.is_empty() {
            return Err(ApiError::BadRequest("No file provided".to_string()));
        }
        if upload.bytes.len() > MAX_UPLOAD_BYTES {
            return Err(ApiError::BadRequest("File size exceeds 50MB limit".to_string()));
        }
        if !ALLOWED_TYPES.contains(&upload.content_type.as_str()) {
            return Err(ApiError::BadRequest(format!(
                "File type {} not allowed",
                upload.content_type
            )));
        }
        if !content_matches(&upload.content_type, &upload.bytes) {
            return Err(ApiError::BadRequest(
                "File content does not match its declared type".to_string(),
            ));
        }

        let directory = upload
            .directory
            .as_deref()
            .map(|d| d.trim().trim_matches('/'))
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_DIRECTORY);
        if !valid_storage_path(directory) {
            return Err(ApiError::BadRequest("Invalid directory".to_string()));
        }

        let file_name = generate_unique_file_name(&upload.file_name, &upload.content_type);
        let path = format!("{directory}/{file_name}");
        let size = upload.bytes.len();

        let stored = self
            .store
            .put(&path, &upload.content_type, upload.bytes)
            .await
            .map_err(|e| match e {
                FileStoreError::AlreadyExists(_) => {
                    ApiError::Conflict("A file with this name already exists".to_string())
                }
                other => ApiError::Storage(self.errors.safe_error(
                    "upload.put",
                    &other,
                    json!({ "actor": session.user_id, "path": path }),
                )),
            })?;

        tracing::info!(path = %stored.path, size, "file uploaded");

        self.audit
            .record(
                session,
                AuditAction::Upload,
                ResourceKind::File,
                Some(&stored.path),
                origin,
                Some(json!({
                    "fileName": file_name,
                    "size": size,
                    "contentType": upload.content_type,
                })),
            )
            .await;

        Ok(UploadResponse {
            success: true,
            url: stored.url,
            path: stored.path,
            file_name,
        })
    }

    pub async fn delete(
        &self,
        session: &AdminSession,
        origin: &RequestOrigin,
        path: Option<&str>,
    ) -> Result<(), ApiError> {
        let path = path
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ApiError::BadRequest("No file path provided".to_string()))?;
        if !valid_storage_path(path) {
            return Err(ApiError::BadRequest("Invalid file path".to_string()));
        }

        self.store.remove(path).await.map_err(|e| match e {
            FileStoreError::NotFound(_) => ApiError::NotFound("File not found".to_string()),
            other => ApiError::Storage(self.errors.safe_error(
                "upload.remove",
                &other,
                json!({ "actor": session.user_id, "path": path }),
            )),
        })?;

        tracing::info!(path = %path, "file deleted");

        self.audit
            .record(
                session,
                AuditAction::Delete,
                ResourceKind::File,
                Some(path),
                origin,
                None,
            )
            .await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_unique_file_name_shape() {
        let name = generate_unique_file_name("My Photo (1).PNG", "image/png");
        let (stem, ext) = name.rsplit_once('.').unwrap();
        assert_eq!(ext, "png");
        assert!(stem.starts_with("my-photo--1--"));
        let random = stem.rsplit('-').next().unwrap();
        assert_eq!(random.len(), 7);
        assert!(name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.'));
    }

    #[test]
    fn test_unique_file_names_differ() {
        let a = generate_unique_file_name("cv.pdf", "application/pdf");
        let b = generate_unique_file_name("cv.pdf", "application/pdf");
        assert_ne!(a, b);
    }

    #[test]
    fn test_name_without_extension_uses_type() {
        let name = generate_unique_file_name("clip", "video/webm");
        assert!(name.ends_with(".webm"));
    }

    #[test]
    fn test_magic_bytes() {
        assert!(content_matches("image/png", PNG));
        assert!(!content_matches("image/jpeg", PNG));
        assert!(content_matches("application/pdf", b"%PDF-1.7"));
        assert!(content_matches("video/mp4", b"\x00\x00\x00\x18ftypmp42"));
        assert!(content_matches("image/webp", b"RIFF\x00\x00\x00\x00WEBPVP8 "));
        assert!(!content_matches("image/svg+xml", b"<svg></svg>"));
    }

    #[test]
    fn test_storage_path_validation() {
        assert!(valid_storage_path("blog/cover-1.png"));
        assert!(!valid_storage_path("../etc/passwd"));
        assert!(!valid_storage_path("/abs/path.png"));
        assert!(!valid_storage_path("a//b.png"));
        assert!(!valid_storage_path("a\\b.png"));
    }

    #[tokio::test]
    async fn test_local_disk_never_overwrites() {
        let root = crate::testing::scratch_dir();
        let store = LocalDiskStorage::new(root.path());

        let stored = store
            .put("misc/a.png", "image/png", Bytes::from_static(PNG))
            .await
            .unwrap();
        assert_eq!(stored.url, "/uploads/misc/a.png");

        let again = store
            .put("misc/a.png", "image/png", Bytes::from_static(b"other"))
            .await;
        assert!(matches!(again, Err(FileStoreError::AlreadyExists(_))));
        assert_eq!(tokio::fs::read(root.join("misc/a.png")).await.unwrap(), PNG);

        store.remove("misc/a.png").await.unwrap();
        assert!(matches!(
            store.remove("misc/a.png").await,
            Err(FileStoreError::NotFound(_))
        ));

    }
}
