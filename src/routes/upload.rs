use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::audit::RequestOrigin;
use crate::error::ApiError;
use crate::session::AdminSession;
use crate::storage::{Upload, UploadResponse, UploadService};

#[derive(Debug, Deserialize)]
pub struct DeleteFileQuery {
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteFileResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/admin/upload (multipart `file`, optional `directory`)
pub async fn upload_file(
    State(uploads): State<UploadService>,
    session: AdminSession,
    origin: RequestOrigin,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let mut file = None;
    let mut directory = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Multipart error: {}", e);
        ApiError::BadRequest("Invalid multipart data".to_string())
    })? {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    tracing::error!("Failed to read upload bytes: {}", e);
                    ApiError::BadRequest("Failed to read file data".to_string())
                })?;
                file = Some((file_name, content_type, bytes));
            }
            Some("directory") => {
                directory = field.text().await.ok();
            }
            _ => {}
        }
    }

    let Some((file_name, content_type, bytes)) = file else {
        return Err(ApiError::BadRequest("No file provided".to_string()));
    };

    let response = uploads
        .upload(
            &session,
            &origin,
            Upload {
                file_name,
                content_type,
                directory,
                bytes,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// DELETE /api/admin/upload?path=...
pub async fn delete_file(
    State(uploads): State<UploadService>,
    session: AdminSession,
    origin: RequestOrigin,
    Query(query): Query<DeleteFileQuery>,
) -> Result<Json<DeleteFileResponse>, ApiError> {
    uploads
        .delete(&session, &origin, query.path.as_deref())
        .await?;
    Ok(Json(DeleteFileResponse {
        success: true,
        message: "File deleted successfully".to_string(),
    }))
}
