/**
 * Admin Routes
 * Authenticated create / update / delete for managed content
 */
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::audit::RequestOrigin;
use crate::db::models::Profile;
use crate::error::ApiError;
use crate::resource::{ProfileController, Resource, ResourceController};
use crate::routes::{json_body, SuccessResponse};
use crate::session::AdminSession;

/// POST /api/admin/{kind}
pub async fn create<R: Resource>(
    State(controller): State<ResourceController<R>>,
    session: AdminSession,
    origin: RequestOrigin,
    body: Bytes,
) -> Result<(StatusCode, Json<R>), ApiError> {
    let body = json_body(&body)?;
    let record = controller.create(&session, &origin, &body).await?;
    tracing::info!(kind = %R::KIND, id = %record.id(), actor = %session.user_id, "record created");
    Ok((StatusCode::CREATED, Json(record)))
}

/// PUT /api/admin/{kind}/{id}
pub async fn update<R: Resource>(
    State(controller): State<ResourceController<R>>,
    session: AdminSession,
    origin: RequestOrigin,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<R>, ApiError> {
    let body = json_body(&body)?;
    let record = controller.update(&session, &origin, &id, &body).await?;
    tracing::info!(kind = %R::KIND, id = %id, actor = %session.user_id, "record updated");
    Ok(Json(record))
}

/// DELETE /api/admin/{kind}/{id}
pub async fn delete<R: Resource>(
    State(controller): State<ResourceController<R>>,
    session: AdminSession,
    origin: RequestOrigin,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    controller.delete(&session, &origin, &id).await?;
    tracing::info!(kind = %R::KIND, id = %id, actor = %session.user_id, "record deleted");
    Ok(Json(SuccessResponse { success: true }))
}

/// PATCH|PUT /api/admin/profile
pub async fn save_profile(
    State(controller): State<ProfileController>,
    session: AdminSession,
    origin: RequestOrigin,
    body: Bytes,
) -> Result<Json<Profile>, ApiError> {
    let body = json_body(&body)?;
    let profile = controller.save(&session, &origin, &body).await?;
    Ok(Json(profile))
}
