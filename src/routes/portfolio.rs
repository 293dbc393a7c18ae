/**
 * Portfolio Routes
 * Public projects, experiences and profile
 */
use axum::{extract::State, Json};

use crate::db::models::{Experience, Profile, Project};
use crate::public::PublicContent;

/// GET /api/portfolio/projects
pub async fn list_projects(State(content): State<PublicContent>) -> Json<Vec<Project>> {
    Json(content.projects().await)
}

/// GET /api/portfolio/experiences
pub async fn list_experiences(State(content): State<PublicContent>) -> Json<Vec<Experience>> {
    Json(content.experiences().await)
}

/// GET /api/portfolio/user
pub async fn get_profile(State(content): State<PublicContent>) -> Json<Profile> {
    Json(content.profile().await)
}
