use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use courier_types::domain::user::{ApprovalStatus, Role, User};
use courier_types::ports::store::CourierStore;
use serde::{Deserialize, Serialize};

use super::parse_id;
use crate::errors::AppError;
use crate::inbound::http::{AppState, Principal};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

#[derive(Serialize)]
struct ExistingUser {
    message: &'static str,
    user: User,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersQuery {
    pub search_text: Option<String>,
    pub limit: Option<usize>,
    pub skip: Option<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRoleRequest {
    pub approval_status: ApprovalStatus,
}

#[derive(Serialize)]
pub struct RoleResponse {
    pub role: Role,
}

pub async fn login<S: CourierStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let display_name = body
        .display_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| principal.email.clone());
    let (user, created) = state
        .users
        .login(principal.email, display_name, body.photo_url)
        .await?;
    if created {
        return Ok((StatusCode::CREATED, Json(user)).into_response());
    }
    Ok(Json(ExistingUser {
        message: "existing user logging in.",
        user,
    })
    .into_response())
}

pub async fn list_users<S: CourierStore>(
    State(state): State<Arc<AppState<S>>>,
    Query(q): Query<ListUsersQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    let users = state.users.list_users(q.search_text, q.limit, q.skip).await?;
    Ok(Json(users))
}

pub async fn review_role<S: CourierStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(body): Json<ReviewRoleRequest>,
) -> Result<Json<User>, AppError> {
    let id = parse_id(&id)?;
    let user = state.users.review_role(id, body.approval_status).await?;
    Ok(Json(user))
}

pub async fn role_of<S: CourierStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(email): Path<String>,
) -> Result<Json<RoleResponse>, AppError> {
    let role = state.users.role_of(&email).await?;
    Ok(Json(RoleResponse { role }))
}
