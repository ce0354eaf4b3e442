use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use courier_types::domain::rider::{Rider, RiderQuery, RiderStatus};
use courier_types::ports::store::CourierStore;
use serde::Deserialize;

use super::{parse_id, parse_opt};
use crate::errors::AppError;
use crate::inbound::http::{AppState, Principal};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub name: String,
    pub rider_district: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRidersQuery {
    pub status: Option<String>,
    pub work_status: Option<String>,
    pub district: Option<String>,
}

#[derive(Deserialize)]
pub struct ReviewRequest {
    pub status: RiderStatus,
}

pub async fn apply<S: CourierStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<ApplyRequest>,
) -> Result<(StatusCode, Json<Rider>), AppError> {
    let rider = state
        .riders
        .apply(body.name, principal.email, body.rider_district)
        .await?;
    Ok((StatusCode::CREATED, Json(rider)))
}

pub async fn list_riders<S: CourierStore>(
    State(state): State<Arc<AppState<S>>>,
    Query(q): Query<ListRidersQuery>,
) -> Result<Json<Vec<Rider>>, AppError> {
    let query = RiderQuery {
        status: parse_opt(q.status)?,
        work_status: parse_opt(q.work_status)?,
        district: q.district.filter(|d| !d.is_empty()),
    };
    Ok(Json(state.riders.list_riders(query).await?))
}

pub async fn review<S: CourierStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(body): Json<ReviewRequest>,
) -> Result<Json<Rider>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(state.riders.review(id, body.status).await?))
}
