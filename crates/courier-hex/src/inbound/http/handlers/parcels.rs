use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use courier_types::domain::parcel::{DeliveryStatus, Parcel};
use courier_types::domain::tracking::TrackingEvent;
use courier_types::ports::store::CourierStore;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{caller, parse_id, parse_opt};
use crate::errors::AppError;
use crate::inbound::http::{AppState, Principal};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRiderRequest {
    pub parcel_id: String,
    pub rider_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParcelsQuery {
    pub email: Option<String>,
    pub delivery_status: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiderParcelsQuery {
    pub rider_email: Option<String>,
    pub delivery_status: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    #[serde(alias = "status")]
    pub delivery_status: DeliveryStatus,
}

fn take_string(body: &mut Map<String, Value>, key: &str) -> Option<String> {
    match body.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

/// Accepts a JSON number or a numeric string.
fn courier_cost(body: &Map<String, Value>) -> Result<f64, AppError> {
    let cost = match body.get("courierCost") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    cost.ok_or_else(|| AppError::BadRequest("courierCost must be a number".into()))
}

pub async fn create_parcel<S: CourierStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(principal): Extension<Principal>,
    Json(mut body): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<Parcel>), AppError> {
    let cost = courier_cost(&body)?;
    let parcel_name = take_string(&mut body, "parcelName").unwrap_or_default();
    let sender_email = take_string(&mut body, "senderEmail");
    let parcel = state
        .parcels
        .create_parcel(&principal.email, sender_email, parcel_name, cost, body)
        .await?;
    Ok((StatusCode::CREATED, Json(parcel)))
}

pub async fn list_parcels<S: CourierStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(principal): Extension<Principal>,
    Query(q): Query<ListParcelsQuery>,
) -> Result<Json<Vec<Parcel>>, AppError> {
    let delivery_status = parse_opt::<DeliveryStatus>(q.delivery_status)?;
    let caller = caller::<S>(&state, principal).await?;
    let email = q.email.filter(|e| !e.is_empty());
    let parcels = state
        .parcels
        .list_parcels(&caller, email, delivery_status)
        .await?;
    Ok(Json(parcels))
}

pub async fn rider_parcels<S: CourierStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(principal): Extension<Principal>,
    Query(q): Query<RiderParcelsQuery>,
) -> Result<Json<Vec<Parcel>>, AppError> {
    let delivery_status = parse_opt::<DeliveryStatus>(q.delivery_status)?;
    let caller = caller::<S>(&state, principal).await?;
    let rider_email = q
        .rider_email
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| caller.email.clone());
    if rider_email != caller.email && !caller.is_admin {
        return Err(AppError::Forbidden("Forbidden access".into()));
    }
    Ok(Json(
        state
            .parcels
            .rider_parcels(rider_email, delivery_status)
            .await?,
    ))
}

pub async fn get_parcel<S: CourierStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Parcel>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(state.parcels.get_parcel(id).await?))
}

pub async fn delete_parcel<S: CourierStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    let caller = caller::<S>(&state, principal).await?;
    state.parcels.delete_parcel(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign_rider<S: CourierStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(body): Json<AssignRiderRequest>,
) -> Result<Json<Parcel>, AppError> {
    let parcel_id = parse_id(&body.parcel_id)?;
    let rider_id = parse_id(&body.rider_id)?;
    Ok(Json(state.parcels.assign_rider(parcel_id, rider_id).await?))
}

pub async fn update_delivery_status<S: CourierStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<Parcel>, AppError> {
    let id = parse_id(&id)?;
    let caller = caller::<S>(&state, principal).await?;
    let parcel = state
        .parcels
        .update_delivery_status(&caller, id, body.delivery_status)
        .await?;
    Ok(Json(parcel))
}

pub async fn tracking_history<S: CourierStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(tracking_id): Path<String>,
) -> Result<Json<Vec<TrackingEvent>>, AppError> {
    Ok(Json(state.parcels.tracking().history(&tracking_id).await?))
}
