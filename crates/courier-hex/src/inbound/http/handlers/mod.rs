use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use super::auth::Principal;
use super::server::AppState;
use crate::application::parcel_service::Caller;
use crate::errors::AppError;
use courier_types::ports::store::CourierStore;

pub mod parcels;
pub mod payments;
pub mod riders;
pub mod users;

pub async fn root() -> &'static str {
    "Courier server is running"
}

pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

pub(crate) fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|e| AppError::BadRequest(format!("invalid id {raw}: {e}")))
}

/// Parses an optional query value through `FromStr`, mapping failures to 400.
pub(crate) fn parse_opt<T>(raw: Option<String>) -> Result<Option<T>, AppError>
where
    T: std::str::FromStr<Err = anyhow::Error>,
{
    raw.filter(|v| !v.is_empty())
        .map(|v| v.parse::<T>())
        .transpose()
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

pub(crate) async fn caller<S: CourierStore>(
    state: &AppState<S>,
    principal: Principal,
) -> Result<Caller, AppError> {
    let is_admin = state.users.is_admin(&principal.email).await?;
    Ok(Caller {
        email: principal.email,
        is_admin,
    })
}
