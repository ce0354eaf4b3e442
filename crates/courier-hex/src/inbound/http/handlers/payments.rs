use std::sync::Arc;

use axum::extract::{Query, State};
use axum::{Extension, Json};
use courier_types::domain::payment::PaymentRecord;
use courier_types::ports::store::CourierStore;
use serde::{Deserialize, Serialize};

use super::parse_id;
use crate::application::payment_service::CheckoutOutcome;
use crate::errors::AppError;
use crate::inbound::http::{AppState, Principal};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeginCheckoutRequest {
    #[serde(alias = "parcelID")]
    pub parcel_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeginCheckoutResponse {
    pub url: String,
    pub session_id: String,
}

#[derive(Deserialize)]
pub struct CompleteCheckoutQuery {
    pub session_id: String,
}

#[derive(Serialize, Default)]
pub struct CompleteCheckoutResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    #[serde(rename = "trackingID", skip_serializing_if = "Option::is_none")]
    pub tracking_id: Option<String>,
    #[serde(rename = "transactionID", skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

impl From<CheckoutOutcome> for CompleteCheckoutResponse {
    fn from(outcome: CheckoutOutcome) -> Self {
        match outcome {
            CheckoutOutcome::Completed(record) => Self {
                success: true,
                message: None,
                tracking_id: Some(record.tracking_id),
                transaction_id: Some(record.transaction_id),
            },
            CheckoutOutcome::AlreadyRecorded(record) => Self {
                success: true,
                message: Some("Already paid for it."),
                tracking_id: Some(record.tracking_id),
                transaction_id: Some(record.transaction_id),
            },
            CheckoutOutcome::DoublePayment(record) => Self {
                success: true,
                message: Some("Parcel was already paid; this payment was recorded separately."),
                tracking_id: Some(record.tracking_id),
                transaction_id: Some(record.transaction_id),
            },
            CheckoutOutcome::NotPaid => Self::default(),
        }
    }
}

#[derive(Deserialize)]
pub struct PaymentsQuery {
    pub email: Option<String>,
}

pub async fn begin_checkout<S: CourierStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(body): Json<BeginCheckoutRequest>,
) -> Result<Json<BeginCheckoutResponse>, AppError> {
    let parcel_id = parse_id(&body.parcel_id)?;
    let session = state.payments.begin_checkout(parcel_id).await?;
    Ok(Json(BeginCheckoutResponse {
        url: session.url,
        session_id: session.id,
    }))
}

pub async fn complete_checkout<S: CourierStore>(
    State(state): State<Arc<AppState<S>>>,
    Query(q): Query<CompleteCheckoutQuery>,
) -> Result<Json<CompleteCheckoutResponse>, AppError> {
    let outcome = state.payments.complete_checkout(&q.session_id).await?;
    Ok(Json(outcome.into()))
}

pub async fn payment_history<S: CourierStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(principal): Extension<Principal>,
    Query(q): Query<PaymentsQuery>,
) -> Result<Json<Vec<PaymentRecord>>, AppError> {
    let email = q.email.filter(|e| !e.is_empty());
    Ok(Json(
        state
            .payments
            .payment_history(&principal.email, email)
            .await?,
    ))
}
