use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub parcel_id: Uuid,
    pub parcel_name: String,
    pub customer_email: String,
    pub currency: String,
    /// Minor currency units.
    pub unit_amount: i64,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPaymentStatus {
    Paid,
    Unpaid,
    NoPaymentRequired,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDetails {
    pub id: String,
    pub payment_status: SessionPaymentStatus,
    /// Minor currency units.
    pub amount_total: i64,
    pub currency: String,
    pub customer_email: Option<String>,
    pub payment_intent: Option<String>,
    pub parcel_id: Option<String>,
    pub parcel_name: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    #[error("checkout request rejected: {0}")]
    Rejected(String),

    #[error("checkout provider unavailable: {0}")]
    Unavailable(String),

    #[error("unexpected checkout response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait CheckoutGateway: Send + Sync + 'static {
    async fn create_session(&self, req: &CheckoutRequest) -> Result<CheckoutSession, GatewayError>;
    async fn retrieve_session(&self, session_id: &str) -> Result<SessionDetails, GatewayError>;
}
