use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::parcel::PaymentStatus;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: Uuid,
    /// Payment-intent id reported by the checkout provider; one record per value.
    #[serde(rename = "transactionID")]
    pub transaction_id: String,
    #[serde(rename = "parcelID")]
    pub parcel_id: Uuid,
    pub parcel_name: String,
    pub customer_email: String,
    pub amount: f64,
    pub currency: String,
    pub payment_status: PaymentStatus,
    #[serde(rename = "trackingID")]
    pub tracking_id: String,
    pub paid_at: DateTime<Utc>,
}
