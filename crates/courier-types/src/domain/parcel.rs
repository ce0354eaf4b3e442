use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::rider::Rider;
use super::tracking_id::generate_tracking_id;

/// Delivery lifecycle of a parcel. Variants are declared in lifecycle order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DeliveryStatus {
    #[serde(rename = "Parcel_Request_Sent")]
    ParcelRequestSent,
    #[serde(rename = "pending-pickup")]
    PendingPickup,
    #[serde(rename = "Assigned_Rider")]
    AssignedRider,
    #[serde(rename = "rider_arriving")]
    RiderArriving,
    #[serde(rename = "parcel_picked_up")]
    ParcelPickedUp,
    #[serde(rename = "delivered")]
    Delivered,
}

impl DeliveryStatus {
    pub const ALL: [DeliveryStatus; 6] = [
        DeliveryStatus::ParcelRequestSent,
        DeliveryStatus::PendingPickup,
        DeliveryStatus::AssignedRider,
        DeliveryStatus::RiderArriving,
        DeliveryStatus::ParcelPickedUp,
        DeliveryStatus::Delivered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::ParcelRequestSent => "Parcel_Request_Sent",
            DeliveryStatus::PendingPickup => "pending-pickup",
            DeliveryStatus::AssignedRider => "Assigned_Rider",
            DeliveryStatus::RiderArriving => "rider_arriving",
            DeliveryStatus::ParcelPickedUp => "parcel_picked_up",
            DeliveryStatus::Delivered => "delivered",
        }
    }

    pub fn rank(&self) -> u8 {
        *self as u8
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered)
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeliveryStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown delivery status {s}"))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(PaymentStatus::Unpaid),
            "paid" => Ok(PaymentStatus::Paid),
            other => anyhow::bail!("unknown payment status {other}"),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("parcel is already paid")]
    AlreadyPaid,
    #[error("parcel cannot be assigned while {0}")]
    NotAssignable(DeliveryStatus),
    #[error("rider is not approved or is already on a delivery")]
    RiderUnavailable,
    #[error("parcel has no assigned rider")]
    NoRiderAssigned,
    #[error("cannot move parcel from {from} to {to}")]
    InvalidTransition {
        from: DeliveryStatus,
        to: DeliveryStatus,
    },
}

/// Keys owned by the system; client-supplied values for them are dropped.
const RESERVED_FIELDS: [&str; 13] = [
    "id",
    "_id",
    "trackingID",
    "senderEmail",
    "parcelName",
    "courierCost",
    "paymentStatus",
    "deliveryStatus",
    "riderId",
    "riderName",
    "riderEmail",
    "requestedAt",
    "updatedAt",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Parcel {
    pub id: Uuid,
    #[serde(rename = "trackingID")]
    pub tracking_id: String,
    pub sender_email: String,
    pub parcel_name: String,
    pub courier_cost: f64,
    pub payment_status: PaymentStatus,
    pub delivery_status: DeliveryStatus,
    pub rider_id: Option<Uuid>,
    pub rider_name: Option<String>,
    pub rider_email: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Free-form fields supplied by the sender (receiver, addresses, weight, ...).
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl Parcel {
    pub fn new(
        sender_email: String,
        parcel_name: String,
        courier_cost: f64,
        mut details: Map<String, Value>,
    ) -> anyhow::Result<Self> {
        if !courier_cost.is_finite() || courier_cost < 0.0 {
            anyhow::bail!("courierCost must be a non-negative number");
        }
        for key in RESERVED_FIELDS {
            details.remove(key);
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            tracking_id: generate_tracking_id(),
            sender_email,
            parcel_name,
            courier_cost,
            payment_status: PaymentStatus::Unpaid,
            delivery_status: DeliveryStatus::ParcelRequestSent,
            rider_id: None,
            rider_name: None,
            rider_email: None,
            requested_at: now,
            updated_at: now,
            details,
        })
    }

    /// Cost in minor currency units, as submitted to the checkout provider.
    pub fn cost_in_minor_units(&self) -> i64 {
        (self.courier_cost * 100.0).round() as i64
    }

    pub fn mark_paid(&mut self) -> Result<(), LifecycleError> {
        if self.payment_status == PaymentStatus::Paid {
            return Err(LifecycleError::AlreadyPaid);
        }
        if self.delivery_status != DeliveryStatus::ParcelRequestSent {
            return Err(LifecycleError::InvalidTransition {
                from: self.delivery_status,
                to: DeliveryStatus::PendingPickup,
            });
        }
        self.payment_status = PaymentStatus::Paid;
        self.delivery_status = DeliveryStatus::PendingPickup;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn assign_rider(&mut self, rider: &Rider) -> Result<(), LifecycleError> {
        if self.delivery_status != DeliveryStatus::PendingPickup
            || self.payment_status != PaymentStatus::Paid
        {
            return Err(LifecycleError::NotAssignable(self.delivery_status));
        }
        if !rider.can_take_parcel() {
            return Err(LifecycleError::RiderUnavailable);
        }
        self.rider_id = Some(rider.id);
        self.rider_name = Some(rider.name.clone());
        self.rider_email = Some(rider.email.clone());
        self.delivery_status = DeliveryStatus::AssignedRider;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Moves an assigned parcel strictly forward through the rider-driven stages.
    pub fn advance(&mut self, next: DeliveryStatus) -> Result<(), LifecycleError> {
        if self.rider_id.is_none() {
            return Err(LifecycleError::NoRiderAssigned);
        }
        if next.rank() <= self.delivery_status.rank()
            || next.rank() <= DeliveryStatus::AssignedRider.rank()
        {
            return Err(LifecycleError::InvalidTransition {
                from: self.delivery_status,
                to: next,
            });
        }
        self.delivery_status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn is_assigned_to(&self, email: &str) -> bool {
        self.rider_email.as_deref() == Some(email)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParcelQuery {
    pub sender_email: Option<String>,
    pub rider_email: Option<String>,
    pub delivery_status: Option<DeliveryStatus>,
    pub exclude_status: Option<DeliveryStatus>,
}

impl ParcelQuery {
    pub fn matches(&self, parcel: &Parcel) -> bool {
        self.sender_email
            .as_deref()
            .map_or(true, |e| parcel.sender_email == e)
            && self
                .rider_email
                .as_deref()
                .map_or(true, |e| parcel.rider_email.as_deref() == Some(e))
            && self
                .delivery_status
                .map_or(true, |s| parcel.delivery_status == s)
            && self
                .exclude_status
                .map_or(true, |s| parcel.delivery_status != s)
    }
}
