use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::parcel::DeliveryStatus;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    #[serde(rename = "trackingID")]
    pub tracking_id: String,
    pub status: DeliveryStatus,
    pub details: String,
    pub created_at: DateTime<Utc>,
}

impl TrackingEvent {
    pub fn new(tracking_id: String, status: DeliveryStatus) -> Self {
        Self {
            tracking_id,
            status,
            details: humanize(status.as_str()),
            created_at: Utc::now(),
        }
    }
}

/// `Parcel_Request_Sent` -> `Parcel Request Sent`, `pending-pickup` -> `pending pickup`.
pub fn humanize(token: &str) -> String {
    token
        .split(['_', '-'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn humanize_splits_on_underscores_and_hyphens() {
        assert_eq!(humanize("Parcel_Request_Sent"), "Parcel Request Sent");
        assert_eq!(humanize("pending-pickup"), "pending pickup");
        assert_eq!(humanize("delivered"), "delivered");
        assert_eq!(humanize("a__b"), "a b");
    }

    #[test]
    fn event_details_follow_status() {
        let ev = TrackingEvent::new("PRCL-20240101-ABCDEF".into(), DeliveryStatus::AssignedRider);
        assert_eq!(ev.details, "Assigned Rider");
    }
}
