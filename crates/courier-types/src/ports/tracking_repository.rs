use async_trait::async_trait;

use crate::domain::tracking::TrackingEvent;
use crate::ports::store::RepoError;

/// Append-only log of parcel status changes.
#[async_trait]
pub trait TrackingRepository: Send + Sync + 'static {
    async fn append_event(&self, event: TrackingEvent) -> Result<TrackingEvent, RepoError>;
    /// Events for `tracking_id` in insertion order.
    async fn events_for(&self, tracking_id: &str) -> Result<Vec<TrackingEvent>, RepoError>;
}
