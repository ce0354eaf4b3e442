use std::sync::Arc;

use courier_types::domain::parcel::DeliveryStatus;
use courier_types::domain::tracking::TrackingEvent;
use courier_types::ports::store::RepoError;
use courier_types::ports::tracking_repository::TrackingRepository;

use crate::errors::AppError;

/// Appends to and reads the per-parcel tracking log.
pub struct TrackingLogger<S: TrackingRepository> {
    store: Arc<S>,
}

impl<S: TrackingRepository> TrackingLogger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn append(
        &self,
        tracking_id: &str,
        status: DeliveryStatus,
    ) -> Result<TrackingEvent, RepoError> {
        let event = TrackingEvent::new(tracking_id.to_string(), status);
        self.store.append_event(event).await
    }

    /// Appends and reports a failure through the log instead of to the caller,
    /// whose primary write has already been committed.
    pub async fn record(&self, tracking_id: &str, status: DeliveryStatus) -> Option<TrackingEvent> {
        match self.append(tracking_id, status).await {
            Ok(event) => {
                tracing::debug!(tracking_id, status = %status, "tracking event appended");
                Some(event)
            }
            Err(e) => {
                tracing::error!(tracking_id, status = %status, error = %e, "tracking append failed");
                None
            }
        }
    }

    pub async fn history(&self, tracking_id: &str) -> Result<Vec<TrackingEvent>, AppError> {
        let events = self.store.events_for(tracking_id).await?;
        if events.is_empty() {
            return Err(AppError::NotFound(format!("tracking id {}", tracking_id)));
        }
        Ok(events)
    }
}
