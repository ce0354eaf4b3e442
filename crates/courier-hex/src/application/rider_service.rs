use std::sync::Arc;

use courier_types::domain::rider::{Rider, RiderQuery, RiderStatus, WorkStatus};
use courier_types::domain::user::Role;
use courier_types::ports::store::CourierStore;
use uuid::Uuid;

use crate::errors::AppError;

pub struct RiderService<S: CourierStore> {
    store: Arc<S>,
}

impl<S: CourierStore> RiderService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn apply(
        &self,
        name: String,
        email: String,
        rider_district: String,
    ) -> Result<Rider, AppError> {
        let rider = Rider::new(name, email, rider_district)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        let rider = self.store.insert_rider(rider).await?;
        tracing::info!(rider_id = %rider.id, email = %rider.email, "rider application received");
        Ok(rider)
    }

    pub async fn list_riders(&self, query: RiderQuery) -> Result<Vec<Rider>, AppError> {
        Ok(self.store.list_riders(&query).await?)
    }

    /// Sets the application status and keeps the user's role in step with it:
    /// approval grants `rider`, leaving `approved` takes it back.
    pub async fn review(&self, id: Uuid, status: RiderStatus) -> Result<Rider, AppError> {
        let previous = self
            .store
            .find_rider(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("rider {}", id)))?;
        if status != RiderStatus::Approved && previous.work_status == WorkStatus::InDelivery {
            return Err(AppError::Conflict(format!("rider {} is on a delivery", id)));
        }
        let rider = self
            .store
            .set_rider_status(id, status)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("rider {}", id)))?;

        let role = match status {
            RiderStatus::Approved => Some(Role::Rider),
            _ if previous.status == RiderStatus::Approved => Some(Role::User),
            _ => None,
        };
        if let Some(role) = role {
            if let Err(e) = self.sync_user_role(&rider.email, role).await {
                if let Err(undo) = self.store.set_rider_status(id, previous.status).await {
                    tracing::error!(rider_id = %id, error = %undo, "failed to restore rider status");
                }
                return Err(e);
            }
        }
        tracing::info!(rider_id = %id, status = status.as_str(), "rider reviewed");
        Ok(rider)
    }

    async fn sync_user_role(&self, email: &str, role: Role) -> Result<(), AppError> {
        match self.store.find_user_by_email(email).await? {
            None => tracing::warn!(email, "reviewed rider has no user account"),
            Some(user) if user.role == Role::Admin => {}
            Some(_) => {
                self.store.set_user_role_by_email(email, role).await?;
            }
        }
        Ok(())
    }
}
