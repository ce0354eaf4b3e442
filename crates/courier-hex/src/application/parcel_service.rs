use std::sync::Arc;

use courier_types::domain::parcel::{DeliveryStatus, Parcel, ParcelQuery};
use courier_types::domain::rider::WorkStatus;
use courier_types::domain::tracking_id::generate_tracking_id;
use courier_types::ports::store::{CourierStore, RepoError};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::application::tracking_logger::TrackingLogger;
use crate::errors::AppError;

const TRACKING_ID_ATTEMPTS: usize = 3;

/// Who is asking, as far as parcel access rules are concerned.
#[derive(Debug, Clone)]
pub struct Caller {
    pub email: String,
    pub is_admin: bool,
}

pub struct ParcelService<S: CourierStore> {
    store: Arc<S>,
    tracking: TrackingLogger<S>,
}

impl<S: CourierStore> ParcelService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            tracking: TrackingLogger::new(store.clone()),
            store,
        }
    }

    pub fn tracking(&self) -> &TrackingLogger<S> {
        &self.tracking
    }

    pub async fn create_parcel(
        &self,
        caller_email: &str,
        sender_email: Option<String>,
        parcel_name: String,
        courier_cost: f64,
        details: Map<String, Value>,
    ) -> Result<Parcel, AppError> {
        let sender_email = sender_email
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| caller_email.to_string());
        let mut parcel = Parcel::new(sender_email, parcel_name, courier_cost, details)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        for _ in 0..TRACKING_ID_ATTEMPTS {
            match self.store.insert_parcel(parcel.clone()).await {
                Ok(stored) => {
                    tracing::info!(
                        parcel_id = %stored.id,
                        tracking_id = %stored.tracking_id,
                        "parcel requested"
                    );
                    self.tracking
                        .record(&stored.tracking_id, DeliveryStatus::ParcelRequestSent)
                        .await;
                    return Ok(stored);
                }
                Err(RepoError::Duplicate(_)) => parcel.tracking_id = generate_tracking_id(),
                Err(e) => return Err(e.into()),
            }
        }
        Err(AppError::Internal(anyhow::anyhow!(
            "could not allocate a unique tracking id"
        )))
    }

    pub async fn get_parcel(&self, id: Uuid) -> Result<Parcel, AppError> {
        match self.store.find_parcel(id).await? {
            Some(p) => Ok(p),
            None => Err(AppError::NotFound(format!("parcel {}", id))),
        }
    }

    /// Non-admin callers may only list their own parcels.
    pub async fn list_parcels(
        &self,
        caller: &Caller,
        sender_email: Option<String>,
        delivery_status: Option<DeliveryStatus>,
    ) -> Result<Vec<Parcel>, AppError> {
        let sender_email = match (caller.is_admin, sender_email) {
            (true, filter) => filter,
            (false, Some(e)) if e != caller.email => {
                return Err(AppError::Forbidden("Forbidden access".into()))
            }
            (false, _) => Some(caller.email.clone()),
        };
        let query = ParcelQuery {
            sender_email,
            delivery_status,
            ..Default::default()
        };
        Ok(self.store.list_parcels(&query).await?)
    }

    /// Active assignments by default, or exactly `delivery_status` when given.
    pub async fn rider_parcels(
        &self,
        rider_email: String,
        delivery_status: Option<DeliveryStatus>,
    ) -> Result<Vec<Parcel>, AppError> {
        let query = ParcelQuery {
            rider_email: Some(rider_email),
            exclude_status: match delivery_status {
                Some(_) => None,
                None => Some(DeliveryStatus::Delivered),
            },
            delivery_status,
            ..Default::default()
        };
        Ok(self.store.list_parcels(&query).await?)
    }

    pub async fn delete_parcel(&self, caller: &Caller, id: Uuid) -> Result<(), AppError> {
        let parcel = self.get_parcel(id).await?;
        if !caller.is_admin && parcel.sender_email != caller.email {
            return Err(AppError::Forbidden("Forbidden access".into()));
        }
        if self.store.delete_parcel(id).await? {
            tracing::info!(parcel_id = %id, tracking_id = %parcel.tracking_id, "parcel deleted");
            Ok(())
        } else {
            Err(AppError::NotFound(format!("parcel {}", id)))
        }
    }

    /// Two-step write: the parcel takes the rider, then the rider goes on
    /// delivery. A failed second step restores the parcel.
    pub async fn assign_rider(&self, parcel_id: Uuid, rider_id: Uuid) -> Result<Parcel, AppError> {
        let mut parcel = self.get_parcel(parcel_id).await?;
        let rider = self
            .store
            .find_rider(rider_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("rider {}", rider_id)))?;

        let before = parcel.clone();
        parcel.assign_rider(&rider)?;
        if !self
            .store
            .replace_parcel_if(before.delivery_status, &parcel)
            .await?
        {
            return Err(AppError::Conflict(format!(
                "parcel {} changed during assignment",
                parcel_id
            )));
        }

        match self
            .store
            .swap_rider_work_status(rider.id, WorkStatus::Available, WorkStatus::InDelivery)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                self.restore(&parcel, &before).await;
                return Err(AppError::Conflict(format!(
                    "rider {} is no longer available",
                    rider_id
                )));
            }
            Err(e) => {
                self.restore(&parcel, &before).await;
                return Err(e.into());
            }
        }

        tracing::info!(
            parcel_id = %parcel.id,
            rider_id = %rider.id,
            tracking_id = %parcel.tracking_id,
            "rider assigned"
        );
        self.tracking
            .record(&parcel.tracking_id, DeliveryStatus::AssignedRider)
            .await;
        Ok(parcel)
    }

    /// Rider-driven progress. Delivery releases the rider, found by the id
    /// stored on the parcel.
    pub async fn update_delivery_status(
        &self,
        caller: &Caller,
        parcel_id: Uuid,
        status: DeliveryStatus,
    ) -> Result<Parcel, AppError> {
        let mut parcel = self.get_parcel(parcel_id).await?;
        if !caller.is_admin && !parcel.is_assigned_to(&caller.email) {
            return Err(AppError::Forbidden("Forbidden access".into()));
        }

        let before = parcel.clone();
        parcel.advance(status)?;
        if !self
            .store
            .replace_parcel_if(before.delivery_status, &parcel)
            .await?
        {
            return Err(AppError::Conflict(format!(
                "parcel {} changed during status update",
                parcel_id
            )));
        }

        if status == DeliveryStatus::Delivered {
            if let Some(rider_id) = parcel.rider_id {
                match self
                    .store
                    .swap_rider_work_status(rider_id, WorkStatus::InDelivery, WorkStatus::Available)
                    .await
                {
                    Ok(true) => {}
                    Ok(false) => {
                        tracing::warn!(rider_id = %rider_id, "delivered parcel's rider was not in delivery")
                    }
                    Err(e) => {
                        self.restore(&parcel, &before).await;
                        return Err(e.into());
                    }
                }
            }
        }

        tracing::info!(
            parcel_id = %parcel.id,
            tracking_id = %parcel.tracking_id,
            status = %status,
            "delivery status updated"
        );
        self.tracking.record(&parcel.tracking_id, status).await;
        Ok(parcel)
    }

    async fn restore(&self, current: &Parcel, before: &Parcel) {
        match self
            .store
            .replace_parcel_if(current.delivery_status, before)
            .await
        {
            Ok(true) => tracing::warn!(parcel_id = %before.id, "parcel update compensated"),
            Ok(false) => {
                tracing::error!(parcel_id = %before.id, "parcel changed before compensation")
            }
            Err(e) => {
                tracing::error!(parcel_id = %before.id, error = %e, "parcel compensation failed")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_repo::memory::InMemoryRepo;
    use courier_types::domain::parcel::PaymentStatus;
    use courier_types::domain::rider::{Rider, RiderStatus};
    use courier_types::ports::parcel_repository::ParcelRepository;
    use courier_types::ports::rider_repository::RiderRepository;

    fn admin() -> Caller {
        Caller {
            email: "admin@x.com".into(),
            is_admin: true,
        }
    }

    fn sender() -> Caller {
        Caller {
            email: "a@x.com".into(),
            is_admin: false,
        }
    }

    async fn paid_parcel(repo: &InMemoryRepo, svc: &ParcelService<InMemoryRepo>) -> Parcel {
        let parcel = svc
            .create_parcel("a@x.com", None, "Books".into(), 50.0, Map::new())
            .await
            .unwrap();
        let mut paid = parcel.clone();
        paid.mark_paid().unwrap();
        assert!(repo
            .replace_parcel_if(DeliveryStatus::ParcelRequestSent, &paid)
            .await
            .unwrap());
        paid
    }

    async fn approved_rider(repo: &InMemoryRepo, email: &str) -> Rider {
        let mut rider = Rider::new("Rahim".into(), email.into(), "Dhaka".into()).unwrap();
        rider.status = RiderStatus::Approved;
        repo.insert_rider(rider).await.unwrap()
    }

    fn setup() -> (Arc<InMemoryRepo>, ParcelService<InMemoryRepo>) {
        let repo = Arc::new(InMemoryRepo::new());
        let svc = ParcelService::new(repo.clone());
        (repo, svc)
    }

    #[tokio::test]
    async fn create_logs_request_event() {
        let (_, svc) = setup();
        let parcel = svc
            .create_parcel(
                "caller@x.com",
                Some("a@x.com".into()),
                "Books".into(),
                50.0,
                Map::new(),
            )
            .await
            .unwrap();
        assert_eq!(parcel.sender_email, "a@x.com");
        let history = svc.tracking().history(&parcel.tracking_id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, DeliveryStatus::ParcelRequestSent);
    }

    #[tokio::test]
    async fn sender_defaults_to_caller() {
        let (_, svc) = setup();
        let parcel = svc
            .create_parcel("caller@x.com", None, "Books".into(), 10.0, Map::new())
            .await
            .unwrap();
        assert_eq!(parcel.sender_email, "caller@x.com");
        assert!(matches!(
            svc.create_parcel("caller@x.com", None, "x".into(), -5.0, Map::new())
                .await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn assign_rider_updates_both_records() {
        let (repo, svc) = setup();
        let parcel = paid_parcel(&repo, &svc).await;
        let rider = approved_rider(&repo, "r@x.com").await;

        let assigned = svc.assign_rider(parcel.id, rider.id).await.unwrap();
        assert_eq!(assigned.delivery_status, DeliveryStatus::AssignedRider);
        assert_eq!(assigned.rider_id, Some(rider.id));

        let stored_rider = repo.find_rider(rider.id).await.unwrap().unwrap();
        assert_eq!(stored_rider.work_status, WorkStatus::InDelivery);

        let history = svc.tracking().history(&parcel.tracking_id).await.unwrap();
        assert_eq!(history.last().unwrap().status, DeliveryStatus::AssignedRider);
    }

    #[tokio::test]
    async fn assign_rejects_unpaid_parcel_and_busy_rider() {
        let (repo, svc) = setup();
        let unpaid = svc
            .create_parcel("a@x.com", None, "Books".into(), 50.0, Map::new())
            .await
            .unwrap();
        let rider = approved_rider(&repo, "r@x.com").await;
        assert!(matches!(
            svc.assign_rider(unpaid.id, rider.id).await,
            Err(AppError::Conflict(_))
        ));

        let first = paid_parcel(&repo, &svc).await;
        let second = paid_parcel(&repo, &svc).await;
        svc.assign_rider(first.id, rider.id).await.unwrap();
        assert!(matches!(
            svc.assign_rider(second.id, rider.id).await,
            Err(AppError::Conflict(_))
        ));
        let untouched = repo.find_parcel(second.id).await.unwrap().unwrap();
        assert_eq!(untouched.delivery_status, DeliveryStatus::PendingPickup);
        assert!(untouched.rider_id.is_none());
    }

    #[tokio::test]
    async fn delivery_releases_rider() {
        let (repo, svc) = setup();
        let parcel = paid_parcel(&repo, &svc).await;
        let rider = approved_rider(&repo, "r@x.com").await;
        svc.assign_rider(parcel.id, rider.id).await.unwrap();

        let rider_caller = Caller {
            email: "r@x.com".into(),
            is_admin: false,
        };
        svc.update_delivery_status(&rider_caller, parcel.id, DeliveryStatus::RiderArriving)
            .await
            .unwrap();
        let active = svc.rider_parcels("r@x.com".into(), None).await.unwrap();
        assert_eq!(active.len(), 1);

        let done = svc
            .update_delivery_status(&rider_caller, parcel.id, DeliveryStatus::Delivered)
            .await
            .unwrap();
        assert_eq!(done.delivery_status, DeliveryStatus::Delivered);
        assert_eq!(done.payment_status, PaymentStatus::Paid);

        let stored_rider = repo.find_rider(rider.id).await.unwrap().unwrap();
        assert_eq!(stored_rider.work_status, WorkStatus::Available);

        assert!(svc
            .rider_parcels("r@x.com".into(), None)
            .await
            .unwrap()
            .is_empty());
        let delivered = svc
            .rider_parcels("r@x.com".into(), Some(DeliveryStatus::Delivered))
            .await
            .unwrap();
        assert_eq!(delivered.len(), 1);

        let statuses: Vec<_> = svc
            .tracking()
            .history(&parcel.tracking_id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.status)
            .collect();
        assert_eq!(
            statuses,
            vec![
                DeliveryStatus::ParcelRequestSent,
                DeliveryStatus::AssignedRider,
                DeliveryStatus::RiderArriving,
                DeliveryStatus::Delivered,
            ]
        );
    }

    #[tokio::test]
    async fn status_update_requires_assigned_rider_or_admin() {
        let (repo, svc) = setup();
        let parcel = paid_parcel(&repo, &svc).await;
        let rider = approved_rider(&repo, "r@x.com").await;
        svc.assign_rider(parcel.id, rider.id).await.unwrap();

        let stranger = Caller {
            email: "other@x.com".into(),
            is_admin: false,
        };
        assert!(matches!(
            svc.update_delivery_status(&stranger, parcel.id, DeliveryStatus::Delivered)
                .await,
            Err(AppError::Forbidden(_))
        ));
        svc.update_delivery_status(&admin(), parcel.id, DeliveryStatus::ParcelPickedUp)
            .await
            .unwrap();
        assert!(matches!(
            svc.update_delivery_status(&admin(), parcel.id, DeliveryStatus::RiderArriving)
                .await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn listing_is_self_scoped_for_non_admins() {
        let (_, svc) = setup();
        svc.create_parcel("a@x.com", None, "A".into(), 1.0, Map::new())
            .await
            .unwrap();
        svc.create_parcel("b@x.com", None, "B".into(), 1.0, Map::new())
            .await
            .unwrap();

        let mine = svc.list_parcels(&sender(), None, None).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert!(matches!(
            svc.list_parcels(&sender(), Some("b@x.com".into()), None)
                .await,
            Err(AppError::Forbidden(_))
        ));
        let all = svc.list_parcels(&admin(), None, None).await.unwrap();
        assert_eq!(all.len(), 2);
        let pending = svc
            .list_parcels(&admin(), None, Some(DeliveryStatus::PendingPickup))
            .await
            .unwrap();
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn delete_is_restricted_to_sender_or_admin() {
        let (_, svc) = setup();
        let parcel = svc
            .create_parcel("a@x.com", None, "A".into(), 1.0, Map::new())
            .await
            .unwrap();
        let other = Caller {
            email: "b@x.com".into(),
            is_admin: false,
        };
        assert!(matches!(
            svc.delete_parcel(&other, parcel.id).await,
            Err(AppError::Forbidden(_))
        ));
        svc.delete_parcel(&sender(), parcel.id).await.unwrap();
        assert!(matches!(
            svc.get_parcel(parcel.id).await,
            Err(AppError::NotFound(_))
        ));
        // the log outlives the parcel
        assert!(svc.tracking().history(&parcel.tracking_id).await.is_ok());
    }
}
