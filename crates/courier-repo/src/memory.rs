use async_trait::async_trait;
use courier_types::domain::parcel::{DeliveryStatus, Parcel, ParcelQuery};
use courier_types::domain::payment::PaymentRecord;
use courier_types::domain::rider::{Rider, RiderQuery, RiderStatus, WorkStatus};
use courier_types::domain::tracking::TrackingEvent;
use courier_types::domain::user::{Role, User, UserQuery};
use courier_types::ports::parcel_repository::ParcelRepository;
use courier_types::ports::payment_repository::PaymentRepository;
use courier_types::ports::rider_repository::RiderRepository;
use courier_types::ports::store::RepoError;
use courier_types::ports::tracking_repository::TrackingRepository;
use courier_types::ports::user_repository::UserRepository;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct InMemoryRepo {
    pub users: Arc<DashMap<Uuid, User>>,
    user_emails: Arc<DashMap<String, Uuid>>,
    pub riders: Arc<DashMap<Uuid, Rider>>,
    pub parcels: Arc<DashMap<Uuid, Parcel>>,
    tracking_ids: Arc<DashMap<String, Uuid>>,
    pub tracking: Arc<DashMap<String, Vec<TrackingEvent>>>,
    /// Keyed by transaction id.
    pub payments: Arc<DashMap<String, PaymentRecord>>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self {
            users: Arc::new(DashMap::new()),
            user_emails: Arc::new(DashMap::new()),
            riders: Arc::new(DashMap::new()),
            parcels: Arc::new(DashMap::new()),
            tracking_ids: Arc::new(DashMap::new()),
            tracking: Arc::new(DashMap::new()),
            payments: Arc::new(DashMap::new()),
        }
    }
}

impl Default for InMemoryRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for InMemoryRepo {
    async fn insert_user(&self, user: User) -> Result<User, RepoError> {
        match self.user_emails.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(RepoError::Duplicate(format!("user {}", user.email))),
            Entry::Vacant(slot) => {
                slot.insert(user.id);
                self.users.insert(user.id, user.clone());
                Ok(user)
            }
        }
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.users.get(&id).map(|r| r.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let Some(id) = self.user_emails.get(email).map(|r| *r) else {
            return Ok(None);
        };
        self.find_user(id).await
    }

    async fn list_users(&self, query: &UserQuery) -> Result<Vec<User>, RepoError> {
        let mut users: Vec<User> = self
            .users
            .iter()
            .filter(|kv| query.matches(kv.value()))
            .map(|kv| kv.value().clone())
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users
            .into_iter()
            .skip(query.skip)
            .take(query.limit)
            .collect())
    }

    async fn set_user_role(&self, id: Uuid, role: Role) -> Result<Option<User>, RepoError> {
        if let Some(mut v) = self.users.get_mut(&id) {
            v.role = role;
            return Ok(Some(v.clone()));
        }
        Ok(None)
    }

    async fn set_user_role_by_email(
        &self,
        email: &str,
        role: Role,
    ) -> Result<Option<User>, RepoError> {
        let Some(id) = self.user_emails.get(email).map(|r| *r) else {
            return Ok(None);
        };
        self.set_user_role(id, role).await
    }
}

#[async_trait]
impl RiderRepository for InMemoryRepo {
    async fn insert_rider(&self, rider: Rider) -> Result<Rider, RepoError> {
        self.riders.insert(rider.id, rider.clone());
        Ok(rider)
    }

    async fn find_rider(&self, id: Uuid) -> Result<Option<Rider>, RepoError> {
        Ok(self.riders.get(&id).map(|r| r.clone()))
    }

    async fn list_riders(&self, query: &RiderQuery) -> Result<Vec<Rider>, RepoError> {
        let mut riders: Vec<Rider> = self
            .riders
            .iter()
            .filter(|kv| query.matches(kv.value()))
            .map(|kv| kv.value().clone())
            .collect();
        riders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(riders)
    }

    async fn set_rider_status(
        &self,
        id: Uuid,
        status: RiderStatus,
    ) -> Result<Option<Rider>, RepoError> {
        if let Some(mut v) = self.riders.get_mut(&id) {
            v.status = status;
            return Ok(Some(v.clone()));
        }
        Ok(None)
    }

    async fn swap_rider_work_status(
        &self,
        id: Uuid,
        from: WorkStatus,
        to: WorkStatus,
    ) -> Result<bool, RepoError> {
        match self.riders.get_mut(&id) {
            Some(mut v) if v.work_status == from => {
                v.work_status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl ParcelRepository for InMemoryRepo {
    async fn insert_parcel(&self, parcel: Parcel) -> Result<Parcel, RepoError> {
        match self.tracking_ids.entry(parcel.tracking_id.clone()) {
            Entry::Occupied(_) => Err(RepoError::Duplicate(format!(
                "tracking id {}",
                parcel.tracking_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(parcel.id);
                self.parcels.insert(parcel.id, parcel.clone());
                Ok(parcel)
            }
        }
    }

    async fn find_parcel(&self, id: Uuid) -> Result<Option<Parcel>, RepoError> {
        Ok(self.parcels.get(&id).map(|r| r.clone()))
    }

    async fn list_parcels(&self, query: &ParcelQuery) -> Result<Vec<Parcel>, RepoError> {
        let mut parcels: Vec<Parcel> = self
            .parcels
            .iter()
            .filter(|kv| query.matches(kv.value()))
            .map(|kv| kv.value().clone())
            .collect();
        parcels.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        Ok(parcels)
    }

    async fn replace_parcel_if(
        &self,
        expected: DeliveryStatus,
        parcel: &Parcel,
    ) -> Result<bool, RepoError> {
        match self.parcels.get_mut(&parcel.id) {
            Some(mut v) if v.delivery_status == expected => {
                *v = parcel.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_parcel(&self, id: Uuid) -> Result<bool, RepoError> {
        match self.parcels.remove(&id) {
            Some((_, parcel)) => {
                self.tracking_ids
                    .remove_if(&parcel.tracking_id, |_, owner| *owner == id);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl TrackingRepository for InMemoryRepo {
    async fn append_event(&self, event: TrackingEvent) -> Result<TrackingEvent, RepoError> {
        self.tracking
            .entry(event.tracking_id.clone())
            .or_default()
            .push(event.clone());
        Ok(event)
    }

    async fn events_for(&self, tracking_id: &str) -> Result<Vec<TrackingEvent>, RepoError> {
        Ok(self
            .tracking
            .get(tracking_id)
            .map(|r| r.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl PaymentRepository for InMemoryRepo {
    async fn insert_payment(&self, payment: PaymentRecord) -> Result<PaymentRecord, RepoError> {
        match self.payments.entry(payment.transaction_id.clone()) {
            Entry::Occupied(_) => Err(RepoError::Duplicate(format!(
                "transaction {}",
                payment.transaction_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(payment.clone());
                Ok(payment)
            }
        }
    }

    async fn find_payment_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<PaymentRecord>, RepoError> {
        Ok(self.payments.get(transaction_id).map(|r| r.clone()))
    }

    async fn list_payments(
        &self,
        customer_email: Option<&str>,
    ) -> Result<Vec<PaymentRecord>, RepoError> {
        let mut payments: Vec<PaymentRecord> = self
            .payments
            .iter()
            .filter(|kv| customer_email.map_or(true, |e| kv.value().customer_email == e))
            .map(|kv| kv.value().clone())
            .collect();
        payments.sort_by(|a, b| b.paid_at.cmp(&a.paid_at));
        Ok(payments)
    }
}
