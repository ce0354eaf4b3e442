#[cfg(not(any(feature = "memory", feature = "sqlite")))]
compile_error!("Enable a repo feature: `memory` or `sqlite`.");

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
use uuid::Uuid;

#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://courier.db";

/// Store selected at startup from the enabled features and `DATABASE_URL`.
pub enum Repo {
    #[cfg(feature = "memory")]
    Memory(memory::InMemoryRepo),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite::SqliteRepo),
}

pub async fn build_repo(url: Option<&str>) -> anyhow::Result<Repo> {
    Repo::build_repo(url).await
}

impl Repo {
    #[cfg(all(feature = "memory", not(feature = "sqlite")))]
    pub async fn build_repo(_: Option<&str>) -> anyhow::Result<Self> {
        Ok(Self::Memory(memory::InMemoryRepo::new()))
    }

    #[cfg(all(feature = "sqlite", not(feature = "memory")))]
    pub async fn build_repo(database_url: Option<&str>) -> anyhow::Result<Self> {
        let url = database_url.unwrap_or(DEFAULT_DATABASE_URL);
        Ok(Self::Sqlite(sqlite::SqliteRepo::new(url).await?))
    }

    // With both adapters compiled in, an explicit URL selects sqlite.
    #[cfg(all(feature = "sqlite", feature = "memory"))]
    pub async fn build_repo(database_url: Option<&str>) -> anyhow::Result<Self> {
        match database_url {
            Some(url) => Ok(Self::Sqlite(sqlite::SqliteRepo::new(url).await?)),
            None => Ok(Self::Memory(memory::InMemoryRepo::new())),
        }
    }

    pub fn backend(&self) -> &'static str {
        match self {
            #[cfg(feature = "memory")]
            Repo::Memory(_) => "memory",
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(_) => "sqlite",
        }
    }
}

macro_rules! delegate {
    ($self:ident . $method:ident ( $($arg:expr),* )) => {
        match $self {
            #[cfg(feature = "memory")]
            Repo::Memory(inner) => inner.$method($($arg),*).await,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(inner) => inner.$method($($arg),*).await,
        }
    };
}

#[async_trait]
impl UserRepository for Repo {
    async fn insert_user(&self, user: User) -> Result<User, RepoError> {
        delegate!(self.insert_user(user))
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        delegate!(self.find_user(id))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        delegate!(self.find_user_by_email(email))
    }

    async fn list_users(&self, query: &UserQuery) -> Result<Vec<User>, RepoError> {
        delegate!(self.list_users(query))
    }

    async fn set_user_role(&self, id: Uuid, role: Role) -> Result<Option<User>, RepoError> {
        delegate!(self.set_user_role(id, role))
    }

    async fn set_user_role_by_email(
        &self,
        email: &str,
        role: Role,
    ) -> Result<Option<User>, RepoError> {
        delegate!(self.set_user_role_by_email(email, role))
    }
}

#[async_trait]
impl RiderRepository for Repo {
    async fn insert_rider(&self, rider: Rider) -> Result<Rider, RepoError> {
        delegate!(self.insert_rider(rider))
    }

    async fn find_rider(&self, id: Uuid) -> Result<Option<Rider>, RepoError> {
        delegate!(self.find_rider(id))
    }

    async fn list_riders(&self, query: &RiderQuery) -> Result<Vec<Rider>, RepoError> {
        delegate!(self.list_riders(query))
    }

    async fn set_rider_status(
        &self,
        id: Uuid,
        status: RiderStatus,
    ) -> Result<Option<Rider>, RepoError> {
        delegate!(self.set_rider_status(id, status))
    }

    async fn swap_rider_work_status(
        &self,
        id: Uuid,
        from: WorkStatus,
        to: WorkStatus,
    ) -> Result<bool, RepoError> {
        delegate!(self.swap_rider_work_status(id, from, to))
    }
}

#[async_trait]
impl ParcelRepository for Repo {
    async fn insert_parcel(&self, parcel: Parcel) -> Result<Parcel, RepoError> {
        delegate!(self.insert_parcel(parcel))
    }

    async fn find_parcel(&self, id: Uuid) -> Result<Option<Parcel>, RepoError> {
        delegate!(self.find_parcel(id))
    }

    async fn list_parcels(&self, query: &ParcelQuery) -> Result<Vec<Parcel>, RepoError> {
        delegate!(self.list_parcels(query))
    }

    async fn replace_parcel_if(
        &self,
        expected: DeliveryStatus,
        parcel: &Parcel,
    ) -> Result<bool, RepoError> {
        delegate!(self.replace_parcel_if(expected, parcel))
    }

    async fn delete_parcel(&self, id: Uuid) -> Result<bool, RepoError> {
        delegate!(self.delete_parcel(id))
    }
}

#[async_trait]
impl TrackingRepository for Repo {
    async fn append_event(&self, event: TrackingEvent) -> Result<TrackingEvent, RepoError> {
        delegate!(self.append_event(event))
    }

    async fn events_for(&self, tracking_id: &str) -> Result<Vec<TrackingEvent>, RepoError> {
        delegate!(self.events_for(tracking_id))
    }
}

#[async_trait]
impl PaymentRepository for Repo {
    async fn insert_payment(&self, payment: PaymentRecord) -> Result<PaymentRecord, RepoError> {
        delegate!(self.insert_payment(payment))
    }

    async fn find_payment_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<PaymentRecord>, RepoError> {
        delegate!(self.find_payment_by_transaction(transaction_id))
    }

    async fn list_payments(
        &self,
        customer_email: Option<&str>,
    ) -> Result<Vec<PaymentRecord>, RepoError> {
        delegate!(self.list_payments(customer_email))
    }
}
