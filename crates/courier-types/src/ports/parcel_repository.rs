use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::parcel::{DeliveryStatus, Parcel, ParcelQuery};
use crate::ports::store::RepoError;

#[async_trait]
pub trait ParcelRepository: Send + Sync + 'static {
    /// Fails with [`RepoError::Duplicate`] on a tracking id collision.
    async fn insert_parcel(&self, parcel: Parcel) -> Result<Parcel, RepoError>;
    async fn find_parcel(&self, id: Uuid) -> Result<Option<Parcel>, RepoError>;
    /// Matching parcels, newest `requested_at` first.
    async fn list_parcels(&self, query: &ParcelQuery) -> Result<Vec<Parcel>, RepoError>;
    /// Replaces the stored parcel only if its delivery status still equals
    /// `expected`. Returns `false` when missing or the status has moved on.
    async fn replace_parcel_if(
        &self,
        expected: DeliveryStatus,
        parcel: &Parcel,
    ) -> Result<bool, RepoError>;
    async fn delete_parcel(&self, id: Uuid) -> Result<bool, RepoError>;
}
