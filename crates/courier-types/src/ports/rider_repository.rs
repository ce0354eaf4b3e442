use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::rider::{Rider, RiderQuery, RiderStatus, WorkStatus};
use crate::ports::store::RepoError;

#[async_trait]
pub trait RiderRepository: Send + Sync + 'static {
    async fn insert_rider(&self, rider: Rider) -> Result<Rider, RepoError>;
    async fn find_rider(&self, id: Uuid) -> Result<Option<Rider>, RepoError>;
    async fn list_riders(&self, query: &RiderQuery) -> Result<Vec<Rider>, RepoError>;
    async fn set_rider_status(
        &self,
        id: Uuid,
        status: RiderStatus,
    ) -> Result<Option<Rider>, RepoError>;
    /// Sets `work_status` to `to` only if it currently equals `from`.
    /// Returns `false` when the rider is missing or was in another state.
    async fn swap_rider_work_status(
        &self,
        id: Uuid,
        from: WorkStatus,
        to: WorkStatus,
    ) -> Result<bool, RepoError>;
}
