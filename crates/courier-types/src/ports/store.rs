use crate::ports::parcel_repository::ParcelRepository;
use crate::ports::payment_repository::PaymentRepository;
use crate::ports::rider_repository::RiderRepository;
use crate::ports::tracking_repository::TrackingRepository;
use crate::ports::user_repository::UserRepository;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("db error: {0}")]
    DbError(String),

    #[error("duplicate key: {0}")]
    Duplicate(String),
}

/// Every collection the service reads or writes.
pub trait CourierStore:
    UserRepository + RiderRepository + ParcelRepository + TrackingRepository + PaymentRepository
{
}

impl<T> CourierStore for T where
    T: UserRepository
        + RiderRepository
        + ParcelRepository
        + TrackingRepository
        + PaymentRepository
{
}
