pub mod checkout;
pub mod identity;
pub mod parcel_repository;
pub mod payment_repository;
pub mod rider_repository;
pub mod store;
pub mod tracking_repository;
pub mod user_repository;
