pub mod parcel_service;
pub mod payment_service;
pub mod rider_service;
pub mod tracking_logger;
pub mod user_service;
