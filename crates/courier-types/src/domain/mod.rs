pub mod parcel;
pub mod payment;
pub mod rider;
pub mod tracking;
pub mod tracking_id;
pub mod user;
