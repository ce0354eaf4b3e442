//! Outbound adapters for the identity and checkout providers.

pub mod identity_toolkit;
pub mod memory;
pub mod stripe;
