//! courier-hex: hexagonal courier marketplace API (core, inbound HTTP, outbound gateways)

pub mod config;
pub mod errors;

pub mod application;

pub use courier_types::{domain, ports};

pub mod inbound; // HTTP adapter (server + handlers)
pub mod outbound; // identity + checkout providers
