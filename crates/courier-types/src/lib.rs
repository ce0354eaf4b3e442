//! courier-types: domain model and ports shared by the courier workspace.

pub mod domain;
pub mod ports;
