mod auth;
mod handlers;
mod server;

pub use auth::Principal;
pub use server::{AppState, HttpServer, HttpServerConfig};
