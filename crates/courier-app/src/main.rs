use std::sync::Arc;

use courier_hex::config::Config;
use courier_hex::inbound::http::{AppState, HttpServer, HttpServerConfig};
use courier_hex::outbound::identity_toolkit::IdentityToolkitVerifier;
use courier_hex::outbound::stripe::StripeCheckout;
use courier_repo::{build_repo, Repo};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for DATABASE_URL / SERVER_PORT / provider keys when present.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".to_string()))
        .init();

    let config = Config::from_env()?;
    let repo: Repo = build_repo(config.database_url.as_deref()).await?;
    tracing::info!(backend = repo.backend(), "store ready");

    let identity = IdentityToolkitVerifier::new(&config.identity.api_base, &config.identity.api_key);
    let checkout = StripeCheckout::new(&config.checkout.api_base, &config.checkout.secret_key);
    let state = AppState::new(
        Arc::new(repo),
        Arc::new(identity),
        Arc::new(checkout),
        config.checkout.site_domain.clone(),
    );

    let server_cfg = HttpServerConfig {
        port: config.server_port.clone(),
    };

    let http = HttpServer::new(state, server_cfg).await?;
    http.run().await
}
