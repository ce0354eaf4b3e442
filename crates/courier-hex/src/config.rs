use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct CheckoutConfig {
    pub secret_key: String,
    pub api_base: String,
    /// Public front-end origin used to build checkout redirect URLs.
    pub site_domain: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IdentityConfig {
    pub api_key: String,
    pub api_base: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: String,
    pub database_url: Option<String>,
    pub checkout: CheckoutConfig,
    pub identity: IdentityConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let server_port = env::var("SERVER_PORT").unwrap_or_else(|_| "3000".into());
        let database_url = env::var("DATABASE_URL").ok();
        let checkout = CheckoutConfig {
            secret_key: required("STRIPE_SECRET_KEY")?,
            api_base: env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".into()),
            site_domain: env::var("SITE_DOMAIN")
                .unwrap_or_else(|_| "http://localhost:5173".into()),
        };
        let identity = IdentityConfig {
            api_key: required("IDENTITY_API_KEY")?,
            api_base: env::var("IDENTITY_API_BASE")
                .unwrap_or_else(|_| "https://identitytoolkit.googleapis.com".into()),
        };
        Ok(Self {
            server_port,
            database_url,
            checkout,
            identity,
        })
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("{key} must be set"))
}
