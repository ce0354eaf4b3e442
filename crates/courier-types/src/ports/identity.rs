use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub email: String,
}

#[derive(thiserror::Error, Debug)]
pub enum IdentityError {
    #[error("invalid credential: {0}")]
    Invalid(String),

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Turns an opaque bearer token into a verified principal.
#[async_trait]
pub trait IdentityVerifier: Send + Sync + 'static {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, IdentityError>;
}
