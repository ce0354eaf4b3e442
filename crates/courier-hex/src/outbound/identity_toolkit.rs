use std::time::Duration;

use async_trait::async_trait;
use courier_types::ports::identity::{IdentityError, IdentityVerifier, VerifiedIdentity};
use serde::{Deserialize, Serialize};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Verifies ID tokens with the Identity Toolkit `accounts:lookup` endpoint.
#[derive(Clone)]
pub struct IdentityToolkitVerifier {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
struct LookupUser {
    email: Option<String>,
}

impl IdentityToolkitVerifier {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client,
        }
    }

    fn lookup_url(&self) -> String {
        format!("{}/v1/accounts:lookup", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl IdentityVerifier for IdentityToolkitVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, IdentityError> {
        let response = self
            .client
            .post(self.lookup_url())
            .query(&[("key", self.api_key.as_str())])
            .json(&LookupRequest { id_token: token })
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(format!("identity lookup failed: {e}")))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(IdentityError::Invalid(format!("token rejected ({status})")));
        }
        if !status.is_success() {
            return Err(IdentityError::Unavailable(format!(
                "identity provider returned {status}"
            )));
        }

        let body: LookupResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Unavailable(format!("invalid lookup response: {e}")))?;
        body.users
            .into_iter()
            .next()
            .and_then(|u| u.email)
            .map(|email| VerifiedIdentity { email })
            .ok_or_else(|| IdentityError::Invalid("token has no email".into()))
    }
}
