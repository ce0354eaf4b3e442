use std::time::Duration;

use async_trait::async_trait;
use courier_types::ports::checkout::{
    CheckoutGateway, CheckoutRequest, CheckoutSession, GatewayError, SessionDetails,
    SessionPaymentStatus,
};
use reqwest::StatusCode;
use serde::Deserialize;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Checkout sessions against a Stripe-compatible REST API.
#[derive(Clone)]
pub struct StripeCheckout {
    base_url: String,
    secret_key: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct SessionCreated {
    id: String,
    url: Option<String>,
}

#[derive(Deserialize)]
struct SessionBody {
    id: String,
    payment_status: SessionPaymentStatus,
    amount_total: Option<i64>,
    currency: Option<String>,
    customer_email: Option<String>,
    customer_details: Option<CustomerDetails>,
    payment_intent: Option<String>,
    #[serde(default)]
    metadata: Metadata,
}

#[derive(Deserialize)]
struct CustomerDetails {
    email: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Metadata {
    parcel_id: Option<String>,
    name: Option<String>,
}

impl From<SessionBody> for SessionDetails {
    fn from(s: SessionBody) -> Self {
        let customer_email = s
            .customer_email
            .or_else(|| s.customer_details.and_then(|d| d.email));
        SessionDetails {
            id: s.id,
            payment_status: s.payment_status,
            amount_total: s.amount_total.unwrap_or(0),
            currency: s.currency.unwrap_or_default(),
            customer_email,
            payment_intent: s.payment_intent,
            parcel_id: s.metadata.parcel_id,
            parcel_name: s.metadata.name,
        }
    }
}

impl StripeCheckout {
    pub fn new(base_url: impl Into<String>, secret_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: base_url.into(),
            secret_key: secret_key.into(),
            client,
        }
    }

    fn sessions_url(&self) -> String {
        format!("{}/v1/checkout/sessions", self.base_url.trim_end_matches('/'))
    }

    async fn read<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| GatewayError::Malformed(e.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                v.pointer("/error/message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or(body);
        match status {
            StatusCode::TOO_MANY_REQUESTS => Err(GatewayError::Unavailable(message)),
            s if s.is_client_error() => Err(GatewayError::Rejected(format!("{s}: {message}"))),
            s => Err(GatewayError::Unavailable(format!("{s}: {message}"))),
        }
    }
}

#[async_trait]
impl CheckoutGateway for StripeCheckout {
    async fn create_session(&self, req: &CheckoutRequest) -> Result<CheckoutSession, GatewayError> {
        let form: Vec<(&str, String)> = vec![
            ("mode", "payment".into()),
            ("line_items[0][quantity]", "1".into()),
            ("line_items[0][price_data][currency]", req.currency.clone()),
            (
                "line_items[0][price_data][unit_amount]",
                req.unit_amount.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]",
                format!("Please pay for: {}", req.parcel_name),
            ),
            ("customer_email", req.customer_email.clone()),
            ("metadata[parcelId]", req.parcel_id.to_string()),
            ("metadata[name]", req.parcel_name.clone()),
            ("success_url", req.success_url.clone()),
            ("cancel_url", req.cancel_url.clone()),
        ];
        let response = self
            .client
            .post(self.sessions_url())
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("create session failed: {e}")))?;

        let created: SessionCreated = Self::read(response).await?;
        let url = created
            .url
            .ok_or_else(|| GatewayError::Malformed("session has no url".into()))?;
        Ok(CheckoutSession {
            id: created.id,
            url,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<SessionDetails, GatewayError> {
        let response = self
            .client
            .get(format!("{}/{}", self.sessions_url(), session_id))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("retrieve session failed: {e}")))?;
        let body: SessionBody = Self::read(response).await?;
        Ok(body.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use uuid::Uuid;

    fn request(parcel_id: Uuid) -> CheckoutRequest {
        CheckoutRequest {
            parcel_id,
            parcel_name: "Books".into(),
            customer_email: "a@x.com".into(),
            currency: "usd".into(),
            unit_amount: 1250,
            success_url: "http://site/dashboard/paymentSuccess?session_id={CHECKOUT_SESSION_ID}"
                .into(),
            cancel_url: "http://site/dashboard/paymentCancel".into(),
        }
    }

    #[tokio::test]
    async fn create_session_posts_form_with_metadata() {
        let server = MockServer::start();
        let parcel_id = Uuid::new_v4();
        let create = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/checkout/sessions")
                .header("authorization", "Bearer sk_test")
                .x_www_form_urlencoded_tuple("mode", "payment")
                .x_www_form_urlencoded_tuple("line_items[0][price_data][unit_amount]", "1250")
                .x_www_form_urlencoded_tuple("metadata[parcelId]".to_string(), parcel_id.to_string());
            then.status(200)
                .json_body(json!({ "id": "cs_1", "url": "https://pay.test/cs_1" }));
        });

        let gateway = StripeCheckout::new(server.base_url(), "sk_test");
        let session = gateway.create_session(&request(parcel_id)).await.unwrap();
        assert_eq!(session.id, "cs_1");
        assert_eq!(session.url, "https://pay.test/cs_1");
        create.assert();
    }

    #[tokio::test]
    async fn retrieve_session_reads_metadata() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/checkout/sessions/cs_1");
            then.status(200).json_body(json!({
                "id": "cs_1",
                "object": "checkout.session",
                "payment_status": "paid",
                "amount_total": 1250,
                "currency": "usd",
                "customer_email": null,
                "customer_details": { "email": "a@x.com" },
                "payment_intent": "pi_1",
                "metadata": { "parcelId": "p-1", "name": "Books" }
            }));
        });

        let gateway = StripeCheckout::new(server.base_url(), "sk_test");
        let details = gateway.retrieve_session("cs_1").await.unwrap();
        assert_eq!(details.payment_status, SessionPaymentStatus::Paid);
        assert_eq!(details.amount_total, 1250);
        assert_eq!(details.customer_email.as_deref(), Some("a@x.com"));
        assert_eq!(details.payment_intent.as_deref(), Some("pi_1"));
        assert_eq!(details.parcel_id.as_deref(), Some("p-1"));
    }

    #[tokio::test]
    async fn provider_errors_are_classified() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/checkout/sessions/missing");
            then.status(404)
                .json_body(json!({ "error": { "message": "No such checkout.session" } }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/v1/checkout/sessions/down");
            then.status(500);
        });

        let gateway = StripeCheckout::new(server.base_url(), "sk_test");
        match gateway.retrieve_session("missing").await {
            Err(GatewayError::Rejected(m)) => assert!(m.contains("No such checkout.session")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            gateway.retrieve_session("down").await,
            Err(GatewayError::Unavailable(_))
        ));
    }
}
