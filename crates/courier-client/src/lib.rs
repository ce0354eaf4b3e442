use std::time::Duration;

use anyhow::Context;
use courier_types::domain::parcel::{DeliveryStatus, Parcel};
use courier_types::domain::payment::PaymentRecord;
use courier_types::domain::tracking::TrackingEvent;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Clone)]
pub struct CourierClientBuilder {
    base: Url,
    headers: HeaderMap,
    timeout: Option<Duration>,
    client: Option<reqwest::Client>,
}

/// Typed client for the courier HTTP API.
#[derive(Clone)]
pub struct CourierClient {
    base: Url,
    client: reqwest::Client,
}

impl CourierClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        Self::builder(base_url)?.build()
    }

    pub fn builder(base_url: &str) -> anyhow::Result<CourierClientBuilder> {
        let base = Url::parse(base_url).context("invalid base url")?;
        Ok(CourierClientBuilder {
            base,
            headers: HeaderMap::new(),
            timeout: None,
            client: None,
        })
    }

    fn url(&self, path: &str) -> anyhow::Result<Url> {
        self.base.join(path).context("failed to join url")
    }

    pub async fn create_parcel(&self, req: &CreateParcelRequest) -> anyhow::Result<Parcel> {
        let res = self
            .client
            .post(self.url("parcels")?)
            .json(req)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn get_parcel(&self, id: Uuid) -> anyhow::Result<Parcel> {
        let res = self
            .client
            .get(self.url(&format!("parcels/{id}"))?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn list_parcels(
        &self,
        sender_email: Option<&str>,
        delivery_status: Option<DeliveryStatus>,
    ) -> anyhow::Result<Vec<Parcel>> {
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(email) = sender_email {
            query.push(("email", email));
        }
        if let Some(status) = delivery_status {
            query.push(("deliveryStatus", status.as_str()));
        }
        let res = self
            .client
            .get(self.url("parcels")?)
            .query(&query)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn delete_parcel(&self, id: Uuid) -> anyhow::Result<()> {
        self.client
            .delete(self.url(&format!("parcels/{id}"))?)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn assign_rider(&self, parcel_id: Uuid, rider_id: Uuid) -> anyhow::Result<Parcel> {
        let res = self
            .client
            .patch(self.url("parcels")?)
            .json(&AssignRiderRequest {
                parcel_id,
                rider_id,
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn update_delivery_status(
        &self,
        parcel_id: Uuid,
        delivery_status: DeliveryStatus,
    ) -> anyhow::Result<Parcel> {
        let res = self
            .client
            .patch(self.url(&format!("parcel/{parcel_id}/status"))?)
            .json(&UpdateStatusRequest { delivery_status })
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn tracking_history(&self, tracking_id: &str) -> anyhow::Result<Vec<TrackingEvent>> {
        let res = self
            .client
            .get(self.url(&format!("parcelTracing/{tracking_id}"))?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn begin_checkout(&self, parcel_id: Uuid) -> anyhow::Result<CheckoutSessionResponse> {
        let res = self
            .client
            .post(self.url("create-checkout-session")?)
            .json(&BeginCheckoutRequest { parcel_id })
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn complete_checkout(&self, session_id: &str) -> anyhow::Result<PaymentSuccess> {
        let res = self
            .client
            .patch(self.url("payment-success")?)
            .query(&[("session_id", session_id)])
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn payments(&self, customer_email: Option<&str>) -> anyhow::Result<Vec<PaymentRecord>> {
        let query: Vec<(&str, &str)> = customer_email.map(|e| ("email", e)).into_iter().collect();
        let res = self
            .client
            .get(self.url("payments")?)
            .query(&query)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }
}

impl CourierClientBuilder {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(
        mut self,
        key: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> anyhow::Result<Self> {
        let header_name =
            HeaderName::from_bytes(key.as_ref().as_bytes()).context("invalid header name")?;
        let header_value = HeaderValue::from_str(value.as_ref()).context("invalid header value")?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    /// Sends `Authorization: Bearer <token>` with every request.
    pub fn with_bearer_token(mut self, token: impl AsRef<str>) -> anyhow::Result<Self> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.as_ref()))
            .context("invalid bearer token")?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(self)
    }

    pub fn with_reqwest_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> anyhow::Result<CourierClient> {
        if let Some(client) = self.client {
            return Ok(CourierClient {
                base: self.base,
                client,
            });
        }

        let mut builder = reqwest::Client::builder();
        if !self.headers.is_empty() {
            builder = builder.default_headers(self.headers);
        }
        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build()?;
        Ok(CourierClient {
            base: self.base,
            client,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateParcelRequest {
    pub parcel_name: String,
    pub courier_cost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_email: Option<String>,
    /// Receiver, addresses, weight and any other client-defined fields.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionResponse {
    pub url: String,
    pub session_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PaymentSuccess {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "trackingID", default)]
    pub tracking_id: Option<String>,
    #[serde(rename = "transactionID", default)]
    pub transaction_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct AssignRiderRequest {
    parcel_id: Uuid,
    rider_id: Uuid,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct UpdateStatusRequest {
    delivery_status: DeliveryStatus,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct BeginCheckoutRequest {
    parcel_id: Uuid,
}
