//! In-process stand-ins for the external providers, used by tests and local runs.

use async_trait::async_trait;
use courier_types::ports::checkout::{
    CheckoutGateway, CheckoutRequest, CheckoutSession, GatewayError, SessionDetails,
    SessionPaymentStatus,
};
use courier_types::ports::identity::{IdentityError, IdentityVerifier, VerifiedIdentity};
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Fixed token → email table.
#[derive(Clone, Default)]
pub struct StaticIdentityVerifier {
    tokens: Arc<DashMap<String, String>>,
}

impl StaticIdentityVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(self, token: impl Into<String>, email: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), email.into());
        self
    }
}

#[async_trait]
impl IdentityVerifier for StaticIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, IdentityError> {
        self.tokens
            .get(token)
            .map(|email| VerifiedIdentity {
                email: email.value().clone(),
            })
            .ok_or_else(|| IdentityError::Invalid("unknown token".into()))
    }
}

struct FakeSession {
    request: CheckoutRequest,
    details: SessionDetails,
}

/// Sessions start unpaid; tests settle them with [`FakeCheckoutGateway::mark_paid`].
#[derive(Clone, Default)]
pub struct FakeCheckoutGateway {
    sessions: Arc<DashMap<String, FakeSession>>,
}

impl FakeCheckoutGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_paid(&self, session_id: &str, payment_intent: &str) -> bool {
        match self.sessions.get_mut(session_id) {
            Some(mut s) => {
                s.details.payment_status = SessionPaymentStatus::Paid;
                s.details.payment_intent = Some(payment_intent.to_string());
                true
            }
            None => false,
        }
    }

    pub fn request_for(&self, session_id: &str) -> Option<CheckoutRequest> {
        self.sessions.get(session_id).map(|s| s.request.clone())
    }
}

#[async_trait]
impl CheckoutGateway for FakeCheckoutGateway {
    async fn create_session(&self, req: &CheckoutRequest) -> Result<CheckoutSession, GatewayError> {
        let id = format!("cs_test_{}", Uuid::new_v4().simple());
        let details = SessionDetails {
            id: id.clone(),
            payment_status: SessionPaymentStatus::Unpaid,
            amount_total: req.unit_amount,
            currency: req.currency.clone(),
            customer_email: Some(req.customer_email.clone()),
            payment_intent: None,
            parcel_id: Some(req.parcel_id.to_string()),
            parcel_name: Some(req.parcel_name.clone()),
        };
        self.sessions.insert(
            id.clone(),
            FakeSession {
                request: req.clone(),
                details,
            },
        );
        Ok(CheckoutSession {
            url: format!("https://checkout.test/pay/{id}"),
            id,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<SessionDetails, GatewayError> {
        self.sessions
            .get(session_id)
            .map(|s| s.details.clone())
            .ok_or_else(|| GatewayError::Rejected(format!("no such session {session_id}")))
    }
}
