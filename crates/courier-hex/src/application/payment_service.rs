use std::sync::Arc;

use chrono::Utc;
use courier_types::domain::parcel::{DeliveryStatus, LifecycleError, Parcel, PaymentStatus};
use courier_types::domain::payment::PaymentRecord;
use courier_types::ports::checkout::{
    CheckoutGateway, CheckoutRequest, CheckoutSession, SessionDetails, SessionPaymentStatus,
};
use courier_types::ports::store::{CourierStore, RepoError};
use uuid::Uuid;

use crate::application::tracking_logger::TrackingLogger;
use crate::errors::AppError;

pub const CHECKOUT_CURRENCY: &str = "usd";

#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutOutcome {
    /// This call recorded the payment.
    Completed(PaymentRecord),
    /// The transaction was recorded earlier; nothing was written.
    AlreadyRecorded(PaymentRecord),
    /// The parcel was already paid by another transaction. This payment was
    /// recorded but the parcel was left as it was.
    DoublePayment(PaymentRecord),
    /// The provider does not report the session as paid; nothing was written.
    NotPaid,
}

pub struct PaymentService<S: CourierStore> {
    store: Arc<S>,
    gateway: Arc<dyn CheckoutGateway>,
    tracking: TrackingLogger<S>,
    site_domain: String,
}

impl<S: CourierStore> PaymentService<S> {
    pub fn new(store: Arc<S>, gateway: Arc<dyn CheckoutGateway>, site_domain: String) -> Self {
        Self {
            tracking: TrackingLogger::new(store.clone()),
            store,
            gateway,
            site_domain: site_domain.trim_end_matches('/').to_string(),
        }
    }

    pub async fn begin_checkout(&self, parcel_id: Uuid) -> Result<CheckoutSession, AppError> {
        let parcel = self
            .store
            .find_parcel(parcel_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("parcel {}", parcel_id)))?;
        if parcel.payment_status == PaymentStatus::Paid {
            return Err(AppError::Conflict(format!("parcel {} is already paid", parcel_id)));
        }

        let req = CheckoutRequest {
            parcel_id: parcel.id,
            parcel_name: parcel.parcel_name.clone(),
            customer_email: parcel.sender_email.clone(),
            currency: CHECKOUT_CURRENCY.into(),
            unit_amount: parcel.cost_in_minor_units(),
            success_url: format!(
                "{}/dashboard/paymentSuccess?session_id={{CHECKOUT_SESSION_ID}}",
                self.site_domain
            ),
            cancel_url: format!("{}/dashboard/paymentCancel", self.site_domain),
        };
        let session = self.gateway.create_session(&req).await?;
        tracing::info!(parcel_id = %parcel.id, session_id = %session.id, "checkout session created");
        Ok(session)
    }

    /// Idempotent on the provider's payment-intent id.
    pub async fn complete_checkout(&self, session_id: &str) -> Result<CheckoutOutcome, AppError> {
        let session = self.gateway.retrieve_session(session_id).await?;

        if let Some(transaction_id) = session.payment_intent.as_deref() {
            if let Some(existing) = self.store.find_payment_by_transaction(transaction_id).await? {
                tracing::debug!(transaction_id, "checkout already recorded");
                return Ok(CheckoutOutcome::AlreadyRecorded(existing));
            }
        }
        if session.payment_status != SessionPaymentStatus::Paid {
            tracing::info!(session_id, status = ?session.payment_status, "checkout not paid");
            return Ok(CheckoutOutcome::NotPaid);
        }

        let transaction_id = session
            .payment_intent
            .clone()
            .ok_or_else(|| AppError::Upstream("paid session has no payment intent".into()))?;
        let parcel_id = session
            .parcel_id
            .as_deref()
            .ok_or_else(|| AppError::Upstream("session has no parcelId metadata".into()))
            .and_then(|id| {
                Uuid::parse_str(id).map_err(|e| AppError::Upstream(format!("bad parcelId: {e}")))
            })?;

        let mut parcel = self
            .store
            .find_parcel(parcel_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("parcel {}", parcel_id)))?;
        let before = parcel.clone();
        match parcel.mark_paid() {
            Ok(()) => {}
            Err(LifecycleError::AlreadyPaid) => {
                return self.record_double_payment(&session, &transaction_id, &before).await;
            }
            Err(e) => return self.already_recorded_or(&transaction_id, e.into()).await,
        }
        if !self
            .store
            .replace_parcel_if(before.delivery_status, &parcel)
            .await?
        {
            let lost = AppError::Conflict(format!("parcel {} changed during checkout", parcel_id));
            return self.already_recorded_or(&transaction_id, lost).await;
        }

        let record = payment_record(&session, &transaction_id, &parcel);
        let record = match self.store.insert_payment(record).await {
            Ok(record) => record,
            Err(RepoError::Duplicate(_)) => {
                let lost = AppError::Conflict(format!("transaction {} recorded twice", transaction_id));
                return self.already_recorded_or(&transaction_id, lost).await;
            }
            Err(e) => {
                self.restore(&parcel, &before).await;
                return Err(e.into());
            }
        };

        tracing::info!(
            parcel_id = %parcel.id,
            tracking_id = %parcel.tracking_id,
            transaction_id = %record.transaction_id,
            "payment recorded"
        );
        self.tracking
            .record(&parcel.tracking_id, DeliveryStatus::PendingPickup)
            .await;
        Ok(CheckoutOutcome::Completed(record))
    }

    /// Payments are only visible to the customer who made them.
    pub async fn payment_history(
        &self,
        caller_email: &str,
        customer_email: Option<String>,
    ) -> Result<Vec<PaymentRecord>, AppError> {
        let email = customer_email.unwrap_or_else(|| caller_email.to_string());
        if email != caller_email {
            return Err(AppError::Forbidden("Forbidden access".into()));
        }
        Ok(self.store.list_payments(Some(&email)).await?)
    }

    /// Records a second paid session against an already-paid parcel. The parcel
    /// and its tracking log stay as they are.
    async fn record_double_payment(
        &self,
        session: &SessionDetails,
        transaction_id: &str,
        parcel: &Parcel,
    ) -> Result<CheckoutOutcome, AppError> {
        let record = payment_record(session, transaction_id, parcel);
        match self.store.insert_payment(record).await {
            Ok(record) => {
                tracing::warn!(
                    parcel_id = %parcel.id,
                    transaction_id,
                    "parcel paid more than once"
                );
                Ok(CheckoutOutcome::DoublePayment(record))
            }
            Err(RepoError::Duplicate(_)) => {
                let lost =
                    AppError::Conflict(format!("transaction {} recorded twice", transaction_id));
                self.already_recorded_or(transaction_id, lost).await
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn already_recorded_or(
        &self,
        transaction_id: &str,
        fallback: AppError,
    ) -> Result<CheckoutOutcome, AppError> {
        match self.store.find_payment_by_transaction(transaction_id).await? {
            Some(existing) => Ok(CheckoutOutcome::AlreadyRecorded(existing)),
            None => Err(fallback),
        }
    }

    async fn restore(&self, current: &Parcel, before: &Parcel) {
        match self
            .store
            .replace_parcel_if(current.delivery_status, before)
            .await
        {
            Ok(true) => tracing::warn!(parcel_id = %before.id, "payment update compensated"),
            Ok(false) => {
                tracing::error!(parcel_id = %before.id, "parcel changed before compensation")
            }
            Err(e) => {
                tracing::error!(parcel_id = %before.id, error = %e, "payment compensation failed")
            }
        }
    }
}

fn payment_record(session: &SessionDetails, transaction_id: &str, parcel: &Parcel) -> PaymentRecord {
    PaymentRecord {
        id: Uuid::new_v4(),
        transaction_id: transaction_id.to_string(),
        parcel_id: parcel.id,
        parcel_name: session
            .parcel_name
            .clone()
            .unwrap_or_else(|| parcel.parcel_name.clone()),
        customer_email: session
            .customer_email
            .clone()
            .unwrap_or_else(|| parcel.sender_email.clone()),
        amount: session.amount_total as f64 / 100.0,
        currency: session.currency.clone(),
        payment_status: PaymentStatus::Paid,
        tracking_id: parcel.tracking_id.clone(),
        paid_at: Utc::now(),
    }
}
