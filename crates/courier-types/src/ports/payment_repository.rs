use async_trait::async_trait;

use crate::domain::payment::PaymentRecord;
use crate::ports::store::RepoError;

#[async_trait]
pub trait PaymentRepository: Send + Sync + 'static {
    /// Fails with [`RepoError::Duplicate`] when the transaction id is already recorded.
    async fn insert_payment(&self, payment: PaymentRecord) -> Result<PaymentRecord, RepoError>;
    async fn find_payment_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<PaymentRecord>, RepoError>;
    /// Newest `paid_at` first.
    async fn list_payments(
        &self,
        customer_email: Option<&str>,
    ) -> Result<Vec<PaymentRecord>, RepoError>;
}
