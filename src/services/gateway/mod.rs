pub mod stripe;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Metadata embedded in a checkout session; the gateway echoes it back
/// unmodified when the session is retrieved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutMetadata {
    pub booking_id: String,
    pub service_name: String,
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Minor currency units (cents) for a single line item, quantity 1.
    pub unit_amount: i64,
    pub currency: String,
    pub product_name: String,
    pub customer_email: String,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: CheckoutMetadata,
}

#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct SessionDetails {
    pub id: String,
    /// The gateway's transaction id; the idempotency key for reconciliation.
    pub transaction_id: String,
    pub payment_status: String,
    /// Minor currency units.
    pub amount_total: i64,
    pub currency: String,
    pub customer_email: Option<String>,
    pub metadata: CheckoutMetadata,
}

impl SessionDetails {
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        req: &CheckoutRequest,
    ) -> anyhow::Result<CheckoutSession>;

    async fn retrieve_session(&self, session_id: &str) -> anyhow::Result<SessionDetails>;
}
