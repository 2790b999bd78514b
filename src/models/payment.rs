use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An append-only ledger row created exactly once per reconciled checkout
/// session. `transaction_id` is the idempotency key; the store enforces
/// its uniqueness.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(rename = "_id")]
    pub id: String,
    /// Major currency units (the gateway reports minor units).
    pub amount: f64,
    pub currency: String,
    pub customer_email: String,
    pub booking_id: String,
    pub service_name: String,
    pub transaction_id: String,
    pub payment_status: String,
    pub paid_at: DateTime<Utc>,
    pub tracking_id: String,
}
