use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::decode;
use super::gateway::{CheckoutMetadata, CheckoutRequest, PaymentGateway};
use crate::errors::AppError;
use crate::models::{Booking, Payment};
use crate::store::{
    is_well_formed_id, DocumentStore, Filter, Sort, StoreError, UpdateResult, BOOKINGS, PAYMENTS,
};

#[derive(Clone, Debug)]
pub struct CheckoutConfig {
    pub success_url: String,
    pub cancel_url: String,
    pub currency: String,
}

/// Bridges the gateway's asynchronous checkout result into durable,
/// exactly-once local state. The payments unique index, not the
/// read-before-insert, is what makes concurrent reconciliations safe.
pub struct PaymentReconciler {
    store: Arc<dyn DocumentStore>,
    gateway: Arc<dyn PaymentGateway>,
    checkout: CheckoutConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutInput {
    pub booking_id: String,
    pub price: f64,
    pub service_name: String,
    pub customer_email: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Fresh completion: booking marked paid and one Payment row inserted.
    #[serde(rename_all = "camelCase")]
    Completed {
        tracking_id: String,
        transaction_id: String,
        booking_update: UpdateResult,
        payment_id: String,
    },
    /// The transaction was already recorded; prior results are returned
    /// and nothing is re-mutated. A success signal, not an error.
    #[serde(rename_all = "camelCase")]
    AlreadyProcessed {
        tracking_id: String,
        transaction_id: String,
    },
    /// Session exists but has not been paid; no mutation performed.
    #[serde(rename_all = "camelCase")]
    Incomplete { payment_status: String },
}

impl PaymentReconciler {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        gateway: Arc<dyn PaymentGateway>,
        checkout: CheckoutConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            checkout,
        }
    }

    /// Builds a single-line-item checkout session and returns the
    /// gateway's redirect URL.
    pub async fn initiate_checkout(&self, input: CheckoutInput) -> Result<String, AppError> {
        if !input.price.is_finite() || input.price <= 0.0 {
            return Err(AppError::Validation(
                "price must be a positive number".to_string(),
            ));
        }

        let req = CheckoutRequest {
            unit_amount: to_minor_units(input.price),
            currency: self.checkout.currency.clone(),
            product_name: input.service_name.clone(),
            customer_email: input.customer_email,
            success_url: self.checkout.success_url.clone(),
            cancel_url: self.checkout.cancel_url.clone(),
            metadata: CheckoutMetadata {
                booking_id: input.booking_id,
                service_name: input.service_name,
            },
        };

        let session = self
            .gateway
            .create_checkout_session(&req)
            .await
            .map_err(|e| AppError::Gateway(e.to_string()))?;

        Ok(session.url)
    }

    /// Idempotent reconciliation of a checkout session. Write ordering:
    /// existence check, booking update, payment insert; a duplicate-key
    /// insert means a concurrent reconciliation already recorded the
    /// transaction and is folded into the already-processed outcome.
    pub async fn reconcile(&self, session_id: &str) -> Result<ReconcileOutcome, AppError> {
        let session = self
            .gateway
            .retrieve_session(session_id)
            .await
            .map_err(|e| AppError::Gateway(e.to_string()))?;
        let transaction_id = session.transaction_id.clone();

        if let Some(existing) = self.find_payment(&transaction_id).await? {
            return Ok(ReconcileOutcome::AlreadyProcessed {
                tracking_id: existing.tracking_id,
                transaction_id,
            });
        }

        if !session.is_paid() {
            return Ok(ReconcileOutcome::Incomplete {
                payment_status: session.payment_status,
            });
        }

        // The session id comes from the client; only act on sessions whose
        // metadata points at a booking we actually hold.
        let booking_id = session.metadata.booking_id.clone();
        if !is_well_formed_id(&booking_id) {
            return Err(AppError::NotFound(format!("booking {booking_id}")));
        }
        let booking_doc = self
            .store
            .find_one(BOOKINGS, &booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;
        let booking: Booking = decode(booking_doc)?;

        let now = Utc::now();
        let tracking_id = generate_tracking_id(now);

        let booking_update = self
            .store
            .update_one(
                BOOKINGS,
                &booking_id,
                json!({
                    "paymentStatus": "paid",
                    "trackingId": tracking_id,
                }),
            )
            .await?;

        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            amount: session.amount_total as f64 / 100.0,
            currency: session.currency.clone(),
            customer_email: session
                .customer_email
                .clone()
                .unwrap_or(booking.customer_email),
            booking_id: booking_id.clone(),
            service_name: session.metadata.service_name.clone(),
            transaction_id: transaction_id.clone(),
            payment_status: session.payment_status.clone(),
            paid_at: now,
            tracking_id: tracking_id.clone(),
        };
        let payment_doc = serde_json::to_value(&payment).map_err(StoreError::from)?;

        match self.store.insert_one(PAYMENTS, payment_doc).await {
            Ok(insert) => Ok(ReconcileOutcome::Completed {
                tracking_id,
                transaction_id,
                booking_update,
                payment_id: insert.inserted_id,
            }),
            Err(StoreError::DuplicateKey { .. }) => {
                // A concurrent reconciliation won the insert. Adopt its
                // record and repair the booking's tracking id to match.
                let winner = self.find_payment(&transaction_id).await?.ok_or_else(|| {
                    AppError::Store(StoreError::Backend(
                        "payment record missing after duplicate-key conflict".to_string(),
                    ))
                })?;
                self.store
                    .update_one(
                        BOOKINGS,
                        &booking_id,
                        json!({ "trackingId": winner.tracking_id }),
                    )
                    .await?;
                Ok(ReconcileOutcome::AlreadyProcessed {
                    tracking_id: winner.tracking_id,
                    transaction_id,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list_payments(&self, email: Option<&str>) -> Result<Vec<Payment>, AppError> {
        let mut filter = Filter::new();
        if let Some(email) = email {
            filter = filter.eq("customerEmail", email);
        }
        let docs = self.store.find(PAYMENTS, &filter, Sort::NewestFirst).await?;
        docs.into_iter().map(decode).collect()
    }

    async fn find_payment(&self, transaction_id: &str) -> Result<Option<Payment>, AppError> {
        let filter = Filter::new().eq("transactionId", transaction_id);
        match self.store.find_one_by(PAYMENTS, &filter).await? {
            Some(doc) => Ok(Some(decode(doc)?)),
            None => Ok(None),
        }
    }
}

fn to_minor_units(price: f64) -> i64 {
    (price * 100.0).round() as i64
}

fn generate_tracking_id(now: DateTime<Utc>) -> String {
    // Millisecond timestamp plus a random suffix drawn from a v4 UUID.
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(6).collect();
    format!("TRK-{}-{}", now.timestamp_millis(), suffix)
}
