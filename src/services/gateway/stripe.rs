use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

use super::{CheckoutMetadata, CheckoutRequest, CheckoutSession, PaymentGateway, SessionDetails};

pub struct StripeGateway {
    secret_key: String,
    api_base: String,
    client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(secret_key: String, api_base: String) -> Self {
        Self {
            secret_key,
            api_base,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct StripeSession {
    id: String,
    url: Option<String>,
    payment_intent: Option<String>,
    payment_status: Option<String>,
    amount_total: Option<i64>,
    currency: Option<String>,
    customer_email: Option<String>,
    customer_details: Option<StripeCustomerDetails>,
    metadata: Option<HashMap<String, String>>,
}

#[derive(Deserialize)]
struct StripeCustomerDetails {
    email: Option<String>,
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(
        &self,
        req: &CheckoutRequest,
    ) -> anyhow::Result<CheckoutSession> {
        let url = format!("{}/v1/checkout/sessions", self.api_base);

        let unit_amount = req.unit_amount.to_string();
        let form = [
            ("mode", "payment"),
            ("customer_email", req.customer_email.as_str()),
            ("success_url", req.success_url.as_str()),
            ("cancel_url", req.cancel_url.as_str()),
            ("line_items[0][quantity]", "1"),
            ("line_items[0][price_data][currency]", req.currency.as_str()),
            ("line_items[0][price_data][unit_amount]", unit_amount.as_str()),
            (
                "line_items[0][price_data][product_data][name]",
                req.product_name.as_str(),
            ),
            ("metadata[bookingId]", req.metadata.booking_id.as_str()),
            ("metadata[serviceName]", req.metadata.service_name.as_str()),
        ];

        let session: StripeSession = self
            .client
            .post(&url)
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await
            .context("failed to create checkout session")?
            .error_for_status()
            .context("checkout session API returned error")?
            .json()
            .await
            .context("failed to decode checkout session")?;

        let redirect = session
            .url
            .context("checkout session missing redirect URL")?;

        Ok(CheckoutSession {
            id: session.id,
            url: redirect,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> anyhow::Result<SessionDetails> {
        let url = format!("{}/v1/checkout/sessions/{}", self.api_base, session_id);

        let session: StripeSession = self
            .client
            .get(&url)
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .context("failed to retrieve checkout session")?
            .error_for_status()
            .context("session retrieval API returned error")?
            .json()
            .await
            .context("failed to decode checkout session")?;

        let metadata = session.metadata.unwrap_or_default();
        let booking_id = metadata
            .get("bookingId")
            .cloned()
            .context("session metadata missing bookingId")?;
        let service_name = metadata.get("serviceName").cloned().unwrap_or_default();

        let customer_email = session
            .customer_email
            .or_else(|| session.customer_details.and_then(|d| d.email));

        Ok(SessionDetails {
            // Fall back to the session id for sessions with no payment
            // intent yet (unpaid sessions).
            transaction_id: session.payment_intent.unwrap_or_else(|| session.id.clone()),
            id: session.id,
            payment_status: session.payment_status.unwrap_or_else(|| "unpaid".to_string()),
            amount_total: session.amount_total.unwrap_or(0),
            currency: session.currency.unwrap_or_default(),
            customer_email,
            metadata: CheckoutMetadata {
                booking_id,
                service_name,
            },
        })
    }
}
