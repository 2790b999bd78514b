use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use super::verified_email;
use crate::errors::AppError;
use crate::models::Payment;
use crate::services::reconcile::{CheckoutInput, ReconcileOutcome};
use crate::state::AppState;

// POST /create-checkout-session
pub async fn create_checkout_session(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CheckoutInput>,
) -> Result<Json<serde_json::Value>, AppError> {
    let url = state.payments.initiate_checkout(body).await?;
    Ok(Json(serde_json::json!({ "url": url })))
}

// PATCH /payment-success?session_id
#[derive(Deserialize)]
pub struct PaymentSuccessQuery {
    pub session_id: String,
}

pub async fn payment_success(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PaymentSuccessQuery>,
) -> Result<Json<ReconcileOutcome>, AppError> {
    let outcome = state.payments.reconcile(&query.session_id).await?;
    match &outcome {
        ReconcileOutcome::Completed { tracking_id, transaction_id, .. } => {
            tracing::info!(%tracking_id, %transaction_id, "payment reconciled");
        }
        ReconcileOutcome::AlreadyProcessed { transaction_id, .. } => {
            tracing::info!(%transaction_id, "payment already reconciled");
        }
        ReconcileOutcome::Incomplete { payment_status } => {
            tracing::warn!(%payment_status, session_id = %query.session_id, "session not paid");
        }
    }
    Ok(Json(outcome))
}

// GET /payments?email
#[derive(Deserialize)]
pub struct PaymentsQuery {
    pub email: Option<String>,
}

pub async fn list_payments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<PaymentsQuery>,
) -> Result<Json<Vec<Payment>>, AppError> {
    let caller = verified_email(&headers, &state.identity)?;
    if let Some(email) = &query.email {
        if &caller != email {
            return Err(AppError::Forbidden);
        }
    }

    let payments = state.payments.list_payments(query.email.as_deref()).await?;
    Ok(Json(payments))
}
