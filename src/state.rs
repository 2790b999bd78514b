use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::bookings::BookingEngine;
use crate::services::identity::IdentityVerifier;
use crate::services::reconcile::PaymentReconciler;
use crate::store::DocumentStore;

pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn DocumentStore>,
    pub bookings: BookingEngine,
    pub payments: PaymentReconciler,
    pub identity: IdentityVerifier,
}
