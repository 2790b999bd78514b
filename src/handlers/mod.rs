pub mod bookings;
pub mod catalog;
pub mod decorators;
pub mod dev;
pub mod health;
pub mod payments;
pub mod users;

use axum::http::HeaderMap;

use crate::errors::AppError;
use crate::services::identity::IdentityVerifier;

/// Extracts and verifies the bearer credential, returning the caller's
/// email for downstream authorization checks.
pub fn verified_email(
    headers: &HeaderMap,
    verifier: &IdentityVerifier,
) -> Result<String, AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    verifier.verify(token).ok_or(AppError::Unauthorized)
}
