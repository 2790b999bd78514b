use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::state::AppState;

// POST /dev/token
#[derive(Deserialize)]
pub struct TokenRequest {
    pub email: String,
}

/// Dev convenience: mints a signed bearer token for an email, standing in
/// for the upstream auth provider.
pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TokenRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let token = state
        .identity
        .issue(&body.email)
        .ok_or_else(|| AppError::Config("token signing unavailable".to_string()))?;
    Ok(Json(serde_json::json!({ "token": token })))
}
