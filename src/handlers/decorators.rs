use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Decorator, DecoratorStatus, NewDecorator, UserRole};
use crate::state::AppState;
use crate::store::{
    is_well_formed_id, DeleteResult, Filter, InsertResult, Sort, StoreError, UpdateResult,
    DECORATORS, USERS,
};

// POST /adddecorator
pub async fn add_decorator(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewDecorator>,
) -> Result<Json<InsertResult>, AppError> {
    let decorator = Decorator::from_application(Uuid::new_v4().to_string(), body, Utc::now());
    let doc = serde_json::to_value(&decorator).map_err(StoreError::from)?;
    let result = state.store.insert_one(DECORATORS, doc).await?;
    tracing::info!(decorator_id = %result.inserted_id, "decorator application received");
    Ok(Json(result))
}

// GET /alldecorators?status
#[derive(Deserialize)]
pub struct DecoratorsQuery {
    pub status: Option<String>,
}

pub async fn all_decorators(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DecoratorsQuery>,
) -> Result<Json<Vec<Value>>, AppError> {
    let mut filter = Filter::new();
    if let Some(status) = &query.status {
        filter = filter.eq("status", status.as_str());
    }
    let docs = state.store.find(DECORATORS, &filter, Sort::NewestFirst).await?;
    Ok(Json(docs))
}

// PATCH /decorator/:id/status
#[derive(Deserialize)]
pub struct DecoratorStatusRequest {
    pub status: String,
}

/// Administrative approval. Approving a decorator also promotes the
/// linked user account's role.
pub async fn set_decorator_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<DecoratorStatusRequest>,
) -> Result<Json<UpdateResult>, AppError> {
    let status = DecoratorStatus::parse(&body.status)
        .ok_or_else(|| AppError::Validation(format!("unknown decorator status: {}", body.status)))?;

    if !is_well_formed_id(&id) {
        return Ok(Json(UpdateResult { matched: 0, modified: 0 }));
    }

    let doc = state
        .store
        .find_one(DECORATORS, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("decorator {id}")))?;

    let result = state
        .store
        .update_one(DECORATORS, &id, json!({ "status": status.as_str() }))
        .await?;

    if status == DecoratorStatus::Approved {
        let email = doc.get("email").and_then(Value::as_str).unwrap_or("");
        let user = state
            .store
            .find_one_by(USERS, &Filter::new().eq("email", email))
            .await?;
        match user.as_ref().and_then(|u| u.get("_id")).and_then(Value::as_str) {
            Some(user_id) => {
                state
                    .store
                    .update_one(USERS, user_id, json!({ "role": UserRole::Decorator.as_str() }))
                    .await?;
            }
            // A decorator may apply before ever signing in.
            None => tracing::warn!(%email, "no user account to promote for approved decorator"),
        }
    }

    tracing::info!(decorator_id = %id, status = %status.as_str(), "decorator status updated");
    Ok(Json(result))
}

// DELETE /deletedecorator/:id
pub async fn delete_decorator(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResult>, AppError> {
    if !is_well_formed_id(&id) {
        return Ok(Json(DeleteResult { deleted: 0 }));
    }
    let result = state.store.delete_one(DECORATORS, &id).await?;
    Ok(Json(result))
}
