use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{User, UserRole};
use crate::state::AppState;
use crate::store::{is_well_formed_id, Filter, StoreError, UpdateResult, USERS};

// POST /adduser
#[derive(Deserialize)]
pub struct UpsertUserRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// First sign-in upsert: creates the account with the default role, or
/// returns the existing record untouched.
pub async fn add_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<UpsertUserRequest>,
) -> Result<Json<Value>, AppError> {
    let existing = state
        .store
        .find_one_by(USERS, &Filter::new().eq("email", body.email.as_str()))
        .await?;

    if let Some(doc) = existing {
        let user_id = doc.get("_id").and_then(Value::as_str).unwrap_or_default();
        return Ok(Json(json!({ "userId": user_id, "created": false })));
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        email: body.email,
        name: body.name,
        role: UserRole::User,
        created_at: Utc::now(),
    };
    let doc = serde_json::to_value(&user).map_err(StoreError::from)?;
    let result = state.store.insert_one(USERS, doc).await?;
    Ok(Json(json!({ "userId": result.inserted_id, "created": true })))
}

// GET /user/role?email
#[derive(Deserialize)]
pub struct RoleQuery {
    pub email: String,
}

pub async fn get_user_role(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RoleQuery>,
) -> Result<Json<Value>, AppError> {
    let doc = state
        .store
        .find_one_by(USERS, &Filter::new().eq("email", query.email.as_str()))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", query.email)))?;

    let role = doc.get("role").cloned().unwrap_or(Value::String("user".to_string()));
    Ok(Json(json!({ "role": role })))
}

// PATCH /user/:id/role
#[derive(Deserialize)]
pub struct SetRoleRequest {
    pub role: String,
}

pub async fn set_user_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<SetRoleRequest>,
) -> Result<Json<UpdateResult>, AppError> {
    let role = UserRole::parse(&body.role)
        .ok_or_else(|| AppError::Validation(format!("unknown role: {}", body.role)))?;

    if !is_well_formed_id(&id) {
        return Ok(Json(UpdateResult { matched: 0, modified: 0 }));
    }

    let result = state
        .store
        .update_one(USERS, &id, json!({ "role": role.as_str() }))
        .await?;
    if result.matched == 0 {
        return Err(AppError::NotFound(format!("user {id}")));
    }
    Ok(Json(result))
}
