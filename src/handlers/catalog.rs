use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde_json::Value;

use crate::errors::AppError;
use crate::state::AppState;
use crate::store::{
    is_well_formed_id, DeleteResult, Filter, InsertResult, Sort, CATEGORIES, COVERAGE_AREAS,
    SERVICES,
};

// Catalog collections are uniform "write what was sent" CRUD over the
// document store; the core never reads them back for invariants.

async fn add_doc(
    state: &AppState,
    collection: &str,
    body: Value,
) -> Result<Json<InsertResult>, AppError> {
    if !body.is_object() {
        return Err(AppError::Validation("request body must be an object".to_string()));
    }
    let result = state.store.insert_one(collection, body).await?;
    Ok(Json(result))
}

async fn list_docs(state: &AppState, collection: &str) -> Result<Json<Vec<Value>>, AppError> {
    let docs = state
        .store
        .find(collection, &Filter::new(), Sort::NewestFirst)
        .await?;
    Ok(Json(docs))
}

async fn delete_doc(
    state: &AppState,
    collection: &str,
    id: &str,
) -> Result<Json<DeleteResult>, AppError> {
    if !is_well_formed_id(id) {
        return Ok(Json(DeleteResult { deleted: 0 }));
    }
    let result = state.store.delete_one(collection, id).await?;
    Ok(Json(result))
}

// POST /addservice
pub async fn add_service(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<Json<InsertResult>, AppError> {
    add_doc(&state, SERVICES, body).await
}

// GET /allservices
pub async fn all_services(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Value>>, AppError> {
    list_docs(&state, SERVICES).await
}

// GET /service/:id
pub async fn get_service(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    if !is_well_formed_id(&id) {
        return Ok(Json(Value::Null));
    }
    match state.store.find_one(SERVICES, &id).await? {
        Some(doc) => Ok(Json(doc)),
        None => Err(AppError::NotFound(format!("service {id}"))),
    }
}

// DELETE /deleteservice/:id
pub async fn delete_service(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResult>, AppError> {
    delete_doc(&state, SERVICES, &id).await
}

// POST /addcategory
pub async fn add_category(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<Json<InsertResult>, AppError> {
    add_doc(&state, CATEGORIES, body).await
}

// GET /allcategories
pub async fn all_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Value>>, AppError> {
    list_docs(&state, CATEGORIES).await
}

// DELETE /deletecategory/:id
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResult>, AppError> {
    delete_doc(&state, CATEGORIES, &id).await
}

// POST /addcoverage
pub async fn add_coverage(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<Json<InsertResult>, AppError> {
    add_doc(&state, COVERAGE_AREAS, body).await
}

// GET /allcoverage
pub async fn all_coverage(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Value>>, AppError> {
    list_docs(&state, COVERAGE_AREAS).await
}

// DELETE /deletecoverage/:id
pub async fn delete_coverage(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResult>, AppError> {
    delete_doc(&state, COVERAGE_AREAS, &id).await
}
