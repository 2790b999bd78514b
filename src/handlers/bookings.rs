use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use super::verified_email;
use crate::errors::AppError;
use crate::models::{AssignDecorator, Booking, BookingStatus, NewBooking};
use crate::state::AppState;
use crate::store::{DeleteResult, InsertResult, UpdateResult};

// POST /addbooking
pub async fn add_booking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewBooking>,
) -> Result<Json<InsertResult>, AppError> {
    let booking = state.bookings.create(body).await?;
    tracing::info!(booking_id = %booking.id, customer = %booking.customer_email, "booking created");
    Ok(Json(InsertResult {
        inserted_id: booking.id,
    }))
}

// GET /allbookings?email&status
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub email: Option<String>,
    pub status: Option<String>,
}

pub async fn all_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    // A customer-scoped listing only reveals the caller's own bookings.
    if let Some(email) = &query.email {
        let caller = verified_email(&headers, &state.identity)?;
        if &caller != email {
            return Err(AppError::Forbidden);
        }
    }

    let bookings = state
        .bookings
        .list(query.email.as_deref(), query.status.as_deref())
        .await?;
    Ok(Json(bookings))
}

// GET /booking/decorator?decoratorEmail&status
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecoratorBookingsQuery {
    pub decorator_email: String,
    pub status: Option<String>,
}

pub async fn decorator_bookings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DecoratorBookingsQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let bookings = state
        .bookings
        .for_decorator(&query.decorator_email, query.status.as_deref())
        .await?;
    Ok(Json(bookings))
}

// GET /booking/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    if !crate::store::is_well_formed_id(&id) {
        // Malformed ids resolve to an empty result, not an error.
        return Ok(Json(Value::Null));
    }

    match state.bookings.get(&id).await? {
        Some(booking) => Ok(Json(serde_json::to_value(booking).map_err(
            |e| AppError::Store(crate::store::StoreError::Backend(e.to_string())),
        )?)),
        None => Err(AppError::NotFound(format!("booking {id}"))),
    }
}

// PATCH /booking/:id
pub async fn assign_decorator(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<AssignDecorator>,
) -> Result<Json<UpdateResult>, AppError> {
    let result = state.bookings.assign(&id, body).await?;
    tracing::info!(booking_id = %id, "decorator assigned");
    Ok(Json(result))
}

// PATCH /booking/:id/status
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: String,
    pub decorator_id: Option<String>,
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<UpdateResult>, AppError> {
    let status = BookingStatus::parse(&body.status)
        .ok_or_else(|| AppError::Validation(format!("unknown status: {}", body.status)))?;

    let result = state
        .bookings
        .set_status(&id, status, body.decorator_id.as_deref())
        .await?;
    tracing::info!(booking_id = %id, status = %status.as_str(), "booking status updated");
    Ok(Json(result))
}

// DELETE /deletebooking/:id
pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResult>, AppError> {
    let result = state.bookings.delete(&id).await?;
    Ok(Json(result))
}
