use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use super::decode;
use crate::errors::AppError;
use crate::models::{AssignDecorator, Booking, BookingStatus, NewBooking, PaymentStatus};
use crate::models::WorkStatus;
use crate::store::{
    is_well_formed_id, DeleteResult, DocumentStore, Filter, Sort, UpdateResult, BOOKINGS,
    DECORATORS,
};

/// Owns booking status transitions and the decorator availability
/// coupling. Constructed once at startup with the store injected.
pub struct BookingEngine {
    store: Arc<dyn DocumentStore>,
}

impl BookingEngine {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, req: NewBooking) -> Result<Booking, AppError> {
        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4().to_string(),
            customer_email: req.customer_email,
            service_id: req.service_id,
            service_name: req.service_name,
            booking_date: req.booking_date,
            details: req.details,
            price: req.price,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            tracking_id: None,
            decorator: None,
            created_at: now,
            updated_at: now,
        };

        let doc = serde_json::to_value(&booking).map_err(crate::store::StoreError::from)?;
        self.store.insert_one(BOOKINGS, doc).await?;
        Ok(booking)
    }

    pub async fn list(
        &self,
        email: Option<&str>,
        status: Option<&str>,
    ) -> Result<Vec<Booking>, AppError> {
        let mut filter = Filter::new();
        if let Some(email) = email {
            filter = filter.eq("customerEmail", email);
        }
        if let Some(status) = status {
            filter = filter.eq("status", status);
        }

        let docs = self.store.find(BOOKINGS, &filter, Sort::NewestFirst).await?;
        docs.into_iter().map(decode).collect()
    }

    /// Active workload for a decorator: everything assigned to them that
    /// has not reached the terminal status.
    pub async fn for_decorator(
        &self,
        decorator_email: &str,
        status: Option<&str>,
    ) -> Result<Vec<Booking>, AppError> {
        let mut filter = Filter::new()
            .eq("decoratorEmail", decorator_email)
            .ne("status", BookingStatus::Completed.as_str());
        if let Some(status) = status {
            filter = filter.eq("status", status);
        }

        let docs = self.store.find(BOOKINGS, &filter, Sort::NewestFirst).await?;
        docs.into_iter().map(decode).collect()
    }

    pub async fn get(&self, id: &str) -> Result<Option<Booking>, AppError> {
        if !is_well_formed_id(id) {
            return Ok(None);
        }
        match self.store.find_one(BOOKINGS, id).await? {
            Some(doc) => Ok(Some(decode(doc)?)),
            None => Ok(None),
        }
    }

    /// Transitions the booking to `assigned` and claims the decorator.
    /// The decorator claim is conditional on availability, so two
    /// concurrent assignments cannot both succeed; if the booking write
    /// then fails, the claim is released as a compensating step.
    ///
    /// The decorator-mutation result is the primary response.
    pub async fn assign(
        &self,
        booking_id: &str,
        req: AssignDecorator,
    ) -> Result<UpdateResult, AppError> {
        if !is_well_formed_id(booking_id) {
            return Ok(UpdateResult { matched: 0, modified: 0 });
        }

        let doc = self
            .store
            .find_one(BOOKINGS, booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;
        let booking: Booking = decode(doc)?;

        if !booking.status.can_advance_to(BookingStatus::Assigned) {
            return Err(AppError::InvalidTransition {
                from: booking.status.as_str().to_string(),
                to: BookingStatus::Assigned.as_str().to_string(),
            });
        }

        if self
            .store
            .find_one(DECORATORS, &req.decorator_id)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound(format!("decorator {}", req.decorator_id)));
        }

        let claim = self
            .store
            .update_one_if(
                DECORATORS,
                &req.decorator_id,
                &Filter::new().eq("workStatus", WorkStatus::Available.as_str()),
                json!({ "workStatus": WorkStatus::InProject.as_str() }),
            )
            .await?;
        if claim.matched == 0 {
            return Err(AppError::DecoratorBusy);
        }

        let patch = json!({
            "status": BookingStatus::Assigned.as_str(),
            "decoratorId": req.decorator_id,
            "decoratorName": req.decorator_name,
            "decoratorEmail": req.decorator_email,
            "updatedAt": Utc::now().to_rfc3339(),
        });

        match self.store.update_one(BOOKINGS, booking_id, patch).await {
            Ok(update) if update.matched > 0 => Ok(claim),
            Ok(_) => {
                self.release_decorator(&req.decorator_id).await;
                Err(AppError::NotFound(format!("booking {booking_id}")))
            }
            Err(e) => {
                self.release_decorator(&req.decorator_id).await;
                Err(e.into())
            }
        }
    }

    /// Advances the booking status. Regressions are rejected; reaching
    /// `completed` requires a decorator id and releases that decorator
    /// back to availability, and a failure of that secondary write
    /// propagates instead of being dropped.
    pub async fn set_status(
        &self,
        booking_id: &str,
        new_status: BookingStatus,
        decorator_id: Option<&str>,
    ) -> Result<UpdateResult, AppError> {
        if !is_well_formed_id(booking_id) {
            return Ok(UpdateResult { matched: 0, modified: 0 });
        }

        let doc = self
            .store
            .find_one(BOOKINGS, booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;
        let booking: Booking = decode(doc)?;

        if !booking.status.can_advance_to(new_status) {
            return Err(AppError::InvalidTransition {
                from: booking.status.as_str().to_string(),
                to: new_status.as_str().to_string(),
            });
        }

        let completing = new_status == BookingStatus::Completed;
        let release_id = if completing {
            match decorator_id {
                Some(id) => Some(id.to_string()),
                None => {
                    return Err(AppError::Validation(
                        "decoratorId is required when completing a booking".to_string(),
                    ))
                }
            }
        } else {
            None
        };

        let update = self
            .store
            .update_one(
                BOOKINGS,
                booking_id,
                json!({
                    "status": new_status.as_str(),
                    "updatedAt": Utc::now().to_rfc3339(),
                }),
            )
            .await?;

        if let Some(decorator_id) = release_id {
            let released = self
                .store
                .update_one(
                    DECORATORS,
                    &decorator_id,
                    json!({ "workStatus": WorkStatus::Available.as_str() }),
                )
                .await?;
            if released.matched == 0 {
                return Err(AppError::NotFound(format!("decorator {decorator_id}")));
            }
        }

        Ok(update)
    }

    /// Unconditional removal; bypasses state checks.
    pub async fn delete(&self, booking_id: &str) -> Result<DeleteResult, AppError> {
        if !is_well_formed_id(booking_id) {
            return Ok(DeleteResult { deleted: 0 });
        }
        Ok(self.store.delete_one(BOOKINGS, booking_id).await?)
    }

    async fn release_decorator(&self, decorator_id: &str) {
        let patch = json!({ "workStatus": WorkStatus::Available.as_str() });
        if let Err(e) = self.store.update_one(DECORATORS, decorator_id, patch).await {
            tracing::error!(error = %e, decorator_id, "failed to release decorator after assignment failure");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Decorator, DecoratorStatus};
    use crate::store::memory::MemoryStore;

    fn engine() -> (BookingEngine, Arc<dyn DocumentStore>) {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        (BookingEngine::new(Arc::clone(&store)), store)
    }

    fn new_booking() -> NewBooking {
        NewBooking {
            customer_email: "customer@example.com".to_string(),
            service_id: Uuid::new_v4().to_string(),
            service_name: "Wedding Decor".to_string(),
            booking_date: "2026-09-01".to_string(),
            details: None,
            price: 100.0,
        }
    }

    async fn seed_decorator(store: &Arc<dyn DocumentStore>) -> Decorator {
        let decorator = Decorator {
            id: Uuid::new_v4().to_string(),
            name: "Dana".to_string(),
            email: "dana@decor.com".to_string(),
            phone: None,
            area: None,
            status: DecoratorStatus::Approved,
            work_status: WorkStatus::Available,
            created_at: Utc::now(),
        };
        let doc = serde_json::to_value(&decorator).unwrap();
        store.insert_one(DECORATORS, doc).await.unwrap();
        decorator
    }

    fn assign_req(d: &Decorator) -> AssignDecorator {
        AssignDecorator {
            decorator_id: d.id.clone(),
            decorator_name: d.name.clone(),
            decorator_email: d.email.clone(),
        }
    }

    #[tokio::test]
    async fn test_create_starts_pending_unpaid() {
        let (engine, _) = engine();
        let booking = engine.create(new_booking()).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.payment_status, PaymentStatus::Unpaid);
        assert!(booking.tracking_id.is_none());
        assert!(booking.decorator.is_none());
    }

    #[tokio::test]
    async fn test_assign_claims_decorator() {
        let (engine, store) = engine();
        let booking = engine.create(new_booking()).await.unwrap();
        let decorator = seed_decorator(&store).await;

        let result = engine.assign(&booking.id, assign_req(&decorator)).await.unwrap();
        assert_eq!(result.matched, 1);

        let updated = engine.get(&booking.id).await.unwrap().unwrap();
        assert_eq!(updated.status, BookingStatus::Assigned);
        assert_eq!(
            updated.decorator.as_ref().map(|d| d.decorator_id.as_str()),
            Some(decorator.id.as_str())
        );

        let d = store.find_one(DECORATORS, &decorator.id).await.unwrap().unwrap();
        assert_eq!(d["workStatus"], "in_project");
    }

    #[tokio::test]
    async fn test_double_assign_conflicts() {
        let (engine, store) = engine();
        let first = engine.create(new_booking()).await.unwrap();
        let second = engine.create(new_booking()).await.unwrap();
        let decorator = seed_decorator(&store).await;

        engine.assign(&first.id, assign_req(&decorator)).await.unwrap();
        let err = engine.assign(&second.id, assign_req(&decorator)).await.unwrap_err();
        assert!(matches!(err, AppError::DecoratorBusy));

        // The losing booking was not transitioned.
        let b = engine.get(&second.id).await.unwrap().unwrap();
        assert_eq!(b.status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn test_assign_unknown_decorator() {
        let (engine, _) = engine();
        let booking = engine.create(new_booking()).await.unwrap();
        let req = AssignDecorator {
            decorator_id: Uuid::new_v4().to_string(),
            decorator_name: "Ghost".to_string(),
            decorator_email: "ghost@decor.com".to_string(),
        };
        let err = engine.assign(&booking.id, req).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_complete_releases_decorator() {
        let (engine, store) = engine();
        let booking = engine.create(new_booking()).await.unwrap();
        let decorator = seed_decorator(&store).await;

        engine.assign(&booking.id, assign_req(&decorator)).await.unwrap();
        engine
            .set_status(&booking.id, BookingStatus::Completed, Some(&decorator.id))
            .await
            .unwrap();

        let b = engine.get(&booking.id).await.unwrap().unwrap();
        assert_eq!(b.status, BookingStatus::Completed);

        let d = store.find_one(DECORATORS, &decorator.id).await.unwrap().unwrap();
        assert_eq!(d["workStatus"], "available");
    }

    #[tokio::test]
    async fn test_complete_requires_decorator_id() {
        let (engine, _) = engine();
        let booking = engine.create(new_booking()).await.unwrap();
        let err = engine
            .set_status(&booking.id, BookingStatus::Completed, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_status_regression_rejected() {
        let (engine, store) = engine();
        let booking = engine.create(new_booking()).await.unwrap();
        let decorator = seed_decorator(&store).await;
        engine.assign(&booking.id, assign_req(&decorator)).await.unwrap();

        engine
            .set_status(&booking.id, BookingStatus::Setup, None)
            .await
            .unwrap();
        let err = engine
            .set_status(&booking.id, BookingStatus::Planning, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_completed_never_regresses() {
        let (engine, store) = engine();
        let booking = engine.create(new_booking()).await.unwrap();
        let decorator = seed_decorator(&store).await;
        engine.assign(&booking.id, assign_req(&decorator)).await.unwrap();
        engine
            .set_status(&booking.id, BookingStatus::Completed, Some(&decorator.id))
            .await
            .unwrap();

        let err = engine
            .set_status(&booking.id, BookingStatus::Planning, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_malformed_id_soft_empty() {
        let (engine, _) = engine();
        assert!(engine.get("not-an-id").await.unwrap().is_none());
        assert_eq!(engine.delete("not-an-id").await.unwrap().deleted, 0);
        let up = engine
            .set_status("not-an-id", BookingStatus::Planning, None)
            .await
            .unwrap();
        assert_eq!(up.matched, 0);
    }

    #[tokio::test]
    async fn test_delete_is_unconditional() {
        let (engine, store) = engine();
        let booking = engine.create(new_booking()).await.unwrap();
        let decorator = seed_decorator(&store).await;
        engine.assign(&booking.id, assign_req(&decorator)).await.unwrap();

        let del = engine.delete(&booking.id).await.unwrap();
        assert_eq!(del.deleted, 1);
        assert!(engine.get(&booking.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let (engine, store) = engine();
        let a = engine.create(new_booking()).await.unwrap();
        let _b = engine.create(new_booking()).await.unwrap();
        let decorator = seed_decorator(&store).await;
        engine.assign(&a.id, assign_req(&decorator)).await.unwrap();
        engine
            .set_status(&a.id, BookingStatus::Completed, Some(&decorator.id))
            .await
            .unwrap();

        let completed = engine.list(None, Some("completed")).await.unwrap();
        assert_eq!(completed.len(), 1);
        assert!(completed.iter().all(|b| b.status == BookingStatus::Completed));
    }

    #[tokio::test]
    async fn test_for_decorator_excludes_completed() {
        let (engine, store) = engine();
        let decorator = seed_decorator(&store).await;

        let active = engine.create(new_booking()).await.unwrap();
        engine.assign(&active.id, assign_req(&decorator)).await.unwrap();

        let done = engine.create(new_booking()).await.unwrap();
        engine
            .set_status(&active.id, BookingStatus::Completed, Some(&decorator.id))
            .await
            .unwrap();
        engine.assign(&done.id, assign_req(&decorator)).await.unwrap();

        let workload = engine.for_decorator(&decorator.email, None).await.unwrap();
        assert_eq!(workload.len(), 1);
        assert_eq!(workload[0].id, done.id);
    }
}
