use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A customer's booking of a decoration service. Aggregate root of the
/// purchase workflow; decorator identity and tracking id are denormalized
/// onto the document as the lifecycle advances.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: String,
    pub customer_email: String,
    pub service_id: String,
    pub service_name: String,
    pub booking_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub price: f64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_id: Option<String>,
    // Decorator fields are all-or-none; flattening an Option keeps the
    // document shape identical to the wire format.
    #[serde(flatten, default, skip_serializing_if = "Option::is_none")]
    pub decorator: Option<DecoratorRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecoratorRef {
    pub decorator_id: String,
    pub decorator_name: String,
    pub decorator_email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    Pending,
    Assigned,
    Planning,
    Prepared,
    EnRoute,
    Setup,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Assigned => "assigned",
            BookingStatus::Planning => "planning",
            BookingStatus::Prepared => "prepared",
            BookingStatus::EnRoute => "en-route",
            BookingStatus::Setup => "setup",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "assigned" => Some(BookingStatus::Assigned),
            "planning" => Some(BookingStatus::Planning),
            "prepared" => Some(BookingStatus::Prepared),
            "en-route" => Some(BookingStatus::EnRoute),
            "setup" => Some(BookingStatus::Setup),
            "completed" => Some(BookingStatus::Completed),
            _ => None,
        }
    }

    fn ordinal(&self) -> u8 {
        match self {
            BookingStatus::Pending => 0,
            BookingStatus::Assigned => 1,
            BookingStatus::Planning => 2,
            BookingStatus::Prepared => 3,
            BookingStatus::EnRoute => 4,
            BookingStatus::Setup => 5,
            BookingStatus::Completed => 6,
        }
    }

    /// Forward moves (including skips) are allowed; regressions are not.
    /// `Completed` is terminal.
    pub fn can_advance_to(&self, next: BookingStatus) -> bool {
        if *self == BookingStatus::Completed {
            return next == BookingStatus::Completed;
        }
        next.ordinal() >= self.ordinal()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub customer_email: String,
    pub service_id: String,
    pub service_name: String,
    pub booking_date: String,
    #[serde(default)]
    pub details: Option<String>,
    pub price: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignDecorator {
    pub decorator_id: String,
    pub decorator_name: String,
    pub decorator_email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions_allowed() {
        assert!(BookingStatus::Pending.can_advance_to(BookingStatus::Assigned));
        assert!(BookingStatus::Assigned.can_advance_to(BookingStatus::Planning));
        assert!(BookingStatus::Setup.can_advance_to(BookingStatus::Completed));
    }

    #[test]
    fn test_forward_skip_allowed() {
        assert!(BookingStatus::Assigned.can_advance_to(BookingStatus::Setup));
        assert!(BookingStatus::Pending.can_advance_to(BookingStatus::Completed));
    }

    #[test]
    fn test_regression_rejected() {
        assert!(!BookingStatus::Setup.can_advance_to(BookingStatus::Planning));
        assert!(!BookingStatus::Assigned.can_advance_to(BookingStatus::Pending));
    }

    #[test]
    fn test_completed_is_terminal() {
        assert!(!BookingStatus::Completed.can_advance_to(BookingStatus::Setup));
        assert!(!BookingStatus::Completed.can_advance_to(BookingStatus::Pending));
        // Re-stating the terminal status is a no-op, not a regression.
        assert!(BookingStatus::Completed.can_advance_to(BookingStatus::Completed));
    }

    #[test]
    fn test_status_serializes_kebab_case() {
        let json = serde_json::to_string(&BookingStatus::EnRoute).unwrap();
        assert_eq!(json, r#""en-route""#);
        assert_eq!(BookingStatus::parse("en-route"), Some(BookingStatus::EnRoute));
    }

    #[test]
    fn test_decorator_fields_all_or_none() {
        let now = Utc::now();
        let booking = Booking {
            id: "b1".to_string(),
            customer_email: "a@b.com".to_string(),
            service_id: "s1".to_string(),
            service_name: "Wedding Decor".to_string(),
            booking_date: "2026-09-01".to_string(),
            details: None,
            price: 100.0,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            tracking_id: None,
            decorator: None,
            created_at: now,
            updated_at: now,
        };
        let doc = serde_json::to_value(&booking).unwrap();
        assert!(doc.get("decoratorId").is_none());
        assert!(doc.get("decoratorName").is_none());

        let assigned = Booking {
            decorator: Some(DecoratorRef {
                decorator_id: "d1".to_string(),
                decorator_name: "Dana".to_string(),
                decorator_email: "dana@decor.com".to_string(),
            }),
            ..booking
        };
        let doc = serde_json::to_value(&assigned).unwrap();
        assert_eq!(doc["decoratorId"], "d1");
        assert_eq!(doc["decoratorEmail"], "dana@decor.com");
    }
}
