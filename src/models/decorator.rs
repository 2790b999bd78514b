use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A field decorator. `work_status` is a denormalized availability flag
/// mutated as a side effect of booking transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decorator {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    pub status: DecoratorStatus,
    pub work_status: WorkStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoratorStatus {
    Pending,
    Approved,
    Rejected,
}

impl DecoratorStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DecoratorStatus::Pending),
            "approved" => Some(DecoratorStatus::Approved),
            "rejected" => Some(DecoratorStatus::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DecoratorStatus::Pending => "pending",
            DecoratorStatus::Approved => "approved",
            DecoratorStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkStatus {
    #[serde(rename = "available")]
    Available,
    #[serde(rename = "in_project")]
    InProject,
}

impl WorkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkStatus::Available => "available",
            WorkStatus::InProject => "in_project",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDecorator {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub area: Option<String>,
}

impl Decorator {
    /// New decorators start unapproved and available.
    pub fn from_application(id: String, req: NewDecorator, now: DateTime<Utc>) -> Self {
        Decorator {
            id,
            name: req.name,
            email: req.email,
            phone: req.phone,
            area: req.area,
            status: DecoratorStatus::Pending,
            work_status: WorkStatus::Available,
            created_at: now,
        }
    }
}
