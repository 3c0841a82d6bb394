use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Leave categories. `Unpaid` is never checked against the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LeaveCategory {
    Annual,
    Casual,
    Sick,
    Unpaid,
}

impl LeaveCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveCategory::Annual => "annual",
            LeaveCategory::Casual => "casual",
            LeaveCategory::Sick => "sick",
            LeaveCategory::Unpaid => "unpaid",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "annual" => Some(LeaveCategory::Annual),
            "casual" => Some(LeaveCategory::Casual),
            "sick" => Some(LeaveCategory::Sick),
            "unpaid" => Some(LeaveCategory::Unpaid),
            _ => None,
        }
    }

    /// Column holding this category's counter in `leave_balances`.
    pub fn balance_column(&self) -> &'static str {
        self.as_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "pending",
            LeaveStatus::Approved => "approved",
            LeaveStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(LeaveStatus::Pending),
            "approved" => Some(LeaveStatus::Approved),
            "rejected" => Some(LeaveStatus::Rejected),
            _ => None,
        }
    }
}

/// Terminal statuses a transition may target. `Pending` is not a valid
/// target, so it is unrepresentable here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionTarget {
    Approved,
    Rejected,
}

impl TransitionTarget {
    pub fn status(&self) -> LeaveStatus {
        match self {
            TransitionTarget::Approved => LeaveStatus::Approved,
            TransitionTarget::Rejected => LeaveStatus::Rejected,
        }
    }
}

/// A single leave application row.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Leave {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 42)]
    pub user_id: u64,
    #[schema(example = "annual")]
    pub category: String,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-03-06", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Family trip")]
    pub reason: String,
    #[schema(example = "pending")]
    pub status: String,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Leave row joined with its owner, for the administrative listing.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct LeaveWithUser {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 42)]
    pub user_id: u64,
    #[schema(example = "Jane Doe")]
    pub user_name: String,
    #[schema(example = "jane@company.com")]
    pub user_email: String,
    #[schema(example = "annual")]
    pub category: String,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-03-06", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Family trip")]
    pub reason: String,
    #[schema(example = "pending")]
    pub status: String,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_through_storage_form() {
        for cat in [
            LeaveCategory::Annual,
            LeaveCategory::Casual,
            LeaveCategory::Sick,
            LeaveCategory::Unpaid,
        ] {
            assert_eq!(LeaveCategory::from_str(cat.as_str()), Some(cat));
        }
        assert_eq!(LeaveCategory::from_str("maternity"), None);
    }

    #[test]
    fn status_round_trips_through_storage_form() {
        for status in [
            LeaveStatus::Pending,
            LeaveStatus::Approved,
            LeaveStatus::Rejected,
        ] {
            assert_eq!(LeaveStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(LeaveStatus::from_str("cancelled"), None);
    }

    #[test]
    fn transition_targets_are_terminal() {
        assert_eq!(TransitionTarget::Approved.status(), LeaveStatus::Approved);
        assert_eq!(TransitionTarget::Rejected.status(), LeaveStatus::Rejected);
    }
}
