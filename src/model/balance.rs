use serde::Serialize;
use utoipa::ToSchema;

use crate::model::leave::LeaveCategory;

pub const DEFAULT_ANNUAL: i32 = 20;
pub const DEFAULT_SICK: i32 = 10;
pub const DEFAULT_CASUAL: i32 = 12;
/// Sentinel allowance for unpaid leave; never checked or deducted.
pub const DEFAULT_UNPAID: i32 = 9999;

/// Per-user remaining-days counters, one column per category.
///
/// Exactly one row exists per registered user, created at registration and
/// mutated only by an approval transition.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct LeaveBalance {
    #[serde(skip_serializing)]
    pub user_id: u64,
    #[schema(example = 20)]
    pub annual: i32,
    #[schema(example = 10)]
    pub sick: i32,
    #[schema(example = 12)]
    pub casual: i32,
    #[schema(example = 9999)]
    pub unpaid: i32,
}

impl LeaveBalance {
    pub fn new(user_id: u64) -> Self {
        Self {
            user_id,
            annual: DEFAULT_ANNUAL,
            sick: DEFAULT_SICK,
            casual: DEFAULT_CASUAL,
            unpaid: DEFAULT_UNPAID,
        }
    }

    pub fn remaining(&self, category: LeaveCategory) -> i32 {
        match category {
            LeaveCategory::Annual => self.annual,
            LeaveCategory::Casual => self.casual,
            LeaveCategory::Sick => self.sick,
            LeaveCategory::Unpaid => self.unpaid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_allowances() {
        let ledger = LeaveBalance::new(7);
        assert_eq!(ledger.remaining(LeaveCategory::Annual), 20);
        assert_eq!(ledger.remaining(LeaveCategory::Sick), 10);
        assert_eq!(ledger.remaining(LeaveCategory::Casual), 12);
        assert_eq!(ledger.remaining(LeaveCategory::Unpaid), 9999);
    }

    #[test]
    fn serializes_as_category_map_without_owner() {
        let ledger = LeaveBalance::new(7);
        let json = serde_json::to_value(&ledger).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"annual": 20, "sick": 10, "casual": 12, "unpaid": 9999})
        );
    }
}
