//! Leave lifecycle engine: the only code path that changes a leave's status
//! or touches the balance ledger.
//!
//! Approval and deduction run in one transaction. The leave row is locked
//! first, so racing transitions on the same application serialize; the
//! deduction itself is a conditional update on the ledger row, so racing
//! approvals against one ledger resolve to exactly one deduction.

use chrono::NaiveDate;
use sqlx::MySqlPool;
use tracing::info;

use crate::error::AppError;
use crate::model::balance::LeaveBalance;
use crate::model::leave::{Leave, LeaveCategory, LeaveStatus, LeaveWithUser, TransitionTarget};

/// Day count inclusive of both endpoints: a single-day leave spans 1 day.
pub fn inclusive_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// What a transition has to do once the current record state is known.
#[derive(Debug, PartialEq, Eq)]
pub enum TransitionPlan {
    /// Same target re-applied to a non-pending record: return it unchanged.
    NoOp,
    /// Write the status only. Covers rejection (never restores balance,
    /// even from `approved`) and approval of unpaid leave.
    SetStatus,
    /// Write the status and deduct `days` from the owner's ledger.
    Deduct { days: i64 },
}

pub fn plan_transition(
    current: LeaveStatus,
    target: TransitionTarget,
    category: LeaveCategory,
    days: i64,
) -> TransitionPlan {
    if current == target.status() {
        return TransitionPlan::NoOp;
    }

    match target {
        TransitionTarget::Rejected => TransitionPlan::SetStatus,
        TransitionTarget::Approved if category == LeaveCategory::Unpaid => {
            TransitionPlan::SetStatus
        }
        TransitionTarget::Approved => TransitionPlan::Deduct { days },
    }
}

/// Submission constraints: dates in order, reason non-blank. Returns the
/// trimmed reason that gets stored.
pub fn validate_submission<'a>(
    start_date: NaiveDate,
    end_date: NaiveDate,
    reason: &'a str,
) -> Result<&'a str, AppError> {
    if start_date > end_date {
        return Err(AppError::InvalidTransition(
            "start_date cannot be after end_date".into(),
        ));
    }

    let reason = reason.trim();
    if reason.is_empty() {
        return Err(AppError::InvalidTransition("Reason must not be empty".into()));
    }

    Ok(reason)
}

/// Creates a pending leave application. The ledger is untouched; deduction
/// happens only at approval.
pub async fn submit(
    pool: &MySqlPool,
    user_id: u64,
    category: LeaveCategory,
    start_date: NaiveDate,
    end_date: NaiveDate,
    reason: &str,
) -> Result<Leave, AppError> {
    let reason = validate_submission(start_date, end_date, reason)?;

    let result = sqlx::query(
        r#"
        INSERT INTO leaves (user_id, category, start_date, end_date, reason, status)
        VALUES (?, ?, ?, ?, ?, 'pending')
        "#,
    )
    .bind(user_id)
    .bind(category.as_str())
    .bind(start_date)
    .bind(end_date)
    .bind(reason)
    .execute(pool)
    .await?;

    let leave = fetch_leave(pool, result.last_insert_id()).await?;

    info!(leave_id = leave.id, user_id, category = category.as_str(), "Leave application submitted");

    Ok(leave)
}

async fn fetch_leave(pool: &MySqlPool, leave_id: u64) -> Result<Leave, AppError> {
    sqlx::query_as::<_, Leave>(
        r#"
        SELECT id, user_id, category, start_date, end_date, reason, status, created_at
        FROM leaves
        WHERE id = ?
        "#,
    )
    .bind(leave_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Leave application not found"))
}

/// Moves a leave to a terminal status, deducting from the ledger when an
/// approval requires it. Either both writes commit or neither does.
pub async fn transition(
    pool: &MySqlPool,
    leave_id: u64,
    target: TransitionTarget,
) -> Result<Leave, AppError> {
    let mut tx = pool.begin().await?;

    let mut leave = sqlx::query_as::<_, Leave>(
        r#"
        SELECT id, user_id, category, start_date, end_date, reason, status, created_at
        FROM leaves
        WHERE id = ?
        FOR UPDATE
        "#,
    )
    .bind(leave_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::not_found("Leave application not found"))?;

    let current = LeaveStatus::from_str(&leave.status).ok_or_else(|| {
        AppError::InvalidTransition(format!("Unknown stored status '{}'", leave.status))
    })?;
    let category = LeaveCategory::from_str(&leave.category).ok_or_else(|| {
        AppError::InvalidTransition(format!("Unknown stored category '{}'", leave.category))
    })?;

    let days = inclusive_days(leave.start_date, leave.end_date);

    match plan_transition(current, target, category, days) {
        TransitionPlan::NoOp => return Ok(leave),
        TransitionPlan::SetStatus => {}
        TransitionPlan::Deduct { days } => {
            deduct_balance(&mut tx, leave.user_id, category, days).await?;
        }
    }

    let new_status = target.status();

    sqlx::query("UPDATE leaves SET status = ? WHERE id = ?")
        .bind(new_status.as_str())
        .bind(leave.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    leave.status = new_status.as_str().to_owned();

    info!(
        leave_id = leave.id,
        user_id = leave.user_id,
        status = new_status.as_str(),
        "Leave status updated"
    );

    Ok(leave)
}

/// Conditional decrement: the `>= days` guard in the WHERE clause is the
/// compare-and-swap that keeps racing approvals from driving the counter
/// negative. Zero rows affected means a missing ledger or not enough days;
/// the follow-up lookup tells the two apart. Nothing is mutated on failure.
async fn deduct_balance(
    tx: &mut sqlx::Transaction<'_, sqlx::MySql>,
    user_id: u64,
    category: LeaveCategory,
    days: i64,
) -> Result<(), AppError> {
    let col = category.balance_column();
    let sql = format!(
        "UPDATE leave_balances SET {col} = {col} - ? WHERE user_id = ? AND {col} >= ?"
    );

    let result = sqlx::query(&sql)
        .bind(days)
        .bind(user_id)
        .bind(days)
        .execute(&mut **tx)
        .await?;

    if result.rows_affected() == 0 {
        let exists =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM leave_balances WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(&mut **tx)
                .await?;

        if exists == 0 {
            return Err(AppError::not_found(
                "Leave balance record not found for user",
            ));
        }

        return Err(AppError::InsufficientBalance(format!(
            "Insufficient {} leave balance",
            category.as_str()
        )));
    }

    Ok(())
}

/// All leaves owned by `user_id`, in insertion order.
pub async fn leaves_for_user(pool: &MySqlPool, user_id: u64) -> Result<Vec<Leave>, AppError> {
    let leaves = sqlx::query_as::<_, Leave>(
        r#"
        SELECT id, user_id, category, start_date, end_date, reason, status, created_at
        FROM leaves
        WHERE user_id = ?
        ORDER BY id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(leaves)
}

/// Administrative listing with the owning user's identity attached.
pub async fn all_leaves(pool: &MySqlPool) -> Result<Vec<LeaveWithUser>, AppError> {
    let leaves = sqlx::query_as::<_, LeaveWithUser>(
        r#"
        SELECT l.id, l.user_id, u.name AS user_name, u.email AS user_email,
               l.category, l.start_date, l.end_date, l.reason, l.status, l.created_at
        FROM leaves l
        JOIN users u ON u.id = l.user_id
        ORDER BY l.id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(leaves)
}

/// Deletes a leave. Owner only. Does not restore any previously deducted
/// balance, even for an approved record.
pub async fn remove(pool: &MySqlPool, leave_id: u64, requester_id: u64) -> Result<(), AppError> {
    let owner = sqlx::query_scalar::<_, u64>("SELECT user_id FROM leaves WHERE id = ?")
        .bind(leave_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Leave application not found"))?;

    if owner != requester_id {
        return Err(AppError::Forbidden(
            "Unauthorized to delete this leave".into(),
        ));
    }

    sqlx::query("DELETE FROM leaves WHERE id = ?")
        .bind(leave_id)
        .execute(pool)
        .await?;

    info!(leave_id, user_id = requester_id, "Leave application deleted");

    Ok(())
}

/// Read-only projection of a user's remaining allowances.
pub async fn balance_for_user(pool: &MySqlPool, user_id: u64) -> Result<LeaveBalance, AppError> {
    sqlx::query_as::<_, LeaveBalance>(
        r#"
        SELECT user_id, annual, sick, casual, unpaid
        FROM leave_balances
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Balance not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn day_count_is_inclusive_of_both_endpoints() {
        assert_eq!(inclusive_days(date("2026-03-02"), date("2026-03-02")), 1);
        assert_eq!(inclusive_days(date("2026-03-02"), date("2026-03-06")), 5);
        assert_eq!(inclusive_days(date("2026-02-27"), date("2026-03-02")), 4);
    }

    #[test]
    fn submission_rejects_reversed_dates() {
        let err = validate_submission(date("2026-03-06"), date("2026-03-02"), "trip").unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[test]
    fn single_day_submission_is_valid() {
        let reason = validate_submission(date("2026-03-02"), date("2026-03-02"), "checkup");
        assert_eq!(reason.unwrap(), "checkup");
    }

    #[test]
    fn blank_reason_is_rejected() {
        let err = validate_submission(date("2026-03-02"), date("2026-03-06"), "   ").unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[test]
    fn reason_is_trimmed_before_storage() {
        let reason = validate_submission(date("2026-03-02"), date("2026-03-06"), "  trip  ");
        assert_eq!(reason.unwrap(), "trip");
    }

    #[test]
    fn pending_approval_deducts_span() {
        let plan = plan_transition(
            LeaveStatus::Pending,
            TransitionTarget::Approved,
            LeaveCategory::Annual,
            5,
        );
        assert_eq!(plan, TransitionPlan::Deduct { days: 5 });
    }

    #[test]
    fn approving_unpaid_never_touches_the_ledger() {
        let plan = plan_transition(
            LeaveStatus::Pending,
            TransitionTarget::Approved,
            LeaveCategory::Unpaid,
            365,
        );
        assert_eq!(plan, TransitionPlan::SetStatus);
    }

    #[test]
    fn re_approving_is_idempotent() {
        let plan = plan_transition(
            LeaveStatus::Approved,
            TransitionTarget::Approved,
            LeaveCategory::Annual,
            5,
        );
        assert_eq!(plan, TransitionPlan::NoOp);
    }

    #[test]
    fn re_rejecting_is_idempotent() {
        let plan = plan_transition(
            LeaveStatus::Rejected,
            TransitionTarget::Rejected,
            LeaveCategory::Sick,
            2,
        );
        assert_eq!(plan, TransitionPlan::NoOp);
    }

    #[test]
    fn rejecting_an_approved_leave_does_not_restore_balance() {
        // Documented asymmetry: the deducted days stay deducted.
        let plan = plan_transition(
            LeaveStatus::Approved,
            TransitionTarget::Rejected,
            LeaveCategory::Annual,
            5,
        );
        assert_eq!(plan, TransitionPlan::SetStatus);
    }

    #[test]
    fn approving_a_rejected_leave_deducts() {
        let plan = plan_transition(
            LeaveStatus::Rejected,
            TransitionTarget::Approved,
            LeaveCategory::Casual,
            3,
        );
        assert_eq!(plan, TransitionPlan::Deduct { days: 3 });
    }

    #[test]
    fn rejecting_a_pending_leave_sets_status_only() {
        let plan = plan_transition(
            LeaveStatus::Pending,
            TransitionTarget::Rejected,
            LeaveCategory::Sick,
            2,
        );
        assert_eq!(plan, TransitionPlan::SetStatus);
    }
}
