use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::leave::engine;
use crate::model::balance::LeaveBalance;
use crate::model::leave::{Leave, LeaveCategory, LeaveWithUser, TransitionTarget};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct ApplyLeave {
    #[schema(example = "annual")]
    pub category: LeaveCategory, // enum ensures Swagger dropdown
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub start_date: chrono::NaiveDate,
    #[schema(example = "2026-03-06", format = "date", value_type = String)]
    pub end_date: chrono::NaiveDate,
    #[schema(example = "Family trip")]
    pub reason: String,
}

/* =========================
Apply for leave
========================= */
#[utoipa::path(
    post,
    path = "/api/leaves/apply",
    request_body(
        content = ApplyLeave,
        description = "Leave application payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave application submitted", body = Leave),
        (status = 400, description = "Invalid dates, category or reason"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn apply_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<ApplyLeave>,
) -> Result<HttpResponse, AppError> {
    let leave = engine::submit(
        pool.get_ref(),
        auth.user_id,
        payload.category,
        payload.start_date,
        payload.end_date,
        &payload.reason,
    )
    .await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Leave application submitted successfully",
        "data": leave
    })))
}

/* =========================
Approve leave (admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leaves/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave application to approve")
    ),
    responses(
        (status = 200, description = "Leave approved, balance deducted", body = Leave),
        (status = 400, description = "Insufficient balance"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave or balance record not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let leave = engine::transition(pool.get_ref(), path.into_inner(), TransitionTarget::Approved)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave status updated successfully",
        "data": leave
    })))
}

/* =========================
Reject leave (admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leaves/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave application to reject")
    ),
    responses(
        (status = 200, description = "Leave rejected", body = Leave),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave application not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let leave = engine::transition(pool.get_ref(), path.into_inner(), TransitionTarget::Rejected)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave status updated successfully",
        "data": leave
    })))
}

/// Caller's own leave applications, oldest first.
#[utoipa::path(
    get,
    path = "/api/leaves/user",
    responses(
        (status = 200, description = "Caller's leave applications", body = [Leave]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn my_leaves(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, AppError> {
    let leaves = engine::leaves_for_user(pool.get_ref(), auth.user_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "User leave applications fetched successfully",
        "data": leaves
    })))
}

/// Administrative listing of every leave application with owner identity.
#[utoipa::path(
    get,
    path = "/api/leaves",
    responses(
        (status = 200, description = "All leave applications", body = [LeaveWithUser]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn list_leaves(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let leaves = engine::all_leaves(pool.get_ref()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "All leave applications fetched successfully",
        "data": leaves
    })))
}

/// Caller's remaining allowance per category.
#[utoipa::path(
    get,
    path = "/api/leaves/balance",
    responses(
        (status = 200, description = "Remaining allowance per category", body = LeaveBalance),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Balance not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_balance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, AppError> {
    let balance = engine::balance_for_user(pool.get_ref(), auth.user_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": balance
    })))
}

/* =========================
Delete own leave
========================= */
#[utoipa::path(
    delete,
    path = "/api/leaves/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave application to delete")
    ),
    responses(
        (status = 200, description = "Leave deleted; no balance is restored"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only the owner may delete a leave"),
        (status = 404, description = "Leave application not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn delete_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    engine::remove(pool.get_ref(), path.into_inner(), auth.user_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave deleted successfully"
    })))
}
