use crate::api::leave::ApplyLeave;
use crate::model::balance::LeaveBalance;
use crate::model::leave::{Leave, LeaveCategory, LeaveStatus, LeaveWithUser};
use crate::model::user::UserProfile;
use crate::models::{LoginReq, RegisterReq};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "LeaveDesk API",
        version = "1.0.0",
        description = r#"
## Leave Management System

REST backend for workplace leave management.

### Key Features
- **Accounts** — registration, login, token refresh, logout
- **Leave Applications** — apply, view own history, delete own applications
- **Approval Workflow** — admins approve or reject pending applications
- **Balance Ledger** — per-user remaining days per category (annual, casual,
  sick, unpaid); deducted once, at approval

### Security
Endpoints are protected with **JWT Bearer authentication**; refresh tokens
rotate and ride an HttpOnly cookie. Approve/reject and the global listing
require the **Admin** role.

Built with **Actix Web**, **SQLx** and **Utoipa**.
"#,
    ),
    paths(
        crate::api::leave::apply_leave,
        crate::api::leave::approve_leave,
        crate::api::leave::reject_leave,
        crate::api::leave::my_leaves,
        crate::api::leave::list_leaves,
        crate::api::leave::get_balance,
        crate::api::leave::delete_leave,
    ),
    components(
        schemas(
            ApplyLeave,
            Leave,
            LeaveWithUser,
            LeaveBalance,
            LeaveCategory,
            LeaveStatus,
            UserProfile,
            RegisterReq,
            LoginReq
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leave", description = "Leave application and balance APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_auth_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components present");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
