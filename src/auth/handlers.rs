use crate::{
    auth::{
        auth::AuthUser,
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    error::AppError,
    model::balance::LeaveBalance,
    model::user::UserProfile,
    models::{Claims, LoginReq, RegisterReq, TokenType, UserSql},
};
use actix_web::{
    HttpRequest, HttpResponse,
    cookie::{Cookie, SameSite, time::Duration},
    web,
};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};

const REFRESH_COOKIE: &str = "refresh_token";
const EMPLOYEE_ROLE_ID: u8 = 2;

fn refresh_cookie(token: &str, ttl: usize) -> Cookie<'static> {
    Cookie::build(REFRESH_COOKIE, token.to_owned())
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(Duration::seconds(ttl as i64))
        .finish()
}

fn is_duplicate_key(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23000"))
}

async fn store_refresh_token(pool: &MySqlPool, claims: &Claims) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(claims.user_id)
    .bind(&claims.jti)
    .bind(claims.exp as i64)
    .execute(pool)
    .await?;
    Ok(())
}

/// User registration. Inserts the user row and the default leave ledger in
/// one transaction; a user without a ledger is a data-integrity fault.
pub async fn register(
    payload: web::Json<RegisterReq>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let name = payload.name.trim();
    let email = payload.email.trim().to_lowercase();

    if name.is_empty() || email.is_empty() || payload.password.is_empty() {
        return Err(AppError::Validation(
            "Name, email and password must not be empty".into(),
        ));
    }

    let hashed = hash_password(&payload.password);

    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"INSERT INTO users (name, email, password, role_id) VALUES (?, ?, ?, ?)"#,
    )
    .bind(name)
    .bind(&email)
    .bind(&hashed)
    .bind(EMPLOYEE_ROLE_ID)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        if is_duplicate_key(&e) {
            AppError::Conflict("User with email already exists".into())
        } else {
            AppError::Database(e)
        }
    })?;

    let user_id = result.last_insert_id();

    // Default allowances; mutated only on approval transitions.
    let ledger = LeaveBalance::new(user_id);
    sqlx::query(
        r#"
        INSERT INTO leave_balances (user_id, annual, sick, casual, unpaid)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(ledger.user_id)
    .bind(ledger.annual)
    .bind(ledger.sick)
    .bind(ledger.casual)
    .bind(ledger.unpaid)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let access_token = generate_access_token(
        user_id,
        email.clone(),
        EMPLOYEE_ROLE_ID,
        &config.jwt_secret,
        config.access_token_ttl,
    );
    let (refresh_token, refresh_claims) = generate_refresh_token(
        user_id,
        email.clone(),
        EMPLOYEE_ROLE_ID,
        &config.jwt_secret,
        config.refresh_token_ttl,
    );

    store_refresh_token(pool.get_ref(), &refresh_claims).await?;

    info!(user_id, "User registered");

    Ok(HttpResponse::Created()
        .cookie(refresh_cookie(&refresh_token, config.refresh_token_ttl))
        .json(json!({
            "message": "User registered successfully",
            "user": { "id": user_id, "name": name, "email": email },
            "access_token": access_token,
            "refresh_token": refresh_token
        })))
}

#[instrument(
    name = "auth_login",
    skip(pool, config, payload),
    fields(email = %payload.email)
)]
pub async fn login(
    payload: web::Json<LoginReq>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    info!("Login request received");

    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::Validation(
            "Email and password required".into(),
        ));
    }

    debug!("Fetching user from database");

    let db_user = sqlx::query_as::<_, UserSql>(
        r#"
        SELECT id, name, email, password, role_id
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(payload.email.trim().to_lowercase())
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::Unauthorized("Invalid email or password".into()))?;

    if verify_password(&payload.password, &db_user.password).is_err() {
        info!("Invalid credentials: password mismatch");
        return Err(AppError::Unauthorized("Invalid email or password".into()));
    }

    let access_token = generate_access_token(
        db_user.id,
        db_user.email.clone(),
        db_user.role_id,
        &config.jwt_secret,
        config.access_token_ttl,
    );
    let (refresh_token, refresh_claims) = generate_refresh_token(
        db_user.id,
        db_user.email.clone(),
        db_user.role_id,
        &config.jwt_secret,
        config.refresh_token_ttl,
    );

    store_refresh_token(pool.get_ref(), &refresh_claims).await?;

    info!("Login successful");

    Ok(HttpResponse::Ok()
        .cookie(refresh_cookie(&refresh_token, config.refresh_token_ttl))
        .json(json!({
            "message": "User logged in successfully",
            "user": { "id": db_user.id, "name": db_user.name, "email": db_user.email },
            "access_token": access_token,
            "refresh_token": refresh_token
        })))
}

fn extract_refresh_token(req: &HttpRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(REFRESH_COOKIE) {
        return Some(cookie.value().to_owned());
    }
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_owned)
}

/// Rotates the presented refresh token: the old jti is revoked and a fresh
/// access/refresh pair is issued.
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let token = extract_refresh_token(&req)
        .ok_or_else(|| AppError::Unauthorized("No refresh token found".into()))?;

    let claims = verify_token(&token, &config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid or expired refresh token".into()))?;

    if claims.token_type != TokenType::Refresh {
        return Err(AppError::Unauthorized("Not a refresh token".into()));
    }

    let record = sqlx::query_as::<_, (u64, u64, bool)>(
        r#"
        SELECT id, user_id, revoked
        FROM refresh_tokens
        WHERE jti = ?
        "#,
    )
    .bind(&claims.jti)
    .fetch_optional(pool.get_ref())
    .await?;

    let (record_id, user_id) = match record {
        Some((id, user_id, false)) => (id, user_id),
        _ => return Err(AppError::Unauthorized("Refresh token revoked".into())),
    };

    sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = ?")
        .bind(record_id)
        .execute(pool.get_ref())
        .await?;

    let (new_refresh_token, new_claims) = generate_refresh_token(
        user_id,
        claims.sub.clone(),
        claims.role,
        &config.jwt_secret,
        config.refresh_token_ttl,
    );

    store_refresh_token(pool.get_ref(), &new_claims).await?;

    let access_token = generate_access_token(
        user_id,
        claims.sub,
        claims.role,
        &config.jwt_secret,
        config.access_token_ttl,
    );

    Ok(HttpResponse::Ok()
        .cookie(refresh_cookie(&new_refresh_token, config.refresh_token_ttl))
        .json(json!({
            "message": "Token refreshed successfully",
            "access_token": access_token,
            "refresh_token": new_refresh_token
        })))
}

/// Revokes the presented refresh token and clears the cookie. Succeeds even
/// if the token was already gone.
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> HttpResponse {
    let mut expired = refresh_cookie("", 0);
    expired.make_removal();

    let Some(token) = extract_refresh_token(&req) else {
        return HttpResponse::NoContent().cookie(expired).finish();
    };

    let Ok(claims) = verify_token(&token, &config.jwt_secret) else {
        return HttpResponse::NoContent().cookie(expired).finish();
    };

    if claims.token_type != TokenType::Refresh {
        return HttpResponse::NoContent().cookie(expired).finish();
    }

    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token");
    }

    HttpResponse::NoContent().cookie(expired).finish()
}

/// Authenticated user's own row, password hash excluded.
pub async fn profile(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, AppError> {
    let user = sqlx::query_as::<_, UserProfile>(
        r#"
        SELECT id, name, email, role_id, created_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(auth.user_id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(HttpResponse::Ok().json(user))
}
