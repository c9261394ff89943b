use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::jwt::{encode_token, Claims};
use crate::auth::password;
use crate::auth::rbac::ADMIN;
use crate::db;
use crate::error::AppError;
use crate::routes::users::{normalize_email, validate_profile};
use crate::routes::Payload;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "email")]
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub access_token: String,
}

fn issue_token(state: &SharedState, identity: &str) -> Result<AuthResponse, AppError> {
    let claims = Claims::new(identity, state.config.token_ttl_minutes);
    let access_token = encode_token(&claims, &state.config.jwt_secret).map_err(AppError::Internal)?;
    Ok(AuthResponse { access_token })
}

/// Bootstrap registration: only the very first user can sign up, and becomes admin.
pub async fn register(
    State(state): State<SharedState>,
    Payload(req): Payload<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = normalize_email(&req.email);
    validate_profile(&req.name, &email, &req.password)?;

    let pw_hash = password::hash(&req.password).map_err(AppError::Internal)?;

    // Advisory lock prevents concurrent bootstrap registrations
    let mut tx = state.pool.begin().await?;
    sqlx::query("SELECT pg_advisory_xact_lock(1)")
        .execute(&mut *tx)
        .await?;

    let count = db::users::count_all(&mut *tx).await?;
    if count > 0 {
        return Err(AppError::Forbidden(
            "Registration is closed. Ask an administrator for an account.".to_string(),
        ));
    }

    let admin = db::roles::find_by_name(&mut *tx, ADMIN)
        .await?
        .ok_or_else(|| AppError::Internal("Role 'admin' is missing".to_string()))?;

    let user = db::users::create(&mut *tx, &req.name, &email, &pw_hash, true, Some(admin.id))
        .await?;

    tx.commit().await?;

    tracing::info!(user_id = %user.id, "Bootstrap administrator registered");

    Ok(Json(issue_token(&state, &user.email)?))
}

pub async fn login(
    State(state): State<SharedState>,
    Payload(req): Payload<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let username = normalize_email(&req.username);

    if state.login_limiter.check(&username).is_err() {
        return Err(AppError::RateLimited(
            "Too many login attempts. Please try again later.".to_string(),
        ));
    }

    let Some(user) = db::users::find_by_email(&state.pool, &username).await? else {
        state.login_limiter.record_failure(&username);
        return Err(AppError::Unauthorized("Bad username or password".to_string()));
    };

    let valid = password::verify(&req.password, &user.password_hash).map_err(AppError::Internal)?;
    if !valid {
        state.login_limiter.record_failure(&username);
        tracing::warn!(user_id = %user.id, "Failed login attempt");
        return Err(AppError::Unauthorized("Bad username or password".to_string()));
    }

    if !user.active {
        return Err(AppError::Unauthorized("Account is inactive".to_string()));
    }

    state.login_limiter.clear(&username);
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(issue_token(&state, &user.email)?))
}
