use std::sync::LazyLock;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use regex::Regex;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::password;
use crate::auth::rbac::{Admins, Authorized, Members, RoleSet, Staff, EDITOR, VISITANT};
use crate::db;
use crate::db::users::UserChanges;
use crate::error::{is_foreign_key_violation, AppError, FieldErrors};
use crate::models::User;
use crate::routes::Payload;
use crate::state::SharedState;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

const NAME_MAX: usize = 50;
const EMAIL_MAX: usize = 80;

/// Roles a non-admin staff member may hand out.
const STAFF_ASSIGNABLE: &[&str] = &[EDITOR, VISITANT];

#[derive(Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub active: Option<bool>,
    pub role: String,
}

#[derive(Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub password: Option<String>,
    pub active: Option<bool>,
    pub role: Option<String>,
    /// Present only to reject it: emails are immutable.
    pub email: Option<serde_json::Value>,
}

fn check_name(errors: &mut FieldErrors, name: &str) {
    let len = name.trim().chars().count();
    if len == 0 || len > NAME_MAX {
        errors
            .entry("name".to_string())
            .or_default()
            .push(format!("Length must be between 1 and {NAME_MAX}"));
    }
}

fn check_password(errors: &mut FieldErrors, pw: &str) {
    if let Err(msg) = password::validate(pw) {
        errors.entry("password".to_string()).or_default().push(msg);
    }
}

fn into_result(errors: FieldErrors) -> Result<(), AppError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

/// Emails are stored and compared lowercased.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Field checks shared by registration and user creation.
pub(crate) fn validate_profile(name: &str, email: &str, pw: &str) -> Result<(), AppError> {
    let mut errors = FieldErrors::new();
    check_name(&mut errors, name);
    if email.chars().count() > EMAIL_MAX {
        errors
            .entry("email".to_string())
            .or_default()
            .push(format!("Longer than maximum length {EMAIL_MAX}"));
    }
    if !EMAIL_RE.is_match(email) {
        errors
            .entry("email".to_string())
            .or_default()
            .push("Not a valid email address".to_string());
    }
    check_password(&mut errors, pw);
    into_result(errors)
}

async fn resolve_role(state: &SharedState, name: &str) -> Result<Uuid, AppError> {
    db::roles::find_by_name(&state.pool, name)
        .await?
        .map(|role| role.id)
        .ok_or_else(|| AppError::field("role", "Role not found"))
}

pub async fn list(
    _auth: Authorized<Members>,
    State(state): State<SharedState>,
) -> Result<Json<Vec<User>>, AppError> {
    let users = db::users::list_all(&state.pool).await?;
    Ok(Json(users))
}

pub async fn create(
    auth: Authorized<Staff>,
    State(state): State<SharedState>,
    Payload(req): Payload<CreateUser>,
) -> Result<(StatusCode, Json<User>), AppError> {
    if !auth.is_any_of(Admins::ROLES) && !STAFF_ASSIGNABLE.contains(&req.role.as_str()) {
        return Err(AppError::Forbidden(
            "Only administrators can assign this role".to_string(),
        ));
    }

    let email = normalize_email(&req.email);
    validate_profile(&req.name, &email, &req.password)?;
    let role_id = resolve_role(&state, &req.role).await?;

    let pw_hash = password::hash(&req.password).map_err(AppError::Internal)?;

    let user = db::users::create(
        &state.pool,
        req.name.trim(),
        &email,
        &pw_hash,
        req.active.unwrap_or(true),
        Some(role_id),
    )
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::Conflict("A user with this email already exists".to_string())
        }
        _ => AppError::from(e),
    })?;

    tracing::info!(
        user_id = %user.id,
        created_by = %auth.user.id,
        role = %req.role,
        "User created"
    );

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get(
    _auth: Authorized<Members>,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    let user = db::users::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(user))
}

/// Users may edit their own name and password. Renaming someone else needs a
/// staff role; another user's password, role and active flag need admin.
pub async fn update(
    auth: Authorized<Members>,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Payload(req): Payload<UpdateUser>,
) -> Result<Json<User>, AppError> {
    if auth.user.id != id && !auth.is_any_of(Staff::ROLES) {
        return Err(AppError::Forbidden(
            "You can only update your own account".to_string(),
        ));
    }
    if auth.user.id != id && req.password.is_some() && !auth.is_any_of(Admins::ROLES) {
        return Err(AppError::Forbidden(
            "Only administrators can change another user's password".to_string(),
        ));
    }
    if (req.role.is_some() || req.active.is_some()) && !auth.is_any_of(Admins::ROLES) {
        return Err(AppError::Forbidden(
            "Only administrators can change roles or account status".to_string(),
        ));
    }

    if req.email.is_some() {
        return Err(AppError::Conflict("Email cannot be changed".to_string()));
    }

    let mut errors = FieldErrors::new();
    if let Some(ref name) = req.name {
        check_name(&mut errors, name);
    }
    if let Some(ref pw) = req.password {
        check_password(&mut errors, pw);
    }
    into_result(errors)?;

    let role_id = match req.role.as_deref() {
        Some(name) => Some(resolve_role(&state, name).await?),
        None => None,
    };

    let pw_hash = match req.password.as_deref() {
        Some(pw) => Some(password::hash(pw).map_err(AppError::Internal)?),
        None => None,
    };

    let changes = UserChanges {
        name: req.name.as_deref().map(str::trim),
        password_hash: pw_hash.as_deref(),
        active: req.active,
        role_id,
    };

    let user = db::users::update(&state.pool, id, &changes)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => AppError::NotFound("User not found".to_string()),
            _ => AppError::from(e),
        })?;

    tracing::info!(user_id = %user.id, updated_by = %auth.user.id, "User updated");

    Ok(Json(user))
}

pub async fn delete(
    auth: Authorized<Admins>,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    if auth.user.id == id {
        return Err(AppError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }

    let deleted = db::users::delete(&state.pool, id).await.map_err(|e| {
        if is_foreign_key_violation(&e) {
            AppError::Conflict("User has recorded sales and cannot be deleted".to_string())
        } else {
            AppError::from(e)
        }
    })?;

    if deleted == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = %id, deleted_by = %auth.user.id, "User deleted");

    Ok(Json(serde_json::json!({ "message": "Deleted" })))
}
