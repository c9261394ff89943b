use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::rbac::{Admins, Authorized, Members};
use crate::db;
use crate::error::AppError;
use crate::models::{Role, User};
use crate::routes::Payload;
use crate::state::SharedState;

const NAME_MAX: usize = 20;

#[derive(Deserialize)]
pub struct CreateRole {
    pub name: String,
}

#[derive(Serialize)]
pub struct RoleWithUsers {
    #[serde(flatten)]
    pub role: Role,
    pub users: Vec<User>,
}

pub async fn list(
    _auth: Authorized<Members>,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Role>>, AppError> {
    let roles = db::roles::list(&state.pool).await?;
    Ok(Json(roles))
}

pub async fn create(
    auth: Authorized<Admins>,
    State(state): State<SharedState>,
    Payload(req): Payload<CreateRole>,
) -> Result<(StatusCode, Json<Role>), AppError> {
    let name = req.name.trim();
    if name.is_empty() || name.chars().count() > NAME_MAX {
        return Err(AppError::field(
            "name",
            &format!("Length must be between 1 and {NAME_MAX}"),
        ));
    }

    let role = db::roles::create(&state.pool, name)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("A role with this name already exists".to_string())
            }
            _ => AppError::from(e),
        })?;

    tracing::info!(role_id = %role.id, created_by = %auth.user.id, "Role created");

    Ok((StatusCode::CREATED, Json(role)))
}

pub async fn get(
    _auth: Authorized<Members>,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RoleWithUsers>, AppError> {
    let role = db::roles::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Role not found".to_string()))?;

    let users = db::users::list_by_role(&state.pool, id).await?;

    Ok(Json(RoleWithUsers { role, users }))
}
