//! Role-based access control.
//!
//! Every gated request goes through the same sequence: authenticate the
//! bearer token, resolve the identity to a user, resolve the user's role,
//! then compare the role against the set the route requires. The
//! [`Authorized`] extractor runs that sequence before the handler body, so a
//! denied request never reaches code that mutates state.

use std::marker::PhantomData;
use std::ops::Deref;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sqlx::PgPool;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::models::{Role, User};
use crate::state::SharedState;

pub const ADMIN: &str = "admin";
pub const EDITOR: &str = "editor";
pub const VISITANT: &str = "visitant";

const NO_PERMISSION: &str = "You've got no permission to access this resource.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// Allow iff a role is present and is one of `required`. A missing role is a deny.
pub fn decide(role: Option<&str>, required: &[&str]) -> Decision {
    match role {
        Some(name) if required.contains(&name) => Decision::Allow,
        _ => Decision::Deny,
    }
}

/// A static set of role names a route accepts.
pub trait RoleSet: Send + Sync + 'static {
    const ROLES: &'static [&'static str];
}

pub struct Admins;
pub struct Staff;
pub struct Members;

impl RoleSet for Admins {
    const ROLES: &'static [&'static str] = &[ADMIN];
}

impl RoleSet for Staff {
    const ROLES: &'static [&'static str] = &[ADMIN, EDITOR];
}

impl RoleSet for Members {
    const ROLES: &'static [&'static str] = &[ADMIN, EDITOR, VISITANT];
}

/// The resolved user behind a request together with its role.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user: User,
    pub role: Role,
}

impl Principal {
    pub fn is_any_of(&self, roles: &[&str]) -> bool {
        decide(Some(self.role.name.as_str()), roles) == Decision::Allow
    }
}

/// Resolve `identity` and check its role against `required`.
///
/// Unknown identity is a `NotFound`; an inactive user, a user without a role
/// and a role outside `required` are all `Forbidden`.
pub async fn authorize(
    pool: &PgPool,
    identity: &str,
    required: &[&str],
) -> Result<Principal, AppError> {
    let user = db::users::find_by_email(pool, identity)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if !user.active {
        tracing::warn!(user_id = %user.id, "Access denied: inactive user");
        return Err(AppError::Forbidden(NO_PERMISSION.to_string()));
    }

    let role = match user.role_id {
        Some(role_id) => db::roles::find_by_id(pool, role_id).await?,
        None => None,
    };

    let Some(role) = role else {
        tracing::warn!(user_id = %user.id, "Access denied: user has no role assigned");
        return Err(AppError::Forbidden(NO_PERMISSION.to_string()));
    };

    match decide(Some(role.name.as_str()), required) {
        Decision::Allow => Ok(Principal { user, role }),
        Decision::Deny => {
            tracing::warn!(
                user_id = %user.id,
                role = %role.name,
                ?required,
                "Access denied: role not permitted"
            );
            Err(AppError::Forbidden(NO_PERMISSION.to_string()))
        }
    }
}

/// Extractor guarding a handler with the role set `R`.
pub struct Authorized<R: RoleSet> {
    pub principal: Principal,
    roles: PhantomData<fn() -> R>,
}

impl<R: RoleSet> Deref for Authorized<R> {
    type Target = Principal;

    fn deref(&self) -> &Principal {
        &self.principal
    }
}

impl<R: RoleSet> FromRequestParts<SharedState> for Authorized<R> {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        let principal = authorize(&state.pool, &auth.identity, R::ROLES).await?;
        Ok(Authorized {
            principal,
            roles: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_in_set_is_allowed() {
        assert_eq!(decide(Some(ADMIN), Admins::ROLES), Decision::Allow);
        assert_eq!(decide(Some(EDITOR), Staff::ROLES), Decision::Allow);
        assert_eq!(decide(Some(VISITANT), Members::ROLES), Decision::Allow);
    }

    #[test]
    fn role_outside_set_is_denied() {
        assert_eq!(decide(Some(VISITANT), Admins::ROLES), Decision::Deny);
        assert_eq!(decide(Some(VISITANT), Staff::ROLES), Decision::Deny);
        assert_eq!(decide(Some(EDITOR), Admins::ROLES), Decision::Deny);
    }

    #[test]
    fn missing_role_is_denied_for_every_set() {
        for set in [Admins::ROLES, Staff::ROLES, Members::ROLES] {
            assert_eq!(decide(None, set), Decision::Deny);
        }
    }

    #[test]
    fn custom_roles_never_match_builtin_sets() {
        assert_eq!(decide(Some("barista"), Members::ROLES), Decision::Deny);
        assert_eq!(decide(Some("Admin"), Admins::ROLES), Decision::Deny);
        assert_eq!(decide(Some(ADMIN), &[]), Decision::Deny);
    }
}
