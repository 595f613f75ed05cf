use axum::{extract::FromRequestParts, http::header};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{OwnerContext, Role},
    services::auth_service::verify_token,
    state::AppState,
};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthUser {
    /// The user id doubles as the cart owner id.
    pub fn owner(&self) -> AppResult<OwnerContext> {
        OwnerContext::new(self.user_id.to_string(), self.role)
    }

    pub fn actor(&self) -> String {
        self.user_id.to_string()
    }
}

pub fn ensure_role(user: &AuthUser, role: Role) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, Role::Admin)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(AppError::Unauthenticated)?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::BadRequest("Invalid Authorization header".into()))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or_else(|| AppError::BadRequest("Invalid Authorization scheme".into()))?;

        let claims = verify_token(&state.config, token)?;

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthenticated)?;

        Ok(AuthUser {
            user_id,
            role: claims.role,
        })
    }
}
