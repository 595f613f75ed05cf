use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Role;

/// Email and password, for both registration and login.
#[derive(Deserialize, Debug, Clone, ToSchema)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Emails are matched case-insensitively and without surrounding whitespace.
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl LoginResponse {
    pub fn bearer(token: String, ttl_hours: i64) -> Self {
        Self {
            token,
            token_type: "Bearer".to_string(),
            expires_in: ttl_hours * 3600,
        }
    }
}

/// JWT payload. `sub` is the user id, which is also the cart owner id.
#[derive(Debug, Deserialize, Serialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub exp: usize,
}
