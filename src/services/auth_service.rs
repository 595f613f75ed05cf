use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use password_hash::rand_core::OsRng;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dto::auth::{Claims, Credentials, LoginResponse},
    error::{AppError, AppResult},
    models::{Role, User},
    state::AppState,
};

/// New accounts always get the `user` role; admins are provisioned by the seed binary.
pub async fn register_user(state: &AppState, credentials: Credentials) -> AppResult<User> {
    let email = credentials.normalized_email();
    if email.is_empty() || credentials.password.is_empty() {
        return Err(AppError::BadRequest("Invalid input".into()));
    }

    let password_hash = hash_password(&credentials.password)?;
    let user = state
        .users
        .create(&email, &password_hash, Role::User.as_str())
        .await?;
    tracing::info!(user_id = %user.id, "user registered");

    audit_account(state, &user, "user_register").await;
    Ok(user)
}

pub async fn login_user(state: &AppState, credentials: Credentials) -> AppResult<LoginResponse> {
    let invalid = || AppError::BadRequest("Invalid email or password".into());

    let user = state
        .users
        .find_by_email(&credentials.normalized_email())
        .await?
        .ok_or_else(invalid)?;

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Argon2::default()
        .verify_password(credentials.password.as_bytes(), &parsed_hash)
        .map_err(|_| invalid())?;

    let token = issue_token(&state.config, user.id, user.role)?;
    audit_account(state, &user, "user_login").await;
    Ok(LoginResponse::bearer(token, state.config.jwt_ttl_hours))
}

async fn audit_account(state: &AppState, user: &User, action: &str) {
    let actor = user.id.to_string();
    if let Err(err) = state
        .audit
        .record(
            Some(&actor),
            action,
            Some("users"),
            Some(serde_json::json!({ "user_id": user.id })),
        )
        .await
    {
        tracing::warn!(error = %err, action, "audit log failed");
    }
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

/// Signs a bearer token whose subject becomes the cart owner id.
pub fn issue_token(config: &AppConfig, user_id: Uuid, role: Role) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(config.jwt_ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        role,
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

/// Any decoding failure, expiry included, reads as "not signed in".
pub fn verify_token(config: &AppConfig, token: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthenticated)
}
