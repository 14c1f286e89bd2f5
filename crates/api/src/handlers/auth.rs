//! Handlers for the `/auth` resource.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;
use vitashop_core::error::CoreError;
use vitashop_core::hashing::{generate_token, hash_token};
use vitashop_core::roles::ROLE_CUSTOMER;
use vitashop_db::models::session::CreateSession;
use vitashop_db::models::user::{CreateUser, User, UserResponse};
use vitashop_db::models::user_token::{CreateUserToken, TokenKind};
use vitashop_db::repositories::{RoleRepo, SessionRepo, UserRepo, UserTokenRepo};
use vitashop_events::{event_types, PlatformEvent};

use crate::auth::jwt::{generate_access_token, generate_refresh_token, hash_refresh_token};
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::error::{AppError, AppResult};
use crate::handlers::{found, validate_body};
use crate::middleware::auth::AuthUser;
use crate::response::{DataResponse, MessageResponse};
use crate::state::AppState;

/// Maximum consecutive failed login attempts before locking the account.
const MAX_FAILED_ATTEMPTS: i32 = 5;

/// Duration in minutes to lock an account after exceeding failed attempts.
const LOCK_DURATION_MINS: i64 = 15;

const VERIFICATION_TOKEN_TTL_HOURS: i64 = 24;
const RESET_TOKEN_TTL_MINS: i64 = 60;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email, length(max = 254))]
    pub email: String,
    pub password: String,
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: UserResponse,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// Successful authentication response returned by login and refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserResponse,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    validate_body(&input)?;
    validate_password_strength(&input.password, state.config.password_min_length)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let email = normalize_email(&input.email);
    if UserRepo::find_by_email(&state.pool, &email).await?.is_some() {
        return Err(AppError::Core(CoreError::Conflict(
            "An account with this email already exists".into(),
        )));
    }

    let role = RoleRepo::find_by_name(&state.pool, ROLE_CUSTOMER)
        .await?
        .ok_or_else(|| AppError::InternalError("Customer role is not seeded".into()))?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            email,
            password_hash,
            first_name: trimmed(input.first_name),
            last_name: trimmed(input.last_name),
            role_id: role.id,
        },
    )
    .await?;

    issue_verification(&state, &user, event_types::USER_REGISTERED).await?;
    tracing::info!(user_id = user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: user.to_response(role.name),
            message: "Registration successful. Check your email to verify your address.".into(),
        }),
    ))
}

/// POST /api/auth/verify-email
pub async fn verify_email(
    State(state): State<AppState>,
    Json(input): Json<TokenRequest>,
) -> AppResult<Json<MessageResponse>> {
    let token = UserTokenRepo::consume(
        &state.pool,
        TokenKind::EmailVerification,
        &hash_token(&input.token),
    )
    .await?
    .ok_or_else(|| AppError::BadRequest("Invalid or expired verification token".into()))?;

    UserRepo::mark_email_verified(&state.pool, token.user_id).await?;
    tracing::info!(user_id = token.user_id, "Email verified");

    Ok(Json(MessageResponse::new("Email address verified")))
}

/// POST /api/auth/resend-verification
///
/// Always answers 202 so the endpoint cannot be used to probe for accounts.
pub async fn resend_verification(
    State(state): State<AppState>,
    Json(input): Json<EmailRequest>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let email = normalize_email(&input.email);
    if let Some(user) = UserRepo::find_by_email(&state.pool, &email).await? {
        if user.is_active && !user.is_verified() {
            issue_verification(&state, &user, event_types::USER_VERIFICATION_REQUESTED).await?;
        }
    }
    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse::new(
            "If the account exists and is unverified, a new verification email has been sent.",
        )),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = UserRepo::find_by_email(&state.pool, &normalize_email(&input.email))
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized(INVALID_CREDENTIALS.into())))?;

    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    if let Some(locked_until) = user.locked_until {
        if locked_until > Utc::now() {
            return Err(AppError::Core(CoreError::Forbidden(
                "Account is temporarily locked. Try again later.".into(),
            )));
        }
    }

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;

    if !password_valid {
        let failures = UserRepo::increment_failed_login(&state.pool, user.id).await?;
        if failures >= MAX_FAILED_ATTEMPTS {
            let lock_until = Utc::now() + chrono::Duration::minutes(LOCK_DURATION_MINS);
            UserRepo::lock_account(&state.pool, user.id, lock_until).await?;
            tracing::warn!(user_id = user.id, failures, "Account locked after failed logins");
        }
        return Err(AppError::Core(CoreError::Unauthorized(
            INVALID_CREDENTIALS.into(),
        )));
    }

    if state.config.require_email_verification && !user.is_verified() {
        return Err(AppError::Core(CoreError::Forbidden(
            "Email address is not verified".into(),
        )));
    }

    UserRepo::record_successful_login(&state.pool, user.id).await?;

    let role_name = RoleRepo::resolve_name(&state.pool, user.role_id).await?;
    let response = create_auth_response(&state, &user, &role_name).await?;

    tracing::info!(user_id = user.id, "User logged in");
    Ok(Json(response))
}

/// POST /api/auth/refresh
///
/// Exchange a valid refresh token for new access + refresh tokens.
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let token_hash = hash_refresh_token(&input.refresh_token);

    let session = SessionRepo::find_by_refresh_token_hash(&state.pool, &token_hash)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid or expired refresh token".into(),
            ))
        })?;

    // Rotation: a refresh token is single use. A concurrent request that
    // revoked it first wins.
    if !SessionRepo::revoke(&state.pool, session.id).await? {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid or expired refresh token".into(),
        )));
    }

    let user = UserRepo::find_by_id(&state.pool, session.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;

    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    let role_name = RoleRepo::resolve_name(&state.pool, user.role_id).await?;
    let response = create_auth_response(&state, &user, &role_name).await?;

    Ok(Json(response))
}

/// POST /api/auth/logout
///
/// Revoke all sessions for the authenticated user. Returns 204 No Content.
pub async fn logout(State(state): State<AppState>, auth_user: AuthUser) -> AppResult<StatusCode> {
    SessionRepo::revoke_all_for_user(&state.pool, auth_user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = found(
        UserRepo::find_by_id(&state.pool, auth_user.user_id).await?,
        "User",
        auth_user.user_id,
    )?;
    let role_name = RoleRepo::resolve_name(&state.pool, user.role_id).await?;
    Ok(Json(DataResponse {
        data: user.to_response(role_name),
    }))
}

/// POST /api/auth/forgot-password
///
/// Always answers 202 so the endpoint cannot be used to probe for accounts.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(input): Json<EmailRequest>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let email = normalize_email(&input.email);
    if let Some(user) = UserRepo::find_by_email(&state.pool, &email).await? {
        if user.is_active {
            let token = generate_token();
            UserTokenRepo::create(
                &state.pool,
                &CreateUserToken {
                    user_id: user.id,
                    kind: TokenKind::PasswordReset,
                    token_hash: token.hash,
                    expires_at: Utc::now() + chrono::Duration::minutes(RESET_TOKEN_TTL_MINS),
                },
            )
            .await?;

            state.event_bus.publish(
                PlatformEvent::new(event_types::USER_PASSWORD_RESET_REQUESTED)
                    .with_source("user", user.id)
                    .with_actor(user.id)
                    .with_payload(json!({
                        "email": user.email,
                        "first_name": user.first_name,
                        "token": token.plaintext,
                    })),
            );
            tracing::info!(user_id = user.id, "Password reset requested");
        }
    }
    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse::new(
            "If an account exists for that email, a reset link has been sent.",
        )),
    ))
}

/// POST /api/auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    Json(input): Json<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    validate_password_strength(&input.password, state.config.password_min_length)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let reset = UserTokenRepo::redeem_password_reset(
        &state.pool,
        &hash_token(&input.token),
        &password_hash,
    )
    .await?
    .ok_or_else(|| AppError::BadRequest("Invalid or expired reset token".into()))?;

    tracing::info!(
        user_id = reset.user_id,
        revoked = reset.sessions_revoked,
        "Password reset"
    );
    Ok(Json(MessageResponse::new("Password has been reset")))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Store a fresh verification token and publish `event_type` carrying it.
async fn issue_verification(state: &AppState, user: &User, event_type: &str) -> AppResult<()> {
    let token = generate_token();
    UserTokenRepo::create(
        &state.pool,
        &CreateUserToken {
            user_id: user.id,
            kind: TokenKind::EmailVerification,
            token_hash: token.hash,
            expires_at: Utc::now() + chrono::Duration::hours(VERIFICATION_TOKEN_TTL_HOURS),
        },
    )
    .await?;

    state.event_bus.publish(
        PlatformEvent::new(event_type)
            .with_source("user", user.id)
            .with_actor(user.id)
            .with_payload(json!({
                "email": user.email,
                "first_name": user.first_name,
                "token": token.plaintext,
            })),
    );
    Ok(())
}

/// Generate access + refresh tokens, persist a session row, and build the response.
async fn create_auth_response(
    state: &AppState,
    user: &User,
    role: &str,
) -> AppResult<AuthResponse> {
    let access_token = generate_access_token(user.id, role, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    let (refresh_plaintext, refresh_hash) = generate_refresh_token();

    let expires_at =
        Utc::now() + chrono::Duration::days(state.config.jwt.refresh_token_expiry_days);

    SessionRepo::create(
        &state.pool,
        &CreateSession {
            user_id: user.id,
            refresh_token_hash: refresh_hash,
            expires_at,
            user_agent: None,
            ip_address: None,
        },
    )
    .await?;

    Ok(AuthResponse {
        access_token,
        refresh_token: refresh_plaintext,
        expires_in: state.config.jwt.access_token_expiry_mins * 60,
        user: user.to_response(role),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Ann@Example.COM "), "ann@example.com");
    }

    #[test]
    fn blank_names_become_none() {
        assert_eq!(trimmed(Some("   ".into())), None);
        assert_eq!(trimmed(Some(" Ann ".into())), Some("Ann".into()));
    }

    #[test]
    fn register_request_rejects_bad_email() {
        let input = RegisterRequest {
            email: "not-an-email".into(),
            password: "vitamin12".into(),
            first_name: None,
            last_name: None,
        };
        assert!(input.validate().is_err());
    }
}
