//! Public authentication endpoints.
//!
//! Handlers stay thin: payload extraction and status mapping here, the
//! actual decisions in [`AuthService`]. The worker functions are generic
//! over the store so the full request logic runs in tests without Postgres.

use std::sync::Arc;

use axum::{Json, extract::Extension, http::HeaderMap, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::service::{AuthService, RegisterOutcome, TokenPair};
use crate::auth::store::{PgUserStore, UserStore};
use crate::auth::user::User;

use super::principal::require_auth;
use super::{normalize_email, password_policy_error, valid_email};

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PasswordResetConfirmRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyEmailRequest {
    pub token: String,
}

/// Public account snapshot. The password hash never leaves the service.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub timezone: String,
    pub currency: String,
    pub language: String,
    pub theme: String,
    pub is_verified: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            full_name: user.full_name(),
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            timezone: user.timezone,
            currency: user.currency,
            language: user.language,
            theme: user.theme,
            is_verified: user.is_verified,
            is_superuser: user.is_superuser,
            created_at: user.created_at,
            updated_at: user.updated_at,
            last_login_at: user.last_login_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "bearer".to_string(),
            expires_in: pair.expires_in,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub tokens: TokenResponse,
    pub user: UserResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub(crate) fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

fn internal(log: &str, err: &anyhow::Error, message: &str) -> (StatusCode, String) {
    error!("{log}: {err:#}");
    (StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) async fn register_user<S: UserStore>(
    service: &AuthService<S>,
    request: RegisterRequest,
) -> Result<UserResponse, (StatusCode, String)> {
    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err((StatusCode::BAD_REQUEST, "Invalid email address".to_string()));
    }
    if let Some(rule) = password_policy_error(&request.password) {
        return Err((StatusCode::BAD_REQUEST, rule.to_string()));
    }

    let outcome = service
        .register(
            &email,
            &request.password,
            clean_optional(request.first_name),
            clean_optional(request.last_name),
        )
        .await
        .map_err(|err| internal("Failed to register user", &err, "Registration failed"))?;

    match outcome {
        RegisterOutcome::Created(user) => Ok(user.into()),
        RegisterOutcome::EmailTaken => Err((
            StatusCode::BAD_REQUEST,
            "Email already registered".to_string(),
        )),
    }
}

pub(crate) async fn login_user<S: UserStore>(
    service: &AuthService<S>,
    request: LoginRequest,
) -> Result<LoginResponse, (StatusCode, String)> {
    let email = normalize_email(&request.email);
    let outcome = service
        .login(&email, &request.password)
        .await
        .map_err(|err| internal("Failed to log in user", &err, "Login failed"))?;

    match outcome {
        Some((user, pair)) => Ok(LoginResponse {
            tokens: pair.into(),
            user: user.into(),
        }),
        None => Err((
            StatusCode::UNAUTHORIZED,
            "Incorrect email or password".to_string(),
        )),
    }
}

pub(crate) async fn refresh_tokens<S: UserStore>(
    service: &AuthService<S>,
    request: RefreshRequest,
) -> Result<TokenResponse, (StatusCode, String)> {
    let outcome = service
        .refresh(&request.refresh_token)
        .await
        .map_err(|err| internal("Failed to refresh tokens", &err, "Refresh failed"))?;

    match outcome {
        Some(pair) => Ok(pair.into()),
        None => Err((
            StatusCode::UNAUTHORIZED,
            "Invalid refresh token".to_string(),
        )),
    }
}

pub(crate) async fn start_password_reset<S: UserStore>(
    service: &AuthService<S>,
    request: PasswordResetRequest,
) -> Result<MessageResponse, (StatusCode, String)> {
    let email = normalize_email(&request.email);
    service
        .request_password_reset(&email)
        .await
        .map_err(|err| internal("Failed to start password reset", &err, "Reset failed"))?;

    // Identical response whether or not the email exists.
    Ok(MessageResponse::new(
        "If the email exists, a password reset link has been sent",
    ))
}

pub(crate) async fn confirm_password_reset<S: UserStore>(
    service: &AuthService<S>,
    request: PasswordResetConfirmRequest,
) -> Result<MessageResponse, (StatusCode, String)> {
    if let Some(rule) = password_policy_error(&request.new_password) {
        return Err((StatusCode::BAD_REQUEST, rule.to_string()));
    }

    let updated = service
        .reset_password(&request.token, &request.new_password)
        .await
        .map_err(|err| internal("Failed to reset password", &err, "Reset failed"))?;

    if updated {
        Ok(MessageResponse::new("Password updated successfully"))
    } else {
        Err((
            StatusCode::BAD_REQUEST,
            "Invalid or expired token".to_string(),
        ))
    }
}

pub(crate) async fn confirm_email<S: UserStore>(
    service: &AuthService<S>,
    request: VerifyEmailRequest,
) -> Result<MessageResponse, (StatusCode, String)> {
    let verified = service
        .verify_email(&request.token)
        .await
        .map_err(|err| internal("Failed to verify email", &err, "Verification failed"))?;

    if verified {
        Ok(MessageResponse::new("Email verified successfully"))
    } else {
        Err((
            StatusCode::BAD_REQUEST,
            "Invalid or expired token".to_string(),
        ))
    }
}

pub(crate) async fn resend_verification_email<S: UserStore>(
    service: &AuthService<S>,
    user: &User,
) -> Result<MessageResponse, (StatusCode, String)> {
    let sent = service.send_verification_email(user).await.map_err(|err| {
        internal(
            "Failed to resend verification email",
            &err,
            "Verification failed",
        )
    })?;

    if sent {
        Ok(MessageResponse::new("Verification email sent"))
    } else {
        Err((StatusCode::BAD_REQUEST, "Email already verified".to_string()))
    }
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = UserResponse),
        (status = 400, description = "Email taken or weak password", body = String),
    ),
    tag = "auth"
)]
pub async fn register(
    service: Extension<Arc<AuthService<PgUserStore>>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match register_user(&service, request).await {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(failure) => failure.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token pair issued", body = LoginResponse),
        (status = 401, description = "Bad credentials", body = String),
    ),
    tag = "auth"
)]
pub async fn login(
    service: Extension<Arc<AuthService<PgUserStore>>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match login_user(&service, request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(failure) => failure.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenResponse),
        (status = 401, description = "Invalid or expired refresh token", body = String),
    ),
    tag = "auth"
)]
pub async fn refresh(
    service: Extension<Arc<AuthService<PgUserStore>>>,
    payload: Option<Json<RefreshRequest>>,
) -> impl IntoResponse {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match refresh_tokens(&service, request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(failure) => failure.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/auth/password-reset",
    request_body = PasswordResetRequest,
    responses(
        (status = 200, description = "Always succeeds", body = MessageResponse),
    ),
    tag = "auth"
)]
pub async fn password_reset(
    service: Extension<Arc<AuthService<PgUserStore>>>,
    payload: Option<Json<PasswordResetRequest>>,
) -> impl IntoResponse {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match start_password_reset(&service, request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(failure) => failure.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/auth/password-reset/confirm",
    request_body = PasswordResetConfirmRequest,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Invalid or expired token", body = String),
    ),
    tag = "auth"
)]
pub async fn password_reset_confirm(
    service: Extension<Arc<AuthService<PgUserStore>>>,
    payload: Option<Json<PasswordResetConfirmRequest>>,
) -> impl IntoResponse {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match confirm_password_reset(&service, request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(failure) => failure.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/auth/verify-email",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 400, description = "Invalid or expired token", body = String),
    ),
    tag = "auth"
)]
pub async fn verify_email(
    service: Extension<Arc<AuthService<PgUserStore>>>,
    payload: Option<Json<VerifyEmailRequest>>,
) -> impl IntoResponse {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match confirm_email(&service, request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(failure) => failure.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/auth/resend-verification",
    responses(
        (status = 200, description = "Verification email sent", body = MessageResponse),
        (status = 400, description = "Already verified", body = String),
        (status = 401, description = "Missing or invalid access token", body = String),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn resend_verification(
    headers: HeaderMap,
    service: Extension<Arc<AuthService<PgUserStore>>>,
) -> impl IntoResponse {
    let user = match require_auth(&headers, &service).await {
        Ok(user) => user,
        Err(failure) => return failure.into_response(),
    };

    match resend_verification_email(&service, &user).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(failure) => failure.into_response(),
    }
}
