//! Authenticated self-service endpoints.
//!
//! 1) Resolve the bearer token to an active account.
//! 2) Read, update, or soft delete that account. Updates touch only the
//!    whitelisted profile fields; everything else is unreachable from the
//!    request payload.

use std::sync::Arc;

use axum::{Json, extract::Extension, http::HeaderMap, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use tracing::error;
use utoipa::ToSchema;

use crate::auth::service::AuthService;
use crate::auth::store::{PgUserStore, ProfileUpdate, UserStore};
use crate::auth::user::User;

use super::auth::{MessageResponse, UserResponse};
use super::principal::require_auth;

/// Updatable profile fields. Absent fields are left as they are.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub timezone: Option<String>,
    pub currency: Option<String>,
    pub language: Option<String>,
    pub theme: Option<String>,
}

impl From<UpdateProfileRequest> for ProfileUpdate {
    fn from(request: UpdateProfileRequest) -> Self {
        Self {
            first_name: request.first_name,
            last_name: request.last_name,
            phone: request.phone,
            timezone: request.timezone,
            currency: request.currency,
            language: request.language,
            theme: request.theme,
        }
    }
}

pub(crate) async fn update_current_user<S: UserStore>(
    service: &AuthService<S>,
    user: &User,
    request: UpdateProfileRequest,
) -> Result<UserResponse, (StatusCode, String)> {
    let update = ProfileUpdate::from(request);
    match service.update_profile(user.id, &update).await {
        Ok(Some(updated)) => Ok(updated.into()),
        // The account passed the gate moments ago; gone now means deleted
        // by a concurrent request.
        Ok(None) => Err((
            StatusCode::UNAUTHORIZED,
            "Could not validate credentials".to_string(),
        )),
        Err(err) => {
            error!("Failed to update profile: {err:#}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Update failed".to_string(),
            ))
        }
    }
}

pub(crate) async fn delete_current_user<S: UserStore>(
    service: &AuthService<S>,
    user: &User,
) -> Result<MessageResponse, (StatusCode, String)> {
    match service.delete_account(user.id).await {
        Ok(()) => Ok(MessageResponse::new("Account deleted")),
        Err(err) => {
            error!("Failed to delete account: {err:#}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Deletion failed".to_string(),
            ))
        }
    }
}

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current profile", body = UserResponse),
        (status = 401, description = "Missing or invalid access token", body = String),
    ),
    security(("bearer" = [])),
    tag = "me"
)]
pub async fn get_me(
    headers: HeaderMap,
    service: Extension<Arc<AuthService<PgUserStore>>>,
) -> impl IntoResponse {
    match require_auth(&headers, &service).await {
        Ok(user) => (StatusCode::OK, Json(UserResponse::from(user))).into_response(),
        Err(failure) => failure.into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/auth/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = UserResponse),
        (status = 401, description = "Missing or invalid access token", body = String),
    ),
    security(("bearer" = [])),
    tag = "me"
)]
pub async fn put_me(
    headers: HeaderMap,
    service: Extension<Arc<AuthService<PgUserStore>>>,
    payload: Option<Json<UpdateProfileRequest>>,
) -> impl IntoResponse {
    let user = match require_auth(&headers, &service).await {
        Ok(user) => user,
        Err(failure) => return failure.into_response(),
    };
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match update_current_user(&service, &user, request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(failure) => failure.into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/auth/me",
    responses(
        (status = 200, description = "Account soft deleted", body = MessageResponse),
        (status = 401, description = "Missing or invalid access token", body = String),
    ),
    security(("bearer" = [])),
    tag = "me"
)]
pub async fn delete_me(
    headers: HeaderMap,
    service: Extension<Arc<AuthService<PgUserStore>>>,
) -> impl IntoResponse {
    let user = match require_auth(&headers, &service).await {
        Ok(user) => user,
        Err(failure) => return failure.into_response(),
    };

    match delete_current_user(&service, &user).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(failure) => failure.into_response(),
    }
}
