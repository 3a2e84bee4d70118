//! Bearer-token access gate.
//!
//! Each request walks a strict chain: extract the credential, verify it as
//! an access token, load the account, and check its status. Every failed
//! step terminates the chain; missing, invalid, and unknown-user cases all
//! collapse into the same 401 so callers learn nothing about which check
//! failed. Only a valid credential on a disabled account gets a distinct
//! 403.

use axum::http::{HeaderMap, StatusCode, header};
use tracing::error;

use crate::auth::service::{AuthService, GateDecision};
use crate::auth::store::UserStore;
use crate::auth::user::User;

/// Pull the token out of `Authorization: Bearer <token>`.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

fn unauthorized() -> (StatusCode, String) {
    (
        StatusCode::UNAUTHORIZED,
        "Could not validate credentials".to_string(),
    )
}

/// Resolve the request's bearer credential to an active account.
///
/// # Errors
/// 401 for anything short of a valid access token for a known account,
/// 403 when the account exists but is disabled.
pub async fn require_auth<S: UserStore>(
    headers: &HeaderMap,
    service: &AuthService<S>,
) -> Result<User, (StatusCode, String)> {
    let Some(token) = bearer_token(headers) else {
        return Err(unauthorized());
    };

    match service.resolve_access_token(token).await {
        Ok(GateDecision::Allowed(user)) => Ok(user),
        Ok(GateDecision::Unauthorized) => Err(unauthorized()),
        Ok(GateDecision::Disabled) => {
            Err((StatusCode::FORBIDDEN, "Account disabled".to_string()))
        }
        Err(err) => {
            error!("Failed to resolve access token: {err:#}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authorization failed".to_string(),
            ))
        }
    }
}

/// Additional gate for verified-only routes.
///
/// # Errors
/// 403 when the account has not confirmed its email.
pub fn require_verified(user: &User) -> Result<(), (StatusCode, String)> {
    if user.is_verified {
        Ok(())
    } else {
        Err((StatusCode::FORBIDDEN, "Email not verified".to_string()))
    }
}

/// Additional gate for admin routes.
///
/// # Errors
/// 403 when the account is not a superuser.
pub fn require_superuser(user: &User) -> Result<(), (StatusCode, String)> {
    if user.is_superuser {
        Ok(())
    } else {
        Err((StatusCode::FORBIDDEN, "Not enough permissions".to_string()))
    }
}
