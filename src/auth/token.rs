//! Signed, expiring token codec.
//!
//! Every token carries a subject, a type tag, and an absolute expiry. The
//! type tag is load-bearing: a token of one kind is never accepted where
//! another kind is expected, so a refresh token cannot be replayed as an
//! access token and a password-reset token grants no API access.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

const DEFAULT_ACCESS_TTL_MINUTES: i64 = 30;
const DEFAULT_REFRESH_TTL_DAYS: i64 = 7;
const DEFAULT_RESET_TTL_MINUTES: i64 = 60;
const DEFAULT_VERIFICATION_TTL_HOURS: i64 = 24;

/// Token type tag embedded in the claims `type` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
    PasswordReset,
    EmailVerification,
}

impl TokenKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
            Self::PasswordReset => "password_reset",
            Self::EmailVerification => "email_verification",
        }
    }
}

/// Signed token payload.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id, or email for password-reset tokens.
    pub sub: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub exp: i64,
    pub iat: i64,
}

/// Structured verification failure. Callers never see a partial payload.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed or improperly signed token")]
    Invalid,
    #[error("token expired")]
    Expired,
    #[error("unexpected token type")]
    WrongKind,
}

/// Per-deployment token settings, fixed at process start.
#[derive(Clone, Copy, Debug)]
pub struct TokenConfig {
    algorithm: Algorithm,
    access_ttl: Duration,
    refresh_ttl: Duration,
    reset_ttl: Duration,
    verification_ttl: Duration,
}

impl TokenConfig {
    /// Defaults: HS256, 30 min access, 7 day refresh, 1 h reset, 24 h
    /// email verification.
    #[must_use]
    pub fn new() -> Self {
        Self {
            algorithm: Algorithm::HS256,
            access_ttl: Duration::minutes(DEFAULT_ACCESS_TTL_MINUTES),
            refresh_ttl: Duration::days(DEFAULT_REFRESH_TTL_DAYS),
            reset_ttl: Duration::minutes(DEFAULT_RESET_TTL_MINUTES),
            verification_ttl: Duration::hours(DEFAULT_VERIFICATION_TTL_HOURS),
        }
    }

    #[must_use]
    pub const fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    #[must_use]
    pub fn with_access_ttl_minutes(mut self, minutes: i64) -> Self {
        self.access_ttl = Duration::minutes(minutes);
        self
    }

    #[must_use]
    pub fn with_refresh_ttl_days(mut self, days: i64) -> Self {
        self.refresh_ttl = Duration::days(days);
        self
    }

    #[must_use]
    pub fn with_reset_ttl_minutes(mut self, minutes: i64) -> Self {
        self.reset_ttl = Duration::minutes(minutes);
        self
    }

    #[must_use]
    pub fn with_verification_ttl_hours(mut self, hours: i64) -> Self {
        self.verification_ttl = Duration::hours(hours);
        self
    }

    #[must_use]
    pub const fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    #[must_use]
    pub const fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
            TokenKind::PasswordReset => self.reset_ttl,
            TokenKind::EmailVerification => self.verification_ttl,
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a signing algorithm name. Only HMAC variants are supported.
///
/// # Errors
/// Returns an error for anything other than HS256, HS384 or HS512.
pub fn parse_algorithm(name: &str) -> Result<Algorithm> {
    match name.to_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => Err(anyhow!("unsupported token algorithm: {other}")),
    }
}

/// Issues and verifies signed tokens with a server-held secret.
///
/// Verification is pure and CPU-bound; any instance configured with the
/// same secret can verify tokens issued by any other instance.
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    header: Header,
    validation: Validation,
    config: TokenConfig,
}

impl TokenSigner {
    #[must_use]
    pub fn new(secret: &SecretString, config: TokenConfig) -> Self {
        let mut validation = Validation::new(config.algorithm());
        // Expired means expired, no grace window.
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.expose_secret().as_bytes()),
            decoding: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            header: Header::new(config.algorithm()),
            validation,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Seconds until a freshly issued token of this kind expires.
    #[must_use]
    pub fn expires_in_seconds(&self, kind: TokenKind) -> i64 {
        self.config.ttl(kind).num_seconds()
    }

    /// Build the claims for a token issued at `now`.
    #[must_use]
    pub fn claims(&self, subject: &str, kind: TokenKind, now: DateTime<Utc>) -> Claims {
        Claims {
            sub: subject.to_string(),
            kind,
            exp: (now + self.config.ttl(kind)).timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Sign prepared claims.
    ///
    /// # Errors
    /// Returns an error if the signing backend fails.
    pub fn sign(&self, claims: &Claims) -> Result<String> {
        encode(&self.header, claims, &self.encoding).context("failed to sign token")
    }

    /// Issue a token of `kind` for `subject`, expiring after the configured
    /// TTL.
    ///
    /// # Errors
    /// Returns an error if the signing backend fails.
    pub fn issue(&self, subject: &str, kind: TokenKind) -> Result<String> {
        self.sign(&self.claims(subject, kind, Utc::now()))
    }

    /// Check signature and expiry, returning the claims or a structured
    /// failure. An unverified payload is never exposed.
    ///
    /// # Errors
    /// `TokenError::Expired` past the embedded expiry, `TokenError::Invalid`
    /// for malformed input, bad signatures, or wrong algorithms.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }

    /// [`verify`](Self::verify) plus a type-tag check.
    ///
    /// # Errors
    /// Everything `verify` reports, plus `TokenError::WrongKind` when the
    /// tag differs from `expected` even though signature and expiry hold.
    pub fn verify_kind(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let claims = self.verify(token)?;
        if claims.kind != expected {
            return Err(TokenError::WrongKind);
        }
        Ok(claims)
    }
}
