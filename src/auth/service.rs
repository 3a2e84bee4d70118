//! Authentication orchestration.
//!
//! The service composes the hasher, the token codec, the user store and the
//! mailer. Expected failures (bad credentials, duplicate emails, stale
//! tokens) are modeled as outcome values; `Err` is reserved for
//! infrastructure faults.

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::mailer::{MailMessage, Mailer};

use super::password::{hash_password, verify_password};
use super::store::{InsertUserOutcome, NewUser, ProfileUpdate, UserStore};
use super::token::{TokenKind, TokenSigner};
use super::user::{AccountStatus, User};

/// Registration outcome. A taken email is reported, never paniced over.
#[derive(Debug)]
pub enum RegisterOutcome {
    Created(User),
    EmailTaken,
}

/// Access plus refresh token with the access expiry in seconds.
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

/// What the access gate decided about a bearer credential.
#[derive(Debug)]
pub enum GateDecision {
    /// Valid access token for a live, active account.
    Allowed(User),
    /// Invalid, expired, or wrong-kind credential, or no such account.
    /// Callers must not reveal which.
    Unauthorized,
    /// The credential is valid but the account is inactive.
    Disabled,
}

/// The auth core, generic over the persistence seam so tests can run it
/// against an in-memory store.
pub struct AuthService<S: UserStore> {
    store: S,
    signer: TokenSigner,
    mailer: Arc<dyn Mailer>,
}

impl<S: UserStore> AuthService<S> {
    pub fn new(store: S, signer: TokenSigner, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            store,
            signer,
            mailer,
        }
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub const fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    /// Create an account from an already-validated, normalized email and a
    /// policy-checked password. A verification email is queued on success;
    /// a delivery fault is logged without undoing the registration.
    ///
    /// # Errors
    /// Store or hashing faults only.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Result<RegisterOutcome> {
        let password_hash = hash_password(password)?;
        let outcome = self
            .store
            .insert_user(NewUser {
                email: email.to_string(),
                password_hash,
                first_name,
                last_name,
            })
            .await?;

        match outcome {
            InsertUserOutcome::Created(user) => {
                if let Err(err) = self.send_verification_email(&user).await {
                    warn!(user_id = %user.id, "failed to queue verification email: {err:#}");
                }
                Ok(RegisterOutcome::Created(user))
            }
            InsertUserOutcome::EmailTaken => Ok(RegisterOutcome::EmailTaken),
        }
    }

    /// Check credentials. Unknown email, empty stored hash, wrong password,
    /// and non-active account all collapse into `None` so the caller has a
    /// single failure signal.
    ///
    /// # Errors
    /// Store faults only.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>> {
        let Some(user) = self.store.find_live_by_email(email).await? else {
            return Ok(None);
        };
        if user.password_hash.is_empty() || !verify_password(password, &user.password_hash) {
            return Ok(None);
        }
        if !user.can_authenticate() {
            return Ok(None);
        }
        Ok(Some(user))
    }

    /// Authenticate and open a session: stamp the login time and issue an
    /// access/refresh pair.
    ///
    /// # Errors
    /// Store or signing faults only.
    pub async fn login(&self, email: &str, password: &str) -> Result<Option<(User, TokenPair)>> {
        let Some(user) = self.authenticate(email, password).await? else {
            return Ok(None);
        };
        self.store.record_login(user.id).await?;
        let pair = self.issue_pair(user.id)?;
        Ok(Some((user, pair)))
    }

    /// Trade a refresh token for a fresh pair. Anything short of a valid
    /// refresh token for a currently active account yields `None`.
    ///
    /// # Errors
    /// Store or signing faults only.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Option<TokenPair>> {
        let Ok(claims) = self.signer.verify_kind(refresh_token, TokenKind::Refresh) else {
            return Ok(None);
        };
        let Ok(user_id) = Uuid::parse_str(&claims.sub) else {
            return Ok(None);
        };
        let Some(user) = self.store.find_by_id(user_id).await? else {
            return Ok(None);
        };
        if !user.can_authenticate() {
            return Ok(None);
        }
        Ok(Some(self.issue_pair(user.id)?))
    }

    /// Apply whitelisted profile fields, returning the updated snapshot.
    ///
    /// # Errors
    /// Store faults only.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Option<User>> {
        self.store.apply_profile_update(user_id, update).await
    }

    /// Start a password reset. Always succeeds from the caller's point of
    /// view; a reset token is issued and mailed only when a live account
    /// holds the email.
    ///
    /// # Errors
    /// Store, signing, or delivery faults only.
    pub async fn request_password_reset(&self, email: &str) -> Result<()> {
        let Some(user) = self.store.find_live_by_email(email).await? else {
            return Ok(());
        };
        let token = self.signer.issue(&user.email, TokenKind::PasswordReset)?;
        self.mailer
            .send(&MailMessage::password_reset(&user.email, &token))?;
        Ok(())
    }

    /// Complete a password reset. Returns `false` without mutating anything
    /// when the token is stale or its email no longer matches a live
    /// account.
    ///
    /// # Errors
    /// Store or hashing faults only.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<bool> {
        let Ok(claims) = self.signer.verify_kind(token, TokenKind::PasswordReset) else {
            return Ok(false);
        };
        let Some(user) = self.store.find_live_by_email(&claims.sub).await? else {
            return Ok(false);
        };
        let password_hash = hash_password(new_password)?;
        self.store.set_password_hash(user.id, &password_hash).await?;
        Ok(true)
    }

    /// Consume an email-verification token. `false` when the token is
    /// stale or the account is gone.
    ///
    /// # Errors
    /// Store faults only.
    pub async fn verify_email(&self, token: &str) -> Result<bool> {
        let Ok(claims) = self
            .signer
            .verify_kind(token, TokenKind::EmailVerification)
        else {
            return Ok(false);
        };
        let Ok(user_id) = Uuid::parse_str(&claims.sub) else {
            return Ok(false);
        };
        let Some(user) = self.store.find_by_id(user_id).await? else {
            return Ok(false);
        };
        if user.status == AccountStatus::Deleted {
            return Ok(false);
        }
        self.store.mark_verified(user.id).await?;
        Ok(true)
    }

    /// Issue and mail a fresh verification token. `false` when the account
    /// is already verified.
    ///
    /// # Errors
    /// Signing or delivery faults only.
    pub async fn send_verification_email(&self, user: &User) -> Result<bool> {
        if user.is_verified {
            return Ok(false);
        }
        let token = self
            .signer
            .issue(&user.id.to_string(), TokenKind::EmailVerification)?;
        self.mailer
            .send(&MailMessage::email_verification(&user.email, &token))?;
        Ok(true)
    }

    /// Soft delete. Idempotent; the email becomes reusable immediately.
    ///
    /// # Errors
    /// Store faults only.
    pub async fn delete_account(&self, user_id: Uuid) -> Result<()> {
        self.store.soft_delete(user_id).await
    }

    /// Resolve a bearer credential for the access gate. Deleted accounts
    /// are indistinguishable from unknown ones.
    ///
    /// # Errors
    /// Store faults only.
    pub async fn resolve_access_token(&self, token: &str) -> Result<GateDecision> {
        let Ok(claims) = self.signer.verify_kind(token, TokenKind::Access) else {
            return Ok(GateDecision::Unauthorized);
        };
        let Ok(user_id) = Uuid::parse_str(&claims.sub) else {
            return Ok(GateDecision::Unauthorized);
        };
        let Some(user) = self.store.find_by_id(user_id).await? else {
            return Ok(GateDecision::Unauthorized);
        };
        match user.status {
            AccountStatus::Active => Ok(GateDecision::Allowed(user)),
            AccountStatus::Inactive => Ok(GateDecision::Disabled),
            AccountStatus::Deleted => Ok(GateDecision::Unauthorized),
        }
    }

    fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair> {
        let subject = user_id.to_string();
        Ok(TokenPair {
            access_token: self.signer.issue(&subject, TokenKind::Access)?,
            refresh_token: self.signer.issue(&subject, TokenKind::Refresh)?,
            expires_in: self.signer.expires_in_seconds(TokenKind::Access),
        })
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use serde_json::Value;

    use crate::api::mailer::recording::RecordingMailer;
    use crate::auth::store::memory::MemoryUserStore;
    use crate::auth::token::TokenConfig;

    use super::*;

    struct Harness {
        service: AuthService<MemoryUserStore>,
        mailer: Arc<RecordingMailer>,
    }

    fn harness() -> Harness {
        let mailer = Arc::new(RecordingMailer::new());
        let signer = TokenSigner::new(&SecretString::from("test-secret".to_string()), TokenConfig::new());
        let service = AuthService::new(MemoryUserStore::new(), signer, mailer.clone());
        Harness { service, mailer }
    }

    async fn registered(harness: &Harness, email: &str, password: &str) -> User {
        match harness
            .service
            .register(email, password, None, None)
            .await
            .unwrap()
        {
            RegisterOutcome::Created(user) => user,
            RegisterOutcome::EmailTaken => panic!("email unexpectedly taken"),
        }
    }

    fn token_from_payload(message: &MailMessage) -> String {
        let payload: Value = serde_json::from_str(&message.payload_json).unwrap();
        payload["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn register_hashes_password_and_mails_verification() {
        let harness = harness();
        let user = registered(&harness, "alice@example.com", "Secret123x").await;

        assert_ne!(user.password_hash, "Secret123x");
        assert!(verify_password("Secret123x", &user.password_hash));

        let sent = harness.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].template, "email_verification");
        assert_eq!(sent[0].to_email, "alice@example.com");
    }

    #[tokio::test]
    async fn duplicate_register_leaves_first_account_untouched() {
        let harness = harness();
        let first = registered(&harness, "alice@example.com", "Secret123x").await;

        let outcome = harness
            .service
            .register("alice@example.com", "Other456yZ", None, None)
            .await
            .unwrap();
        assert!(matches!(outcome, RegisterOutcome::EmailTaken));

        let stored = harness.service.store().get(first.id).unwrap();
        assert!(verify_password("Secret123x", &stored.password_hash));
        assert!(!verify_password("Other456yZ", &stored.password_hash));
    }

    #[tokio::test]
    async fn authenticate_is_uniform_across_failure_causes() {
        let harness = harness();
        registered(&harness, "alice@example.com", "Secret123x").await;

        let unknown = harness
            .service
            .authenticate("nobody@example.com", "Secret123x")
            .await
            .unwrap();
        assert!(unknown.is_none());

        let wrong = harness
            .service
            .authenticate("alice@example.com", "Wrong123x")
            .await
            .unwrap();
        assert!(wrong.is_none());
    }

    #[tokio::test]
    async fn login_stamps_last_login_and_issues_pair() {
        let harness = harness();
        let user = registered(&harness, "alice@example.com", "Secret123x").await;
        assert!(user.last_login_at.is_none());

        let (snapshot, pair) = harness
            .service
            .login("alice@example.com", "Secret123x")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.id, user.id);
        assert!(pair.expires_in > 0);

        let stored = harness.service.store().get(user.id).unwrap();
        assert!(stored.last_login_at.is_some());

        match harness
            .service
            .resolve_access_token(&pair.access_token)
            .await
            .unwrap()
        {
            GateDecision::Allowed(current) => assert_eq!(current.id, user.id),
            other => panic!("expected access, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn refresh_accepts_only_refresh_tokens() {
        let harness = harness();
        registered(&harness, "alice@example.com", "Secret123x").await;
        let (_, pair) = harness
            .service
            .login("alice@example.com", "Secret123x")
            .await
            .unwrap()
            .unwrap();

        assert!(harness
            .service
            .refresh(&pair.refresh_token)
            .await
            .unwrap()
            .is_some());
        assert!(harness
            .service
            .refresh(&pair.access_token)
            .await
            .unwrap()
            .is_none());
        assert!(harness.service.refresh("garbage").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn access_token_is_not_a_refresh_substitute_at_the_gate() {
        let harness = harness();
        registered(&harness, "alice@example.com", "Secret123x").await;
        let (_, pair) = harness
            .service
            .login("alice@example.com", "Secret123x")
            .await
            .unwrap()
            .unwrap();

        let decision = harness
            .service
            .resolve_access_token(&pair.refresh_token)
            .await
            .unwrap();
        assert!(matches!(decision, GateDecision::Unauthorized));
    }

    #[tokio::test]
    async fn reset_request_is_silent_for_unknown_emails() {
        let harness = harness();
        registered(&harness, "alice@example.com", "Secret123x").await;

        harness
            .service
            .request_password_reset("nobody@example.com")
            .await
            .unwrap();
        assert!(harness.mailer.sent().iter().all(|m| m.template != "password_reset"));

        harness
            .service
            .request_password_reset("alice@example.com")
            .await
            .unwrap();
        let resets: Vec<_> = harness
            .mailer
            .sent()
            .into_iter()
            .filter(|m| m.template == "password_reset")
            .collect();
        assert_eq!(resets.len(), 1);
    }

    #[tokio::test]
    async fn reset_password_roundtrip() {
        let harness = harness();
        registered(&harness, "alice@example.com", "Secret123x").await;
        harness
            .service
            .request_password_reset("alice@example.com")
            .await
            .unwrap();
        let message = harness
            .mailer
            .sent()
            .into_iter()
            .find(|m| m.template == "password_reset")
            .unwrap();
        let token = token_from_payload(&message);

        assert!(harness
            .service
            .reset_password(&token, "Fresh789ab")
            .await
            .unwrap());
        assert!(harness
            .service
            .login("alice@example.com", "Fresh789ab")
            .await
            .unwrap()
            .is_some());
        assert!(harness
            .service
            .login("alice@example.com", "Secret123x")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn reset_with_orphaned_email_mutates_nothing() {
        let harness = harness();
        let user = registered(&harness, "alice@example.com", "Secret123x").await;
        harness
            .service
            .request_password_reset("alice@example.com")
            .await
            .unwrap();
        let message = harness
            .mailer
            .sent()
            .into_iter()
            .find(|m| m.template == "password_reset")
            .unwrap();
        let token = token_from_payload(&message);

        harness.service.delete_account(user.id).await.unwrap();
        let before = harness.service.store().get(user.id).unwrap();

        assert!(!harness
            .service
            .reset_password(&token, "Fresh789ab")
            .await
            .unwrap());
        let after = harness.service.store().get(user.id).unwrap();
        assert_eq!(before.password_hash, after.password_hash);
    }

    #[tokio::test]
    async fn verification_email_token_verifies_the_account() {
        let harness = harness();
        let user = registered(&harness, "alice@example.com", "Secret123x").await;
        let message = harness
            .mailer
            .sent()
            .into_iter()
            .find(|m| m.template == "email_verification")
            .unwrap();
        let token = token_from_payload(&message);

        assert!(harness.service.verify_email(&token).await.unwrap());
        let stored = harness.service.store().get(user.id).unwrap();
        assert!(stored.is_verified);

        assert!(!harness
            .service
            .send_verification_email(&stored)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn delete_is_idempotent_and_blocks_login() {
        let harness = harness();
        let user = registered(&harness, "alice@example.com", "Secret123x").await;
        let (_, pair) = harness
            .service
            .login("alice@example.com", "Secret123x")
            .await
            .unwrap()
            .unwrap();

        harness.service.delete_account(user.id).await.unwrap();
        let first = harness.service.store().get(user.id).unwrap();
        assert_eq!(first.status, AccountStatus::Deleted);
        let deleted_at = first.deleted_at.unwrap();

        harness.service.delete_account(user.id).await.unwrap();
        let second = harness.service.store().get(user.id).unwrap();
        assert_eq!(second.deleted_at, Some(deleted_at));

        assert!(harness
            .service
            .login("alice@example.com", "Secret123x")
            .await
            .unwrap()
            .is_none());
        let decision = harness
            .service
            .resolve_access_token(&pair.access_token)
            .await
            .unwrap();
        assert!(matches!(decision, GateDecision::Unauthorized));
    }

    #[tokio::test]
    async fn deleted_email_is_reusable() {
        let harness = harness();
        let user = registered(&harness, "alice@example.com", "Secret123x").await;
        harness.service.delete_account(user.id).await.unwrap();

        let second = registered(&harness, "alice@example.com", "Newpass12x").await;
        assert_ne!(second.id, user.id);
    }

    #[tokio::test]
    async fn inactive_account_is_disabled_at_the_gate() {
        let harness = harness();
        let user = registered(&harness, "alice@example.com", "Secret123x").await;
        let (_, pair) = harness
            .service
            .login("alice@example.com", "Secret123x")
            .await
            .unwrap()
            .unwrap();

        harness
            .service
            .store()
            .update(user.id, |user| user.status = AccountStatus::Inactive);

        let decision = harness
            .service
            .resolve_access_token(&pair.access_token)
            .await
            .unwrap();
        assert!(matches!(decision, GateDecision::Disabled));

        assert!(harness
            .service
            .login("alice@example.com", "Secret123x")
            .await
            .unwrap()
            .is_none());
    }
}
