//! User persistence behind a trait seam.
//!
//! `PgUserStore` is the production implementation; tests run against an
//! in-memory store so the service logic is exercised without a database.

use anyhow::{Context, Result, anyhow};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::user::{AccountStatus, User};

/// Fields required to create an account. Everything else takes the
/// column defaults.
#[derive(Debug)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Whitelisted profile changes. `None` leaves the column untouched; no
/// other column is reachable through this struct.
#[derive(Clone, Debug, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub timezone: Option<String>,
    pub currency: Option<String>,
    pub language: Option<String>,
    pub theme: Option<String>,
}

/// Outcome of an insert attempt. A duplicate live email is expected
/// control flow, not an error.
#[derive(Debug)]
pub enum InsertUserOutcome {
    Created(User),
    EmailTaken,
}

/// The user directory seam.
#[allow(async_fn_in_trait)]
pub trait UserStore {
    /// Insert a new account, reporting `EmailTaken` when a live account
    /// already holds the email.
    async fn insert_user(&self, new_user: NewUser) -> Result<InsertUserOutcome>;

    /// Look up a non-deleted account by (normalized) email.
    async fn find_live_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Stamp `last_login_at` with the current time.
    async fn record_login(&self, id: Uuid) -> Result<()>;

    /// Apply whitelisted profile fields and return the updated row, or
    /// `None` if the account is gone.
    async fn apply_profile_update(&self, id: Uuid, update: &ProfileUpdate)
        -> Result<Option<User>>;

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<()>;

    async fn mark_verified(&self, id: Uuid) -> Result<()>;

    /// Soft delete: mark the row deleted and stamp `deleted_at`. A second
    /// call is a no-op.
    async fn soft_delete(&self, id: Uuid) -> Result<()>;
}

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

const USER_COLUMNS: &str = "id, email, password_hash, status, is_verified, is_superuser, \
     first_name, last_name, phone, timezone, currency, language, theme, \
     created_at, updated_at, last_login_at, deleted_at";

impl PgUserStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &PgRow) -> Result<User> {
    let status: String = row.get("status");
    let status = AccountStatus::parse(&status)
        .ok_or_else(|| anyhow!("unknown account status in users row: {status}"))?;

    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        status,
        is_verified: row.get("is_verified"),
        is_superuser: row.get("is_superuser"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        phone: row.get("phone"),
        timezone: row.get("timezone"),
        currency: row.get("currency"),
        language: row.get("language"),
        theme: row.get("theme"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        last_login_at: row.get("last_login_at"),
        deleted_at: row.get("deleted_at"),
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().as_deref() == Some("23505");
    }
    false
}

impl UserStore for PgUserStore {
    async fn insert_user(&self, new_user: NewUser) -> Result<InsertUserOutcome> {
        let query = format!(
            "INSERT INTO users (id, email, password_hash, first_name, last_name) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {USER_COLUMNS}"
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = %query
        );
        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(&new_user.email)
            .bind(&new_user.password_hash)
            .bind(&new_user.first_name)
            .bind(&new_user.last_name)
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => Ok(InsertUserOutcome::Created(user_from_row(&row)?)),
            Err(err) if is_unique_violation(&err) => Ok(InsertUserOutcome::EmailTaken),
            Err(err) => Err(err).context("failed to insert user"),
        }
    }

    async fn find_live_by_email(&self, email: &str) -> Result<Option<User>> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND status <> 'deleted'"
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = %query
        );
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to look up user by email")?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = %query
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to look up user by id")?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn record_login(&self, id: Uuid) -> Result<()> {
        let query = "UPDATE users SET last_login_at = now(), updated_at = now() WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to record login")?;
        Ok(())
    }

    async fn apply_profile_update(
        &self,
        id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Option<User>> {
        let query = format!(
            "UPDATE users SET \
                 first_name = COALESCE($2, first_name), \
                 last_name = COALESCE($3, last_name), \
                 phone = COALESCE($4, phone), \
                 timezone = COALESCE($5, timezone), \
                 currency = COALESCE($6, currency), \
                 language = COALESCE($7, language), \
                 theme = COALESCE($8, theme), \
                 updated_at = now() \
             WHERE id = $1 AND status <> 'deleted' \
             RETURNING {USER_COLUMNS}"
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = %query
        );
        let row = sqlx::query(&query)
            .bind(id)
            .bind(&update.first_name)
            .bind(&update.last_name)
            .bind(&update.phone)
            .bind(&update.timezone)
            .bind(&update.currency)
            .bind(&update.language)
            .bind(&update.theme)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to update profile")?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<()> {
        let query = "UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to update password hash")?;
        Ok(())
    }

    async fn mark_verified(&self, id: Uuid) -> Result<()> {
        let query = "UPDATE users SET is_verified = true, updated_at = now() WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to mark user verified")?;
        Ok(())
    }

    async fn soft_delete(&self, id: Uuid) -> Result<()> {
        let query = "UPDATE users \
             SET status = 'deleted', deleted_at = now(), updated_at = now() \
             WHERE id = $1 AND status <> 'deleted'";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to soft delete user")?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod memory {
    //! In-memory store for service and handler tests.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;

    #[derive(Default)]
    pub(crate) struct MemoryUserStore {
        users: Mutex<HashMap<Uuid, User>>,
    }

    impl MemoryUserStore {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn get(&self, id: Uuid) -> Option<User> {
            self.users.lock().unwrap().get(&id).cloned()
        }

        pub(crate) fn update(&self, id: Uuid, mutate: impl FnOnce(&mut User)) {
            if let Some(user) = self.users.lock().unwrap().get_mut(&id) {
                mutate(user);
            }
        }
    }

    impl UserStore for MemoryUserStore {
        async fn insert_user(&self, new_user: NewUser) -> Result<InsertUserOutcome> {
            let mut users = self.users.lock().unwrap();
            let taken = users
                .values()
                .any(|user| user.email == new_user.email && user.status != AccountStatus::Deleted);
            if taken {
                return Ok(InsertUserOutcome::EmailTaken);
            }

            let now = Utc::now();
            let user = User {
                id: Uuid::new_v4(),
                email: new_user.email,
                password_hash: new_user.password_hash,
                status: AccountStatus::Active,
                is_verified: false,
                is_superuser: false,
                first_name: new_user.first_name,
                last_name: new_user.last_name,
                phone: None,
                timezone: "UTC".to_string(),
                currency: "USD".to_string(),
                language: "en".to_string(),
                theme: "light".to_string(),
                created_at: now,
                updated_at: now,
                last_login_at: None,
                deleted_at: None,
            };
            users.insert(user.id, user.clone());
            Ok(InsertUserOutcome::Created(user))
        }

        async fn find_live_by_email(&self, email: &str) -> Result<Option<User>> {
            let users = self.users.lock().unwrap();
            Ok(users
                .values()
                .find(|user| user.email == email && user.status != AccountStatus::Deleted)
                .cloned())
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
            Ok(self.get(id))
        }

        async fn record_login(&self, id: Uuid) -> Result<()> {
            let mut users = self.users.lock().unwrap();
            if let Some(user) = users.get_mut(&id) {
                user.last_login_at = Some(Utc::now());
                user.updated_at = Utc::now();
            }
            Ok(())
        }

        async fn apply_profile_update(
            &self,
            id: Uuid,
            update: &ProfileUpdate,
        ) -> Result<Option<User>> {
            let mut users = self.users.lock().unwrap();
            let Some(user) = users.get_mut(&id) else {
                return Ok(None);
            };
            if user.status == AccountStatus::Deleted {
                return Ok(None);
            }
            if let Some(value) = &update.first_name {
                user.first_name = Some(value.clone());
            }
            if let Some(value) = &update.last_name {
                user.last_name = Some(value.clone());
            }
            if let Some(value) = &update.phone {
                user.phone = Some(value.clone());
            }
            if let Some(value) = &update.timezone {
                user.timezone = value.clone();
            }
            if let Some(value) = &update.currency {
                user.currency = value.clone();
            }
            if let Some(value) = &update.language {
                user.language = value.clone();
            }
            if let Some(value) = &update.theme {
                user.theme = value.clone();
            }
            user.updated_at = Utc::now();
            Ok(Some(user.clone()))
        }

        async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<()> {
            let mut users = self.users.lock().unwrap();
            if let Some(user) = users.get_mut(&id) {
                user.password_hash = password_hash.to_string();
                user.updated_at = Utc::now();
            }
            Ok(())
        }

        async fn mark_verified(&self, id: Uuid) -> Result<()> {
            let mut users = self.users.lock().unwrap();
            if let Some(user) = users.get_mut(&id) {
                user.is_verified = true;
                user.updated_at = Utc::now();
            }
            Ok(())
        }

        async fn soft_delete(&self, id: Uuid) -> Result<()> {
            let mut users = self.users.lock().unwrap();
            if let Some(user) = users.get_mut(&id) {
                if user.status != AccountStatus::Deleted {
                    user.status = AccountStatus::Deleted;
                    user.deleted_at = Some(Utc::now());
                    user.updated_at = Utc::now();
                }
            }
            Ok(())
        }
    }
}
