/// Account manager implementation using runtime queries
/// Uses sqlx runtime query building instead of compile-time macros
/// to avoid needing DATABASE_URL during compilation

use crate::{
    account::{Role, UpdateProfileRequest, ValidatedSession},
    config::ServerConfig,
    db::models::{Account, Session},
    error::{QueueError, QueueResult},
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
    config: Arc<ServerConfig>,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(db: SqlitePool, config: Arc<ServerConfig>) -> Self {
        Self { db, config }
    }

    /// Register a new account and open a session for it
    pub async fn register(
        &self,
        name: String,
        email: String,
        phone: String,
        password: String,
        requested_role: Option<String>,
    ) -> QueueResult<(Account, Session)> {
        let email = email.trim().to_lowercase();

        self.validate_name(&name)?;
        self.validate_email(&email)?;
        self.validate_phone(&phone)?;
        self.validate_password(&password)?;

        if self.email_exists(&email).await? {
            return Err(QueueError::Conflict("Email already registered".to_string()));
        }

        let role = self.resolve_role(&email, requested_role.as_deref())?;
        let password_hash = Self::hash_password(&password)?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO account (id, name, email, phone, role, password_hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&id)
        .bind(&name)
        .bind(&email)
        .bind(&phone)
        .bind(role.as_str())
        .bind(&password_hash)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(QueueError::Database)?;

        crate::metrics::record_account_creation(role.as_str());
        tracing::info!(account_id = %id, role = role.as_str(), "Registered new account");

        let session = self.create_session(&id).await?;

        Ok((
            Account {
                id,
                name,
                email,
                phone,
                role: role.as_str().to_string(),
                avatar: None,
                password_hash,
                created_at: now,
                updated_at: now,
                deactivated_at: None,
            },
            session,
        ))
    }

    /// Authenticate account and create a session
    pub async fn login(&self, email: &str, password: &str) -> QueueResult<(Account, Session)> {
        let email = email.trim().to_lowercase();

        // Unknown emails and bad passwords look the same to the caller
        let account = match self.get_account_by_email(&email).await {
            Ok(account) => account,
            Err(QueueError::NotFound(_)) => {
                return Err(QueueError::Authentication("Invalid credentials".to_string()))
            }
            Err(e) => return Err(e),
        };

        if account.deactivated_at.is_some() {
            return Err(QueueError::AccountDeactivated(
                "Account is deactivated".to_string(),
            ));
        }

        let valid = Self::verify_password(password, &account.password_hash)?;
        if !valid {
            return Err(QueueError::Authentication("Invalid credentials".to_string()));
        }

        let session = self.create_session(&account.id).await?;

        Ok((account, session))
    }

    /// Create a session for an account
    pub async fn create_session(&self, account_id: &str) -> QueueResult<Session> {
        let session_id = Uuid::new_v4().to_string();
        let token = Self::generate_session_token();

        let now = Utc::now();
        let expires_at = now + Duration::hours(self.config.sessions.session_ttl_hours);

        sqlx::query(
            "INSERT INTO session (id, account_id, token, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&session_id)
        .bind(account_id)
        .bind(&token)
        .bind(now)
        .bind(expires_at)
        .execute(&self.db)
        .await
        .map_err(QueueError::Database)?;

        Ok(Session {
            id: session_id,
            account_id: account_id.to_string(),
            token,
            created_at: now,
            expires_at,
        })
    }

    /// Validate a bearer token and return session info
    pub async fn validate_token(&self, token: &str) -> QueueResult<ValidatedSession> {
        let row = sqlx::query("SELECT id, account_id, expires_at FROM session WHERE token = ?1")
            .bind(token)
            .fetch_optional(&self.db)
            .await
            .map_err(QueueError::Database)?
            .ok_or_else(|| QueueError::Authentication("Invalid or expired session".to_string()))?;

        let session_id: String = row.get("id");
        let account_id: String = row.get("account_id");
        let expires_at: DateTime<Utc> = row.get("expires_at");

        if Utc::now() > expires_at {
            return Err(QueueError::Authentication("Session expired".to_string()));
        }

        let account = self.get_account(&account_id).await?;
        if account.deactivated_at.is_some() {
            return Err(QueueError::AccountDeactivated(
                "Account is deactivated".to_string(),
            ));
        }

        Ok(ValidatedSession {
            account_id,
            session_id,
            role: Role::from_str(&account.role)?,
        })
    }

    /// Delete a session (logout)
    pub async fn delete_session(&self, session_id: &str) -> QueueResult<()> {
        sqlx::query("DELETE FROM session WHERE id = ?1")
            .bind(session_id)
            .execute(&self.db)
            .await
            .map_err(QueueError::Database)?;

        Ok(())
    }

    /// Get account by id
    pub async fn get_account(&self, account_id: &str) -> QueueResult<Account> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, name, email, phone, role, avatar, password_hash,
                    created_at, updated_at, deactivated_at
             FROM account WHERE id = ?1",
        )
        .bind(account_id)
        .fetch_optional(&self.db)
        .await
        .map_err(QueueError::Database)?
        .ok_or_else(|| QueueError::NotFound("Account not found".to_string()))?;

        Ok(account)
    }

    /// Get account by email (stored lowercase)
    pub async fn get_account_by_email(&self, email: &str) -> QueueResult<Account> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, name, email, phone, role, avatar, password_hash,
                    created_at, updated_at, deactivated_at
             FROM account WHERE email = ?1",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .map_err(QueueError::Database)?
        .ok_or_else(|| QueueError::NotFound("Account not found".to_string()))?;

        Ok(account)
    }

    /// Update profile fields; absent fields are left unchanged
    pub async fn update_profile(
        &self,
        account_id: &str,
        update: UpdateProfileRequest,
    ) -> QueueResult<Account> {
        let account = self.get_account(account_id).await?;

        let name = match update.name {
            Some(n) => {
                self.validate_name(&n)?;
                n
            }
            None => account.name,
        };
        let phone = match update.phone {
            Some(p) => {
                self.validate_phone(&p)?;
                p
            }
            None => account.phone,
        };
        let email = match update.email {
            Some(e) => {
                let e = e.trim().to_lowercase();
                self.validate_email(&e)?;
                if e != account.email && self.email_exists(&e).await? {
                    return Err(QueueError::Conflict("Email already registered".to_string()));
                }
                e
            }
            None => account.email,
        };
        let avatar = update.avatar.or(account.avatar);

        let now = Utc::now();
        sqlx::query(
            "UPDATE account SET name = ?1, email = ?2, phone = ?3, avatar = ?4, updated_at = ?5 WHERE id = ?6",
        )
        .bind(&name)
        .bind(&email)
        .bind(&phone)
        .bind(&avatar)
        .bind(now)
        .bind(account_id)
        .execute(&self.db)
        .await
        .map_err(QueueError::Database)?;

        self.get_account(account_id).await
    }

    /// Deactivate an account (soft delete) and revoke its sessions
    pub async fn deactivate_account(&self, account_id: &str) -> QueueResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE account SET deactivated_at = ?1, updated_at = ?2 WHERE id = ?3 AND deactivated_at IS NULL",
        )
        .bind(now)
        .bind(now)
        .bind(account_id)
        .execute(&self.db)
        .await
        .map_err(QueueError::Database)?;

        if result.rows_affected() == 0 {
            return Err(QueueError::NotFound("Account not found".to_string()));
        }

        sqlx::query("DELETE FROM session WHERE account_id = ?1")
            .bind(account_id)
            .execute(&self.db)
            .await
            .map_err(QueueError::Database)?;

        tracing::info!("Account deactivated: {}", account_id);

        Ok(())
    }

    /// Generate a password reset token
    ///
    /// Returns None for unknown or deactivated emails so the caller can
    /// respond identically either way.
    pub async fn generate_password_reset_token(
        &self,
        email: &str,
    ) -> QueueResult<Option<(String, Account)>> {
        let email = email.trim().to_lowercase();

        let account = match self.get_account_by_email(&email).await {
            Ok(account) => account,
            Err(QueueError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        if account.deactivated_at.is_some() {
            return Ok(None);
        }

        let token = Uuid::new_v4().to_string();
        let now = Utc::now();
        let expires_at = now + Duration::minutes(self.config.sessions.reset_token_ttl_minutes);

        sqlx::query(
            "INSERT INTO password_reset_token (token, account_id, created_at, expires_at, used)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&token)
        .bind(&account.id)
        .bind(now)
        .bind(expires_at)
        .bind(false)
        .execute(&self.db)
        .await
        .map_err(QueueError::Database)?;

        Ok(Some((token, account)))
    }

    /// Reset password using a reset token
    ///
    /// Validates the token, updates the password, and invalidates all sessions
    pub async fn reset_password(&self, token: &str, new_password: &str) -> QueueResult<()> {
        self.validate_password(new_password)?;

        let now = Utc::now();

        let row = sqlx::query(
            "SELECT account_id, expires_at, used FROM password_reset_token WHERE token = ?1",
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await
        .map_err(QueueError::Database)?
        .ok_or_else(|| QueueError::NotFound("Invalid reset token".to_string()))?;

        let account_id: String = row.try_get("account_id")?;
        let expires_at: DateTime<Utc> = row.try_get("expires_at")?;
        let used: bool = row.try_get("used")?;

        if used {
            return Err(QueueError::Validation(
                "Reset token has already been used".to_string(),
            ));
        }

        if now > expires_at {
            return Err(QueueError::Validation(
                "Reset token has expired".to_string(),
            ));
        }

        let password_hash = Self::hash_password(new_password)?;

        sqlx::query("UPDATE account SET password_hash = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(&password_hash)
            .bind(now)
            .bind(&account_id)
            .execute(&self.db)
            .await
            .map_err(QueueError::Database)?;

        sqlx::query("UPDATE password_reset_token SET used = true WHERE token = ?1")
            .bind(token)
            .execute(&self.db)
            .await
            .map_err(QueueError::Database)?;

        sqlx::query("DELETE FROM session WHERE account_id = ?1")
            .bind(&account_id)
            .execute(&self.db)
            .await
            .map_err(QueueError::Database)?;

        tracing::info!("Password reset successful for account: {}", account_id);

        Ok(())
    }

    /// Cleanup expired sessions
    ///
    /// Called periodically to remove expired sessions from the database.
    pub async fn cleanup_expired_sessions(&self) -> QueueResult<u64> {
        let result = sqlx::query("DELETE FROM session WHERE expires_at < ?1")
            .bind(Utc::now())
            .execute(&self.db)
            .await
            .map_err(QueueError::Database)?;

        let deleted = result.rows_affected();

        if deleted > 0 {
            tracing::info!(sessions_deleted = deleted, "Cleaned up expired sessions");
        } else {
            tracing::debug!("Session cleanup: no expired sessions found");
        }

        Ok(deleted)
    }

    /// Cleanup expired password reset tokens
    pub async fn cleanup_expired_reset_tokens(&self) -> QueueResult<u64> {
        let result = sqlx::query("DELETE FROM password_reset_token WHERE expires_at < ?1")
            .bind(Utc::now())
            .execute(&self.db)
            .await
            .map_err(QueueError::Database)?;

        Ok(result.rows_affected())
    }

    /// Check if email exists
    async fn email_exists(&self, email: &str) -> QueueResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM account WHERE email = ?1")
            .bind(email)
            .fetch_one(&self.db)
            .await
            .map_err(QueueError::Database)?;

        Ok(count > 0)
    }

    /// Resolve the role for a new registration
    ///
    /// Emails on the configured admin list always get the admin role;
    /// everyone else may pick applicant or parent.
    fn resolve_role(&self, email: &str, requested: Option<&str>) -> QueueResult<Role> {
        if self.config.admin.admin_emails.iter().any(|a| a == email) {
            return Ok(Role::Admin);
        }

        match requested {
            None => Ok(Role::Applicant),
            Some(r) => {
                let role = Role::from_str(r)?;
                if role.is_admin() {
                    return Err(QueueError::Validation(
                        "Admin role cannot be self-assigned".to_string(),
                    ));
                }
                Ok(role)
            }
        }
    }

    /// Hash a password with Argon2id
    fn hash_password(password: &str) -> QueueResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| QueueError::Internal(format!("Password hashing failed: {}", e)))?;

        Ok(hash.to_string())
    }

    /// Verify a password against a stored hash
    fn verify_password(password: &str, hash: &str) -> QueueResult<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| QueueError::Internal(format!("Invalid password hash: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Generate an opaque session token (32 random bytes, base64url)
    fn generate_session_token() -> String {
        use base64::Engine;
        use rand::RngCore;

        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Validate display name
    fn validate_name(&self, name: &str) -> QueueResult<()> {
        if name.trim().is_empty() {
            return Err(QueueError::Validation("Name cannot be empty".to_string()));
        }

        if name.len() > 200 {
            return Err(QueueError::Validation("Name too long".to_string()));
        }

        Ok(())
    }

    /// Validate email format
    fn validate_email(&self, email: &str) -> QueueResult<()> {
        if !email.contains('@') {
            return Err(QueueError::Validation("Invalid email format".to_string()));
        }

        Ok(())
    }

    /// Validate phone number
    fn validate_phone(&self, phone: &str) -> QueueResult<()> {
        if phone.trim().is_empty() {
            return Err(QueueError::Validation("Phone cannot be empty".to_string()));
        }

        Ok(())
    }

    /// Validate password strength
    fn validate_password(&self, password: &str) -> QueueResult<()> {
        if password.len() < 8 {
            return Err(QueueError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        Ok(())
    }
}
