//! Accounts repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};

use crate::{
    error::{AppError, AppResult},
    models::account::{Account, NewAccount},
};

#[derive(Clone)]
pub struct AccountsRepository {
    pool: Pool<Sqlite>,
}

impl AccountsRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Get account by ID
    pub async fn get_by_id(&self, id: i64) -> AppResult<Account> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Utilisateur non trouvé".to_string()))
    }

    /// Get account by email (emails are stored lowercase)
    pub async fn get_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    /// Get account holding a verification token
    pub async fn get_by_verification_token(&self, token: &str) -> AppResult<Option<Account>> {
        let account =
            sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE verification_token = ?")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;

        Ok(account)
    }

    /// Check if email already exists
    pub async fn email_exists(&self, email: &str, exclude_id: Option<i64>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE email = ? AND id != COALESCE(?, -1))",
        )
        .bind(email)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Create a new, unverified account
    pub async fn create(&self, account: &NewAccount) -> AppResult<Account> {
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (
                last_name, first_name, email, password_hash, role, created_at,
                email_verified, verification_token, verification_token_expires_at
            )
            VALUES (?, ?, ?, ?, 'utilisateur', ?, 0, ?, ?)
            "#,
        )
        .bind(&account.last_name)
        .bind(&account.first_name)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(Utc::now())
        .bind(&account.verification_token)
        .bind(account.verification_token_expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::Conflict("Cet email existe déjà".to_string())
            }
            other => AppError::Database(other),
        })?;

        self.get_by_id(result.last_insert_rowid()).await
    }

    /// Replace the verification token
    pub async fn set_verification_token(
        &self,
        id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE accounts SET verification_token = ?, verification_token_expires_at = ? WHERE id = ?",
        )
        .bind(token)
        .bind(expires_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Mark the email verified and consume the token.
    /// Returns false when the token was already consumed or replaced.
    pub async fn consume_verification_token(&self, id: i64, token: &str) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET email_verified = 1, verification_token = NULL, verification_token_expires_at = NULL
            WHERE id = ? AND verification_token = ?
            "#,
        )
        .bind(id)
        .bind(token)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Store a reset code, replacing any previous one
    pub async fn set_reset_code(&self, id: i64, code: &str, expires_at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE accounts SET reset_code = ?, reset_code_expires_at = ? WHERE id = ?")
            .bind(code)
            .bind(expires_at)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Set a new password and consume the reset code.
    /// Returns false when the code was already consumed or replaced.
    pub async fn reset_password(&self, id: i64, code: &str, password_hash: &str) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET password_hash = ?, reset_code = NULL, reset_code_expires_at = NULL
            WHERE id = ? AND reset_code = ?
            "#,
        )
        .bind(password_hash)
        .bind(id)
        .bind(code)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Update own profile fields; `None` keeps the current value
    pub async fn update_profile(
        &self,
        id: i64,
        last_name: Option<&str>,
        first_name: Option<&str>,
        email: Option<&str>,
        password_hash: Option<&str>,
    ) -> AppResult<Account> {
        sqlx::query(
            r#"
            UPDATE accounts SET
                last_name = COALESCE(?, last_name),
                first_name = COALESCE(?, first_name),
                email = COALESCE(?, email),
                password_hash = COALESCE(?, password_hash)
            WHERE id = ?
            "#,
        )
        .bind(last_name)
        .bind(first_name)
        .bind(email)
        .bind(password_hash)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::Conflict("Cet email est déjà utilisé".to_string())
            }
            other => AppError::Database(other),
        })?;

        self.get_by_id(id).await
    }

    /// Update profile photo file name
    pub async fn update_photo(&self, id: i64, photo: &str) -> AppResult<()> {
        sqlx::query("UPDATE accounts SET photo = ? WHERE id = ?")
            .bind(photo)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Delete an account; books, members, loans and fines go with it
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Utilisateur non trouvé".to_string()));
        }

        Ok(())
    }

    /// Remember a logged-out token until its natural expiry
    pub async fn revoke_token(&self, jti: &str, expires_at: i64) -> AppResult<()> {
        sqlx::query("INSERT OR IGNORE INTO revoked_tokens (jti, expires_at) VALUES (?, ?)")
            .bind(jti)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Check if a token was revoked
    pub async fn is_token_revoked(&self, jti: &str) -> AppResult<bool> {
        let revoked: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM revoked_tokens WHERE jti = ?)")
                .bind(jti)
                .fetch_one(&self.pool)
                .await?;

        Ok(revoked)
    }

    /// Forget revoked tokens that have expired anyway
    pub async fn purge_revoked_tokens(&self, now: i64) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
