//! Accounts repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{is_unique_violation, AppError, AppResult},
    models::account::{Account, CreateAccount},
};

#[derive(Clone)]
pub struct AccountsRepository {
    pool: Pool<Postgres>,
}

impl AccountsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get account by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Account> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Account with id {} not found", id)))
    }

    /// Find account by email (case-insensitive)
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    /// Get account by email
    pub async fn get_by_email(&self, email: &str) -> AppResult<Account> {
        self.find_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Account {} not found", email)))
    }

    /// Create an account with an already hashed password
    pub async fn create(&self, account: &CreateAccount, password_hash: &str) -> AppResult<Account> {
        sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (name, email, password, is_game_owner)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(account.name.trim())
        .bind(account.email.trim())
        .bind(password_hash)
        .bind(account.game_owner)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Email {} is already registered", account.email))
            } else {
                e.into()
            }
        })
    }

    /// Update name and/or password hash
    pub async fn update(
        &self,
        id: i32,
        name: Option<&str>,
        password_hash: Option<&str>,
    ) -> AppResult<Account> {
        sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts
            SET name = COALESCE($2, name),
                password = COALESCE($3, password)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Account with id {} not found", id)))
    }

    /// Grant the game owner capability
    pub async fn promote_to_owner(&self, id: i32) -> AppResult<Account> {
        sqlx::query_as::<_, Account>(
            "UPDATE accounts SET is_game_owner = TRUE WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Account with id {} not found", id)))
    }

    /// Store a password reset token hash
    pub async fn set_reset_token(
        &self,
        id: i32,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE accounts SET reset_token_hash = $2, reset_token_expires_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Find the account holding a non-expired reset token
    pub async fn find_by_reset_token(&self, token_hash: &str) -> AppResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT * FROM accounts
            WHERE reset_token_hash = $1 AND reset_token_expires_at > NOW()
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    /// Replace the password and consume the reset token.
    /// Returns false when the token was consumed concurrently.
    pub async fn reset_password(
        &self,
        id: i32,
        token_hash: &str,
        password_hash: &str,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET password = $3, reset_token_hash = NULL, reset_token_expires_at = NULL
            WHERE id = $1 AND reset_token_hash = $2
            "#,
        )
        .bind(id)
        .bind(token_hash)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Delete an account; dependent rows follow the ON DELETE rules of the schema
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Account with id {} not found", id)));
        }
        Ok(())
    }
}
