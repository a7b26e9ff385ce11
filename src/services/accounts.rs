//! Account management service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::account::{Account, AccountClaims, CreateAccount, UpdateAccount},
    repository::Repository,
    services::auth::{hash_password, verify_password},
};

#[derive(Clone)]
pub struct AccountsService {
    repository: Repository,
}

impl AccountsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Public sign-up
    pub async fn create(&self, account: CreateAccount) -> AppResult<Account> {
        account.validate()?;

        let password_hash = hash_password(&account.password)?;
        let created = self.repository.accounts.create(&account, &password_hash).await?;

        tracing::info!(
            "Account {} created (game owner: {})",
            created.id,
            created.is_game_owner
        );
        Ok(created)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Account> {
        self.repository.accounts.get_by_id(id).await
    }

    pub async fn get_by_email(&self, email: &str) -> AppResult<Account> {
        self.repository.accounts.get_by_email(email).await
    }

    /// Update the caller's own profile. Changing the password needs the current one.
    pub async fn update_own(&self, claims: &AccountClaims, update: UpdateAccount) -> AppResult<Account> {
        update.validate()?;

        let password_hash = match update.new_password {
            Some(ref new_password) => {
                let account = self.repository.accounts.get_by_id(claims.account_id).await?;
                let current = update.current_password.as_deref().ok_or_else(|| {
                    AppError::Validation("current_password is required to change the password".to_string())
                })?;
                if !verify_password(&account.password, current)? {
                    return Err(AppError::InvalidCredentials);
                }
                Some(hash_password(new_password)?)
            }
            None => None,
        };

        let name = update.name.as_deref().map(str::trim);
        self.repository
            .accounts
            .update(claims.account_id, name, password_hash.as_deref())
            .await
    }

    /// Resolve `email` and require it to be the caller's own account
    async fn own_account(&self, claims: &AccountClaims, email: &str) -> AppResult<Account> {
        let account = self.repository.accounts.get_by_email(email).await?;
        if account.id != claims.account_id {
            tracing::warn!(
                "Account {} tried to modify account {}",
                claims.account_id,
                account.id
            );
            return Err(AppError::Authorization(
                "You can only modify your own account".to_string(),
            ));
        }
        Ok(account)
    }

    /// Grant the caller the game owner capability
    pub async fn promote_to_owner(&self, claims: &AccountClaims, email: &str) -> AppResult<Account> {
        let account = self.own_account(claims, email).await?;
        if account.is_game_owner {
            return Ok(account);
        }
        let promoted = self.repository.accounts.promote_to_owner(account.id).await?;
        tracing::info!("Account {} is now a game owner", promoted.id);
        Ok(promoted)
    }

    /// Delete the caller's account unless it still has lendings in progress
    pub async fn delete_own(&self, claims: &AccountClaims, email: &str) -> AppResult<()> {
        let account = self.own_account(claims, email).await?;

        let open = self
            .repository
            .lending_records
            .count_open_for_account(account.id)
            .await?;
        if open > 0 {
            return Err(AppError::InvalidOperation(format!(
                "Account has {} lending record(s) in progress",
                open
            )));
        }

        self.repository.accounts.delete(account.id).await?;
        tracing::info!("Account {} deleted", account.id);
        Ok(())
    }
}
