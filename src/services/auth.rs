//! Authentication service: login tokens, logout revocation and password reset

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::account::{Account, AccountClaims},
    repository::Repository,
    services::{email::Mailer, redis::RedisService},
};

/// Minimum accepted password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

pub fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// 32 random bytes, hex encoded
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Only this digest is stored, never the token itself
pub fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn reset_link(base_url: &str, token: &str) -> String {
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{}{}token={}", base_url, separator, token)
}

/// Mail the reset link to the account holder. A delivery failure is only
/// logged: the caller answers the same way for known and unknown emails.
async fn notify_reset(mailer: &dyn Mailer, account: &Account, base_url: &str, token: &str) {
    if let Err(e) = mailer
        .send_password_reset(&account.email, &account.name, &reset_link(base_url, token))
        .await
    {
        tracing::error!("Failed to send password reset email to account {}: {}", account.id, e);
    }
}

/// Result of a successful login
#[derive(Debug)]
pub struct LoginSession {
    pub token: String,
    pub account: Account,
    /// Cookie Max-Age, only set for "remember me" logins
    pub persistent_secs: Option<i64>,
}

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
    redis: RedisService,
    mailer: Arc<dyn Mailer>,
}

impl AuthService {
    pub fn new(
        repository: Repository,
        config: AuthConfig,
        redis: RedisService,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self { repository, config, redis, mailer }
    }

    /// Check credentials and issue a signed token
    pub async fn login(&self, email: &str, password: &str, remember_me: bool) -> AppResult<LoginSession> {
        let account = match self.repository.accounts.find_by_email(email.trim()).await? {
            Some(account) => account,
            None => {
                tracing::warn!("Login attempt for unknown email {}", email);
                return Err(AppError::InvalidCredentials);
            }
        };

        if !verify_password(&account.password, password)? {
            tracing::warn!("Wrong password for account {}", account.id);
            return Err(AppError::InvalidCredentials);
        }

        let lifetime = self.config.token_lifetime_secs(remember_me);
        let token = AccountClaims::new(&account, lifetime)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;

        tracing::info!("Account {} logged in", account.id);
        Ok(LoginSession {
            token,
            account,
            persistent_secs: remember_me.then_some(lifetime),
        })
    }

    /// Decode a token and reject it when it was revoked
    pub async fn validate_token(&self, token: &str) -> AppResult<AccountClaims> {
        let claims = AccountClaims::from_token(token, &self.config.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        if self.redis.is_token_revoked(&claims.jti).await? {
            return Err(AppError::Authentication("Token has been revoked".to_string()));
        }
        Ok(claims)
    }

    /// Revoke the token for the rest of its lifetime
    pub async fn logout(&self, claims: &AccountClaims) -> AppResult<()> {
        self.redis.revoke_token(&claims.jti, claims.remaining_secs()).await?;
        tracing::info!("Account {} logged out", claims.account_id);
        Ok(())
    }

    /// Store a reset token and mail it. Unknown emails are silently ignored.
    pub async fn request_password_reset(&self, email: &str) -> AppResult<()> {
        let Some(account) = self.repository.accounts.find_by_email(email.trim()).await? else {
            tracing::info!("Password reset requested for unknown email");
            return Ok(());
        };

        let token = generate_reset_token();
        let expires_at = Utc::now() + Duration::minutes(self.config.password_reset_expiration_minutes);
        self.repository
            .accounts
            .set_reset_token(account.id, &hash_reset_token(&token), expires_at)
            .await?;

        notify_reset(self.mailer.as_ref(), &account, &self.config.password_reset_url, &token).await;
        tracing::info!("Password reset token issued for account {}", account.id);
        Ok(())
    }

    /// Replace the password of the account holding `token`
    pub async fn perform_password_reset(&self, token: &str, new_password: &str) -> AppResult<()> {
        if new_password.len() < MIN_PASSWORD_LENGTH {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        let token_hash = hash_reset_token(token.trim());
        let account = self
            .repository
            .accounts
            .find_by_reset_token(&token_hash)
            .await?
            .ok_or_else(|| AppError::InvalidToken("Reset token is invalid or expired".to_string()))?;

        let password_hash = hash_password(new_password)?;
        if !self
            .repository
            .accounts
            .reset_password(account.id, &token_hash, &password_hash)
            .await?
        {
            return Err(AppError::InvalidToken("Reset token is invalid or expired".to_string()));
        }

        tracing::info!("Password reset for account {}", account.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::email::MockMailer;
    use mockall::predicate::eq;

    fn account() -> Account {
        Account {
            id: 3,
            name: "Bob".to_string(),
            email: "bob@example.com".to_string(),
            password: String::new(),
            is_game_owner: false,
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert_ne!(hash, "correct horse");
        assert!(verify_password(&hash, "correct horse").unwrap());
        assert!(!verify_password(&hash, "wrong horse").unwrap());
    }

    #[test]
    fn test_reset_tokens_are_random_and_hashed() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);

        let digest = hash_reset_token(&a);
        assert_eq!(digest.len(), 64);
        assert_ne!(digest, a);
        assert_eq!(digest, hash_reset_token(&a));
    }

    #[test]
    fn test_reset_link() {
        assert_eq!(reset_link("http://app/reset", "t1"), "http://app/reset?token=t1");
        assert_eq!(reset_link("http://app/reset?lang=fr", "t1"), "http://app/reset?lang=fr&token=t1");
    }

    #[tokio::test]
    async fn test_notify_reset_mails_account_holder() {
        let mut mailer = MockMailer::new();
        mailer
            .expect_send_password_reset()
            .with(eq("bob@example.com"), eq("Bob"), eq("http://app/reset?token=tok"))
            .times(1)
            .returning(|_, _, _| Ok(()));

        notify_reset(&mailer, &account(), "http://app/reset", "tok").await;
    }

    #[tokio::test]
    async fn test_notify_reset_swallows_mail_failure() {
        let mut mailer = MockMailer::new();
        mailer
            .expect_send_password_reset()
            .times(1)
            .returning(|_, _, _| Err(AppError::Internal("smtp down".to_string())));

        // Returns normally so a known email looks like an unknown one
        notify_reset(&mailer, &account(), "http://app/reset", "tok").await;
    }
}
