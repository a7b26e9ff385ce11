//! Account model, token claims and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Account as stored in the database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Account {
    pub id: i32,
    pub name: String,
    pub email: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password: String,
    /// Capability flag: the account can own games and answer borrow requests
    pub is_game_owner: bool,
    #[serde(skip_serializing)]
    pub reset_token_hash: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Public view of another account
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AccountShort {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub is_game_owner: bool,
}

impl From<Account> for AccountShort {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            email: account.email,
            is_game_owner: account.is_game_owner,
        }
    }
}

/// Sign-up request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAccount {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    /// Register directly as a game owner
    #[serde(default)]
    pub game_owner: bool,
}

/// Update own account request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateAccount {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
    /// Current password (required to change password)
    pub current_password: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: Option<String>,
}

/// JWT claims for authenticated accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountClaims {
    /// Account email
    pub sub: String,
    pub account_id: i32,
    /// Token id, used for revocation on logout
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
}

impl AccountClaims {
    pub fn new(account: &Account, lifetime_secs: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: account.email.clone(),
            account_id: account.id,
            jti: Uuid::new_v4().to_string(),
            exp: now + lifetime_secs,
            iat: now,
        }
    }

    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    /// Seconds left before the token expires
    pub fn remaining_secs(&self) -> u64 {
        (self.exp - Utc::now().timestamp()).max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> Account {
        Account {
            id: 7,
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "hash".to_string(),
            is_game_owner: true,
            reset_token_hash: Some("abc".to_string()),
            reset_token_expires_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_token_round_trip() {
        let claims = AccountClaims::new(&account(), 3600);
        let token = claims.create_token("secret").unwrap();
        let parsed = AccountClaims::from_token(&token, "secret").unwrap();
        assert_eq!(parsed.account_id, 7);
        assert_eq!(parsed.sub, "alice@example.com");
        assert_eq!(parsed.jti, claims.jti);
    }

    #[test]
    fn test_token_wrong_secret() {
        let token = AccountClaims::new(&account(), 3600).create_token("secret").unwrap();
        assert!(AccountClaims::from_token(&token, "other").is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let mut claims = AccountClaims::new(&account(), 3600);
        claims.exp = Utc::now().timestamp() - 600;
        let token = claims.create_token("secret").unwrap();
        assert!(AccountClaims::from_token(&token, "secret").is_err());
        assert_eq!(claims.remaining_secs(), 0);
    }

    #[test]
    fn test_secrets_not_serialized() {
        let json = serde_json::to_value(account()).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("reset_token_hash").is_none());
        assert_eq!(json["is_game_owner"], true);
    }

    #[test]
    fn test_create_account_validation() {
        let request = CreateAccount {
            name: "Bob".to_string(),
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            game_owner: false,
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }
}
