//! Redis service holding the denylist of revoked login tokens

use redis::{AsyncCommands, Client};

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct RedisService {
    client: Client,
}

fn revoked_key(jti: &str) -> String {
    format!("revoked_token:{}", jti)
}

impl RedisService {
    /// Create a new Redis service
    pub async fn new(url: &str) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Internal(format!("Failed to create Redis client: {}", e)))?;

        // Test connection
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to connect to Redis: {}", e)))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("Redis connection test failed: {}", e)))?;

        Ok(Self { client })
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get Redis connection: {}", e)))
    }

    /// Deny a token id until the token would have expired anyway
    pub async fn revoke_token(&self, jti: &str, ttl_secs: u64) -> AppResult<()> {
        if ttl_secs == 0 {
            return Ok(());
        }
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(revoked_key(jti), "1", ttl_secs)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to revoke token in Redis: {}", e)))?;
        Ok(())
    }

    /// Whether a token id was revoked by a logout
    pub async fn is_token_revoked(&self, jti: &str) -> AppResult<bool> {
        let mut conn = self.connection().await?;
        let exists: bool = conn
            .exists(revoked_key(jti))
            .await
            .map_err(|e| AppError::Internal(format!("Failed to check token in Redis: {}", e)))?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revoked_key_namespace() {
        assert_eq!(revoked_key("abc"), "revoked_token:abc");
    }
}
