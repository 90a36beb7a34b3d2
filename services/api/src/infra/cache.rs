use deadpool_redis::Pool;
use deadpool_redis::redis::{AsyncCommands, RedisError, Script};

use crate::domain::repository::CodeStore;
use crate::error::ApiError;

fn redis_err(e: RedisError) -> ApiError {
    ApiError::Internal(e.into())
}

const COMPARE_AND_SWAP: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
  redis.call('SET', KEYS[1], ARGV[2], 'KEEPTTL')
  return 1
end
return 0
"#;

const COMPARE_AND_DELETE: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
  return redis.call('DEL', KEYS[1])
end
return 0
"#;

#[derive(Clone)]
pub struct RedisCodeStore {
    pub pool: Pool,
}

impl RedisCodeStore {
    async fn conn(&self) -> Result<deadpool_redis::Connection, ApiError> {
        self.pool
            .get()
            .await
            .map_err(|e| ApiError::Internal(e.into()))
    }
}

impl CodeStore for RedisCodeStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ApiError> {
        let mut conn = self.conn().await?;
        let value: Option<String> = conn.get(key).await.map_err(redis_err)?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), ApiError> {
        let mut conn = self.conn().await?;
        let (): () = conn
            .set_ex(key, value, ttl_secs.max(1))
            .await
            .map_err(redis_err)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ApiError> {
        let mut conn = self.conn().await?;
        let _: i64 = conn.del(key).await.map_err(redis_err)?;
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &str,
        value: &str,
    ) -> Result<bool, ApiError> {
        let mut conn = self.conn().await?;
        let swapped: i64 = Script::new(COMPARE_AND_SWAP)
            .key(key)
            .arg(expected)
            .arg(value)
            .invoke_async(&mut conn)
            .await
            .map_err(redis_err)?;
        Ok(swapped == 1)
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, ApiError> {
        let mut conn = self.conn().await?;
        let deleted: i64 = Script::new(COMPARE_AND_DELETE)
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(redis_err)?;
        Ok(deleted == 1)
    }

    async fn ttl(&self, key: &str) -> Result<Option<u64>, ApiError> {
        let mut conn = self.conn().await?;
        // -2: missing key, -1: no expiry
        let ttl: i64 = conn.ttl(key).await.map_err(redis_err)?;
        Ok(u64::try_from(ttl).ok())
    }
}
