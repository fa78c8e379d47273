//! Redis-backed processed-event store for multi-instance deployments.
//!
//! Keys are written with `SET NX EX`, so the marker expires on its own and
//! concurrent marks of one event collapse to a single key. Every command
//! runs under the configured deadline and reports `CacheError` when it
//! expires.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::ProcessedEventStore;

const KEY_PREFIX: &str = "billing:processed_event:";

#[derive(Clone)]
pub struct RedisProcessedEventStore {
    conn: MultiplexedConnection,
    ttl_secs: u64,
    timeout: Duration,
}

impl RedisProcessedEventStore {
    pub fn new(conn: MultiplexedConnection, ttl_secs: u64, timeout: Duration) -> Self {
        Self {
            conn,
            ttl_secs,
            timeout,
        }
    }
}

fn redis_key(key: &str) -> String {
    format!("{}{}", KEY_PREFIX, key)
}

fn cache_error(err: redis::RedisError) -> DomainError {
    DomainError::new(ErrorCode::CacheError, format!("Redis error: {}", err))
}

async fn with_deadline<T>(
    timeout: Duration,
    command: &'static str,
    fut: impl Future<Output = redis::RedisResult<T>>,
) -> Result<T, DomainError> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(cache_error),
        Err(_) => Err(DomainError::new(
            ErrorCode::CacheError,
            format!("Redis {} timed out after {:?}", command, timeout),
        )),
    }
}

#[async_trait]
impl ProcessedEventStore for RedisProcessedEventStore {
    async fn contains(&self, key: &str) -> Result<bool, DomainError> {
        let mut conn = self.conn.clone();
        with_deadline(self.timeout, "EXISTS", conn.exists(redis_key(key))).await
    }

    async fn mark_processed(&self, key: &str) -> Result<(), DomainError> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(redis_key(key))
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(self.ttl_secs);
        let _: Option<String> =
            with_deadline(self.timeout, "SET", cmd.query_async(&mut conn)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced() {
        assert_eq!(
            redis_key("card:evt_1"),
            "billing:processed_event:card:evt_1"
        );
    }

    #[test]
    fn redis_failure_maps_to_cache_error() {
        let err = cache_error(redis::RedisError::from((
            redis::ErrorKind::IoError,
            "connection refused",
        )));
        assert_eq!(err.code, ErrorCode::CacheError);
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn stalled_command_fails_at_deadline() {
        let stalled = std::future::pending::<redis::RedisResult<bool>>();

        let err = with_deadline(Duration::from_millis(20), "EXISTS", stalled)
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::CacheError);
        assert!(err.message.contains("timed out"));
    }

    #[tokio::test]
    async fn command_within_deadline_returns_reply() {
        let reply = async { Ok::<_, redis::RedisError>(true) };
        assert!(with_deadline(Duration::from_secs(1), "EXISTS", reply)
            .await
            .unwrap());
    }
}
