//! Deadline wrapper for provider calls.

use std::future::Future;
use std::time::Duration;

use crate::ports::ProviderError;

/// Runs a provider call with a deadline.
///
/// An elapsed deadline is reported as `Timeout`, which callers treat as
/// unavailable: the provider-side effect may or may not have happened.
pub async fn call_provider<T, F>(
    timeout: Duration,
    operation: &'static str,
    call: F,
) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                operation,
                timeout_ms = timeout.as_millis() as u64,
                "provider call timed out"
            );
            Err(ProviderError::timeout(operation))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ProviderErrorCode;

    #[tokio::test]
    async fn passes_through_completed_result() {
        let result =
            call_provider(Duration::from_secs(1), "noop", async { Ok::<_, ProviderError>(7) }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn elapsed_deadline_is_timeout() {
        let result: Result<(), _> = call_provider(Duration::from_millis(10), "slow", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.code, ProviderErrorCode::Timeout);
        assert!(err.is_unavailable());
    }
}
