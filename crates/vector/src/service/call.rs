//! Per-call deadline and cancellation.

use lake_core::{AppError, AppResult};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Caller-supplied controls for one service operation.
///
/// Every embedding call and store call made on behalf of the operation is
/// raced against the timeout and the cancellation token. Either firing
/// abandons the wait and yields `AppError::Timeout`.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub timeout: Option<Duration>,
    pub cancel: CancellationToken,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Await `fut` under this call's deadline and cancellation token.
    pub(crate) async fn run<T, F>(&self, what: &str, fut: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        let bounded = async {
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
                    AppError::Timeout(format!("{} did not finish within {:?}", what, limit))
                })?,
                None => fut.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                tracing::warn!("{} cancelled", what);
                Err(AppError::Timeout(format!("{} was cancelled", what)))
            }
            result = bounded => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lake_core::ErrorKind;

    #[tokio::test]
    async fn test_completes_within_deadline() {
        let opts = CallOptions::new().with_timeout(Duration::from_secs(5));
        let value = opts.run("quick", async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_deadline_yields_timeout() {
        let opts = CallOptions::new().with_timeout(Duration::from_millis(20));
        let err = opts
            .run("slow", async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_cancelled_token_yields_timeout() {
        let token = CancellationToken::new();
        token.cancel();
        let opts = CallOptions::new().with_cancel(token);

        let err = opts
            .run("pending", std::future::pending::<AppResult<()>>())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.to_string().contains("cancelled"));
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let opts = CallOptions::new();
        let err = opts
            .run::<(), _>("store", async { Err(AppError::Store("disk full".to_string())) })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreError);
    }
}
