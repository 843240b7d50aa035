// Request context
// Carries cancellation and an optional deadline through every remote call
// made by the storage layer, including lazy client initialization.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::types::{StorageError, StorageResult};

/// Cancellation token plus optional deadline. Clones share the token.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context that is never cancelled and has no deadline
    pub fn background() -> Self {
        Self::default()
    }

    /// A timeout too large to represent as an instant means no deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => Self::with_deadline(deadline),
            None => Self::background(),
        }
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Bind the context to an externally owned token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Tighten the deadline; an earlier existing deadline wins.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        let Some(candidate) = Instant::now().checked_add(timeout) else {
            return self;
        };
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drive `fut` to completion unless the context is cancelled or its
    /// deadline passes first. The future is dropped in both of those cases.
    pub async fn run<F, T>(&self, operation: &str, fut: F) -> StorageResult<T>
    where
        F: Future<Output = StorageResult<T>>,
    {
        if self.cancel.is_cancelled() {
            return Err(StorageError::Cancelled(operation.to_string()));
        }

        let bounded = async {
            match self.deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, fut).await {
                    Ok(result) => result,
                    Err(_) => Err(StorageError::DeadlineExceeded(operation.to_string())),
                },
                None => fut.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(StorageError::Cancelled(operation.to_string())),
            result = bounded => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_background_runs_to_completion() {
        let ctx = RequestContext::background();
        let value = assert_ok!(ctx.run("noop", async { Ok::<_, StorageError>(7) }).await);
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_cancelled_context_short_circuits() {
        let ctx = RequestContext::background();
        ctx.cancel();

        let err = assert_err!(ctx.run("get", async { Ok::<_, StorageError>(()) }).await);
        assert!(matches!(err, StorageError::Cancelled(op) if op == "get"));
    }

    #[tokio::test]
    async fn test_cancel_while_in_flight() {
        let token = CancellationToken::new();
        let ctx = RequestContext::background().with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let result = ctx
            .run("put", async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<_, StorageError>(())
            })
            .await;

        canceller.await.unwrap();
        assert!(matches!(result, Err(StorageError::Cancelled(_))));
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let ctx = RequestContext::with_timeout(Duration::from_millis(20));

        let result = ctx
            .run("delete", async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<_, StorageError>(())
            })
            .await;

        assert!(matches!(result, Err(StorageError::DeadlineExceeded(op)) if op == "delete"));
    }

    #[test]
    fn test_timeout_keeps_earlier_deadline() {
        let ctx = RequestContext::with_timeout(Duration::from_secs(1));
        let original = ctx.deadline().unwrap();

        let tightened = ctx.clone().timeout(Duration::from_secs(60));
        assert_eq!(tightened.deadline(), Some(original));

        let shorter = ctx.timeout(Duration::from_millis(1));
        assert!(shorter.deadline().unwrap() < original);
    }

    #[tokio::test]
    async fn test_unrepresentable_timeout_means_no_deadline() {
        let huge = Duration::from_secs(u64::MAX);

        let ctx = RequestContext::with_timeout(huge);
        assert!(ctx.deadline().is_none());
        assert_ok!(ctx.run("get", async { Ok::<_, StorageError>(()) }).await);

        let bounded = RequestContext::with_timeout(Duration::from_secs(5));
        let original = bounded.deadline();
        assert_eq!(bounded.timeout(huge).deadline(), original);

        let unbounded = RequestContext::background().timeout(huge);
        assert!(unbounded.deadline().is_none());
    }
}
