use super::AuthError;
use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Per-request execution context threaded through every engine operation.
///
/// Every store and cache call made on behalf of a request is raced against the
/// context's cancellation token and deadline. Dropping the losing future is how
/// an in-flight query or transaction is abandoned.
#[derive(Debug, Clone)]
pub struct RequestContext {
    client_ip: Option<IpAddr>,
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl RequestContext {
    pub fn new(cancel: CancellationToken) -> Self {
        RequestContext {
            client_ip: None,
            deadline: None,
            cancel,
        }
    }

    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::new(CancellationToken::new())
    }

    pub fn with_client_ip(mut self, client_ip: Option<IpAddr>) -> Self {
        self.client_ip = client_ip;
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        });
        self
    }

    pub fn client_ip(&self) -> Option<IpAddr> {
        self.client_ip
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Run one I/O step of a request, aborting it on cancellation or deadline.
    pub async fn guard<T, F>(&self, op: &'static str, fut: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, AuthError>>,
    {
        if self.cancel.is_cancelled() {
            debug!(op, "request already cancelled");
            return Err(AuthError::Cancelled);
        }
        if matches!(self.deadline, Some(deadline) if deadline <= Instant::now()) {
            debug!(op, "request deadline already passed");
            return Err(AuthError::DeadlineExceeded);
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!(op, "request cancelled");
                Err(AuthError::Cancelled)
            }
            _ = sleep_until(self.deadline) => {
                debug!(op, "request deadline exceeded");
                Err(AuthError::DeadlineExceeded)
            }
            result = fut => result,
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn guard_passes_through_results() {
        let ctx = RequestContext::background();
        let value = ctx.guard("op", async { Ok::<_, AuthError>(7) }).await.unwrap();
        assert_eq!(value, 7);

        let err = ctx
            .guard("op", async { Err::<(), _>(AuthError::TokenNotFound) })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenNotFound));
    }

    #[tokio::test]
    async fn cancelled_context_short_circuits() {
        let token = CancellationToken::new();
        let ctx = RequestContext::new(token.clone());
        token.cancel();

        let err = ctx
            .guard("op", async { Ok::<_, AuthError>(()) })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Cancelled));
    }

    #[tokio::test]
    async fn cancellation_interrupts_a_pending_step() {
        let token = CancellationToken::new();
        let ctx = RequestContext::new(token.clone());
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });

        let err = ctx
            .guard("op", std::future::pending::<Result<(), AuthError>>())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Cancelled));
        canceller.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_interrupts_a_pending_step() {
        let ctx = RequestContext::background().with_timeout(Duration::from_millis(50));
        let err = ctx
            .guard("op", std::future::pending::<Result<(), AuthError>>())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DeadlineExceeded));
    }

    #[test]
    fn earlier_deadline_wins() {
        let now = Instant::now();
        let ctx = RequestContext::background()
            .with_deadline(now + Duration::from_secs(1))
            .with_deadline(now + Duration::from_secs(5));
        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(1)));
    }
}
