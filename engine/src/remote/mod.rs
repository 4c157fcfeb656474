//! Remote hosting boundary
//!
//! Pushing finished repositories to a hosting service goes through the
//! [`RemoteHost`] trait. The orchestrator wraps the two expensive calls
//! (create, push) in [`with_backoff`]; providers themselves stay
//! retry-free.

pub mod github;

use async_trait::async_trait;
use serde::Serialize;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Errors produced while talking to a hosting service
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Push failed: {0}")]
    Push(String),
}

impl RemoteError {
    /// Transient failures worth another attempt. Auth and plain API
    /// rejections are terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RemoteError::RateLimitExceeded
                | RemoteError::Unavailable(_)
                | RemoteError::Network(_)
                | RemoteError::Push(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn is_private(&self) -> bool {
        matches!(self, Visibility::Private)
    }
}

/// A repository as the hosting service sees it
#[derive(Debug, Clone, Serialize)]
pub struct RemoteRepo {
    pub name: String,
    /// "owner/name"
    pub full_name: String,
    /// Clone/push URL
    pub url: String,
    pub private: bool,
    pub description: Option<String>,
}

/// Boundary trait for repository hosting services
#[async_trait]
pub trait RemoteHost: Send + Sync {
    /// Host name for logging and diagnostics
    fn name(&self) -> &str;

    async fn create_repository(
        &self,
        name: &str,
        description: &str,
        visibility: Visibility,
        topics: &[String],
    ) -> Result<RemoteRepo, RemoteError>;

    /// Push `branch` of the repository at `local_dir` to `repo`
    async fn push(&self, local_dir: &Path, repo: &RemoteRepo, branch: &str)
        -> Result<(), RemoteError>;

    async fn delete_repository(&self, full_name: &str) -> Result<(), RemoteError>;

    /// List repositories owned by the authenticated account, optionally
    /// filtered to names starting with `prefix`
    async fn list_repositories(&self, prefix: Option<&str>) -> Result<Vec<RemoteRepo>, RemoteError>;

    /// Cheap readiness probe used by diagnostics
    async fn check_health(&self) -> bool {
        true
    }
}

/// Attempts per remote operation before giving up
pub const MAX_ATTEMPTS: u32 = 3;
/// First retry delay; doubles on each subsequent retry
pub const BACKOFF_BASE: Duration = Duration::from_secs(2);

/// Run a remote operation with doubling-delay retries on transient
/// failures. Terminal errors surface immediately.
pub async fn with_backoff<T, F, Fut>(operation: &str, mut call: F) -> Result<T, RemoteError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
{
    let mut attempt = 1u32;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < MAX_ATTEMPTS && err.is_retryable() => {
                let delay = BACKOFF_BASE * 2u32.pow(attempt - 1);
                warn!(
                    operation,
                    attempt,
                    delay_secs = delay.as_secs(),
                    error = %err,
                    "remote operation failed, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn backoff_retries_transient_errors_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = with_backoff("create", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(RemoteError::Network("flaky".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_backoff("push", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(RemoteError::Push("still down".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn terminal_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_backoff("create", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(RemoteError::AuthenticationFailed("bad token".into())) }
        })
        .await;
        assert!(matches!(result, Err(RemoteError::AuthenticationFailed(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
