//! Deadlines for collaborator calls.

use lending_core::types::{Collaborator, DependencyError};
use std::future::Future;
use std::time::Duration;

/// Await `call`, failing with a timeout [`DependencyError`] once `limit` elapses.
///
/// Dropping the returned future drops `call` with it, so caller cancellation reaches
/// the collaborator.
pub async fn bounded<T, F>(
    collaborator: Collaborator,
    limit: Option<Duration>,
    call: F,
) -> Result<T, DependencyError>
where
    F: Future<Output = Result<T, DependencyError>>,
{
    match limit {
        None => call.await,
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| DependencyError::timeout(collaborator, limit))?,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unbounded_passes_through() {
        let result = bounded(Collaborator::LedgerStore, None, async { Ok::<_, DependencyError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expires() {
        let result: Result<(), _> = bounded(
            Collaborator::Notifier,
            Some(Duration::from_millis(50)),
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
        )
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.collaborator, Collaborator::Notifier);
        assert!(err.message.contains("timed out"));
    }

    #[tokio::test]
    async fn test_inner_error_preserved() {
        let result: Result<(), _> = bounded(
            Collaborator::EventSink,
            Some(Duration::from_secs(1)),
            async { Err(DependencyError::event_sink("closed")) },
        )
        .await;
        assert_eq!(result.unwrap_err(), DependencyError::event_sink("closed"));
    }
}
