use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{CuratorError, Result};

/// Await a collaborator call with a deadline.
///
/// Expiry drops the future, which kills any child process spawned with
/// `kill_on_drop`, and yields [`CuratorError::Timeout`].
pub async fn bounded<T, E, F>(operation: &str, after: Duration, fut: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, E>>,
    CuratorError: From<E>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result.map_err(CuratorError::from),
        Err(_) => {
            warn!(operation, after = ?after, "Collaborator call timed out");
            Err(CuratorError::Timeout {
                operation: operation.to_string(),
                after,
            })
        }
    }
}
