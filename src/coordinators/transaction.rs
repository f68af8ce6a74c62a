use std::future::Future;
use std::time::Duration;

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

use crate::errors::InternalError;
use crate::errors::internal::DatabaseError;

/// Default attempt count for `with_retry`
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

const RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// Open a transaction on `db`
///
/// While the returned transaction is alive it owns a pooled connection; work
/// inside it must go through the transaction, not `db`.
pub async fn begin(db: &DatabaseConnection) -> Result<DatabaseTransaction, InternalError> {
    db.begin()
        .await
        .map_err(|e| DatabaseError::TransactionBegin { source: e }.into())
}

/// Close a unit of work: commit on `Ok`, roll back on `Err`
///
/// Domain errors pass through unchanged. Anything else is logged and wrapped
/// as `OperationFailed` so callers only ever see a generic message. If the
/// transaction is dropped without reaching this point (panic, cancellation)
/// sea-orm rolls it back on drop.
pub async fn complete<T>(
    txn: DatabaseTransaction,
    operation: &str,
    result: Result<T, InternalError>,
) -> Result<T, InternalError> {
    match result {
        Ok(value) => {
            txn.commit().await.map_err(|e| {
                surface(operation, DatabaseError::TransactionCommit { source: e }.into())
            })?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                tracing::error!("Rollback of '{}' failed: {}", operation, rollback_err);
            }
            Err(surface(operation, err))
        }
    }
}

/// Pass domain errors through, wrap everything else
pub fn surface(operation: &str, err: InternalError) -> InternalError {
    if err.is_domain() {
        return err;
    }
    tracing::error!("Failed to {}: {:?}", operation, err);
    InternalError::operation_failed(operation, err)
}

/// Run `unit` up to `attempts` times while it fails with a retryable error
///
/// Back-off grows linearly with the attempt number. Each call of `unit` must
/// open and complete its own transaction.
pub async fn with_retry<T, F, Fut>(attempts: u32, operation: &str, mut unit: F) -> Result<T, InternalError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, InternalError>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match unit().await {
            Err(err) if attempt < attempts && err.is_retryable() => {
                tracing::warn!(
                    "Retrying '{}' after attempt {}/{}: {}",
                    operation,
                    attempt,
                    attempts,
                    err
                );
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}
