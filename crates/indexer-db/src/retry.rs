use std::future::Future;
use std::time::Duration;

use crate::error::{is_transient, DbError};

const DEFAULT_RETRIES: u32 = 3;
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);

pub fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

pub fn default_base_delay() -> Duration {
    DEFAULT_BASE_DELAY
}

/// Retries `op` up to `retries` times with exponential backoff starting at
/// `base_delay`, for transient errors only (spec.md §4.3's
/// `safe_db_operation`). Non-transient errors return immediately.
///
/// Grounded on the teacher's small `anyhow::Context`-annotated helper
/// functions — here generalized into a reusable wrapper since this workspace
/// needs the same retry policy at many call sites.
pub async fn safe_db_operation<T, F, Fut>(retries: u32, base_delay: Duration, mut op: F) -> Result<T, DbError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < retries && is_transient(&err) => {
                let delay = base_delay * 2u32.pow(attempt);
                tracing::warn!(attempt, ?delay, error = %err, "transient database error, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                return Err(DbError::RetriesExhausted {
                    attempts: attempt + 1,
                    source: err,
                })
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = safe_db_operation(3, Duration::from_millis(1), || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(sqlx::Error::PoolTimedOut)
            } else {
                Ok(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_on_non_transient_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), DbError> = safe_db_operation(3, Duration::from_millis(1), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(sqlx::Error::RowNotFound)
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
