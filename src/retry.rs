use std::future::Future;

use tokio_util::sync::CancellationToken;

/// Why a bounded retry loop gave up.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E: std::error::Error + 'static> {
    /// Every attempt completed but none produced an acceptable value.
    #[error("no acceptable result after {attempts} attempt(s)")]
    Rejected { attempts: u32 },

    /// The last attempt failed outright.
    #[error("failed after {attempts} attempt(s): {source}")]
    Failed {
        attempts: u32,
        #[source]
        source: E,
    },

    #[error("cancelled")]
    Cancelled,
}

/// Runs `operation` up to `max_attempts` times until it yields a value that
/// `is_acceptable` approves.
///
/// Both an unacceptable value and an `Err` consume one attempt. The token is
/// checked before every attempt and raced against each in-flight attempt.
pub async fn with_retries<T, E, F, Fut>(
    max_attempts: u32,
    cancel: &CancellationToken,
    is_acceptable: impl Fn(&T) -> bool,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::error::Error + 'static,
{
    let max_attempts = max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled);
        }

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(RetryError::Cancelled),
            outcome = operation(attempt) => outcome,
        };

        match outcome {
            Ok(value) if is_acceptable(&value) => {
                if attempt > 1 {
                    tracing::debug!(attempt, max_attempts, "succeeded after retry");
                }
                return Ok(value);
            }
            Ok(_) => {
                tracing::warn!(attempt, max_attempts, "unacceptable result; retrying");
                last_error = None;
            }
            Err(err) => {
                tracing::warn!(attempt, max_attempts, error = %err, "attempt failed; retrying");
                last_error = Some(err);
            }
        }
    }

    Err(match last_error {
        Some(source) => RetryError::Failed {
            attempts: max_attempts,
            source,
        },
        None => RetryError::Rejected {
            attempts: max_attempts,
        },
    })
}
