use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;
use tracing::warn;

use crate::config::BackoffPolicy;
use crate::coordinator::CoordResult;
use crate::CoordinatorError;

/// Runs a coordinator operation, retrying `Transient` failures with
/// exponential backoff. Logical answers (missing node, version conflict,
/// session expiry) surface immediately.
///
/// With `max_retries == 0` the loop never gives up; the coordinator session
/// timeout is the only bound, matching the reference client.
pub(crate) async fn retry_transient<F, Fut, T>(
    policy: BackoffPolicy,
    mut op: F,
) -> CoordResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CoordResult<T>>,
{
    let mut current_delay = Duration::from_millis(policy.base_delay_ms);
    let max_delay = Duration::from_millis(policy.max_delay_ms);
    let mut attempts = 0usize;

    loop {
        match op().await {
            Err(CoordinatorError::Transient(reason)) => {
                attempts += 1;
                if policy.max_retries != 0 && attempts >= policy.max_retries {
                    warn!(attempts, "giving up after transient coordinator failures");
                    return Err(CoordinatorError::Transient(reason));
                }
                debug!(%reason, delay = ?current_delay, "transient coordinator failure, retrying");
                sleep(current_delay).await;
                current_delay = (current_delay * 2).min(max_delay);
            }
            other => return other,
        }
    }
}
