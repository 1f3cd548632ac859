use std::future::Future;
use std::time::Duration;

use super::RemoteError;

/// Bounded exponential backoff applied to transient remote faults.
///
/// The transient fault-code set is supplied per call site, not baked in here:
/// the retrieval client and the message store reuse this wrapper with
/// different sets.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
        }
    }
}

/// Run `f`, retrying service faults whose code is in `transient_codes`.
///
/// Backoff starts at `base_delay` and doubles up to `max_delay`. Transport
/// errors and service faults outside the transient set surface immediately;
/// exhausted retries surface the last fault.
pub async fn retry_call<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    transient_codes: &[&str],
    mut f: F,
) -> Result<T, RemoteError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
{
    let mut delay = policy.base_delay;
    let mut attempt = 1u32;

    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let transient = err
                    .code()
                    .is_some_and(|code| transient_codes.contains(&code));

                if !transient || attempt >= policy.max_attempts {
                    return Err(err);
                }

                tracing::warn!(
                    operation,
                    attempt,
                    error = %err,
                    "transient remote fault, retrying"
                );
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(policy.max_delay);
                attempt += 1;
            }
        }
    }
}
