//! Bounded exponential backoff for rate-limited calls.

use std::time::Duration;

/// Waits between attempts. Swapped for a recorder in tests.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(2000),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt + 1`: `2^(attempt+1) * base`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt + 1)
    }
}

/// Where a retried call currently stands.
#[derive(Debug)]
pub enum RetryState<T, E> {
    Attempting { attempt: u32 },
    BackingOff { attempt: u32, delay: Duration },
    Succeeded(T),
    /// Still retryable, but out of retries.
    Exhausted(E),
    Failed(E),
}

/// Drive `op` to completion.
///
/// Errors matching `is_retryable` are retried with backoff until the policy is
/// spent; any other error fails immediately. `on_backoff` is told about each
/// wait before it happens.
pub fn run<T, E>(
    policy: RetryPolicy,
    sleeper: &dyn Sleeper,
    mut op: impl FnMut(u32) -> Result<T, E>,
    is_retryable: impl Fn(&E) -> bool,
    mut on_backoff: impl FnMut(u32, Duration),
) -> Result<T, E> {
    let mut state = RetryState::Attempting { attempt: 0 };
    loop {
        state = match state {
            RetryState::Attempting { attempt } => match op(attempt) {
                Ok(value) => RetryState::Succeeded(value),
                Err(e) if !is_retryable(&e) => RetryState::Failed(e),
                Err(e) if attempt >= policy.max_retries => RetryState::Exhausted(e),
                Err(_) => RetryState::BackingOff {
                    attempt,
                    delay: policy.delay_for(attempt),
                },
            },
            RetryState::BackingOff { attempt, delay } => {
                log::debug!("Backing off {}s before retry {}", delay.as_secs(), attempt + 1);
                on_backoff(attempt, delay);
                sleeper.sleep(delay);
                RetryState::Attempting {
                    attempt: attempt + 1,
                }
            }
            RetryState::Succeeded(value) => return Ok(value),
            RetryState::Exhausted(e) | RetryState::Failed(e) => return Err(e),
        };
    }
}
