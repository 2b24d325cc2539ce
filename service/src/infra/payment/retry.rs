//! Retrying with exponential backoff.

use std::{fmt, future::Future, time::Duration};

use tokio::time;
use tracing as log;

/// Configuration of [`with_backoff()`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,

    /// Delay before the first retry.
    pub initial_delay: Duration,

    /// Factor the delay is multiplied by after each retry.
    pub multiplier: u32,

    /// Upper bound of the delay.
    pub max_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            multiplier: 2,
            max_delay: Duration::from_secs(5),
        }
    }
}

/// Performs the provided `operation`, retrying it while it fails with
/// errors the `is_transient` predicate accepts, up to
/// [`Config::max_attempts`] times.
///
/// # Errors
///
/// With the last error of the `operation`.
pub async fn with_backoff<F, Fut, T, E>(
    config: Config,
    name: &str,
    mut operation: F,
    is_transient: impl Fn(&E) -> bool,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut delay = config.initial_delay;
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(v) => {
                if attempt > 1 {
                    log::info!("`{name}` succeeded after {attempt} attempts");
                }
                return Ok(v);
            }
            Err(e) if attempt < config.max_attempts && is_transient(&e) => {
                log::warn!(
                    "`{name}` failed on attempt {attempt}/{}, retrying in \
                     {delay:?}: {e}",
                    config.max_attempts,
                );
                time::sleep(delay).await;
                delay = delay
                    .saturating_mul(config.multiplier)
                    .min(config.max_delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod spec {
    use std::{cell::Cell, time::Duration};

    use super::{with_backoff, Config};

    fn config() -> Config {
        Config {
            max_attempts: 4,
            initial_delay: Duration::from_millis(100),
            multiplier: 2,
            max_delay: Duration::from_millis(250),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors() {
        let calls = Cell::new(0);

        let res = with_backoff(
            config(),
            "test",
            || {
                let calls = &calls;
                async move {
                    calls.set(calls.get() + 1);
                    if calls.get() < 3 {
                        Err("transient")
                    } else {
                        Ok(calls.get())
                    }
                }
            },
            |_| true,
        )
        .await;

        assert_eq!(res, Ok(3));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let calls = Cell::new(0);

        let res: Result<(), _> = with_backoff(
            config(),
            "test",
            || {
                let calls = &calls;
                async move {
                    calls.set(calls.get() + 1);
                    Err("transient")
                }
            },
            |_| true,
        )
        .await;

        assert_eq!(res, Err("transient"));
        assert_eq!(calls.get(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_permanent_error() {
        let calls = Cell::new(0);

        let res: Result<(), _> = with_backoff(
            config(),
            "test",
            || {
                let calls = &calls;
                async move {
                    calls.set(calls.get() + 1);
                    Err("permanent")
                }
            },
            |e| *e != "permanent",
        )
        .await;

        assert_eq!(res, Err("permanent"));
        assert_eq!(calls.get(), 1);
    }
}
