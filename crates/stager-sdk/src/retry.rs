use crate::trace::TraceWriter;
use std::future::Future;
use std::num::NonZeroU32;
use std::time::Duration;

/// Bounded, sequential retry of a fallible async operation.
///
/// Attempts run one after another, never concurrently. The first success is
/// returned immediately. When every attempt fails only the error from the
/// final attempt is returned; earlier errors are logged to the caller's
/// [`TraceWriter`] and dropped.
///
/// There is no pause between attempts unless one is configured with
/// [`RetryPolicy::with_delay`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: NonZeroU32,
    delay: Duration,
}

impl RetryPolicy {
    /// A policy allowing up to `max_attempts` invocations.
    pub const fn new(max_attempts: NonZeroU32) -> Self {
        Self {
            max_attempts,
            delay: Duration::ZERO,
        }
    }

    /// A policy that invokes the operation exactly once.
    pub const fn once() -> Self {
        Self::new(NonZeroU32::MIN)
    }

    /// Sleep for `delay` between a failed attempt and the next one.
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.get()
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `operation` until it succeeds or the attempt budget is spent.
    ///
    /// Failed attempts are reported as warnings on `trace`, so the caller's
    /// secret masking applies to the error text.
    pub async fn run<T, E, F, Fut>(
        &self,
        trace: &dyn TraceWriter,
        mut operation: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let max_attempts = self.max_attempts.get();
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt >= max_attempts => {
                    if max_attempts > 1 {
                        trace.warning(&format!(
                            "Attempt {attempt}/{max_attempts} failed, giving up: {err}"
                        ));
                    }
                    return Err(err);
                }
                Err(err) => {
                    trace.warning(&format!(
                        "Attempt {attempt}/{max_attempts} failed, retrying: {err}"
                    ));
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::once()
    }
}
