// ── Debounce ──
//
// Cancel-and-reschedule timer: each `schedule` call cancels the pending
// callback and arms a fresh one, so the callback only runs once activity
// has been quiet for the full delay.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// A cancellable, re-armable delayed callback.
///
/// Must be used from within a tokio runtime. Dropping the debouncer
/// cancels whatever is pending.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<CancellationToken>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Cancel any pending callback and run `fire` after the delay unless
    /// cancelled again first.
    pub fn schedule<F>(&mut self, fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();

        let token = CancellationToken::new();
        let task_token = token.clone();
        let delay = self.delay;

        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = task_token.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    if !task_token.is_cancelled() {
                        fire();
                        task_token.cancel();
                    }
                }
            }
        });

        self.pending = Some(token);
    }

    /// Cancel the pending callback, if any.
    pub fn cancel(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }

    /// Whether a callback is armed and has neither fired nor been cancelled.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|t| !t.is_cancelled())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
