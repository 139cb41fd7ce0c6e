use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;

pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Delayed one-shot callbacks.
///
/// Implementations must not hold internal locks while a callback runs: the
/// callback is allowed to schedule the next firing from inside itself.
pub trait Scheduler: Send + Sync + 'static {
    type Token: Send + 'static;

    fn schedule_after(&self, delay: Duration, callback: Callback) -> Self::Token;

    /// Cancelling a token that already fired or was cancelled is a no-op.
    fn cancel(&self, token: &Self::Token);
}

/// Runs callbacks as tasks on a tokio runtime.
#[derive(Clone, Debug)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Panics when called outside of a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl Scheduler for TokioScheduler {
    type Token = AbortHandle;

    fn schedule_after(&self, delay: Duration, callback: Callback) -> AbortHandle {
        self.handle
            .spawn(async move {
                tokio::time::sleep(delay).await;
                callback();
            })
            .abort_handle()
    }

    fn cancel(&self, token: &AbortHandle) {
        token.abort();
    }
}
