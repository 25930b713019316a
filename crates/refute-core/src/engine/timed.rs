use super::cancel::CancelToken;
use std::any::Any;
use std::fmt;
use std::time::Duration;
use tokio::task::JoinError;

/// A unit of blocking work that always produces an output, even when it
/// runs out of time or panics.
pub trait TimedTask: Send + 'static {
    type Output: Send + 'static;
    /// Enough identity to build the timeout/crash outcome.
    type Key: fmt::Display + Send + 'static;

    fn key(&self) -> Self::Key;

    /// Does the work. Long-running work should watch `cancel`.
    fn run(self, cancel: &CancelToken) -> Self::Output;

    fn on_timeout(key: Self::Key, budget: Duration) -> Self::Output;

    fn on_crash(key: Self::Key, reason: String) -> Self::Output;
}

/// Runs tasks on the blocking pool under a wall-clock budget.
#[derive(Debug, Clone, Copy)]
pub struct TimedRunner {
    budget: Duration,
}

impl TimedRunner {
    pub fn new(budget: Duration) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// On expiry `cancel` fires and the task's timeout outcome is returned.
    /// The blocking thread is left to observe the cancellation on its own.
    pub async fn run<T: TimedTask>(&self, task: T, cancel: CancelToken) -> T::Output {
        let key = task.key();
        let worker_cancel = cancel.clone();
        let handle = tokio::task::spawn_blocking(move || task.run(&worker_cancel));

        match tokio::time::timeout(self.budget, handle).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                let reason = crash_reason(e);
                tracing::warn!(event = "task.crash", task = %key, reason = %reason);
                T::on_crash(key, reason)
            }
            Err(_) => {
                cancel.cancel();
                tracing::warn!(
                    event = "task.timeout",
                    task = %key,
                    budget_ms = self.budget.as_millis() as u64
                );
                T::on_timeout(key, self.budget)
            }
        }
    }
}

fn crash_reason(e: JoinError) -> String {
    if !e.is_panic() {
        return e.to_string();
    }
    let payload: Box<dyn Any + Send> = e.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}
