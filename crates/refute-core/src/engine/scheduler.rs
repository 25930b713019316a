use super::cancel::CancelToken;
use super::timed::{TimedRunner, TimedTask};
use crate::errors::HarnessError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};

/// A value tagged with its submission position.
#[derive(Debug, Clone, PartialEq)]
pub struct Indexed<T> {
    pub index: usize,
    pub value: T,
}

impl<T> Indexed<T> {
    /// Tags each item with its position in `items`.
    pub fn enumerate(items: impl IntoIterator<Item = T>) -> Vec<Self> {
        items
            .into_iter()
            .enumerate()
            .map(|(index, value)| Indexed { index, value })
            .collect()
    }
}

/// Fans independent tasks out over a bounded pool and hands the results
/// back sorted by submission index.
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    workers: usize,
    runner: TimedRunner,
}

impl Scheduler {
    pub fn new(workers: usize, budget: Duration) -> Self {
        Self {
            workers: workers.max(1),
            runner: TimedRunner::new(budget),
        }
    }

    /// Runs every task. A failing or timed-out task only affects its own
    /// output. If `interrupt` resolves first, all in-flight work is
    /// cancelled and the batch fails with [`HarnessError::Interrupted`].
    pub async fn run<T, I>(
        &self,
        tasks: Vec<Indexed<T>>,
        interrupt: I,
    ) -> Result<Vec<Indexed<T::Output>>, HarnessError>
    where
        T: TimedTask,
        I: Future<Output = ()>,
    {
        let total = tasks.len();
        let batch = CancelToken::new();
        let (tx, mut rx) = mpsc::unbounded_channel::<Indexed<T::Output>>();
        let sem = Arc::new(Semaphore::new(self.workers));
        let runner = self.runner;

        tracing::info!(
            event = "batch.start",
            tasks = total,
            workers = self.workers,
            timeout_ms = runner.budget().as_millis() as u64
        );

        let dispatch_cancel = batch.clone();
        let dispatcher = tokio::spawn(async move {
            for Indexed { index, value } in tasks {
                let Ok(permit) = sem.clone().acquire_owned().await else {
                    break;
                };
                if dispatch_cancel.is_cancelled() {
                    break;
                }
                let tx = tx.clone();
                let cancel = dispatch_cancel.child();
                tokio::spawn(async move {
                    let _permit = permit;
                    let value = runner.run(value, cancel).await;
                    // receiver gone means the batch was abandoned
                    let _ = tx.send(Indexed { index, value });
                });
            }
        });

        let mut results = Vec::with_capacity(total);
        tokio::pin!(interrupt);
        loop {
            tokio::select! {
                msg = rx.recv() => match msg {
                    Some(item) => results.push(item),
                    None => break,
                },
                _ = &mut interrupt => {
                    batch.cancel();
                    dispatcher.abort();
                    tracing::warn!(
                        event = "batch.interrupted",
                        completed = results.len(),
                        tasks = total
                    );
                    return Err(HarnessError::Interrupted);
                }
            }
        }

        if results.len() != total {
            return Err(HarnessError::Incomplete {
                missing: total - results.len(),
                total,
            });
        }

        results.sort_by_key(|r| r.index);
        tracing::info!(event = "batch.done", tasks = total);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sleepy {
        id: usize,
        millis: u64,
    }

    impl TimedTask for Sleepy {
        type Output = Result<usize, String>;
        type Key = usize;

        fn key(&self) -> usize {
            self.id
        }

        fn run(self, cancel: &CancelToken) -> Self::Output {
            let step = Duration::from_millis(5);
            let mut waited = 0;
            while waited < self.millis {
                if cancel.is_cancelled() {
                    return Err("cancelled".into());
                }
                std::thread::sleep(step);
                waited += 5;
            }
            Ok(self.id)
        }

        fn on_timeout(key: usize, _budget: Duration) -> Self::Output {
            Err(format!("timeout {key}"))
        }

        fn on_crash(key: usize, reason: String) -> Self::Output {
            Err(format!("crash {key}: {reason}"))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_results_come_back_in_submission_order() {
        // later tasks finish first
        let tasks = Indexed::enumerate((0..8).map(|id| Sleepy {
            id,
            millis: (8 - id as u64) * 10,
        }));
        let out = Scheduler::new(4, Duration::from_secs(10))
            .run(tasks, std::future::pending())
            .await
            .unwrap();
        let indices: Vec<_> = out.iter().map(|r| r.index).collect();
        assert_eq!(indices, (0..8).collect::<Vec<_>>());
        assert!(out.iter().all(|r| r.value == Ok(r.index)));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let out = Scheduler::new(2, Duration::from_secs(1))
            .run(Vec::<Indexed<Sleepy>>::new(), std::future::pending())
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_timeout_does_not_abort_siblings() {
        let tasks = Indexed::enumerate(vec![
            Sleepy { id: 0, millis: 10 },
            Sleepy { id: 1, millis: 60_000 },
            Sleepy { id: 2, millis: 10 },
        ]);
        let out = Scheduler::new(2, Duration::from_millis(300))
            .run(tasks, std::future::pending())
            .await
            .unwrap();
        assert_eq!(out[0].value, Ok(0));
        assert_eq!(out[1].value, Err("timeout 1".into()));
        assert_eq!(out[2].value, Ok(2));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_interrupt_aborts_batch() {
        let tasks = Indexed::enumerate((0..4).map(|id| Sleepy { id, millis: 60_000 }));
        let interrupt = tokio::time::sleep(Duration::from_millis(100));
        let err = Scheduler::new(2, Duration::from_secs(120))
            .run(tasks, interrupt)
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::Interrupted));
    }
}
