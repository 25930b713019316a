use super::cancel::CancelToken;
use super::executor::CaseExecutor;
use super::scheduler::{Indexed, Scheduler};
use super::timed::TimedTask;
use crate::config::HarnessConfig;
use crate::errors::{CaseFailure, HarnessError};
use crate::model::{Case, CaseHeader, CaseResult};
use crate::sanitize::Sanitizer;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Sanitizes and executes one counterexample.
pub struct CaseTask {
    pub case: Case,
    pub sanitizer: Arc<Sanitizer>,
    pub executor: Arc<CaseExecutor>,
}

impl CaseTask {
    pub fn new(case: Case, sanitizer: Arc<Sanitizer>, executor: Arc<CaseExecutor>) -> Self {
        Self {
            case,
            sanitizer,
            executor,
        }
    }
}

impl TimedTask for CaseTask {
    type Output = CaseResult;
    type Key = CaseHeader;

    fn key(&self) -> CaseHeader {
        self.executor
            .header(self.case.key(), &self.case.sql1, &self.case.sql2)
    }

    fn run(self, cancel: &CancelToken) -> CaseResult {
        let case = self.sanitizer.sanitize_case(self.case);
        self.executor.execute_case(&case, cancel)
    }

    fn on_timeout(key: CaseHeader, budget: Duration) -> CaseResult {
        key.into_failed(CaseFailure::Timeout(budget))
    }

    fn on_crash(key: CaseHeader, reason: String) -> CaseResult {
        key.into_failed(CaseFailure::Crashed(reason))
    }
}

/// Wraps cases for the scheduler, keeping their input order as the index.
pub fn case_tasks(
    cases: Vec<Case>,
    sanitizer: Arc<Sanitizer>,
    executor: Arc<CaseExecutor>,
) -> Vec<Indexed<CaseTask>> {
    Indexed::enumerate(
        cases
            .into_iter()
            .map(|c| CaseTask::new(c, sanitizer.clone(), executor.clone())),
    )
}

/// Sanitizes, executes and compares `cases` with the settings in `cfg`.
/// Results come back in the order of `cases`.
pub async fn verify_cases<I>(
    cases: Vec<Case>,
    cfg: &HarnessConfig,
    interrupt: I,
) -> Result<Vec<CaseResult>, HarnessError>
where
    I: Future<Output = ()>,
{
    let sanitizer = Arc::new(
        Sanitizer::new(cfg.reserved_words.clone()).with_query_quoting(cfg.sanitize_queries),
    );
    let executor = Arc::new(
        CaseExecutor::new(cfg.comparison_mode()).with_sample_rows(cfg.sample_rows),
    );
    let tasks = case_tasks(cases, sanitizer, executor);
    let results = Scheduler::new(cfg.workers, cfg.timeout())
        .run(tasks, interrupt)
        .await?;
    Ok(results.into_iter().map(|r| r.value).collect())
}
