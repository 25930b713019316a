use std::time::Duration;

/// Errors that end a whole batch. Per-case problems never surface here;
/// they are recorded on the case's own result row.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("run interrupted by operator")]
    Interrupted,

    #[error("no valid cases found in {source_name} (are the sql1/sql2 markers present in the 'counterexample' text?)")]
    NoCases { source_name: String },

    #[error("scheduler lost {missing} of {total} results")]
    Incomplete { missing: usize, total: usize },

    #[error("difficulty labels ({labels}) do not line up with results ({results})")]
    LabelMismatch { labels: usize, results: usize },
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ConfigError(pub String);

/// Why a case produced no comparison. Query-level failures are kept on the
/// side that failed and do not appear here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaseFailure {
    #[error("setup_error: {0}")]
    Setup(String),

    #[error("database_error: {0}")]
    Database(String),

    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error("task crashed: {0}")]
    Crashed(String),
}

impl CaseFailure {
    pub fn is_timeout(&self) -> bool {
        matches!(self, CaseFailure::Timeout(_))
    }
}
