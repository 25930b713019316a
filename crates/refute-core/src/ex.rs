//! Execution accuracy of predicted queries on benchmark databases.

use crate::engine::{CancelToken, CaseExecutor, Indexed, TimedTask};
use crate::errors::CaseFailure;
use crate::model::{CaseHeader, CaseKey, CaseResult, ComparisonMode, DifficultyBand, Verdict};
use crate::sanitize::query_text::STOPPER;
use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// One line of the pairs file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExPair {
    #[serde(deserialize_with = "crate::model::id_as_string")]
    pub question_id: String,
    pub predicted_sql: String,
    pub gold_sql: String,
    pub db_id: String,
    #[serde(default)]
    pub difficulty: Option<String>,
}

impl ExPair {
    pub fn band(&self) -> Option<DifficultyBand> {
        self.difficulty.as_deref().and_then(DifficultyBand::parse)
    }
}

/// Reads a JSONL file of pairs. Blank lines are skipped. Anything after the
/// first tab of a query is dropped.
pub fn load_pairs(path: &Path) -> anyhow::Result<Vec<ExPair>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut pairs = Vec::new();
    for (i, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let mut pair: ExPair = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: invalid pair", path.display(), i + 1))?;
        pair.predicted_sql = cut_at_stopper(&pair.predicted_sql);
        pair.gold_sql = cut_at_stopper(&pair.gold_sql);
        pairs.push(pair);
    }
    Ok(pairs)
}

fn cut_at_stopper(sql: &str) -> String {
    sql.split(STOPPER).next().unwrap_or_default().trim().to_string()
}

/// `<root>/<db_id>/<db_id>.sqlite`
pub fn database_path(root: &Path, db_id: &str) -> PathBuf {
    root.join(db_id).join(format!("{db_id}.sqlite"))
}

/// Executor for EX scoring. Rows compare as a set unless `order_sensitive`
/// is on, and column names are ignored since predicted queries alias
/// freely.
pub fn ex_executor(order_sensitive: bool, sample_rows: usize) -> CaseExecutor {
    let mode = if order_sensitive {
        ComparisonMode::OrderSensitive
    } else {
        ComparisonMode::Set
    };
    CaseExecutor::new(mode)
        .with_sample_rows(sample_rows)
        .with_column_check(false)
}

pub struct ExTask {
    pub pair: ExPair,
    pub db_path: PathBuf,
    pub executor: Arc<CaseExecutor>,
}

impl TimedTask for ExTask {
    type Output = CaseResult;
    type Key = CaseHeader;

    fn key(&self) -> CaseHeader {
        self.executor.header(
            CaseKey::new(self.pair.question_id.clone(), None),
            &self.pair.predicted_sql,
            &self.pair.gold_sql,
        )
    }

    fn run(self, cancel: &CancelToken) -> CaseResult {
        self.executor.execute_on_file(
            &self.db_path,
            CaseKey::new(self.pair.question_id, None),
            &self.pair.predicted_sql,
            &self.pair.gold_sql,
            cancel,
        )
    }

    fn on_timeout(key: CaseHeader, budget: Duration) -> CaseResult {
        key.into_failed(CaseFailure::Timeout(budget))
    }

    fn on_crash(key: CaseHeader, reason: String) -> CaseResult {
        key.into_failed(CaseFailure::Crashed(reason))
    }
}

pub fn ex_tasks(pairs: &[ExPair], db_root: &Path, executor: Arc<CaseExecutor>) -> Vec<Indexed<ExTask>> {
    Indexed::enumerate(pairs.iter().map(|p| ExTask {
        db_path: database_path(db_root, &p.db_id),
        pair: p.clone(),
        executor: executor.clone(),
    }))
}

/// 1 for every pair whose queries agreed; errors and timeouts count as 0.
pub fn ex_flags(results: &[CaseResult]) -> Vec<bool> {
    results.iter().map(|r| r.verdict == Verdict::Equal).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_pairs() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("pairs.jsonl");
        std::fs::write(
            &path,
            concat!(
                r#"{"question_id": 3, "predicted_sql": "SELECT 1\t----- bird -----\tdb", "gold_sql": "SELECT 1", "db_id": "db", "difficulty": "moderate"}"#,
                "\n\n",
                r#"{"question_id": "q4", "predicted_sql": "SELECT 2", "gold_sql": "SELECT 2", "db_id": "db"}"#,
                "\n"
            ),
        )?;
        let pairs = load_pairs(&path)?;
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].question_id, "3");
        assert_eq!(pairs[0].predicted_sql, "SELECT 1");
        assert_eq!(pairs[0].band(), Some(DifficultyBand::Moderate));
        assert_eq!(pairs[1].question_id, "q4");
        assert_eq!(pairs[1].band(), None);
        Ok(())
    }

    #[test]
    fn test_bad_line_is_reported_with_position() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("pairs.jsonl");
        std::fs::write(&path, "{\"question_id\": 1}\n")?;
        let err = load_pairs(&path).unwrap_err();
        assert!(format!("{err:#}").contains(":1: invalid pair"));
        Ok(())
    }

    #[test]
    fn test_ex_executor_modes() {
        let set = ex_executor(false, 5);
        assert_eq!(set.mode, ComparisonMode::Set);
        assert!(!set.check_columns);
        assert_eq!(set.sample_rows, 5);
        assert_eq!(ex_executor(true, 5).mode, ComparisonMode::OrderSensitive);
    }

    #[test]
    fn test_database_path() {
        assert_eq!(
            database_path(Path::new("/data/dev"), "california_schools"),
            PathBuf::from("/data/dev/california_schools/california_schools.sqlite")
        );
    }
}
