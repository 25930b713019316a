use super::cancel::CancelToken;
use super::normalize::{normalize_cell, results_equal, ResultSet};
use crate::errors::CaseFailure;
use crate::model::{Case, CaseHeader, CaseKey, CaseResult, ComparisonMode, SideOutcome, Verdict};
use crate::sanitize::scanner::split_first_statement;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::time::Instant;

/// Applied to every connection before any user SQL runs.
pub const CONNECTION_PRAGMAS: &str = "PRAGMA foreign_keys=OFF;\
PRAGMA journal_mode=OFF;\
PRAGMA synchronous=OFF;\
PRAGMA temp_store=MEMORY;\
PRAGMA cache_size=-100000;";

/// Runs the two queries of a case against a private database and compares
/// the results. Every call opens its own connection; nothing is shared
/// between cases.
#[derive(Debug, Clone)]
pub struct CaseExecutor {
    pub mode: ComparisonMode,
    pub sample_rows: usize,
    pub check_columns: bool,
}

impl CaseExecutor {
    pub fn new(mode: ComparisonMode) -> Self {
        Self {
            mode,
            sample_rows: 10,
            check_columns: true,
        }
    }

    pub fn with_sample_rows(mut self, n: usize) -> Self {
        self.sample_rows = n;
        self
    }

    pub fn with_column_check(mut self, on: bool) -> Self {
        self.check_columns = on;
        self
    }

    pub fn header(&self, key: CaseKey, generated_sql: &str, gold_sql: &str) -> CaseHeader {
        CaseHeader {
            key,
            generated_sql: generated_sql.to_string(),
            gold_sql: gold_sql.to_string(),
            mode: self.mode,
        }
    }

    /// Builds a fresh in-memory database from the case's setup script and
    /// runs `sql1` then `sql2` on it. A failing setup yields an `Error`
    /// verdict without attempting either query.
    pub fn execute_case(&self, case: &Case, cancel: &CancelToken) -> CaseResult {
        let started = Instant::now();
        let header = self.header(case.key(), &case.sql1, &case.sql2);

        let conn = match Connection::open_in_memory() {
            Ok(c) => c,
            Err(e) => return header.into_failed(CaseFailure::Database(e.to_string())),
        };
        watch(&conn, cancel);
        if let Err(e) = conn.execute_batch(CONNECTION_PRAGMAS) {
            return header.into_failed(CaseFailure::Database(e.to_string()));
        }

        if let Err(e) = conn.execute_batch(&case.setup_sql) {
            tracing::debug!(
                event = "case.setup_error",
                case = %header.key,
                error = %e
            );
            let mut result = header.into_failed(CaseFailure::Setup(e.to_string()));
            result.duration_ms = Some(elapsed_ms(started));
            return result;
        }

        let mut result = self.compare(&conn, header, cancel);
        result.duration_ms = Some(elapsed_ms(started));
        result
    }

    /// Runs both queries against an existing database file opened read-only.
    pub fn execute_on_file(
        &self,
        db_path: &Path,
        key: CaseKey,
        generated_sql: &str,
        gold_sql: &str,
        cancel: &CancelToken,
    ) -> CaseResult {
        let started = Instant::now();
        let header = self.header(key, generated_sql, gold_sql);

        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = match Connection::open_with_flags(db_path, flags) {
            Ok(c) => c,
            Err(e) => {
                return header.into_failed(CaseFailure::Database(format!(
                    "{}: {}",
                    db_path.display(),
                    e
                )))
            }
        };
        watch(&conn, cancel);

        let mut result = self.compare(&conn, header, cancel);
        result.duration_ms = Some(elapsed_ms(started));
        result
    }

    fn compare(&self, conn: &Connection, header: CaseHeader, cancel: &CancelToken) -> CaseResult {
        let generated = run_query(conn, &header.generated_sql, cancel);
        let gold = run_query(conn, &header.gold_sql, cancel);

        let verdict = match (&generated, &gold) {
            (Ok(a), Ok(b)) if results_equal(a, b, self.mode, self.check_columns) => Verdict::Equal,
            (Ok(_), Ok(_)) => Verdict::NotEqual,
            _ => Verdict::Error,
        };

        CaseResult {
            key: header.key,
            verdict,
            failure: None,
            generated: self.outcome(generated),
            gold: self.outcome(gold),
            generated_sql: header.generated_sql,
            gold_sql: header.gold_sql,
            mode: header.mode,
            duration_ms: None,
        }
    }

    fn outcome(&self, result: Result<ResultSet, String>) -> SideOutcome {
        match result {
            Ok(rs) => SideOutcome {
                ok: true,
                error: None,
                rowcount: rs.rows.len(),
                sample_rows: rs.rows.iter().take(self.sample_rows).cloned().collect(),
                scalar: rs.scalar(),
                columns: rs.columns,
                full_rows: rs.rows,
            },
            Err(e) => SideOutcome::failed(e),
        }
    }
}

/// Interrupts whatever statement is running on `conn` once `cancel` fires.
fn watch(conn: &Connection, cancel: &CancelToken) {
    let handle = conn.get_interrupt_handle();
    cancel.on_cancel(move || handle.interrupt());
}

fn run_query(conn: &Connection, sql: &str, cancel: &CancelToken) -> Result<ResultSet, String> {
    if cancel.is_cancelled() {
        return Err("interrupted".into());
    }
    let (sql, tail) = split_first_statement(sql);
    if let Some(tail) = tail {
        return Err(format!("only one statement can run at a time; found trailing `{tail}`"));
    }
    let mut stmt = conn.prepare(sql.trim()).map_err(|e| e.to_string())?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
    let width = columns.len();

    let mut rows = stmt.query([]).map_err(|e| e.to_string())?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(|e| e.to_string())? {
        if cancel.is_cancelled() {
            return Err("interrupted".into());
        }
        let mut cells = Vec::with_capacity(width);
        for i in 0..width {
            cells.push(normalize_cell(row.get_ref(i).map_err(|e| e.to_string())?));
        }
        out.push(cells);
    }
    Ok(ResultSet { columns, rows: out })
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn case(setup: &str, q1: &str, q2: &str) -> Case {
        Case {
            question_id: "q".into(),
            bound_size: Some(1),
            setup_sql: setup.into(),
            sql1: q1.into(),
            sql2: q2.into(),
        }
    }

    const SETUP: &str = "CREATE TABLE t(x INT, y TEXT);\
        INSERT INTO t VALUES (1, 'a');\
        INSERT INTO t VALUES (2, 'b');\
        INSERT INTO t VALUES (3, 'c');";

    #[test]
    fn test_equal_results() {
        let exec = CaseExecutor::new(ComparisonMode::OrderInsensitive);
        let r = exec.execute_case(
            &case(SETUP, "SELECT x FROM t", "SELECT x FROM t WHERE x > 0"),
            &CancelToken::new(),
        );
        assert_eq!(r.verdict, Verdict::Equal);
        assert!(r.generated.ok && r.gold.ok);
        assert_eq!(r.generated.rowcount, 3);
        assert_eq!(r.generated.columns, vec!["x"]);
        assert!(r.duration_ms.is_some());
    }

    #[test]
    fn test_not_equal_results() {
        let exec = CaseExecutor::new(ComparisonMode::OrderInsensitive);
        let r = exec.execute_case(
            &case(SETUP, "SELECT x FROM t", "SELECT x FROM t WHERE x > 1"),
            &CancelToken::new(),
        );
        assert_eq!(r.verdict, Verdict::NotEqual);
        assert!(r.failure.is_none());
    }

    #[test]
    fn test_query_error_is_kept_on_its_side() {
        let exec = CaseExecutor::new(ComparisonMode::OrderInsensitive);
        let r = exec.execute_case(
            &case(SETUP, "SELECT nope FROM t", "SELECT x FROM t"),
            &CancelToken::new(),
        );
        assert_eq!(r.verdict, Verdict::Error);
        assert!(!r.generated.ok);
        assert!(r.generated.error.as_deref().unwrap().contains("nope"));
        assert!(r.gold.ok);
        assert!(r.failure.is_none());
    }

    #[test]
    fn test_integer_and_real_sums_agree_in_sequence_mode() {
        let c = case(
            SETUP,
            "SELECT SUM(x) FROM t WHERE x < 3",
            "SELECT SUM(x * 1.0) FROM t WHERE x < 3",
        );
        let cancel = CancelToken::new();

        let r = CaseExecutor::new(ComparisonMode::OrderSensitive)
            .with_column_check(false)
            .execute_case(&c, &cancel);
        assert_eq!(r.generated.scalar, Some(json!(3)));
        assert_eq!(r.gold.scalar, Some(json!(3.0)));
        assert_eq!(r.verdict, Verdict::Equal);

        let r = CaseExecutor::new(ComparisonMode::OrderInsensitive)
            .with_column_check(false)
            .execute_case(&c, &cancel);
        assert_eq!(r.verdict, Verdict::NotEqual);
    }

    #[test]
    fn test_second_statement_in_query_is_an_error() {
        let exec = CaseExecutor::new(ComparisonMode::OrderInsensitive);
        let r = exec.execute_case(
            &case(SETUP, "SELECT x FROM t; SELECT 99", "SELECT x FROM t"),
            &CancelToken::new(),
        );
        assert_eq!(r.verdict, Verdict::Error);
        assert!(!r.generated.ok);
        assert!(r
            .generated
            .error
            .as_deref()
            .unwrap()
            .contains("only one statement"));
        assert!(r.gold.ok);

        let r = exec.execute_case(
            &case(SETUP, "SELECT x FROM t; -- trailing note", "SELECT x FROM t;"),
            &CancelToken::new(),
        );
        assert_eq!(r.verdict, Verdict::Equal);
    }

    #[test]
    fn test_setup_error_skips_queries() {
        let exec = CaseExecutor::new(ComparisonMode::OrderInsensitive);
        let r = exec.execute_case(
            &case("CREATE TABLE (", "SELECT 1", "SELECT 1"),
            &CancelToken::new(),
        );
        assert_eq!(r.verdict, Verdict::Error);
        assert!(matches!(r.failure, Some(CaseFailure::Setup(_))));
        assert!(!r.generated.ok && !r.gold.ok);
        assert!(r.generated.error.is_none() && r.gold.error.is_none());
    }

    #[test]
    fn test_scalar_and_samples() {
        let exec = CaseExecutor::new(ComparisonMode::OrderInsensitive).with_sample_rows(2);
        let r = exec.execute_case(
            &case(SETUP, "SELECT count(*) AS n FROM t;", "SELECT x FROM t ORDER BY x"),
            &CancelToken::new(),
        );
        assert_eq!(r.generated.scalar, Some(json!(3)));
        assert_eq!(r.gold.scalar, None);
        assert_eq!(r.gold.sample_rows, vec![vec![json!(1)], vec![json!(2)]]);
        assert_eq!(r.gold.full_rows.len(), 3);
    }

    #[test]
    fn test_cancelled_token_interrupts() {
        let exec = CaseExecutor::new(ComparisonMode::OrderInsensitive);
        let cancel = CancelToken::new();
        cancel.cancel();
        let r = exec.execute_case(&case(SETUP, "SELECT 1", "SELECT 1"), &cancel);
        assert_eq!(r.verdict, Verdict::Error);
    }

    #[test]
    fn test_execute_on_file_is_read_only() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("db.sqlite");
        {
            let conn = Connection::open(&path)?;
            conn.execute_batch(SETUP)?;
        }
        let exec = CaseExecutor::new(ComparisonMode::OrderInsensitive).with_column_check(false);
        let cancel = CancelToken::new();

        let r = exec.execute_on_file(
            &path,
            CaseKey::new("q", None),
            "SELECT x AS a FROM t",
            "SELECT x AS b FROM t",
            &cancel,
        );
        assert_eq!(r.verdict, Verdict::Equal);

        let r = exec.execute_on_file(
            &path,
            CaseKey::new("q", None),
            "DELETE FROM t",
            "SELECT 1",
            &cancel,
        );
        assert!(!r.generated.ok);

        let r = exec.execute_on_file(
            &dir.path().join("missing.sqlite"),
            CaseKey::new("q", None),
            "SELECT 1",
            "SELECT 1",
            &cancel,
        );
        assert!(matches!(r.failure, Some(CaseFailure::Database(_))));
        Ok(())
    }
}
