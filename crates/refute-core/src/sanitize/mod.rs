//! Character-level repairs that make prover output executable on SQLite.
//!
//! Three passes run in order on the setup script: apostrophe repair,
//! hyphenated-identifier quoting and reserved-word quoting. None of them
//! parses SQL; they share a small scanner that tracks string literals,
//! quoted identifiers and comments. Applying them twice gives the same text
//! as applying them once.

pub mod apostrophes;
pub mod identifiers;
pub mod query_text;
pub mod scanner;

pub use apostrophes::repair_apostrophes;
pub use identifiers::{quote_hyphenated_identifiers, quote_reserved_words, ReservedWord};

use crate::model::Case;

#[derive(Debug, Clone)]
pub struct Sanitizer {
    reserved: Vec<ReservedWord>,
    quote_queries: bool,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(ReservedWord::defaults())
    }
}

impl Sanitizer {
    pub fn new(reserved: Vec<ReservedWord>) -> Self {
        Self {
            reserved,
            quote_queries: false,
        }
    }

    /// Also apply identifier quoting to both queries.
    pub fn with_query_quoting(mut self, on: bool) -> Self {
        self.quote_queries = on;
        self
    }

    pub fn sanitize_setup(&self, sql: &str) -> String {
        let sql = repair_apostrophes(sql);
        self.quote_identifiers(&sql)
    }

    /// The two quoting passes, without apostrophe repair.
    pub fn quote_identifiers(&self, sql: &str) -> String {
        let sql = quote_hyphenated_identifiers(sql);
        quote_reserved_words(&sql, &self.reserved)
    }

    pub fn sanitize_case(&self, case: Case) -> Case {
        let setup_sql = self.sanitize_setup(&case.setup_sql);
        let (sql1, sql2) = if self.quote_queries {
            (
                self.quote_identifiers(&case.sql1),
                self.quote_identifiers(&case.sql2),
            )
        } else {
            (case.sql1, case.sql2)
        };
        Case {
            setup_sql,
            sql1,
            sql2,
            ..case
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETUP: &str = "CREATE TABLE frpm (T-BIL INT, order TEXT, name TEXT);\n\
        -- row for ANCESTOR'S\n\
        INSERT INTO frpm VALUES (1, 'a', 'ANCESTOR'S CHOSEN');\n\
        INSERT INTO frpm VALUES (2, 'b', 'K-12');";

    #[test]
    fn test_full_pipeline() {
        let s = Sanitizer::default().sanitize_setup(SETUP);
        assert!(s.contains("\"T-BIL\" INT"));
        assert!(s.contains("\"order\" TEXT"));
        assert!(s.contains("'ANCESTOR''S CHOSEN'"));
        assert!(s.contains("'K-12'"));
        assert!(s.contains("-- row for ANCESTOR'S\n"));
    }

    #[test]
    fn test_idempotent_on_sanitized_text() {
        let san = Sanitizer::default();
        let inputs = [
            SETUP,
            "SELECT \"T-BIL\" FROM t ORDER BY \"order\"",
            "INSERT INTO t VALUES ('it''s', 1e-5); /* x-y */",
            "",
        ];
        for input in inputs {
            let once = san.sanitize_setup(input);
            assert_eq!(san.sanitize_setup(&once), once, "input: {input}");
        }
    }

    #[test]
    fn test_queries_untouched_by_default() {
        let case = Case {
            question_id: "1".into(),
            bound_size: Some(2),
            setup_sql: "CREATE TABLE t (T-BIL INT);".into(),
            sql1: "SELECT T-BIL FROM t".into(),
            sql2: "SELECT 1".into(),
        };
        let out = Sanitizer::default().sanitize_case(case.clone());
        assert_eq!(out.setup_sql, "CREATE TABLE t (\"T-BIL\" INT);");
        assert_eq!(out.sql1, case.sql1);

        let quoted = Sanitizer::default()
            .with_query_quoting(true)
            .sanitize_case(case);
        assert_eq!(quoted.sql1, "SELECT \"T-BIL\" FROM t");
    }
}
