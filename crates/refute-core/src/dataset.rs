//! Tabular input and output.
//!
//! Input records come from the prover's result CSV. Columns are looked up
//! case-insensitively and unknown columns are carried through untouched so
//! a relabelled dataset can be written back out.

use crate::model::{Case, CaseKey, CaseResult, ClaimStatus, SideOutcome};
use crate::parse::parse_record;
use crate::sanitize::query_text::has_order_by;
use anyhow::{bail, Context};
use serde_json::Value;
use std::io::{Read, Write};
use std::path::Path;

pub const COL_QUESTION_ID: &str = "question_id";
pub const COL_BOUND_SIZE: &str = "bound_size";
pub const COL_EQUIVALENT: &str = "equivalent";
pub const COL_RES: &str = "res";
pub const COL_COUNTEREXAMPLE: &str = "counterexample";

/// `res` value of a record whose generated query matched gold on the
/// benchmark database.
pub const RES_CORRECT: &str = "correct";

pub const RESULT_COLUMNS: [&str; 18] = [
    "bound_size",
    "question_id",
    "equal",
    "setup_error",
    "generated_sql_error",
    "gold_sql_error",
    "generated_sql_columns",
    "gold_sql_columns",
    "generated_sql_results",
    "gold_sql_results",
    "generated_sql_scalar",
    "gold_sql_scalar",
    "generated_sql",
    "gold_sql",
    "generated_sql_ok",
    "gold_sql_ok",
    "generated_sql_has_order_by",
    "gold_sql_has_order_by",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// A typed view of one dataset row.
#[derive(Debug, Clone, PartialEq)]
pub struct InputRecord {
    /// 1-based position in the file, header excluded.
    pub row: usize,
    pub question_id: String,
    pub bound_size: Option<i64>,
    pub equivalent: ClaimStatus,
    pub res: Option<String>,
    pub counterexample: String,
}

impl InputRecord {
    pub fn key(&self) -> CaseKey {
        CaseKey::new(self.question_id.clone(), self.bound_size)
    }

    /// The prover claimed a difference although the generated query was
    /// judged correct.
    pub fn is_false_positive_candidate(&self) -> bool {
        self.res.as_deref() == Some(RES_CORRECT) && self.equivalent == ClaimStatus::NotEquivalent
    }
}

/// Accepts `3`, ` 3 ` and `3.0`. Anything else is treated as absent.
pub fn parse_bound(raw: &str) -> Option<i64> {
    let t = raw.trim();
    if t.is_empty() {
        return None;
    }
    if let Ok(n) = t.parse::<i64>() {
        return Some(n);
    }
    match t.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 => Some(f as i64),
        _ => None,
    }
}

impl Dataset {
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        Self::from_reader(file).with_context(|| format!("failed to read {}", path.display()))
    }

    pub fn from_reader<R: Read>(reader: R) -> anyhow::Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(headers.len().max(row.len()), String::new());
            rows.push(row);
        }
        Ok(Self { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    }

    pub fn require_columns(&self, names: &[&str]) -> anyhow::Result<()> {
        let missing: Vec<&str> = names
            .iter()
            .copied()
            .filter(|n| self.column(n).is_none())
            .collect();
        if !missing.is_empty() {
            bail!(
                "CSV must contain the column(s) {:?}; found: {:?}",
                missing,
                self.headers
            );
        }
        Ok(())
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn records(&self) -> Vec<InputRecord> {
        let qid = self.column(COL_QUESTION_ID);
        let bound = self.column(COL_BOUND_SIZE);
        let equivalent = self.column(COL_EQUIVALENT);
        let res = self.column(COL_RES);
        let block = self.column(COL_COUNTEREXAMPLE);

        (0..self.rows.len())
            .map(|i| {
                let get = |col: Option<usize>| col.map(|c| self.cell(i, c)).unwrap_or("");
                InputRecord {
                    row: i + 1,
                    question_id: get(qid).trim().to_string(),
                    bound_size: parse_bound(get(bound)),
                    equivalent: ClaimStatus::parse(get(equivalent)),
                    res: res.map(|c| self.cell(i, c).trim().to_string()),
                    counterexample: get(block).to_string(),
                }
            })
            .collect()
    }

    /// Sets the `equivalent` cell of every row matching `key`. Returns how
    /// many rows changed.
    pub fn set_equivalent(&mut self, key: &CaseKey, status: &ClaimStatus) -> anyhow::Result<usize> {
        let Some(eq_col) = self.column(COL_EQUIVALENT) else {
            bail!("dataset has no '{}' column", COL_EQUIVALENT);
        };
        let qid_col = self.column(COL_QUESTION_ID);
        let bound_col = self.column(COL_BOUND_SIZE);

        let mut changed = 0;
        for row in &mut self.rows {
            let qid = qid_col.and_then(|c| row.get(c)).map(|s| s.trim()).unwrap_or("");
            let bound = bound_col.and_then(|c| row.get(c)).and_then(|s| parse_bound(s));
            if qid == key.question_id && bound == key.bound_size {
                row[eq_col] = status.as_str().to_string();
                changed += 1;
            }
        }
        Ok(changed)
    }

    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        self.write_to(file)
            .with_context(|| format!("failed to write {}", path.display()))
    }

    pub fn write_to<W: Write>(&self, writer: W) -> anyhow::Result<()> {
        let mut w = csv::WriterBuilder::new().flexible(true).from_writer(writer);
        w.write_record(&self.headers)?;
        for row in &self.rows {
            w.write_record(row)?;
        }
        w.flush()?;
        Ok(())
    }
}

pub fn false_positive_candidates(records: &[InputRecord]) -> Vec<InputRecord> {
    records
        .iter()
        .filter(|r| r.is_false_positive_candidate())
        .cloned()
        .collect()
}

/// Parses the counterexample block of every record. Records without a
/// usable block contribute nothing.
pub fn cases_from_records(records: &[InputRecord]) -> Vec<Case> {
    let mut cases = Vec::new();
    for r in records {
        if r.counterexample.trim().is_empty() {
            continue;
        }
        let parsed = parse_record(Some(&r.question_id), r.row, r.bound_size, &r.counterexample);
        if parsed.is_empty() {
            tracing::debug!(event = "record.no_cases", row = r.row, question_id = %r.question_id);
        }
        cases.extend(parsed);
    }
    cases
}

fn bool_cell(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}

fn scalar_cell(v: &Option<Value>) -> String {
    match v {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn columns_cell(side: &SideOutcome) -> anyhow::Result<String> {
    if !side.ok {
        return Ok(String::new());
    }
    Ok(serde_json::to_string(&side.columns)?)
}

fn results_cell(side: &SideOutcome, inline_max_rows: usize) -> anyhow::Result<String> {
    if !side.ok || side.rowcount > inline_max_rows {
        return Ok(String::new());
    }
    Ok(serde_json::to_string(&side.full_rows)?)
}

pub fn write_results(path: &Path, results: &[CaseResult], inline_max_rows: usize) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_results_to(file, results, inline_max_rows)
        .with_context(|| format!("failed to write {}", path.display()))
}

/// One row per case. Full result rows are inlined only when a side has at
/// most `inline_max_rows` rows.
pub fn write_results_to<W: Write>(
    writer: W,
    results: &[CaseResult],
    inline_max_rows: usize,
) -> anyhow::Result<()> {
    let mut w = csv::Writer::from_writer(writer);
    w.write_record(RESULT_COLUMNS)?;
    for r in results {
        let record = [
            r.key.bound_size.map(|b| b.to_string()).unwrap_or_default(),
            r.key.question_id.clone(),
            r.verdict.as_str().to_string(),
            r.failure.as_ref().map(|f| f.to_string()).unwrap_or_default(),
            r.generated.error.clone().unwrap_or_default(),
            r.gold.error.clone().unwrap_or_default(),
            columns_cell(&r.generated)?,
            columns_cell(&r.gold)?,
            results_cell(&r.generated, inline_max_rows)?,
            results_cell(&r.gold, inline_max_rows)?,
            scalar_cell(&r.generated.scalar),
            scalar_cell(&r.gold.scalar),
            r.generated_sql.clone(),
            r.gold_sql.clone(),
            bool_cell(r.generated.ok).to_string(),
            bool_cell(r.gold.ok).to_string(),
            bool_cell(has_order_by(&r.generated_sql)).to_string(),
            bool_cell(has_order_by(&r.gold_sql)).to_string(),
        ];
        w.write_record(&record)?;
    }
    w.flush()?;
    Ok(())
}
