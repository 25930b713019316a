use super::{EquivalenceProver, ProverOptions, ProverRequest};
use crate::engine::{CancelToken, Indexed, TimedTask};
use crate::model::{CaseKey, ClaimStatus};
use crate::sanitize::query_text::{format_sql, rewrite_backtick_identifiers};
use anyhow::Context;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const PROVER_COLUMNS: [&str; 7] = [
    "bound_size",
    "question_id",
    "equivalent",
    "counterexample",
    "time_cost",
    "generated_sql",
    "gold_sql",
];

pub const TIMEOUT_MESSAGE: &str = "Timed out; no result produced";

/// One line of the questions file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProverQuestion {
    #[serde(deserialize_with = "crate::model::id_as_string")]
    pub question_id: String,
    pub generated_sql: String,
    pub gold_sql: String,
    #[serde(default)]
    pub schema: serde_json::Value,
    #[serde(default)]
    pub constraints: serde_json::Value,
}

pub fn load_questions(path: &Path) -> anyhow::Result<Vec<ProverQuestion>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    raw.lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| {
            serde_json::from_str(l)
                .with_context(|| format!("{}:{}: invalid question", path.display(), i + 1))
        })
        .collect()
}

/// Outcome of one prover call, in the shape of an input record.
#[derive(Debug, Clone, PartialEq)]
pub struct ProverRecord {
    pub key: CaseKey,
    pub equivalent: ClaimStatus,
    pub counterexample: String,
    pub time_cost: Option<f64>,
    pub generated_sql: String,
    pub gold_sql: String,
}

#[derive(Debug, Clone)]
pub struct ProverHeader {
    pub key: CaseKey,
    pub generated_sql: String,
    pub gold_sql: String,
}

impl ProverHeader {
    fn into_record(self, equivalent: ClaimStatus, counterexample: String) -> ProverRecord {
        ProverRecord {
            key: self.key,
            equivalent,
            counterexample,
            time_cost: None,
            generated_sql: self.generated_sql,
            gold_sql: self.gold_sql,
        }
    }
}

impl fmt::Display for ProverHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.key.fmt(f)
    }
}

/// Asks the prover about one question at one bound.
pub struct ProverTask {
    pub header: ProverHeader,
    pub request: ProverRequest,
    pub prover: Arc<dyn EquivalenceProver>,
}

impl ProverTask {
    /// Both queries are normalised before they reach the prover.
    pub fn new(
        question: &ProverQuestion,
        bound_size: i64,
        options: ProverOptions,
        prover: Arc<dyn EquivalenceProver>,
    ) -> Self {
        let generated_sql = rewrite_backtick_identifiers(&format_sql(&question.generated_sql));
        let gold_sql = format_sql(&question.gold_sql);
        Self {
            header: ProverHeader {
                key: CaseKey::new(question.question_id.clone(), Some(bound_size)),
                generated_sql: generated_sql.clone(),
                gold_sql: gold_sql.clone(),
            },
            request: ProverRequest {
                sql_a: generated_sql,
                sql_b: gold_sql,
                schema: question.schema.clone(),
                bound_size,
                constraints: question.constraints.clone(),
                options,
            },
            prover,
        }
    }
}

impl TimedTask for ProverTask {
    type Output = ProverRecord;
    type Key = ProverHeader;

    fn key(&self) -> ProverHeader {
        self.header.clone()
    }

    fn run(self, cancel: &CancelToken) -> ProverRecord {
        match self.prover.verify(&self.request, cancel) {
            Ok(resp) => {
                let equivalent = if resp.equivalent {
                    ClaimStatus::Equivalent
                } else {
                    ClaimStatus::NotEquivalent
                };
                let mut record = self
                    .header
                    .into_record(equivalent, resp.counterexample.unwrap_or_default());
                record.time_cost = resp.time_cost;
                record
            }
            Err(e) => {
                tracing::warn!(
                    event = "prover.error",
                    prover = self.prover.name(),
                    case = %self.header,
                    error = %e
                );
                self.header.into_record(ClaimStatus::Error, format!("{e:#}"))
            }
        }
    }

    fn on_timeout(key: ProverHeader, _budget: Duration) -> ProverRecord {
        key.into_record(ClaimStatus::Timeout, TIMEOUT_MESSAGE.to_string())
    }

    fn on_crash(key: ProverHeader, reason: String) -> ProverRecord {
        key.into_record(ClaimStatus::Error, format!("prover crashed: {reason}"))
    }
}

/// One task per question and bound `1..=max_bound`, question-major.
pub fn prover_tasks(
    questions: &[ProverQuestion],
    max_bound: i64,
    options: ProverOptions,
    prover: Arc<dyn EquivalenceProver>,
) -> Vec<Indexed<ProverTask>> {
    let tasks = questions.iter().flat_map(|q| {
        let prover = prover.clone();
        (1..=max_bound).map(move |b| ProverTask::new(q, b, options, prover.clone()))
    });
    Indexed::enumerate(tasks)
}

pub fn write_prover_records(path: &Path, records: &[ProverRecord]) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_prover_records_to(file, records)
        .with_context(|| format!("failed to write {}", path.display()))
}

pub fn write_prover_records_to<W: std::io::Write>(
    writer: W,
    records: &[ProverRecord],
) -> anyhow::Result<()> {
    let mut w = csv::Writer::from_writer(writer);
    w.write_record(PROVER_COLUMNS)?;
    for r in records {
        w.write_record([
            r.key.bound_size.map(|b| b.to_string()).unwrap_or_default(),
            r.key.question_id.clone(),
            r.equivalent.to_string(),
            r.counterexample.clone(),
            r.time_cost.map(|t| t.to_string()).unwrap_or_default(),
            r.generated_sql.clone(),
            r.gold_sql.clone(),
        ])?;
    }
    w.flush()?;
    Ok(())
}
