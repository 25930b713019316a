use crate::errors::CaseFailure;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// One normalized result row. Cells are `null`, a number or a string.
pub type Row = Vec<serde_json::Value>;

/// Natural composite key of a case. A question is usually checked at
/// several bound sizes, so `question_id` alone is not unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CaseKey {
    pub question_id: String,
    pub bound_size: Option<i64>,
}

impl CaseKey {
    pub fn new(question_id: impl Into<String>, bound_size: Option<i64>) -> Self {
        Self {
            question_id: question_id.into(),
            bound_size,
        }
    }
}

impl fmt::Display for CaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bound_size {
            Some(b) => write!(f, "{}@{}", self.question_id, b),
            None => write!(f, "{}", self.question_id),
        }
    }
}

/// Question ids show up as numbers in some inputs and strings in others.
pub(crate) fn id_as_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match serde_json::Value::deserialize(d)? {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

/// A parsed counterexample: the database state plus the two queries that
/// are claimed to disagree on it. Setup and both queries are never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    pub question_id: String,
    pub bound_size: Option<i64>,
    pub setup_sql: String,
    pub sql1: String,
    pub sql2: String,
}

impl Case {
    pub fn key(&self) -> CaseKey {
        CaseKey::new(self.question_id.clone(), self.bound_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMode {
    #[default]
    OrderInsensitive,
    OrderSensitive,
    /// Rows compared as a set; duplicate rows are ignored.
    Set,
}

impl ComparisonMode {
    pub fn from_flag(order_sensitive: bool) -> Self {
        if order_sensitive {
            ComparisonMode::OrderSensitive
        } else {
            ComparisonMode::OrderInsensitive
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "True")]
    Equal,
    #[serde(rename = "False")]
    NotEqual,
    #[serde(rename = "Error")]
    Error,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Equal => "True",
            Verdict::NotEqual => "False",
            Verdict::Error => "Error",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened when one side of a case was executed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideOutcome {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub columns: Vec<String>,
    pub rowcount: usize,
    pub sample_rows: Vec<Row>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scalar: Option<serde_json::Value>,
    #[serde(skip)]
    pub full_rows: Vec<Row>,
}

impl SideOutcome {
    /// The side was never run (setup failed, timeout, ...).
    pub fn not_attempted() -> Self {
        Self::default()
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Per-case output of the executor.
#[derive(Debug, Clone)]
pub struct CaseResult {
    pub key: CaseKey,
    pub verdict: Verdict,
    pub failure: Option<CaseFailure>,
    pub generated: SideOutcome,
    pub gold: SideOutcome,
    pub generated_sql: String,
    pub gold_sql: String,
    pub mode: ComparisonMode,
    pub duration_ms: Option<u64>,
}

impl CaseResult {
    pub fn is_timeout(&self) -> bool {
        self.failure.as_ref().is_some_and(CaseFailure::is_timeout)
    }
}

/// Identity of a case without its payload. Kept aside by timed tasks so a
/// result row can still be produced when the work itself is abandoned.
#[derive(Debug, Clone)]
pub struct CaseHeader {
    pub key: CaseKey,
    pub generated_sql: String,
    pub gold_sql: String,
    pub mode: ComparisonMode,
}

impl CaseHeader {
    pub fn into_failed(self, failure: CaseFailure) -> CaseResult {
        CaseResult {
            key: self.key,
            verdict: Verdict::Error,
            failure: Some(failure),
            generated: SideOutcome::not_attempted(),
            gold: SideOutcome::not_attempted(),
            generated_sql: self.generated_sql,
            gold_sql: self.gold_sql,
            mode: self.mode,
            duration_ms: None,
        }
    }
}

impl fmt::Display for CaseHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.key.fmt(f)
    }
}

/// The prover's recorded claim for a `(question, bound)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClaimStatus {
    Equivalent,
    NotEquivalent,
    Error,
    Timeout,
    FailedAttack,
    Other(String),
}

impl ClaimStatus {
    pub fn parse(s: &str) -> Self {
        let t = s.trim();
        match t.to_ascii_lowercase().as_str() {
            "true" => ClaimStatus::Equivalent,
            "false" => ClaimStatus::NotEquivalent,
            "error" => ClaimStatus::Error,
            "timeout" => ClaimStatus::Timeout,
            "failed attack" => ClaimStatus::FailedAttack,
            _ => ClaimStatus::Other(t.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ClaimStatus::Equivalent => "True",
            ClaimStatus::NotEquivalent => "False",
            ClaimStatus::Error => "ERROR",
            ClaimStatus::Timeout => "TIMEOUT",
            ClaimStatus::FailedAttack => "Failed Attack",
            ClaimStatus::Other(s) => s,
        }
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyBand {
    Simple,
    Moderate,
    Challenging,
}

impl DifficultyBand {
    pub const ALL: [DifficultyBand; 3] = [
        DifficultyBand::Simple,
        DifficultyBand::Moderate,
        DifficultyBand::Challenging,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Some(DifficultyBand::Simple),
            "moderate" => Some(DifficultyBand::Moderate),
            "challenging" => Some(DifficultyBand::Challenging),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyBand::Simple => "simple",
            DifficultyBand::Moderate => "moderate",
            DifficultyBand::Challenging => "challenging",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregateScore {
    pub count: usize,
    pub accuracy_percent: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_status_parse() {
        assert_eq!(ClaimStatus::parse("False"), ClaimStatus::NotEquivalent);
        assert_eq!(ClaimStatus::parse(" true "), ClaimStatus::Equivalent);
        assert_eq!(ClaimStatus::parse("ERROR"), ClaimStatus::Error);
        assert_eq!(ClaimStatus::parse("Failed Attack"), ClaimStatus::FailedAttack);
        assert_eq!(
            ClaimStatus::parse("maybe"),
            ClaimStatus::Other("maybe".into())
        );
        assert_eq!(ClaimStatus::FailedAttack.as_str(), "Failed Attack");
    }

    #[test]
    fn test_case_key_display() {
        assert_eq!(CaseKey::new("17", Some(3)).to_string(), "17@3");
        assert_eq!(CaseKey::new("17", None).to_string(), "17");
    }

    #[test]
    fn test_verdict_serializes_as_capitalized_bool() {
        let s = serde_json::to_string(&Verdict::Equal).unwrap();
        assert_eq!(s, "\"True\"");
        assert_eq!(Verdict::Error.to_string(), "Error");
    }
}
