//! Claim overrides and the false-positive breakdown.

use crate::dataset::{Dataset, InputRecord, RES_CORRECT};
use crate::model::{CaseKey, CaseResult, ClaimStatus, Verdict};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Keys of cases whose two queries agreed on the claimed counterexample,
/// in first-seen order.
pub fn failed_attacks(results: &[CaseResult]) -> Vec<CaseKey> {
    let mut seen = BTreeSet::new();
    results
        .iter()
        .filter(|r| r.verdict == Verdict::Equal)
        .filter(|r| seen.insert(r.key.clone()))
        .map(|r| r.key.clone())
        .collect()
}

/// Relabels every dataset row matching a failed attack. Returns the number
/// of rows changed.
pub fn apply_claim_overrides(dataset: &mut Dataset, attacks: &[CaseKey]) -> anyhow::Result<usize> {
    let mut changed = 0;
    for key in attacks {
        let n = dataset.set_equivalent(key, &ClaimStatus::FailedAttack)?;
        if n == 0 {
            tracing::debug!(event = "claim.unmatched", case = %key);
        }
        changed += n;
    }
    Ok(changed)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdown {
    pub original: usize,
    pub removed: usize,
    pub remaining: usize,
    /// Distinct questions that still hold a false positive.
    pub false_positive_questions: usize,
    pub res_counts: BTreeMap<String, usize>,
    pub final_ex_percent: f64,
}

/// Drops every record of a question that still has a false positive and
/// scores what is left against the original record count.
pub fn breakdown(records: &[InputRecord]) -> Breakdown {
    let fp_questions: BTreeSet<&str> = records
        .iter()
        .filter(|r| r.is_false_positive_candidate())
        .map(|r| r.question_id.as_str())
        .collect();

    let remaining: Vec<&InputRecord> = records
        .iter()
        .filter(|r| !fp_questions.contains(r.question_id.as_str()))
        .collect();

    let mut res_counts = BTreeMap::new();
    for r in &remaining {
        if let Some(res) = r.res.as_deref().filter(|s| !s.is_empty()) {
            *res_counts.entry(res.to_string()).or_insert(0) += 1;
        }
    }

    let correct = res_counts.get(RES_CORRECT).copied().unwrap_or(0);
    let final_ex_percent = if records.is_empty() {
        0.0
    } else {
        correct as f64 / records.len() as f64 * 100.0
    };

    Breakdown {
        original: records.len(),
        removed: records.len() - remaining.len(),
        remaining: remaining.len(),
        false_positive_questions: fp_questions.len(),
        res_counts,
        final_ex_percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CaseHeader, ComparisonMode};

    fn record(qid: &str, bound: i64, eq: &str, res: &str) -> InputRecord {
        InputRecord {
            row: 0,
            question_id: qid.into(),
            bound_size: Some(bound),
            equivalent: ClaimStatus::parse(eq),
            res: Some(res.into()),
            counterexample: String::new(),
        }
    }

    fn result(qid: &str, bound: i64, verdict: Verdict) -> CaseResult {
        let mut r = CaseHeader {
            key: CaseKey::new(qid, Some(bound)),
            generated_sql: String::new(),
            gold_sql: String::new(),
            mode: ComparisonMode::OrderInsensitive,
        }
        .into_failed(crate::errors::CaseFailure::Crashed("x".into()));
        r.verdict = verdict;
        r
    }

    #[test]
    fn test_failed_attacks_dedup() {
        let results = vec![
            result("1", 1, Verdict::Equal),
            result("1", 2, Verdict::NotEqual),
            result("2", 1, Verdict::Error),
            result("1", 1, Verdict::Equal),
            result("3", 4, Verdict::Equal),
        ];
        assert_eq!(
            failed_attacks(&results),
            vec![CaseKey::new("1", Some(1)), CaseKey::new("3", Some(4))]
        );
    }

    #[test]
    fn test_breakdown_removes_whole_questions() {
        let records = vec![
            record("1", 1, "False", "correct"),
            record("1", 2, "True", "correct"),
            record("2", 1, "True", "correct"),
            record("3", 1, "False", "incorrect"),
            record("4", 1, "Failed Attack", "correct"),
        ];
        let b = breakdown(&records);
        assert_eq!(b.original, 5);
        assert_eq!(b.removed, 2);
        assert_eq!(b.remaining, 3);
        assert_eq!(b.false_positive_questions, 1);
        assert_eq!(b.res_counts.get("correct"), Some(&2));
        assert_eq!(b.res_counts.get("incorrect"), Some(&1));
        assert_eq!(b.final_ex_percent, 40.0);
    }

    #[test]
    fn test_breakdown_of_nothing() {
        let b = breakdown(&[]);
        assert_eq!(b.original, 0);
        assert_eq!(b.final_ex_percent, 0.0);
    }
}
