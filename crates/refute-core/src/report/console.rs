use crate::model::{CaseKey, CaseResult, ClaimStatus, DifficultyBand, Verdict};
use crate::provers::ProverRecord;
use crate::scoring::{BandBreakdown, Breakdown};
use std::fmt::Write;

pub fn print_case_summary(results: &[CaseResult]) {
    let mut confirmed = 0;
    let mut failed = 0;
    let mut timeout = 0;
    let mut error = 0;

    eprintln!("\nVerified {} counterexamples...", results.len());

    for r in results {
        let duration = r
            .duration_ms
            .map(|d| format!("({:.1}s)", d as f64 / 1000.0))
            .unwrap_or_default();
        let id = r.key.to_string();

        match r.verdict {
            Verdict::NotEqual => {
                confirmed += 1;
                eprintln!("✅ {:<20} counterexample holds  {}", id, duration);
            }
            Verdict::Equal => {
                failed += 1;
                eprintln!("❌ {:<20} FAILED ATTACK (results agree)  {}", id, duration);
            }
            Verdict::Error if r.is_timeout() => {
                timeout += 1;
                eprintln!("⏱️  {:<20} TIMEOUT", id);
            }
            Verdict::Error => {
                error += 1;
                let reason = r
                    .failure
                    .as_ref()
                    .map(|f| f.to_string())
                    .or_else(|| r.generated.error.clone())
                    .or_else(|| r.gold.error.clone())
                    .unwrap_or_default();
                eprintln!("💥 {:<20} ERROR: {}", id, reason);
            }
        }
    }

    eprintln!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    eprintln!(
        "Summary: {} confirmed, {} failed attacks, {} timeout, {} error",
        confirmed, failed, timeout, error
    );
}

pub fn format_failed_attacks(attacks: &[CaseKey], list: bool) -> String {
    let mut out = format!("Amount of incorrect attacks: {}\n", attacks.len());
    if list {
        for key in attacks {
            let bound = key
                .bound_size
                .map(|b| b.to_string())
                .unwrap_or_else(|| "-".into());
            let _ = writeln!(
                out,
                "Incorrect attack: Question ID: {}, Bound: {}",
                key.question_id, bound
            );
        }
    }
    out
}

pub fn format_breakdown(b: &Breakdown) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Original count: {}", b.original);
    let _ = writeln!(out, "Removed count: {}", b.removed);
    let _ = writeln!(out, "Remaining count: {}", b.remaining);
    let _ = writeln!(out, "False positive count: {}", b.false_positive_questions);
    let _ = writeln!(out, "Res counts:");
    for (res, n) in &b.res_counts {
        let share = if b.remaining == 0 {
            0.0
        } else {
            *n as f64 / b.remaining as f64 * 100.0
        };
        let _ = writeln!(out, "  {:<12} {:>6}  ({:.2}%)", res, n, share);
    }
    let _ = writeln!(out, "Final EX Score: {:.4}%", b.final_ex_percent);
    out
}

pub fn format_band_table(title: &str, b: &BandBreakdown) -> String {
    let mut out = String::new();
    let mut header = format!("{:<20}", "");
    let mut counts = format!("{:<20}", "count");
    let mut scores = format!("{:<20}", title);
    for band in DifficultyBand::ALL {
        let s = b.band(band);
        let _ = write!(header, "{:<20}", band.as_str());
        let _ = write!(counts, "{:<20}", s.count);
        let _ = write!(scores, "{:<20.2}", s.accuracy_percent);
    }
    let _ = write!(header, "{:<20}", "total");
    let _ = write!(counts, "{:<20}", b.total.count);
    let _ = write!(scores, "{:<20.2}", b.total.accuracy_percent);

    for line in [header, counts] {
        let _ = writeln!(out, "{}", line.trim_end());
    }
    let _ = writeln!(out, "{}", "=".repeat(100));
    let _ = writeln!(out, "{}", scores.trim_end());
    out
}

pub fn print_prover_summary(records: &[ProverRecord]) {
    let count = |s: &ClaimStatus| records.iter().filter(|r| &r.equivalent == s).count();
    eprintln!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    eprintln!(
        "Prover: {} requests, {} equivalent, {} not equivalent, {} timeout, {} error",
        records.len(),
        count(&ClaimStatus::Equivalent),
        count(&ClaimStatus::NotEquivalent),
        count(&ClaimStatus::Timeout),
        count(&ClaimStatus::Error)
    );
}
