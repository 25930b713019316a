//! Normalisation applied to query text before it is handed to a prover.

use super::scanner::{pieces, Piece};
use regex::Regex;
use std::sync::OnceLock;

/// Generated SQL is sometimes followed by a tab and metadata.
pub const STOPPER: char = '\t';

/// Cuts at the first tab, collapses whitespace and uppercases.
pub fn format_sql(sql: &str) -> String {
    let head = sql.split(STOPPER).next().unwrap_or_default();
    head.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

fn backtick_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`([^`]+)`").expect("Invalid backtick regex"))
}

fn digit_range_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)-(\d+)").expect("Invalid digit range regex"))
}

fn letter_digit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([A-Z]+)-(\d+)").expect("Invalid letter-digit regex"))
}

fn junk_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Z0-9_]").expect("Invalid junk regex"))
}

fn underscores_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"_+").expect("Invalid underscore regex"))
}

/// Turns a back-ticked column name into a bare identifier the prover can
/// declare: `` `FREE MEAL COUNT (K-12)` `` -> `FREE_MEAL_COUNT_K12`,
/// `` `ENROLLMENT (AGES 5-17)` `` -> `ENROLLMENT_AGES_5_17`.
pub fn rewrite_backtick_identifiers(sql: &str) -> String {
    backtick_re()
        .replace_all(sql, |caps: &regex::Captures<'_>| clean_identifier(&caps[1]))
        .into_owned()
}

fn clean_identifier(raw: &str) -> String {
    let s = raw.to_uppercase().replace(' ', "_");
    let s = digit_range_re().replace_all(&s, "${1}_${2}");
    let s = letter_digit_re().replace_all(&s, "${1}${2}");
    let s = junk_re().replace_all(&s, "");
    let s = underscores_re().replace_all(&s, "_");
    s.trim_matches('_').to_string()
}

/// True when the query has an `ORDER BY` in code (not in a literal or
/// comment).
pub fn has_order_by(sql: &str) -> bool {
    let pieces = pieces(sql);
    pieces.windows(3).any(|w| match w {
        [Piece::Word(a), Piece::Verbatim(gap), Piece::Word(b)] => {
            a.eq_ignore_ascii_case("order")
                && b.eq_ignore_ascii_case("by")
                && gap.chars().all(char::is_whitespace)
        }
        _ => false,
    })
}
