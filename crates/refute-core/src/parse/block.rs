//! Counterexample block parsing.
//!
//! A block looks like:
//!
//! ```text
//! CREATE TABLE ...;
//! INSERT INTO ...;
//! -- ----------sql1------------
//! SELECT ...
//! -- ----------sql2------------
//! SELECT ...
//! ```
//!
//! Several blocks in one text are separated by [`BLOCK_DELIMITER`].
//! Parsing never fails: chunks that do not have both markers, or that end
//! up with an empty segment, are dropped.

use crate::model::Case;

pub const BLOCK_DELIMITER: &str = "~~~~~~~~~~~";
pub const SQL1_MARK: &str = "-- ----------sql1------------";
pub const SQL2_MARK: &str = "-- ----------sql2------------";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTriple {
    pub setup_sql: String,
    pub sql1: String,
    pub sql2: String,
}

pub fn parse_block_text(text: &str) -> Vec<BlockTriple> {
    let mut chunks: Vec<&str> = text
        .split(BLOCK_DELIMITER)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();
    if chunks.is_empty() {
        chunks.push(text.trim());
    }

    let mut out = Vec::new();
    for chunk in chunks {
        match parse_chunk(chunk) {
            Some(triple) => out.push(triple),
            None => tracing::debug!(
                event = "block.dropped",
                chars = chunk.len(),
                "dropping malformed counterexample chunk"
            ),
        }
    }
    out
}

fn parse_chunk(chunk: &str) -> Option<BlockTriple> {
    let (pre, after_sql1) = chunk.split_once(SQL1_MARK)?;
    let (sql1_part, sql2_part) = after_sql1.split_once(SQL2_MARK)?;

    let setup_sql = pre.trim();
    let sql1 = strip_leading_comment_lines(sql1_part);
    let sql2 = strip_leading_comment_lines(sql2_part);

    if setup_sql.is_empty() || sql1.is_empty() || sql2.is_empty() {
        return None;
    }
    Some(BlockTriple {
        setup_sql: setup_sql.to_string(),
        sql1,
        sql2,
    })
}

/// Drops leading lines that begin with `--`; provers like to explain
/// themselves above the query.
fn strip_leading_comment_lines(segment: &str) -> String {
    let mut kept = Vec::new();
    let mut started = false;
    for line in segment.trim().lines() {
        if !started && line.trim_start().starts_with("--") {
            continue;
        }
        started = true;
        kept.push(line);
    }
    kept.join("\n").trim().to_string()
}

/// Parses one source record. `row` is the 1-based position of the record,
/// used as a fallback identifier. When the text holds several blocks each
/// case gets a `_blk<n>` suffix.
pub fn parse_record(
    question_id: Option<&str>,
    row: usize,
    bound_size: Option<i64>,
    text: &str,
) -> Vec<Case> {
    let triples = parse_block_text(text);
    let base = match question_id.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => format!("row_{row}"),
    };
    let many = triples.len() > 1;

    triples
        .into_iter()
        .enumerate()
        .map(|(j, t)| Case {
            question_id: if many {
                format!("{}_blk{}", base, j + 1)
            } else {
                base.clone()
            },
            bound_size,
            setup_sql: t.setup_sql,
            sql1: t.sql1,
            sql2: t.sql2,
        })
        .collect()
}
