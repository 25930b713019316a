use super::scanner::{pieces, Piece};
use serde::{Deserialize, Serialize};

/// A word that clashes with SQLite's grammar when used as a bare column
/// name. It is quoted unless the next word is `unless_followed_by`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedWord {
    pub word: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unless_followed_by: Option<String>,
}

impl ReservedWord {
    pub fn new(word: impl Into<String>, unless_followed_by: Option<&str>) -> Self {
        Self {
            word: word.into(),
            unless_followed_by: unless_followed_by.map(str::to_string),
        }
    }

    /// `ORDER` as a column, but not `ORDER BY`.
    pub fn defaults() -> Vec<Self> {
        vec![ReservedWord::new("ORDER", Some("BY"))]
    }

    fn is_continued(&self, rest: &[Piece<'_>]) -> bool {
        let Some(keyword) = &self.unless_followed_by else {
            return false;
        };
        match rest {
            [Piece::Verbatim(gap), Piece::Word(next), ..] => {
                !gap.is_empty()
                    && gap.chars().all(char::is_whitespace)
                    && next.eq_ignore_ascii_case(keyword)
            }
            _ => false,
        }
    }
}

/// Wraps bare identifiers containing `-` in double quotes (`T-BIL` ->
/// `"T-BIL"`). Literals, quoted identifiers and comments are left alone.
pub fn quote_hyphenated_identifiers(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 16);
    for piece in pieces(sql) {
        match piece {
            Piece::Word(w) if w.contains('-') => push_quoted(&mut out, w),
            other => out.push_str(other.as_str()),
        }
    }
    out
}

/// Wraps bare reserved words in double quotes. Matching is
/// case-insensitive on whole words in code only.
pub fn quote_reserved_words(sql: &str, reserved: &[ReservedWord]) -> String {
    if reserved.is_empty() {
        return sql.to_string();
    }
    let pieces = pieces(sql);
    let mut out = String::with_capacity(sql.len() + 16);
    for (i, piece) in pieces.iter().enumerate() {
        match piece {
            Piece::Word(w) => {
                let rule = reserved.iter().find(|r| r.word.eq_ignore_ascii_case(w));
                match rule {
                    Some(r) if !r.is_continued(&pieces[i + 1..]) => push_quoted(&mut out, w),
                    _ => out.push_str(w),
                }
            }
            Piece::Verbatim(v) => out.push_str(v),
        }
    }
    out
}

fn push_quoted(out: &mut String, word: &str) {
    out.push('"');
    out.push_str(word);
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quotes_hyphenated_column() {
        assert_eq!(
            quote_hyphenated_identifiers("CREATE TABLE t (T-BIL INT, name TEXT);"),
            "CREATE TABLE t (\"T-BIL\" INT, name TEXT);"
        );
    }

    #[test]
    fn test_hyphen_pass_leaves_regions_alone() {
        let sql = "INSERT INTO t VALUES ('K-12'); -- A-B\n/* C-D */ SELECT \"E-F\" FROM t";
        assert_eq!(quote_hyphenated_identifiers(sql), sql);
    }

    #[test]
    fn test_hyphen_pass_on_qualified_name() {
        assert_eq!(
            quote_hyphenated_identifiers("SELECT t.T-BIL FROM t"),
            "SELECT t.\"T-BIL\" FROM t"
        );
    }

    #[test]
    fn test_order_quoted_but_not_order_by() {
        let reserved = ReservedWord::defaults();
        assert_eq!(
            quote_reserved_words("CREATE TABLE t (order INT); SELECT * FROM t ORDER BY x", &reserved),
            "CREATE TABLE t (\"order\" INT); SELECT * FROM t ORDER BY x"
        );
        assert_eq!(
            quote_reserved_words("SELECT a FROM t order\n  by a", &reserved),
            "SELECT a FROM t order\n  by a"
        );
    }

    #[test]
    fn test_reserved_requires_whole_word() {
        let reserved = ReservedWord::defaults();
        let sql = "CREATE TABLE orders (ordered INT, order_id INT)";
        assert_eq!(quote_reserved_words(sql, &reserved), sql);
    }

    #[test]
    fn test_reserved_skips_quoted_and_literals() {
        let reserved = ReservedWord::defaults();
        let sql = "INSERT INTO t (\"ORDER\") VALUES ('ORDER')";
        assert_eq!(quote_reserved_words(sql, &reserved), sql);
    }

    #[test]
    fn test_reserved_without_continuation_always_quoted() {
        let reserved = vec![ReservedWord::new("GROUP", None)];
        assert_eq!(
            quote_reserved_words("SELECT group FROM t GROUP BY group", &reserved),
            "SELECT \"group\" FROM t \"GROUP\" BY \"group\""
        );
    }
}
