use super::scanner::{transition, ScanState};

/// Escapes stray apostrophes inside single-quoted literals.
///
/// Provers print string data verbatim, so a value such as `ANCESTOR'S
/// CHOSEN` shows up as `'ANCESTOR'S CHOSEN'`. Inside a literal, a lone `'`
/// directly followed by a letter is taken to be part of the data and
/// doubled; a lone `'` followed by anything else closes the literal, and
/// `''` is kept as is.
///
/// Best-effort only: an apostrophe followed by punctuation or whitespace
/// (`'CHILDREN' TOYS'`) is read as the end of the literal and the script
/// will still be wrong.
pub fn repair_apostrophes(sql: &str) -> String {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len() + 8);
    let mut state = ScanState::Code;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if state == ScanState::SingleQuoted
            && c == '\''
            && next.is_some_and(|n| n != '\'' && n.is_alphabetic())
        {
            out.push_str("''");
            i += 1;
            continue;
        }

        let (to, consumed) = transition(state, c, next);
        out.extend(&chars[i..i + consumed]);
        state = to;
        i += consumed;
    }
    out
}
