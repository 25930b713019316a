//! Lexical scanner shared by the sanitizer passes.
//!
//! The scanner only knows enough SQL to tell code apart from string
//! literals, quoted identifiers and comments. Inside code it cuts out bare
//! words so the passes can rewrite them without touching anything else.

/// Lexical region the scanner is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Code,
    /// Inside `'...'`.
    SingleQuoted,
    /// Inside `"..."`.
    DoubleQuoted,
    /// After `--`, until end of line.
    LineComment,
    /// Inside `/* ... */`.
    BlockComment,
}

/// A slice of the input as seen by the passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Piece<'a> {
    /// A bare word in code: starts with a letter or `_`, continues with
    /// letters, digits, `_` or `-`.
    Word(&'a str),
    /// Everything else, to be copied through untouched.
    Verbatim(&'a str),
}

impl<'a> Piece<'a> {
    pub fn as_str(&self) -> &'a str {
        match self {
            Piece::Word(s) | Piece::Verbatim(s) => s,
        }
    }
}

/// Transition table for everything except word handling.
///
/// Given the current state, the current char and the char after it, returns
/// the next state and how many chars were consumed. Escaped `''` and `""`
/// pairs are consumed as a unit so they never terminate a region.
pub fn transition(state: ScanState, c: char, next: Option<char>) -> (ScanState, usize) {
    match state {
        ScanState::Code => match (c, next) {
            ('-', Some('-')) => (ScanState::LineComment, 2),
            ('/', Some('*')) => (ScanState::BlockComment, 2),
            ('\'', _) => (ScanState::SingleQuoted, 1),
            ('"', _) => (ScanState::DoubleQuoted, 1),
            _ => (ScanState::Code, 1),
        },
        ScanState::SingleQuoted => quoted(state, '\'', c, next),
        ScanState::DoubleQuoted => quoted(state, '"', c, next),
        ScanState::LineComment => match c {
            '\n' => (ScanState::Code, 1),
            _ => (ScanState::LineComment, 1),
        },
        ScanState::BlockComment => match (c, next) {
            ('*', Some('/')) => (ScanState::Code, 2),
            _ => (ScanState::BlockComment, 1),
        },
    }
}

fn quoted(state: ScanState, quote: char, c: char, next: Option<char>) -> (ScanState, usize) {
    if c != quote {
        return (state, 1);
    }
    if next == Some(quote) {
        (state, 2)
    } else {
        (ScanState::Code, 1)
    }
}

pub fn is_word_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// Splits `sql` into words and verbatim runs. Concatenating the pieces
/// yields the input unchanged.
pub fn pieces(sql: &str) -> Vec<Piece<'_>> {
    Scanner::new(sql).run()
}

/// Splits `sql` at its first `;` in code. The second element is the rest
/// of the text when it holds more than whitespace, comments and further
/// `;`, which means a second statement follows.
pub fn split_first_statement(sql: &str) -> (&str, Option<&str>) {
    let chars: Vec<(usize, char)> = sql.char_indices().collect();
    let mut state = ScanState::Code;
    let mut end = None;
    let mut pos = 0;
    while pos < chars.len() {
        let (offset, c) = chars[pos];
        let next = chars.get(pos + 1).map(|(_, c)| *c);
        let (entered, consumed) = transition(state, c, next);
        if state == ScanState::Code {
            match end {
                None if c == ';' => end = Some(offset),
                Some(at)
                    if !c.is_whitespace()
                        && c != ';'
                        && !matches!(entered, ScanState::LineComment | ScanState::BlockComment) =>
                {
                    return (&sql[..at], Some(sql[at + 1..].trim()));
                }
                _ => {}
            }
        }
        state = entered;
        pos += consumed;
    }
    match end {
        Some(at) => (&sql[..at], None),
        None => (sql, None),
    }
}

struct Scanner<'a> {
    src: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    state: ScanState,
    verbatim_from: usize,
    out: Vec<Piece<'a>>,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.char_indices().collect(),
            pos: 0,
            state: ScanState::Code,
            verbatim_from: 0,
            out: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Piece<'a>> {
        while self.pos < self.chars.len() {
            let c = self.chars[self.pos].1;
            let next = self.peek(1);
            if self.state == ScanState::Code {
                if is_word_start(c) {
                    self.word();
                    continue;
                }
                if c.is_ascii_digit() {
                    self.number();
                    continue;
                }
            }
            let (state, consumed) = transition(self.state, c, next);
            self.state = state;
            self.pos += consumed;
        }
        self.flush(self.src.len());
        self.out
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).map(|(_, c)| *c)
    }

    fn offset(&self, idx: usize) -> usize {
        self.chars.get(idx).map(|(o, _)| *o).unwrap_or(self.src.len())
    }

    fn word(&mut self) {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.peek(0) {
                // a comment marker ends the word even though `-` is a word char
                Some('-') if self.peek(1) == Some('-') => break,
                Some(c) if is_word_char(c) => self.pos += 1,
                _ => break,
            }
        }
        let (from, to) = (self.offset(start), self.offset(self.pos));
        self.flush(from);
        self.out.push(Piece::Word(&self.src[from..to]));
        self.verbatim_from = to;
    }

    // Numeric literals are skipped whole so `1e-5` never yields a word `e-5`.
    fn number(&mut self) {
        self.pos += 1;
        loop {
            match self.peek(0) {
                Some(c) if c.is_alphanumeric() || c == '_' || c == '.' => self.pos += 1,
                Some('+') | Some('-')
                    if matches!(self.chars.get(self.pos - 1), Some((_, 'e' | 'E')))
                        && self.peek(1).is_some_and(|d| d.is_ascii_digit()) =>
                {
                    self.pos += 1
                }
                _ => break,
            }
        }
    }

    fn flush(&mut self, upto: usize) {
        if upto > self.verbatim_from {
            self.out
                .push(Piece::Verbatim(&self.src[self.verbatim_from..upto]));
        }
        self.verbatim_from = upto;
    }
}
