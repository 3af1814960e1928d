//! SQL command classification.
//!
//! Deliberately narrow — not a general SQL parser, just enough keyword and
//! CTE-header recognition to route a statement to the right endpoint.

use std::fmt;

/// The uppercased leading command of a SQL statement, after peeling any
/// top-level `WITH [RECURSIVE] ... AS (...)` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlCommand {
    Select,
    Insert,
    Update,
    Delete,
    Explain,
    ExplainQueryPlan,
    /// Anything else (CREATE, DROP, PRAGMA, ...). Treated as a write by the
    /// query layer.
    Other(String),
}

impl fmt::Display for SqlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlCommand::Select => f.write_str("SELECT"),
            SqlCommand::Insert => f.write_str("INSERT"),
            SqlCommand::Update => f.write_str("UPDATE"),
            SqlCommand::Delete => f.write_str("DELETE"),
            SqlCommand::Explain => f.write_str("EXPLAIN"),
            SqlCommand::ExplainQueryPlan => f.write_str("EXPLAIN QUERY PLAN"),
            SqlCommand::Other(s) => f.write_str(s),
        }
    }
}

impl SqlCommand {
    /// Reads are `SELECT` and `EXPLAIN` (either form); everything
    /// else, including `Other`, is a write.
    pub fn is_read(&self) -> bool {
        matches!(
            self,
            SqlCommand::Select | SqlCommand::Explain | SqlCommand::ExplainQueryPlan
        )
    }
}

struct Scanner<'a> {
    rest: &'a str,
}

impl<'a> Scanner<'a> {
    fn new(s: &'a str) -> Self {
        Scanner { rest: s }
    }

    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start();
    }

    /// Reads the next bare identifier/keyword (ASCII letters, digits,
    /// underscore), returning its uppercased form, advancing past it.
    fn next_word(&mut self) -> Option<String> {
        self.skip_ws();
        let end = self
            .rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(self.rest.len());
        if end == 0 {
            return None;
        }
        let (word, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(word.to_ascii_uppercase())
    }

    fn peek_word(&self) -> Option<String> {
        let mut clone = Scanner::new(self.rest);
        clone.next_word()
    }

    /// Skips a single balanced `(...)` group starting at the current
    /// position (after whitespace). No-op if the next non-whitespace
    /// character isn't `(`.
    fn skip_balanced_parens(&mut self) {
        self.skip_ws();
        if !self.rest.starts_with('(') {
            return;
        }
        let mut depth = 0i32;
        let mut chars = self.rest.char_indices();
        let mut end = self.rest.len();
        let mut in_string: Option<char> = None;
        while let Some((idx, c)) = chars.next() {
            if let Some(quote) = in_string {
                if c == quote {
                    in_string = None;
                }
                continue;
            }
            match c {
                '\'' | '"' => in_string = Some(c),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        end = idx + 1;
                        break;
                    }
                }
                _ => {}
            }
        }
        self.rest = &self.rest[end..];
    }

    fn skip_char(&mut self, c: char) -> bool {
        self.skip_ws();
        if let Some(stripped) = self.rest.strip_prefix(c) {
            self.rest = stripped;
            true
        } else {
            false
        }
    }
}

fn to_command(word: &str) -> SqlCommand {
    match word {
        "SELECT" => SqlCommand::Select,
        "INSERT" => SqlCommand::Insert,
        "UPDATE" => SqlCommand::Update,
        "DELETE" => SqlCommand::Delete,
        other => SqlCommand::Other(other.to_string()),
    }
}

/// Classifies `sql` per the `SQLCommand` rule.
pub fn classify(sql: &str) -> SqlCommand {
    let mut scanner = Scanner::new(sql);
    let Some(first) = scanner.next_word() else {
        return SqlCommand::Other(String::new());
    };

    if first == "EXPLAIN" {
        let checkpoint = scanner.rest;
        if scanner.next_word().as_deref() == Some("QUERY")
            && scanner.next_word().as_deref() == Some("PLAN")
        {
            return SqlCommand::ExplainQueryPlan;
        }
        scanner.rest = checkpoint;
        return SqlCommand::Explain;
    }

    if first != "WITH" {
        return to_command(&first);
    }

    // Peel `WITH [RECURSIVE] name [(cols)] AS (...) [, name2 ...]`.
    if scanner.peek_word().as_deref() == Some("RECURSIVE") {
        scanner.next_word();
    }

    loop {
        if scanner.next_word().is_none() {
            // Malformed / truncated CTE header; nothing to classify.
            return SqlCommand::Other(String::new());
        }
        scanner.skip_balanced_parens(); // optional column list
        if scanner.next_word().as_deref() != Some("AS") {
            return SqlCommand::Other(String::new());
        }
        scanner.skip_balanced_parens(); // the CTE body
        if !scanner.skip_char(',') {
            break;
        }
    }

    match scanner.next_word() {
        Some(word) => to_command(&word),
        None => SqlCommand::Other(String::new()),
    }
}
