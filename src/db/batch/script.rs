use once_cell::sync::Lazy;
use regex::Regex;

/// Whole-word, case-insensitive `GO` batch separator. A `GO` inside a string
/// literal or comment still splits the script; this mirrors the conventional
/// tooling behaviour and is a documented limitation, not a bug.
static GO_DELIMITER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bgo\b").expect("valid delimiter pattern"));

/// Split a raw script into trimmed, non-empty statements in source order.
pub fn split_statements(script: &str) -> Vec<String> {
    GO_DELIMITER
        .split(script)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lexical row-producing check: the trimmed statement case-insensitively
/// begins with `SELECT`. This is the documented classification policy, not
/// a SQL parse; anything else goes down the affected-rows path.
pub fn is_select(statement: &str) -> bool {
    let trimmed = statement.trim_start().as_bytes();
    trimmed.len() >= 6 && trimmed[..6].eq_ignore_ascii_case(b"select")
}

/// Leading keyword of a statement, uppercased, used in affected-rows log
/// lines ("UPDATE affected 3 row(s)").
pub fn statement_verb(statement: &str) -> String {
    statement
        .split_whitespace()
        .next()
        .unwrap_or("STATEMENT")
        .to_uppercase()
}
