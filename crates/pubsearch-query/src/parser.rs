//! Query rewriting and range-term detection.
//!
//! The parser never fails: malformed input is passed through to the engine
//! as ordinary text, and the engine's own syntax errors are surfaced to the
//! user by the search layer.

use crate::fields::{FIELD_RECID, FIELD_RECID_ALIAS, RANGE_FIELDS, translate_field};

/// The result of parsing a raw user query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedQuery {
    /// The rewritten query string, ready for the engine.
    pub query: String,
    /// Fields on which an inclusive integer range clause was detected.
    pub range_terms: Vec<String>,
    /// Whether table documents should be excluded from the search.
    ///
    /// Set when the query ranges over publication identity only (the
    /// [`FIELD_RECID_ALIAS`] field without [`FIELD_RECID`]).
    pub exclude_tables: bool,
}

/// A segment of the query: either a boolean operator or a clause.
enum Segment {
    /// A literal `AND` or `OR` token, preserved in the output.
    Operator(&'static str),
    /// A clause to be rewritten.
    Clause(String),
}

/// Parses a raw query string.
///
/// Clauses are split on the literal `AND`/`OR` tokens. Each `key:value`
/// clause has its key translated through the field mapping and its value
/// phrase-quoted if it looks like a reaction expression or a DOI; bare
/// clauses get the same quoting treatment. Range clauses are detected on the
/// original string, and the [`FIELD_RECID_ALIAS`] field is rewritten to
/// [`FIELD_RECID`] so downstream code deals with one name only.
pub fn parse(raw: &str) -> ParsedQuery {
    let range_terms = detect_range_terms(raw);
    let exclude_tables = range_terms.iter().any(|t| t == FIELD_RECID_ALIAS)
        && !range_terms.iter().any(|t| t == FIELD_RECID);

    let rewritten: Vec<String> = split_boolean(raw)
        .into_iter()
        .map(|segment| match segment {
            Segment::Operator(op) => op.to_string(),
            Segment::Clause(clause) => rewrite_clause(&clause),
        })
        .collect();

    ParsedQuery {
        query: rewritten.join(" ").replace(FIELD_RECID_ALIAS, FIELD_RECID),
        range_terms,
        exclude_tables,
    }
}

/// Splits a query on whitespace-delimited `AND`/`OR` tokens, keeping the
/// operators as separate segments.
fn split_boolean(raw: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for token in raw.split_whitespace() {
        let operator = match token {
            "AND" => Some("AND"),
            "OR" => Some("OR"),
            _ => None,
        };
        if let Some(op) = operator {
            if !current.is_empty() {
                segments.push(Segment::Clause(current.join(" ")));
                current.clear();
            }
            segments.push(Segment::Operator(op));
        } else {
            current.push(token);
        }
    }

    if !current.is_empty() {
        segments.push(Segment::Clause(current.join(" ")));
    }

    segments
}

/// Rewrites a single clause: field translation plus phrase quoting.
fn rewrite_clause(clause: &str) -> String {
    match clause.split_once(':') {
        Some((key, value)) => {
            let mapped = translate_field(key).unwrap_or(key);
            format!("{mapped}:{}", quote_phrase(value))
        }
        None => quote_phrase(clause),
    }
}

/// Wraps reaction expressions and DOIs in double quotes so the engine treats
/// them as exact phrases rather than tokenized text.
fn quote_phrase(value: &str) -> String {
    let already_quoted = value.starts_with('"') && value.ends_with('"') && value.len() >= 2;
    if !already_quoted && (is_reaction_like(value) || is_doi_like(value)) {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}

/// A reaction expression contains the `-->` arrow.
fn is_reaction_like(value: &str) -> bool {
    value.contains("-->")
}

/// A DOI-like value: word characters, a single slash, word characters.
fn is_doi_like(value: &str) -> bool {
    let Some((prefix, suffix)) = value.split_once('/') else {
        return false;
    };
    !prefix.is_empty()
        && !suffix.is_empty()
        && prefix.chars().all(is_word_char)
        && suffix.chars().all(is_word_char)
}

/// Word characters as they appear in record ids and DOIs.
fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' || ch == '-'
}

/// Scans the original query for strict `field:[int TO int]` clauses over the
/// allow-listed range fields.
fn detect_range_terms(raw: &str) -> Vec<String> {
    RANGE_FIELDS
        .iter()
        .filter(|field| has_range_term(raw, field))
        .map(|field| (*field).to_string())
        .collect()
}

/// Whether `raw` contains `field:[int TO int]` for the given field.
///
/// The pattern is strict: a single space either side of `TO`, integer
/// bounds, and the field name not preceded by a word character (so `recid`
/// does not match inside `publication_recid`). Sloppier variants are treated
/// as ordinary text, not an error.
fn has_range_term(raw: &str, field: &str) -> bool {
    let needle = format!("{field}:[");
    let mut from = 0;
    while let Some(pos) = raw[from..].find(&needle) {
        let start = from + pos;
        let preceded = raw[..start].chars().next_back().is_some_and(is_word_char);
        if !preceded && is_range_body(&raw[start + needle.len()..]) {
            return true;
        }
        from = start + needle.len();
    }
    false
}

/// Whether the text following `field:[` reads `<int> TO <int>]`.
fn is_range_body(rest: &str) -> bool {
    let Some(end) = rest.find(']') else {
        return false;
    };
    let mut parts = rest[..end].split(' ');
    matches!(
        (parts.next(), parts.next(), parts.next(), parts.next()),
        (Some(low), Some("TO"), Some(high), None) if is_integer(low) && is_integer(high)
    )
}

/// Whether a string is a plain non-negative integer.
fn is_integer(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|ch| ch.is_ascii_digit())
}
