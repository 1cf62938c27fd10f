//! Keyword aggregation and cmenergies normalization.
//!
//! Table keywords are free text. Most are aggregated as-is into per-name
//! value lists; `cmenergies` values are parsed into numeric `{gte, lte}`
//! ranges so the engine can answer range queries over them. Source data
//! contains single energies (`"91.2 GeV"`), dash ranges (`"2.4-2.6"`) and
//! "and"-separated pairs (`"5020 and 2760"`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::record::Keyword;

/// The keyword name treated as a numeric range rather than plain text.
const CMENERGIES: &str = "cmenergies";

/// A normalized center-of-mass energy range.
///
/// Always satisfies `gte <= lte`; the parser sorts the endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CmEnergyRange {
    /// Lower bound, inclusive.
    pub gte: f64,
    /// Upper bound, inclusive.
    pub lte: f64,
}

/// Per-publication (or per-table) aggregated keywords.
///
/// Serializes as one object keyed by keyword name, with `cmenergies` as a
/// list of range objects and every other keyword as a sorted, deduplicated
/// list of strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataKeywords {
    /// Normalized cmenergies ranges.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cmenergies: Vec<CmEnergyRange>,
    /// All other keywords: name → sorted unique values.
    #[serde(flatten)]
    pub values: BTreeMap<String, Vec<String>>,
}

impl DataKeywords {
    /// Returns true if no keyword values are present.
    pub fn is_empty(&self) -> bool {
        self.cmenergies.is_empty() && self.values.is_empty()
    }

    /// Adds a single cmenergies range, skipping structural duplicates.
    ///
    /// Ranges are small objects rather than scalars, so deduplication is by
    /// exact structural equality.
    pub fn push_cmenergies(&mut self, range: CmEnergyRange) {
        if !self.cmenergies.contains(&range) {
            self.cmenergies.push(range);
        }
    }

    /// Adds a plain keyword value under `name`, skipping duplicates.
    pub fn push_value(&mut self, name: &str, value: &str) {
        let values = self.values.entry(name.to_string()).or_default();
        if !values.iter().any(|v| v == value) {
            values.push(value.to_string());
        }
    }

    /// Merges another keyword set into this one, deduplicating.
    ///
    /// Used by the keyword push-down job to aggregate children into their
    /// parent. Merging is order-independent once [`Self::normalize`] has run.
    pub fn merge(&mut self, other: &Self) {
        for range in &other.cmenergies {
            self.push_cmenergies(*range);
        }
        for (name, values) in &other.values {
            for value in values {
                self.push_value(name, value);
            }
        }
    }

    /// Sorts value lists so equal inputs produce byte-identical documents.
    pub fn normalize(&mut self) {
        for values in self.values.values_mut() {
            values.sort();
        }
        self.cmenergies.sort_by(|a, b| {
            (a.gte, a.lte)
                .partial_cmp(&(b.gte, b.lte))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }
}

/// Aggregates a table's raw keywords into a [`DataKeywords`] set.
///
/// Only names in `allowed` are kept. Values are deduplicated per name;
/// cmenergies values that fail to parse are logged and dropped, never an
/// error.
pub fn aggregate_keywords(keywords: &[Keyword], allowed: &[String]) -> DataKeywords {
    let mut aggregated = DataKeywords::default();

    for keyword in keywords {
        if !allowed.iter().any(|name| *name == keyword.name) {
            continue;
        }
        if keyword.name == CMENERGIES {
            match parse_cmenergies(&keyword.value) {
                Some(range) => aggregated.push_cmenergies(range),
                None => warn!(value = %keyword.value, "dropping unparsable cmenergies value"),
            }
        } else {
            aggregated.push_value(&keyword.name, &keyword.value);
        }
    }

    aggregated.normalize();
    aggregated
}

/// Parses one free-text cmenergies value into a normalized range.
///
/// Accepts a single number or a pair separated by whitespace, dashes, or the
/// word "and" (case-insensitive), with an optional trailing `GeV` unit.
/// Endpoints are sorted so `gte <= lte` always holds. Returns `None` for
/// anything else.
pub fn parse_cmenergies(raw: &str) -> Option<CmEnergyRange> {
    let text = strip_unit(raw.trim());

    if let Ok(value) = text.parse::<f64>() {
        return Some(CmEnergyRange {
            gte: value,
            lte: value,
        });
    }

    let (first, second) = split_endpoints(text)?;
    let (gte, lte) = if first <= second {
        (first, second)
    } else {
        (second, first)
    };
    Some(CmEnergyRange { gte, lte })
}

/// Strips a trailing case-insensitive `gev` unit suffix.
fn strip_unit(text: &str) -> &str {
    match text.to_ascii_lowercase().strip_suffix("gev") {
        Some(stripped) => text[..stripped.len()].trim_end(),
        None => text,
    }
}

/// Splits `<float><separator><float>` into its two endpoints.
///
/// The separator is any run of whitespace, `-` characters, and the word
/// "and"; at least one separator character must be present and the second
/// number must end the string.
fn split_endpoints(text: &str) -> Option<(f64, f64)> {
    let first_end = text
        .find(|ch: char| !is_float_char(ch))
        .unwrap_or(text.len());
    if first_end == 0 || first_end == text.len() {
        return None;
    }
    let first: f64 = text[..first_end].parse().ok()?;

    let mut rest = &text[first_end..];
    let mut separated = false;
    loop {
        let trimmed = rest.trim_start();
        if trimmed.len() != rest.len() {
            separated = true;
            rest = trimmed;
            continue;
        }
        if let Some(after) = rest.strip_prefix('-') {
            separated = true;
            rest = after;
            continue;
        }
        if rest.get(..3).is_some_and(|word| word.eq_ignore_ascii_case("and")) {
            separated = true;
            rest = &rest[3..];
            continue;
        }
        break;
    }

    if !separated || rest.is_empty() || !rest.chars().all(is_float_char) {
        return None;
    }
    let second: f64 = rest.parse().ok()?;
    Some((first, second))
}

/// Characters that can appear in a plain decimal number.
fn is_float_char(ch: char) -> bool {
    ch.is_ascii_digit() || ch == '.'
}
