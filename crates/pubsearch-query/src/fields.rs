//! Static field and sort mappings.
//!
//! Pure lookup tables: shorthand query field names → engine document paths,
//! and sort-by tokens → engine sort fields with their default order.

use thiserror::Error;

/// The canonical publication id field.
pub const FIELD_RECID: &str = "recid";

/// The user-facing alias for [`FIELD_RECID`].
///
/// Queries restricted to this field match publication identity only, so the
/// parser excludes table documents when it is the only range term present.
pub const FIELD_RECID_ALIAS: &str = "publication_recid";

/// Shorthand query field names and the document paths they translate to.
pub const QUERY_FIELDS: &[(&str, &str)] = &[
    ("observables", "data_keywords.observables"),
    ("cmenergies", "data_keywords.cmenergies"),
    ("phrases", "data_keywords.phrases"),
    ("reactions", "data_keywords.reactions"),
    ("analysis", "analyses.type"),
    ("resources", "resources.description"),
    (FIELD_RECID_ALIAS, FIELD_RECID),
];

/// Fields on which `field:[int TO int]` range clauses are recognised.
pub const RANGE_FIELDS: &[&str] = &[FIELD_RECID, FIELD_RECID_ALIAS, "inspire_id"];

/// Translates a shorthand field name to its engine document path.
///
/// Returns `None` for unknown fields; callers pass those through unchanged.
pub fn translate_field(name: &str) -> Option<&'static str> {
    QUERY_FIELDS
        .iter()
        .find(|(short, _)| *short == name)
        .map(|(_, path)| *path)
}

/// Error returned when a sort-by token is not in the supported set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported sort field: {0}")]
pub struct SortError(pub String);

/// A resolved engine sort field with its direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    /// The engine field to sort on.
    pub field: &'static str,
    /// Whether to sort ascending.
    pub ascending: bool,
}

impl SortSpec {
    /// Returns the engine order token for this spec.
    pub fn order(&self) -> &'static str {
        if self.ascending { "asc" } else { "desc" }
    }
}

/// Sort-by tokens, their engine fields, and whether the default order is
/// ascending.
const SORT_FIELDS: &[(&str, &str, bool)] = &[
    ("title", "title.raw", true),
    ("collaborations", "collaborations.raw", true),
    ("date", "creation_date", false),
    ("latest", "last_updated", false),
    ("recid", "recid", false),
    ("inspire_id", "inspire_id", false),
    ("relevance", "_score", false),
    ("", "_score", false),
];

/// Resolves a sort-by token and order token into an engine sort field.
///
/// The empty token and `relevance` both sort by score. The order token `rev`
/// flips the default direction; any other value keeps it.
pub fn sort_field(token: &str, order: &str) -> Result<SortSpec, SortError> {
    let (_, field, ascending) = SORT_FIELDS
        .iter()
        .find(|(name, _, _)| *name == token)
        .ok_or_else(|| SortError(token.to_string()))?;

    let ascending = if order == "rev" { !ascending } else { *ascending };

    Ok(SortSpec { field, ascending })
}
