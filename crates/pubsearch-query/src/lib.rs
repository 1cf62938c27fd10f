//! Query shorthand parsing and field mapping for pubsearch.
//!
//! User queries use short field names (`observables:ASYM`) that must be
//! rewritten to the paths used by the search documents
//! (`data_keywords.observables:ASYM`) before the engine sees them. This crate
//! provides:
//!
//! - **Field mapping**: shorthand field names → engine document paths, and
//!   sort-by tokens → engine sort fields
//! - **Query rewriting**: clause-by-clause translation with phrase quoting of
//!   reaction expressions and DOIs
//! - **Range-term detection**: recognising `recid:[0 TO 10000]` style integer
//!   range clauses, which decide whether table documents take part in a search
//!
//! # Example
//!
//! ```
//! use pubsearch_query::parse;
//!
//! let parsed = parse("observables:ASYM");
//! assert_eq!(parsed.query, "data_keywords.observables:ASYM");
//! ```

#![warn(missing_docs)]

mod fields;
mod parser;

pub use fields::{
    FIELD_RECID, FIELD_RECID_ALIAS, QUERY_FIELDS, RANGE_FIELDS, SortError, SortSpec, sort_field,
    translate_field,
};
pub use parser::{ParsedQuery, parse};
