//! Search document shaping for pubsearch.
//!
//! This crate turns raw relational projections of publications and their
//! data tables into the denormalized documents written to the search index:
//!
//! - [`record`]: the relational projections consumed from the submission store
//! - [`document`]: the parent/child search documents and their join metadata
//! - [`keywords`]: keyword aggregation and the cmenergies range normalizer
//! - [`enhance`]: the two enhancement entry points, one per document role
//!
//! Enhancement is a pure transform: the same projection always yields the
//! same document. The only exception is the `last_updated` fallback, which
//! uses the current time when a record carries neither participant action
//! dates nor a creation date.

#![warn(missing_docs)]

mod document;
mod enhance;
mod keywords;
mod record;

pub use document::{
    AccessUrls, Analysis, CHILD_ROLE, DataTableDocument, JoinRole, PARENT_ROLE,
    PublicationDocument,
};
pub use enhance::{EnhanceSettings, SUMMARY_AUTHOR_LIMIT, enhance_datatable, enhance_publication};
pub use keywords::{CmEnergyRange, DataKeywords, aggregate_keywords, parse_cmenergies};
pub use record::{Author, DataTableRecord, Keyword, PublicationRecord, Resource};
