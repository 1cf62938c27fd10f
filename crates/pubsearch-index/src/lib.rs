//! Search backend client, query building, and index synchronization.
//!
//! This crate holds everything that talks to the two external collaborators:
//!
//! - [`backend`]: the [`SearchBackend`] seam over the document store (bulk
//!   index, get, delete, search, partial update, schema operations), with an
//!   HTTP implementation speaking the engine's JSON DSL
//! - [`store`]: the [`SubmissionStore`] seam over the relational submission
//!   database, including the named "latest finished version" query
//! - [`builder`]: translation of parsed queries, filters, sorting, and facet
//!   aggregations into the engine-native payload
//! - [`search`]: the two-query parent/child search executor and result merger
//! - [`reindex`]: the batch (re)indexing pipeline
//! - [`keywords`]: the keyword push-down job
//! - [`cleanup`]: removal of superseded child documents
//!
//! No component holds hidden global state: each takes a client handle and
//! configuration at construction time.

#![warn(missing_docs)]

mod backend;
mod builder;
mod cleanup;
mod error;
mod http;
mod keywords;
mod mapping;
mod reindex;
mod search;
mod store;
#[cfg(test)]
mod test_support;

pub use backend::{BackendError, BulkItemError, BulkOp, BulkReport, SearchBackend};
pub use builder::{Filter, QueryBuilder};
pub use cleanup::{CleanupStats, cleanup_index};
pub use error::{IndexError, SearchError};
pub use http::HttpBackend;
pub use keywords::{PushDownStats, push_data_keywords};
pub use mapping::{index_schema, mappings};
pub use reindex::{
    BatchStats, InlineDispatcher, ReindexOptions, ReindexStats, Reindexer, TaskDispatcher,
};
pub use search::{Facet, FacetBucket, PublicationHit, SearchArgs, SearchResults, Searcher};
pub use store::{IdBound, StoreError, SubmissionMembers, SubmissionStore};
