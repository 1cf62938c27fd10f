//! Error types for the pubsearch-index crate.

use thiserror::Error;

use crate::store::StoreError;
use pubsearch_query::SortError;

/// Errors surfaced to search callers.
///
/// Query syntax errors carry the engine's reason verbatim: it reflects the
/// user's own input, not backend internals. Everything transport-shaped
/// collapses into the generic [`SearchError::Backend`] variant; full details
/// are logged server-side instead.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The engine rejected the query syntax. Safe to show to users.
    #[error("{0}")]
    QuerySyntax(String),

    /// A filter name outside the supported set.
    #[error("unknown filter: {0}")]
    UnknownFilter(String),

    /// An unsupported sort-by token.
    #[error(transparent)]
    Sort(#[from] SortError),

    /// Any other backend or transport failure.
    #[error("an unexpected error occurred while searching")]
    Backend,
}

/// Errors from the indexing, push-down, and cleanup pipelines.
///
/// Unlike [`SearchError`], these are operator-facing and carry full detail.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The relational submission store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A mapping update was structurally incompatible with existing data.
    #[error("mapping update rejected: {reason} (recreate the index to change existing fields)")]
    MappingUpdate {
        /// The backend's rejection reason, verbatim.
        reason: String,
    },

    /// The search backend failed.
    #[error("backend error: {0}")]
    Backend(String),
}
