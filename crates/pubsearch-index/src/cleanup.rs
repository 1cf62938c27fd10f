//! Removal of superseded table documents.
//!
//! Table documents are keyed by their own record id, so indexing a new
//! version never overwrites the previous version's tables; they linger and
//! pollute child search results. This job asks the store for finished
//! versions that have a newer finished sibling, resolves their tables that
//! are shadowed at the newer version, and deletes those documents in one
//! bulk request.

use serde::Serialize;
use tracing::info;

use pubsearch_config::Config;

use crate::{backend::SearchBackend, error::IndexError, store::SubmissionStore};

/// Outcome of one cleanup run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupStats {
    /// Superseded submissions examined.
    pub superseded: usize,
    /// Stale table documents deleted.
    pub deleted: usize,
}

/// Deletes table documents shadowed by a newer finished version.
///
/// Resolution runs in store-sized chunks, deletion as one bulk request; the
/// run is idempotent because deleting an already absent id is a no-op.
pub fn cleanup_index<B: SearchBackend, S: SubmissionStore>(
    backend: &B,
    store: &S,
    config: &Config,
) -> Result<CleanupStats, IndexError> {
    let superseded = store.superseded_ids()?;

    let mut stale = Vec::new();
    for chunk in superseded.chunks(config.batch_size.max(1)) {
        stale.extend(store.stale_table_ids(chunk)?);
    }

    if !stale.is_empty() {
        backend
            .delete_by_ids(&config.index, &stale)
            .map_err(|e| IndexError::Backend(e.to_string()))?;
    }

    info!(
        superseded = superseded.len(),
        deleted = stale.len(),
        "cleanup run finished"
    );
    Ok(CleanupStats {
        superseded: superseded.len(),
        deleted: stale.len(),
    })
}
