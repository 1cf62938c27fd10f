//! The relational submission store seam.
//!
//! A logical publication has N version rows; only rows with status
//! "finished" are indexable, and among those the highest version number is
//! "latest". That concept appears in three places (full reindex, cleanup,
//! and the batch pipeline), so it is a named query on the trait rather than
//! self-join logic duplicated at each call site.

use thiserror::Error;

use pubsearch_document::{DataTableRecord, PublicationRecord};

/// Error from the relational submission store.
#[derive(Debug, Clone, Error)]
#[error("submission store error: {0}")]
pub struct StoreError(pub String);

/// Which domain identifier a caller-provided id range refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdBound {
    /// The publication record id.
    Recid,
    /// The external literature-database id.
    InspireId,
}

/// The indexable rows behind one internal submission id: a publication at a
/// finished version plus that version's data tables.
#[derive(Debug, Clone)]
pub struct SubmissionMembers {
    /// The publication projection.
    pub publication: PublicationRecord,
    /// The version's data tables.
    pub tables: Vec<DataTableRecord>,
}

/// Read-only queries against committed relational rows.
///
/// Callers are responsible for committing the relational transaction before
/// triggering indexing; this subsystem takes no locks.
pub trait SubmissionStore {
    /// Internal submission ids of the latest finished version of every
    /// logical publication.
    fn latest_finished_ids(&self) -> Result<Vec<u64>, StoreError>;

    /// Like [`Self::latest_finished_ids`], narrowed to publications whose
    /// domain identifier falls in `[low, high]` inclusive.
    fn latest_finished_ids_in_range(
        &self,
        bound: IdBound,
        low: u64,
        high: u64,
    ) -> Result<Vec<u64>, StoreError>;

    /// Internal submission ids of finished rows that have a strictly newer
    /// finished sibling for the same logical publication.
    fn superseded_ids(&self) -> Result<Vec<u64>, StoreError>;

    /// Resolves internal submission ids to their finished publication and
    /// table projections. Ids of unfinished or unknown submissions are
    /// silently skipped.
    fn finished_members(&self, submission_ids: &[u64])
    -> Result<Vec<SubmissionMembers>, StoreError>;

    /// Table record ids from the given superseded submissions that are
    /// shadowed by a same-identity table at a strictly higher version.
    fn stale_table_ids(&self, superseded_ids: &[u64]) -> Result<Vec<u64>, StoreError>;

    /// Table record ids of a publication's latest finished version, used
    /// when a submission is explicitly unloaded.
    fn table_ids(&self, publication_recid: u64) -> Result<Vec<u64>, StoreError>;
}
