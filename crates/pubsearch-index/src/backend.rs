//! The search backend seam.
//!
//! The engine is treated as a black-box document store: bulk index, get,
//! delete, query, partial update, and schema operations. The trait keeps the
//! pipeline code independent of transport so tests can run against a
//! recording mock.

use serde_json::Value;
use thiserror::Error;

/// Errors reported by a search backend.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The engine rejected the query syntax; the reason reflects user input.
    #[error("query syntax error: {0}")]
    QuerySyntax(String),

    /// The engine rejected the request for a structural reason (bad mapping,
    /// missing index, malformed payload).
    #[error("backend rejected request: {0}")]
    Rejected(String),

    /// Transport-level failure: connection, timeout, malformed response.
    #[error("backend transport error: {0}")]
    Transport(String),
}

/// One document write in a bulk request.
#[derive(Debug, Clone)]
pub struct BulkOp {
    /// Document id (the relational record id).
    pub id: u64,
    /// Routing key for child documents: the parent publication id.
    pub routing: Option<u64>,
    /// The document body.
    pub document: Value,
}

/// A per-document failure inside an otherwise delivered bulk request.
#[derive(Debug, Clone)]
pub struct BulkItemError {
    /// Id of the document that failed.
    pub id: u64,
    /// The backend's reason.
    pub reason: String,
}

/// Outcome of a bulk write.
///
/// Per-document errors do not abort the batch: writes are idempotent
/// upserts, so re-running the same batch is the remediation.
#[derive(Debug, Clone, Default)]
pub struct BulkReport {
    /// Number of documents written successfully.
    pub indexed: usize,
    /// Documents the backend rejected individually.
    pub errors: Vec<BulkItemError>,
}

impl BulkReport {
    /// True when every document in the batch was accepted.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Operations required of the document store.
pub trait SearchBackend {
    /// Executes a query payload against an index.
    fn search(&self, index: &str, body: &Value) -> Result<Value, BackendError>;

    /// Writes a batch of documents as idempotent upserts keyed by id.
    fn bulk_index(&self, index: &str, ops: &[BulkOp]) -> Result<BulkReport, BackendError>;

    /// Fetches one document's source by id.
    fn get(&self, index: &str, id: u64) -> Result<Option<Value>, BackendError>;

    /// Deletes documents by id list.
    fn delete_by_ids(&self, index: &str, ids: &[u64]) -> Result<(), BackendError>;

    /// Applies a partial update to one document.
    ///
    /// `retry_on_conflict` bounds the backend's optimistic-concurrency
    /// retries before the update fails.
    fn update(
        &self,
        index: &str,
        id: u64,
        routing: Option<u64>,
        patch: &Value,
        retry_on_conflict: u32,
    ) -> Result<(), BackendError>;

    /// Creates an index with the given settings and mappings.
    fn create_index(&self, index: &str, schema: &Value) -> Result<(), BackendError>;

    /// Deletes an index; missing indexes are not an error.
    fn delete_index(&self, index: &str) -> Result<(), BackendError>;

    /// Updates an existing index's mappings in place.
    ///
    /// Fails with [`BackendError::Rejected`] when the update is structurally
    /// incompatible with existing data (e.g. changing a field's type).
    fn update_mapping(&self, index: &str, mappings: &Value) -> Result<(), BackendError>;
}
