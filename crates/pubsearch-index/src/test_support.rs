//! Shared test doubles: an in-memory submission store and a recording
//! backend mock with scripted responses.

use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
};

use serde_json::{Value, json};

use pubsearch_document::{DataTableRecord, PublicationRecord};

use crate::{
    backend::{BackendError, BulkOp, BulkReport, SearchBackend},
    store::{IdBound, StoreError, SubmissionMembers, SubmissionStore},
};

/// One recorded partial-update call.
#[derive(Debug, Clone)]
pub struct UpdateCall {
    /// Target document id.
    pub id: u64,
    /// Routing key, if any.
    pub routing: Option<u64>,
    /// The patch body.
    pub patch: Value,
    /// The conflict-retry bound passed through.
    pub retry_on_conflict: u32,
}

/// A recording [`SearchBackend`] with scripted search responses.
///
/// Searches pop from a response queue; an empty queue yields an empty hit
/// set. Every call is recorded for assertion.
#[derive(Debug, Default)]
pub struct MockBackend {
    /// Scripted search outcomes, consumed front to back.
    search_queue: RefCell<VecDeque<Result<Value, BackendError>>>,
    /// Recorded search bodies.
    search_log: RefCell<Vec<Value>>,
    /// Recorded bulk batches.
    bulk_log: RefCell<Vec<Vec<BulkOp>>>,
    /// Scripted bulk reports, consumed front to back.
    bulk_reports: RefCell<VecDeque<BulkReport>>,
    /// Recorded partial updates.
    update_log: RefCell<Vec<UpdateCall>>,
    /// Scripted update failures, consumed front to back.
    update_errors: RefCell<VecDeque<BackendError>>,
    /// Recorded id deletions.
    delete_log: RefCell<Vec<Vec<u64>>>,
    /// Recorded index creations.
    created_log: RefCell<Vec<String>>,
    /// Recorded index deletions.
    dropped_log: RefCell<Vec<String>>,
    /// Recorded mapping-update bodies.
    mapping_log: RefCell<Vec<Value>>,
    /// Scripted mapping-update failure.
    mapping_error: RefCell<Option<BackendError>>,
    /// Documents served by `get`.
    documents: RefCell<HashMap<u64, Value>>,
}

impl MockBackend {
    /// Queues a successful search response.
    pub fn push_response(&self, response: Value) {
        self.search_queue.borrow_mut().push_back(Ok(response));
    }

    /// Queues a failing search.
    pub fn push_error(&self, error: BackendError) {
        self.search_queue.borrow_mut().push_back(Err(error));
    }

    /// Queues a bulk report; without one, bulks report all ops indexed.
    pub fn push_bulk_report(&self, report: BulkReport) {
        self.bulk_reports.borrow_mut().push_back(report);
    }

    /// Queues a failure for the next partial update.
    pub fn push_update_error(&self, error: BackendError) {
        self.update_errors.borrow_mut().push_back(error);
    }

    /// Makes the next mapping update fail.
    pub fn set_mapping_error(&self, error: BackendError) {
        *self.mapping_error.borrow_mut() = Some(error);
    }

    /// Seeds a document served by `get`.
    pub fn insert_document(&self, id: u64, source: Value) {
        self.documents.borrow_mut().insert(id, source);
    }

    /// Bodies of every search issued so far.
    pub fn search_bodies(&self) -> Vec<Value> {
        self.search_log.borrow().clone()
    }

    /// Every bulk batch issued so far.
    pub fn bulk_batches(&self) -> Vec<Vec<BulkOp>> {
        self.bulk_log.borrow().clone()
    }

    /// Every partial update issued so far.
    pub fn updates(&self) -> Vec<UpdateCall> {
        self.update_log.borrow().clone()
    }

    /// Every id-deletion batch issued so far.
    pub fn deletions(&self) -> Vec<Vec<u64>> {
        self.delete_log.borrow().clone()
    }

    /// Names of indexes created so far.
    pub fn created_indexes(&self) -> Vec<String> {
        self.created_log.borrow().clone()
    }

    /// Names of indexes deleted so far.
    pub fn dropped_indexes(&self) -> Vec<String> {
        self.dropped_log.borrow().clone()
    }

    /// Bodies of mapping updates issued so far.
    pub fn mapping_bodies(&self) -> Vec<Value> {
        self.mapping_log.borrow().clone()
    }
}

impl SearchBackend for MockBackend {
    fn search(&self, _index: &str, body: &Value) -> Result<Value, BackendError> {
        self.search_log.borrow_mut().push(body.clone());
        self.search_queue
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({"hits": {"total": {"value": 0}, "hits": []}})))
    }

    fn bulk_index(&self, _index: &str, ops: &[BulkOp]) -> Result<BulkReport, BackendError> {
        self.bulk_log.borrow_mut().push(ops.to_vec());
        Ok(self
            .bulk_reports
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| BulkReport {
                indexed: ops.len(),
                errors: Vec::new(),
            }))
    }

    fn get(&self, _index: &str, id: u64) -> Result<Option<Value>, BackendError> {
        Ok(self.documents.borrow().get(&id).cloned())
    }

    fn delete_by_ids(&self, _index: &str, ids: &[u64]) -> Result<(), BackendError> {
        self.delete_log.borrow_mut().push(ids.to_vec());
        Ok(())
    }

    fn update(
        &self,
        _index: &str,
        id: u64,
        routing: Option<u64>,
        patch: &Value,
        retry_on_conflict: u32,
    ) -> Result<(), BackendError> {
        self.update_log.borrow_mut().push(UpdateCall {
            id,
            routing,
            patch: patch.clone(),
            retry_on_conflict,
        });
        match self.update_errors.borrow_mut().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn create_index(&self, index: &str, _schema: &Value) -> Result<(), BackendError> {
        self.created_log.borrow_mut().push(index.to_string());
        Ok(())
    }

    fn delete_index(&self, index: &str) -> Result<(), BackendError> {
        self.dropped_log.borrow_mut().push(index.to_string());
        Ok(())
    }

    fn update_mapping(&self, _index: &str, mappings: &Value) -> Result<(), BackendError> {
        self.mapping_log.borrow_mut().push(mappings.clone());
        match self.mapping_error.borrow_mut().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// One submission version row, as the relational database would hold it.
#[derive(Debug, Clone)]
pub struct SubmissionRow {
    /// Internal submission id.
    pub submission_id: u64,
    /// Whether the version finished processing.
    pub finished: bool,
    /// The publication projection at this version.
    pub publication: PublicationRecord,
    /// The version's data tables.
    pub tables: Vec<DataTableRecord>,
}

/// In-memory [`SubmissionStore`] over a list of version rows.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// All version rows, across publications and versions.
    pub rows: Vec<SubmissionRow>,
}

impl MemoryStore {
    /// Highest finished version number of one logical publication.
    fn latest_finished_version(&self, recid: u64) -> Option<u32> {
        self.rows
            .iter()
            .filter(|row| row.finished && row.publication.recid == recid)
            .map(|row| row.publication.version)
            .max()
    }

    /// Whether a row is the latest finished version of its publication.
    fn is_latest_finished(&self, row: &SubmissionRow) -> bool {
        row.finished
            && self.latest_finished_version(row.publication.recid)
                == Some(row.publication.version)
    }
}

impl SubmissionStore for MemoryStore {
    fn latest_finished_ids(&self) -> Result<Vec<u64>, StoreError> {
        Ok(self
            .rows
            .iter()
            .filter(|row| self.is_latest_finished(row))
            .map(|row| row.submission_id)
            .collect())
    }

    fn latest_finished_ids_in_range(
        &self,
        bound: IdBound,
        low: u64,
        high: u64,
    ) -> Result<Vec<u64>, StoreError> {
        Ok(self
            .rows
            .iter()
            .filter(|row| self.is_latest_finished(row))
            .filter(|row| {
                let id = match bound {
                    IdBound::Recid => Some(row.publication.recid),
                    IdBound::InspireId => row
                        .publication
                        .inspire_id
                        .as_deref()
                        .and_then(|id| id.parse().ok()),
                };
                id.is_some_and(|id| (low..=high).contains(&id))
            })
            .map(|row| row.submission_id)
            .collect())
    }

    fn superseded_ids(&self) -> Result<Vec<u64>, StoreError> {
        Ok(self
            .rows
            .iter()
            .filter(|row| {
                row.finished
                    && self.latest_finished_version(row.publication.recid)
                        > Some(row.publication.version)
            })
            .map(|row| row.submission_id)
            .collect())
    }

    fn finished_members(
        &self,
        submission_ids: &[u64],
    ) -> Result<Vec<SubmissionMembers>, StoreError> {
        Ok(self
            .rows
            .iter()
            .filter(|row| row.finished && submission_ids.contains(&row.submission_id))
            .map(|row| SubmissionMembers {
                publication: row.publication.clone(),
                tables: row.tables.clone(),
            })
            .collect())
    }

    fn stale_table_ids(&self, superseded_ids: &[u64]) -> Result<Vec<u64>, StoreError> {
        let mut stale = Vec::new();
        for row in self
            .rows
            .iter()
            .filter(|row| superseded_ids.contains(&row.submission_id))
        {
            let latest = self.latest_finished_version(row.publication.recid);
            for table in &row.tables {
                let shadowed = self.rows.iter().any(|other| {
                    other.finished
                        && other.publication.recid == row.publication.recid
                        && Some(other.publication.version) == latest
                        && other.publication.version > row.publication.version
                        && other
                            .tables
                            .iter()
                            .any(|t| t.associated_recid == table.associated_recid)
                });
                if shadowed {
                    stale.push(table.recid);
                }
            }
        }
        Ok(stale)
    }

    fn table_ids(&self, publication_recid: u64) -> Result<Vec<u64>, StoreError> {
        let latest = self.latest_finished_version(publication_recid);
        Ok(self
            .rows
            .iter()
            .filter(|row| {
                row.finished
                    && row.publication.recid == publication_recid
                    && Some(row.publication.version) == latest
            })
            .flat_map(|row| row.tables.iter().map(|table| table.recid))
            .collect())
    }
}

/// A minimal finished publication record for pipeline tests.
///
/// Carries a fixed creation date so enhancement never falls back to the
/// clock and repeated runs produce identical documents.
pub fn publication_record(recid: u64, version: u32) -> PublicationRecord {
    PublicationRecord {
        recid,
        inspire_id: Some(format!("{}", 1_000_000 + recid)),
        version,
        title: format!("Publication {recid}"),
        abstract_text: String::new(),
        doi: None,
        authors: Vec::new(),
        collaborations: Vec::new(),
        subject_area: Vec::new(),
        creation_date: chrono::NaiveDate::from_ymd_opt(2020, 1, 1),
        participant_dates: Vec::new(),
        resources: Vec::new(),
    }
}

/// A minimal data-table record for pipeline tests.
///
/// `associated_recid` is the identity shared by the same table across
/// versions.
pub fn table_record(
    recid: u64,
    publication_recid: u64,
    associated_recid: u64,
    version: u32,
    title: &str,
) -> DataTableRecord {
    DataTableRecord {
        recid,
        publication_recid,
        associated_recid,
        version,
        title: title.to_string(),
        description: String::new(),
        doi: None,
        keywords: Vec::new(),
    }
}
