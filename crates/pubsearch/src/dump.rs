//! JSON submission dumps as a [`SubmissionStore`].
//!
//! Indexing runs from the command line read their submissions from a JSON
//! dump exported from the relational database: an array of version rows,
//! each carrying its publication projection and data tables. Version
//! resolution ("latest finished") happens here, over the loaded rows.

use std::{fs, path::Path};

use serde::Deserialize;

use pubsearch_document::{DataTableRecord, PublicationRecord};
use pubsearch_index::{IdBound, StoreError, SubmissionMembers, SubmissionStore};

/// One version row of the dump file.
#[derive(Debug, Clone, Deserialize)]
pub struct DumpRow {
    /// Internal submission id.
    pub submission_id: u64,
    /// Whether the version finished processing.
    pub finished: bool,
    /// The publication projection at this version.
    pub publication: PublicationRecord,
    /// The version's data tables.
    #[serde(default)]
    pub tables: Vec<DataTableRecord>,
}

/// A [`SubmissionStore`] over a loaded dump file.
#[derive(Debug)]
pub struct DumpStore {
    /// All version rows from the dump.
    rows: Vec<DumpRow>,
}

impl DumpStore {
    /// Loads a dump file.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        let rows = serde_json::from_str(&content)
            .map_err(|e| format!("cannot parse {}: {e}", path.display()))?;
        Ok(Self { rows })
    }

    /// Highest finished version number of one logical publication.
    fn latest_finished_version(&self, recid: u64) -> Option<u32> {
        self.rows
            .iter()
            .filter(|row| row.finished && row.publication.recid == recid)
            .map(|row| row.publication.version)
            .max()
    }

    /// Whether a row is the latest finished version of its publication.
    fn is_latest_finished(&self, row: &DumpRow) -> bool {
        row.finished
            && self.latest_finished_version(row.publication.recid)
                == Some(row.publication.version)
    }
}

impl SubmissionStore for DumpStore {
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
