//! The batch (re)indexing pipeline.
//!
//! A full run walks the latest finished version of every logical publication
//! (optionally narrowed to an id range), splits the submission ids into
//! batches, and hands each batch to a dispatcher. The inline dispatcher runs
//! batches in the calling thread; a deployment with a task queue provides
//! its own [`TaskDispatcher`] that enqueues the ids instead.
//!
//! A batch is self-contained: it reads its submissions from the store,
//! enhances them into documents, bulk-writes parents and routed children,
//! then runs the keyword push-down for the touched publications. Per-document
//! write failures are logged and counted, never fatal; re-running the batch
//! is the remediation since every write is an idempotent upsert.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use pubsearch_config::Config;
use pubsearch_document::{EnhanceSettings, enhance_datatable, enhance_publication};

use crate::{
    backend::{BackendError, BulkOp, SearchBackend},
    error::IndexError,
    keywords::{PushDownStats, push_data_keywords},
    mapping::{index_schema, mappings},
    store::{IdBound, SubmissionStore},
};

/// Options for a full reindexing run.
#[derive(Debug, Clone, Default)]
pub struct ReindexOptions {
    /// Drop and recreate the index with the current schema before indexing.
    pub recreate: bool,
    /// Apply the current mappings in place before indexing.
    ///
    /// Ignored when `recreate` is set; a fresh index already carries them.
    pub update_mapping: bool,
    /// Restrict the run to publications whose identifier falls in the given
    /// inclusive range. Bounds are swapped if given in reverse.
    pub id_range: Option<(IdBound, u64, u64)>,
}

/// Outcome of one batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchStats {
    /// Documents written successfully.
    pub indexed: usize,
    /// Documents the backend rejected individually.
    pub failed: usize,
    /// Keyword push-down outcome for the batch's publications.
    pub keywords: PushDownStats,
}

/// Accumulated outcome of a full run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReindexStats {
    /// Submissions selected for indexing.
    pub submissions: usize,
    /// Batches dispatched.
    pub batches: usize,
    /// Documents written successfully.
    pub indexed: usize,
    /// Documents the backend rejected individually.
    pub failed: usize,
    /// Aggregated keyword push-down outcome.
    pub keywords: PushDownStats,
}

impl ReindexStats {
    /// Folds one batch outcome into the run totals.
    fn absorb(&mut self, batch: BatchStats) {
        self.batches += 1;
        self.indexed += batch.indexed;
        self.failed += batch.failed;
        self.keywords.updated += batch.keywords.updated;
        self.keywords.failed += batch.keywords.failed;
    }
}

/// Executes one batch of submission ids.
///
/// The seam between id selection and batch execution, so a task-queue
/// deployment can enqueue batches instead of running them inline.
pub trait TaskDispatcher {
    /// Runs or enqueues one batch, returning its outcome.
    fn submit(&self, submission_ids: Vec<u64>) -> Result<BatchStats, IndexError>;
}

/// A [`TaskDispatcher`] that runs each batch in the calling thread.
pub struct InlineDispatcher<'a, B: SearchBackend, S: SubmissionStore> {
    /// The pipeline executing the batches.
    reindexer: &'a Reindexer<'a, B, S>,
}

impl<'a, B: SearchBackend, S: SubmissionStore> InlineDispatcher<'a, B, S> {
    /// Wraps a reindexer for inline execution.
    pub fn new(reindexer: &'a Reindexer<'a, B, S>) -> Self {
        Self { reindexer }
    }
}

impl<B: SearchBackend, S: SubmissionStore> TaskDispatcher for InlineDispatcher<'_, B, S> {
    fn submit(&self, submission_ids: Vec<u64>) -> Result<BatchStats, IndexError> {
        self.reindexer.reindex_batch(&submission_ids)
    }
}

/// The batch (re)indexing pipeline over one backend, store, and index.
pub struct Reindexer<'a, B: SearchBackend, S: SubmissionStore> {
    /// The document store handle.
    backend: &'a B,
    /// The relational submission store.
    store: &'a S,
    /// Application configuration.
    config: &'a Config,
}

impl<'a, B: SearchBackend, S: SubmissionStore> Reindexer<'a, B, S> {
    /// Creates a pipeline; all dependencies are explicit.
    pub fn new(backend: &'a B, store: &'a S, config: &'a Config) -> Self {
        Self {
            backend,
            store,
            config,
        }
    }

    /// Runs a full reindex, dispatching one batch per `batch_size` ids.
    pub fn reindex_all(
        &self,
        options: &ReindexOptions,
        dispatcher: &dyn TaskDispatcher,
    ) -> Result<ReindexStats, IndexError> {
        self.prepare_index(options)?;

        let ids = match options.id_range {
            Some((bound, low, high)) => {
                let (low, high) = if low <= high { (low, high) } else { (high, low) };
                self.store.latest_finished_ids_in_range(bound, low, high)?
            }
            None => self.store.latest_finished_ids()?,
        };

        let mut stats = ReindexStats {
            submissions: ids.len(),
            ..ReindexStats::default()
        };
        info!(submissions = ids.len(), "starting reindex run");

        for chunk in ids.chunks(self.config.batch_size.max(1)) {
            stats.absorb(dispatcher.submit(chunk.to_vec())?);
        }

        info!(
            indexed = stats.indexed,
            failed = stats.failed,
            batches = stats.batches,
            "reindex run finished"
        );
        Ok(stats)
    }

    /// Indexes one batch of submissions and pushes keywords down onto their
    /// publications.
    pub fn reindex_batch(&self, submission_ids: &[u64]) -> Result<BatchStats, IndexError> {
        let members = self.store.finished_members(submission_ids)?;
        let settings = self.enhance_settings();

        let mut ops = Vec::new();
        let mut publication_ids = Vec::with_capacity(members.len());
        for member in &members {
            publication_ids.push(member.publication.recid);
            ops.push(BulkOp {
                id: member.publication.recid,
                routing: None,
                document: to_document(&enhance_publication(&member.publication, &settings))?,
            });
            for table in &member.tables {
                ops.push(BulkOp {
                    id: table.recid,
                    routing: Some(member.publication.recid),
                    document: to_document(&enhance_datatable(table, &settings))?,
                });
            }
        }

        let report = self
            .backend
            .bulk_index(&self.config.index, &ops)
            .map_err(backend_error)?;
        for item in &report.errors {
            warn!(id = item.id, reason = %item.reason, "document rejected by the backend");
        }
        debug!(
            indexed = report.indexed,
            failed = report.errors.len(),
            "batch written"
        );

        let keywords = push_data_keywords(self.backend, self.config, &publication_ids);
        Ok(BatchStats {
            indexed: report.indexed,
            failed: report.errors.len(),
            keywords,
        })
    }

    /// Removes one publication and its latest tables from the index.
    pub fn unload_submission(&self, publication_recid: u64) -> Result<(), IndexError> {
        let mut ids = self.store.table_ids(publication_recid)?;
        ids.push(publication_recid);
        self.backend
            .delete_by_ids(&self.config.index, &ids)
            .map_err(backend_error)?;
        info!(recid = publication_recid, documents = ids.len(), "submission unloaded");
        Ok(())
    }

    /// Applies the requested schema preparation before a run.
    fn prepare_index(&self, options: &ReindexOptions) -> Result<(), IndexError> {
        if options.recreate {
            self.backend
                .delete_index(&self.config.index)
                .map_err(backend_error)?;
            self.backend
                .create_index(&self.config.index, &index_schema())
                .map_err(backend_error)?;
            info!(index = %self.config.index, "index recreated");
        } else if options.update_mapping {
            self.backend
                .update_mapping(&self.config.index, &mappings())
                .map_err(|error| match error {
                    BackendError::Rejected(reason) => IndexError::MappingUpdate { reason },
                    other => backend_error(other),
                })?;
        }
        Ok(())
    }

    /// The enhancement settings slice of the configuration.
    fn enhance_settings(&self) -> EnhanceSettings {
        EnhanceSettings {
            site_url: self.config.site_url.clone(),
            data_keywords: self.config.data_keywords.clone(),
            analysis_types: self.config.analysis_types.clone(),
            histfactory_type: self.config.histfactory_type.clone(),
        }
    }
}

/// Serializes an enhanced document for the bulk payload.
fn to_document<T: serde::Serialize>(document: &T) -> Result<Value, IndexError> {
    serde_json::to_value(document).map_err(|e| IndexError::Backend(e.to_string()))
}

/// Collapses a backend failure into the pipeline error type.
fn backend_error(error: BackendError) -> IndexError {
    IndexError::Backend(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::{BulkItemError, BulkReport},
        test_support::{MemoryStore, MockBackend, SubmissionRow, publication_record, table_record},
    };

    fn store() -> MemoryStore {
        MemoryStore {
            rows: vec![
                SubmissionRow {
                    submission_id: 10,
                    finished: true,
                    publication: publication_record(1, 1),
                    tables: vec![table_record(100, 1, 50, 1, "Table 1")],
                },
                SubmissionRow {
                    submission_id: 11,
                    finished: true,
                    publication: publication_record(1, 2),
                    tables: vec![table_record(101, 1, 50, 2, "Table 1")],
                },
                SubmissionRow {
                    submission_id: 20,
                    finished: true,
                    publication: publication_record(15, 1),
                    tables: vec![table_record(150, 15, 60, 1, "Table 1")],
                },
                SubmissionRow {
                    submission_id: 30,
                    finished: false,
                    publication: publication_record(99, 1),
                    tables: vec![],
                },
            ],
        }
    }

    fn indexed_recids(backend: &MockBackend) -> Vec<u64> {
        backend
            .bulk_batches()
            .iter()
            .flatten()
            .map(|op| op.id)
            .collect()
    }

    #[test]
    fn full_run_indexes_only_latest_finished_versions() {
        let backend = MockBackend::default();
        let store = store();
        let config = Config::default();
        let reindexer = Reindexer::new(&backend, &store, &config);

        let stats = reindexer
            .reindex_all(&ReindexOptions::default(), &InlineDispatcher::new(&reindexer))
            .unwrap();

        assert_eq!(stats.submissions, 2);
        let ids = indexed_recids(&backend);
        assert!(ids.contains(&1) && ids.contains(&101));
        assert!(ids.contains(&15) && ids.contains(&150));
        assert!(!ids.contains(&100), "superseded table was indexed");
        assert!(!ids.contains(&99), "unfinished submission was indexed");
    }

    #[test]
    fn tables_are_routed_to_their_publication() {
        let backend = MockBackend::default();
        let store = store();
        let config = Config::default();
        let reindexer = Reindexer::new(&backend, &store, &config);

        reindexer.reindex_batch(&[11]).unwrap();

        let batch = &backend.bulk_batches()[0];
        assert_eq!(batch[0].id, 1);
        assert_eq!(batch[0].routing, None);
        assert_eq!(batch[1].id, 101);
        assert_eq!(batch[1].routing, Some(1));
        assert_eq!(batch[1].document["parent_child"]["parent"], "1");
    }

    #[test]
    fn run_is_split_into_batches() {
        let backend = MockBackend::default();
        let store = store();
        let config = Config {
            batch_size: 1,
            ..Config::default()
        };
        let reindexer = Reindexer::new(&backend, &store, &config);

        let stats = reindexer
            .reindex_all(&ReindexOptions::default(), &InlineDispatcher::new(&reindexer))
            .unwrap();

        assert_eq!(stats.batches, 2);
        assert_eq!(backend.bulk_batches().len(), 2);
    }

    #[test]
    fn recreate_drops_and_recreates_the_index() {
        let backend = MockBackend::default();
        let store = store();
        let config = Config::default();
        let reindexer = Reindexer::new(&backend, &store, &config);

        reindexer
            .reindex_all(
                &ReindexOptions {
                    recreate: true,
                    ..ReindexOptions::default()
                },
                &InlineDispatcher::new(&reindexer),
            )
            .unwrap();

        assert_eq!(backend.dropped_indexes(), vec!["publications"]);
        assert_eq!(backend.created_indexes(), vec!["publications"]);
    }

    #[test]
    fn mapping_update_runs_in_place_without_recreating() {
        let backend = MockBackend::default();
        let store = store();
        let config = Config::default();
        let reindexer = Reindexer::new(&backend, &store, &config);

        reindexer
            .reindex_all(
                &ReindexOptions {
                    update_mapping: true,
                    ..ReindexOptions::default()
                },
                &InlineDispatcher::new(&reindexer),
            )
            .unwrap();

        assert!(backend.dropped_indexes().is_empty());
        let bodies = backend.mapping_bodies();
        assert_eq!(bodies[0]["properties"]["recid"]["type"], "long");
    }

    #[test]
    fn incompatible_mapping_update_surfaces_the_reason() {
        let backend = MockBackend::default();
        backend.set_mapping_error(BackendError::Rejected(
            "mapper [recid] cannot be changed from type [long] to [text]".to_string(),
        ));
        let store = store();
        let config = Config::default();
        let reindexer = Reindexer::new(&backend, &store, &config);

        let err = reindexer
            .reindex_all(
                &ReindexOptions {
                    update_mapping: true,
                    ..ReindexOptions::default()
                },
                &InlineDispatcher::new(&reindexer),
            )
            .unwrap_err();

        assert!(matches!(
            err,
            IndexError::MappingUpdate { ref reason } if reason.contains("cannot be changed")
        ));
        assert!(err.to_string().contains("recreate the index"));
    }

    #[test]
    fn id_range_bounds_are_swapped_when_reversed() {
        let backend = MockBackend::default();
        let store = store();
        let config = Config::default();
        let reindexer = Reindexer::new(&backend, &store, &config);

        let stats = reindexer
            .reindex_all(
                &ReindexOptions {
                    id_range: Some((IdBound::Recid, 20, 10)),
                    ..ReindexOptions::default()
                },
                &InlineDispatcher::new(&reindexer),
            )
            .unwrap();

        assert_eq!(stats.submissions, 1);
        assert!(indexed_recids(&backend).contains(&15));
    }

    #[test]
    fn rerunning_a_batch_writes_identical_documents() {
        let backend = MockBackend::default();
        let store = store();
        let config = Config::default();
        let reindexer = Reindexer::new(&backend, &store, &config);

        reindexer.reindex_batch(&[11, 20]).unwrap();
        reindexer.reindex_batch(&[11, 20]).unwrap();

        let batches = backend.bulk_batches();
        assert_eq!(batches.len(), 2);
        for (first, second) in batches[0].iter().zip(&batches[1]) {
            assert_eq!(first.id, second.id);
            assert_eq!(
                serde_json::to_string(&first.document).unwrap(),
                serde_json::to_string(&second.document).unwrap()
            );
        }
    }

    #[test]
    fn per_document_errors_do_not_abort_the_batch() {
        let backend = MockBackend::default();
        backend.push_bulk_report(BulkReport {
            indexed: 1,
            errors: vec![BulkItemError {
                id: 101,
                reason: "mapper parsing".to_string(),
            }],
        });
        let store = store();
        let config = Config::default();
        let reindexer = Reindexer::new(&backend, &store, &config);

        let stats = reindexer.reindex_batch(&[11]).unwrap();

        assert_eq!(stats.indexed, 1);
        assert_eq!(stats.failed, 1);
        // push-down still ran for the batch's publication
        assert_eq!(backend.updates().len(), 1);
        assert_eq!(backend.updates()[0].id, 1);
    }

    #[test]
    fn unload_removes_tables_and_publication() {
        let backend = MockBackend::default();
        let store = store();
        let config = Config::default();
        let reindexer = Reindexer::new(&backend, &store, &config);

        reindexer.unload_submission(1).unwrap();

        assert_eq!(backend.deletions(), vec![vec![101, 1]]);
    }
}
