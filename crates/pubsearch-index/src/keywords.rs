//! The keyword push-down job.
//!
//! Publications are searchable by their tables' keywords without a join at
//! query time: after a publication's tables are (re)indexed, this job merges
//! every child's `data_keywords` and writes the union onto the parent with a
//! partial update. The merge normalizes ordering, so re-running the job over
//! unchanged tables produces a byte-identical parent document.

use serde::Serialize;
use serde_json::{Value, json};
use tracing::warn;

use pubsearch_config::Config;
use pubsearch_document::{CHILD_ROLE, DataKeywords};

use crate::backend::{BackendError, SearchBackend};

/// Upper bound on child documents fetched per publication.
const TABLE_FETCH_LIMIT: usize = 10_000;

/// Outcome of one push-down run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PushDownStats {
    /// Publications whose parent document was updated.
    pub updated: usize,
    /// Publications skipped after a backend failure.
    pub failed: usize,
}

/// Merges child keywords onto each given parent document.
///
/// Failures are logged per publication and the job moves on; a single bad
/// document must not abort a reindexing batch. The partial update is bounded
/// by the configured conflict-retry count, since table indexing and
/// push-down for neighbouring publications may touch the same shard
/// concurrently.
pub fn push_data_keywords<B: SearchBackend>(
    backend: &B,
    config: &Config,
    publication_ids: &[u64],
) -> PushDownStats {
    let mut stats = PushDownStats::default();

    for &recid in publication_ids {
        match push_one(backend, config, recid) {
            Ok(()) => stats.updated += 1,
            Err(reason) => {
                warn!(recid, %reason, "keyword push-down failed, skipping publication");
                stats.failed += 1;
            }
        }
    }
    stats
}

/// Pushes the merged keywords of one publication's tables onto its parent.
fn push_one<B: SearchBackend>(
    backend: &B,
    config: &Config,
    recid: u64,
) -> Result<(), BackendError> {
    let response = backend.search(&config.index, &children_query(recid))?;
    let merged = merge_child_keywords(&response);

    backend.update(
        &config.index,
        recid,
        None,
        &json!({"data_keywords": merged}),
        config.update_retries,
    )
}

/// Query body selecting every child table of one publication.
fn children_query(recid: u64) -> Value {
    json!({
        "size": TABLE_FETCH_LIMIT,
        "_source": ["data_keywords"],
        "query": {
            "bool": {
                "filter": [
                    {"term": {"publication_recid": recid}},
                    {"term": {"parent_child": CHILD_ROLE}}
                ]
            }
        }
    })
}

/// Merges the `data_keywords` of every child hit into one normalized set.
fn merge_child_keywords(response: &Value) -> DataKeywords {
    let mut merged = DataKeywords::default();
    if let Some(hits) = response["hits"]["hits"].as_array() {
        for hit in hits {
            let keywords = hit["_source"]["data_keywords"].clone();
            if keywords.is_null() {
                continue;
            }
            match serde_json::from_value::<DataKeywords>(keywords) {
                Ok(child) => merged.merge(&child),
                Err(error) => {
                    warn!(%error, "skipping malformed child data_keywords");
                }
            }
        }
    }
    merged.normalize();
    merged
}
