//! Search execution and result merging.
//!
//! One user search issues two engine queries: a publication query over
//! parent-role documents, then a child query restricted to the returned
//! publication ids. The merger groups child hits by parent and attaches
//! them, so callers see one ranked list of publications each carrying its
//! matching tables.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::error;

use pubsearch_config::Config;
use pubsearch_document::PARENT_ROLE;
use pubsearch_query::parse;

use crate::{
    backend::{BackendError, SearchBackend},
    builder::{Filter, QueryBuilder},
    error::SearchError,
};

/// Parameters of one search call.
#[derive(Debug, Clone)]
pub struct SearchArgs {
    /// Raw user query, possibly empty.
    pub query: String,
    /// `(name, value)` filter pairs.
    pub filters: Vec<(String, String)>,
    /// Page size.
    pub size: usize,
    /// Result offset.
    pub offset: usize,
    /// Sort-by token; empty means relevance (or date for empty queries).
    pub sort_by: String,
    /// Sort-order token; `rev` flips the default direction.
    pub sort_order: String,
    /// Optional post-filter applied after aggregations are computed.
    pub post_filter: Option<(String, String)>,
}

impl Default for SearchArgs {
    fn default() -> Self {
        Self {
            query: String::new(),
            filters: Vec::new(),
            size: 10,
            offset: 0,
            sort_by: String::new(),
            sort_order: String::new(),
            post_filter: None,
        }
    }
}

/// One merged publication hit with its matching tables attached.
#[derive(Debug, Clone, Serialize)]
pub struct PublicationHit {
    /// Publication record id.
    pub recid: u64,
    /// The publication document source.
    pub publication: Value,
    /// Matching child table documents; empty when none matched.
    pub data: Vec<Value>,
}

/// One bucket of a facet aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetBucket {
    /// The facet value.
    pub value: String,
    /// Number of matching documents.
    pub count: u64,
}

/// A named facet with its buckets.
#[derive(Debug, Clone, Serialize)]
pub struct Facet {
    /// Facet name, as requested in the aggregations.
    pub name: String,
    /// The buckets, in engine order.
    pub buckets: Vec<FacetBucket>,
}

/// The merged response of one search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    /// Publication hits in rank order.
    pub results: Vec<PublicationHit>,
    /// Total matching publications (not counting child hits).
    pub total: u64,
    /// Facet buckets for the filter UI.
    pub facets: Vec<Facet>,
}

/// Stateless search executor over one backend and index.
pub struct Searcher<'a, B: SearchBackend> {
    /// The document store handle.
    backend: &'a B,
    /// Application configuration.
    config: &'a Config,
    /// Payload builder for the configured keyword set.
    builder: QueryBuilder,
}

impl<'a, B: SearchBackend> Searcher<'a, B> {
    /// Creates a searcher; all dependencies are explicit.
    pub fn new(backend: &'a B, config: &'a Config) -> Self {
        Self {
            backend,
            config,
            builder: QueryBuilder::new(config.data_keywords.clone(), config.cmenergies_facet),
        }
    }

    /// Runs one search and merges the parent and child result sets.
    pub fn search(&self, args: &SearchArgs) -> Result<SearchResults, SearchError> {
        // Browsing (no query, no explicit sort) lists newest first.
        let sort_by = if args.query.is_empty() && args.sort_by.is_empty() {
            "date"
        } else {
            args.sort_by.as_str()
        };

        let parsed = parse(&args.query);
        let filters = self.builder.parse_filters(&args.filters)?;
        let post_filter = args
            .filters_post()
            .map(|(name, value)| Filter::from_pair(name, value, &self.config.data_keywords))
            .transpose()?;

        let mut body = self.builder.build(
            &parsed.query,
            &filters,
            args.size,
            args.offset,
            sort_by,
            &args.sort_order,
            post_filter.as_ref(),
        )?;
        restrict_to_parents(&mut body);

        let response = self
            .backend
            .search(&self.config.index, &body)
            .map_err(map_backend_error)?;

        let total = parse_total(&response);
        let facets = parse_facets(&response["aggregations"]);
        let mut results = parse_publication_hits(&response);

        if !parsed.exclude_tables && !results.is_empty() {
            let ids: Vec<u64> = results.iter().map(|hit| hit.recid).collect();
            let window = args.size.max(1) * self.config.child_window_factor;
            let child_body = child_query(&parsed.query, &ids, window);
            let child_response = self
                .backend
                .search(&self.config.index, &child_body)
                .map_err(map_backend_error)?;
            attach_children(&mut results, &child_response);
        }

        Ok(SearchResults {
            results,
            total,
            facets,
        })
    }

    /// Fetches one document's source by record id.
    pub fn get_record(&self, recid: u64) -> Result<Option<Value>, SearchError> {
        self.backend
            .get(&self.config.index, recid)
            .map_err(map_backend_error)
    }
}

impl SearchArgs {
    /// The post-filter pair, if set.
    fn filters_post(&self) -> Option<(&str, &str)> {
        self.post_filter
            .as_ref()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

/// Maps backend failures to the caller-facing taxonomy.
///
/// Query syntax reasons pass through verbatim; anything else is logged in
/// full and reduced to the generic error.
fn map_backend_error(err: BackendError) -> SearchError {
    match err {
        BackendError::QuerySyntax(reason) => SearchError::QuerySyntax(reason),
        other => {
            error!(error = %other, "search backend failure");
            SearchError::Backend
        }
    }
}

/// Adds the parent-role restriction to a built query payload.
fn restrict_to_parents(body: &mut Value) {
    if let Some(filter) = body["query"]["bool"]["filter"].as_array_mut() {
        filter.push(json!({"term": {"parent_child": PARENT_ROLE}}));
    }
}

/// The second query: child documents of the given parents.
///
/// Re-applies the free-text query so a publication's irrelevant tables are
/// not all pulled in, and caps the window at a configured multiple of the
/// page size.
fn child_query(query: &str, parent_ids: &[u64], window: usize) -> Value {
    let mut must = vec![json!({
        "has_parent": {
            "parent_type": PARENT_ROLE,
            "query": {"terms": {"recid": parent_ids}}
        }
    })];
    if !query.is_empty() {
        must.push(json!({"query_string": {"query": query}}));
    }
    json!({
        "size": window,
        "from": 0,
        "query": {"bool": {"must": must}}
    })
}

/// Reads the total hit count, tolerating both engine response shapes.
fn parse_total(response: &Value) -> u64 {
    let total = &response["hits"]["total"];
    total["value"].as_u64().or_else(|| total.as_u64()).unwrap_or(0)
}

/// Extracts publication hits with their record ids.
fn parse_publication_hits(response: &Value) -> Vec<PublicationHit> {
    let Some(hits) = response["hits"]["hits"].as_array() else {
        return Vec::new();
    };
    hits.iter()
        .filter_map(|hit| {
            let source = hit.get("_source")?;
            let recid = source["recid"]
                .as_u64()
                .or_else(|| hit["_id"].as_str().and_then(|id| id.parse().ok()))?;
            Some(PublicationHit {
                recid,
                publication: source.clone(),
                data: Vec::new(),
            })
        })
        .collect()
}

/// Groups child hits by parent id and attaches them to their publications.
///
/// Publications without matching children keep an empty `data` array; child
/// order within a parent follows the child query's ranking.
fn attach_children(results: &mut [PublicationHit], child_response: &Value) {
    let mut by_parent: HashMap<u64, Vec<Value>> = HashMap::new();
    if let Some(hits) = child_response["hits"]["hits"].as_array() {
        for hit in hits {
            let Some(source) = hit.get("_source") else {
                continue;
            };
            let Some(parent) = source["publication_recid"].as_u64() else {
                continue;
            };
            by_parent.entry(parent).or_default().push(source.clone());
        }
    }
    for result in results {
        result.data = by_parent.remove(&result.recid).unwrap_or_default();
    }
}

/// Parses aggregation results into named facets.
fn parse_facets(aggs: &Value) -> Vec<Facet> {
    let Some(entries) = aggs.as_object() else {
        return Vec::new();
    };
    entries
        .iter()
        .map(|(name, agg)| {
            // The author facet is nested one level deeper.
            let buckets = if agg["buckets"].is_array() {
                &agg["buckets"]
            } else {
                &agg["author_full_names"]["buckets"]
            };
            Facet {
                name: name.clone(),
                buckets: parse_buckets(buckets),
            }
        })
        .collect()
}

/// Parses one terms/histogram bucket array.
fn parse_buckets(buckets: &Value) -> Vec<FacetBucket> {
    let Some(buckets) = buckets.as_array() else {
        return Vec::new();
    };
    buckets
        .iter()
        .filter_map(|bucket| {
            let value = bucket["key_as_string"]
                .as_str()
                .map(ToString::to_string)
                .or_else(|| bucket["key"].as_str().map(ToString::to_string))
                .or_else(|| bucket["key"].as_u64().map(|k| k.to_string()))?;
            let count = bucket["doc_count"].as_u64()?;
            Some(FacetBucket { value, count })
        })
        .collect()
}
