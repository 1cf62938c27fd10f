//! Engine-native query payload construction.
//!
//! Translates a parsed query string, typed filters, pagination, and sort
//! parameters into the JSON body the backend executes. Filters are a closed
//! enum: every supported name has a typed variant, and unknown names fail at
//! construction with an error naming the offender.

use serde_json::{Value, json};

use pubsearch_query::{SortSpec, sort_field};

use crate::error::SearchError;

/// A typed search filter.
///
/// Each variant maps to one engine clause shape; translation is exhaustive
/// over this enum rather than dispatched on strings at query time.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Nested match on the author sub-documents.
    Author(String),
    /// Exact term on the collaboration keyword sub-field.
    Collaboration(String),
    /// Exact term on the subject-area keyword sub-field.
    SubjectAreas(String),
    /// One or more publication years.
    Date(Vec<String>),
    /// A numeric center-of-mass energy bound or range.
    CmEnergies(Vec<f64>),
    /// Exact term on a configured data keyword's raw sub-field.
    DataKeyword {
        /// The keyword name, already validated against the configured set.
        name: String,
        /// The exact value to match.
        value: String,
    },
}

impl Filter {
    /// Builds a filter from a `(name, value)` pair.
    ///
    /// `data_keywords` is the configured keyword set; any name outside the
    /// fixed filters and that set fails with [`SearchError::UnknownFilter`].
    pub fn from_pair(
        name: &str,
        value: &str,
        data_keywords: &[String],
    ) -> Result<Self, SearchError> {
        match name {
            "author" => Ok(Self::Author(value.to_string())),
            "collaboration" => Ok(Self::Collaboration(value.to_string())),
            "subject_areas" => Ok(Self::SubjectAreas(value.to_string())),
            "date" => Ok(Self::Date(
                value.split(',').map(|y| y.trim().to_string()).collect(),
            )),
            "cmenergies" => {
                let energies = value
                    .split(',')
                    .map(|v| v.trim().parse::<f64>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| SearchError::UnknownFilter(name.to_string()))?;
                Ok(Self::CmEnergies(energies))
            }
            _ if data_keywords.iter().any(|k| k == name) => Ok(Self::DataKeyword {
                name: name.to_string(),
                value: value.to_string(),
            }),
            _ => Err(SearchError::UnknownFilter(name.to_string())),
        }
    }

    /// The engine clause for this filter.
    fn clause(&self) -> Value {
        match self {
            Self::Author(name) => json!({
                "nested": {
                    "path": "authors",
                    "query": {"match": {"authors.full_name": name}}
                }
            }),
            Self::Collaboration(value) => json!({"term": {"collaborations.raw": value}}),
            Self::SubjectAreas(value) => json!({"term": {"subject_area.raw": value}}),
            Self::Date(years) => json!({"terms": {"year": years}}),
            Self::CmEnergies(values) => cmenergies_clause(values),
            Self::DataKeyword { name, value } => {
                let mut term = serde_json::Map::new();
                term.insert(
                    format!("data_keywords.{name}.raw"),
                    Value::String(value.clone()),
                );
                json!({"term": term})
            }
        }
    }
}

/// Range clause for a cmenergies filter.
///
/// Two values are sorted ascending and filtered as `[gte, lt)` unless equal;
/// one value filters the exact `[v, v]` range.
fn cmenergies_clause(values: &[f64]) -> Value {
    match values {
        [single] => json!({
            "range": {"data_keywords.cmenergies": {"gte": single, "lte": single}}
        }),
        [a, b] => {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            if low == high {
                json!({
                    "range": {"data_keywords.cmenergies": {"gte": low, "lte": high}}
                })
            } else {
                json!({
                    "range": {"data_keywords.cmenergies": {"gte": low, "lt": high}}
                })
            }
        }
        _ => json!({"match_all": {}}),
    }
}

/// Builds engine query payloads.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    /// Configured data-keyword names, one terms facet each.
    data_keywords: Vec<String>,
    /// Whether to request the version-gated cmenergies facet.
    cmenergies_facet: bool,
}

impl QueryBuilder {
    /// Creates a builder for the configured keyword set.
    pub fn new(data_keywords: Vec<String>, cmenergies_facet: bool) -> Self {
        Self {
            data_keywords,
            cmenergies_facet,
        }
    }

    /// Parses `(name, value)` pairs into typed filters.
    pub fn parse_filters(&self, pairs: &[(String, String)]) -> Result<Vec<Filter>, SearchError> {
        pairs
            .iter()
            .map(|(name, value)| Filter::from_pair(name, value, &self.data_keywords))
            .collect()
    }

    /// Builds the full query payload.
    ///
    /// `query` is the rewritten query string (empty matches everything);
    /// `sort_by`/`sort_order` are the user-facing tokens from the sort
    /// table; `post_filter` is applied after aggregations are computed.
    pub fn build(
        &self,
        query: &str,
        filters: &[Filter],
        size: usize,
        offset: usize,
        sort_by: &str,
        sort_order: &str,
        post_filter: Option<&Filter>,
    ) -> Result<Value, SearchError> {
        let sort = sort_field(sort_by, sort_order)?;

        let mut body = json!({
            "size": size,
            "from": offset,
            "query": {
                "bool": {
                    "must": [text_query(query)],
                    "filter": filters.iter().map(Filter::clause).collect::<Vec<_>>()
                }
            },
            "sort": [sort_clause(&sort)],
            "aggs": self.aggregations()
        });
        if let Some(filter) = post_filter {
            body["post_filter"] = filter.clause();
        }
        Ok(body)
    }

    /// The fixed facet aggregations requested with every search.
    ///
    /// cmenergies buckets are requested only when the version-gated flag is
    /// on; older backends cannot aggregate over range objects.
    fn aggregations(&self) -> Value {
        let mut aggs = json!({
            "nested_authors": {
                "nested": {"path": "authors"},
                "aggs": {
                    "author_full_names": {
                        "terms": {"field": "authors.full_name.raw"}
                    }
                }
            },
            "collaboration": {
                "terms": {"field": "collaborations.raw"}
            },
            "subject_areas": {
                "terms": {"field": "subject_area.raw"}
            },
            "dates": {
                "date_histogram": {"field": "creation_date", "calendar_interval": "year"}
            }
        });
        for keyword in &self.data_keywords {
            if keyword == "cmenergies" && !self.cmenergies_facet {
                continue;
            }
            aggs[keyword.as_str()] = json!({
                "terms": {"field": format!("data_keywords.{keyword}.raw")}
            });
        }
        aggs
    }
}

/// The free-text part of the query.
fn text_query(query: &str) -> Value {
    if query.is_empty() {
        json!({"match_all": {}})
    } else {
        json!({"query_string": {"query": query, "fuzziness": "AUTO"}})
    }
}

/// One entry of the engine `sort` array.
fn sort_clause(sort: &SortSpec) -> Value {
    let mut clause = serde_json::Map::new();
    clause.insert(sort.field.to_string(), json!({"order": sort.order()}));
    Value::Object(clause)
}
