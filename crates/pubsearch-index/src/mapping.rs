//! Index schema: settings and field mappings.
//!
//! One index holds both document roles, linked by the `parent_child` join
//! field. Text fields that are also filtered or faceted on carry a `raw`
//! keyword sub-field.

use serde_json::{Value, json};

/// The full index schema used when (re)creating the index.
pub fn index_schema() -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 1
        },
        "mappings": mappings()
    })
}

/// The field mappings alone, used for in-place mapping updates.
pub fn mappings() -> Value {
    json!({
        "properties": {
            "recid": {"type": "long"},
            "publication_recid": {"type": "long"},
            "inspire_id": {"type": "keyword"},
            "version": {"type": "integer"},
            "title": {
                "type": "text",
                "fields": {"raw": {"type": "keyword"}}
            },
            "abstract": {"type": "text"},
            "description": {"type": "text"},
            "doi": {"type": "keyword"},
            "authors": {
                "type": "nested",
                "properties": {
                    "full_name": {
                        "type": "text",
                        "fields": {"raw": {"type": "keyword"}}
                    },
                    "affiliation": {"type": "text"}
                }
            },
            "summary_authors": {
                "properties": {
                    "full_name": {"type": "text"},
                    "affiliation": {"type": "text"}
                }
            },
            "collaborations": {
                "type": "text",
                "fields": {"raw": {"type": "keyword"}}
            },
            "subject_area": {
                "type": "text",
                "fields": {"raw": {"type": "keyword"}}
            },
            "creation_date": {"type": "date"},
            "last_updated": {"type": "date"},
            "data_keywords": {
                "properties": {
                    "cmenergies": {"type": "float_range"},
                    "observables": {
                        "type": "text",
                        "fields": {"raw": {"type": "keyword"}}
                    },
                    "reactions": {
                        "type": "text",
                        "fields": {"raw": {"type": "keyword"}}
                    },
                    "phrases": {
                        "type": "text",
                        "fields": {"raw": {"type": "keyword"}}
                    }
                }
            },
            "analyses": {
                "properties": {
                    "type": {"type": "keyword"},
                    "analysis": {"type": "keyword"}
                }
            },
            "keywords": {
                "properties": {
                    "name": {"type": "keyword"},
                    "value": {
                        "type": "text",
                        "fields": {"raw": {"type": "keyword"}}
                    }
                }
            },
            "parent_child": {
                "type": "join",
                "relations": {"publication": "datatable"}
            }
        }
    })
}
