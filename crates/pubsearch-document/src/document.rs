//! The parent/child search documents.
//!
//! Exactly one [`PublicationDocument`] exists per relational publication id;
//! it is overwritten, not versioned, on every reindex. Each
//! [`DataTableDocument`] joins to its parent by routing key, which must be
//! an existing publication document id.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    keywords::DataKeywords,
    record::{Author, Keyword},
};

/// Join-role name for publication documents.
pub const PARENT_ROLE: &str = "publication";

/// Join-role name for data-table documents.
pub const CHILD_ROLE: &str = "datatable";

/// Parent/child join marker stamped onto every document.
///
/// Serializes to the engine's join-field shape: `{"name": "publication"}`
/// for parents, `{"name": "datatable", "parent": "<recid>"}` for children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JoinRole {
    /// A child document referencing its parent by routing key.
    Child {
        /// The child role name.
        name: String,
        /// The parent publication's document id.
        parent: String,
    },
    /// A parent document.
    Parent {
        /// The parent role name.
        name: String,
    },
}

impl JoinRole {
    /// The parent-role marker.
    pub fn parent() -> Self {
        Self::Parent {
            name: PARENT_ROLE.to_string(),
        }
    }

    /// A child-role marker pointing at the given publication id.
    pub fn child(parent_recid: u64) -> Self {
        Self::Child {
            name: CHILD_ROLE.to_string(),
            parent: parent_recid.to_string(),
        }
    }
}

/// Derived download links, one per export format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessUrls {
    /// Format name → download URL.
    pub links: BTreeMap<String, String>,
}

/// An analysis badge attached to a publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    /// The analysis tool type, e.g. `rivet`.
    #[serde(rename = "type")]
    pub kind: String,
    /// URL of the analysis (raw resource location or landing page).
    pub analysis: String,
}

/// The parent-role document for one publication's latest finished version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationDocument {
    /// Relational publication record id; also the document id.
    pub recid: u64,
    /// External identifier, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inspire_id: Option<String>,
    /// Version number the document was built from.
    pub version: u32,
    /// Publication title.
    pub title: String,
    /// Abstract text.
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// DOI, if minted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    /// Full author list.
    pub authors: Vec<Author>,
    /// The first few authors, for display.
    pub summary_authors: Vec<Author>,
    /// Collaborations.
    pub collaborations: Vec<String>,
    /// Subject areas.
    pub subject_area: Vec<String>,
    /// Creation date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<NaiveDate>,
    /// Most recent participant action, with documented fallbacks.
    pub last_updated: DateTime<Utc>,
    /// Aggregated keywords pushed down from the child tables.
    #[serde(default, skip_serializing_if = "DataKeywords::is_empty")]
    pub data_keywords: DataKeywords,
    /// Analysis badges derived from attached resources.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub analyses: Vec<Analysis>,
    /// Download links for the whole submission.
    pub access_urls: AccessUrls,
    /// Parent-role join marker.
    pub parent_child: JoinRole,
}

/// The child-role document for one data table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTableDocument {
    /// Relational data-table record id; also the document id.
    pub recid: u64,
    /// Record id of the owning publication (the routing key).
    pub publication_recid: u64,
    /// Version number the document was built from.
    pub version: u32,
    /// Table name.
    pub title: String,
    /// Table description.
    pub description: String,
    /// DOI, if minted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    /// Raw keywords, kept pre-aggregation for display.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<Keyword>,
    /// Aggregated keywords for this table alone.
    #[serde(default, skip_serializing_if = "DataKeywords::is_empty")]
    pub data_keywords: DataKeywords,
    /// Download links for this table.
    pub access_urls: AccessUrls,
    /// Child-role join marker referencing the parent.
    pub parent_child: JoinRole,
}
