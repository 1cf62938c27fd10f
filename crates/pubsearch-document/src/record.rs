//! Relational projections consumed from the submission store.
//!
//! These are flat read-only views of the committed relational rows for one
//! finished submission version. The store is responsible for resolving
//! versions; by the time a record reaches this crate it already belongs to a
//! finished version.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One author of a publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Full name, as displayed and as matched by nested author queries.
    pub full_name: String,
    /// Affiliation, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
}

/// A resource file attached to a submission (scripts, archives, analyses).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Relational resource id.
    pub id: u64,
    /// Resource type, e.g. `rivet` or `histfactory`.
    pub file_type: String,
    /// Location: a URL or a stored file path.
    pub location: String,
}

/// A `{name, value}` keyword attached to a data table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    /// Keyword name, e.g. `reactions` or `cmenergies`.
    pub name: String,
    /// Free-text keyword value.
    pub value: String,
}

/// Projection of one publication at one finished version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationRecord {
    /// Relational publication record id.
    pub recid: u64,
    /// External (literature database) identifier, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inspire_id: Option<String>,
    /// Version number of this finished submission.
    pub version: u32,
    /// Publication title.
    pub title: String,
    /// Abstract text.
    pub abstract_text: String,
    /// DOI, if minted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    /// Full author list.
    pub authors: Vec<Author>,
    /// Collaborations the publication belongs to.
    pub collaborations: Vec<String>,
    /// Subject areas.
    pub subject_area: Vec<String>,
    /// Date the record was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<NaiveDate>,
    /// Timestamps of participant actions on this submission.
    #[serde(default)]
    pub participant_dates: Vec<DateTime<Utc>>,
    /// Resources attached to this version.
    #[serde(default)]
    pub resources: Vec<Resource>,
}

/// Projection of one data table at one finished version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTableRecord {
    /// Relational data-table record id.
    pub recid: u64,
    /// Record id of the owning publication.
    pub publication_recid: u64,
    /// Identity shared by the same table across versions.
    ///
    /// Cleanup uses this to recognise a lower-version copy superseded by the
    /// same table at a higher version.
    pub associated_recid: u64,
    /// Version number of the submission this row belongs to.
    pub version: u32,
    /// Table name.
    pub title: String,
    /// Table description.
    pub description: String,
    /// DOI, if minted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    /// Raw keywords, pre-aggregation.
    #[serde(default)]
    pub keywords: Vec<Keyword>,
}
