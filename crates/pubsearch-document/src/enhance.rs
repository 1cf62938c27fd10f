//! Document enhancement: relational projection → search document.
//!
//! Two entry points, one per document role. Both are pure transforms of
//! their input record; [`enhance_publication`] touches the clock only when a
//! record carries neither participant dates nor a creation date.

use chrono::Utc;

use crate::{
    document::{
        AccessUrls, Analysis, DataTableDocument, JoinRole, PublicationDocument,
    },
    keywords::{DataKeywords, aggregate_keywords},
    record::{DataTableRecord, PublicationRecord},
};

/// How many authors go into the summary list.
pub const SUMMARY_AUTHOR_LIMIT: usize = 10;

/// Export formats offered for download.
const DOWNLOAD_FORMATS: &[&str] = &["csv", "json", "root", "yaml", "yoda"];

/// Enhancement settings, carved out of the application config.
#[derive(Debug, Clone)]
pub struct EnhanceSettings {
    /// Public site URL used to build download and resource links.
    pub site_url: String,
    /// Keyword names kept during aggregation.
    pub data_keywords: Vec<String>,
    /// Resource types recognised as analyses.
    pub analysis_types: Vec<String>,
    /// Resource type rendered as a landing-page URL.
    pub histfactory_type: String,
}

/// Builds the parent-role document for a publication record.
///
/// Stamps the parent join marker, derives download URLs from the identifier
/// and version, truncates the author list into `summary_authors`, computes
/// `last_updated`, and attaches analysis badges from the version's
/// resources.
pub fn enhance_publication(
    record: &PublicationRecord,
    settings: &EnhanceSettings,
) -> PublicationDocument {
    let last_updated = record
        .participant_dates
        .iter()
        .max()
        .copied()
        .or_else(|| {
            record
                .creation_date
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })
        .unwrap_or_else(Utc::now);

    PublicationDocument {
        recid: record.recid,
        inspire_id: record.inspire_id.clone(),
        version: record.version,
        title: record.title.clone(),
        abstract_text: record.abstract_text.clone(),
        doi: record.doi.clone(),
        authors: record.authors.clone(),
        summary_authors: record
            .authors
            .iter()
            .take(SUMMARY_AUTHOR_LIMIT)
            .cloned()
            .collect(),
        collaborations: record.collaborations.clone(),
        subject_area: record.subject_area.clone(),
        creation_date: record.creation_date,
        last_updated,
        data_keywords: DataKeywords::default(),
        analyses: collect_analyses(record, settings),
        access_urls: submission_urls(record.recid, record.version, settings),
        parent_child: JoinRole::parent(),
    }
}

/// Builds the child-role document for a data-table record.
///
/// Stamps the child join marker with the parent's routing key, derives the
/// per-table download URLs, and aggregates the raw keywords down to the
/// configured allow-list with cmenergies normalized into ranges.
pub fn enhance_datatable(
    record: &DataTableRecord,
    settings: &EnhanceSettings,
) -> DataTableDocument {
    DataTableDocument {
        recid: record.recid,
        publication_recid: record.publication_recid,
        version: record.version,
        title: record.title.clone(),
        description: record.description.clone(),
        doi: record.doi.clone(),
        keywords: record.keywords.clone(),
        data_keywords: aggregate_keywords(&record.keywords, &settings.data_keywords),
        access_urls: table_urls(record, settings),
        parent_child: JoinRole::child(record.publication_recid),
    }
}

/// Download links for a whole submission.
fn submission_urls(recid: u64, version: u32, settings: &EnhanceSettings) -> AccessUrls {
    let mut urls = AccessUrls::default();
    for format in DOWNLOAD_FORMATS {
        urls.links.insert(
            (*format).to_string(),
            format!(
                "{}/download/submission/{recid}/{version}/{format}",
                settings.site_url
            ),
        );
    }
    urls
}

/// Download links for one table, keyed by the table title.
fn table_urls(record: &DataTableRecord, settings: &EnhanceSettings) -> AccessUrls {
    let title = escape_title(&record.title);
    let mut urls = AccessUrls::default();
    for format in DOWNLOAD_FORMATS {
        urls.links.insert(
            (*format).to_string(),
            format!(
                "{}/download/table/{}/{title}/{}/{format}",
                settings.site_url, record.publication_recid, record.version
            ),
        );
    }
    urls
}

/// Percent-escapes the characters that break table-title URLs.
fn escape_title(title: &str) -> String {
    title.replace('%', "%25").replace('\\', "%5C")
}

/// Scans a version's resources for configured analysis tools.
///
/// Matching is case-insensitive on the resource type. The histogram-factory
/// type points at the resource landing page instead of the raw location.
fn collect_analyses(record: &PublicationRecord, settings: &EnhanceSettings) -> Vec<Analysis> {
    let mut analyses = Vec::new();
    for resource in &record.resources {
        if resource
            .file_type
            .eq_ignore_ascii_case(&settings.histfactory_type)
        {
            analyses.push(Analysis {
                kind: resource.file_type.clone(),
                analysis: format!(
                    "{}/record/resource/{}?landing_page=true",
                    settings.site_url, resource.id
                ),
            });
        } else if settings
            .analysis_types
            .iter()
            .any(|kind| kind.eq_ignore_ascii_case(&resource.file_type))
        {
            analyses.push(Analysis {
                kind: resource.file_type.clone(),
                analysis: resource.location.clone(),
            });
        }
    }
    analyses
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::record::{Author, Keyword, Resource};

    fn settings() -> EnhanceSettings {
        EnhanceSettings {
            site_url: "https://example.org".to_string(),
            data_keywords: vec![
                "cmenergies".to_string(),
                "observables".to_string(),
                "reactions".to_string(),
                "phrases".to_string(),
            ],
            analysis_types: vec!["rivet".to_string(), "MadAnalysis".to_string()],
            histfactory_type: "histfactory".to_string(),
        }
    }

    fn publication() -> PublicationRecord {
        PublicationRecord {
            recid: 1,
            inspire_id: Some("123456".to_string()),
            version: 2,
            title: "Measurement of something".to_string(),
            abstract_text: "An abstract.".to_string(),
            doi: Some("10.17182/ins123456".to_string()),
            authors: (0..12)
                .map(|i| Author {
                    full_name: format!("Author {i}"),
                    affiliation: None,
                })
                .collect(),
            collaborations: vec!["ATLAS".to_string()],
            subject_area: vec!["hep-ex".to_string()],
            creation_date: NaiveDate::from_ymd_opt(2020, 5, 4),
            participant_dates: vec![],
            resources: vec![],
        }
    }

    fn datatable() -> DataTableRecord {
        DataTableRecord {
            recid: 16,
            publication_recid: 1,
            associated_recid: 160,
            version: 2,
            title: "Table 1".to_string(),
            description: "A table.".to_string(),
            doi: None,
            keywords: vec![
                Keyword {
                    name: "observables".to_string(),
                    value: "SIG".to_string(),
                },
                Keyword {
                    name: "cmenergies".to_string(),
                    value: "91.2 GeV".to_string(),
                },
            ],
        }
    }

    #[test]
    fn publication_gets_parent_role_and_summary_authors() {
        let doc = enhance_publication(&publication(), &settings());
        assert_eq!(doc.parent_child, JoinRole::parent());
        assert_eq!(doc.authors.len(), 12);
        assert_eq!(doc.summary_authors.len(), SUMMARY_AUTHOR_LIMIT);
        assert_eq!(doc.summary_authors[0].full_name, "Author 0");
    }

    #[test]
    fn publication_download_urls_carry_version() {
        let doc = enhance_publication(&publication(), &settings());
        assert_eq!(
            doc.access_urls.links.get("csv").unwrap(),
            "https://example.org/download/submission/1/2/csv"
        );
        assert_eq!(doc.access_urls.links.len(), 5);
    }

    #[test]
    fn last_updated_prefers_participant_dates() {
        let mut record = publication();
        let latest = Utc.with_ymd_and_hms(2021, 3, 2, 12, 0, 0).unwrap();
        record.participant_dates = vec![
            Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap(),
            latest,
        ];
        let doc = enhance_publication(&record, &settings());
        assert_eq!(doc.last_updated, latest);
    }

    #[test]
    fn last_updated_falls_back_to_creation_date() {
        let doc = enhance_publication(&publication(), &settings());
        assert_eq!(
            doc.last_updated,
            Utc.with_ymd_and_hms(2020, 5, 4, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn analyses_match_registry_case_insensitively() {
        let mut record = publication();
        record.resources = vec![
            Resource {
                id: 1,
                file_type: "Rivet".to_string(),
                location: "https://rivet.example/ana".to_string(),
            },
            Resource {
                id: 2,
                file_type: "attachment".to_string(),
                location: "file.zip".to_string(),
            },
            Resource {
                id: 3,
                file_type: "histfactory".to_string(),
                location: "workspace.tar.gz".to_string(),
            },
        ];
        let doc = enhance_publication(&record, &settings());
        assert_eq!(doc.analyses.len(), 2);
        assert_eq!(doc.analyses[0].kind, "Rivet");
        assert_eq!(doc.analyses[0].analysis, "https://rivet.example/ana");
        assert_eq!(
            doc.analyses[1].analysis,
            "https://example.org/record/resource/3?landing_page=true"
        );
    }

    #[test]
    fn datatable_gets_child_role_and_normalized_keywords() {
        let doc = enhance_datatable(&datatable(), &settings());
        assert_eq!(doc.parent_child, JoinRole::child(1));
        assert_eq!(doc.keywords.len(), 2);
        assert_eq!(doc.data_keywords.cmenergies.len(), 1);
        assert_eq!(doc.data_keywords.cmenergies[0].gte, 91.2);
        assert_eq!(
            doc.data_keywords.values.get("observables").unwrap(),
            &vec!["SIG".to_string()]
        );
    }

    #[test]
    fn table_titles_are_escaped_in_urls() {
        let mut record = datatable();
        record.title = "90% CL\\limit".to_string();
        let doc = enhance_datatable(&record, &settings());
        assert_eq!(
            doc.access_urls.links.get("yaml").unwrap(),
            "https://example.org/download/table/1/90%25 CL%5Climit/2/yaml"
        );
    }

    #[test]
    fn enhancement_is_deterministic() {
        let record = datatable();
        let first = enhance_datatable(&record, &settings());
        let second = enhance_datatable(&record, &settings());
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
