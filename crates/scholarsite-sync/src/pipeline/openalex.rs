use std::path::PathBuf;

use chrono::{Datelike, Utc};
use scholarsite_core::storage::{write_json, write_json_if_changed};
use scholarsite_core::{Publication, SiteConfig};
use serde::Serialize;
use tracing::info;

use super::finalize::{
    SortOrder, count_selected, count_with_doi, ensure_required_fields, sort_publications,
};
use crate::curation::SelectedDois;
use crate::error::Result;
use crate::identifiers::{UniqueIds, slugify};
use crate::sources::{OpenAlexSource, OpenAlexWork};

#[derive(Debug, Clone, Serialize)]
pub struct OpenAlexSyncReport {
    pub author_id: String,
    pub fetched_works: usize,
    pub with_doi: usize,
    pub selected_dois: usize,
    pub selected: usize,
    pub changed: bool,
    pub raw_output: PathBuf,
    pub output: PathBuf,
}

/// Normalize fetched works, flag selected DOIs and put the records in final
/// order. Colliding ids take the work's OpenAlex key as suffix.
pub fn build_openalex_publications(
    works: Vec<OpenAlexWork>,
    selected: &SelectedDois,
    current_year: i32,
) -> Vec<Publication> {
    let mut ids = UniqueIds::new();
    let mut publications: Vec<Publication> = works
        .into_iter()
        .map(|work| {
            let key = slugify(work.key());
            let mut publication = work.into_publication(current_year);
            publication.id = ids.claim(std::mem::take(&mut publication.id), &key);
            publication
        })
        .collect();

    selected.flag(&mut publications);
    let mut publications = ensure_required_fields(publications);
    sort_publications(&mut publications, SortOrder::JournalThenTitle);
    publications
}

pub async fn run_openalex_sync(config: &SiteConfig) -> Result<OpenAlexSyncReport> {
    let source = OpenAlexSource::new(&config.openalex)?;
    info!(
        orcid = %config.author.orcid_id,
        max_works = config.openalex.max_works,
        "starting OpenAlex sync"
    );

    let author_id = source.resolve_author(&config.author.orcid_id).await?;
    let works = source
        .fetch_works(&author_id, config.openalex.max_works)
        .await?;

    let selected = SelectedDois::load(&config.selected_path());
    let publications = build_openalex_publications(works, &selected, Utc::now().year());

    let raw_output = config.openalex_raw_path();
    write_json(&raw_output, &publications)?;
    let output = config.publications_path();
    let changed = write_json_if_changed(&output, &publications)?;

    let report = OpenAlexSyncReport {
        author_id,
        fetched_works: publications.len(),
        with_doi: count_with_doi(&publications),
        selected_dois: selected.len(),
        selected: count_selected(&publications),
        changed,
        raw_output,
        output,
    };
    info!(
        works = report.fetched_works,
        with_doi = report.with_doi,
        changed = report.changed,
        "OpenAlex sync finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::{Value, json};
    use tempfile::TempDir;

    fn config(server: &ServerGuard, root: &TempDir) -> SiteConfig {
        let mut config = SiteConfig::default();
        config.paths.root = root.path().to_path_buf();
        config.author.orcid_id = "0000-0002-1825-0097".to_string();
        config.openalex.api_base = server.url();
        config.openalex.api_key = Some("key-1".to_string());
        config.openalex.retry_base_delay_ms = 0;
        config
    }

    fn work(key: &str, title: &str, doi: Option<&str>, venue: &str, year: i32) -> Value {
        json!({
            "id": format!("https://openalex.org/{key}"),
            "doi": doi,
            "display_name": title,
            "publication_year": year,
            "type": "article",
            "primary_location": {"source": {"display_name": venue}},
            "cited_by_count": 1
        })
    }

    fn works(values: Vec<Value>) -> Vec<OpenAlexWork> {
        values.iter().map(OpenAlexWork::from_json).collect()
    }

    #[test]
    fn duplicate_dois_keep_both_records() {
        let fetched = works(vec![
            work("W1", "Preprint", Some("https://doi.org/10.1/x"), "arXiv", 2021),
            work("W2", "Article", Some("10.1/X"), "Optica", 2021),
        ]);
        let pubs = build_openalex_publications(fetched, &SelectedDois::default(), 2024);

        let mut ids: Vec<_> = pubs.iter().map(|p| p.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["doi-10-1-x", "doi-10-1-x-w2"]);
    }

    #[test]
    fn selection_flags_by_doi() {
        let fetched = works(vec![
            work("W1", "One", Some("10.1/a"), "Optica", 2020),
            work("W2", "Two", Some("10.1/b"), "Optica", 2020),
        ]);
        let selected = SelectedDois::from_json(&json!(["10.1/A"]));
        let pubs = build_openalex_publications(fetched, &selected, 2024);
        assert_eq!(count_selected(&pubs), 1);
        assert!(pubs.iter().find(|p| p.doi == "10.1/a").unwrap().selected);
    }

    #[tokio::test]
    async fn full_sync_writes_bare_array() {
        let mut server = Server::new_async().await;
        let root = TempDir::new().unwrap();
        let config = config(&server, &root);

        let _author = server
            .mock("GET", "/authors/orcid:0000-0002-1825-0097")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"id": "https://openalex.org/A9"}"#)
            .create_async()
            .await;
        let _works = server
            .mock("GET", "/works")
            .match_query(Matcher::UrlEncoded(
                "filter".to_string(),
                "authorships.author.id:https://openalex.org/A9".to_string(),
            ))
            .with_status(200)
            .with_body(
                json!({
                    "meta": {"next_cursor": null},
                    "results": [
                        work("W1", "Zeta", Some("10.1/z"), "Physical Review", 2022),
                        work("W2", "Alpha", None, "ACS Nano", 2022),
                        work("W3", "Older", Some("10.1/o"), "Optica", 2018)
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        std::fs::create_dir_all(config.data_dir()).unwrap();
        std::fs::write(config.selected_path(), r#"["10.1/o"]"#).unwrap();

        let report = run_openalex_sync(&config).await.unwrap();
        assert_eq!(report.author_id, "https://openalex.org/A9");
        assert_eq!(report.fetched_works, 3);
        assert_eq!(report.with_doi, 2);
        assert_eq!(report.selected, 1);
        assert!(report.changed);

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(config.publications_path()).unwrap())
                .unwrap();
        let ids: Vec<_> = written
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["openalex-w2", "doi-10-1-z", "doi-10-1-o"]);
        assert!(config.openalex_raw_path().exists());

        let again = run_openalex_sync(&config).await.unwrap();
        assert!(!again.changed);
    }

    #[tokio::test]
    async fn missing_api_key_is_config_error() {
        let server = Server::new_async().await;
        let root = TempDir::new().unwrap();
        let mut config = config(&server, &root);
        config.openalex.api_key = None;

        let err = run_openalex_sync(&config).await.unwrap_err();
        assert_eq!(err.to_string(), "OPENALEX_API_KEY is required");
    }
}
