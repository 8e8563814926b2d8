use std::collections::HashMap;
use std::time::Duration;

use reqwest::Url;
use reqwest::header::HeaderMap;
use scholarsite_core::{CitationWindow, OpenAlexConfig, Publication, PublicationSource, doi_url};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Result, SyncError};
use crate::http::{HttpClient, RetryPolicy, ensure_status, read_json};
use crate::identifiers::{doi_id, normalize_doi, slugify};

pub const USER_AGENT: &str = "scholarsite-openalex-sync";
pub const PER_PAGE: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearCount {
    pub year: i32,
    pub cited_by_count: u64,
}

/// The parts of an OpenAlex work the site uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenAlexWork {
    pub id: String,
    pub doi: Option<String>,
    pub title: String,
    pub work_type: String,
    pub publication_year: Option<i32>,
    pub publication_date: Option<String>,
    pub authors: Vec<String>,
    pub venue: String,
    pub volume: String,
    pub issue: String,
    pub first_page: String,
    pub last_page: String,
    pub cited_by_count: u64,
    pub counts_by_year: Vec<YearCount>,
}

impl OpenAlexWork {
    pub fn from_json(v: &Value) -> Self {
        let id = v["ids"]["openalex"]
            .as_str()
            .or_else(|| v["id"].as_str())
            .unwrap_or_default()
            .to_string();

        let doi = v["ids"]["doi"]
            .as_str()
            .or_else(|| v["doi"].as_str())
            .map(ToOwned::to_owned);

        let title = v["display_name"]
            .as_str()
            .or_else(|| v["title"].as_str())
            .unwrap_or_default()
            .to_string();

        let authors = v["authorships"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|a| a["author"]["display_name"].as_str())
                    .filter(|name| !name.is_empty())
                    .map(ToOwned::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        let counts_by_year = v["counts_by_year"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|c| {
                        let year = i32::try_from(c["year"].as_i64()?).ok()?;
                        Some(YearCount {
                            year,
                            cited_by_count: c["cited_by_count"].as_u64().unwrap_or(0),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let text = |field: &Value| field.as_str().unwrap_or_default().to_string();
        let biblio = &v["biblio"];

        Self {
            id,
            doi,
            title,
            work_type: text(&v["type"]),
            publication_year: v["publication_year"]
                .as_i64()
                .and_then(|n| i32::try_from(n).ok()),
            publication_date: v["publication_date"].as_str().map(ToOwned::to_owned),
            authors,
            venue: venue_name(v),
            volume: text(&biblio["volume"]),
            issue: text(&biblio["issue"]),
            first_page: text(&biblio["first_page"]),
            last_page: text(&biblio["last_page"]),
            cited_by_count: v["cited_by_count"].as_u64().unwrap_or(0),
            counts_by_year,
        }
    }

    /// `publication_year`, else the leading four digits of `publication_date`.
    pub fn year(&self) -> Option<i32> {
        self.publication_year.filter(|y| *y != 0).or_else(|| {
            let date = self.publication_date.as_deref()?;
            let prefix = date.get(..4)?;
            if prefix.chars().all(|c| c.is_ascii_digit()) {
                prefix.parse().ok()
            } else {
                None
            }
        })
    }

    /// `first-last`, or whichever of the two exists.
    pub fn pages(&self) -> String {
        match (self.first_page.is_empty(), self.last_page.is_empty()) {
            (false, false) => format!("{}-{}", self.first_page, self.last_page),
            (false, true) => self.first_page.clone(),
            (true, false) => self.last_page.clone(),
            (true, true) => String::new(),
        }
    }

    /// Short key of the OpenAlex id (`W2741809807` for
    /// `https://openalex.org/W2741809807`).
    pub fn key(&self) -> &str {
        self.id.rsplit('/').next().unwrap_or_default()
    }

    /// Canonical record with citation windows ending at `current_year`.
    pub fn into_publication(self, current_year: i32) -> Publication {
        let doi = self.doi.as_deref().map(normalize_doi).unwrap_or_default();
        let key = slugify(self.key());
        let id = if !doi.is_empty() {
            doi_id(&doi)
        } else if !key.is_empty() {
            format!("openalex-{key}")
        } else {
            "openalex-unknown".to_string()
        };

        Publication {
            id,
            title: self.title.clone(),
            year: self.year(),
            kind: self.work_type.clone(),
            venue: self.venue.clone(),
            doi_url: Some(if doi.is_empty() { String::new() } else { doi_url(&doi) }),
            doi,
            authors: self.authors.clone(),
            source: PublicationSource {
                openalex_id: Some(self.id.clone()),
                ..Default::default()
            },
            journal: Some(self.venue.clone()),
            volume: Some(self.volume.clone()),
            issue: Some(self.issue.clone()),
            pages: Some(self.pages()),
            openalex_id: Some(self.id.clone()),
            openalex_url: Some(self.id.clone()),
            citations_total: Some(self.cited_by_count),
            citations_last5: Some(citation_window(&self.counts_by_year, current_year, 5)),
            citations_by_year: Some(citation_window(&self.counts_by_year, current_year, 10)),
            ..Default::default()
        }
    }
}

/// `host_venue` → `primary_location.source` → first location's source.
fn venue_name(v: &Value) -> String {
    let candidates = [
        &v["host_venue"]["display_name"],
        &v["primary_location"]["source"]["display_name"],
        &v["locations"][0]["source"]["display_name"],
    ];
    candidates
        .into_iter()
        .filter_map(Value::as_str)
        .find(|name| !name.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// `span` consecutive years ending at `current_year`, ascending, with
/// missing years counted as zero.
pub fn citation_window(counts: &[YearCount], current_year: i32, span: i32) -> CitationWindow {
    let lookup: HashMap<i32, u64> = counts.iter().map(|c| (c.year, c.cited_by_count)).collect();
    let years: Vec<i32> = (current_year - span + 1..=current_year).collect();
    let counts = years
        .iter()
        .map(|y| lookup.get(y).copied().unwrap_or(0))
        .collect();
    CitationWindow { years, counts }
}

pub struct OpenAlexSource {
    client: HttpClient,
    base_url: String,
    api_key: String,
    mailto: Option<String>,
}

impl OpenAlexSource {
    pub fn new(config: &OpenAlexConfig) -> Result<Self> {
        let api_key = config.api_key()?.to_string();
        let policy = RetryPolicy::new(
            config.max_attempts,
            Duration::from_millis(config.retry_base_delay_ms),
        );
        let client = HttpClient::new(USER_AGENT, Duration::from_secs(config.timeout_secs), policy)?;
        Ok(Self::with_client(
            client,
            &config.api_base,
            &api_key,
            config.mailto.clone(),
        ))
    }

    pub fn with_client(
        client: HttpClient,
        base_url: &str,
        api_key: &str,
        mailto: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            mailto,
        }
    }

    /// OpenAlex author id for an ORCID iD.
    pub async fn resolve_author(&self, orcid_id: &str) -> Result<String> {
        let url = self.url(&format!("/authors/orcid:{orcid_id}"), &[])?;
        let payload = self.get_json(url, "Author request").await?;
        payload["id"]
            .as_str()
            .filter(|id| !id.is_empty())
            .map(ToOwned::to_owned)
            .ok_or_else(|| SyncError::Config("Failed to resolve OpenAlex author id".to_string()))
    }

    /// Every work of `author_id`, newest first, following `next_cursor` and
    /// stopping exactly at `max_works`.
    pub async fn fetch_works(&self, author_id: &str, max_works: usize) -> Result<Vec<OpenAlexWork>> {
        let filter = format!("authorships.author.id:{author_id}");
        let per_page = PER_PAGE.to_string();
        let mut cursor = "*".to_string();
        let mut works = Vec::new();

        if max_works == 0 {
            return Ok(works);
        }

        loop {
            let url = self.url(
                "/works",
                &[
                    ("filter", filter.as_str()),
                    ("per-page", per_page.as_str()),
                    ("sort", "publication_date:desc"),
                    ("cursor", cursor.as_str()),
                ],
            )?;
            let payload = self.get_json(url, "Works request").await?;
            let batch = payload["results"].as_array().map(Vec::as_slice).unwrap_or_default();
            if batch.is_empty() {
                break;
            }
            debug!(cursor = %cursor, batch = batch.len(), "fetched works page");

            for work in batch {
                works.push(OpenAlexWork::from_json(work));
                if works.len() >= max_works {
                    info!(works = works.len(), "reached MAX_WORKS cap");
                    return Ok(works);
                }
            }

            match payload["meta"]["next_cursor"].as_str() {
                Some(next) if !next.is_empty() => cursor = next.to_string(),
                _ => break,
            }
        }

        info!(works = works.len(), "fetched OpenAlex works");
        Ok(works)
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let raw = format!("{}{path}", self.base_url);
        let mut url =
            Url::parse(&raw).map_err(|e| SyncError::Parse(format!("invalid URL {raw}: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
            query.append_pair("api_key", &self.api_key);
            if let Some(mailto) = &self.mailto {
                query.append_pair("mailto", mailto);
            }
        }
        Ok(url)
    }

    async fn get_json(&self, url: Url, context: &str) -> Result<Value> {
        let response = self.client.get(url.as_str(), HeaderMap::new()).await?;
        let response = ensure_status(response, context, |s| s.is_success()).await?;
        read_json(response, context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn work(id: &str, doi: Option<&str>, year: i32) -> Value {
        json!({
            "id": format!("https://openalex.org/{id}"),
            "ids": {"openalex": format!("https://openalex.org/{id}"), "doi": doi},
            "display_name": format!("Work {id}"),
            "publication_year": year,
            "type": "article",
            "cited_by_count": 3
        })
    }

    fn test_source(server: &Server) -> OpenAlexSource {
        let http = HttpClient::new(USER_AGENT, Duration::from_secs(5), RetryPolicy::new(5, Duration::ZERO))
            .unwrap();
        OpenAlexSource::with_client(http, &server.url(), "key-1", Some("me@example.org".to_string()))
    }

    #[test]
    fn citation_window_zero_fills() {
        let counts = [YearCount { year: 2023, cited_by_count: 5 }];
        let window = citation_window(&counts, 2024, 5);
        assert_eq!(window.years, vec![2020, 2021, 2022, 2023, 2024]);
        assert_eq!(window.counts, vec![0, 0, 0, 5, 0]);

        let ten = citation_window(&counts, 2024, 10);
        assert_eq!(ten.years.first(), Some(&2015));
        assert_eq!(ten.counts.iter().sum::<u64>(), 5);
    }

    #[test]
    fn venue_fallback_chain() {
        let primary = OpenAlexWork::from_json(&json!({
            "host_venue": {"display_name": null},
            "primary_location": {"source": {"display_name": "Optica"}},
            "locations": [{"source": {"display_name": "arXiv"}}]
        }));
        assert_eq!(primary.venue, "Optica");

        let first_location = OpenAlexWork::from_json(&json!({
            "primary_location": {"source": null},
            "locations": [{"source": {"display_name": "arXiv"}}]
        }));
        assert_eq!(first_location.venue, "arXiv");

        let host = OpenAlexWork::from_json(&json!({
            "host_venue": {"display_name": "Nature Photonics"},
            "primary_location": {"source": {"display_name": "Optica"}}
        }));
        assert_eq!(host.venue, "Nature Photonics");

        assert_eq!(OpenAlexWork::from_json(&json!({"locations": []})).venue, "");
    }

    #[test]
    fn year_falls_back_to_publication_date() {
        let w = OpenAlexWork::from_json(&json!({"publication_date": "2019-07-01"}));
        assert_eq!(w.year(), Some(2019));
        let w = OpenAlexWork::from_json(&json!({"publication_date": "n.d."}));
        assert_eq!(w.year(), None);
        let w = OpenAlexWork::from_json(&json!({"publication_year": 2020, "publication_date": "2019-01-01"}));
        assert_eq!(w.year(), Some(2020));
    }

    #[test]
    fn maps_bibliographic_fields() {
        let w = OpenAlexWork::from_json(&json!({
            "id": "https://openalex.org/W1",
            "ids": {"doi": "http://doi.org/10.1364/OE.1"},
            "display_name": "Fast optics",
            "authorships": [
                {"author": {"display_name": "A. Author"}},
                {"author": {"display_name": ""}},
                {"author": {}}
            ],
            "biblio": {"volume": "12", "issue": "3", "first_page": "100", "last_page": "110"},
            "cited_by_count": 9,
            "counts_by_year": [{"year": 2024, "cited_by_count": 4}]
        }));
        let publication = w.into_publication(2024);
        assert_eq!(publication.id, "doi-10-1364-oe-1");
        assert_eq!(publication.doi, "10.1364/OE.1");
        assert_eq!(publication.doi_url.as_deref(), Some("https://doi.org/10.1364/OE.1"));
        assert_eq!(publication.authors, vec!["A. Author"]);
        assert_eq!(publication.pages.as_deref(), Some("100-110"));
        assert_eq!(publication.citations_total, Some(9));
        assert_eq!(publication.citations_last5.unwrap().counts, vec![0, 0, 0, 0, 4]);
        assert_eq!(publication.source.openalex_id.as_deref(), Some("https://openalex.org/W1"));
    }

    #[test]
    fn id_falls_back_to_openalex_key() {
        let publication = OpenAlexWork::from_json(&work("W42", None, 2020)).into_publication(2024);
        assert_eq!(publication.id, "openalex-w42");
        assert_eq!(publication.doi_url.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn resolve_author_sends_key_and_mailto() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/authors/orcid:0000-0001")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("api_key".to_string(), "key-1".to_string()),
                Matcher::UrlEncoded("mailto".to_string(), "me@example.org".to_string()),
            ]))
            .with_status(200)
            .with_body(r#"{"id": "https://openalex.org/A5"}"#)
            .create_async()
            .await;

        let author = test_source(&server).resolve_author("0000-0001").await.unwrap();
        assert_eq!(author, "https://openalex.org/A5");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unknown_author_is_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/authors/orcid:0000-0001")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let err = test_source(&server).resolve_author("0000-0001").await.unwrap_err();
        assert!(matches!(err, SyncError::ApiError(_, _)));
    }

    #[tokio::test]
    async fn pagination_follows_cursor() {
        let mut server = Server::new_async().await;
        let first = server
            .mock("GET", "/works")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("cursor".to_string(), "*".to_string()),
                Matcher::UrlEncoded("filter".to_string(), "authorships.author.id:A5".to_string()),
                Matcher::UrlEncoded("sort".to_string(), "publication_date:desc".to_string()),
            ]))
            .with_status(200)
            .with_body(
                json!({
                    "meta": {"next_cursor": "page2"},
                    "results": [work("W1", Some("10.1/a"), 2024), work("W2", None, 2023)]
                })
                .to_string(),
            )
            .create_async()
            .await;
        let second = server
            .mock("GET", "/works")
            .match_query(Matcher::UrlEncoded("cursor".to_string(), "page2".to_string()))
            .with_status(200)
            .with_body(
                json!({
                    "meta": {"next_cursor": null},
                    "results": [work("W3", None, 2020)]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let works = test_source(&server).fetch_works("A5", 200).await.unwrap();
        let keys: Vec<&str> = works.iter().map(OpenAlexWork::key).collect();
        assert_eq!(keys, vec!["W1", "W2", "W3"]);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn pagination_stops_exactly_at_cap() {
        let mut server = Server::new_async().await;
        let _first = server
            .mock("GET", "/works")
            .match_query(Matcher::UrlEncoded("cursor".to_string(), "*".to_string()))
            .with_status(200)
            .with_body(
                json!({
                    "meta": {"next_cursor": "page2"},
                    "results": [work("W1", None, 2024), work("W2", None, 2023), work("W3", None, 2022)]
                })
                .to_string(),
            )
            .create_async()
            .await;
        let second = server
            .mock("GET", "/works")
            .match_query(Matcher::UrlEncoded("cursor".to_string(), "page2".to_string()))
            .with_status(200)
            .with_body(r#"{"meta": {}, "results": []}"#)
            .expect(0)
            .create_async()
            .await;

        let works = test_source(&server).fetch_works("A5", 2).await.unwrap();
        assert_eq!(works.len(), 2);
        assert_eq!(works[1].key(), "W2");
        second.assert_async().await;
    }
}
