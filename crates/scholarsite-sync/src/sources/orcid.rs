use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use scholarsite_core::{LinkKind, OrcidConfig, Publication, PublicationSource, doi_url};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Result, SyncError};
use crate::http::{HttpClient, RetryPolicy, ensure_status, read_json};
use crate::identifiers::{doi_id, normalize_doi};

pub const USER_AGENT: &str = "scholarsite-orcid-sync";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalId {
    pub kind: String,
    pub value: String,
}

/// The parts of an ORCID work record the site uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrcidWork {
    pub put_code: Option<i64>,
    pub title: String,
    pub year: Option<i32>,
    pub work_type: String,
    pub venue: String,
    pub external_ids: Vec<ExternalId>,
    pub url: Option<String>,
}

impl OrcidWork {
    pub fn from_json(v: &Value) -> Self {
        let title = v["title"]["title"]["value"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        let year = v["publication-date"]["year"]["value"]
            .as_str()
            .map(str::trim)
            .filter(|y| !y.is_empty() && y.chars().all(|c| c.is_ascii_digit()))
            .and_then(|y| y.parse().ok());

        let external_ids = v["external-ids"]["external-id"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|ext| {
                        let value = ext["external-id-value"].as_str()?;
                        if value.is_empty() {
                            return None;
                        }
                        Some(ExternalId {
                            kind: ext["external-id-type"]
                                .as_str()
                                .unwrap_or_default()
                                .to_lowercase(),
                            value: value.to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            put_code: v["put-code"].as_i64(),
            title,
            year,
            work_type: v["type"].as_str().unwrap_or_default().to_string(),
            venue: v["journal-title"]["value"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            external_ids,
            url: v["url"]["value"]
                .as_str()
                .filter(|u| !u.is_empty())
                .map(ToOwned::to_owned),
        }
    }

    /// First DOI among the external ids, normalized.
    pub fn doi(&self) -> Option<String> {
        self.external_ids
            .iter()
            .find(|ext| ext.kind == "doi")
            .map(|ext| normalize_doi(&ext.value))
            .filter(|doi| !doi.is_empty())
    }

    /// Canonical record. `putcode` is the code the work was fetched by and
    /// stands in when the detail record omits its own.
    pub fn into_publication(self, orcid_id: &str, putcode: i64) -> Publication {
        let put_code = self.put_code.unwrap_or(putcode);
        let doi = self.doi().unwrap_or_default();

        let mut publication = Publication {
            id: if doi.is_empty() {
                format!("orcid-putcode-{put_code}")
            } else {
                doi_id(&doi)
            },
            title: self.title,
            year: self.year,
            kind: self.work_type,
            venue: self.venue,
            source: PublicationSource {
                orcid_putcode: Some(put_code),
                orcid_path: Some(format!("/{orcid_id}/work/{put_code}")),
                ..Default::default()
            },
            ..Default::default()
        };

        if !doi.is_empty() {
            publication.set_link(LinkKind::Doi, doi_url(&doi));
        }
        if let Some(url) = self
            .url
            .or_else(|| {
                self.external_ids
                    .into_iter()
                    .find(|ext| ext.kind == "url")
                    .map(|ext| ext.value)
            })
        {
            publication.set_link(LinkKind::Url, url);
        }
        publication.doi = doi;
        publication
    }
}

/// Put-codes listed in a `/works` response, first occurrence kept.
pub fn parse_putcodes(payload: &Value) -> Vec<i64> {
    let mut putcodes: Vec<i64> = Vec::new();
    let groups = payload["group"].as_array().map(Vec::as_slice).unwrap_or_default();
    for group in groups {
        let summaries = group["work-summary"]
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default();
        for code in summaries.iter().filter_map(|s| s["put-code"].as_i64()) {
            if !putcodes.contains(&code) {
                putcodes.push(code);
            }
        }
    }
    putcodes
}

pub struct OrcidClient {
    client: HttpClient,
    token_url: String,
    api_base: String,
    orcid_id: String,
}

impl OrcidClient {
    pub fn new(config: &OrcidConfig, orcid_id: &str) -> Result<Self> {
        let policy = RetryPolicy::new(
            config.max_attempts,
            Duration::from_millis(config.retry_base_delay_ms),
        );
        let client = HttpClient::new(USER_AGENT, Duration::from_secs(config.timeout_secs), policy)?
            .with_min_interval(Duration::from_millis(config.request_interval_ms));
        Ok(Self::with_client(
            client,
            &config.token_url(),
            &config.api_base(),
            orcid_id,
        ))
    }

    pub fn with_client(client: HttpClient, token_url: &str, api_base: &str, orcid_id: &str) -> Self {
        Self {
            client,
            token_url: token_url.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            orcid_id: orcid_id.to_string(),
        }
    }

    pub fn orcid_id(&self) -> &str {
        &self.orcid_id
    }

    /// Client-credentials token scoped to `/read-public`.
    pub async fn fetch_token(&self, client_id: &str, client_secret: &str) -> Result<String> {
        let form = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("grant_type", "client_credentials"),
            ("scope", "/read-public"),
        ];
        let response = self
            .client
            .post_form(&self.token_url, &form, HeaderMap::new())
            .await?;
        let response = ensure_status(response, "Token request", |s| s == StatusCode::OK).await?;
        let payload: Value = read_json(response, "Token request").await?;
        payload["access_token"]
            .as_str()
            .filter(|t| !t.is_empty())
            .map(ToOwned::to_owned)
            .ok_or_else(|| {
                SyncError::MissingField("Token".to_string(), "access_token".to_string())
            })
    }

    pub async fn list_putcodes(&self, token: &str) -> Result<Vec<i64>> {
        let url = format!("{}/{}/works", self.api_base, self.orcid_id);
        let response = self.client.get(&url, bearer(token)?).await?;
        let response = ensure_status(response, "Works request", |s| s == StatusCode::OK).await?;
        let payload: Value = read_json(response, "Works request").await?;
        let putcodes = parse_putcodes(&payload);
        info!(orcid = %self.orcid_id, works = putcodes.len(), "listed ORCID works");
        Ok(putcodes)
    }

    pub async fn fetch_work(&self, token: &str, putcode: i64) -> Result<OrcidWork> {
        let url = format!("{}/{}/work/{putcode}", self.api_base, self.orcid_id);
        let context = format!("Work request ({putcode})");
        let response = self.client.get(&url, bearer(token)?).await?;
        let response = ensure_status(response, &context, |s| s == StatusCode::OK).await?;
        let payload: Value = read_json(response, &context).await?;
        debug!(putcode, "fetched ORCID work");
        Ok(OrcidWork::from_json(&payload))
    }
}

fn bearer(token: &str) -> Result<HeaderMap> {
    let value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| SyncError::Parse("access token is not a valid header value".to_string()))?;
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}
