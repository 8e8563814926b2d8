use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const DOI_RESOLVER: &str = "https://doi.org/";
pub const PLACEHOLDER_ID: &str = "placeholder-000";

/// Link kind → URL. Keys are drawn from [`LinkKind`].
pub type Links = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Doi,
    Url,
    Pdf,
    Code,
    Data,
    Arxiv,
}

impl LinkKind {
    pub const ALL: [LinkKind; 6] = [
        LinkKind::Pdf,
        LinkKind::Code,
        LinkKind::Data,
        LinkKind::Arxiv,
        LinkKind::Doi,
        LinkKind::Url,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LinkKind::Doi => "doi",
            LinkKind::Url => "url",
            LinkKind::Pdf => "pdf",
            LinkKind::Code => "code",
            LinkKind::Data => "data",
            LinkKind::Arxiv => "arxiv",
        }
    }
}

/// Resolver URL for a bare DOI.
pub fn doi_url(doi: &str) -> String {
    format!("{DOI_RESOLVER}{doi}")
}

/// Where a record came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orcid_putcode: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orcid_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openalex_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<bool>,
}

/// Yearly citation counts over a fixed window, ascending by year.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationWindow {
    pub years: Vec<i32>,
    pub counts: Vec<u64>,
}

/// Canonical publication record written to `publications.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Publication {
    pub id: String,
    pub title: String,
    pub year: Option<i32>,
    #[serde(rename = "type")]
    pub kind: String,
    pub venue: String,
    pub doi: String,
    pub links: Links,
    pub tags: Vec<String>,
    pub selected: bool,
    pub my_role: String,
    pub authors: Vec<String>,
    pub source: PublicationSource,

    // OpenAlex bibliographic detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub openalex_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub openalex_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub citations_total: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub citations_last5: Option<CitationWindow>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub citations_by_year: Option<CitationWindow>,
}

impl Publication {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// Stand-in record used when the upstream profile has no works, so the
    /// site never renders an empty list.
    pub fn placeholder() -> Self {
        Self {
            id: PLACEHOLDER_ID.to_string(),
            title: "Placeholder - ORCID returned no works".to_string(),
            tags: vec!["placeholder".to_string()],
            source: PublicationSource {
                placeholder: Some(true),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn has_doi(&self) -> bool {
        !self.doi.is_empty()
    }

    pub fn link(&self, kind: LinkKind) -> Option<&str> {
        self.links.get(kind.as_str()).map(String::as_str)
    }

    pub fn set_link(&mut self, kind: LinkKind, url: impl Into<String>) {
        self.links.insert(kind.as_str().to_string(), url.into());
    }

    /// Fill in derived fields so every record carries the same shape.
    pub fn ensure_required_fields(&mut self) {
        self.doi = self.doi.trim().to_string();
        if self.has_doi() && self.link(LinkKind::Doi).is_none() {
            let url = doi_url(&self.doi);
            self.set_link(LinkKind::Doi, url);
        }
    }

    /// Journal for OpenAlex records, venue otherwise.
    pub fn journal_or_venue(&self) -> &str {
        self.journal.as_deref().unwrap_or(&self.venue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_record_serializes_uniform_schema() {
        let value = serde_json::to_value(Publication::new("x", "Title")).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "x",
                "title": "Title",
                "year": null,
                "type": "",
                "venue": "",
                "doi": "",
                "links": {},
                "tags": [],
                "selected": false,
                "my_role": "",
                "authors": [],
                "source": {}
            })
        );
    }

    #[test]
    fn test_ensure_required_fields_synthesizes_doi_link() {
        let mut publication = Publication::new("doi-10-1000-xyz123", "T");
        publication.doi = "10.1000/xyz123".to_string();
        publication.ensure_required_fields();
        assert_eq!(
            publication.link(LinkKind::Doi),
            Some("https://doi.org/10.1000/xyz123")
        );
    }

    #[test]
    fn test_ensure_required_fields_keeps_existing_doi_link() {
        let mut publication = Publication::new("p", "T");
        publication.doi = "10.1/a".to_string();
        publication.set_link(LinkKind::Doi, "https://example.org/custom");
        publication.ensure_required_fields();
        assert_eq!(publication.link(LinkKind::Doi), Some("https://example.org/custom"));
    }

    #[test]
    fn test_placeholder() {
        let placeholder = Publication::placeholder();
        assert_eq!(placeholder.id, "placeholder-000");
        assert_eq!(placeholder.tags, vec!["placeholder"]);
        assert_eq!(placeholder.source.placeholder, Some(true));
        assert!(placeholder.year.is_none());
    }

    #[test]
    fn test_deserialize_with_missing_fields() {
        let publication: Publication =
            serde_json::from_value(json!({"id": "a", "title": "T", "year": 2020})).unwrap();
        assert_eq!(publication.year, Some(2020));
        assert!(publication.tags.is_empty());
        assert!(!publication.selected);
    }
}
