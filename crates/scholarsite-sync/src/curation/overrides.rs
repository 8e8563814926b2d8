use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use scholarsite_core::storage::{read_json_lenient, write_json};
use scholarsite_core::{LinkKind, Publication};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::Result;

/// A curated patch for one publication, matched by `id` or `doi`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublicationOverride {
    pub id: Option<String>,
    pub doi: Option<String>,
    pub selected: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub my_role: Option<String>,
    pub authors: Option<Vec<String>>,
    pub links: BTreeMap<String, String>,
}

impl PublicationOverride {
    /// `None` when `v` is not an object. Fields of the wrong type are ignored.
    pub fn from_json(v: &Value) -> Option<Self> {
        let obj = v.as_object()?;

        let strings = |field: &str| {
            obj.get(field).and_then(Value::as_array).map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(ToOwned::to_owned)
                    .collect::<Vec<_>>()
            })
        };

        let links = obj
            .get("links")
            .and_then(Value::as_object)
            .map(|links| {
                LinkKind::ALL
                    .iter()
                    .filter_map(|kind| {
                        let url = links.get(kind.as_str())?.as_str()?;
                        Some((kind.as_str().to_string(), url.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            id: obj
                .get("id")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned),
            doi: obj
                .get("doi")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned),
            selected: obj.get("selected").map(is_truthy),
            tags: strings("tags"),
            my_role: obj
                .get("my_role")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned),
            authors: strings("authors"),
            links,
        })
    }

    pub fn apply_to(&self, target: &mut Publication) {
        if let Some(selected) = self.selected {
            target.selected = selected;
        }
        if let Some(tags) = &self.tags {
            target.tags = tags.clone();
        }
        if let Some(role) = &self.my_role {
            target.my_role = role.clone();
        }
        if let Some(authors) = &self.authors {
            target.authors = authors.clone();
        }
        for (kind, url) in &self.links {
            target.links.insert(kind.clone(), url.clone());
        }
    }
}

/// JSON truthiness: `false`, `null`, `0`, `""`, `[]` and `{}` are false.
fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Overrides from `path`. Missing, unparseable or non-array files yield none.
pub fn load_overrides(path: &Path) -> Vec<PublicationOverride> {
    match read_json_lenient(path) {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(PublicationOverride::from_json)
            .collect(),
        Some(_) => {
            warn!(path = %path.display(), "overrides file is not a JSON array, ignoring");
            Vec::new()
        }
        None => Vec::new(),
    }
}

/// Create an empty `[]` overrides file if none exists. Returns whether it
/// was created; an existing file is never touched.
pub fn ensure_overrides_file(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    write_json(path, &Value::Array(Vec::new()))?;
    info!(path = %path.display(), "created empty overrides file");
    Ok(true)
}

/// Apply `overrides` in order. A target is found by `id` first, then by
/// case-insensitive `doi`; overrides with no target are skipped. Returns the
/// number applied.
pub fn apply_overrides(publications: &mut [Publication], overrides: &[PublicationOverride]) -> usize {
    let by_id: HashMap<String, usize> = publications
        .iter()
        .enumerate()
        .map(|(i, p)| (p.id.clone(), i))
        .collect();
    let by_doi: HashMap<String, usize> = publications
        .iter()
        .enumerate()
        .filter(|(_, p)| p.has_doi())
        .map(|(i, p)| (p.doi.to_lowercase(), i))
        .collect();

    let mut applied = 0;
    for entry in overrides {
        let target = entry
            .id
            .as_ref()
            .and_then(|id| by_id.get(id))
            .or_else(|| {
                entry
                    .doi
                    .as_ref()
                    .and_then(|doi| by_doi.get(&doi.to_lowercase()))
            });

        match target {
            Some(&index) => {
                entry.apply_to(&mut publications[index]);
                applied += 1;
            }
            None => debug!(id = ?entry.id, doi = ?entry.doi, "override matches no publication"),
        }
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn publications() -> Vec<Publication> {
        let mut a = Publication::new("doi-10-1-a", "A");
        a.doi = "10.1/A".to_string();
        a.set_link(LinkKind::Doi, "https://doi.org/10.1/A");
        a.set_link(LinkKind::Url, "https://example.org/a");
        let b = Publication::new("orcid-putcode-7", "B");
        vec![a, b]
    }

    fn overrides(v: Value) -> Vec<PublicationOverride> {
        v.as_array()
            .unwrap()
            .iter()
            .filter_map(PublicationOverride::from_json)
            .collect()
    }

    #[test]
    fn applies_by_id_and_doi() {
        let mut pubs = publications();
        let entries = overrides(json!([
            {"id": "orcid-putcode-7", "selected": true, "tags": ["talk"], "my_role": "speaker"},
            {"doi": "10.1/a", "authors": ["Me", "You"], "links": {"pdf": "/papers/a.pdf"}}
        ]));

        assert_eq!(apply_overrides(&mut pubs, &entries), 2);
        assert!(pubs[1].selected);
        assert_eq!(pubs[1].tags, vec!["talk"]);
        assert_eq!(pubs[1].my_role, "speaker");
        assert_eq!(pubs[0].authors, vec!["Me", "You"]);
        assert_eq!(pubs[0].link(LinkKind::Pdf), Some("/papers/a.pdf"));
        assert_eq!(pubs[0].link(LinkKind::Url), Some("https://example.org/a"));
        assert_eq!(pubs[0].link(LinkKind::Doi), Some("https://doi.org/10.1/A"));
    }

    #[test]
    fn id_miss_falls_back_to_doi() {
        let mut pubs = publications();
        let entries = overrides(json!([{"id": "retired", "doi": "10.1/A", "selected": 1}]));
        assert_eq!(apply_overrides(&mut pubs, &entries), 1);
        assert!(pubs[0].selected);
    }

    #[test]
    fn unmatched_overrides_leave_records_unchanged() {
        let mut pubs = publications();
        let before = pubs.clone();
        let entries = overrides(json!([
            {"id": "nope", "selected": true},
            {"doi": "10.9/none", "tags": ["x"]}
        ]));
        assert_eq!(apply_overrides(&mut pubs, &entries), 0);
        assert_eq!(pubs, before);
    }

    #[test]
    fn wrong_types_and_unknown_fields_ignored() {
        let entry = PublicationOverride::from_json(&json!({
            "id": "orcid-putcode-7",
            "title": "Not patchable",
            "tags": "not-a-list",
            "my_role": 5,
            "links": {"homepage": "https://x", "code": "https://git.example/c"}
        }))
        .unwrap();
        let mut pubs = publications();
        apply_overrides(&mut pubs, &[entry]);
        assert_eq!(pubs[1].title, "B");
        assert!(pubs[1].tags.is_empty());
        assert!(pubs[1].my_role.is_empty());
        assert_eq!(pubs[1].links.len(), 1);
        assert_eq!(pubs[1].link(LinkKind::Code), Some("https://git.example/c"));
    }

    #[test]
    fn selected_uses_truthiness() {
        for (value, expected) in [
            (json!(true), true),
            (json!("yes"), true),
            (json!(0), false),
            (json!(null), false),
            (json!([]), false),
        ] {
            let entry = PublicationOverride::from_json(&json!({"selected": value})).unwrap();
            assert_eq!(entry.selected, Some(expected));
        }
    }

    #[test]
    fn load_tolerates_bad_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("publications.overrides.json");
        assert!(load_overrides(&path).is_empty());

        std::fs::write(&path, "{oops").unwrap();
        assert!(load_overrides(&path).is_empty());

        std::fs::write(&path, r#"{"id": "x"}"#).unwrap();
        assert!(load_overrides(&path).is_empty());

        std::fs::write(&path, r#"[{"id": "x"}, 3]"#).unwrap();
        assert_eq!(load_overrides(&path).len(), 1);
    }

    #[test]
    fn overrides_file_created_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("publications.overrides.json");

        assert!(ensure_overrides_file(&path).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]\n");

        std::fs::write(&path, r#"[{"id": "keep"}]"#).unwrap();
        assert!(!ensure_overrides_file(&path).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"[{"id": "keep"}]"#);
    }
}
