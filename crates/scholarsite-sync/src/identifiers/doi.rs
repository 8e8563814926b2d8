use once_cell::sync::Lazy;
use regex::Regex;

use crate::identifiers::ids::slugify;

static RESOLVER_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https?://(dx\.)?doi\.org/").unwrap());

static SCHEME_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^doi:\s*").unwrap());

/// Bare DOI from any of the shapes upstream APIs hand out
/// (`https://doi.org/…`, `http://dx.doi.org/…`, `doi:…`, padded with
/// whitespace). Prefixes are stripped until none is left, so stacked
/// prefixes in either order collapse and the function is idempotent.
/// Case is preserved.
pub fn normalize_doi(raw: &str) -> String {
    let mut doi = raw.trim();
    loop {
        let rest = if let Some(m) = RESOLVER_PREFIX.find(doi) {
            &doi[m.end()..]
        } else if let Some(m) = SCHEME_PREFIX.find(doi) {
            &doi[m.end()..]
        } else {
            break;
        };
        doi = rest.trim();
    }
    doi.to_string()
}

/// Record id derived from a bare DOI: `doi-<slug>`.
pub fn doi_id(doi: &str) -> String {
    format!("doi-{}", slugify(doi))
}
