use std::path::PathBuf;

use scholarsite_core::storage::{write_json, write_json_if_changed};
use scholarsite_core::{Publication, SiteConfig};
use serde::Serialize;
use tracing::info;

use super::finalize::{
    PublicationsDocument, SortOrder, count_selected, count_with_doi, ensure_required_fields,
    sort_publications,
};
use crate::curation::{PublicationOverride, apply_overrides, ensure_overrides_file, load_overrides};
use crate::error::Result;
use crate::identifiers::UniqueIds;
use crate::sources::OrcidClient;

#[derive(Debug, Clone, Serialize)]
pub struct OrcidSyncReport {
    pub fetched_works: usize,
    pub with_doi: usize,
    pub selected: usize,
    pub overrides_applied: usize,
    pub overrides_created: bool,
    pub publications: usize,
    pub changed: bool,
    pub raw_output: PathBuf,
    pub output: PathBuf,
}

/// Merge overrides into freshly normalized ORCID records and put them in
/// final order. An empty input becomes the single placeholder record.
/// Returns the records and how many overrides matched.
pub fn build_orcid_publications(
    mut publications: Vec<Publication>,
    overrides: &[PublicationOverride],
) -> (Vec<Publication>, usize) {
    let applied = apply_overrides(&mut publications, overrides);
    if publications.is_empty() {
        publications.push(Publication::placeholder());
    }
    let mut publications = ensure_required_fields(publications);
    sort_publications(&mut publications, SortOrder::Title);
    (publications, applied)
}

pub async fn run_orcid_sync(config: &SiteConfig) -> Result<OrcidSyncReport> {
    let (client_id, client_secret) = config.orcid.credentials()?;
    let client = OrcidClient::new(&config.orcid, &config.author.orcid_id)?;
    info!(
        env = %config.orcid.environment,
        orcid = %config.author.orcid_id,
        "starting ORCID sync"
    );

    let token = client.fetch_token(client_id, client_secret).await?;
    let putcodes = client.list_putcodes(&token).await?;

    let mut ids = UniqueIds::new();
    let mut publications = Vec::with_capacity(putcodes.len());
    for &putcode in &putcodes {
        let work = client.fetch_work(&token, putcode).await?;
        let mut publication = work.into_publication(client.orcid_id(), putcode);
        publication.id = ids.claim(std::mem::take(&mut publication.id), &putcode.to_string());
        publications.push(publication);
    }
    let with_doi = count_with_doi(&publications);

    let raw_output = config.orcid_raw_path();
    write_json(&raw_output, &publications)?;

    let overrides_path = config.overrides_path();
    let overrides_created = ensure_overrides_file(&overrides_path)?;
    let overrides = load_overrides(&overrides_path);

    let (publications, overrides_applied) = build_orcid_publications(publications, &overrides);
    let output = config.publications_path();
    let changed = write_json_if_changed(
        &output,
        &PublicationsDocument {
            publications: &publications,
        },
    )?;

    let report = OrcidSyncReport {
        fetched_works: putcodes.len(),
        with_doi,
        selected: count_selected(&publications),
        overrides_applied,
        overrides_created,
        publications: publications.len(),
        changed,
        raw_output,
        output,
    };
    info!(
        works = report.fetched_works,
        with_doi = report.with_doi,
        selected = report.selected,
        changed = report.changed,
        "ORCID sync finished"
    );
    Ok(report)
}
