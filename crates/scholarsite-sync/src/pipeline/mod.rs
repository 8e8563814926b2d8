//! End-to-end publication syncs. Each run fetches, curates, sorts and writes
//! `publications.json`, reporting whether the file content changed.

pub mod finalize;
mod openalex;
mod orcid;

pub use finalize::{
    PublicationsDocument, SortOrder, count_selected, count_with_doi, ensure_required_fields,
    sort_publications,
};
pub use openalex::{OpenAlexSyncReport, build_openalex_publications, run_openalex_sync};
pub use orcid::{OrcidSyncReport, build_orcid_publications, run_orcid_sync};
