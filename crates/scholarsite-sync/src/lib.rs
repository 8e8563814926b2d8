//! ORCID and OpenAlex publication lists, curated and
//! written for the static site.

pub mod curation;
pub mod error;
pub mod http;
pub mod identifiers;
pub mod pipeline;
pub mod sources;

pub use error::{Result, SyncError};
pub use http::{HttpClient, RetryPolicy};
pub use pipeline::{OpenAlexSyncReport, OrcidSyncReport, run_openalex_sync, run_orcid_sync};
