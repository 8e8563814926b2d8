pub mod config;
pub mod error;
pub mod manifest;
pub mod models;
pub mod pages;
pub mod storage;

pub use config::{AuthorConfig, OpenAlexConfig, OrcidConfig, OrcidEnvironment, PathsConfig, SiteConfig};
pub use error::{Result, SiteError};
pub use models::*;

pub use manifest::{ManifestReport, generate_award_manifests};
pub use pages::{generate_project_pages, render_project};
pub use storage::json::{write_json, write_json_if_changed};
