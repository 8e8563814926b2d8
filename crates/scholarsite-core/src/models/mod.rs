pub mod project;
pub mod publication;

pub use project::Project;
pub use publication::{
    CitationWindow, DOI_RESOLVER, LinkKind, Links, PLACEHOLDER_ID, Publication, PublicationSource,
    doi_url,
};
