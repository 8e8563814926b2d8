pub mod doi;
pub mod ids;

pub use doi::{doi_id, normalize_doi};
pub use ids::{UniqueIds, slugify};
