//! Local curation layered on top of upstream records: override patches
//! (ORCID pipeline) and the selected-DOI list (OpenAlex pipeline).

pub mod overrides;
pub mod selection;

pub use overrides::{PublicationOverride, apply_overrides, ensure_overrides_file, load_overrides};
pub use selection::SelectedDois;
