pub mod openalex;
pub mod orcid;

pub use openalex::{OpenAlexSource, OpenAlexWork};
pub use orcid::{OrcidClient, OrcidWork};
