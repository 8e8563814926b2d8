use std::cmp::Reverse;

use scholarsite_core::Publication;
use serde::Serialize;

/// Sort position of records without a year: after every dated record.
pub const MISSING_YEAR: i32 = -1;

/// Tie-break applied after descending year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Case-insensitive title.
    Title,
    /// Case-insensitive journal, then title.
    JournalThenTitle,
}

/// `{"publications": [...]}` document written by the ORCID pipeline.
#[derive(Debug, Serialize)]
pub struct PublicationsDocument<'a> {
    pub publications: &'a [Publication],
}

pub fn ensure_required_fields(mut publications: Vec<Publication>) -> Vec<Publication> {
    for publication in &mut publications {
        publication.ensure_required_fields();
    }
    publications
}

/// Descending year, then `order`, then id so equal keys still land in a
/// fixed order regardless of fetch order.
pub fn sort_publications(publications: &mut [Publication], order: SortOrder) {
    publications.sort_by_cached_key(|p| {
        let journal = match order {
            SortOrder::Title => String::new(),
            SortOrder::JournalThenTitle => p.journal_or_venue().to_lowercase(),
        };
        (
            Reverse(p.year.unwrap_or(MISSING_YEAR)),
            journal,
            p.title.to_lowercase(),
            p.id.clone(),
        )
    });
}

pub fn count_with_doi(publications: &[Publication]) -> usize {
    publications.iter().filter(|p| p.has_doi()).count()
}

pub fn count_selected(publications: &[Publication]) -> usize {
    publications.iter().filter(|p| p.selected).count()
}
