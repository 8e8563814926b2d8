use std::collections::HashSet;
use std::path::Path;

use scholarsite_core::Publication;
use scholarsite_core::storage::read_json_lenient;
use serde_json::Value;

/// Lower-cased DOIs the maintainer wants highlighted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectedDois(HashSet<String>);

impl SelectedDois {
    /// Reads `publications.selected.json`. Missing, unparseable or non-array
    /// files give an empty set.
    pub fn load(path: &Path) -> Self {
        read_json_lenient(path)
            .map(|v| Self::from_json(&v))
            .unwrap_or_default()
    }

    pub fn from_json(v: &Value) -> Self {
        let dois = v
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(|doi| doi.trim().to_lowercase())
                    .filter(|doi| !doi.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Self(dois)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, doi: &str) -> bool {
        self.0.contains(&doi.to_lowercase())
    }

    /// Set `selected` on every record by DOI membership. An empty set leaves
    /// records as they are. Returns how many ended up selected.
    pub fn flag(&self, publications: &mut [Publication]) -> usize {
        if self.is_empty() {
            return publications.iter().filter(|p| p.selected).count();
        }
        for publication in publications.iter_mut() {
            publication.selected = self.contains(&publication.doi);
        }
        publications.iter().filter(|p| p.selected).count()
    }
}
