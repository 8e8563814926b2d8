use std::collections::HashSet;

/// Lowercase, runs of anything outside `[a-z0-9]` become one `-`, no
/// leading or trailing `-`.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;
    for ch in value.to_lowercase().chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Hands out record ids that are unique within one run.
///
/// A repeated id gets `-<disambiguator>` appended (the ORCID put-code or the
/// OpenAlex key). If that is taken too, a counter follows. Records are never
/// dropped and the outcome depends only on input order.
#[derive(Debug, Default)]
pub struct UniqueIds {
    seen: HashSet<String>,
}

impl UniqueIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, id: String, disambiguator: &str) -> String {
        let id = if self.seen.contains(&id) {
            let suffixed = format!("{id}-{disambiguator}");
            let mut candidate = suffixed.clone();
            let mut n = 2u32;
            while self.seen.contains(&candidate) {
                candidate = format!("{suffixed}-{n}");
                n += 1;
            }
            candidate
        } else {
            id
        };
        self.seen.insert(id.clone());
        id
    }
}
