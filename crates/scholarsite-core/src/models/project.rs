use serde_json::Value;

/// One entry of `projects.json`, read leniently: wrong-typed fields fall
/// back to their defaults instead of failing the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Project {
    pub slug: String,
    pub title: String,
    pub year: String,
    pub summary: String,
    pub role: String,
    pub methods: Vec<String>,
}

impl Project {
    /// `None` when `v` is not an object.
    pub fn from_json(v: &Value) -> Option<Self> {
        let obj = v.as_object()?;

        let methods = obj
            .get("methods")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(scalar_text).collect())
            .unwrap_or_default();

        Some(Self {
            slug: obj
                .get("slug")
                .and_then(scalar_text)
                .unwrap_or_else(|| "project".to_string()),
            title: obj
                .get("title")
                .and_then(scalar_text)
                .unwrap_or_else(|| "Untitled project".to_string()),
            year: obj.get("year").and_then(scalar_text).unwrap_or_default(),
            summary: obj.get("summary").and_then(scalar_text).unwrap_or_default(),
            role: obj.get("role").and_then(scalar_text).unwrap_or_default(),
            methods,
        })
    }

    /// Reads the `projects` array of a `projects.json` document.
    pub fn list_from_document(doc: &Value) -> Vec<Self> {
        doc.get("projects")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Self::from_json).collect())
            .unwrap_or_default()
    }
}

/// Text for strings, numbers and booleans; `None` for null and containers.
fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
