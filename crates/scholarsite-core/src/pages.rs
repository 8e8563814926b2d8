//! Static project pages rendered from `projects.json` by placeholder
//! substitution into an HTML template.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Result, SiteError};
use crate::models::Project;
use crate::storage::json::read_json;

const TO_BE_ADDED: &str = "(to be added)";
const WHY_IT_MATTERS: &str = "This work supports rigorous, reproducible nano-optics experiments and helps translate measurements into device-relevant insights.";

const INDEX_REDIRECT: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta http-equiv="refresh" content="0; url=../projects.html" />
  <title>Projects</title>
</head>
<body>
  <p>Redirecting to <a href="../projects.html">projects</a>...</p>
</body>
</html>
"#;

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Lowercase, runs outside `[a-z0-9-]` become `-`, never empty.
pub fn sanitize_slug(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    for ch in value.trim().to_lowercase().chars() {
        let ch = if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' {
            ch
        } else {
            '-'
        };
        if ch == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(ch);
    }
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "project".to_string()
    } else {
        slug.to_string()
    }
}

fn methods_list(methods: &[String]) -> String {
    if methods.is_empty() {
        return format!("<p>Methods: {TO_BE_ADDED}</p>");
    }
    let items: String = methods
        .iter()
        .map(|m| format!("<li>{}</li>", escape_html(m)))
        .collect();
    format!("<ul>{items}</ul>")
}

fn methods_pills(methods: &[String]) -> String {
    methods
        .iter()
        .map(|m| format!("<span class=\"pill\">{}</span>", escape_html(m)))
        .collect()
}

fn why_it_matters(summary: &str) -> String {
    let summary = summary.trim();
    if summary.is_empty() {
        WHY_IT_MATTERS.to_string()
    } else {
        format!("{} {WHY_IT_MATTERS}", escape_html(summary))
    }
}

/// Substitute every `{{PLACEHOLDER}}` of `template` for one project.
pub fn render_project(template: &str, project: &Project) -> String {
    let year = escape_html(&project.year);
    let role = escape_html(&project.role);

    let replacements = [
        ("{{TITLE}}", escape_html(&project.title)),
        ("{{YEAR}}", year.clone()),
        ("{{SUMMARY}}", escape_html(&project.summary)),
        ("{{ROLE}}", if role.is_empty() { TO_BE_ADDED.to_string() } else { role }),
        ("{{METHODS_LIST}}", methods_list(&project.methods)),
        ("{{METHODS_PILLS}}", methods_pills(&project.methods)),
        ("{{WHY_IT_MATTERS}}", why_it_matters(&project.summary)),
        ("{{TIMELINE}}", if year.is_empty() { TO_BE_ADDED.to_string() } else { year }),
        ("{{NAV_ACTIVE_PROJECTS}}", "active".to_string()),
    ];

    replacements
        .iter()
        .fold(template.to_string(), |page, (key, value)| page.replace(key, value))
}

/// Render one page per project plus an `index.html` redirect.
///
/// Returns the written paths, index last.
pub fn generate_project_pages(
    projects_json: &Path,
    template_path: &Path,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    if !projects_json.exists() {
        return Err(SiteError::MissingInput(projects_json.display().to_string()));
    }
    if !template_path.exists() {
        return Err(SiteError::MissingInput(template_path.display().to_string()));
    }

    let doc = read_json(projects_json)?;
    let projects = Project::list_from_document(&doc);
    let template = fs::read_to_string(template_path)?;

    fs::create_dir_all(output_dir)?;
    let mut written = Vec::with_capacity(projects.len() + 1);
    for project in &projects {
        let path = output_dir.join(format!("{}.html", sanitize_slug(&project.slug)));
        fs::write(&path, render_project(&template, project))?;
        written.push(path);
    }

    let index = output_dir.join("index.html");
    fs::write(&index, INDEX_REDIRECT)?;
    written.push(index);

    info!(pages = projects.len(), "generated project pages");
    Ok(written)
}
