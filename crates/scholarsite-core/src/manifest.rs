//! Image manifests: `images.json` for each award photo folder.
//!
//! The site's slideshow cannot list directories, so every subfolder of the
//! awards directory gets a manifest naming its image files.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::storage::json::write_json;

pub const MANIFEST_FILE_NAME: &str = "images.json";
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageManifest {
    pub images: Vec<String>,
}

/// Result of writing one folder's manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestReport {
    pub folder: PathBuf,
    pub images: usize,
}

/// Case-insensitive extension match; the file name keeps its case.
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Sorted image file names directly inside `folder`.
pub fn collect_images(folder: &Path) -> Result<ImageManifest> {
    let mut images = Vec::new();
    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_file() && is_image_file(&path) {
            images.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    images.sort();
    Ok(ImageManifest { images })
}

/// Write `images.json` into every immediate subfolder of `awards_dir`.
///
/// A missing awards directory is not an error; there is simply nothing to do.
pub fn generate_award_manifests(awards_dir: &Path) -> Result<Vec<ManifestReport>> {
    if !awards_dir.exists() {
        info!(dir = %awards_dir.display(), "awards directory missing, nothing to do");
        return Ok(Vec::new());
    }

    let mut folders = Vec::new();
    for entry in fs::read_dir(awards_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            folders.push(entry.path());
        }
    }
    folders.sort();

    let mut reports = Vec::with_capacity(folders.len());
    for folder in folders {
        let manifest = collect_images(&folder)?;
        write_json(&folder.join(MANIFEST_FILE_NAME), &manifest)?;
        info!(folder = %folder.display(), images = manifest.images.len(), "wrote manifest");
        reports.push(ManifestReport {
            images: manifest.images.len(),
            folder,
        });
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_manifest_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("2023-best-paper");
        fs::create_dir_all(&folder).unwrap();
        for name in ["c.jpg", "b.txt", "a.PNG"] {
            fs::write(folder.join(name), b"x").unwrap();
        }

        let reports = generate_award_manifests(dir.path()).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].images, 2);

        let written = fs::read_to_string(folder.join(MANIFEST_FILE_NAME)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value, serde_json::json!({"images": ["a.PNG", "c.jpg"]}));
        assert!(written.ends_with('\n'));
    }

    #[test]
    fn test_manifest_regenerates_without_listing_itself() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("award");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("photo.webp"), b"x").unwrap();

        generate_award_manifests(dir.path()).unwrap();
        let second = generate_award_manifests(dir.path()).unwrap();
        assert_eq!(second[0].images, 1);
    }

    #[test]
    fn test_subdirectories_and_loose_files_ignored() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("loose.jpg"), b"x").unwrap();
        let folder = dir.path().join("award");
        fs::create_dir_all(folder.join("nested.jpg")).unwrap();

        let reports = generate_award_manifests(dir.path()).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(collect_images(&folder).unwrap(), ImageManifest::default());
    }

    #[test]
    fn test_missing_awards_dir_is_ok() {
        let dir = TempDir::new().unwrap();
        let reports = generate_award_manifests(&dir.path().join("nope")).unwrap();
        assert!(reports.is_empty());
    }
}
