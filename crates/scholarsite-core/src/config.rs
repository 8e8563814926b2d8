use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SiteError};

pub const DEFAULT_ORCID_ID: &str = "0000-0003-1850-2327";
pub const CONFIG_FILE_NAME: &str = "scholarsite.toml";

/// Root configuration, loaded from `<root>/scholarsite.toml` and overlaid
/// with environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub paths: PathsConfig,
    pub author: AuthorConfig,
    pub orcid: OrcidConfig,
    pub openalex: OpenAlexConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub root: PathBuf,
    pub data_dir: PathBuf,
    pub awards_dir: PathBuf,
    pub projects_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorConfig {
    pub orcid_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrcidConfig {
    pub environment: OrcidEnvironment,
    /// Overrides the token endpoint implied by `environment`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    /// Overrides the API base implied by `environment`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    pub request_interval_ms: u64,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,

    #[serde(skip)]
    pub client_id: Option<String>,
    #[serde(skip)]
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAlexConfig {
    pub api_base: String,
    pub max_works: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mailto: Option<String>,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,

    #[serde(skip)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrcidEnvironment {
    #[default]
    Prod,
    Sandbox,
}

impl OrcidEnvironment {
    pub fn token_url(self) -> &'static str {
        match self {
            Self::Prod => "https://orcid.org/oauth/token",
            Self::Sandbox => "https://sandbox.orcid.org/oauth/token",
        }
    }

    pub fn api_base(self) -> &'static str {
        match self {
            Self::Prod => "https://pub.orcid.org/v3.0",
            Self::Sandbox => "https://pub.sandbox.orcid.org/v3.0",
        }
    }
}

impl FromStr for OrcidEnvironment {
    type Err = SiteError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "prod" => Ok(Self::Prod),
            "sandbox" => Ok(Self::Sandbox),
            _ => Err(SiteError::Config(
                "ORCID_ENV must be 'prod' or 'sandbox'".to_string(),
            )),
        }
    }
}

impl fmt::Display for OrcidEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prod => write!(f, "prod"),
            Self::Sandbox => write!(f, "sandbox"),
        }
    }
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            data_dir: PathBuf::from("assets").join("data"),
            awards_dir: PathBuf::from("images").join("Awards"),
            projects_dir: PathBuf::from("projects"),
        }
    }
}

impl Default for AuthorConfig {
    fn default() -> Self {
        Self {
            orcid_id: DEFAULT_ORCID_ID.to_string(),
        }
    }
}

impl Default for OrcidConfig {
    fn default() -> Self {
        Self {
            environment: OrcidEnvironment::Prod,
            token_url: None,
            api_base: None,
            request_interval_ms: 150,
            timeout_secs: 30,
            max_attempts: 5,
            retry_base_delay_ms: 500,
            client_id: None,
            client_secret: None,
        }
    }
}

impl Default for OpenAlexConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openalex.org".to_string(),
            max_works: 200,
            mailto: None,
            timeout_secs: 10,
            max_attempts: 5,
            retry_base_delay_ms: 600,
            api_key: None,
        }
    }
}

impl OrcidConfig {
    pub fn token_url(&self) -> String {
        self.token_url
            .clone()
            .unwrap_or_else(|| self.environment.token_url().to_string())
    }

    pub fn api_base(&self) -> String {
        self.api_base
            .clone()
            .unwrap_or_else(|| self.environment.api_base().to_string())
    }

    /// Client credentials, or a configuration error naming both variables.
    pub fn credentials(&self) -> Result<(&str, &str)> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) => Ok((id, secret)),
            _ => Err(SiteError::Config(
                "ORCID_CLIENT_ID and ORCID_CLIENT_SECRET must be set".to_string(),
            )),
        }
    }
}

impl OpenAlexConfig {
    pub fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| SiteError::Config("OPENALEX_API_KEY is required".to_string()))
    }
}

// ─── Load ──────────────────────────────────────────────────

impl SiteConfig {
    /// Config file path for a site root. `SCHOLARSITE_CONFIG` wins if set.
    pub fn config_path(root: &Path) -> PathBuf {
        if let Ok(path) = std::env::var("SCHOLARSITE_CONFIG") {
            return PathBuf::from(path);
        }
        root.join(CONFIG_FILE_NAME)
    }

    /// Load config from a specific path, falling back to defaults if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Overlay process environment variables.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Overlay variables from `lookup`. Empty values count as unset.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(env) = var("ORCID_ENV") {
            self.orcid.environment = env.parse()?;
        }
        if let Some(id) = var("ORCID_ID") {
            self.author.orcid_id = id.trim().to_string();
        }
        if let Some(id) = var("ORCID_CLIENT_ID") {
            self.orcid.client_id = Some(id);
        }
        if let Some(secret) = var("ORCID_CLIENT_SECRET") {
            self.orcid.client_secret = Some(secret);
        }
        if let Some(key) = var("OPENALEX_API_KEY") {
            self.openalex.api_key = Some(key);
        }
        if let Some(mailto) = var("OPENALEX_MAILTO") {
            self.openalex.mailto = Some(mailto);
        }
        if let Some(max) = var("MAX_WORKS") {
            self.openalex.max_works = max.trim().parse().map_err(|_| {
                SiteError::Config(format!("MAX_WORKS must be a non-negative integer, got {max:?}"))
            })?;
        }
        Ok(())
    }

    // ─── Derived paths ─────────────────────────────────────

    pub fn data_dir(&self) -> PathBuf {
        self.paths.root.join(&self.paths.data_dir)
    }

    /// Final merged output consumed by the site.
    pub fn publications_path(&self) -> PathBuf {
        self.data_dir().join("publications.json")
    }

    pub fn orcid_raw_path(&self) -> PathBuf {
        self.data_dir().join("publications.orcid.json")
    }

    pub fn openalex_raw_path(&self) -> PathBuf {
        self.data_dir().join("publications.openalex.raw.json")
    }

    pub fn overrides_path(&self) -> PathBuf {
        self.data_dir().join("publications.overrides.json")
    }

    pub fn selected_path(&self) -> PathBuf {
        self.data_dir().join("publications.selected.json")
    }

    pub fn projects_json_path(&self) -> PathBuf {
        self.data_dir().join("projects.json")
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.paths.root.join(&self.paths.projects_dir)
    }

    pub fn project_template_path(&self) -> PathBuf {
        self.projects_dir().join("project-template.html")
    }

    pub fn awards_dir(&self) -> PathBuf {
        self.paths.root.join(&self.paths.awards_dir)
    }
}
