use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use scholarsite_core::{SiteConfig, generate_award_manifests, generate_project_pages};
use scholarsite_sync::{run_openalex_sync, run_orcid_sync};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "scholarsite",
    about = "Build-time data tools for the research group website",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Site checkout to operate on. Defaults to SCHOLARSITE_ROOT, then `.`.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Config file. Defaults to SCHOLARSITE_CONFIG, then `<root>/scholarsite.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output in JSON format.
    /// Also enabled by setting SCHOLARSITE_JSON=1.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild publications.json from the ORCID public API.
    Orcid,

    /// Rebuild publications.json from OpenAlex, with citation counts.
    Openalex,

    /// Write images.json into every award photo folder.
    Manifests,

    /// Render one HTML page per entry in projects.json.
    Projects,
}

// ─── Entry point ────────────────────────────────────────────────────────────

fn main() {
    init_tracing();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("ERROR: {err:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let start = Instant::now();
    let json_output = cli.json || std::env::var("SCHOLARSITE_JSON").as_deref() == Ok("1");
    let syncs = matches!(cli.command, Commands::Orcid | Commands::Openalex);
    let config = load_config(cli.root, cli.config.as_deref(), syncs)?;

    match cli.command {
        Commands::Orcid => {
            let report = runtime()?.block_on(run_orcid_sync(&config))?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": report,
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                println!("Fetched works: {}", report.fetched_works);
                println!("With DOI: {}", report.with_doi);
                println!("Selected after overrides: {}", report.selected);
                if report.overrides_created {
                    println!("Created: {}", config.overrides_path().display());
                }
                println!("publications.json changed: {}", report.changed);
            }
        }

        Commands::Openalex => {
            let report = runtime()?.block_on(run_openalex_sync(&config))?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": report,
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                println!("Works fetched: {}", report.fetched_works);
                println!("With DOI: {}", report.with_doi);
                println!("Wrote: {}", report.raw_output.display());
                println!("Wrote: {}", report.output.display());
                println!("publications.json changed: {}", report.changed);
            }
        }

        Commands::Manifests => {
            let reports = generate_award_manifests(&config.awards_dir())?;
            let dur = start.elapsed().as_millis();

            if json_output {
                let folders: Vec<_> = reports
                    .iter()
                    .map(|r| serde_json::json!({ "folder": r.folder, "images": r.images }))
                    .collect();
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "folders": folders, "total": reports.len() },
                    "meta": { "duration_ms": dur }
                }))?;
            } else if reports.is_empty() {
                println!("No award folders under {}", config.awards_dir().display());
            } else {
                for report in &reports {
                    println!(
                        "Wrote {} ({} images)",
                        report.folder.join("images.json").display(),
                        report.images
                    );
                }
            }
        }

        Commands::Projects => {
            let written = generate_project_pages(
                &config.projects_json_path(),
                &config.project_template_path(),
                &config.projects_dir(),
            )?;
            let dur = start.elapsed().as_millis();
            // The last path is always the index redirect.
            let pages = written.len().saturating_sub(1);

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "pages": pages, "written": written },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                println!("Generated {pages} project page(s)");
                for path in &written {
                    println!("- {}", path.display());
                }
            }
        }
    }

    Ok(())
}

// ─── Helpers ────────────────────────────────────────────────────────────────

/// File config first, then environment overrides. `--root` wins over
/// SCHOLARSITE_ROOT for locating both the config and the site files.
///
/// Environment variables are read only when `with_env` is set, which is the
/// case for the sync commands alone.
fn load_config(
    root: Option<PathBuf>,
    config_path: Option<&Path>,
    with_env: bool,
) -> Result<SiteConfig> {
    let root = root
        .or_else(|| std::env::var_os("SCHOLARSITE_ROOT").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| SiteConfig::config_path(&root));

    let mut config = SiteConfig::load_from(&path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    config.paths.root = root;
    if with_env {
        config.apply_env()?;
    }
    tracing::debug!(root = %config.paths.root.display(), config = %path.display(), "config loaded");
    Ok(config)
}

/// The syncs await one request at a time, so a single thread is enough.
fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}
