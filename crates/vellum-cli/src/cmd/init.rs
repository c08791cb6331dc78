use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;
use std::path::Path;

use vellum_core::Culture;
use vellum_core::config::{self, LanguageConfig, ProjectConfig, VELLUM_DIR};
use vellum_core::db::{migrations, open_store};

use crate::output::{OutputMode, pretty_kv, render};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Re-initialize even if `.vellum/` already exists.
    #[arg(long)]
    pub force: bool,

    /// Default culture; listed first in eligibility output.
    #[arg(long, value_name = "CULTURE")]
    pub default_language: Option<Culture>,

    /// Additional enabled cultures (repeatable).
    #[arg(long = "language", value_name = "CULTURE")]
    pub languages: Vec<Culture>,
}

const GITIGNORE: &str = "*.sqlite3\n*.sqlite3-wal\n*.sqlite3-shm\n";

#[derive(Debug, Serialize)]
struct InitOutput {
    ok: bool,
    root: String,
    store: String,
    schema_version: u32,
    languages: Vec<Culture>,
}

/// Execute `vl init`. Creates the project skeleton:
///
/// ```text
/// .vellum/
///   config.toml      (store path, languages, relation settings)
///   .gitignore       (SQLite store files)
///   store.sqlite3    (migrated store)
/// ```
///
/// # Errors
///
/// Returns an error if `.vellum/` already exists and `--force` is not set,
/// or if writing the config or opening the store fails.
pub fn run_init(args: &InitArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let vellum_dir = project_root.join(VELLUM_DIR);
    if vellum_dir.exists() && !args.force {
        anyhow::bail!(".vellum/ already exists. Use `vl init --force` to reinitialize.");
    }

    let mut project = if args.force {
        config::load_project_config(project_root)?
    } else {
        ProjectConfig::default()
    };
    if args.default_language.is_some() || !args.languages.is_empty() {
        project.languages = LanguageConfig {
            default: args.default_language.clone(),
            enabled: args.languages.clone(),
        };
    }

    config::write_project_config(project_root, &project)?;
    let gitignore = vellum_dir.join(".gitignore");
    std::fs::write(&gitignore, GITIGNORE)
        .with_context(|| format!("Failed to write {}", gitignore.display()))?;

    let store = config::store_path(project_root, &project);
    let conn = open_store(&store)?;
    let schema_version = migrations::current_schema_version(&conn)?;
    tracing::info!(store = %store.display(), schema_version, "initialized project");

    let result = InitOutput {
        ok: true,
        root: project_root.display().to_string(),
        store: store.display().to_string(),
        schema_version,
        languages: project.languages.cultures(),
    };
    render(output, &result, |r, w| {
        writeln!(w, "Initialized vellum project in {}", r.root)?;
        pretty_kv(w, "store", &r.store)?;
        pretty_kv(w, "schema", r.schema_version.to_string())?;
        if !r.languages.is_empty() {
            let codes: Vec<&str> = r.languages.iter().map(Culture::as_str).collect();
            pretty_kv(w, "languages", codes.join(", "))?;
        }
        Ok(())
    })
}
