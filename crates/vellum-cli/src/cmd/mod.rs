pub mod content;
pub mod eligibility;
pub mod init;
pub mod relation;
pub mod types;

use std::path::Path;

use anyhow::Context as _;
use rusqlite::Connection;
use vellum_core::config::{self, ProjectConfig};
use vellum_core::db::open_store;
use vellum_core::error::ErrorCode;

use crate::output::{CliError, OutputMode, fail_any, render_error};

/// An opened project: its config and store connection.
pub struct Project {
    pub config: ProjectConfig,
    pub conn: Connection,
}

/// Locate the nearest `.vellum/` above `start` and open its store.
///
/// # Errors
///
/// Renders a `not_a_project` error when no project is found; otherwise
/// config and store-open failures.
pub fn open_project(start: &Path, output: OutputMode) -> anyhow::Result<Project> {
    let root = config::find_project_root(start).ok_or_else(|| {
        let code = ErrorCode::NotInitialized;
        let msg = "Not a vellum project: .vellum directory not found";
        render_error(
            output,
            &CliError::with_details(msg, code.hint().unwrap_or("Run 'vl init'"), code.code()),
        )
        .ok();
        anyhow::anyhow!("{msg}")
    })?;

    let config = config::load_project_config(&root).map_err(|e| fail_any(output, e))?;
    let store = config::store_path(&root, &config);
    let conn = open_store(&store).with_context(|| format!("open store for {}", root.display()))?;
    tracing::debug!(root = %root.display(), store = %store.display(), "opened project");
    Ok(Project { config, conn })
}
