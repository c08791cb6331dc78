use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use crate::error::VellumError;
use crate::model::culture::Culture;

/// Directory holding a project's store and config.
pub const VELLUM_DIR: &str = ".vellum";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub languages: LanguageConfig,
    #[serde(default)]
    pub relations: RelationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Relative paths resolve against the `.vellum` directory.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanguageConfig {
    #[serde(default)]
    pub default: Option<Culture>,
    #[serde(default)]
    pub enabled: Vec<Culture>,
}

impl LanguageConfig {
    /// Enabled cultures with the default one first; duplicates dropped.
    #[must_use]
    pub fn cultures(&self) -> Vec<Culture> {
        let mut out: Vec<Culture> = self.default.iter().cloned().collect();
        for culture in &self.enabled {
            if !out.contains(culture) {
                out.push(culture.clone());
            }
        }
        out
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationConfig {
    /// Deleting an item also deletes the relations it parents.
    #[serde(default = "default_true")]
    pub cascade_on_delete: bool,
}

impl Default for RelationConfig {
    fn default() -> Self {
        Self {
            cascade_on_delete: default_true(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    pub resolved_output: String,
}

impl EffectiveConfig {
    /// Absolute location of the SQLite store for `project_root`.
    #[must_use]
    pub fn store_path(&self, project_root: &Path) -> PathBuf {
        store_path(project_root, &self.project)
    }
}

#[must_use]
pub fn store_path(project_root: &Path, config: &ProjectConfig) -> PathBuf {
    project_root.join(VELLUM_DIR).join(&config.store.path)
}

/// Walk up from `start` to the nearest directory containing `.vellum/`.
#[must_use]
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(VELLUM_DIR).is_dir())
        .map(Path::to_path_buf)
}

/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(VELLUM_DIR).join("config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .map_err(|err| VellumError::config_parse(&path, err.message()).into())
}

/// Write `config` to `.vellum/config.toml`, creating the directory.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_project_config(project_root: &Path, config: &ProjectConfig) -> Result<PathBuf> {
    let dir = project_root.join(VELLUM_DIR);
    std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join("config.toml");
    let content = toml::to_string_pretty(config).context("Failed to serialize project config")?;
    std::fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("vellum/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .map_err(|err| VellumError::config_parse(&path, err.message()).into())
}

/// Merge project config, user config and the output-mode sources.
///
/// # Errors
///
/// Returns an error if either config file is unreadable or malformed.
pub fn resolve_config(project_root: &Path, cli_json: bool) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(cli_json, user.output.as_deref(), env_format.as_deref());

    Ok(EffectiveConfig {
        project,
        user,
        resolved_output,
    })
}

/// Output mode precedence: `--json` flag, then `FORMAT`, then user config,
/// then `pretty` on a TTY and `text` otherwise.
#[must_use]
pub fn resolve_output(
    cli_json: bool,
    user_output: Option<&str>,
    env_format: Option<&str>,
) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "table" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

const fn default_true() -> bool {
    true
}

fn default_store_path() -> PathBuf {
    PathBuf::from("store.sqlite3")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn culture(code: &str) -> Culture {
        code.parse().unwrap()
    }

    #[test]
    fn missing_project_config_uses_defaults() {
        let root = tempfile::tempdir().expect("temp dir");
        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg.store.path, PathBuf::from("store.sqlite3"));
        assert!(cfg.languages.default.is_none());
        assert!(cfg.languages.enabled.is_empty());
        assert!(cfg.relations.cascade_on_delete);
    }

    #[test]
    fn malformed_project_config_is_a_config_parse_error() {
        let root = tempfile::tempdir().expect("temp dir");
        std::fs::create_dir_all(root.path().join(VELLUM_DIR)).expect("create .vellum");
        std::fs::write(
            root.path().join(VELLUM_DIR).join("config.toml"),
            "[languages\ndefault = ",
        )
        .expect("write config");

        let err = load_project_config(root.path()).expect_err("malformed config");
        let core = err.downcast_ref::<VellumError>().expect("typed config error");
        assert_eq!(core.code(), crate::error::ErrorCode::ConfigParseError);
        assert!(core.to_string().contains("config.toml"));
    }

    #[test]
    fn project_config_overrides_parse() {
        let root = tempfile::tempdir().expect("temp dir");
        std::fs::create_dir_all(root.path().join(VELLUM_DIR)).expect("create .vellum");
        std::fs::write(
            root.path().join(VELLUM_DIR).join("config.toml"),
            r#"
[store]
path = "content.db"

[languages]
default = "en-US"
enabled = ["fr", "en-us", "de"]

[relations]
cascade_on_delete = false
"#,
        )
        .expect("write config");

        let cfg = load_project_config(root.path()).expect("load");
        assert_eq!(
            store_path(root.path(), &cfg),
            root.path().join(".vellum").join("content.db")
        );
        assert_eq!(
            cfg.languages.cultures(),
            vec![culture("en-us"), culture("fr"), culture("de")]
        );
        assert!(!cfg.relations.cascade_on_delete);
    }

    #[test]
    fn invalid_culture_in_config_is_an_error() {
        let root = tempfile::tempdir().expect("temp dir");
        std::fs::create_dir_all(root.path().join(VELLUM_DIR)).expect("create .vellum");
        std::fs::write(
            root.path().join(VELLUM_DIR).join("config.toml"),
            "[languages]\nenabled = [\"not a culture!\"]\n",
        )
        .expect("write config");

        let err = load_project_config(root.path()).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
        assert!(err.is::<VellumError>());
    }

    #[test]
    fn written_config_reads_back() {
        let root = tempfile::tempdir().expect("temp dir");
        let mut cfg = ProjectConfig::default();
        cfg.languages.enabled = vec![culture("en"), culture("da")];
        write_project_config(root.path(), &cfg).expect("write");

        let back = load_project_config(root.path()).expect("load");
        assert_eq!(back.languages.enabled, cfg.languages.enabled);
        assert_eq!(find_project_root(root.path()), Some(root.path().to_path_buf()));
    }

    #[test]
    fn project_root_is_found_from_subdirectory() {
        let root = tempfile::tempdir().expect("temp dir");
        std::fs::create_dir_all(root.path().join(VELLUM_DIR)).expect("create .vellum");
        let nested = root.path().join("a").join("b");
        std::fs::create_dir_all(&nested).expect("create nested");
        assert_eq!(find_project_root(&nested), Some(root.path().to_path_buf()));
    }

    #[test]
    fn cli_json_overrides_env_and_config() {
        assert_eq!(resolve_output(true, Some("pretty"), Some("text")), "json");
    }

    #[test]
    fn env_beats_user_config_and_aliases_normalize() {
        assert_eq!(resolve_output(false, Some("table"), Some("human")), "pretty");
        assert_eq!(resolve_output(false, Some("human"), Some("table")), "text");
        assert_eq!(resolve_output(false, Some("json"), Some("bogus")), "json");
    }
}
