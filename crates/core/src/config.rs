//! Application configuration loaded from `config.toml` and `TALLY_*` variables.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    store::FileStore,
    table::{DEFAULT_COLUMNS, DEFAULT_ROWS},
};

/// Directory under the user's config dir holding `config.toml`.
pub const CONFIG_DIR: &str = "tally";
/// Prefix for environment overrides, e.g. `TALLY_START_VIEW=table`.
pub const ENV_PREFIX: &str = "TALLY";

const DEFAULT_CONFIG: &str = r#"# Tally configuration.
# Every key is optional; environment variables such as TALLY_START_VIEW override them.

# Directory holding the stored scoreboard and table snapshots.
# data_dir = "/path/to/store"

# View shown on startup: "scoreboard" or "table".
start_view = "scoreboard"

# Size of a fresh score table.
table_rows = 7
table_columns = 2
"#;

/// View shown when the application starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartView {
    /// Players x rounds scoreboard.
    #[default]
    Scoreboard,
    /// Free-form score table.
    Table,
}

/// Resolved application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding stored snapshots.
    pub data_dir: PathBuf,
    /// View shown on startup.
    pub start_view: StartView,
    /// Rows in a fresh score table.
    pub table_rows: usize,
    /// Columns in a fresh score table.
    pub table_columns: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: FileStore::default_root(),
            start_view: StartView::default(),
            table_rows: DEFAULT_ROWS,
            table_columns: DEFAULT_COLUMNS,
        }
    }
}

impl AppConfig {
    /// Load from the default config file layered under environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load from `path` (which may be missing) layered under environment overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings = Config::builder()
            .add_source(
                File::from(path)
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .with_context(|| format!("failed to read configuration from {}", path.display()))?;
        let config: AppConfig = settings
            .try_deserialize()
            .context("invalid configuration")?;
        info!(
            data_dir = %config.data_dir.display(),
            start_view = ?config.start_view,
            "Configuration loaded"
        );
        Ok(config)
    }
}

/// Location of the user's `config.toml`.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join("config.toml")
}

/// Write a commented default `config.toml` if none exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = config_path();
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "Default configuration written");
    Ok(())
}
