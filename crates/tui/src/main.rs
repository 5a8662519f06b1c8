mod app;

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};

use tracing_subscriber::{prelude::*, EnvFilter};
use tally_core::{
    config::{self, AppConfig},
    FileStore, Mirror, ScoreTable, Scoreboard,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let config_path = config::ensure_default_config()?;
    let config = AppConfig::load().with_context(|| {
        format!("failed to load configuration from {}", config_path.display())
    })?;

    let store = FileStore::new(config.data_dir.clone());
    let scoreboard = Mirror::restore(store.clone(), Scoreboard::new())?;
    let table = Mirror::restore(
        store.clone(),
        ScoreTable::new(config.table_rows, config.table_columns),
    )?;

    let store_label = store.root().display().to_string();
    let mut app = app::TallyApp::new(scoreboard, table, config.start_view, store_label);
    app.run().await
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("tally.log");

    let env_filter = EnvFilter::from_default_env();

    // The terminal is in raw mode while the app runs, so logs only go to the file.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(move || {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .expect("failed to open log file")
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
