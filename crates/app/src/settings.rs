//! Handles settings for the application.
//!
//! Values come from an optional `settings.toml` (or the file passed with
//! `--config`) and are overridden by `WALLETBOOK__<SECTION>__<KEY>`
//! environment variables, e.g. `WALLETBOOK__SERVER__PORT=8080`.
use config::{
    Config, ConfigError, Environment, File,
    builder::{ConfigBuilder, DefaultState},
};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Database::Memory => String::from("sqlite::memory:"),
            Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: String,
    pub port: u16,
    pub database: Database,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub server: Server,
}

impl Settings {
    /// Load `path` (extension optional, file optional) plus the environment.
    pub fn new(path: &str) -> Result<Self, SettingsError> {
        Self::load(Config::builder().add_source(File::with_name(path).required(false)))
    }

    fn load(builder: ConfigBuilder<DefaultState>) -> Result<Self, SettingsError> {
        let settings: Settings = builder
            .set_default("app.level", "info")?
            .set_default("server.bind", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.database.sqlite", "./walletbook.db")?
            .add_source(
                Environment::with_prefix("WALLETBOOK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        if settings.server.bind.trim().is_empty() {
            return Err(SettingsError::Invalid(
                "server.bind must not be empty".to_string(),
            ));
        }
        Ok(settings)
    }
}
