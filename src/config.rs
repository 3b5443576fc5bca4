//! Runtime configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `DB_*` environment variables (a `.env` file is read first if present).

use crate::error::Result;
use crate::models::TableKind;
use crate::utils::constants::*;
use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

/// Environment keys mapped onto `database.*`.
const DB_ENV_KEYS: [&str; 5] = ["name", "user", "password", "host", "port"];

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Load configuration from `path`, or from the default file if it exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();

        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let mut builder =
            Config::builder().add_source(File::from(file).required(path.is_some()));

        for key in DB_ENV_KEYS {
            let value = std::env::var(format!("DB_{}", key.to_uppercase())).ok();
            builder = builder.set_override_option(format!("database.{}", key), value)?;
        }

        let config: AppConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct DatabaseConfig {
    #[validate(length(min = 1, message = "database name is not set (DB_NAME)"))]
    pub name: String,

    #[validate(length(min = 1, message = "database user is not set (DB_USER)"))]
    pub user: String,

    #[serde(skip_serializing)]
    pub password: String,

    #[validate(length(min = 1))]
    pub host: String,

    #[validate(range(min = 1))]
    pub port: u16,
}

impl DatabaseConfig {
    pub fn to_pg_config(&self) -> tokio_postgres::Config {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&self.host)
            .port(self.port)
            .dbname(&self.name)
            .user(&self.user);
        if !self.password.is_empty() {
            pg.password(&self.password);
        }
        pg
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            user: String::new(),
            password: String::new(),
            host: "localhost".to_string(),
            port: 5432,
        }
    }
}

/// Where the source files live and what they are called.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub input_dir: PathBuf,
    pub address_file: String,
    pub client_file: String,
    pub package_channel_file: String,
    pub epg_stat_file: String,
}

impl PipelineConfig {
    pub fn with_input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.input_dir = dir.into();
        self
    }

    pub fn with_epg_stat_file(mut self, name: impl Into<String>) -> Self {
        self.epg_stat_file = name.into();
        self
    }

    pub fn file_name(&self, table: TableKind) -> &str {
        match table {
            TableKind::Address => &self.address_file,
            TableKind::Client => &self.client_file,
            TableKind::PackageChannel => &self.package_channel_file,
            TableKind::EpgStat => &self.epg_stat_file,
        }
    }

    pub fn path_for(&self, table: TableKind) -> PathBuf {
        self.input_dir.join(self.file_name(table))
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            address_file: ADDRESS_FILE.to_string(),
            client_file: CLIENT_FILE.to_string(),
            package_channel_file: PACKAGE_CHANNEL_FILE.to_string(),
            epg_stat_file: EPG_STAT_FILE.to_string(),
        }
    }
}
