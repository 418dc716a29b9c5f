use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tidemark_domain::errors::SchemaError;
use tidemark_domain::value_objects::{ColumnSpec, ConnectionConfig, TableSchema};

pub const PASSWORD_ENV: &str = "TIDEMARK_PG_PASSWORD";
pub const TOKEN_ENV: &str = "TIDEMARK_TIINGO_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {cause}")]
    Read { path: String, cause: String },

    #[error("failed to parse TOML {path}: {cause}")]
    Parse { path: String, cause: String },

    #[error("postgres password missing: set [postgres].password or TIDEMARK_PG_PASSWORD")]
    MissingPassword,

    #[error("tiingo token missing: set [tiingo].token or TIDEMARK_TIINGO_TOKEN")]
    MissingToken,

    #[error("date_column {name} is not declared under [[table.columns]]")]
    DateColumnUnknown { name: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub postgres: PostgresConfig,
    pub tiingo: TiingoConfig,
    pub table: TableConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct PostgresConfig {
    pub database: String,
    pub user: String,
    pub password: Option<String>,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TiingoConfig {
    pub ticker: String,
    pub token: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TableConfig {
    pub name: String,
    pub date_column: String,
    pub columns: Vec<ColumnSpec>,
}

impl Config {
    /// Declared columns as a validated schema, in file order.
    pub fn table_schema(&self) -> Result<TableSchema, ConfigError> {
        Ok(TableSchema::new(self.table.columns.clone())?)
    }

    /// Connection settings with the password resolved from the file or
    /// the TIDEMARK_PG_PASSWORD environment variable.
    pub fn connection(&self) -> Result<ConnectionConfig, ConfigError> {
        let password = resolve_secret(self.postgres.password.as_deref(), PASSWORD_ENV)
            .ok_or(ConfigError::MissingPassword)?;
        Ok(ConnectionConfig {
            host: self.postgres.host.clone(),
            port: self.postgres.port,
            user: self.postgres.user.clone(),
            password,
            database: self.postgres.database.clone(),
        })
    }

    pub fn tiingo_token(&self) -> Result<String, ConfigError> {
        resolve_secret(self.tiingo.token.as_deref(), TOKEN_ENV).ok_or(ConfigError::MissingToken)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let schema = self.table_schema()?;
        if !schema.contains(&self.table.date_column) {
            return Err(ConfigError::DateColumnUnknown {
                name: self.table.date_column.clone(),
            });
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|err| ConfigError::Read {
        path: path.display().to_string(),
        cause: err.to_string(),
    })?;
    let config: Config = toml::from_str(&contents).map_err(|err| ConfigError::Parse {
        path: path.display().to_string(),
        cause: err.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}

fn resolve_secret(configured: Option<&str>, env_key: &str) -> Option<String> {
    match configured {
        Some(value) if !value.is_empty() => Some(value.to_string()),
        _ => std::env::var(env_key).ok().filter(|value| !value.is_empty()),
    }
}
