//! Application configuration.
//!
//! Aggregates server, store, and ingestion settings into a single Config
//! struct that can be loaded from YAML files or environment variables.

mod ingestion;
mod server;
mod store;

pub use ingestion::IngestionConfig;
pub use server::ServerConfig;
pub use store::{StoreConfig, DEFAULT_CERT_URL};

use serde::Deserialize;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "CATALOG_SYNC_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "CATALOG_SYNC";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "CATALOG_SYNC_LOG";

/// Deployment variable for the keyspace name.
pub const KEYSPACE_NAME_ENV_VAR: &str = "KEYSPACE_NAME";
/// Deployment variable for the table name.
pub const TABLE_NAME_ENV_VAR: &str = "TABLE_NAME";
/// Deployment variable for the ingestion pipeline host.
pub const INGESTION_ENDPOINT_ENV_VAR: &str = "INGESTION_ENDPOINT";

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Missing required setting: {0}")]
    Missing(&'static str),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// AWS region for both signing scopes. Falls back to the SDK's resolution.
    pub region: Option<String>,
    /// Inbound HTTP server.
    pub server: ServerConfig,
    /// Keyspaces store.
    pub store: StoreConfig,
    /// Ingestion pipeline.
    pub ingestion: IngestionConfig,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `config.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix
    /// 5. Deployment variables `KEYSPACE_NAME`, `TABLE_NAME`, `INGESTION_ENDPOINT`
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: Config = config.try_deserialize()?;
        config.apply_deployment_env();
        Ok(config)
    }

    /// Overlay the variables set by the deployment stack.
    fn apply_deployment_env(&mut self) {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        if let Some(keyspace) = var(KEYSPACE_NAME_ENV_VAR) {
            self.store.keyspace = keyspace;
        }
        if let Some(table) = var(TABLE_NAME_ENV_VAR) {
            self.store.table = table;
        }
        if let Some(endpoint) = var(INGESTION_ENDPOINT_ENV_VAR) {
            self.ingestion.endpoint = endpoint;
        }
    }

    /// Reject settings the handler cannot run without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.keyspace.trim().is_empty() {
            return Err(ConfigError::Missing("store.keyspace"));
        }
        if self.store.table.trim().is_empty() {
            return Err(ConfigError::Missing("store.table"));
        }
        if self.ingestion.endpoint.trim().is_empty() {
            return Err(ConfigError::Missing("ingestion.endpoint"));
        }
        Ok(())
    }

    /// Create config for testing.
    pub fn for_test() -> Self {
        let mut config = Self::default();
        config.region = Some("us-east-1".to_string());
        config.ingestion.endpoint = "pipeline.test.local".to_string();
        config
    }
}
