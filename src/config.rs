use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::workflow::engine::{EngineSettings, FallbackReporter};

const CONFIG_FILE_STEM: &str = "trustshield";
const ENV_PREFIX: &str = "TRUSTSHIELD";

/// Main configuration structure for TrustShield
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrustShieldConfig {
    /// Where complaint records live
    pub storage: StorageConfig,
    /// Workflow engine settings
    pub workflow: WorkflowConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
    /// Authentication audit log
    pub audit: AuditConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    File,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// memory, file or sqlite
    pub backend: StorageBackend,
    /// JSON document path for the file backend
    pub path: String,
    /// Database URL for the sqlite backend
    pub database_url: String,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Enable automatic migrations
    pub auto_migrate: bool,
    /// Per-call storage timeout
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowConfig {
    /// E-mail of the identity that owns unauthenticated submissions
    pub anonymous_reporter_email: String,
    /// Display name of that identity
    pub anonymous_reporter_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is unset
    pub log_level: String,
    /// JSON log lines instead of the compact text format
    pub json_logs: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuditConfig {
    pub enabled: bool,
    /// Append-only log of login and signup events
    pub auth_log_path: String,
}

impl Default for TrustShieldConfig {
    fn default() -> Self {
        let fallback = FallbackReporter::default();
        Self {
            storage: StorageConfig {
                backend: StorageBackend::File,
                path: ".trustshield/complaints.json".to_string(),
                database_url: "sqlite://.trustshield/trustshield.db".to_string(),
                max_connections: 10,
                auto_migrate: true,
                timeout_ms: 5_000,
            },
            workflow: WorkflowConfig {
                anonymous_reporter_email: fallback.email,
                anonymous_reporter_name: fallback.name,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                json_logs: true,
            },
            audit: AuditConfig {
                enabled: true,
                auth_log_path: ".trustshield/auth.log".to_string(),
            },
        }
    }
}

impl TrustShieldConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (trustshield.toml)
    /// 3. Environment variables (TRUSTSHIELD__SECTION__KEY)
    pub fn load() -> Result<Self> {
        let default_file = PathBuf::from(format!("{CONFIG_FILE_STEM}.toml"));
        Self::load_from(default_file.exists().then_some(default_file.as_path()))
    }

    /// Same as [`Self::load`] with an explicit configuration file.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder =
            Config::builder().add_source(Config::try_from(&TrustShieldConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            storage_timeout: Duration::from_millis(self.storage.timeout_ms),
            fallback_reporter: FallbackReporter {
                name: self.workflow.anonymous_reporter_name.clone(),
                email: self.workflow.anonymous_reporter_email.clone(),
            },
        }
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<TrustShieldConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = TrustShieldConfig::load_env_file();
        TrustShieldConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static TrustShieldConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_survive_round_trip_through_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trustshield.toml");

        let mut original = TrustShieldConfig::default();
        original.storage.backend = StorageBackend::Memory;
        original.storage.timeout_ms = 250;
        original.save_to_file(&path).unwrap();

        let loaded = TrustShieldConfig::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.storage.backend, StorageBackend::Memory);
        assert_eq!(loaded.storage.timeout_ms, 250);
        assert_eq!(
            loaded.workflow.anonymous_reporter_email,
            original.workflow.anonymous_reporter_email
        );
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[storage]\nbackend = \"memory\"\n").unwrap();

        let loaded = TrustShieldConfig::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.storage.backend, StorageBackend::Memory);
        assert_eq!(loaded.storage.path, ".trustshield/complaints.json");
        assert!(loaded.audit.enabled);
    }

    #[test]
    fn test_engine_settings_mapping() {
        let mut config = TrustShieldConfig::default();
        config.storage.timeout_ms = 1_500;
        config.workflow.anonymous_reporter_email = "system@corp.test".to_string();

        let settings = config.engine_settings();
        assert_eq!(settings.storage_timeout, Duration::from_millis(1_500));
        assert_eq!(settings.fallback_reporter.email, "system@corp.test");
    }
}
