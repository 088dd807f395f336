//! Configuration management for BiblioTech server

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_hours: u64,
    /// Lifetime of an email verification token
    pub verification_token_hours: i64,
    /// Lifetime of a password reset code
    pub reset_code_minutes: i64,
    /// Frontend base URL used to build verification links
    pub frontend_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    /// "pretty" or "json"
    pub format: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    /// When disabled, outgoing messages are written to the log instead of SMTP
    pub enabled: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: String,
    pub smtp_from_name: Option<String>,
    pub smtp_use_tls: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoansConfig {
    pub duration_days: i64,
    pub daily_fine: f64,
}

/// When the backup job fires
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum BackupSchedule {
    /// Every `minutes` minutes
    Interval { minutes: u64 },
    /// Every hour
    Hourly,
    /// Every day at `hour:minute` local time
    Daily { hour: u32, minute: u32 },
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackupConfig {
    pub enabled: bool,
    /// Database file to snapshot; defaults to the file behind `database.url`
    pub source: Option<PathBuf>,
    pub directory: PathBuf,
    pub prefix: String,
    pub extension: String,
    /// Number of snapshots kept after each run
    pub retention: usize,
    pub schedule: BackupSchedule,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadsConfig {
    pub directory: PathBuf,
    pub allowed_extensions: Vec<String>,
    pub max_size_bytes: usize,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub loans: LoansConfig,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub uploads: UploadsConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default"))
            // Layer on the environment-specific file
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add environment variables (with prefix BIBLIOTECH_, e.g. BIBLIOTECH_SERVER__PORT)
            .add_source(
                Environment::with_prefix("BIBLIOTECH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .set_override_option("auth.jwt_secret", env::var("JWT_SECRET").ok())?
            .build()?;

        config.try_deserialize()
    }

    /// Point backups at the database file in use unless a source was set explicitly
    pub fn resolve_backup_source(&mut self, database_file: &Path) {
        if self.backup.source.is_none() {
            self.backup.source = Some(database_file.to_path_buf());
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/bibliotech.db".to_string(),
            max_connections: 10,
            min_connections: 1,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-this-secret-in-production".to_string(),
            jwt_expiration_hours: 24,
            verification_token_hours: 24,
            reset_code_minutes: 15,
            frontend_url: "http://localhost:5173".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_from: "noreply@bibliotech.local".to_string(),
            smtp_from_name: Some("BiblioTech".to_string()),
            smtp_use_tls: true,
        }
    }
}

impl Default for LoansConfig {
    fn default() -> Self {
        Self {
            duration_days: 14,
            daily_fine: 0.50,
        }
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source: None,
            directory: PathBuf::from("backups"),
            prefix: "bibliotech_auto".to_string(),
            extension: "db".to_string(),
            retention: 50,
            schedule: BackupSchedule::Interval { minutes: 30 },
        }
    }
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("uploads"),
            allowed_extensions: ["png", "jpg", "jpeg", "gif"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_size_bytes: 16 * 1024 * 1024,
        }
    }
}
