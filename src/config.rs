use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Process-wide configuration, constructed once at startup and passed into
/// each component. Secrets never live in the config file; they are read from
/// the environment during [`Config::load`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub database: DatabaseConfig,

    pub auth: AuthConfig,

    pub geo: GeoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `sqlx` connection URL, e.g. `sqlite:data/callboard.db`
    pub path: String,

    pub max_connections: u32,

    pub min_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "sqlite:data/callboard.db".to_string(),
            max_connections: 5,
            min_connections: 1,
        }
    }
}

/// Which credential check `/login` performs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStrategy {
    /// One configured administrator password, no user table.
    #[default]
    Shared,
    /// Stored admin account with an Argon2id-hashed password.
    Account,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub strategy: AuthStrategy,

    pub token_ttl_hours: i64,

    /// Username of the bootstrap admin account (account strategy only).
    pub admin_username: String,

    /// From `CALLBOARD_JWT_SECRET`; never serialized back to disk.
    #[serde(skip)]
    pub jwt_secret: String,

    /// From `CALLBOARD_ADMIN_PASSWORD`. The shared strategy compares against
    /// it on every login; the account strategy uses it once to bootstrap the
    /// first admin row.
    #[serde(skip)]
    pub admin_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            strategy: AuthStrategy::default(),
            token_ttl_hours: 24,
            admin_username: "admin".to_string(),
            jwt_secret: String::new(),
            admin_password: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoConfig {
    /// Replacement area-code table (`area,state` CSV). The embedded table is
    /// used when unset.
    pub table_path: Option<PathBuf>,
}

impl Config {
    /// Loads the first config file found, then applies environment overrides.
    pub fn load() -> Result<Self> {
        for path in Self::config_paths() {
            if path.exists() {
                return Self::load_from_path(&path);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        info!("Loaded config from: {}", path.display());
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(secret) = std::env::var("CALLBOARD_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Ok(password) = std::env::var("CALLBOARD_ADMIN_PASSWORD") {
            self.auth.admin_password = password;
        }
        if let Ok(username) = std::env::var("CALLBOARD_ADMIN_USERNAME") {
            self.auth.admin_username = username;
        }
        if let Ok(path) = std::env::var("CALLBOARD_DATABASE_PATH") {
            self.database.path = path;
        }
        if let Ok(port) = std::env::var("CALLBOARD_PORT") {
            self.server.port = port
                .parse()
                .context("CALLBOARD_PORT is not a valid port number")?;
        }
        Ok(())
    }

    /// Refuses to start without the secrets the selected strategy needs.
    /// There are deliberately no baked-in defaults for any of them.
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            anyhow::bail!("CALLBOARD_JWT_SECRET must be set");
        }

        if self.auth.strategy == AuthStrategy::Shared && self.auth.admin_password.is_empty() {
            anyhow::bail!("CALLBOARD_ADMIN_PASSWORD must be set for the shared auth strategy");
        }

        if self.auth.strategy == AuthStrategy::Account && self.auth.admin_username.is_empty() {
            anyhow::bail!("auth.admin_username cannot be empty");
        }

        if self.auth.token_ttl_hours < 1 {
            anyhow::bail!("auth.token_ttl_hours must be at least 1");
        }

        if self.database.path.is_empty() {
            anyhow::bail!("database.path cannot be empty");
        }

        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("callboard").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".callboard").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    /// Writes a starter config file (secrets excluded) unless one exists.
    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            Self::default().save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_requires_jwt_secret() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_requires_shared_password() {
        let mut config = Config::default();
        config.auth.jwt_secret = "secret".to_string();
        assert!(config.validate().is_err());

        config.auth.admin_password = "hunter2".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn account_strategy_needs_no_shared_password() {
        let mut config = Config::default();
        config.auth.jwt_secret = "secret".to_string();
        config.auth.strategy = AuthStrategy::Account;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn secrets_never_serialize() {
        let mut config = Config::default();
        config.auth.jwt_secret = "super-secret".to_string();
        config.auth.admin_password = "hunter2".to_string();

        let rendered = toml::to_string_pretty(&config).unwrap();
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("hunter2"));
    }
}
