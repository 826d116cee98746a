use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use config::ConfigError;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

use crate::auth::{TokenConfigHandle, TokenSettings};

/// Environment variable naming the configuration file
pub const CONFIG_FILE_ENV: &str = "APP_CONFIG_FILE";
const DEFAULT_CONFIG_FILE: &str = "configuration.yaml";

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub email: EmailSettings,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    /// How often the configuration file is polled for changes
    pub config_reload_interval_secs: u64,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub require_ssl: bool,
    pub max_connections: u32,
    pub max_lifetime_secs: u64,
    pub acquire_timeout_secs: u64,
}

impl DatabaseSettings {
    pub fn connect_options(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };
        PgConnectOptions::new()
            .host(&self.host)
            .username(&self.username)
            .password(&self.password)
            .port(self.port)
            .database(&self.database_name)
            .ssl_mode(ssl_mode)
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

/// JWT authentication settings
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub issuer: String,
    pub access_token_expiry: i64,   // seconds (e.g., 7200 for 2 hours)
    pub refresh_token_expiry: i64,  // seconds (e.g., 604800 for 7 days)
}

impl JwtSettings {
    /// The hot-reloadable part of the JWT settings
    pub fn token_settings(&self) -> TokenSettings {
        TokenSettings {
            issuer: self.issuer.clone(),
            access_ttl: chrono::Duration::seconds(self.access_token_expiry),
            refresh_ttl: chrono::Duration::seconds(self.refresh_token_expiry),
        }
    }
}

impl std::fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"[redacted]")
            .field("issuer", &self.issuer)
            .field("access_token_expiry", &self.access_token_expiry)
            .field("refresh_token_expiry", &self.refresh_token_expiry)
            .finish()
    }
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct EmailSettings {
    /// Resolve the domain of new addresses at registration
    pub check_domain: bool,
    pub dns_timeout_ms: u64,
}

/// Path of the configuration file, honoring `APP_CONFIG_FILE`
pub fn configuration_path() -> PathBuf {
    std::env::var(CONFIG_FILE_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE))
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    load_configuration(&configuration_path())
}

/// Layer defaults, the file at `path` (optional) and `APP__*` environment
/// variables, in that order of precedence.
pub fn load_configuration(path: &Path) -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .set_default("application.host", "127.0.0.1")?
        .set_default("application.port", 50050)?
        .set_default("application.config_reload_interval_secs", 5)?
        .set_default("database.host", "localhost")?
        .set_default("database.port", 5432)?
        .set_default("database.username", "postgres")?
        .set_default("database.password", "postgres")?
        .set_default("database.database_name", "geopost")?
        .set_default("database.require_ssl", false)?
        .set_default("database.max_connections", 25)?
        .set_default("database.max_lifetime_secs", 3600)?
        .set_default("database.acquire_timeout_secs", 5)?
        .set_default("jwt.issuer", "geopost")?
        .set_default("jwt.access_token_expiry", 7200)?
        .set_default("jwt.refresh_token_expiry", 604800)?
        .set_default("email.check_domain", true)?
        .set_default("email.dns_timeout_ms", 2000)?
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;
    let settings = settings.try_deserialize::<Settings>()?;
    validate(&settings)?;
    Ok(settings)
}

fn validate(settings: &Settings) -> Result<(), ConfigError> {
    if settings.jwt.secret.is_empty() {
        return Err(ConfigError::Message("jwt.secret must not be empty".to_string()));
    }
    if settings.jwt.access_token_expiry <= 0 || settings.jwt.refresh_token_expiry <= 0 {
        return Err(ConfigError::Message(
            "jwt token expiries must be positive".to_string(),
        ));
    }
    Ok(())
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Background watcher for hot-reloading token settings
///
/// Polls the modification time of `path` every `interval`. When it changes the
/// whole configuration is re-read and, if valid, the token settings are
/// swapped in one step. A broken file keeps the previous settings.
pub async fn watch_token_settings(path: PathBuf, handle: TokenConfigHandle, interval: Duration) {
    let mut last_modified = modified_at(&path);

    loop {
        tokio::time::sleep(interval).await;

        let current = modified_at(&path);
        if current == last_modified {
            continue;
        }
        last_modified = current;

        match load_configuration(&path) {
            Ok(settings) => {
                let token_settings = settings.jwt.token_settings();
                tracing::info!(
                    target: "CONFIG",
                    issuer = %token_settings.issuer,
                    access_ttl_secs = token_settings.access_ttl.num_seconds(),
                    refresh_ttl_secs = token_settings.refresh_ttl.num_seconds(),
                    "Token settings reloaded"
                );
                handle.store(token_settings);
            }
            Err(e) => {
                tracing::error!(
                    target: "CONFIG",
                    "Failed to reload config: {}, keeping old configuration",
                    e
                );
            }
        }
    }
}
