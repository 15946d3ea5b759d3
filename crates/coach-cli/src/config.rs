//! Configuration file management for coach.
//!
//! Provides a TOML config file at `~/.config/coach/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use coach_core::auth::{self, TokenConfig};
use coach_db::config::DbConfig;

/// Environment variable overriding the evidence upload directory.
pub const UPLOADS_DIR_ENV: &str = "COACH_UPLOADS_DIR";

pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    pub auth: AuthSection,
    #[serde(default)]
    pub server: ServerSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthSection {
    /// Hex-encoded token secret (64 hex chars = 32 bytes).
    pub token_secret: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploads_dir: Option<PathBuf>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the coach config directory: `$XDG_CONFIG_HOME/coach` or
/// `~/.config/coach`, on every platform.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("coach");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("coach")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Default evidence directory: `$XDG_DATA_HOME/coach/uploads` or the
/// platform data dir.
pub fn default_uploads_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg).join("coach").join("uploads");
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("coach")
        .join("uploads")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    parse_config(&contents)
}

fn parse_config(contents: &str) -> Result<ConfigFile> {
    toml::from_str(contents).context("failed to parse config file")
}

/// Serialize and write the config file, creating parent dirs as needed.
/// The file is owner read/write only on Unix.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(path)
}

/// 32 random bytes, hex-encoded.
pub fn generate_token_secret() -> String {
    use rand::Rng;
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Server options given on the command line.
#[derive(Debug, Default, Clone)]
pub struct ServerOverrides {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub uploads_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub uploads_dir: PathBuf,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct CoachConfig {
    pub db_config: DbConfig,
    pub token_config: TokenConfig,
    pub server: ServerConfig,
}

impl CoachConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `COACH_DATABASE_URL` > `[database] url` > `DbConfig::DEFAULT_URL`
    /// - Token secret: `COACH_TOKEN_SECRET` > `[auth] token_secret` > error
    /// - Uploads dir: `--uploads-dir` > `COACH_UPLOADS_DIR` > `[server] uploads_dir` > data dir
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        Self::resolve_with(cli_db_url, ServerOverrides::default())
    }

    pub fn resolve_with(cli_db_url: Option<&str>, overrides: ServerOverrides) -> Result<Self> {
        let file_config = load_config().ok();

        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Ok(url) = std::env::var(DbConfig::URL_ENV) {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };
        let db_config = DbConfig::new(db_url);

        let token_config = if let Ok(secret_hex) = std::env::var(auth::SECRET_ENV) {
            TokenConfig::from_hex(&secret_hex)
                .with_context(|| format!("{} is not a valid secret", auth::SECRET_ENV))?
        } else if let Some(ref cfg) = file_config {
            TokenConfig::from_hex(&cfg.auth.token_secret)
                .context("invalid token_secret in config file")?
        } else {
            bail!(
                "token secret not found; set {} or run `coach init` to create a config file",
                auth::SECRET_ENV
            );
        };

        let file_server = file_config.map(|cfg| cfg.server).unwrap_or_default();
        let server = ServerConfig {
            bind: overrides
                .bind
                .or(file_server.bind)
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            port: overrides.port.or(file_server.port).unwrap_or(DEFAULT_PORT),
            uploads_dir: overrides
                .uploads_dir
                .or_else(|| std::env::var_os(UPLOADS_DIR_ENV).map(PathBuf::from))
                .or(file_server.uploads_dir)
                .unwrap_or_else(default_uploads_dir),
        };

        Ok(Self {
            db_config,
            token_config,
            server,
        })
    }
}
