use crate::core::db::Credentials;
use crate::core::ffi::EnvMode;
use crate::core::{OciError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub oci: OciConfig,
    pub credentials: Option<CredentialsConfig>,
    pub logging: Option<LoggingConfig>,
}

/// Foreign runtime configuration.
#[derive(Debug, Default, Deserialize)]
pub struct OciConfig {
    pub mode: Option<EnvMode>,
}

/// Login configuration. The password comes either inline or from the
/// environment variable named by `password_env`.
#[derive(Debug, Deserialize)]
pub struct CredentialsConfig {
    pub user: String,
    pub password: Option<String>,
    pub password_env: Option<String>,
    pub connect: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

impl Config {
    pub fn mode(&self) -> EnvMode {
        self.oci.mode.unwrap_or_default()
    }

    /// Maximum log level; `info` unless configured.
    pub fn log_level(&self) -> Result<tracing::Level> {
        match self.logging.as_ref().and_then(|l| l.level.as_deref()) {
            None => Ok(tracing::Level::INFO),
            Some(level) => level
                .parse()
                .map_err(|_| OciError::Config(format!("unknown log level '{level}'"))),
        }
    }

    pub fn credentials(&self) -> Result<Credentials> {
        self.credentials
            .as_ref()
            .ok_or_else(|| OciError::Config("no [credentials] section".to_string()))?
            .resolve()
    }
}

impl CredentialsConfig {
    pub fn resolve(&self) -> Result<Credentials> {
        let password = match (&self.password, &self.password_env) {
            (Some(password), _) => password.clone(),
            (None, Some(var)) => std::env::var(var).map_err(|_| {
                OciError::Config(format!("password variable {var} is not set"))
            })?,
            (None, None) => {
                return Err(OciError::Config(
                    "credentials need either password or password_env".to_string(),
                ))
            }
        };
        Ok(Credentials::new(
            self.user.as_bytes(),
            password.into_bytes(),
            self.connect.as_bytes(),
        ))
    }
}

/// Loads configuration from a TOML file at the given path.
///
/// # Example
///
/// ```no_run
/// let config = ocibridge::config::load_config("config.toml").expect("Failed to load config");
/// println!("{:?}", config);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// `<config dir>/ocibridge/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ocibridge").join("config.toml"))
}
