//! # rr-config
//!
//! Layered runtime settings. Later layers win:
//!
//! 1. built-in defaults
//! 2. `config/default.toml`, then `config/local.toml` (both optional)
//! 3. `RUSTY_REVIEWS__<SECTION>__<KEY>` environment variables, with a `.env`
//!    file loaded first when present
//!
//! `auth.secret` has no default and must be provided by one of the layers.

use std::path::PathBuf;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use tracing::debug;

pub const ENV_PREFIX: &str = "RUSTY_REVIEWS";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub mail: MailSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// e.g. "sqlite://data/rusty_reviews.db"
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    /// Signs confirmation codes and access tokens.
    #[serde(deserialize_with = "secret_string")]
    pub secret: SecretString,
    pub token_ttl_secs: i64,
    pub code_ttl_secs: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailSettings {
    /// Sender address of confirmation mail
    pub from: String,
    pub outbox_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// Used when `RUST_LOG` is unset.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

fn secret_string<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

impl Settings {
    /// Loads `.env`, the config files and the environment.
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }
        let builder = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        Self::from_builder(builder)
    }

    /// Built-in defaults; the base layer of [`Settings::load`].
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, SettingsError> {
        Ok(Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "sqlite://rusty_reviews.db")?
            .set_default("database.max_connections", 5)?
            .set_default("auth.token_ttl_secs", 24 * 60 * 60)?
            .set_default("auth.code_ttl_secs", 3 * 24 * 60 * 60)?
            .set_default("mail.from", "noreply@rusty-reviews.local")?
            .set_default("mail.outbox_dir", "./data/outbox")?
            .set_default("log.filter", "info")?
            .set_default("log.json", false)?)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, SettingsError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.check()?;
        Ok(settings)
    }

    fn check(&self) -> Result<(), SettingsError> {
        use secrecy::ExposeSecret;

        if self.auth.secret.expose_secret().is_empty() {
            return Err(SettingsError::Invalid { key: "auth.secret", reason: "must not be empty".into() });
        }
        if self.auth.token_ttl_secs <= 0 {
            return Err(SettingsError::Invalid { key: "auth.token_ttl_secs", reason: "must be positive".into() });
        }
        if self.auth.code_ttl_secs <= 0 {
            return Err(SettingsError::Invalid { key: "auth.code_ttl_secs", reason: "must be positive".into() });
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn defaults_need_a_secret() {
        let err = Settings::from_builder(Settings::defaults().unwrap()).unwrap_err();
        assert!(matches!(err, SettingsError::Config(_)));
    }

    #[test]
    fn overrides_apply_over_defaults() {
        let builder = Settings::defaults()
            .unwrap()
            .set_override("auth.secret", "s3cret")
            .unwrap()
            .set_override("server.port", 9000)
            .unwrap();
        let settings = Settings::from_builder(builder).unwrap();
        assert_eq!(settings.bind_address(), "127.0.0.1:9000");
        assert_eq!(settings.auth.secret.expose_secret(), "s3cret");
        assert_eq!(settings.auth.code_ttl_secs, 259_200);
        assert!(!settings.log.json);
    }

    #[test]
    fn empty_secret_is_rejected() {
        let builder = Settings::defaults().unwrap().set_override("auth.secret", "").unwrap();
        let err = Settings::from_builder(builder).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { key: "auth.secret", .. }));
    }

    #[test]
    fn secret_is_redacted_in_debug() {
        let builder = Settings::defaults().unwrap().set_override("auth.secret", "hunter2").unwrap();
        let settings = Settings::from_builder(builder).unwrap();
        assert!(!format!("{:?}", settings).contains("hunter2"));
    }
}
