use crate::provider::{GeoProvider, IpApiCom, Provider};
use crate::timeout::Timeout;

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no providers are specified")]
    NoProviders,
    #[error(r#"provider "{0}" requires an access token, set "token""#)]
    TokenRequired(&'static str),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "Config::default_log_level")]
    pub log_level: log::Level,
    /// CSV table of local overrides, consulted before any provider
    #[serde(default)]
    pub geofeed: Option<PathBuf>,
    #[serde(default)]
    pub timeout: Timeout,
    #[serde(default)]
    pub token: Option<String>,
    /// Fallback order
    #[serde(default = "Config::default_providers")]
    pub providers: Vec<Provider>,
}

impl Config {
    fn default_log_level() -> log::Level {
        log::Level::Info
    }

    fn default_providers() -> Vec<Provider> {
        vec![IpApiCom::default().into()]
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.providers.is_empty() {
            return Err(ConfigError::NoProviders);
        }
        let token_missing = self.token.as_deref().map_or(true, str::is_empty);
        if let Some(provider) = self
            .providers
            .iter()
            .find(|provider| token_missing && provider.requires_token())
        {
            return Err(ConfigError::TokenRequired(provider.name()));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
            geofeed: None,
            timeout: Timeout::default(),
            token: None,
            providers: Self::default_providers(),
        }
    }
}

pub fn parse_config_str(toml_string: &str) -> anyhow::Result<Config> {
    let config: Config = toml::from_str(toml_string)?;
    config.validate()?;
    Ok(config)
}

pub fn parse_config<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let toml_string = std::fs::read_to_string(path)?;
    parse_config_str(&toml_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn defaults() {
        let config = parse_config_str("").unwrap();
        assert_eq!(config.log_level, log::Level::Info);
        assert_eq!(config.geofeed, None);
        assert_eq!(Duration::from(config.timeout), Duration::from_secs(2));
        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.providers[0].name(), "ip-api.com");
    }

    #[test]
    fn full() {
        let config = parse_config_str(
            r#"
            log_level = "debug"
            geofeed = "/etc/hopgeo/geofeed.csv"
            timeout = 500
            token = "secret"

            [[providers]]
            type = "ip.sb"

            [[providers]]
            type = "ip-api.com"
            base_uri = "https://pro.ip-api.com/json/"
            "#,
        )
        .unwrap();
        assert_eq!(config.log_level, log::Level::Debug);
        assert_eq!(
            config.geofeed.as_deref(),
            Some(Path::new("/etc/hopgeo/geofeed.csv"))
        );
        assert_eq!(Duration::from(config.timeout), Duration::from_millis(500));
        assert_eq!(config.token.as_deref(), Some("secret"));
        let names: Vec<_> = config.providers.iter().map(Provider::name).collect();
        assert_eq!(names, ["ip.sb", "ip-api.com"]);
    }

    #[test]
    fn no_providers() {
        let error = parse_config_str("providers = []").unwrap_err();
        assert_eq!(
            error.downcast_ref::<ConfigError>(),
            Some(&ConfigError::NoProviders)
        );
    }

    #[test]
    fn token_required() {
        let pro = r#"
            [[providers]]
            type = "ip.sb"
            [[providers]]
            type = "ip-api.com"
            base_uri = "https://pro.ip-api.com/json/"
            "#;
        let error = parse_config_str(pro).unwrap_err();
        assert_eq!(
            error.downcast_ref::<ConfigError>(),
            Some(&ConfigError::TokenRequired("ip-api.com"))
        );
        let empty_token = format!("token = \"\"\n{pro}");
        assert!(parse_config_str(&empty_token).is_err());
        let with_token = format!("token = \"secret\"\n{pro}");
        assert!(parse_config_str(&with_token).is_ok());
        let free = "[[providers]]\ntype = \"ip-api.com\"\n";
        assert!(parse_config_str(free).is_ok());
    }

    #[test]
    fn unknown_field() {
        assert!(parse_config_str("continents = 1").is_err());
    }

    #[test]
    fn from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hopgeo.toml");
        std::fs::write(&path, "timeout = 750\n").unwrap();
        let config = parse_config(&path).unwrap();
        assert_eq!(Duration::from(config.timeout), Duration::from_millis(750));
        assert!(parse_config(dir.path().join("missing.toml")).is_err());
    }
}
