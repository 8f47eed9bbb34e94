//! `edgerelay.toml`: ambient settings shared by every adapter.
//!
//! ```toml
//! [app]
//! name = "worker-data"
//!
//! [logging.axum]
//! level = "debug"
//!
//! [logging.cloudflare]
//! level = "error"
//!
//! [dev]
//! addr = "127.0.0.1:8787"
//! ```
//!
//! Adapters embed the file with `include_str!`, so nothing is read from disk or the environment
//! at request time.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use log::LevelFilter;
use serde::Deserialize;
use thiserror::Error;
use validator::{Validate, ValidationError, ValidationErrors};

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("manifest failed validation: {0}")]
    Invalid(#[from] ValidationErrors),
}

#[derive(Clone, Debug)]
pub struct ManifestLoader {
    manifest: Arc<Manifest>,
}

impl ManifestLoader {
    pub fn load_from_str(contents: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest = toml::from_str(contents)?;
        manifest.validate()?;
        Ok(Self {
            manifest: Arc::new(manifest),
        })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct Manifest {
    #[serde(default)]
    #[validate(nested)]
    pub app: ManifestApp,
    #[serde(default)]
    #[validate(nested)]
    pub logging: ManifestLogging,
    #[serde(default)]
    #[validate(nested)]
    pub dev: ManifestDev,
}

impl Manifest {
    pub fn app_name(&self) -> Option<&str> {
        self.app.name.as_deref()
    }

    /// Logging settings for `adapter`, falling back to `info` with stdout echo enabled.
    pub fn logging_or_default(&self, adapter: &str) -> ResolvedLoggingConfig {
        self.logging
            .adapters
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(adapter))
            .map(|(_, cfg)| ResolvedLoggingConfig::from_manifest(cfg))
            .unwrap_or_default()
    }

    /// Dev server address; validation already rejected unparsable values.
    pub fn dev_addr(&self) -> Option<SocketAddr> {
        self.dev.addr.as_deref().and_then(|addr| addr.parse().ok())
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ManifestApp {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ManifestLogging {
    #[serde(flatten)]
    #[validate(nested)]
    pub adapters: BTreeMap<String, ManifestLoggingConfig>,
}

#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct ManifestLoggingConfig {
    #[serde(default)]
    pub level: Option<LogLevel>,
    #[serde(default)]
    pub echo_stdout: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ManifestDev {
    #[serde(default)]
    #[validate(custom(function = "validate_socket_addr"))]
    pub addr: Option<String>,
}

fn validate_socket_addr(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<SocketAddr>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("socket_addr"))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedLoggingConfig {
    pub level: LogLevel,
    pub echo_stdout: bool,
}

impl Default for ResolvedLoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            echo_stdout: true,
        }
    }
}

impl ResolvedLoggingConfig {
    fn from_manifest(cfg: &ManifestLoggingConfig) -> Self {
        let defaults = Self::default();
        Self {
            level: cfg.level.unwrap_or(defaults.level),
            echo_stdout: cfg.echo_stdout.unwrap_or(defaults.echo_stdout),
        }
    }

    /// Effective filter: `Off` when stdout echo is disabled.
    pub fn level_filter(&self) -> LevelFilter {
        if self.echo_stdout {
            self.level.into()
        } else {
            LevelFilter::Off
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Off => LevelFilter::Off,
        }
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "off" => Ok(Self::Off),
            other => Err(serde::de::Error::custom(format!(
                "logging level must be trace, debug, info, warn, error, or off (got `{}`)",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[app]
name = "worker-data"

[logging.axum]
level = "debug"

[logging.cloudflare]
level = "ERROR"
echo_stdout = false

[dev]
addr = "0.0.0.0:3000"
"#;

    #[test]
    fn parses_sample_manifest() {
        let loader = ManifestLoader::load_from_str(SAMPLE).expect("manifest");
        let manifest = loader.manifest();
        assert_eq!(manifest.app_name(), Some("worker-data"));
        assert_eq!(manifest.dev_addr(), Some("0.0.0.0:3000".parse().unwrap()));
    }

    #[test]
    fn logging_resolves_per_adapter() {
        let loader = ManifestLoader::load_from_str(SAMPLE).expect("manifest");
        let manifest = loader.manifest();

        let axum = manifest.logging_or_default("axum");
        assert_eq!(axum.level, LogLevel::Debug);
        assert_eq!(axum.level_filter(), LevelFilter::Debug);

        let cloudflare = manifest.logging_or_default("Cloudflare");
        assert_eq!(cloudflare.level, LogLevel::Error);
        assert_eq!(cloudflare.level_filter(), LevelFilter::Off);

        assert_eq!(
            manifest.logging_or_default("fastly"),
            ResolvedLoggingConfig::default()
        );
    }

    #[test]
    fn empty_manifest_uses_defaults() {
        let loader = ManifestLoader::load_from_str("").expect("manifest");
        let manifest = loader.manifest();
        assert_eq!(manifest.app_name(), None);
        assert_eq!(manifest.dev_addr(), None);
        assert_eq!(
            manifest.logging_or_default("axum").level_filter(),
            LevelFilter::Info
        );
    }

    #[test]
    fn rejects_unknown_log_level() {
        let err = ManifestLoader::load_from_str("[logging.axum]\nlevel = \"loud\"")
            .expect_err("invalid level");
        assert!(matches!(err, ManifestError::Parse(_)));
        assert!(err.to_string().contains("logging level must be"));
    }

    #[test]
    fn rejects_empty_app_name() {
        let err = ManifestLoader::load_from_str("[app]\nname = \"\"").expect_err("invalid name");
        assert!(matches!(err, ManifestError::Invalid(_)));
    }

    #[test]
    fn rejects_unparsable_dev_addr() {
        let err = ManifestLoader::load_from_str("[dev]\naddr = \"localhost\"")
            .expect_err("invalid addr");
        assert!(matches!(err, ManifestError::Invalid(_)));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = ManifestLoader::load_from_str("not = [").expect_err("invalid toml");
        assert!(matches!(err, ManifestError::Parse(_)));
    }
}
