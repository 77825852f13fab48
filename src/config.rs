//! Shim configuration.
//!
//! Loaded from a TOML file at `/etc/gidgate/config.toml` (overridable via
//! the `GIDGATE_CONFIG` environment variable). A missing file is not an
//! error - every field has a default matching a containerd + runc node.
//! The annotation keys are configuration rather than constants because
//! each CRI implementation uses its own set.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default config file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/gidgate/config.toml";

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "GIDGATE_CONFIG";

/// Top-level shim configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Underlying OCI runtime binary, resolved against PATH at delegation.
    pub runtime: String,

    /// Kubelet read endpoint.
    pub kubelet_url: String,

    /// Kubeconfig used to authenticate to the kubelet.
    pub kubeconfig: PathBuf,

    /// Annotation key carrying the pod namespace (containerd default).
    pub pod_namespace_annotation: String,

    /// Annotation key carrying the pod name (containerd default).
    pub pod_name_annotation: String,

    /// Annotation key carrying the container name (containerd default).
    pub container_name_annotation: String,

    /// Annotation key carrying the container type, `sandbox` or `container`
    /// (containerd default).
    pub container_type_annotation: String,

    /// Escalate missing container-name/type annotations to fatal errors.
    /// Off by default: several CRI implementations legitimately omit them.
    pub strict_annotations: bool,

    /// Logging configuration.
    pub logging: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            runtime: "runc".to_string(),
            kubelet_url: "https://127.0.0.1:10250".to_string(),
            kubeconfig: PathBuf::from("/etc/kubernetes/kubelet.conf"),
            pod_namespace_annotation: "io.kubernetes.cri.sandbox-namespace".to_string(),
            pod_name_annotation: "io.kubernetes.cri.sandbox-name".to_string(),
            container_name_annotation: "io.kubernetes.cri.container-name".to_string(),
            container_type_annotation: "io.kubernetes.cri.container-type".to_string(),
            strict_annotations: false,
            logging: LogConfig::default(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LogConfig {
    /// Shim log file. `/dev/null` by default so a misconfigured node never
    /// fills a disk by accident.
    pub log_file: PathBuf,

    /// Log level (`trace` .. `error`).
    pub log_level: String,

    /// Log format.
    pub log_format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from("/dev/null"),
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
        }
    }
}

/// Shim log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Structured JSON lines.
    Json,
    /// Human-readable text.
    Text,
}

impl Config {
    /// Loads the configuration from the default location (or the
    /// `GIDGATE_CONFIG` override), falling back to defaults when the file
    /// does not exist.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from(&path)
    }

    /// Loads the configuration from a specific path. A missing file yields
    /// the defaults; an unreadable or invalid file is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let cfg = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("failed to read {}: {e}", path.display()))
            })?;
            toml::from_str(&raw).map_err(|e| {
                Error::Config(format!("failed to parse {}: {e}", path.display()))
            })?
        } else {
            Self::default()
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates field values that serde cannot check structurally.
    pub fn validate(&self) -> Result<()> {
        tracing::Level::from_str(&self.logging.log_level)
            .map_err(|_| Error::Config(format!("invalid log-level '{}'", self.logging.log_level)))?;
        if self.runtime.is_empty() {
            return Err(Error::Config("runtime must not be empty".to_string()));
        }
        Ok(())
    }

    /// The configured log level as a tracing level.
    ///
    /// Call only after [`Config::validate`]; an unparsable level falls back
    /// to `info`.
    pub fn log_level(&self) -> tracing::Level {
        tracing::Level::from_str(&self.logging.log_level).unwrap_or(tracing::Level::INFO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_containerd_convention() {
        let cfg = Config::default();
        assert_eq!(cfg.runtime, "runc");
        assert_eq!(
            cfg.pod_namespace_annotation,
            "io.kubernetes.cri.sandbox-namespace"
        );
        assert_eq!(cfg.container_type_annotation, "io.kubernetes.cri.container-type");
        assert!(!cfg.strict_annotations);
        assert_eq!(cfg.logging.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let mut cfg = Config::default();
        cfg.logging.log_level = "loud".to_string();
        assert!(cfg.validate().is_err());
    }
}
