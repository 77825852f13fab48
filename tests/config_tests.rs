//! Tests for configuration loading and defaulting.

use gidgate::{Config, Error, LogFormat};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_missing_file_yields_defaults() {
    let cfg = Config::load_from(&PathBuf::from("/nonexistent/gidgate/config.toml")).unwrap();
    assert_eq!(cfg.runtime, "runc");
    assert_eq!(cfg.kubelet_url, "https://127.0.0.1:10250");
    assert_eq!(cfg.kubeconfig, PathBuf::from("/etc/kubernetes/kubelet.conf"));
    assert_eq!(cfg.logging.log_file, PathBuf::from("/dev/null"));
    assert_eq!(cfg.logging.log_level, "info");
}

#[test]
fn test_toml_overrides_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
runtime = "crun"
kubelet-url = "https://10.0.0.5:10250"
pod-namespace-annotation = "io.kubernetes.cri-o.SandboxNamespace"
strict-annotations = true

[logging]
log-file = "/var/log/gidgate.log"
log-level = "debug"
log-format = "text"
"#,
    )
    .unwrap();

    let cfg = Config::load_from(&path).unwrap();
    assert_eq!(cfg.runtime, "crun");
    assert_eq!(cfg.kubelet_url, "https://10.0.0.5:10250");
    assert_eq!(
        cfg.pod_namespace_annotation,
        "io.kubernetes.cri-o.SandboxNamespace"
    );
    assert!(cfg.strict_annotations);
    assert_eq!(cfg.logging.log_format, LogFormat::Text);
    assert_eq!(cfg.log_level(), tracing::Level::DEBUG);

    // Untouched fields keep their defaults.
    assert_eq!(cfg.pod_name_annotation, "io.kubernetes.cri.sandbox-name");
}

#[test]
fn test_invalid_log_format_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[logging]\nlog-format = \"xml\"\n").unwrap();

    let err = Config::load_from(&path).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_invalid_log_level_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[logging]\nlog-level = \"shouty\"\n").unwrap();

    let err = Config::load_from(&path).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_malformed_toml_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "runtime = [not toml").unwrap();

    assert!(Config::load_from(&path).is_err());
}
