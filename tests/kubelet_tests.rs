//! Tests for kubelet client construction and pod view parsing.
//!
//! The live HTTPS path needs a kubelet; these tests cover the parts that
//! do not: kubeconfig handling errors and deserialization of kubelet
//! `GET /pods` payloads into the pod security view.

use gidgate::kubelet::{Pod, PodSecurityContext};
use gidgate::{Config, Error, KubeletClient};
use std::fs;
use tempfile::TempDir;

// =============================================================================
// Kubeconfig Handling
// =============================================================================

#[test]
fn test_missing_kubeconfig_is_a_config_error() {
    let mut cfg = Config::default();
    cfg.kubeconfig = "/nonexistent/kubelet.conf".into();
    let err = KubeletClient::new(&cfg).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_kubeconfig_without_users_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("kubelet.conf");
    fs::write(
        &path,
        "apiVersion: v1\nkind: Config\nclusters: []\nusers: []\n",
    )
    .unwrap();

    let mut cfg = Config::default();
    cfg.kubeconfig = path;
    let err = KubeletClient::new(&cfg).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_kubeconfig_with_invalid_base64_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("kubelet.conf");
    fs::write(
        &path,
        r#"
apiVersion: v1
kind: Config
clusters:
- name: local
  cluster:
    server: https://127.0.0.1:6443
users:
- name: node
  user:
    client-certificate-data: "%%% not base64 %%%"
    client-key-data: "%%% not base64 %%%"
"#,
    )
    .unwrap();

    let mut cfg = Config::default();
    cfg.kubeconfig = path;
    let err = KubeletClient::new(&cfg).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

// =============================================================================
// Pod View Parsing
// =============================================================================

#[test]
fn test_pod_security_view_deserializes() {
    let pod: Pod = serde_json::from_str(
        r#"{
          "metadata": {"namespace": "default", "name": "web-0", "uid": "abc"},
          "spec": {
            "containers": [{"name": "app", "image": "nginx"}],
            "securityContext": {
              "supplementalGroups": [20000, 30000],
              "fsGroup": 20001,
              "runAsNonRoot": true
            }
          },
          "status": {"phase": "Running"}
        }"#,
    )
    .unwrap();

    assert_eq!(pod.metadata.namespace, "default");
    assert_eq!(pod.metadata.name, "web-0");
    let sc = pod.spec.security_context.unwrap();
    assert_eq!(sc.supplemental_groups, vec![20000, 30000]);
    assert_eq!(sc.fs_group, Some(20001));
}

#[test]
fn test_pod_without_security_context() {
    let pod: Pod = serde_json::from_str(
        r#"{"metadata": {"namespace": "kube-system", "name": "proxy"}, "spec": {}}"#,
    )
    .unwrap();
    assert!(pod.spec.security_context.is_none());
}

#[test]
fn test_security_context_without_groups() {
    let sc: PodSecurityContext =
        serde_json::from_str(r#"{"runAsUser": 1000}"#).unwrap();
    assert!(sc.supplemental_groups.is_empty());
    assert_eq!(sc.fs_group, None);
}
