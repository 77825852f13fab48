//! Kubelet pod accessor.
//!
//! The pod's security context is the source of truth for which gids a
//! container may carry, and it can be admission-mutated between container
//! creation and a later `exec`, so the shim fetches the pod fresh on every
//! invocation from the node's kubelet read endpoint (`GET /pods`) and never
//! caches it.
//!
//! Production access goes through [`KubeletClient`], authenticated with the
//! node kubeconfig's TLS client certificate. Tests substitute any other
//! [`PodSource`] implementation.

use crate::config::Config;
use crate::error::{Error, Result};
use base64::Engine as _;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::trace;

/// Kubelet request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

// =============================================================================
// Pod Views
// =============================================================================

/// The subset of a Kubernetes pod the shim needs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pod {
    /// Object metadata (namespace, name).
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// Pod spec view.
    #[serde(default)]
    pub spec: PodSpec,
}

/// Pod metadata view.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub name: String,
}

/// Pod spec view.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    /// Pod-level security context, if set.
    #[serde(default)]
    pub security_context: Option<PodSecurityContext>,
}

/// Pod-level security context view.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSecurityContext {
    /// Explicitly authorized supplementary gids.
    #[serde(default)]
    pub supplemental_groups: Vec<i64>,
    /// Volume ownership gid, implicitly granted as a supplementary group.
    #[serde(default)]
    pub fs_group: Option<i64>,
}

/// Kubelet `GET /pods` response.
#[derive(Debug, Default, Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<Pod>,
}

// =============================================================================
// Pod Source Trait
// =============================================================================

/// Narrow pod-lookup contract consumed by the enforcement pipeline.
///
/// "Pod not found" ([`Error::PodNotFound`]) and transport failure
/// ([`Error::KubeletTransport`]) are distinct, and both fatal: if the
/// authorized gid set cannot be determined, enforcement cannot proceed
/// safely and the invocation must abort rather than delegate.
pub trait PodSource {
    /// Fetches the live pod for `namespace`/`name`.
    fn pod(&self, namespace: &str, name: &str) -> Result<Pod>;
}

impl<T: PodSource + ?Sized> PodSource for &T {
    fn pod(&self, namespace: &str, name: &str) -> Result<Pod> {
        (*self).pod(namespace, name)
    }
}

// =============================================================================
// Kubelet Client
// =============================================================================

/// HTTPS client for the kubelet read endpoint.
#[derive(Debug)]
pub struct KubeletClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl KubeletClient {
    /// Builds a client from the shim configuration.
    ///
    /// Reads the kubeconfig, loads the client certificate/key pair and the
    /// cluster CA (file paths or inline base64 data). Server certificate
    /// verification is skipped - kubelet serving certs are commonly
    /// self-signed - while the client certificate still authenticates us.
    pub fn new(cfg: &Config) -> Result<Self> {
        let auth = KubeconfigAuth::load(&cfg.kubeconfig)?;

        let mut identity_pem = auth.client_cert;
        identity_pem.extend_from_slice(&auth.client_key);
        let identity = reqwest::Identity::from_pem(&identity_pem)
            .map_err(|e| Error::Config(format!("invalid client certificate/key: {e}")))?;

        let mut builder = reqwest::blocking::Client::builder()
            .identity(identity)
            .danger_accept_invalid_certs(true)
            .timeout(REQUEST_TIMEOUT);
        if let Some(ca) = auth.ca_cert {
            let ca = reqwest::Certificate::from_pem(&ca)
                .map_err(|e| Error::Config(format!("invalid cluster CA certificate: {e}")))?;
            builder = builder.add_root_certificate(ca);
        }
        let http = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to build kubelet client: {e}")))?;

        Ok(Self {
            base_url: cfg.kubelet_url.trim_end_matches('/').to_string(),
            http,
        })
    }
}

impl PodSource for KubeletClient {
    fn pod(&self, namespace: &str, name: &str) -> Result<Pod> {
        let url = format!("{}/pods", self.base_url);
        trace!(%url, "querying kubelet for pods");

        let response = self
            .http
            .get(&url)
            .send()
            .map_err(|e| Error::KubeletTransport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::KubeletTransport(format!(
                "GET {url} returned {status}"
            )));
        }

        let pods: PodList = response
            .json()
            .map_err(|e| Error::KubeletTransport(format!("invalid pod list body: {e}")))?;
        trace!(count = pods.items.len(), "pod list received");

        pods.items
            .into_iter()
            .find(|p| p.metadata.namespace == namespace && p.metadata.name == name)
            .ok_or_else(|| Error::PodNotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }
}

// =============================================================================
// Kubeconfig
// =============================================================================

/// TLS material extracted from a node kubeconfig.
struct KubeconfigAuth {
    client_cert: Vec<u8>,
    client_key: Vec<u8>,
    ca_cert: Option<Vec<u8>>,
}

#[derive(Deserialize)]
struct Kubeconfig {
    #[serde(default)]
    clusters: Vec<NamedCluster>,
    #[serde(default)]
    users: Vec<NamedUser>,
}

#[derive(Deserialize)]
struct NamedCluster {
    cluster: ClusterEntry,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ClusterEntry {
    #[serde(default)]
    certificate_authority: Option<String>,
    #[serde(default)]
    certificate_authority_data: Option<String>,
}

#[derive(Deserialize)]
struct NamedUser {
    user: UserEntry,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct UserEntry {
    #[serde(default)]
    client_certificate: Option<String>,
    #[serde(default)]
    client_certificate_data: Option<String>,
    #[serde(default)]
    client_key: Option<String>,
    #[serde(default)]
    client_key_data: Option<String>,
}

impl KubeconfigAuth {
    /// Parses the minimal kubeconfig subset needed for kubelet TLS auth.
    ///
    /// Each piece of material may be a file path or inline base64
    /// (`*-data`); inline wins when both are present, matching kubectl.
    fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read kubeconfig {}: {e}", path.display()))
        })?;
        let kc: Kubeconfig = serde_yaml::from_str(&raw).map_err(|e| {
            Error::Config(format!("failed to parse kubeconfig {}: {e}", path.display()))
        })?;

        let user = kc
            .users
            .first()
            .map(|u| &u.user)
            .ok_or_else(|| Error::Config("kubeconfig has no users".to_string()))?;

        let client_cert = material(
            user.client_certificate_data.as_deref(),
            user.client_certificate.as_deref(),
        )?
        .ok_or_else(|| Error::Config("kubeconfig user has no client certificate".to_string()))?;
        let client_key = material(user.client_key_data.as_deref(), user.client_key.as_deref())?
            .ok_or_else(|| Error::Config("kubeconfig user has no client key".to_string()))?;

        let ca_cert = match kc.clusters.first().map(|c| &c.cluster) {
            Some(cluster) => material(
                cluster.certificate_authority_data.as_deref(),
                cluster.certificate_authority.as_deref(),
            )?,
            None => None,
        };

        Ok(Self {
            client_cert,
            client_key,
            ca_cert,
        })
    }
}

/// Resolves inline base64 data or a file path to raw PEM bytes.
fn material(data: Option<&str>, path: Option<&str>) -> Result<Option<Vec<u8>>> {
    if let Some(data) = data {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(data.trim())
            .map_err(|e| Error::Config(format!("invalid base64 in kubeconfig: {e}")))?;
        return Ok(Some(decoded));
    }
    if let Some(path) = path {
        let raw = std::fs::read(path)
            .map_err(|e| Error::Config(format!("failed to read {path}: {e}")))?;
        return Ok(Some(raw));
    }
    Ok(None)
}
